use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use nf_core::command::{Direction, ManualCommand};
use nf_core::config::PipelineConfig;
use nf_render::ui::{self, ViewState};
use ratatui::DefaultTerminal;

use crate::cli::Overrides;
use crate::hotreload;
use crate::pipeline::Pipeline;

/// Dashboard refresh period.
const FRAME_PERIOD: Duration = Duration::from_millis(50);

/// Step applied by one cutoff key press (Hz).
const CUTOFF_STEP_HZ: f64 = 1.0;

/// Live configuration edit from the dashboard.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Tune {
    PrevChannel,
    NextChannel,
    LowerCutoff(f64),
    UpperCutoff(f64),
}

/// What a key press asks for.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum KeyAction {
    Stop,
    ToggleHelp,
    Mode(u8),
    Tune(Tune),
    Manual(ManualCommand),
}

/// Apply `edit` to a copy of `config`.
///
/// The channel wraps around `channels`. Cutoff edits go through the same
/// checks as a file reload.
///
/// # Errors
/// Returns an error if the edited configuration cannot drive the analysis.
pub fn tune(config: &PipelineConfig, edit: Tune, channels: usize) -> Result<PipelineConfig> {
    let mut next = config.clone();
    let count = channels.max(1);
    match edit {
        Tune::PrevChannel => next.channel = (next.channel % count + count - 1) % count,
        Tune::NextChannel => next.channel = (next.channel + 1) % count,
        Tune::LowerCutoff(step) => next.lower_cutoff_hz += step,
        Tune::UpperCutoff(step) => next.upper_cutoff_hz += step,
    }
    hotreload::finalize(next, &Overrides::default())
}

/// Map a key press to an action, if bound.
#[must_use]
pub fn key_action(code: KeyCode, modifiers: KeyModifiers) -> Option<KeyAction> {
    let action = match code {
        KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => KeyAction::Stop,
        KeyCode::Esc => KeyAction::Stop,
        KeyCode::Char('?') => KeyAction::ToggleHelp,
        KeyCode::Char('1') => KeyAction::Mode(1),
        KeyCode::Char('2') => KeyAction::Mode(2),
        KeyCode::Char('3') => KeyAction::Mode(3),
        KeyCode::Char('[') => KeyAction::Tune(Tune::PrevChannel),
        KeyCode::Char(']') => KeyAction::Tune(Tune::NextChannel),
        KeyCode::Char('-') => KeyAction::Tune(Tune::LowerCutoff(-CUTOFF_STEP_HZ)),
        KeyCode::Char('=') => KeyAction::Tune(Tune::LowerCutoff(CUTOFF_STEP_HZ)),
        KeyCode::Char('_') => KeyAction::Tune(Tune::UpperCutoff(-CUTOFF_STEP_HZ)),
        KeyCode::Char('+') => KeyAction::Tune(Tune::UpperCutoff(CUTOFF_STEP_HZ)),
        KeyCode::Char(' ') => KeyAction::Manual(ManualCommand::ToggleFlight),
        KeyCode::Up => KeyAction::Manual(ManualCommand::Move(Direction::Forward)),
        KeyCode::Down => KeyAction::Manual(ManualCommand::Move(Direction::Back)),
        KeyCode::Left => KeyAction::Manual(ManualCommand::Move(Direction::Left)),
        KeyCode::Right => KeyAction::Manual(ManualCommand::Move(Direction::Right)),
        KeyCode::Char('w') => KeyAction::Manual(ManualCommand::Flip(Direction::Forward)),
        KeyCode::Char('a' | 'f') => KeyAction::Manual(ManualCommand::Flip(Direction::Left)),
        KeyCode::Char('s') => KeyAction::Manual(ManualCommand::Flip(Direction::Back)),
        KeyCode::Char('d') => KeyAction::Manual(ManualCommand::Flip(Direction::Right)),
        KeyCode::Char('q') => KeyAction::Manual(ManualCommand::Up),
        KeyCode::Char('e') => KeyAction::Manual(ManualCommand::Down),
        _ => return None,
    };
    Some(action)
}

/// Terminal front end: reads the display board, forwards operator input.
///
/// Never touches pipeline state directly; everything goes through the lock,
/// the mode selector or the manual command channel.
pub struct App<'a> {
    pipeline: &'a Pipeline,
    view: ViewState,
}

impl<'a> App<'a> {
    #[must_use]
    pub fn new(pipeline: &'a Pipeline) -> Self {
        Self {
            pipeline,
            view: ViewState::default(),
        }
    }

    /// Redraw until a requested stop has landed the vehicle.
    ///
    /// # Errors
    /// Returns an error if terminal operations fail.
    pub fn run(&mut self, mut terminal: DefaultTerminal) -> Result<()> {
        loop {
            let snapshot = self.pipeline.board.latest();
            terminal.draw(|frame| ui::draw(frame, snapshot.as_deref(), &self.view))?;

            if self.view.stopping && self.pipeline.worker.is_finished() {
                break;
            }

            if event::poll(FRAME_PERIOD)? {
                self.handle_event(&event::read()?);
            }
        }
        Ok(())
    }

    fn handle_event(&mut self, event: &Event) {
        let Event::Key(KeyEvent {
            code,
            modifiers,
            kind: KeyEventKind::Press,
            ..
        }) = event
        else {
            return;
        };
        if let Some(action) = key_action(*code, *modifiers) {
            self.apply(action);
        }
    }

    fn apply(&mut self, action: KeyAction) {
        match action {
            KeyAction::Stop => {
                if self.pipeline.lock.engage() {
                    log::info!("Stop requested from the dashboard");
                }
                self.view.stopping = true;
                self.view.show_help = false;
            }
            KeyAction::ToggleHelp => self.view.show_help = !self.view.show_help,
            KeyAction::Mode(index) => {
                self.pipeline.modes.set_index(index);
                log::info!("Flight mode set to {}", self.pipeline.modes.mode().label());
            }
            KeyAction::Tune(edit) => {
                let current = self.pipeline.config.load();
                match tune(&current, edit, self.pipeline.channels) {
                    Ok(next) => {
                        log::info!(
                            "Channel {}, bandpass {}..{} Hz",
                            next.channel,
                            next.lower_cutoff_hz,
                            next.upper_cutoff_hz
                        );
                        self.pipeline.config.store(Arc::new(next));
                    }
                    Err(e) => log::warn!("Edit rejected: {e:#}"),
                }
            }
            KeyAction::Manual(command) => {
                if self.pipeline.manual.send(command).is_err() {
                    log::debug!("Worker gone, dropping {command:?}");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_map_to_manual_commands() {
        let none = KeyModifiers::NONE;
        assert_eq!(
            key_action(KeyCode::Char(' '), none),
            Some(KeyAction::Manual(ManualCommand::ToggleFlight))
        );
        assert_eq!(
            key_action(KeyCode::Left, none),
            Some(KeyAction::Manual(ManualCommand::Move(Direction::Left)))
        );
        assert_eq!(
            key_action(KeyCode::Char('s'), none),
            Some(KeyAction::Manual(ManualCommand::Flip(Direction::Back)))
        );
        assert_eq!(
            key_action(KeyCode::Char('f'), none),
            key_action(KeyCode::Char('a'), none)
        );
        assert_eq!(key_action(KeyCode::Char('e'), none), Some(KeyAction::Manual(ManualCommand::Down)));
    }

    #[test]
    fn digits_select_modes() {
        assert_eq!(key_action(KeyCode::Char('2'), KeyModifiers::NONE), Some(KeyAction::Mode(2)));
        assert_eq!(key_action(KeyCode::Char('4'), KeyModifiers::NONE), None);
    }

    #[test]
    fn ctrl_c_and_esc_stop() {
        assert_eq!(key_action(KeyCode::Char('c'), KeyModifiers::CONTROL), Some(KeyAction::Stop));
        assert_eq!(key_action(KeyCode::Esc, KeyModifiers::NONE), Some(KeyAction::Stop));
        assert_eq!(key_action(KeyCode::Char('c'), KeyModifiers::NONE), None);
    }

    #[test]
    fn channel_wraps_both_ways() {
        let config = PipelineConfig::default();
        let down = tune(&config, Tune::PrevChannel, 8).unwrap();
        assert_eq!(down.channel, 7);
        let up = tune(&down, Tune::NextChannel, 8).unwrap();
        assert_eq!(up.channel, 0);
    }

    #[test]
    fn cutoff_edits_are_checked() {
        let config = PipelineConfig::default();
        let lower = tune(&config, Tune::LowerCutoff(1.0), 8).unwrap();
        assert_eq!(lower.lower_cutoff_hz, config.lower_cutoff_hz + 1.0);

        // 125 Hz sampling: Nyquist is 62.5 Hz.
        let near_nyquist = PipelineConfig {
            upper_cutoff_hz: 62.0,
            ..PipelineConfig::default()
        };
        assert!(tune(&near_nyquist, Tune::UpperCutoff(1.0), 8).is_err());
    }
}
