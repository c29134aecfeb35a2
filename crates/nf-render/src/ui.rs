use nf_core::command::FlightState;
use nf_core::display::{DisplayFrame, DisplaySnapshot, StreamStatus};
use ratatui::Frame;
use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::symbols;
use ratatui::text::{Line, Span};
use ratatui::widgets::{Axis, Block, Borders, Chart, Clear, Dataset, Gauge, GraphType, Paragraph};

/// UI-only state owned by the event loop.
///
/// # Example
/// ```
/// use nf_render::ui::ViewState;
/// let view = ViewState::default();
/// assert!(!view.show_help);
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ViewState {
    pub show_help: bool,
    /// Stop requested; waiting for the worker to land.
    pub stopping: bool,
}

/// Draw the full UI: [chart + gauges | sidebar], plus overlays.
pub fn draw(frame: &mut Frame, snapshot: Option<&DisplaySnapshot>, view: &ViewState) {
    let area = frame.area();

    let h_chunks = Layout::horizontal([Constraint::Min(40), Constraint::Length(26)]).split(area);
    let v_chunks = Layout::vertical([Constraint::Min(8), Constraint::Length(6)]).split(h_chunks[0]);

    let display = snapshot.and_then(|s| s.frame.as_deref());
    draw_spectrum(frame, v_chunks[0], display);
    draw_gauges(frame, v_chunks[1], display);
    draw_sidebar(frame, h_chunks[1], snapshot, view);

    if snapshot.is_some_and(|s| s.flight.actuating) {
        draw_banner(frame, v_chunks[0], " Task performing, stream paused ");
    } else if view.stopping && !snapshot.is_some_and(|s| s.session_over) {
        draw_banner(frame, v_chunks[0], " Stopping: landing... ");
    }
    if view.show_help {
        draw_help_overlay(frame, area);
    }
}

/// PSD line and peak points, both as `(Hz, power)`.
#[must_use]
pub fn spectrum_series(display: &DisplayFrame) -> (Vec<(f64, f64)>, Vec<(f64, f64)>) {
    let line = display
        .spectrum
        .frequencies()
        .iter()
        .copied()
        .zip(display.spectrum.power().iter().copied())
        .collect();
    let peaks = display
        .peaks
        .frequencies
        .iter()
        .copied()
        .zip(display.peaks.power.iter().copied())
        .collect();
    (line, peaks)
}

/// Fraction of the gauge filled by `value`, where the threshold sits at
/// mid-scale.
#[must_use]
pub fn gauge_ratio(value: f64, threshold: f64) -> f64 {
    if !(threshold > 0.0 && value.is_finite()) {
        return 0.0;
    }
    (value / (2.0 * threshold)).clamp(0.0, 1.0)
}

fn draw_spectrum(frame: &mut Frame, area: Rect, display: Option<&DisplayFrame>) {
    let block = Block::default().borders(Borders::ALL).title(" PSD ");
    let Some(display) = display else {
        let waiting = Paragraph::new(Line::from(Span::styled(
            " waiting for the first analysis window...",
            Style::default().fg(Color::DarkGray),
        )))
        .block(block);
        frame.render_widget(waiting, area);
        return;
    };

    let (line, peaks) = spectrum_series(display);
    let max_hz = line.last().map_or(1.0, |&(f, _)| f.max(1.0));
    let max_power = line
        .iter()
        .map(|&(_, p)| p)
        .fold(0.0_f64, f64::max)
        .max(f64::EPSILON);

    let datasets = vec![
        Dataset::default()
            .name("PSD")
            .marker(symbols::Marker::Braille)
            .graph_type(GraphType::Line)
            .style(Style::default().fg(Color::Cyan))
            .data(&line),
        Dataset::default()
            .name("peaks")
            .marker(symbols::Marker::Dot)
            .graph_type(GraphType::Scatter)
            .style(Style::default().fg(Color::Red))
            .data(&peaks),
    ];

    let chart = Chart::new(datasets)
        .block(block)
        .x_axis(
            Axis::default()
                .title("Hz")
                .bounds([0.0, max_hz])
                .labels(vec![
                    Span::raw("0"),
                    Span::raw(format!("{:.0}", max_hz / 2.0)),
                    Span::raw(format!("{max_hz:.0}")),
                ])
                .style(Style::default().fg(Color::DarkGray)),
        )
        .y_axis(
            Axis::default()
                .title("µV²/Hz")
                .bounds([0.0, max_power * 1.05])
                .labels(vec![Span::raw("0"), Span::raw(format!("{max_power:.1}"))])
                .style(Style::default().fg(Color::DarkGray)),
        );

    frame.render_widget(chart, area);
}

fn draw_gauges(frame: &mut Frame, area: Rect, display: Option<&DisplayFrame>) {
    let rows = Layout::vertical([Constraint::Length(3), Constraint::Length(3)]).split(area);
    let (alpha, alpha_t, beta, beta_t) = display.map_or((0.0, 0.0, 0.0, 0.0), |d| {
        (d.alpha_scaled, d.alpha_threshold, d.beta_scaled, d.beta_threshold)
    });

    for (row, name, value, threshold, color) in [
        (rows[0], "alpha (rel)", alpha, alpha_t, Color::Green),
        (rows[1], "beta (abs)", beta, beta_t, Color::Magenta),
    ] {
        let over = value > threshold && threshold > 0.0;
        let gauge = Gauge::default()
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(format!(" {name}  T={threshold:.2} ")),
            )
            .gauge_style(Style::default().fg(if over { Color::Yellow } else { color }))
            .ratio(gauge_ratio(value, threshold))
            .label(format!("{value:.2}"));
        frame.render_widget(gauge, row);
    }
}

fn draw_sidebar(frame: &mut Frame, area: Rect, snapshot: Option<&DisplaySnapshot>, view: &ViewState) {
    let heading = |text: &'static str| Line::from(Span::styled(text, Style::default().fg(Color::Yellow)));

    let mut lines = Vec::new();
    match snapshot {
        None => lines.push(Line::from(Span::styled(
            "○ STARTING",
            Style::default().fg(Color::DarkGray),
        ))),
        Some(s) => {
            let (state_str, state_color) = match (s.session_over, s.flight.state) {
                (true, _) => ("⏹ SESSION OVER", Color::DarkGray),
                (false, FlightState::Airborne) => ("▲ AIRBORNE", Color::Green),
                (false, FlightState::Grounded) => ("▼ GROUNDED", Color::White),
            };
            lines.push(Line::from(Span::styled(
                state_str,
                Style::default().fg(state_color).add_modifier(Modifier::BOLD),
            )));
            if s.flight.locked {
                lines.push(Line::from(Span::styled(
                    "■ LOCKED",
                    Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
                )));
            }
            lines.push(Line::from(""));
            lines.push(heading("─ Flight ─────"));
            lines.push(Line::from(format!(
                " Mode: {} ({})",
                s.flight.mode.index(),
                s.flight.mode.label()
            )));
            let last = s
                .flight
                .last_command
                .map_or_else(|| "-".to_string(), |c| format!("{} {}", c.code(), c.label()));
            lines.push(Line::from(format!(" Last: {last}")));
            lines.push(Line::from(format!(" Actions: {}", s.flight.actuations)));
            lines.push(Line::from(""));
            lines.push(heading("─ Stream ─────"));
            let (stream_str, stream_color) = match s.stream {
                StreamStatus::Waiting => ("waiting", Color::DarkGray),
                StreamStatus::Receiving => ("receiving", Color::Green),
                StreamStatus::Stalled => ("STALLED", Color::Red),
            };
            lines.push(Line::from(vec![
                Span::raw(" "),
                Span::styled(stream_str, Style::default().fg(stream_color)),
            ]));
            lines.push(Line::from(format!(" Cycle: {}", s.cycle)));
        }
    }

    if view.stopping {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(" stopping...", Style::default().fg(Color::Red))));
    }
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(" ? = help", Style::default().fg(Color::DarkGray))));

    let sidebar = Paragraph::new(lines).block(Block::default().borders(Borders::LEFT).title(" Status "));
    frame.render_widget(sidebar, area);
}

fn draw_banner(frame: &mut Frame, area: Rect, text: &'static str) {
    let width = (text.chars().count() as u16 + 2).min(area.width);
    let x = area.x + area.width.saturating_sub(width) / 2;
    let y = area.y + area.height / 2;
    let banner_area = Rect::new(x, y.saturating_sub(1), width, 3.min(area.height));

    let banner = Paragraph::new(Line::from(Span::styled(
        text,
        Style::default().fg(Color::Black).bg(Color::Yellow).add_modifier(Modifier::BOLD),
    )))
    .block(Block::default().borders(Borders::ALL).style(Style::default().bg(Color::Black)));

    frame.render_widget(Clear, banner_area);
    frame.render_widget(banner, banner_area);
}

/// Keybinding overlay.
fn draw_help_overlay(frame: &mut Frame, area: Rect) {
    let help_text = vec![
        Line::from(Span::styled(" neuroflight: controls ", Style::default().fg(Color::Yellow))),
        Line::from(""),
        Line::from(" Esc      Stop session and land"),
        Line::from(" Space    Take off / land"),
        Line::from(" ↑/↓/←/→  Move 20 cm"),
        Line::from(" w/a/s/d  Flip fwd/left/back/right"),
        Line::from(" q/e      Up / down"),
        Line::from(" 1/2/3    Mode: preset A/B/forward"),
        Line::from(" [ / ]    Previous / next channel"),
        Line::from(" - / =    Lower cutoff -1 / +1 Hz"),
        Line::from(" _ / +    Upper cutoff -1 / +1 Hz"),
        Line::from(" ?        Toggle help"),
        Line::from(""),
        Line::from(Span::styled(
            " Press ? to close ",
            Style::default().fg(Color::DarkGray),
        )),
    ];

    let help_width = 40u16.min(area.width);
    let help_height = (help_text.len() as u16 + 2).min(area.height);
    let x = area.x + area.width.saturating_sub(help_width) / 2;
    let y = area.y + area.height.saturating_sub(help_height) / 2;
    let help_area = Rect::new(x, y, help_width, help_height);

    let help = Paragraph::new(help_text).block(
        Block::default()
            .borders(Borders::ALL)
            .title(" Help ")
            .style(Style::default().bg(Color::Black).fg(Color::White)),
    );

    frame.render_widget(Clear, help_area);
    frame.render_widget(help, help_area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use nf_core::command::CommandCode;
    use nf_core::display::FlightStatus;
    use nf_core::signal::{Peaks, Spectrum};
    use ratatui::Terminal;
    use ratatui::backend::TestBackend;

    fn frame() -> DisplayFrame {
        let spectrum = Spectrum::new(
            (0..63).map(f64::from).collect(),
            (0..63).map(|i| if i == 10 { 50.0 } else { 1.0 }).collect(),
            1.0,
        )
        .unwrap();
        let peaks = Peaks::from_indices(&spectrum, vec![10]);
        DisplayFrame {
            spectrum,
            peaks,
            alpha_scaled: 0.8,
            beta_scaled: 3.0,
            alpha_threshold: 0.6,
            beta_threshold: 20.0,
        }
    }

    fn render(snapshot: Option<&DisplaySnapshot>, view: &ViewState) -> String {
        let mut terminal = Terminal::new(TestBackend::new(100, 30)).unwrap();
        terminal.draw(|f| draw(f, snapshot, view)).unwrap();
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|c| c.symbol())
            .collect()
    }

    #[test]
    fn series_pair_bins_and_peaks() {
        let (line, peaks) = spectrum_series(&frame());
        assert_eq!(line.len(), 63);
        assert_eq!(peaks, vec![(10.0, 50.0)]);
    }

    #[test]
    fn gauge_centres_threshold() {
        assert_eq!(gauge_ratio(0.6, 0.6), 0.5);
        assert_eq!(gauge_ratio(5.0, 0.6), 1.0);
        assert_eq!(gauge_ratio(-1.0, 0.6), 0.0);
        assert_eq!(gauge_ratio(1.0, 0.0), 0.0);
        assert_eq!(gauge_ratio(f64::NAN, 1.0), 0.0);
    }

    #[test]
    fn draws_without_snapshot() {
        let screen = render(None, &ViewState::default());
        assert!(screen.contains("STARTING"));
        assert!(screen.contains("waiting"));
    }

    #[test]
    fn draws_status_and_banner() {
        let snapshot = DisplaySnapshot {
            frame: Some(Arc::new(frame())),
            flight: FlightStatus {
                state: FlightState::Airborne,
                last_command: Some(CommandCode::AlphaDominant),
                actuating: true,
                ..FlightStatus::default()
            },
            stream: StreamStatus::Stalled,
            cycle: 12,
            session_over: false,
        };
        let screen = render(Some(&snapshot), &ViewState::default());
        assert!(screen.contains("AIRBORNE"));
        assert!(screen.contains("STALLED"));
        assert!(screen.contains("Task performing"));
        assert!(screen.contains("Cycle: 12"));
    }

    #[test]
    fn help_overlay_lists_keys() {
        let view = ViewState {
            show_help: true,
            stopping: false,
        };
        let screen = render(Some(&DisplaySnapshot::default()), &view);
        assert!(screen.contains("Take off / land"));
    }
}
