use std::sync::Arc;

use arc_swap::ArcSwapOption;

use crate::command::{CommandCode, FlightMode, FlightState};
use crate::signal::{Peaks, Spectrum};

/// What the display draws for one analysis cycle.
#[derive(Clone, Debug)]
pub struct DisplayFrame {
    /// PSD of the filtered channel.
    pub spectrum: Spectrum,
    /// NMS peaks over `spectrum`.
    pub peaks: Peaks,
    /// Scaled relative alpha power.
    pub alpha_scaled: f64,
    /// Scaled absolute beta power.
    pub beta_scaled: f64,
    /// Alpha threshold in force for this cycle.
    pub alpha_threshold: f64,
    /// Beta threshold in force for this cycle.
    pub beta_threshold: f64,
}

/// Sensor stream health, as seen by the reader.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum StreamStatus {
    /// No chunk received yet.
    #[default]
    Waiting,
    /// Last pull returned data.
    Receiving,
    /// Data stopped arriving after having flowed.
    Stalled,
}

/// Flight side of the snapshot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FlightStatus {
    pub state: FlightState,
    pub locked: bool,
    pub mode: FlightMode,
    pub last_command: Option<CommandCode>,
    /// An actuation is in flight; the stream is being flushed, not analysed.
    pub actuating: bool,
    pub actuations: u64,
}

impl Default for FlightStatus {
    fn default() -> Self {
        Self {
            state: FlightState::Grounded,
            locked: false,
            mode: FlightMode::PresetA,
            last_command: None,
            actuating: false,
            actuations: 0,
        }
    }
}

/// Immutable view published by the worker.
#[derive(Clone, Debug, Default)]
pub struct DisplaySnapshot {
    /// Latest analysis frame, if any cycle completed yet.
    pub frame: Option<Arc<DisplayFrame>>,
    pub flight: FlightStatus,
    pub stream: StreamStatus,
    /// Completed worker cycles.
    pub cycle: u64,
    /// The worker has exited (after its guaranteed landing).
    pub session_over: bool,
}

/// Single-slot board through which the worker publishes to the display.
///
/// Publishing swaps the whole snapshot pointer; readers always see a complete
/// snapshot and never block the writer. Nothing flows back the other way.
///
/// # Example
/// ```
/// use nf_core::display::{DisplayBoard, DisplaySnapshot};
/// let board = DisplayBoard::new();
/// assert!(board.latest().is_none());
/// board.publish(DisplaySnapshot { cycle: 3, ..Default::default() });
/// assert_eq!(board.latest().unwrap().cycle, 3);
/// ```
#[derive(Debug, Default)]
pub struct DisplayBoard {
    slot: ArcSwapOption<DisplaySnapshot>,
}

impl DisplayBoard {
    /// Empty board.
    #[must_use]
    pub fn new() -> Self {
        Self {
            slot: ArcSwapOption::const_empty(),
        }
    }

    /// Replace the published snapshot.
    pub fn publish(&self, snapshot: DisplaySnapshot) {
        self.slot.store(Some(Arc::new(snapshot)));
    }

    /// Most recently published snapshot.
    #[must_use]
    pub fn latest(&self) -> Option<Arc<DisplaySnapshot>> {
        self.slot.load_full()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn readers_keep_their_snapshot_after_a_swap() {
        let board = DisplayBoard::new();
        board.publish(DisplaySnapshot {
            cycle: 1,
            ..Default::default()
        });
        let held = board.latest().unwrap();
        board.publish(DisplaySnapshot {
            cycle: 2,
            ..Default::default()
        });
        assert_eq!(held.cycle, 1);
        assert_eq!(board.latest().unwrap().cycle, 2);
    }
}
