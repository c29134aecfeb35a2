/// Discrete classification output.
///
/// # Example
/// ```
/// use nf_core::command::CommandCode;
/// assert!(CommandCode::BetaDominant.triggers_maneuver());
/// assert!(!CommandCode::BothDominant.triggers_maneuver());
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CommandCode {
    /// Relative alpha above threshold: toggles takeoff / landing.
    AlphaDominant,
    /// Absolute beta above threshold with alpha below: runs the selected maneuver.
    BetaDominant,
    /// Both above threshold. Never produced under the current rule order.
    BothDominant,
    /// Nothing above threshold.
    Neither,
}

impl CommandCode {
    /// Legacy numeric code (1..=4) as shown to operators.
    #[must_use]
    pub fn code(self) -> u8 {
        match self {
            Self::AlphaDominant => 1,
            Self::BetaDominant => 2,
            Self::BothDominant => 3,
            Self::Neither => 4,
        }
    }

    /// `true` for the code that dispatches the [`FlightMode`] maneuver.
    #[must_use]
    pub fn triggers_maneuver(self) -> bool {
        self == Self::BetaDominant
    }

    /// Short label for logs and the dashboard.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::AlphaDominant => "ALPHA",
            Self::BetaDominant => "BETA",
            Self::BothDominant => "BOTH",
            Self::Neither => "NEITHER",
        }
    }
}

/// Flight state of the vehicle as tracked by the state machine.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FlightState {
    /// On the ground (session start, after landing, after any failure).
    #[default]
    Grounded,
    /// In the air.
    Airborne,
}

/// Maneuver run by the mode-triggering command while airborne.
///
/// # Example
/// ```
/// use nf_core::command::FlightMode;
/// assert_eq!(FlightMode::from_index(1), FlightMode::PresetA);
/// assert_eq!(FlightMode::from_index(2), FlightMode::PresetB);
/// assert_eq!(FlightMode::from_index(7), FlightMode::Forward);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FlightMode {
    /// Preset maneuver A (index 1).
    PresetA,
    /// Preset maneuver B (index 2).
    PresetB,
    /// Default forward move (any other index).
    Forward,
}

impl FlightMode {
    /// Map the operator-facing mode index onto a maneuver.
    #[must_use]
    pub fn from_index(index: u8) -> Self {
        match index {
            1 => Self::PresetA,
            2 => Self::PresetB,
            _ => Self::Forward,
        }
    }

    /// Canonical index of this mode.
    #[must_use]
    pub fn index(self) -> u8 {
        match self {
            Self::PresetA => 1,
            Self::PresetB => 2,
            Self::Forward => 3,
        }
    }

    /// Short label for logs and the dashboard.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::PresetA => "preset A",
            Self::PresetB => "preset B",
            Self::Forward => "forward",
        }
    }
}

/// Horizontal direction for moves and flips.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Back,
    Left,
    Right,
}

/// Operator keyboard command, executed by the worker like any other input.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ManualCommand {
    /// Take off when grounded, land when airborne.
    ToggleFlight,
    /// Move horizontally by the configured distance.
    Move(Direction),
    /// Flip in a direction.
    Flip(Direction),
    /// Climb by the vehicle's step.
    Up,
    /// Descend by the vehicle's step.
    Down,
}

/// One input consumed by the flight state machine.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FlightInput {
    /// Sentinel emitted instead of a command once the session is locked.
    Abort,
    /// Classifier output.
    Code(CommandCode),
    /// Operator command.
    Manual(ManualCommand),
}
