use std::time::Duration;

use crate::command::Direction;
use crate::error::{ActuatorError, SourceError};
use crate::signal::SampleChunk;

/// Delivers timestamped multi-channel samples.
///
/// Implemented by: `ChannelSource` (flume-fed), test doubles.
///
/// # Example
/// ```
/// use nf_core::traits::SensorSource;
/// use nf_core::signal::SampleChunk;
/// use nf_core::error::SourceError;
/// use std::time::Duration;
///
/// struct Silent;
/// impl SensorSource for Silent {
///     fn pull_chunk(&mut self, _max: usize, _t: Duration) -> Result<SampleChunk, SourceError> {
///         Ok(SampleChunk::empty())
///     }
/// }
/// ```
pub trait SensorSource: Send {
    /// Pull up to `max_samples`, waiting at most `timeout`.
    ///
    /// An empty chunk means no data arrived within the timeout; it is not an
    /// error.
    ///
    /// # Errors
    /// Returns [`SourceError`] if the stream is broken for good.
    fn pull_chunk(&mut self, max_samples: usize, timeout: Duration)
    -> Result<SampleChunk, SourceError>;
}

/// Discards queued sensor data before and after an actuation.
pub trait BufferFlush {
    /// Drain whatever is queued without processing it. Must terminate.
    ///
    /// Returns the number of samples discarded.
    fn flush(&mut self) -> usize;
}

/// Vehicle actuator driver.
///
/// Every call is best-effort; failures are errors, never silent no-ops. The
/// preset maneuvers are composed from the primitives by default.
pub trait Actuator: Send {
    /// Take off and hover.
    ///
    /// # Errors
    /// Returns [`ActuatorError`] if the vehicle does not acknowledge.
    fn takeoff(&mut self) -> Result<(), ActuatorError>;

    /// Land normally.
    ///
    /// # Errors
    /// Returns [`ActuatorError`] if the vehicle does not acknowledge.
    fn land(&mut self) -> Result<(), ActuatorError>;

    /// Stop all motors immediately.
    ///
    /// # Errors
    /// Returns [`ActuatorError`] if the vehicle does not acknowledge.
    fn emergency_land(&mut self) -> Result<(), ActuatorError>;

    /// Horizontal move by `distance_cm`.
    ///
    /// # Errors
    /// Returns [`ActuatorError`] if the vehicle does not acknowledge.
    fn move_by(&mut self, direction: Direction, distance_cm: u32) -> Result<(), ActuatorError>;

    /// Climb one step.
    ///
    /// # Errors
    /// Returns [`ActuatorError`] if the vehicle does not acknowledge.
    fn move_up(&mut self) -> Result<(), ActuatorError>;

    /// Descend one step.
    ///
    /// # Errors
    /// Returns [`ActuatorError`] if the vehicle does not acknowledge.
    fn move_down(&mut self) -> Result<(), ActuatorError>;

    /// Flip in `direction`.
    ///
    /// # Errors
    /// Returns [`ActuatorError`] if the vehicle does not acknowledge.
    fn flip(&mut self, direction: Direction) -> Result<(), ActuatorError>;

    /// Whether the vehicle reports itself in the air.
    fn is_airborne(&self) -> bool;

    /// Distance used by the preset sweeps.
    fn preset_distance_cm(&self) -> u32 {
        20
    }

    /// Preset A: out-and-back sweep.
    ///
    /// # Errors
    /// Propagates the first failing primitive.
    fn preset_maneuver_a(&mut self) -> Result<(), ActuatorError> {
        let d = self.preset_distance_cm();
        self.move_by(Direction::Forward, d)?;
        self.move_by(Direction::Back, d)
    }

    /// Preset B: flip left, then flip right.
    ///
    /// # Errors
    /// Propagates the first failing primitive.
    fn preset_maneuver_b(&mut self) -> Result<(), ActuatorError> {
        self.flip_left()?;
        self.flip_right()
    }

    fn move_forward(&mut self, distance_cm: u32) -> Result<(), ActuatorError> {
        self.move_by(Direction::Forward, distance_cm)
    }

    fn move_back(&mut self, distance_cm: u32) -> Result<(), ActuatorError> {
        self.move_by(Direction::Back, distance_cm)
    }

    fn move_left(&mut self, distance_cm: u32) -> Result<(), ActuatorError> {
        self.move_by(Direction::Left, distance_cm)
    }

    fn move_right(&mut self, distance_cm: u32) -> Result<(), ActuatorError> {
        self.move_by(Direction::Right, distance_cm)
    }

    fn flip_forward(&mut self) -> Result<(), ActuatorError> {
        self.flip(Direction::Forward)
    }

    fn flip_backward(&mut self) -> Result<(), ActuatorError> {
        self.flip(Direction::Back)
    }

    fn flip_left(&mut self) -> Result<(), ActuatorError> {
        self.flip(Direction::Left)
    }

    fn flip_right(&mut self) -> Result<(), ActuatorError> {
        self.flip(Direction::Right)
    }
}
