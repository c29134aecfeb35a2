use thiserror::Error;

/// Errors originating from the core module.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Invalid configuration value or structure.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// A spectrum was built from mismatched or empty sequences.
    #[error("invalid spectrum: {frequencies} frequency bins for {power} power values")]
    InvalidSpectrum {
        /// Number of frequency bins supplied.
        frequencies: usize,
        /// Number of power values supplied.
        power: usize,
    },
}

/// Failure reported by the vehicle actuator driver.
///
/// Every variant is fatal to the flight session: the worker emergency-lands
/// and stops. Commands are never retried.
#[derive(Error, Debug)]
pub enum ActuatorError {
    /// The vehicle could not be reached.
    #[error("actuator link failure: {0}")]
    Link(String),

    /// The vehicle answered, but refused or failed the command.
    #[error("command `{command}` rejected: {reply}")]
    Rejected {
        /// Command as sent to the vehicle.
        command: String,
        /// Reply received instead of an acknowledgement.
        reply: String,
    },

    /// No acknowledgement within the configured timeout.
    #[error("command `{0}` timed out")]
    Timeout(String),
}

/// Failure of the sensor stream source.
///
/// An empty pull is *not* an error; it only means no data arrived in time.
#[derive(Error, Debug)]
pub enum SourceError {
    /// The producer side of the stream is gone for good.
    #[error("sensor stream disconnected")]
    Disconnected,

    /// Transport-level failure while pulling samples.
    #[error("sensor stream error: {0}")]
    Stream(String),
}
