use nf_core::error::{ActuatorError, SourceError};
use nf_dsp::DspError;
use thiserror::Error;

/// Why a flight session ended early.
///
/// Every variant is fatal to the session: the worker emergency-lands, runs
/// its guaranteed landing and exits. The process keeps running.
#[derive(Error, Debug)]
pub enum SessionError {
    #[error(transparent)]
    Actuator(#[from] ActuatorError),

    #[error(transparent)]
    Source(#[from] SourceError),

    /// The initial configuration could not produce an analyzer.
    #[error("analysis setup failed: {0}")]
    Setup(#[from] DspError),

    /// A cycle panicked.
    #[error("worker cycle panicked: {0}")]
    Panic(String),
}
