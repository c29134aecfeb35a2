use nf_core::CoreError;
use thiserror::Error;

/// Errors originating from the analysis pipeline.
///
/// All of them are recoverable: the worker skips the cycle and keeps going.
#[derive(Error, Debug)]
pub enum DspError {
    /// Cutoffs inverted or outside `(0, fs/2)`.
    #[error("invalid band {low_hz}..{high_hz} Hz (Nyquist {nyquist_hz} Hz)")]
    InvalidBand {
        low_hz: f64,
        high_hz: f64,
        nyquist_hz: f64,
    },

    /// Filter parameter that cannot yield a stable design.
    #[error("invalid filter: {0}")]
    InvalidFilter(String),

    /// Fewer samples than one analysis window.
    #[error("need {needed} samples for one analysis window, got {got}")]
    InsufficientSamples { needed: usize, got: usize },

    /// No spectrum bin falls inside the requested band.
    #[error("no spectrum bin within {low_hz}..{high_hz} Hz")]
    DegenerateBand { low_hz: f64, high_hz: f64 },

    /// Whole-spectrum power integrates to zero; relative power is undefined.
    #[error("total spectral power is zero")]
    ZeroTotalPower,

    /// The selected channel is missing from the chunk.
    #[error("channel {channel} not present in every sample")]
    ChannelOutOfRange { channel: usize },

    /// FFT backend failure.
    #[error("FFT failure: {0}")]
    Fft(String),

    #[error(transparent)]
    Core(#[from] CoreError),
}
