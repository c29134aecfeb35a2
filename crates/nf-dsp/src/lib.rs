// Filtering, spectral estimation and classification for neuroflight.

pub mod analysis;
pub mod band;
pub mod classifier;
pub mod error;
pub mod filter;
pub mod peaks;
pub mod psd;
pub mod scaler;

pub use analysis::{Analysis, Analyzer, Decision};
pub use error::DspError;
