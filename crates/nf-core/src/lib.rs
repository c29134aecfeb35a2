//! Configuration, shared types, and collaborator traits for neuroflight.
//!
//! This crate contains the data model exchanged between the acquisition,
//! analysis, flight and display crates of the workspace.

pub mod command;
pub mod config;
pub mod display;
pub mod error;
pub mod session;
pub mod signal;
pub mod traits;

pub use command::{CommandCode, FlightInput, FlightMode, FlightState, ManualCommand};
pub use config::PipelineConfig;
pub use display::{DisplayBoard, DisplayFrame, DisplaySnapshot, FlightStatus, StreamStatus};
pub use error::{ActuatorError, CoreError, SourceError};
pub use session::{ModeSelector, SessionLock};
pub use signal::{Band, BandScore, Peaks, PowerKind, SampleChunk, Spectrum};
pub use traits::{Actuator, BufferFlush, SensorSource};
