// Sensor acquisition: stream reader, channel-backed source, synthetic EEG generator.

pub mod channel;
pub mod stream;
pub mod synthetic;

pub use channel::ChannelSource;
pub use stream::StreamReader;
pub use synthetic::{Phase, PhaseKind, SyntheticConfig, SyntheticEeg, spawn_synthetic_source};
