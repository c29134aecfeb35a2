use std::time::{Duration, Instant};

use flume::{Receiver, RecvTimeoutError};
use nf_core::error::SourceError;
use nf_core::signal::SampleChunk;
use nf_core::traits::SensorSource;

/// [`SensorSource`] fed by a flume channel of sample blocks.
///
/// A pull gathers blocks until `max_samples` are available or the timeout
/// expires. Samples beyond `max_samples` stay pending for the next pull.
///
/// # Example
/// ```
/// use std::time::Duration;
/// use nf_core::signal::SampleChunk;
/// use nf_core::traits::SensorSource;
/// use nf_source::ChannelSource;
///
/// let (tx, rx) = flume::unbounded();
/// let mut source = ChannelSource::new(rx);
/// tx.send(SampleChunk::new(vec![vec![1.0]; 3], vec![0.0, 0.1, 0.2])).unwrap();
/// let chunk = source.pull_chunk(2, Duration::from_millis(10)).unwrap();
/// assert_eq!(chunk.len(), 2);
/// assert_eq!(source.pending(), 1);
/// ```
pub struct ChannelSource {
    rx: Receiver<SampleChunk>,
    pending: SampleChunk,
}

impl ChannelSource {
    #[must_use]
    pub fn new(rx: Receiver<SampleChunk>) -> Self {
        Self {
            rx,
            pending: SampleChunk::empty(),
        }
    }

    /// Samples received but not yet handed out.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.pending.len()
    }
}

impl SensorSource for ChannelSource {
    fn pull_chunk(
        &mut self,
        max_samples: usize,
        timeout: Duration,
    ) -> Result<SampleChunk, SourceError> {
        let deadline = Instant::now() + timeout;
        let mut out = std::mem::take(&mut self.pending);

        while out.len() < max_samples {
            match self.rx.recv_deadline(deadline) {
                Ok(block) => out.extend(block),
                Err(RecvTimeoutError::Timeout) => break,
                Err(RecvTimeoutError::Disconnected) => {
                    if out.is_empty() {
                        return Err(SourceError::Disconnected);
                    }
                    break;
                }
            }
        }

        if out.len() > max_samples {
            self.pending = out.split_off(max_samples);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block(start: usize, n: usize) -> SampleChunk {
        SampleChunk::new(
            (start..start + n).map(|i| vec![i as f64]).collect(),
            (start..start + n).map(|i| i as f64).collect(),
        )
    }

    #[test]
    fn accumulates_until_max() {
        let (tx, rx) = flume::unbounded();
        let mut source = ChannelSource::new(rx);
        for i in 0..4 {
            tx.send(block(i * 10, 10)).unwrap();
        }
        let chunk = source.pull_chunk(25, Duration::from_millis(50)).unwrap();
        assert_eq!(chunk.len(), 25);
        assert_eq!(source.pending(), 5);

        let rest = source.pull_chunk(25, Duration::from_millis(5)).unwrap();
        assert_eq!(rest.len(), 15);
        assert_eq!(rest.timestamps[0], 25.0);
    }

    #[test]
    fn timeout_without_data_is_empty() {
        let (_tx, rx) = flume::unbounded::<SampleChunk>();
        let mut source = ChannelSource::new(rx);
        let chunk = source.pull_chunk(10, Duration::from_millis(5)).unwrap();
        assert!(chunk.is_empty());
    }

    #[test]
    fn disconnect_drains_before_failing() {
        let (tx, rx) = flume::unbounded();
        let mut source = ChannelSource::new(rx);
        tx.send(block(0, 3)).unwrap();
        drop(tx);
        assert_eq!(source.pull_chunk(10, Duration::from_millis(5)).unwrap().len(), 3);
        assert!(matches!(
            source.pull_chunk(10, Duration::from_millis(5)),
            Err(SourceError::Disconnected)
        ));
    }
}
