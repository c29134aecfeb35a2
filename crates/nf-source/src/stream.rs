use std::time::Duration;

use nf_core::config::PipelineConfig;
use nf_core::display::StreamStatus;
use nf_core::error::SourceError;
use nf_core::signal::SampleChunk;
use nf_core::traits::{BufferFlush, SensorSource};

/// Pulls one analysis window per cycle and tracks stream health.
///
/// Stall and resume are logged on the transition only; idle cycles stay
/// quiet.
pub struct StreamReader<S> {
    source: S,
    window_len: usize,
    pull_timeout: Duration,
    flush_timeout: Duration,
    max_flush_pulls: usize,
    status: StreamStatus,
}

impl<S: SensorSource> StreamReader<S> {
    #[must_use]
    pub fn new(source: S, config: &PipelineConfig) -> Self {
        let mut reader = Self {
            source,
            window_len: 0,
            pull_timeout: Duration::ZERO,
            flush_timeout: Duration::ZERO,
            max_flush_pulls: 0,
            status: StreamStatus::Waiting,
        };
        reader.reconfigure(config);
        reader
    }

    /// Adopt window length and timeouts from a new configuration.
    pub fn reconfigure(&mut self, config: &PipelineConfig) {
        self.window_len = config.window_len();
        self.pull_timeout = secs(config.pull_timeout_secs);
        self.flush_timeout = secs(config.flush_timeout_secs);
        self.max_flush_pulls = config.max_flush_pulls.max(1);
    }

    #[must_use]
    pub fn status(&self) -> StreamStatus {
        self.status
    }

    /// Pull the next chunk, waiting at most the pull timeout.
    ///
    /// # Errors
    /// Propagates [`SourceError`] from the source.
    pub fn next_chunk(&mut self) -> Result<SampleChunk, SourceError> {
        let chunk = self.source.pull_chunk(self.window_len, self.pull_timeout)?;
        self.track(&chunk);
        Ok(chunk)
    }

    fn track(&mut self, chunk: &SampleChunk) {
        let next = if chunk.is_empty() {
            match self.status {
                StreamStatus::Waiting => StreamStatus::Waiting,
                StreamStatus::Receiving | StreamStatus::Stalled => StreamStatus::Stalled,
            }
        } else {
            StreamStatus::Receiving
        };
        match (self.status, next) {
            (StreamStatus::Receiving, StreamStatus::Stalled) => {
                log::warn!("Sensor stream stalled (no data within {:?})", self.pull_timeout);
            }
            (StreamStatus::Stalled, StreamStatus::Receiving) => {
                log::info!("Sensor stream resumed");
            }
            (StreamStatus::Waiting, StreamStatus::Receiving) => {
                log::info!("Sensor stream receiving");
            }
            _ => {}
        }
        self.status = next;
    }

    /// Mutable access to the wrapped source.
    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }
}

fn secs(value: f64) -> Duration {
    Duration::try_from_secs_f64(value).unwrap_or(Duration::ZERO)
}

impl<S: SensorSource> BufferFlush for StreamReader<S> {
    fn flush(&mut self) -> usize {
        let mut discarded = 0;
        for _ in 0..self.max_flush_pulls {
            match self.source.pull_chunk(self.window_len, self.flush_timeout) {
                Ok(chunk) if !chunk.is_empty() => discarded += chunk.len(),
                // Drained, or broken: the next regular pull reports the error.
                Ok(_) | Err(_) => break,
            }
        }
        log::debug!("Flushed {discarded} queued samples");
        discarded
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    /// Replays a script of chunk sizes; `None` is a disconnect.
    struct Scripted {
        script: VecDeque<Option<usize>>,
        pulls: usize,
    }

    impl Scripted {
        fn new(script: &[Option<usize>]) -> Self {
            Self {
                script: script.iter().copied().collect(),
                pulls: 0,
            }
        }
    }

    impl SensorSource for Scripted {
        fn pull_chunk(&mut self, max: usize, _t: Duration) -> Result<SampleChunk, SourceError> {
            self.pulls += 1;
            match self.script.pop_front() {
                Some(Some(n)) => {
                    let n = n.min(max);
                    Ok(SampleChunk::new(vec![vec![0.0]; n], vec![0.0; n]))
                }
                Some(None) => Err(SourceError::Disconnected),
                None => Ok(SampleChunk::empty()),
            }
        }
    }

    /// Never runs dry.
    struct Firehose;

    impl SensorSource for Firehose {
        fn pull_chunk(&mut self, max: usize, _t: Duration) -> Result<SampleChunk, SourceError> {
            Ok(SampleChunk::new(vec![vec![1.0]; max], vec![0.0; max]))
        }
    }

    #[test]
    fn stall_and_resume_are_edge_triggered() {
        let script = [Some(0), Some(125), Some(0), Some(0), Some(125), Some(125)];
        let mut reader = StreamReader::new(Scripted::new(&script), &PipelineConfig::default());
        let mut seen = Vec::new();
        for _ in 0..script.len() {
            reader.next_chunk().unwrap();
            seen.push(reader.status());
        }
        use StreamStatus::{Receiving, Stalled, Waiting};
        assert_eq!(seen, vec![Waiting, Receiving, Stalled, Stalled, Receiving, Receiving]);
    }

    #[test]
    fn pulls_one_window() {
        let mut reader = StreamReader::new(Scripted::new(&[Some(500)]), &PipelineConfig::default());
        assert_eq!(reader.next_chunk().unwrap().len(), 125);
    }

    #[test]
    fn disconnect_is_an_error() {
        let mut reader = StreamReader::new(Scripted::new(&[None]), &PipelineConfig::default());
        assert!(matches!(reader.next_chunk(), Err(SourceError::Disconnected)));
    }

    #[test]
    fn flush_stops_when_drained() {
        let mut reader = StreamReader::new(
            Scripted::new(&[Some(10), Some(20), Some(0), Some(125)]),
            &PipelineConfig::default(),
        );
        assert_eq!(reader.flush(), 30);
        assert_eq!(reader.source_mut().pulls, 3);
        // The chunk after the gap is left for analysis.
        assert_eq!(reader.next_chunk().unwrap().len(), 125);
    }

    #[test]
    fn flush_terminates_against_endless_source() {
        let config = PipelineConfig {
            max_flush_pulls: 4,
            ..PipelineConfig::default()
        };
        let mut reader = StreamReader::new(Firehose, &config);
        assert_eq!(reader.flush(), 4 * 125);
    }

    #[test]
    fn flush_swallows_disconnect() {
        let mut reader = StreamReader::new(Scripted::new(&[Some(5), None]), &PipelineConfig::default());
        assert_eq!(reader.flush(), 5);
    }
}
