use std::f64::consts::PI;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use flume::{Receiver, TrySendError};
use nf_core::session::SessionLock;
use nf_core::signal::SampleChunk;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Mental state simulated by one phase of the script.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PhaseKind {
    /// Strong 10 Hz rhythm (eyes closed).
    Relaxed,
    /// Background activity only.
    Calm,
    /// Strong 20 Hz rhythm (concentration).
    Focused,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Phase {
    pub kind: PhaseKind,
    pub duration_secs: f64,
}

impl Phase {
    #[must_use]
    pub fn new(kind: PhaseKind, duration_secs: f64) -> Self {
        Self {
            kind,
            duration_secs,
        }
    }
}

/// Generator settings.
#[derive(Clone, Debug, PartialEq)]
pub struct SyntheticConfig {
    pub sampling_rate_hz: f64,
    pub channels: usize,
    /// Samples per emitted block.
    pub block_len: usize,
    /// Played in a loop.
    pub script: Vec<Phase>,
    pub seed: u64,
    /// Mains interference amplitude (µV).
    pub hum_uv: f64,
    /// Uniform background noise amplitude (µV).
    pub noise_uv: f64,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            sampling_rate_hz: 125.0,
            channels: 8,
            block_len: 16,
            script: vec![
                Phase::new(PhaseKind::Calm, 6.0),
                Phase::new(PhaseKind::Relaxed, 2.0),
                Phase::new(PhaseKind::Calm, 6.0),
                Phase::new(PhaseKind::Focused, 3.0),
                Phase::new(PhaseKind::Calm, 6.0),
                Phase::new(PhaseKind::Relaxed, 2.0),
            ],
            seed: 0x5EED,
            hum_uv: 5.0,
            noise_uv: 3.0,
        }
    }
}

/// Deterministic multi-channel EEG-like signal.
///
/// Every channel carries the phase rhythm at a slightly lower gain than the
/// previous one, plus 50 Hz hum and independent uniform noise.
///
/// # Example
/// ```
/// use nf_source::{SyntheticConfig, SyntheticEeg};
/// let mut eeg = SyntheticEeg::new(SyntheticConfig::default());
/// let block = eeg.next_block();
/// assert_eq!(block.len(), 16);
/// assert_eq!(block.samples[0].len(), 8);
/// ```
pub struct SyntheticEeg {
    config: SyntheticConfig,
    rng: StdRng,
    sample_index: u64,
    script_len_secs: f64,
}

impl SyntheticEeg {
    #[must_use]
    pub fn new(config: SyntheticConfig) -> Self {
        let script_len_secs = config.script.iter().map(|p| p.duration_secs.max(0.0)).sum();
        Self {
            rng: StdRng::seed_from_u64(config.seed),
            config,
            sample_index: 0,
            script_len_secs,
        }
    }

    /// Phase active at time `t` (seconds since start).
    #[must_use]
    pub fn phase_at(&self, t: f64) -> PhaseKind {
        if self.script_len_secs <= 0.0 {
            return PhaseKind::Calm;
        }
        let mut offset = t % self.script_len_secs;
        for phase in &self.config.script {
            if offset < phase.duration_secs {
                return phase.kind;
            }
            offset -= phase.duration_secs;
        }
        PhaseKind::Calm
    }

    pub fn next_block(&mut self) -> SampleChunk {
        let fs = self.config.sampling_rate_hz;
        let mut samples = Vec::with_capacity(self.config.block_len);
        let mut timestamps = Vec::with_capacity(self.config.block_len);

        for _ in 0..self.config.block_len {
            let t = self.sample_index as f64 / fs;
            let rhythm = match self.phase_at(t) {
                PhaseKind::Relaxed => 20.0 * (2.0 * PI * 10.0 * t).sin(),
                PhaseKind::Focused => 10.0 * (2.0 * PI * 20.0 * t).sin(),
                PhaseKind::Calm => 0.0,
            };
            let hum = self.config.hum_uv * (2.0 * PI * 50.0 * t).sin();
            let noise_uv = self.config.noise_uv;
            let sample = (0..self.config.channels)
                .map(|ch| {
                    let gain = 1.0 - 0.08 * ch as f64;
                    let noise = if noise_uv > 0.0 {
                        self.rng.gen_range(-noise_uv..=noise_uv)
                    } else {
                        0.0
                    };
                    gain * rhythm + hum + noise
                })
                .collect();
            samples.push(sample);
            timestamps.push(t);
            self.sample_index += 1;
        }

        SampleChunk::new(samples, timestamps)
    }
}

/// Spawn the generator thread, paced at the sampling rate.
///
/// Blocks are dropped when the bounded channel is full. The thread exits
/// once the receiver is gone or `stop` is engaged.
///
/// # Errors
/// Returns an error if the thread cannot be spawned.
pub fn spawn_synthetic_source(
    config: SyntheticConfig,
    stop: Arc<SessionLock>,
) -> anyhow::Result<(Receiver<SampleChunk>, JoinHandle<()>)> {
    let (tx, rx) = flume::bounded(64);
    let block_period =
        Duration::try_from_secs_f64(config.block_len as f64 / config.sampling_rate_hz)?;

    let handle = thread::Builder::new()
        .name("nf-synth".to_string())
        .spawn(move || {
            let mut eeg = SyntheticEeg::new(config);
            let mut dropped = 0u64;
            log::info!("Synthetic EEG source started");
            while !stop.is_engaged() {
                match tx.try_send(eeg.next_block()) {
                    Ok(()) => {}
                    Err(TrySendError::Full(_)) => dropped += 1,
                    Err(TrySendError::Disconnected(_)) => break,
                }
                thread::sleep(block_period);
            }
            log::info!("Synthetic EEG source stopped ({dropped} blocks dropped)");
        })?;

    Ok((rx, handle))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quiet(script: Vec<Phase>) -> SyntheticConfig {
        SyntheticConfig {
            script,
            hum_uv: 0.0,
            noise_uv: 0.0,
            ..SyntheticConfig::default()
        }
    }

    #[test]
    fn script_loops() {
        let eeg = SyntheticEeg::new(quiet(vec![
            Phase::new(PhaseKind::Relaxed, 1.0),
            Phase::new(PhaseKind::Focused, 1.0),
        ]));
        assert_eq!(eeg.phase_at(0.5), PhaseKind::Relaxed);
        assert_eq!(eeg.phase_at(1.5), PhaseKind::Focused);
        assert_eq!(eeg.phase_at(2.5), PhaseKind::Relaxed);
    }

    #[test]
    fn timestamps_are_contiguous() {
        let mut eeg = SyntheticEeg::new(SyntheticConfig::default());
        let a = eeg.next_block();
        let b = eeg.next_block();
        let step = 1.0 / 125.0;
        assert!((b.timestamps[0] - a.timestamps[15] - step).abs() < 1e-12);
    }

    #[test]
    fn same_seed_same_signal() {
        let mut a = SyntheticEeg::new(SyntheticConfig::default());
        let mut b = SyntheticEeg::new(SyntheticConfig::default());
        assert_eq!(a.next_block(), b.next_block());
    }

    #[test]
    fn calm_without_noise_is_silent() {
        let mut eeg = SyntheticEeg::new(quiet(vec![Phase::new(PhaseKind::Calm, 1.0)]));
        let block = eeg.next_block();
        assert!(block.samples.iter().flatten().all(|&v| v == 0.0));
    }

    #[test]
    fn thread_stops_on_lock() {
        let stop = Arc::new(SessionLock::new());
        let (rx, handle) = spawn_synthetic_source(SyntheticConfig::default(), Arc::clone(&stop)).unwrap();
        let first = rx.recv_timeout(Duration::from_secs(2)).unwrap();
        assert_eq!(first.samples[0].len(), 8);
        stop.engage();
        handle.join().unwrap();
    }
}
