use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use anyhow::Context;
use arc_swap::ArcSwap;
use flume::{Receiver, Sender};
use nf_core::command::ManualCommand;
use nf_core::config::PipelineConfig;
use nf_core::display::DisplayBoard;
use nf_core::session::{ModeSelector, SessionLock};
use nf_core::signal::SampleChunk;
use nf_flight::{SessionContext, SessionReport, SimulatedActuator, TelloActuator, spawn_session};
use nf_source::{ChannelSource, SyntheticConfig, spawn_synthetic_source};

use crate::cli::{ActuatorKind, Cli};

/// Everything the front end holds while a session runs.
pub struct Pipeline {
    pub config: Arc<ArcSwap<PipelineConfig>>,
    /// Channels produced by the source.
    pub channels: usize,
    pub lock: Arc<SessionLock>,
    pub modes: Arc<ModeSelector>,
    pub board: Arc<DisplayBoard>,
    pub manual: Sender<ManualCommand>,
    pub worker: JoinHandle<SessionReport>,
    pub source: JoinHandle<()>,
    /// Stops the generator; engaged only once the worker has landed.
    source_stop: Arc<SessionLock>,
}

impl Pipeline {
    /// Wait for the worker, then stop the generator.
    ///
    /// # Errors
    /// Returns an error if the worker thread died without a report.
    pub fn join(self) -> anyhow::Result<SessionReport> {
        let report = self.worker.join();
        self.source_stop.engage();
        let report = report.map_err(|_| anyhow::anyhow!("flight worker terminated abnormally"))?;
        if self.source.join().is_err() {
            log::warn!("Synthetic source thread panicked");
        }
        Ok(report)
    }
}

/// Generator settings matching the pipeline's sampling rate.
#[must_use]
pub fn synthetic_config(cli: &Cli, config: &PipelineConfig) -> SyntheticConfig {
    let defaults = SyntheticConfig::default();
    SyntheticConfig {
        sampling_rate_hz: config.sampling_rate_hz,
        channels: defaults.channels.max(config.channel + 1),
        seed: cli.seed.unwrap_or(defaults.seed),
        ..defaults
    }
}

/// Start the synthetic source, connect the actuator and spawn the worker.
///
/// # Errors
/// Returns an error if a thread cannot be spawned or the Tello handshake fails.
pub fn start(
    cli: &Cli,
    config: &Arc<ArcSwap<PipelineConfig>>,
    lock: Arc<SessionLock>,
    modes: Arc<ModeSelector>,
) -> anyhow::Result<Pipeline> {
    let board = Arc::new(DisplayBoard::new());
    let (manual_tx, manual_rx) = flume::unbounded();
    let ctx = SessionContext {
        config: Arc::clone(config),
        lock: Arc::clone(&lock),
        modes: Arc::clone(&modes),
        board: Arc::clone(&board),
        manual: manual_rx,
    };

    let settings = synthetic_config(cli, &config.load());
    let channels = settings.channels;
    let source_stop = Arc::new(SessionLock::new());

    // Connect before any sample flows, so a missing drone aborts cleanly.
    let (worker, source) = match cli.actuator {
        ActuatorKind::Sim => {
            log::info!("Using simulated actuator");
            let sim = SimulatedActuator::with_latency(Duration::from_millis(cli.sim_latency_ms));
            let (rx, source) = start_source(settings, &source_stop)?;
            let handle = spawn_session(ChannelSource::new(rx), sim, ctx)?;
            (handle, source)
        }
        ActuatorKind::Tello => {
            let timeout = Duration::try_from_secs_f64(cli.tello_timeout)
                .context("invalid --tello-timeout")?;
            let tello = TelloActuator::connect(cli.tello_addr, timeout)
                .with_context(|| format!("cannot reach Tello at {}", cli.tello_addr))?;
            let (rx, source) = start_source(settings, &source_stop)?;
            let handle = spawn_session(ChannelSource::new(rx), tello, ctx)?;
            (handle, source)
        }
    };

    Ok(Pipeline {
        config: Arc::clone(config),
        channels,
        lock,
        modes,
        board,
        manual: manual_tx,
        worker,
        source,
        source_stop,
    })
}

fn start_source(
    settings: SyntheticConfig,
    stop: &Arc<SessionLock>,
) -> anyhow::Result<(Receiver<SampleChunk>, JoinHandle<()>)> {
    log::info!(
        "Starting synthetic EEG source: {} channels at {} Hz",
        settings.channels,
        settings.sampling_rate_hz
    );
    spawn_synthetic_source(settings, Arc::clone(stop))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use nf_flight::SessionExit;

    #[test]
    fn generator_covers_the_selected_channel() {
        let cli = Cli::parse_from(["neuroflight", "--seed", "7"]);
        let config = PipelineConfig {
            channel: 11,
            ..PipelineConfig::default()
        };
        let settings = synthetic_config(&cli, &config);
        assert_eq!(settings.channels, 12);
        assert_eq!(settings.seed, 7);
        assert_eq!(settings.sampling_rate_hz, config.sampling_rate_hz);
    }

    #[test]
    fn simulated_session_stops_on_lock() {
        let cli = Cli::parse_from(["neuroflight", "--headless"]);
        let config = Arc::new(ArcSwap::from_pointee(PipelineConfig::default()));
        let lock = Arc::new(SessionLock::new());
        let modes = Arc::new(ModeSelector::new(1));

        let pipeline = start(&cli, &config, Arc::clone(&lock), modes).unwrap();
        std::thread::sleep(Duration::from_millis(200));
        lock.engage();
        // The generator outlives the stop so the worker never sees a closed stream.
        std::thread::sleep(Duration::from_millis(300));
        assert!(!pipeline.source.is_finished());

        let report = pipeline.join().unwrap();
        assert!(matches!(report.exit, SessionExit::Stopped));
        assert!(report.landing_ok);
    }
}
