use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use nf_core::config::PipelineConfig;
use nf_flight::actuator::TELLO_ADDR;

/// neuroflight: EEG band power to drone commands.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// TOML configuration file, watched for changes.
    #[arg(short, long, default_value = "config/default.toml")]
    pub config: PathBuf,

    /// EEG channel to analyze (overrides the file).
    #[arg(long)]
    pub channel: Option<usize>,

    /// Bandpass lower cutoff in Hz (overrides the file).
    #[arg(long)]
    pub lower: Option<f64>,

    /// Bandpass upper cutoff in Hz (overrides the file).
    #[arg(long)]
    pub upper: Option<f64>,

    /// Flight mode index: 1 = out-and-back, 2 = flip pair, other = forward move.
    #[arg(long)]
    pub mode: Option<u8>,

    /// Vehicle driver.
    #[arg(long, value_enum, default_value_t = ActuatorKind::Sim)]
    pub actuator: ActuatorKind,

    /// Tello command address.
    #[arg(long, default_value = TELLO_ADDR)]
    pub tello_addr: SocketAddr,

    /// Seconds to wait for each Tello reply.
    #[arg(long, default_value_t = 7.0)]
    pub tello_timeout: f64,

    /// Simulated per-command latency in milliseconds.
    #[arg(long, default_value_t = 0)]
    pub sim_latency_ms: u64,

    /// Seed of the synthetic EEG generator.
    #[arg(long)]
    pub seed: Option<u64>,

    /// Run without the dashboard; stop with Ctrl-C.
    #[arg(long)]
    pub headless: bool,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long, default_value = "warn")]
    pub log_level: String,

    /// Log file used while the dashboard owns the terminal.
    #[arg(long, default_value = "neuroflight.log")]
    pub log_file: PathBuf,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ActuatorKind {
    /// Log commands only.
    Sim,
    /// DJI Tello over the UDP text SDK.
    Tello,
}

/// Command-line values that win over the configuration file.
///
/// Reapplied on every hot reload so a file edit never undoes them.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Overrides {
    pub channel: Option<usize>,
    pub lower_cutoff_hz: Option<f64>,
    pub upper_cutoff_hz: Option<f64>,
    pub mode: Option<u8>,
}

impl Overrides {
    pub fn apply(&self, config: &mut PipelineConfig) {
        if let Some(channel) = self.channel {
            config.channel = channel;
        }
        if let Some(lower) = self.lower_cutoff_hz {
            config.lower_cutoff_hz = lower;
        }
        if let Some(upper) = self.upper_cutoff_hz {
            config.upper_cutoff_hz = upper;
        }
        if let Some(mode) = self.mode {
            config.mode = mode;
        }
    }
}

impl Cli {
    #[must_use]
    pub fn overrides(&self) -> Overrides {
        Overrides {
            channel: self.channel,
            lower_cutoff_hz: self.lower,
            upper_cutoff_hz: self.upper,
            mode: self.mode,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_run_simulated_with_dashboard() {
        let cli = Cli::parse_from(["neuroflight"]);
        assert_eq!(cli.actuator, ActuatorKind::Sim);
        assert!(!cli.headless);
        assert_eq!(cli.tello_addr.to_string(), TELLO_ADDR);
        assert_eq!(cli.log_level, "warn");
        assert_eq!(cli.overrides(), Overrides::default());
    }

    #[test]
    fn overrides_replace_only_given_fields() {
        let cli = Cli::parse_from([
            "neuroflight",
            "--channel",
            "3",
            "--upper",
            "40",
            "--mode",
            "2",
            "--actuator",
            "tello",
        ]);
        assert_eq!(cli.actuator, ActuatorKind::Tello);

        let mut config = PipelineConfig::default();
        cli.overrides().apply(&mut config);
        assert_eq!(config.channel, 3);
        assert_eq!(config.upper_cutoff_hz, 40.0);
        assert_eq!(config.mode, 2);
        assert_eq!(config.lower_cutoff_hz, PipelineConfig::default().lower_cutoff_hz);
    }

    #[test]
    fn rejects_unknown_actuator() {
        assert!(Cli::try_parse_from(["neuroflight", "--actuator", "plane"]).is_err());
    }
}
