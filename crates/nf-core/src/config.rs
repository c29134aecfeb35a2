use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::signal::Band;

/// Alpha thresholds above this value activate the alpha clamp guard.
pub const ALPHA_CLAMP_GUARD: f64 = 1.0;
/// Beta thresholds above this value activate the beta clamp guard.
pub const BETA_CLAMP_GUARD: f64 = 50.0;

/// Numerical integration rule for band power.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
pub enum Integration {
    /// Composite Simpson's rule (even point counts averaged).
    #[default]
    Simpson,
    /// Composite trapezoidal rule.
    Trapezoid,
}

/// Complete pipeline configuration, hot-reloadable.
///
/// Serialisable to TOML. Every field has a sane default.
///
/// # Example
/// ```
/// use nf_core::config::PipelineConfig;
/// let config = PipelineConfig::default();
/// assert_eq!(config.window_len(), 125);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct PipelineConfig {
    // === Signal ===
    /// Sensor sampling rate in Hz. Also the Welch window length in samples.
    pub sampling_rate_hz: f64,
    /// Channel index analysed.
    pub channel: usize,
    /// Mains interference frequency removed by the notch.
    pub notch_hz: f64,
    /// Notch quality factor.
    pub notch_quality: f64,
    /// Bandpass lower cutoff in Hz.
    pub lower_cutoff_hz: f64,
    /// Bandpass upper cutoff in Hz.
    pub upper_cutoff_hz: f64,
    /// Butterworth order of each bandpass edge.
    pub bandpass_order: usize,

    // === Spectrum ===
    /// Non-maximum suppression radius in bins.
    pub nms_radius: usize,
    /// Integration rule for band power.
    pub integration: Integration,

    // === Bands ===
    /// Band scored as relative power.
    pub alpha_band: Band,
    /// Band scored as absolute power.
    pub beta_band: Band,

    // === Classifier ===
    pub alpha_threshold: f64,
    pub beta_threshold: f64,

    // === Scaler ===
    /// Acknowledges that `alpha_threshold` activates the alpha clamp.
    pub alpha_clamp: bool,
    /// Acknowledges that `beta_threshold` activates the beta clamp.
    pub beta_clamp: bool,

    // === Stream ===
    /// Bounded wait of one acquisition pull.
    pub pull_timeout_secs: f64,
    /// Per-pull wait while flushing.
    pub flush_timeout_secs: f64,
    /// Upper bound on pulls per flush.
    pub max_flush_pulls: usize,

    // === Flight ===
    /// Initial maneuver mode index (1, 2, other).
    pub mode: u8,
    /// Distance of the forward move and manual moves.
    pub move_distance_cm: u32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            sampling_rate_hz: 125.0,
            channel: 0,
            notch_hz: 50.0,
            notch_quality: 30.0,
            lower_cutoff_hz: 5.0,
            upper_cutoff_hz: 50.0,
            bandpass_order: 5,
            nms_radius: 5,
            integration: Integration::Simpson,
            alpha_band: Band::new("alpha", 8.0, 12.0),
            beta_band: Band::new("beta", 15.0, 30.0),
            alpha_threshold: 0.6,
            beta_threshold: 20.0,
            alpha_clamp: false,
            beta_clamp: false,
            pull_timeout_secs: 1.0,
            flush_timeout_secs: 0.01,
            max_flush_pulls: 64,
            mode: 1,
            move_distance_cm: 20,
        }
    }
}

impl PipelineConfig {
    /// Analysis window length in samples (one second of data).
    #[must_use]
    pub fn window_len(&self) -> usize {
        self.sampling_rate_hz.round().max(0.0) as usize
    }

    /// Nyquist frequency in Hz.
    #[must_use]
    pub fn nyquist_hz(&self) -> f64 {
        self.sampling_rate_hz / 2.0
    }

    /// Whether the configured alpha threshold arms the alpha clamp guard.
    #[must_use]
    pub fn alpha_clamp_required(&self) -> bool {
        self.alpha_threshold > ALPHA_CLAMP_GUARD
    }

    /// Whether the configured beta threshold arms the beta clamp guard.
    #[must_use]
    pub fn beta_clamp_required(&self) -> bool {
        self.beta_threshold > BETA_CLAMP_GUARD
    }

    /// Check cross-field consistency.
    ///
    /// Filter cutoffs are checked again when the filters are designed; this
    /// covers what filter design cannot see: thresholds, band ordering,
    /// timeouts, and the clamp acknowledgements.
    ///
    /// # Errors
    /// Returns [`CoreError::Config`] describing the first violation found.
    pub fn validate(&self) -> Result<(), CoreError> {
        if !(self.sampling_rate_hz.is_finite() && self.window_len() >= 4) {
            return Err(CoreError::Config(format!(
                "sampling rate {} Hz is too low for spectral analysis",
                self.sampling_rate_hz
            )));
        }
        for band in [&self.alpha_band, &self.beta_band] {
            if !(band.low_hz >= 0.0 && band.low_hz < band.high_hz) {
                return Err(CoreError::Config(format!(
                    "band {} must satisfy 0 <= low < high (got {}..{} Hz)",
                    band.name, band.low_hz, band.high_hz
                )));
            }
        }
        for (name, t) in [
            ("alpha_threshold", self.alpha_threshold),
            ("beta_threshold", self.beta_threshold),
        ] {
            if !(t.is_finite() && t > 0.0) {
                return Err(CoreError::Config(format!("{name} must be positive (got {t})")));
            }
        }
        if self.alpha_clamp != self.alpha_clamp_required() {
            return Err(CoreError::Config(format!(
                "alpha_threshold {} {} the alpha clamp guard (> {ALPHA_CLAMP_GUARD}); set scaler.alpha_clamp = {} to acknowledge",
                self.alpha_threshold,
                if self.alpha_clamp_required() { "arms" } else { "disarms" },
                self.alpha_clamp_required()
            )));
        }
        if self.beta_clamp != self.beta_clamp_required() {
            return Err(CoreError::Config(format!(
                "beta_threshold {} {} the beta clamp guard (> {BETA_CLAMP_GUARD}); set scaler.beta_clamp = {} to acknowledge",
                self.beta_threshold,
                if self.beta_clamp_required() { "arms" } else { "disarms" },
                self.beta_clamp_required()
            )));
        }
        if self.nms_radius == 0 {
            return Err(CoreError::Config("nms_radius must be at least 1 bin".into()));
        }
        let timeout_ok = |t: f64| t.is_finite() && t > 0.0;
        if !(timeout_ok(self.pull_timeout_secs) && timeout_ok(self.flush_timeout_secs)) {
            return Err(CoreError::Config("stream timeouts must be positive and finite".into()));
        }
        if self.max_flush_pulls == 0 {
            return Err(CoreError::Config("max_flush_pulls must be at least 1".into()));
        }
        Ok(())
    }
}

/// Intermediate TOML structure, every section optional.
#[derive(Deserialize)]
struct ConfigFile {
    signal: Option<SignalSection>,
    spectrum: Option<SpectrumSection>,
    bands: Option<BandsSection>,
    classifier: Option<ClassifierSection>,
    scaler: Option<ScalerSection>,
    stream: Option<StreamSection>,
    flight: Option<FlightSection>,
}

#[derive(Deserialize)]
struct SignalSection {
    sampling_rate_hz: Option<f64>,
    channel: Option<usize>,
    notch_hz: Option<f64>,
    notch_quality: Option<f64>,
    lower_cutoff_hz: Option<f64>,
    upper_cutoff_hz: Option<f64>,
    bandpass_order: Option<usize>,
}

#[derive(Deserialize)]
struct SpectrumSection {
    nms_radius: Option<usize>,
    integration: Option<Integration>,
}

#[derive(Deserialize)]
struct BandsSection {
    alpha: Option<BandSection>,
    beta: Option<BandSection>,
}

#[derive(Deserialize)]
struct BandSection {
    low_hz: Option<f64>,
    high_hz: Option<f64>,
}

#[derive(Deserialize)]
struct ClassifierSection {
    alpha_threshold: Option<f64>,
    beta_threshold: Option<f64>,
}

#[derive(Deserialize)]
struct ScalerSection {
    alpha_clamp: Option<bool>,
    beta_clamp: Option<bool>,
}

#[derive(Deserialize)]
struct StreamSection {
    pull_timeout_secs: Option<f64>,
    flush_timeout_secs: Option<f64>,
    max_flush_pulls: Option<usize>,
}

#[derive(Deserialize)]
struct FlightSection {
    mode: Option<u8>,
    move_distance_cm: Option<u32>,
}

fn merge_band(band: &mut Band, section: Option<BandSection>) {
    if let Some(s) = section {
        if let Some(v) = s.low_hz {
            band.low_hz = v;
        }
        if let Some(v) = s.high_hz {
            band.high_hz = v;
        }
    }
}

/// Parse TOML text and merge it over the defaults.
///
/// # Errors
/// Returns an error if the text is not valid TOML or the merged
/// configuration fails [`PipelineConfig::validate`].
pub fn parse_config(content: &str) -> Result<PipelineConfig> {
    let file: ConfigFile = toml::from_str(content).context("TOML parse error")?;
    let mut config = PipelineConfig::default();

    if let Some(s) = file.signal {
        if let Some(v) = s.sampling_rate_hz {
            config.sampling_rate_hz = v;
        }
        if let Some(v) = s.channel {
            config.channel = v;
        }
        if let Some(v) = s.notch_hz {
            config.notch_hz = v;
        }
        if let Some(v) = s.notch_quality {
            config.notch_quality = v;
        }
        if let Some(v) = s.lower_cutoff_hz {
            config.lower_cutoff_hz = v;
        }
        if let Some(v) = s.upper_cutoff_hz {
            config.upper_cutoff_hz = v;
        }
        if let Some(v) = s.bandpass_order {
            config.bandpass_order = v;
        }
    }

    if let Some(s) = file.spectrum {
        if let Some(v) = s.nms_radius {
            config.nms_radius = v;
        }
        if let Some(v) = s.integration {
            config.integration = v;
        }
    }

    if let Some(b) = file.bands {
        merge_band(&mut config.alpha_band, b.alpha);
        merge_band(&mut config.beta_band, b.beta);
    }

    if let Some(c) = file.classifier {
        if let Some(v) = c.alpha_threshold {
            config.alpha_threshold = v;
        }
        if let Some(v) = c.beta_threshold {
            config.beta_threshold = v;
        }
    }

    if let Some(s) = file.scaler {
        if let Some(v) = s.alpha_clamp {
            config.alpha_clamp = v;
        }
        if let Some(v) = s.beta_clamp {
            config.beta_clamp = v;
        }
    }

    if let Some(s) = file.stream {
        if let Some(v) = s.pull_timeout_secs {
            config.pull_timeout_secs = v;
        }
        if let Some(v) = s.flush_timeout_secs {
            config.flush_timeout_secs = v;
        }
        if let Some(v) = s.max_flush_pulls {
            config.max_flush_pulls = v;
        }
    }

    if let Some(f) = file.flight {
        if let Some(v) = f.mode {
            config.mode = v;
        }
        if let Some(v) = f.move_distance_cm {
            config.move_distance_cm = v;
        }
    }

    config.validate()?;
    Ok(config)
}

/// Load a TOML file and merge it with the defaults.
///
/// # Errors
/// Returns an error if the file cannot be read, parsed, or validated.
///
/// # Example
/// ```no_run
/// use nf_core::config::load_config;
/// use std::path::Path;
/// let config = load_config(Path::new("config/default.toml")).unwrap();
/// ```
pub fn load_config(path: &Path) -> Result<PipelineConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read {}", path.display()))?;
    parse_config(&content).with_context(|| format!("invalid config in {}", path.display()))
}
