use nf_core::{BandScore, CommandCode, DisplayFrame, PipelineConfig, SampleChunk};

use crate::band::BandPowerScorer;
use crate::classifier::Classifier;
use crate::error::DspError;
use crate::filter::FilterStage;
use crate::peaks::PeakSelector;
use crate::psd::WelchEstimator;
use crate::scaler::SignalScaler;

/// What the flight side needs from one cycle.
#[derive(Clone, Debug, PartialEq)]
pub struct Decision {
    /// Relative alpha power.
    pub alpha: BandScore,
    /// Absolute beta power.
    pub beta: BandScore,
    pub alpha_scaled: f64,
    pub beta_scaled: f64,
    pub command: CommandCode,
}

/// Result of analysing one chunk.
///
/// `display` is published for the dashboard and never read back.
#[derive(Clone, Debug)]
pub struct Analysis {
    pub decision: Decision,
    pub display: DisplayFrame,
}

/// The full per-cycle chain for one configuration:
/// filter, Welch PSD, NMS peaks, band power, scaling, classification.
///
/// Built once per configuration; rebuilt by the worker when the
/// configuration changes.
pub struct Analyzer {
    channel: usize,
    filter: FilterStage,
    welch: WelchEstimator,
    peaks: PeakSelector,
    scorer: BandPowerScorer,
    alpha_scaler: SignalScaler,
    beta_scaler: SignalScaler,
    classifier: Classifier,
    config: PipelineConfig,
}

impl Analyzer {
    /// Validate `config` and precompute everything fixed for the session.
    ///
    /// # Errors
    /// [`DspError::Core`] if validation fails, or any filter design error.
    pub fn new(config: &PipelineConfig) -> Result<Self, DspError> {
        config.validate()?;
        Ok(Self {
            channel: config.channel,
            filter: FilterStage::from_config(config)?,
            welch: WelchEstimator::new(config.sampling_rate_hz, config.window_len())?,
            peaks: PeakSelector::new(config.nms_radius),
            scorer: BandPowerScorer::new(config.integration),
            alpha_scaler: SignalScaler::new(config.alpha_threshold, config.alpha_clamp),
            beta_scaler: SignalScaler::new(config.beta_threshold, config.beta_clamp),
            classifier: Classifier::new(config.alpha_threshold, config.beta_threshold),
            config: config.clone(),
        })
    }

    /// Configuration this analyzer was built from.
    #[must_use]
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Samples needed per cycle.
    #[must_use]
    pub fn window_len(&self) -> usize {
        self.welch.segment_len()
    }

    /// Analyse one chunk.
    ///
    /// # Errors
    /// Every error is recoverable; the caller skips the cycle.
    pub fn analyze(&mut self, chunk: &SampleChunk) -> Result<Analysis, DspError> {
        let series = chunk
            .channel(self.channel)
            .ok_or(DspError::ChannelOutOfRange {
                channel: self.channel,
            })?;
        self.analyze_series(&series)
    }

    /// Analyse an already extracted channel series.
    ///
    /// # Errors
    /// See [`Analyzer::analyze`].
    pub fn analyze_series(&mut self, series: &[f64]) -> Result<Analysis, DspError> {
        if series.len() < self.window_len() {
            return Err(DspError::InsufficientSamples {
                needed: self.window_len(),
                got: series.len(),
            });
        }
        let filtered = self.filter.apply(series);
        let spectrum = self.welch.estimate(&filtered)?;
        let peaks = self.peaks.select(&spectrum);

        let alpha = self.scorer.relative(&spectrum, &self.config.alpha_band)?;
        let beta = self.scorer.absolute(&spectrum, &self.config.beta_band)?;
        let alpha_scaled = self.alpha_scaler.scale(alpha.value);
        let beta_scaled = self.beta_scaler.scale(beta.value);
        let command = self.classifier.classify(alpha_scaled, beta_scaled);

        log::debug!(
            "alpha {:.3} -> {alpha_scaled:.3}, beta {:.3} -> {beta_scaled:.3}: {}",
            alpha.value,
            beta.value,
            command.label()
        );

        let thresholds = self.classifier.thresholds();
        Ok(Analysis {
            decision: Decision {
                alpha,
                beta,
                alpha_scaled,
                beta_scaled,
                command,
            },
            display: DisplayFrame {
                spectrum,
                peaks,
                alpha_scaled,
                beta_scaled,
                alpha_threshold: thresholds.alpha,
                beta_threshold: thresholds.beta,
            },
        })
    }
}
