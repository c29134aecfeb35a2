use std::f64::consts::PI;

use nf_core::PipelineConfig;
use realfft::num_complex::Complex64;

use crate::error::DspError;

/// Second-order IIR section, normalised so that `a0 == 1`.
///
/// Coefficients follow the RBJ audio-EQ cookbook; first-order sections are
/// stored with `b2 == a2 == 0`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Biquad {
    b: [f64; 3],
    a: [f64; 2],
}

impl Biquad {
    fn normalized(b0: f64, b1: f64, b2: f64, a0: f64, a1: f64, a2: f64) -> Self {
        Self {
            b: [b0 / a0, b1 / a0, b2 / a0],
            a: [a1 / a0, a2 / a0],
        }
    }

    /// Notch at `f0` with quality factor `q`.
    #[must_use]
    pub fn notch(fs: f64, f0: f64, q: f64) -> Self {
        let w0 = 2.0 * PI * f0 / fs;
        let (sin, cos) = w0.sin_cos();
        let alpha = sin / (2.0 * q);
        Self::normalized(1.0, -2.0 * cos, 1.0, 1.0 + alpha, -2.0 * cos, 1.0 - alpha)
    }

    /// Second-order lowpass at `f0` with quality factor `q`.
    #[must_use]
    pub fn lowpass(fs: f64, f0: f64, q: f64) -> Self {
        let w0 = 2.0 * PI * f0 / fs;
        let (sin, cos) = w0.sin_cos();
        let alpha = sin / (2.0 * q);
        Self::normalized(
            (1.0 - cos) / 2.0,
            1.0 - cos,
            (1.0 - cos) / 2.0,
            1.0 + alpha,
            -2.0 * cos,
            1.0 - alpha,
        )
    }

    /// Second-order highpass at `f0` with quality factor `q`.
    #[must_use]
    pub fn highpass(fs: f64, f0: f64, q: f64) -> Self {
        let w0 = 2.0 * PI * f0 / fs;
        let (sin, cos) = w0.sin_cos();
        let alpha = sin / (2.0 * q);
        Self::normalized(
            (1.0 + cos) / 2.0,
            -(1.0 + cos),
            (1.0 + cos) / 2.0,
            1.0 + alpha,
            -2.0 * cos,
            1.0 - alpha,
        )
    }

    /// First-order lowpass (bilinear, prewarped).
    #[must_use]
    pub fn lowpass_first_order(fs: f64, f0: f64) -> Self {
        let k = (PI * f0 / fs).tan();
        Self::normalized(k, k, 0.0, k + 1.0, k - 1.0, 0.0)
    }

    /// First-order highpass (bilinear, prewarped).
    #[must_use]
    pub fn highpass_first_order(fs: f64, f0: f64) -> Self {
        let k = (PI * f0 / fs).tan();
        Self::normalized(1.0, -1.0, 0.0, k + 1.0, k - 1.0, 0.0)
    }

    /// Filter `data` in place starting from zero state (transposed direct form II).
    pub fn process_in_place(&self, data: &mut [f64]) {
        let [b0, b1, b2] = self.b;
        let [a1, a2] = self.a;
        let (mut z1, mut z2) = (0.0, 0.0);
        for x in data.iter_mut() {
            let input = *x;
            let y = b0 * input + z1;
            z1 = b1 * input - a1 * y + z2;
            z2 = b2 * input - a2 * y;
            *x = y;
        }
    }

    /// Magnitude response at `freq` Hz.
    #[must_use]
    pub fn gain_at(&self, fs: f64, freq: f64) -> f64 {
        let z1 = Complex64::from_polar(1.0, -2.0 * PI * freq / fs);
        let z2 = z1 * z1;
        let num = self.b[0] + z1 * self.b[1] + z2 * self.b[2];
        let den = 1.0 + z1 * self.a[0] + z2 * self.a[1];
        (num / den).norm()
    }
}

#[derive(Clone, Copy)]
enum Edge {
    Low,
    High,
}

/// Butterworth cascade of `order` poles at `fc`.
fn butterworth(order: usize, fs: f64, fc: f64, edge: Edge) -> Vec<Biquad> {
    let n = order as f64;
    let mut sections: Vec<Biquad> = (0..order / 2)
        .map(|k| {
            let q = 1.0 / (2.0 * ((2.0 * k as f64 + 1.0) * PI / (2.0 * n)).sin());
            match edge {
                Edge::Low => Biquad::lowpass(fs, fc, q),
                Edge::High => Biquad::highpass(fs, fc, q),
            }
        })
        .collect();
    if order % 2 == 1 {
        sections.push(match edge {
            Edge::Low => Biquad::lowpass_first_order(fs, fc),
            Edge::High => Biquad::highpass_first_order(fs, fc),
        });
    }
    sections
}

/// Parameters of the notch + bandpass chain.
#[derive(Clone, Debug, PartialEq)]
pub struct FilterSpec {
    pub sampling_rate_hz: f64,
    pub notch_hz: f64,
    pub notch_quality: f64,
    pub lower_cutoff_hz: f64,
    pub upper_cutoff_hz: f64,
    pub order: usize,
}

impl From<&PipelineConfig> for FilterSpec {
    fn from(c: &PipelineConfig) -> Self {
        Self {
            sampling_rate_hz: c.sampling_rate_hz,
            notch_hz: c.notch_hz,
            notch_quality: c.notch_quality,
            lower_cutoff_hz: c.lower_cutoff_hz,
            upper_cutoff_hz: c.upper_cutoff_hz,
            order: c.bandpass_order,
        }
    }
}

/// Designed coefficients: one notch section, then the bandpass cascade
/// (Butterworth highpass at the lower cutoff, lowpass at the upper one).
#[derive(Clone, Debug, PartialEq)]
pub struct FilterCoefficients {
    sampling_rate_hz: f64,
    notch: Biquad,
    bandpass: Vec<Biquad>,
}

impl FilterCoefficients {
    /// Design the chain for `spec`.
    ///
    /// # Errors
    /// [`DspError::InvalidBand`] if `lower >= upper` or either cutoff is
    /// outside `(0, fs/2)`; [`DspError::InvalidFilter`] for a bad sampling
    /// rate, notch frequency, quality factor or order.
    pub fn design(spec: &FilterSpec) -> Result<Self, DspError> {
        let fs = spec.sampling_rate_hz;
        if !(fs.is_finite() && fs > 0.0) {
            return Err(DspError::InvalidFilter(format!("sampling rate {fs} Hz")));
        }
        let nyquist = fs / 2.0;
        let (low, high) = (spec.lower_cutoff_hz, spec.upper_cutoff_hz);
        if !(low > 0.0 && high < nyquist && low < high) {
            return Err(DspError::InvalidBand {
                low_hz: low,
                high_hz: high,
                nyquist_hz: nyquist,
            });
        }
        if !(spec.notch_hz > 0.0 && spec.notch_hz < nyquist) {
            return Err(DspError::InvalidFilter(format!(
                "notch {} Hz outside (0, {nyquist}) Hz",
                spec.notch_hz
            )));
        }
        if !(spec.notch_quality > 0.0) {
            return Err(DspError::InvalidFilter(format!(
                "notch quality {}",
                spec.notch_quality
            )));
        }
        if spec.order == 0 {
            return Err(DspError::InvalidFilter("bandpass order 0".into()));
        }

        let mut bandpass = butterworth(spec.order, fs, low, Edge::High);
        bandpass.extend(butterworth(spec.order, fs, high, Edge::Low));

        Ok(Self {
            sampling_rate_hz: fs,
            notch: Biquad::notch(fs, spec.notch_hz, spec.notch_quality),
            bandpass,
        })
    }

    /// Combined magnitude response of the whole chain at `freq` Hz.
    #[must_use]
    pub fn gain_at(&self, freq: f64) -> f64 {
        let fs = self.sampling_rate_hz;
        self.bandpass
            .iter()
            .fold(self.notch.gain_at(fs, freq), |g, s| g * s.gain_at(fs, freq))
    }

    /// Number of bandpass sections.
    #[must_use]
    pub fn bandpass_sections(&self) -> usize {
        self.bandpass.len()
    }
}

/// Notch-then-bandpass filtering of one channel.
///
/// Each call starts from zero filter state: chunks are filtered
/// independently, so each chunk starts with a settling transient.
///
/// # Example
/// ```
/// use nf_core::PipelineConfig;
/// use nf_dsp::filter::FilterStage;
/// let stage = FilterStage::from_config(&PipelineConfig::default()).unwrap();
/// let out = stage.apply(&[0.0; 125]);
/// assert_eq!(out.len(), 125);
/// ```
#[derive(Clone, Debug)]
pub struct FilterStage {
    coefficients: FilterCoefficients,
}

impl FilterStage {
    /// Stage using pre-designed coefficients.
    #[must_use]
    pub fn new(coefficients: FilterCoefficients) -> Self {
        Self { coefficients }
    }

    /// Design coefficients from the pipeline configuration.
    ///
    /// # Errors
    /// See [`FilterCoefficients::design`].
    pub fn from_config(config: &PipelineConfig) -> Result<Self, DspError> {
        FilterCoefficients::design(&FilterSpec::from(config)).map(Self::new)
    }

    /// Filter a series; output has the same length, causal.
    #[must_use]
    pub fn apply(&self, series: &[f64]) -> Vec<f64> {
        let mut out = series.to_vec();
        self.coefficients.notch.process_in_place(&mut out);
        for section in &self.coefficients.bandpass {
            section.process_in_place(&mut out);
        }
        out
    }

    /// Coefficients in use.
    #[must_use]
    pub fn coefficients(&self) -> &FilterCoefficients {
        &self.coefficients
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(low: f64, high: f64) -> FilterSpec {
        FilterSpec {
            lower_cutoff_hz: low,
            upper_cutoff_hz: high,
            ..FilterSpec::from(&PipelineConfig::default())
        }
    }

    fn sine(freq: f64, fs: f64, n: usize) -> Vec<f64> {
        (0..n)
            .map(|i| (2.0 * PI * freq * i as f64 / fs).sin())
            .collect()
    }

    #[test]
    fn rejects_invalid_bands() {
        for (low, high) in [(20.0, 10.0), (10.0, 10.0), (0.0, 30.0), (5.0, 62.5), (-1.0, 30.0)] {
            assert!(
                matches!(
                    FilterCoefficients::design(&spec(low, high)),
                    Err(DspError::InvalidBand { .. })
                ),
                "{low}..{high} should be rejected"
            );
        }
    }

    #[test]
    fn rejects_bad_notch_and_order() {
        let mut s = spec(5.0, 50.0);
        s.notch_hz = 70.0;
        assert!(matches!(FilterCoefficients::design(&s), Err(DspError::InvalidFilter(_))));
        let mut s = spec(5.0, 50.0);
        s.order = 0;
        assert!(matches!(FilterCoefficients::design(&s), Err(DspError::InvalidFilter(_))));
    }

    #[test]
    fn order_five_gives_three_sections_per_edge() {
        let c = FilterCoefficients::design(&spec(5.0, 50.0)).unwrap();
        assert_eq!(c.bandpass_sections(), 6);
    }

    #[test]
    fn preserves_length_and_is_deterministic() {
        let input: Vec<f64> = (0..300).map(|i| ((i * 7919) % 113) as f64 - 56.0).collect();
        for (low, high) in [(1.0, 60.0), (5.0, 50.0), (8.0, 12.0), (30.0, 31.0)] {
            let stage = FilterStage::new(FilterCoefficients::design(&spec(low, high)).unwrap());
            let a = stage.apply(&input);
            let b = stage.apply(&input);
            assert_eq!(a.len(), input.len());
            assert_eq!(a, b, "{low}..{high} not deterministic");
        }
    }

    #[test]
    fn notch_removes_mains_frequency() {
        let c = FilterCoefficients::design(&spec(5.0, 50.0)).unwrap();
        let notch = c.notch;
        assert!(notch.gain_at(125.0, 50.0) < 1e-6);
        assert!((notch.gain_at(125.0, 10.0) - 1.0).abs() < 0.01);
    }

    #[test]
    fn bandpass_passes_in_band_and_attenuates_outside() {
        let c = FilterCoefficients::design(&spec(5.0, 50.0)).unwrap();
        assert!((c.gain_at(20.0) - 1.0).abs() < 0.05, "20 Hz gain {}", c.gain_at(20.0));
        assert!(c.gain_at(1.0) < 0.01, "1 Hz gain {}", c.gain_at(1.0));
        assert!(c.gain_at(60.0) < 0.1, "60 Hz gain {}", c.gain_at(60.0));
    }

    #[test]
    fn causal_output_ignores_future_samples() {
        let stage = FilterStage::from_config(&PipelineConfig::default()).unwrap();
        let mut input = sine(10.0, 125.0, 200);
        let before = stage.apply(&input);
        input[150] += 100.0;
        let after = stage.apply(&input);
        assert_eq!(before[..150], after[..150]);
        assert_ne!(before[150], after[150]);
    }

    #[test]
    fn in_band_tone_survives_chunk_filtering() {
        let stage = FilterStage::from_config(&PipelineConfig::default()).unwrap();
        let out = stage.apply(&sine(10.0, 125.0, 500));
        // Steady state, past the per-chunk settling transient.
        let peak = out[250..].iter().fold(0.0f64, |m, v| m.max(v.abs()));
        assert!((peak - 1.0).abs() < 0.1, "10 Hz peak amplitude {peak}");
    }
}
