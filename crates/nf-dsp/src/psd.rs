use std::sync::Arc;

use nf_core::Spectrum;
use realfft::num_complex::Complex;
use realfft::{RealFftPlanner, RealToComplex};

use crate::error::DspError;

/// Welch power spectral density estimator.
///
/// Periodic Hann window of `segment_len` samples, 50% overlap, constant
/// detrend per segment, one-sided density scaling, mean across segments.
/// The FFT plan and buffers are allocated once.
///
/// # Example
/// ```
/// use nf_dsp::psd::WelchEstimator;
/// let mut welch = WelchEstimator::new(125.0, 125).unwrap();
/// let tone: Vec<f64> = (0..250)
///     .map(|i| (2.0 * std::f64::consts::PI * 10.0 * i as f64 / 125.0).sin())
///     .collect();
/// let spectrum = welch.estimate(&tone).unwrap();
/// assert_eq!(spectrum.len(), 63);
/// assert_eq!(spectrum.resolution_hz(), 1.0);
/// ```
pub struct WelchEstimator {
    sampling_rate_hz: f64,
    segment_len: usize,
    step: usize,
    window: Vec<f64>,
    /// `1 / (fs * sum(w^2))`
    scale: f64,
    plan: Arc<dyn RealToComplex<f64>>,
    input_buf: Vec<f64>,
    spectrum_buf: Vec<Complex<f64>>,
    scratch: Vec<Complex<f64>>,
}

impl WelchEstimator {
    /// Estimator over segments of `segment_len` samples.
    ///
    /// # Errors
    /// [`DspError::InvalidFilter`] if the rate is not positive or the segment
    /// is shorter than two samples.
    pub fn new(sampling_rate_hz: f64, segment_len: usize) -> Result<Self, DspError> {
        if !(sampling_rate_hz.is_finite() && sampling_rate_hz > 0.0) || segment_len < 2 {
            return Err(DspError::InvalidFilter(format!(
                "Welch segment of {segment_len} samples at {sampling_rate_hz} Hz"
            )));
        }

        let mut planner = RealFftPlanner::<f64>::new();
        let plan = planner.plan_fft_forward(segment_len);
        let input_buf = plan.make_input_vec();
        let spectrum_buf = plan.make_output_vec();
        let scratch = plan.make_scratch_vec();

        let n = segment_len as f64;
        let window: Vec<f64> = (0..segment_len)
            .map(|i| 0.5 - 0.5 * (2.0 * std::f64::consts::PI * i as f64 / n).cos())
            .collect();
        let energy: f64 = window.iter().map(|w| w * w).sum();

        Ok(Self {
            sampling_rate_hz,
            segment_len,
            step: segment_len - segment_len / 2,
            window,
            scale: 1.0 / (sampling_rate_hz * energy),
            plan,
            input_buf,
            spectrum_buf,
            scratch,
        })
    }

    /// Samples per segment (one analysis window).
    #[must_use]
    pub fn segment_len(&self) -> usize {
        self.segment_len
    }

    /// Bin spacing in Hz.
    #[must_use]
    pub fn resolution_hz(&self) -> f64 {
        self.sampling_rate_hz / self.segment_len as f64
    }

    /// Estimate the PSD of `series`.
    ///
    /// # Errors
    /// [`DspError::InsufficientSamples`] if `series` is shorter than one
    /// segment; [`DspError::Fft`] if the transform fails.
    pub fn estimate(&mut self, series: &[f64]) -> Result<Spectrum, DspError> {
        let n = self.segment_len;
        if series.len() < n {
            return Err(DspError::InsufficientSamples {
                needed: n,
                got: series.len(),
            });
        }

        let bins = n / 2 + 1;
        let mut power = vec![0.0; bins];
        let segments = (series.len() - n) / self.step + 1;

        for seg in 0..segments {
            let chunk = &series[seg * self.step..seg * self.step + n];
            let mean = chunk.iter().sum::<f64>() / n as f64;
            for ((slot, &x), &w) in self.input_buf.iter_mut().zip(chunk).zip(&self.window) {
                *slot = (x - mean) * w;
            }
            self.plan
                .process_with_scratch(&mut self.input_buf, &mut self.spectrum_buf, &mut self.scratch)
                .map_err(|e| DspError::Fft(e.to_string()))?;
            for (acc, c) in power.iter_mut().zip(&self.spectrum_buf) {
                *acc += c.norm_sqr();
            }
        }

        // One-sided: double everything but DC and (for even n) Nyquist.
        let last_doubled = if n % 2 == 0 { bins - 1 } else { bins };
        let norm = self.scale / segments as f64;
        for (k, p) in power.iter_mut().enumerate() {
            *p *= norm;
            if k > 0 && k < last_doubled {
                *p *= 2.0;
            }
        }

        let resolution = self.resolution_hz();
        let frequencies = (0..bins).map(|k| k as f64 * resolution).collect();
        Ok(Spectrum::new(frequencies, power, resolution)?)
    }
}
