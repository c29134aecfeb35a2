use nf_core::config::Integration;
use nf_core::{Band, BandScore, PowerKind, Spectrum};

use crate::error::DspError;

/// Integrates spectral power over named bands.
///
/// # Example
/// ```
/// use nf_core::{Band, Spectrum};
/// use nf_core::config::Integration;
/// use nf_dsp::band::BandPowerScorer;
/// let s = Spectrum::new(vec![0.0, 1.0, 2.0, 3.0], vec![1.0; 4], 1.0).unwrap();
/// let scorer = BandPowerScorer::new(Integration::Trapezoid);
/// let full = Band::new("all", 0.0, 3.0);
/// assert_eq!(scorer.absolute(&s, &full).unwrap().value, 3.0);
/// assert_eq!(scorer.relative(&s, &full).unwrap().value, 1.0);
/// ```
#[derive(Clone, Copy, Debug, Default)]
pub struct BandPowerScorer {
    integration: Integration,
}

impl BandPowerScorer {
    #[must_use]
    pub fn new(integration: Integration) -> Self {
        Self { integration }
    }

    /// Integrated power of the bins inside `band`.
    ///
    /// # Errors
    /// [`DspError::DegenerateBand`] if no bin falls in the band.
    pub fn absolute(&self, spectrum: &Spectrum, band: &Band) -> Result<BandScore, DspError> {
        Ok(BandScore {
            band: band.clone(),
            kind: PowerKind::Absolute,
            value: self.band_integral(spectrum, band)?,
        })
    }

    /// Band power over whole-spectrum power.
    ///
    /// # Errors
    /// [`DspError::DegenerateBand`] if no bin falls in the band;
    /// [`DspError::ZeroTotalPower`] if the spectrum integrates to zero.
    pub fn relative(&self, spectrum: &Spectrum, band: &Band) -> Result<BandScore, DspError> {
        let part = self.band_integral(spectrum, band)?;
        let total = integrate(spectrum.power(), spectrum.resolution_hz(), self.integration);
        if !(total.is_finite() && total > 0.0) {
            return Err(DspError::ZeroTotalPower);
        }
        Ok(BandScore {
            band: band.clone(),
            kind: PowerKind::Relative,
            value: part / total,
        })
    }

    fn band_integral(&self, spectrum: &Spectrum, band: &Band) -> Result<f64, DspError> {
        let selected: Vec<f64> = spectrum
            .frequencies()
            .iter()
            .zip(spectrum.power())
            .filter(|&(&f, _)| band.contains(f))
            .map(|(_, &p)| p)
            .collect();
        if selected.is_empty() {
            return Err(DspError::DegenerateBand {
                low_hz: band.low_hz,
                high_hz: band.high_hz,
            });
        }
        Ok(integrate(&selected, spectrum.resolution_hz(), self.integration))
    }
}

/// Integral of uniformly sampled `y` with step `dx`.
#[must_use]
pub fn integrate(y: &[f64], dx: f64, rule: Integration) -> f64 {
    match rule {
        Integration::Trapezoid => trapezoid(y, dx),
        Integration::Simpson => simpson(y, dx),
    }
}

fn trapezoid(y: &[f64], dx: f64) -> f64 {
    y.windows(2).map(|w| (w[0] + w[1]) * 0.5 * dx).sum()
}

/// Composite Simpson. With an even point count, the result is the mean of
/// Simpson-then-trapezoid over the last interval and trapezoid-then-Simpson
/// over the first.
fn simpson(y: &[f64], dx: f64) -> f64 {
    let n = y.len();
    if n < 3 {
        return trapezoid(y, dx);
    }
    if n % 2 == 1 {
        return simpson_odd(y, dx);
    }
    let head = simpson_odd(&y[..n - 1], dx) + trapezoid(&y[n - 2..], dx);
    let tail = trapezoid(&y[..2], dx) + simpson_odd(&y[1..], dx);
    0.5 * (head + tail)
}

fn simpson_odd(y: &[f64], dx: f64) -> f64 {
    debug_assert!(y.len() % 2 == 1);
    if y.len() == 1 {
        return 0.0;
    }
    let last = y.len() - 1;
    let inner: f64 = y[1..last]
        .iter()
        .enumerate()
        .map(|(i, &v)| if i % 2 == 0 { 4.0 * v } else { 2.0 * v })
        .sum();
    dx / 3.0 * (y[0] + inner + y[last])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spectrum(power: Vec<f64>) -> Spectrum {
        let freqs = (0..power.len()).map(|i| i as f64 * 0.5).collect();
        Spectrum::new(freqs, power, 0.5).unwrap()
    }

    #[test]
    fn simpson_is_exact_on_quadratics() {
        let y: Vec<f64> = (0..5).map(|i| f64::from(i).powi(2)).collect();
        assert!((simpson(&y, 1.0) - 64.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn even_counts_are_exact_on_lines() {
        let y = [0.0, 1.0, 2.0, 3.0];
        assert!((simpson(&y, 1.0) - 4.5).abs() < 1e-12);
        assert!((trapezoid(&y, 1.0) - 4.5).abs() < 1e-12);
        assert_eq!(simpson(&[2.0, 4.0], 1.0), 3.0);
        assert_eq!(simpson(&[7.0], 1.0), 0.0);
    }

    #[test]
    fn full_band_relative_power_is_one() {
        let s = spectrum((0..63).map(|i| 1.0 + (i % 7) as f64).collect());
        let all = Band::new("all", 0.0, 31.0);
        for rule in [Integration::Simpson, Integration::Trapezoid] {
            let rel = BandPowerScorer::new(rule).relative(&s, &all).unwrap();
            assert!((rel.value - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn absolute_power_is_non_negative() {
        let s = spectrum((0..40).map(|i| ((i * 17) % 5) as f64 * 0.1).collect());
        let scorer = BandPowerScorer::default();
        for (lo, hi) in [(0.0, 3.0), (2.0, 8.0), (5.5, 19.5), (0.0, 0.0)] {
            let score = scorer.absolute(&s, &Band::new("b", lo, hi)).unwrap();
            assert!(score.value >= 0.0, "{lo}..{hi}");
            assert_eq!(score.kind, PowerKind::Absolute);
        }
    }

    #[test]
    fn band_between_bins_is_degenerate() {
        let s = spectrum(vec![1.0; 10]);
        let err = BandPowerScorer::default()
            .absolute(&s, &Band::new("gap", 1.1, 1.4))
            .unwrap_err();
        assert!(matches!(err, DspError::DegenerateBand { .. }));
    }

    #[test]
    fn silent_spectrum_has_no_relative_power() {
        let s = spectrum(vec![0.0; 10]);
        let err = BandPowerScorer::default()
            .relative(&s, &Band::new("alpha", 1.0, 2.0))
            .unwrap_err();
        assert!(matches!(err, DspError::ZeroTotalPower));
    }
}
