use nf_core::{Peaks, Spectrum};

/// Non-maximum suppression over a spectrum.
///
/// Index `i` survives when it is a local peak (rising into it, falling out of
/// it; a flat top counts at its first index) and it is the first index that
/// reaches the maximum of `[i - radius, i + radius]`, clipped to the bounds.
/// The result feeds the display only.
///
/// # Example
/// ```
/// use nf_core::Spectrum;
/// use nf_dsp::peaks::PeakSelector;
/// let s = Spectrum::new(
///     (0..7).map(f64::from).collect(),
///     vec![0.0, 3.0, 1.0, 2.0, 1.0, 5.0, 0.0],
///     1.0,
/// ).unwrap();
/// assert_eq!(PeakSelector::new(1).select(&s).indices, vec![1, 3, 5]);
/// assert_eq!(PeakSelector::new(2).select(&s).indices, vec![1, 5]);
/// ```
#[derive(Clone, Copy, Debug)]
pub struct PeakSelector {
    radius: usize,
}

impl PeakSelector {
    #[must_use]
    pub fn new(radius: usize) -> Self {
        Self { radius }
    }

    /// Indices of the selected peaks, strictly increasing.
    #[must_use]
    pub fn select_indices(&self, power: &[f64]) -> Vec<usize> {
        (1..power.len().saturating_sub(1))
            .filter(|&i| is_local_peak(power, i) && self.dominates_window(power, i))
            .collect()
    }

    /// Selected peaks with their frequencies and power.
    #[must_use]
    pub fn select(&self, spectrum: &Spectrum) -> Peaks {
        Peaks::from_indices(spectrum, self.select_indices(spectrum.power()))
    }

    fn dominates_window(&self, power: &[f64], i: usize) -> bool {
        let lo = i.saturating_sub(self.radius);
        let hi = (i + self.radius).min(power.len() - 1);
        let mut best = lo;
        for j in lo..=hi {
            if power[j] > power[best] {
                best = j;
            }
        }
        best == i
    }
}

/// Sign change of the first difference from positive to negative.
fn is_local_peak(power: &[f64], i: usize) -> bool {
    if power[i] <= power[i - 1] {
        return false;
    }
    power[i + 1..]
        .iter()
        .find(|&&p| p != power[i])
        .is_some_and(|&p| p < power[i])
}
