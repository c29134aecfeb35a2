use nf_core::config::{ALPHA_CLAMP_GUARD, BETA_CLAMP_GUARD};

/// Piecewise compression of a band score against its threshold `T`.
///
/// Above `4T` the slope drops to 1/4, above `2T` to 1/2, both offset by one.
/// When the guard is armed the result is capped at `T + 1`.
///
/// # Example
/// ```
/// use nf_dsp::scaler::SignalScaler;
/// let beta = SignalScaler::beta(20.0);
/// assert_eq!(beta.scale(30.0), 30.0);
/// assert_eq!(beta.scale(50.0), 26.0);
/// assert_eq!(beta.scale(100.0), 26.0);
/// ```
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SignalScaler {
    threshold: f64,
    clamp: bool,
}

impl SignalScaler {
    /// Scaler with an explicit clamp decision.
    #[must_use]
    pub fn new(threshold: f64, clamp: bool) -> Self {
        Self { threshold, clamp }
    }

    /// Alpha scaler: the clamp is armed only when `T > 1`.
    #[must_use]
    pub fn alpha(threshold: f64) -> Self {
        Self::new(threshold, threshold > ALPHA_CLAMP_GUARD)
    }

    /// Beta scaler: the clamp is armed only when `T > 50`.
    #[must_use]
    pub fn beta(threshold: f64) -> Self {
        Self::new(threshold, threshold > BETA_CLAMP_GUARD)
    }

    #[must_use]
    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    #[must_use]
    pub fn clamps(&self) -> bool {
        self.clamp
    }

    #[must_use]
    pub fn scale(&self, value: f64) -> f64 {
        let t = self.threshold;
        let compressed = if value > 4.0 * t {
            0.25 * value + 1.0
        } else if value > 2.0 * t {
            0.5 * value + 1.0
        } else {
            value
        };
        if self.clamp {
            compressed.min(t + 1.0)
        } else {
            compressed
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn piecewise_segments() {
        let s = SignalScaler::new(0.6, false);
        assert_eq!(s.scale(0.5), 0.5);
        assert_eq!(s.scale(1.2), 1.2);
        assert_eq!(s.scale(2.0), 2.0);
        assert_eq!(s.scale(4.0), 2.0);
    }

    #[test]
    fn boundaries_are_strict() {
        let s = SignalScaler::new(10.0, false);
        assert_eq!(s.scale(20.0), 20.0);
        assert_eq!(s.scale(40.0), 21.0);
        assert_eq!(s.scale(40.000_001), 0.25 * 40.000_001 + 1.0);
    }

    #[test]
    fn guards_follow_thresholds() {
        assert!(!SignalScaler::alpha(0.6).clamps());
        assert!(!SignalScaler::alpha(1.0).clamps());
        assert!(SignalScaler::alpha(1.5).clamps());
        assert!(!SignalScaler::beta(20.0).clamps());
        assert!(!SignalScaler::beta(50.0).clamps());
        assert!(SignalScaler::beta(60.0).clamps());
    }

    #[test]
    fn armed_clamp_caps_at_threshold_plus_one() {
        let s = SignalScaler::beta(60.0);
        assert_eq!(s.scale(30.0), 30.0);
        assert_eq!(s.scale(200.0), 61.0);
        assert_eq!(s.scale(1000.0), 61.0);
    }

    #[test]
    fn default_thresholds_never_clamp() {
        let alpha = SignalScaler::alpha(0.6);
        assert_eq!(alpha.scale(0.9), 0.9);
        let beta = SignalScaler::beta(20.0);
        assert_eq!(beta.scale(500.0), 126.0);
    }
}
