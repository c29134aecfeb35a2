use nf_core::CommandCode;

/// One threshold rule of the classifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Rule {
    /// `alpha > Ta`
    AlphaAbove,
    /// `beta > Tb && alpha < Ta`
    BetaAboveAlphaBelow,
    /// `alpha > Ta && beta > Tb`
    BothAbove,
    /// Always matches.
    Fallback,
}

/// Evaluation order. First match wins.
///
/// `BothAbove` comes after `AlphaAbove`, which already matches every input
/// it would, so `BothDominant` is never produced.
pub const RULE_ORDER: [Rule; 4] = [
    Rule::AlphaAbove,
    Rule::BetaAboveAlphaBelow,
    Rule::BothAbove,
    Rule::Fallback,
];

impl Rule {
    #[must_use]
    pub fn matches(self, alpha: f64, beta: f64, t: &Thresholds) -> bool {
        match self {
            Self::AlphaAbove => alpha > t.alpha,
            Self::BetaAboveAlphaBelow => beta > t.beta && alpha < t.alpha,
            Self::BothAbove => alpha > t.alpha && beta > t.beta,
            Self::Fallback => true,
        }
    }

    #[must_use]
    pub fn code(self) -> CommandCode {
        match self {
            Self::AlphaAbove => CommandCode::AlphaDominant,
            Self::BetaAboveAlphaBelow => CommandCode::BetaDominant,
            Self::BothAbove => CommandCode::BothDominant,
            Self::Fallback => CommandCode::Neither,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Thresholds {
    pub alpha: f64,
    pub beta: f64,
}

/// Threshold classifier over scaled alpha and beta scores.
///
/// # Example
/// ```
/// use nf_core::CommandCode;
/// use nf_dsp::classifier::Classifier;
/// let c = Classifier::new(0.6, 20.0);
/// assert_eq!(c.classify(0.8, 5.0), CommandCode::AlphaDominant);
/// assert_eq!(c.classify(0.3, 25.0), CommandCode::BetaDominant);
/// assert_eq!(c.classify(0.3, 5.0), CommandCode::Neither);
/// ```
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Classifier {
    thresholds: Thresholds,
}

impl Classifier {
    #[must_use]
    pub fn new(alpha_threshold: f64, beta_threshold: f64) -> Self {
        Self {
            thresholds: Thresholds {
                alpha: alpha_threshold,
                beta: beta_threshold,
            },
        }
    }

    #[must_use]
    pub fn thresholds(&self) -> Thresholds {
        self.thresholds
    }

    /// First rule of [`RULE_ORDER`] that matches.
    #[must_use]
    pub fn first_match(&self, alpha: f64, beta: f64) -> Rule {
        RULE_ORDER
            .into_iter()
            .find(|r| r.matches(alpha, beta, &self.thresholds))
            .unwrap_or(Rule::Fallback)
    }

    #[must_use]
    pub fn classify(&self, alpha: f64, beta: f64) -> CommandCode {
        self.first_match(alpha, beta).code()
    }

    /// Every rule matching the input, in evaluation order.
    #[must_use]
    pub fn matching_rules(&self, alpha: f64, beta: f64) -> Vec<Rule> {
        RULE_ORDER
            .into_iter()
            .filter(|r| r.matches(alpha, beta, &self.thresholds))
            .collect()
    }
}
