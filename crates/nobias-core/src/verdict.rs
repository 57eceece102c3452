//! Verdict classification
//!
//! Maps the aggregate score onto fixed threshold bands, then combines the
//! band label with the override outcome: the more severe label wins.
//!
//! ```text
//! [reliable_min, 1.0]         → Reliable
//! [mixed_min, reliable_min)   → Mixed
//! [0.0, mixed_min)            → HighRisk
//! ```

use serde::{Deserialize, Serialize};

use crate::collect::ComponentScore;
use crate::dimension::Dimension;
use crate::error::{ConfigError, ConfigResult};
use crate::overrides::OverrideOutcome;
use crate::uncertainty::{ConfidenceInterval, Propagation};

/// Categorical verdict, ordered by severity (`Reliable < Mixed < HighRisk`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum VerdictLabel {
    Reliable,
    Mixed,
    HighRisk,
}

impl VerdictLabel {
    /// The more severe of two labels
    pub fn worst(self, other: Self) -> Self {
        self.max(other)
    }

    /// Next more severe label, if any
    pub fn next_worse(self) -> Option<Self> {
        match self {
            Self::Reliable => Some(Self::Mixed),
            Self::Mixed => Some(Self::HighRisk),
            Self::HighRisk => None,
        }
    }
}

impl std::fmt::Display for VerdictLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Reliable => write!(f, "Reliable"),
            Self::Mixed => write!(f, "Mixed"),
            Self::HighRisk => write!(f, "High Risk"),
        }
    }
}

/// Lower bounds of the Reliable and Mixed bands
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ThresholdBands {
    pub reliable_min: f64,
    pub mixed_min: f64,
}

impl Default for ThresholdBands {
    fn default() -> Self {
        Self {
            reliable_min: 0.70,
            mixed_min: 0.40,
        }
    }
}

impl ThresholdBands {
    pub fn label_for(&self, score: f64) -> VerdictLabel {
        if score >= self.reliable_min {
            VerdictLabel::Reliable
        } else if score >= self.mixed_min {
            VerdictLabel::Mixed
        } else {
            VerdictLabel::HighRisk
        }
    }

    pub fn validate(&self) -> ConfigResult<()> {
        let ordered = self.mixed_min.is_finite()
            && self.reliable_min.is_finite()
            && 0.0 <= self.mixed_min
            && self.mixed_min < self.reliable_min
            && self.reliable_min <= 1.0;
        if ordered {
            Ok(())
        } else {
            Err(ConfigError::InvalidBands {
                mixed_min: self.mixed_min,
                reliable_min: self.reliable_min,
            })
        }
    }
}

/// Final aggregate judgment of one review
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateVerdict {
    pub overall_score: f64,
    pub std_dev: f64,
    pub confidence_interval: ConfidenceInterval,
    /// Label from the score bands alone
    pub base_label: VerdictLabel,
    /// Final label after overrides
    pub label: VerdictLabel,
    /// Every triggered rule id, highest priority first
    pub overrides_applied: Vec<String>,
    /// Rule that set the forced label, if any
    pub deciding_rule: Option<String>,
}

impl AggregateVerdict {
    /// Whether an override made the label worse than the bands alone
    pub fn overridden(&self) -> bool {
        self.label != self.base_label
    }
}

/// Combines score bands with the override outcome
pub struct Classifier {
    bands: ThresholdBands,
}

impl Classifier {
    pub fn new(bands: ThresholdBands) -> Self {
        Self { bands }
    }

    pub fn classify(&self, propagation: &Propagation, overrides: &OverrideOutcome) -> AggregateVerdict {
        let base_label = self.bands.label_for(propagation.overall_score);
        let label = match overrides.forced_label {
            Some(forced) => base_label.worst(forced),
            None => base_label,
        };

        AggregateVerdict {
            overall_score: propagation.overall_score,
            std_dev: propagation.std_dev,
            confidence_interval: propagation.interval,
            base_label,
            label,
            overrides_applied: overrides.triggered_ids(),
            deciding_rule: overrides.deciding_rule.clone(),
        }
    }
}

/// One bullet of the human-readable justification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reason {
    pub text: String,
    pub dimensions: Vec<Dimension>,
}

const MIN_REASONS: usize = 3;
const MAX_REASONS: usize = 5;

/// Build 3-5 ranked, de-duplicated reasons for the verdict.
pub fn build_reasons(
    scores: &[ComponentScore],
    verdict: &AggregateVerdict,
    overrides: &OverrideOutcome,
) -> Vec<Reason> {
    let mut candidates: Vec<(u32, Reason)> = Vec::new();

    for rule in &overrides.triggered {
        candidates.push((100, reason(&rule.description, rule.dimensions.clone())));
    }

    for score in scores {
        if !score.is_observed() {
            candidates.push((
                35,
                reason(
                    &format!("No {} signal was supplied; it was treated as neutral.", score.dimension()),
                    vec![score.dimension()],
                ),
            ));
            continue;
        }
        if let Some(c) = signal_reason(score) {
            candidates.push(c);
        }
    }

    let active: Vec<Dimension> = scores.iter().map(|s| s.dimension()).collect();
    candidates.push((
        10,
        reason(
            &format!(
                "Final verdict: {} (trust score {:.2} out of 1.00, interval {:.2} to {:.2}).",
                verdict.label,
                verdict.overall_score,
                verdict.confidence_interval.lower,
                verdict.confidence_interval.upper
            ),
            active,
        ),
    ));

    candidates.sort_by(|a, b| b.0.cmp(&a.0));

    let mut reasons: Vec<Reason> = Vec::new();
    for (_, candidate) in candidates {
        if reasons.iter().any(|r| r.text == candidate.text) {
            continue;
        }
        reasons.push(candidate);
        if reasons.len() >= MAX_REASONS {
            break;
        }
    }

    let padding = [
        "These signals are heuristic; interpret them as guidance, not proof.",
        "Consider a manual review of methods, data availability, and references.",
    ];
    for text in padding {
        if reasons.len() >= MIN_REASONS {
            break;
        }
        reasons.push(reason(text, Vec::new()));
    }

    reasons
}

fn reason(text: &str, dimensions: Vec<Dimension>) -> Reason {
    Reason {
        text: text.to_string(),
        dimensions,
    }
}

/// Strong/weak signal bullet for one observed dimension
fn signal_reason(score: &ComponentScore) -> Option<(u32, Reason)> {
    let raw = score.raw_score();
    let dim = score.dimension();
    let (rank, text) = match dim {
        Dimension::Statistics if raw >= 0.70 => (60, "Strong statistical rigor signals were detected."),
        Dimension::Statistics if raw <= 0.25 => (70, "Statistical rigor signals were weak or missing."),
        Dimension::Methodology if raw >= 0.60 => (55, "Methodology/design signals appear reasonably strong."),
        Dimension::Methodology if raw <= 0.25 => (65, "Methodology/design signals appear weak or underspecified."),
        Dimension::Citations if raw >= 0.60 => (40, "Citation/reference signals suggest decent sourcing."),
        Dimension::Citations if raw <= 0.25 => (50, "Citation/reference signals are weak (few or unclear references)."),
        Dimension::Replication if raw >= 0.67 => (45, "Replicability signals are strong (robustness/openness/claims)."),
        Dimension::Replication if raw <= 0.33 => (55, "Replicability signals are fragile (limited robustness/openness)."),
        Dimension::Fraud if raw >= 0.50 => (80, "Fraud/anomaly heuristics raised notable concerns."),
        Dimension::Plagiarism if raw >= 0.50 => (80, "Plagiarism/redundancy heuristics raised notable concerns."),
        Dimension::Ethics if raw >= 0.50 => (80, "Ethics/safety heuristics raised notable concerns."),
        Dimension::Bias if raw >= 0.50 => (50, "Loaded or one-sided language was frequent."),
        _ => return None,
    };
    Some((rank, reason(text, vec![dim])))
}
