//! Self-audit configuration

use serde::{Deserialize, Serialize};

use super::types::{AuditCheck, Severity};
use crate::collect::in_unit_range;
use crate::dimension::Dimension;
use crate::error::{ConfigError, ConfigResult};

/// Qualitative direction of a dimension's signal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Effective score at or above `positive_threshold`
    Positive,
    /// Effective score at or below `negative_threshold`
    Negative,
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Positive => write!(f, "positive"),
            Self::Negative => write!(f, "negative"),
        }
    }
}

/// Pair of signal directions that should not co-occur unreconciled
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Incompatibility {
    pub first: Dimension,
    pub first_direction: Direction,
    pub second: Dimension,
    pub second_direction: Direction,
}

impl Incompatibility {
    pub fn new(
        first: Dimension,
        first_direction: Direction,
        second: Dimension,
        second_direction: Direction,
    ) -> Self {
        Self {
            first,
            first_direction,
            second,
            second_direction,
        }
    }
}

/// One value per audit check
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CheckTable<T> {
    pub overconfidence: T,
    pub unsupported_claim: T,
    pub contradiction: T,
    pub textual_contradiction: T,
}

impl<T: Copy> CheckTable<T> {
    pub fn get(&self, check: AuditCheck) -> T {
        match check {
            AuditCheck::Overconfidence => self.overconfidence,
            AuditCheck::UnsupportedClaim => self.unsupported_claim,
            AuditCheck::Contradiction => self.contradiction,
            AuditCheck::TextualContradiction => self.textual_contradiction,
        }
    }
}

/// Lexicons, thresholds and weights for the self-audit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AuditConfig {
    /// Case-insensitive regex patterns for absolute-certainty phrasing
    pub overconfidence_phrases: Vec<String>,
    /// Matches needed to trigger the overconfidence check
    pub overconfidence_min_matches: usize,
    /// Regex recognizing a numeric conclusion
    pub numeric_claim_pattern: String,
    /// Case-insensitive regex patterns for self-contradicting phrasing
    pub contradiction_patterns: Vec<String>,
    pub incompatibilities: Vec<Incompatibility>,
    pub positive_threshold: f64,
    pub negative_threshold: f64,
    /// Severity assigned when each check triggers
    pub severities: CheckTable<Severity>,
    /// Contribution of each triggered check to overall risk
    pub risk_weights: CheckTable<f64>,
    /// Findings above this severity fail the audit
    pub pass_threshold: Severity,
    /// Release the recommended label instead of the computed one
    pub act_on_recommendation: bool,
}

impl Default for AuditConfig {
    fn default() -> Self {
        use Dimension::*;
        use Direction::*;

        let phrases = [
            r"\bproven?\b",
            r"\bestablished fact\b",
            r"\bdefinitive(ly)?\b",
            r"\birrefutabl[ey]\b",
            r"\bobviously\b",
            r"\bclearly\b",
            r"\bwithout (a )?doubt\b",
            r"\bbeyond (any|all) doubt\b",
            r"\bunanimous consensus\b",
            r"\ball experts agree\b",
            r"\bno serious scientist disputes\b",
        ];
        let contradictions = [
            r"however.*not significant",
            r"significant.*however.*no effect",
            r"strong evidence.*cannot conclude",
            r"results show.*but we reject",
            r"supports? the hypothesis.*fails? to reach significance",
        ];

        Self {
            overconfidence_phrases: phrases.iter().map(|p| p.to_string()).collect(),
            overconfidence_min_matches: 3,
            numeric_claim_pattern: r"\d+(\.\d+)?\s*%|\b\d+\.\d+\b|\B\.\d+\b".to_string(),
            contradiction_patterns: contradictions.iter().map(|p| p.to_string()).collect(),
            incompatibilities: vec![
                Incompatibility::new(Methodology, Positive, Fraud, Negative),
                Incompatibility::new(Statistics, Positive, Fraud, Negative),
                Incompatibility::new(Replication, Positive, Fraud, Negative),
                Incompatibility::new(Citations, Positive, Plagiarism, Negative),
                Incompatibility::new(Statistics, Positive, Methodology, Negative),
            ],
            positive_threshold: 0.7,
            negative_threshold: 0.3,
            severities: CheckTable {
                overconfidence: Severity::High,
                unsupported_claim: Severity::Medium,
                contradiction: Severity::High,
                textual_contradiction: Severity::Medium,
            },
            risk_weights: CheckTable {
                overconfidence: 0.5,
                unsupported_claim: 0.4,
                contradiction: 0.6,
                textual_contradiction: 0.3,
            },
            pass_threshold: Severity::Low,
            act_on_recommendation: false,
        }
    }
}

impl AuditConfig {
    /// Validate numeric settings. Lexicon patterns are compiled separately
    /// and never fail configuration loading.
    pub fn validate(&self) -> ConfigResult<()> {
        let invalid = |setting: &'static str, reason: String| ConfigError::InvalidAuditSetting {
            setting,
            reason,
        };

        if self.overconfidence_min_matches == 0 {
            return Err(invalid(
                "overconfidence_min_matches",
                "must be at least 1".to_string(),
            ));
        }
        if !in_unit_range(self.positive_threshold) || !in_unit_range(self.negative_threshold) {
            return Err(invalid(
                "direction thresholds",
                "must lie in [0, 1]".to_string(),
            ));
        }
        if self.negative_threshold >= self.positive_threshold {
            return Err(invalid(
                "direction thresholds",
                format!(
                    "negative_threshold {} must be below positive_threshold {}",
                    self.negative_threshold, self.positive_threshold
                ),
            ));
        }
        for check in AuditCheck::ALL {
            let weight = self.risk_weights.get(check);
            if !(weight.is_finite() && weight >= 0.0) {
                return Err(invalid("risk_weights", format!("{} weight {}", check, weight)));
            }
        }
        for pair in &self.incompatibilities {
            if pair.first == pair.second {
                return Err(invalid(
                    "incompatibilities",
                    format!("{} paired with itself", pair.first),
                ));
            }
        }
        Ok(())
    }
}
