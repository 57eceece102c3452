//! Evaluation dimensions
//!
//! The eight fixed axes every review is scored on. Each axis is fed by one
//! upstream detector.

use lazy_static::lazy_static;
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

lazy_static! {
    /// Whole-word mention patterns, one per dimension
    static ref MENTIONS: Vec<(Dimension, Regex)> = Dimension::ALL
        .iter()
        .filter_map(|d| {
            RegexBuilder::new(d.mention_pattern())
                .case_insensitive(true)
                .build()
                .ok()
                .map(|re| (*d, re))
        })
        .collect();
}

/// One of the fixed evaluation axes.
///
/// Declaration order is the canonical order, used to break ties when
/// configured priorities are equal.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Dimension {
    Statistics,
    Methodology,
    Replication,
    Citations,
    Bias,
    Plagiarism,
    Fraud,
    Ethics,
}

impl Dimension {
    /// All dimensions in canonical order
    pub const ALL: [Dimension; 8] = [
        Self::Statistics,
        Self::Methodology,
        Self::Replication,
        Self::Citations,
        Self::Bias,
        Self::Plagiarism,
        Self::Fraud,
        Self::Ethics,
    ];

    /// Wire identifier
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Statistics => "statistics",
            Self::Methodology => "methodology",
            Self::Replication => "replication",
            Self::Citations => "citations",
            Self::Bias => "bias",
            Self::Plagiarism => "plagiarism",
            Self::Fraud => "fraud",
            Self::Ethics => "ethics",
        }
    }

    /// Word stems that name this dimension, anchored at a word start
    fn mention_pattern(&self) -> &'static str {
        match self {
            Self::Statistics => r"\bstatistic",
            Self::Methodology => r"\bmethod",
            Self::Replication => r"\breplica",
            Self::Citations => r"\b(?:citation|cite)",
            Self::Bias => r"\bbias",
            Self::Plagiarism => r"\bplagiar",
            Self::Fraud => r"\bfraud",
            Self::Ethics => r"\bethic",
        }
    }

    /// Whether `text` names this dimension (case-insensitive, whole-word
    /// stem: "statistical" names statistics, "unbiased" does not name bias).
    pub fn is_mentioned_in(&self, text: &str) -> bool {
        MENTIONS
            .iter()
            .any(|(d, re)| d == self && re.is_match(text))
    }
}

impl std::fmt::Display for Dimension {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown dimension identifier
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown dimension: {0}")]
pub struct UnknownDimension(pub String);

impl FromStr for Dimension {
    type Err = UnknownDimension;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_lowercase();
        Self::ALL
            .iter()
            .copied()
            .find(|d| d.as_str() == lower)
            .ok_or(UnknownDimension(s.to_string()))
    }
}
