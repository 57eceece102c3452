//! Audit result types

use serde::{Deserialize, Serialize};

use crate::verdict::VerdictLabel;

/// The fixed battery of self-audit checks
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditCheck {
    /// Absolute-certainty phrasing
    Overconfidence,
    /// Numeric conclusion without an evidence reference
    UnsupportedClaim,
    /// Incompatible signal directions across dimensions
    Contradiction,
    /// Self-contradicting phrasing within one text
    TextualContradiction,
}

impl AuditCheck {
    pub const ALL: [AuditCheck; 4] = [
        Self::Overconfidence,
        Self::UnsupportedClaim,
        Self::Contradiction,
        Self::TextualContradiction,
    ];
}

impl std::fmt::Display for AuditCheck {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Overconfidence => write!(f, "overconfidence"),
            Self::UnsupportedClaim => write!(f, "unsupported_claim"),
            Self::Contradiction => write!(f, "contradiction"),
            Self::TextualContradiction => write!(f, "textual_contradiction"),
        }
    }
}

/// Finding severity, ordered
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Check did not trigger
    #[default]
    None,
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    /// Numeric weight in [0, 1]
    pub fn score(&self) -> f64 {
        match self {
            Self::None => 0.0,
            Self::Low => 0.25,
            Self::Medium => 0.5,
            Self::High => 0.75,
            Self::Critical => 1.0,
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::None => write!(f, "none"),
            Self::Low => write!(f, "low"),
            Self::Medium => write!(f, "medium"),
            Self::High => write!(f, "high"),
            Self::Critical => write!(f, "critical"),
        }
    }
}

/// Outcome of one check
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditFinding {
    pub check: AuditCheck,
    pub triggered: bool,
    pub detail: String,
    pub severity: Severity,
    /// Matched phrases, offending steps or conflicting pairs
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub matches: Vec<String>,
}

impl AuditFinding {
    pub fn passed(check: AuditCheck, detail: impl Into<String>) -> Self {
        Self {
            check,
            triggered: false,
            detail: detail.into(),
            severity: Severity::None,
            matches: Vec::new(),
        }
    }

    pub fn triggered(
        check: AuditCheck,
        severity: Severity,
        detail: impl Into<String>,
        matches: Vec<String>,
    ) -> Self {
        Self {
            check,
            triggered: true,
            detail: detail.into(),
            severity,
            matches,
        }
    }
}

/// Advisory self-audit of one review
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HallucinationAudit {
    /// One finding per check, in battery order
    pub findings: Vec<AuditFinding>,
    pub overall_risk: f64,
    pub passed_all: bool,
    /// Set when the audit could not run
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skipped: Option<String>,
    /// Advisory downgrade; never applied by the guard itself
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recommended_label: Option<VerdictLabel>,
}

impl HallucinationAudit {
    /// Audit that could not run. No finding exceeds the threshold, so it
    /// passes; `skipped` carries the reason.
    pub fn skipped(reason: impl Into<String>) -> Self {
        Self {
            findings: Vec::new(),
            overall_risk: 0.0,
            passed_all: true,
            skipped: Some(reason.into()),
            recommended_label: None,
        }
    }

    pub fn is_skipped(&self) -> bool {
        self.skipped.is_some()
    }

    pub fn finding(&self, check: AuditCheck) -> Option<&AuditFinding> {
        self.findings.iter().find(|f| f.check == check)
    }

    pub fn triggered(&self) -> impl Iterator<Item = &AuditFinding> {
        self.findings.iter().filter(|f| f.triggered)
    }
}
