//! Compiled audit lexicons

use regex::{Regex, RegexBuilder};
use thiserror::Error;

use super::config::AuditConfig;

/// Self-audit internal failure. Never fails a review.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AuditError {
    #[error("lexicon pattern '{pattern}' does not compile: {reason}")]
    Lexicon { pattern: String, reason: String },
}

/// Regexes compiled from an [`AuditConfig`]
#[derive(Debug, Clone)]
pub struct AuditLexicon {
    pub(crate) overconfidence: Vec<Regex>,
    pub(crate) numeric_claim: Regex,
    pub(crate) contradictions: Vec<Regex>,
}

impl AuditLexicon {
    pub fn compile(config: &AuditConfig) -> Result<Self, AuditError> {
        Ok(Self {
            overconfidence: compile_all(&config.overconfidence_phrases)?,
            numeric_claim: compile(&config.numeric_claim_pattern)?,
            contradictions: compile_all(&config.contradiction_patterns)?,
        })
    }

    /// Number of overconfidence patterns
    pub fn phrase_count(&self) -> usize {
        self.overconfidence.len()
    }
}

fn compile_all(patterns: &[String]) -> Result<Vec<Regex>, AuditError> {
    patterns.iter().map(|p| compile(p)).collect()
}

fn compile(pattern: &str) -> Result<Regex, AuditError> {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .map_err(|e| AuditError::Lexicon {
            pattern: pattern.to_string(),
            reason: e.to_string(),
        })
}
