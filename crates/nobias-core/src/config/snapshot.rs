//! Validated configuration snapshot

use tracing::warn;

use super::types::EngineConfig;
use crate::audit::{AuditError, AuditLexicon};
use crate::error::ConfigResult;
use crate::overrides::{sort_rules, OverrideRule};

/// A validated configuration at one version.
///
/// Scoring constraints are checked when the snapshot is built and reject the
/// whole document. The audit lexicon is compiled here too, but a lexicon
/// that fails to compile only disables the self-audit.
#[derive(Debug)]
pub struct ConfigSnapshot {
    version: u64,
    config: EngineConfig,
    rules: Vec<OverrideRule>,
    lexicon: Result<AuditLexicon, AuditError>,
}

impl ConfigSnapshot {
    /// Validate `config` and freeze it as `version`.
    pub fn build(config: EngineConfig, version: u64) -> ConfigResult<Self> {
        config.validate()?;

        let rules = sort_rules(&config.overrides);
        let lexicon = AuditLexicon::compile(&config.audit);
        if let Err(e) = &lexicon {
            warn!(version, "audit lexicon unusable, self-audit will be skipped: {}", e);
        }

        Ok(Self {
            version,
            config,
            rules,
            lexicon,
        })
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Override rules, highest priority first
    pub fn rules(&self) -> &[OverrideRule] {
        &self.rules
    }

    pub fn lexicon(&self) -> Result<&AuditLexicon, &AuditError> {
        self.lexicon.as_ref()
    }
}

impl Default for ConfigSnapshot {
    /// Version 1 of the built-in configuration
    fn default() -> Self {
        let config = EngineConfig::default();
        Self {
            version: 1,
            rules: sort_rules(&config.overrides),
            lexicon: AuditLexicon::compile(&config.audit),
            config,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConfigError;

    #[test]
    fn test_rules_sorted_by_priority() {
        let snapshot = ConfigSnapshot::default();
        let priorities: Vec<u32> = snapshot.rules().iter().map(|r| r.priority).collect();
        let mut sorted = priorities.clone();
        sorted.sort_by(|a, b| b.cmp(a));
        assert_eq!(priorities, sorted);
        assert!(snapshot.lexicon().is_ok());
    }

    #[test]
    fn test_invalid_document_rejected() {
        let mut config = EngineConfig::default();
        config.interval_z = 0.0;
        assert!(matches!(
            ConfigSnapshot::build(config, 2),
            Err(ConfigError::InvalidIntervalZ(_))
        ));
    }

    #[test]
    fn test_bad_lexicon_is_not_fatal() {
        let mut config = EngineConfig::default();
        config.audit.overconfidence_phrases.push("(unclosed".to_string());
        let snapshot = ConfigSnapshot::build(config, 3).unwrap();
        assert_eq!(snapshot.version(), 3);
        assert!(snapshot.lexicon().is_err());
    }
}
