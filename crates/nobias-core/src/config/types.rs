//! Configuration document
//!
//! The serde-facing shape of the engine configuration. A document is inert
//! until validated into a [`ConfigSnapshot`](super::ConfigSnapshot).

use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::audit::AuditConfig;
use crate::collect::{in_unit_range, DetectorOutput};
use crate::dimension::Dimension;
use crate::error::{ConfigError, ConfigResult};
use crate::overrides::{default_rules, validate_rules, OverrideRule};
use crate::uncertainty::VarianceModel;
use crate::verdict::ThresholdBands;

/// Allowed deviation of the weight sum from 1.0
pub const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

/// Per-dimension settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DimensionConfig {
    /// Share of the aggregate score (0 = inactive)
    pub weight: f64,
    /// High raw score means "worse" (suspicion, risk)
    pub inverted: bool,
    /// Noise constant of the detector; larger for text-pattern heuristics
    pub variance_scale: f64,
    /// Absent input fails the review unless `default` is set
    #[serde(default)]
    pub required: bool,
    /// Collection order, higher first
    #[serde(default)]
    pub priority: u32,
    /// Substitute output when the dimension is absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<DetectorOutput>,
}

impl DimensionConfig {
    fn new(weight: f64, inverted: bool, variance_scale: f64, required: bool, priority: u32) -> Self {
        Self {
            weight,
            inverted,
            variance_scale,
            required,
            priority,
            default: None,
        }
    }
}

/// Declared dependency: a strong source dimension floors the effective
/// score of a target dimension.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DimensionDependency {
    pub id: String,
    pub source: Dimension,
    pub target: Dimension,
    /// Source effective score needed to trigger
    pub source_min_effective: f64,
    /// Minimum effective score granted to the target
    pub floor: f64,
}

/// Full engine configuration document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EngineConfig {
    pub dimensions: BTreeMap<Dimension, DimensionConfig>,
    #[serde(default)]
    pub dependencies: Vec<DimensionDependency>,
    #[serde(default)]
    pub variance_model: VarianceModel,
    /// Interval half-width in standard deviations
    #[serde(default = "default_interval_z")]
    pub interval_z: f64,
    #[serde(default)]
    pub bands: ThresholdBands,
    #[serde(default = "default_rules")]
    pub overrides: Vec<OverrideRule>,
    #[serde(default)]
    pub audit: AuditConfig,
}

fn default_interval_z() -> f64 {
    1.96
}

impl Default for EngineConfig {
    fn default() -> Self {
        use Dimension::*;

        let dimensions = BTreeMap::from([
            (Statistics, DimensionConfig::new(0.18, false, 0.04, true, 80)),
            (Methodology, DimensionConfig::new(0.18, false, 0.06, true, 70)),
            (Replication, DimensionConfig::new(0.14, false, 0.06, true, 60)),
            (Citations, DimensionConfig::new(0.12, false, 0.05, true, 50)),
            (Bias, DimensionConfig::new(0.08, true, 0.12, false, 40)),
            (Plagiarism, DimensionConfig::new(0.10, true, 0.05, false, 30)),
            (Fraud, DimensionConfig::new(0.10, true, 0.08, false, 20)),
            (Ethics, DimensionConfig::new(0.10, true, 0.10, false, 10)),
        ]);

        Self {
            dimensions,
            dependencies: vec![DimensionDependency {
                id: "methodology-supports-statistics".to_string(),
                source: Methodology,
                target: Statistics,
                source_min_effective: 0.5,
                floor: 0.25,
            }],
            variance_model: VarianceModel::default(),
            interval_z: default_interval_z(),
            bands: ThresholdBands::default(),
            overrides: default_rules(),
            audit: AuditConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Parse a JSON document (not yet validated)
    pub fn from_json_str(json: &str) -> ConfigResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read a JSON document from disk (not yet validated)
    pub fn from_path(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    pub fn to_json_pretty(&self) -> ConfigResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Configured dimensions, higher priority first, ties in canonical order
    pub fn dimensions_by_priority(&self) -> Vec<(Dimension, &DimensionConfig)> {
        let mut dims: Vec<(Dimension, &DimensionConfig)> =
            self.dimensions.iter().map(|(d, c)| (*d, c)).collect();
        dims.sort_by(|a, b| b.1.priority.cmp(&a.1.priority).then(a.0.cmp(&b.0)));
        dims
    }

    /// Weight of a dimension (0 when unconfigured)
    pub fn weight(&self, dimension: Dimension) -> f64 {
        self.dimensions.get(&dimension).map_or(0.0, |c| c.weight)
    }

    /// Dimensions with non-zero weight, canonical order
    pub fn active_dimensions(&self) -> Vec<Dimension> {
        self.dimensions
            .iter()
            .filter(|(_, c)| c.weight > 0.0)
            .map(|(d, _)| *d)
            .collect()
    }

    /// Validate every fatal constraint.
    pub fn validate(&self) -> ConfigResult<()> {
        self.validate_dimensions()?;
        self.validate_dependencies()?;
        self.bands.validate()?;
        if !(self.interval_z.is_finite() && self.interval_z > 0.0) {
            return Err(ConfigError::InvalidIntervalZ(self.interval_z));
        }
        validate_rules(&self.overrides)?;
        self.audit.validate()?;
        Ok(())
    }

    fn validate_dimensions(&self) -> ConfigResult<()> {
        let mut sum = 0.0;
        for dimension in Dimension::ALL {
            let cfg = self
                .dimensions
                .get(&dimension)
                .ok_or(ConfigError::UnconfiguredDimension(dimension))?;

            if !(cfg.weight.is_finite() && cfg.weight >= 0.0) {
                return Err(ConfigError::InvalidWeight {
                    dimension,
                    value: cfg.weight,
                });
            }
            if !(cfg.variance_scale.is_finite() && cfg.variance_scale >= 0.0) {
                return Err(ConfigError::InvalidVarianceScale {
                    dimension,
                    value: cfg.variance_scale,
                });
            }
            if let Some(default) = &cfg.default {
                if !default.is_in_range() {
                    return Err(ConfigError::InvalidDefault(dimension));
                }
            }
            sum += cfg.weight;
        }

        if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(ConfigError::WeightSum { sum });
        }
        Ok(())
    }

    fn validate_dependencies(&self) -> ConfigResult<()> {
        let mut seen = HashSet::new();
        for dep in &self.dependencies {
            let invalid = |reason: &str| ConfigError::InvalidDependency {
                id: dep.id.clone(),
                reason: reason.to_string(),
            };

            if dep.id.trim().is_empty() {
                return Err(invalid("empty id"));
            }
            if !seen.insert(dep.id.as_str()) {
                return Err(invalid("duplicate id"));
            }
            if dep.source == dep.target {
                return Err(invalid("source and target are the same dimension"));
            }
            if !in_unit_range(dep.source_min_effective) {
                return Err(invalid("source_min_effective outside [0, 1]"));
            }
            if !in_unit_range(dep.floor) {
                return Err(invalid("floor outside [0, 1]"));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = EngineConfig::default();
        config.validate().unwrap();
        let sum: f64 = config.dimensions.values().map(|c| c.weight).sum();
        assert!((sum - 1.0).abs() <= WEIGHT_SUM_TOLERANCE);
        assert_eq!(config.active_dimensions().len(), 8);
    }

    #[test]
    fn test_weight_sum_rejected() {
        let mut config = EngineConfig::default();
        config
            .dimensions
            .get_mut(&Dimension::Statistics)
            .unwrap()
            .weight = 0.30;
        match config.validate() {
            Err(ConfigError::WeightSum { sum }) => assert!((sum - 1.12).abs() < 1e-9),
            other => panic!("expected WeightSum, got {:?}", other),
        }
    }

    #[test]
    fn test_weight_within_tolerance_accepted() {
        let mut config = EngineConfig::default();
        config
            .dimensions
            .get_mut(&Dimension::Ethics)
            .unwrap()
            .weight = 0.10 + 5e-7;
        config.validate().unwrap();
    }

    #[test]
    fn test_negative_weight_rejected() {
        let mut config = EngineConfig::default();
        config.dimensions.get_mut(&Dimension::Bias).unwrap().weight = -0.08;
        config.dimensions.get_mut(&Dimension::Fraud).unwrap().weight = 0.26;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidWeight {
                dimension: Dimension::Bias,
                ..
            })
        ));
    }

    #[test]
    fn test_inactive_dimension_allowed() {
        let mut config = EngineConfig::default();
        config.dimensions.get_mut(&Dimension::Bias).unwrap().weight = 0.0;
        config.dimensions.get_mut(&Dimension::Fraud).unwrap().weight = 0.18;
        config.validate().unwrap();
        assert!(!config.active_dimensions().contains(&Dimension::Bias));
    }

    #[test]
    fn test_unconfigured_dimension_rejected() {
        let mut config = EngineConfig::default();
        config.dimensions.remove(&Dimension::Ethics);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::UnconfiguredDimension(Dimension::Ethics))
        ));
    }

    #[test]
    fn test_self_dependency_rejected() {
        let mut config = EngineConfig::default();
        config.dependencies[0].source = Dimension::Statistics;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidDependency { .. })
        ));
    }

    #[test]
    fn test_invalid_default_rejected() {
        let mut config = EngineConfig::default();
        config.dimensions.get_mut(&Dimension::Citations).unwrap().default =
            Some(DetectorOutput::new(1.5, 0.0));
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidDefault(Dimension::Citations))
        ));
    }

    #[test]
    fn test_json_roundtrip_preserves_document() {
        let config = EngineConfig::default();
        let json = config.to_json_pretty().unwrap();
        let back = EngineConfig::from_json_str(&json).unwrap();
        assert_eq!(back, config);
    }

    #[test]
    fn test_unknown_field_rejected() {
        let json = r#"{"dimensions": {}, "surprise": true}"#;
        assert!(matches!(
            EngineConfig::from_json_str(json),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_priority_order() {
        let config = EngineConfig::default();
        let order: Vec<Dimension> = config
            .dimensions_by_priority()
            .into_iter()
            .map(|(d, _)| d)
            .collect();
        assert_eq!(order.first(), Some(&Dimension::Statistics));
        assert_eq!(order.last(), Some(&Dimension::Ethics));
    }
}
