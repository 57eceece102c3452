//! Component score collection
//!
//! Normalizes raw detector outputs into one validated [`ComponentScore`] per
//! dimension:
//!
//! - values outside `[0, 1]` are rejected, naming the dimension
//! - absent dimensions fall back to a configured default, then to the
//!   neutral default (optional dimensions only), else fail
//! - declared dimension dependencies may floor a target's effective score
//!
//! Output order follows configured dimension priority so downstream trace
//! ordering is deterministic.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::config::{DimensionConfig, DimensionDependency, EngineConfig};
use crate::dimension::Dimension;
use crate::error::{ReviewError, ReviewResult};

/// Neutral substitute for absent optional dimensions: maximal uncertainty,
/// implies neither trust nor distrust.
pub const NEUTRAL_SCORE: f64 = 0.5;

/// Raw output of one detector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DetectorOutput {
    pub raw_score: f64,
    pub confidence: f64,
    #[serde(default)]
    pub evidence: Vec<String>,
}

impl DetectorOutput {
    pub fn new(raw_score: f64, confidence: f64) -> Self {
        Self {
            raw_score,
            confidence,
            evidence: Vec::new(),
        }
    }

    pub fn with_evidence(mut self, evidence: impl Into<String>) -> Self {
        self.evidence.push(evidence.into());
        self
    }

    /// The neutral default
    pub fn neutral() -> Self {
        Self::new(NEUTRAL_SCORE, 0.0)
    }

    /// Whether both values lie in [0, 1]
    pub fn is_in_range(&self) -> bool {
        in_unit_range(self.raw_score) && in_unit_range(self.confidence)
    }
}

/// Where a component score came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreSource {
    /// Supplied by the upstream detector
    Detector,
    /// Dimension absent; configured default used
    ConfiguredDefault,
    /// Optional dimension absent; neutral default used
    NeutralDefault,
}

/// Validated score for one dimension. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentScore {
    dimension: Dimension,
    raw_score: f64,
    confidence: f64,
    inverted: bool,
    evidence: Vec<String>,
    source: ScoreSource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    effective_floor: Option<f64>,
}

impl ComponentScore {
    /// Validate and build a component score.
    pub fn new(
        dimension: Dimension,
        output: DetectorOutput,
        inverted: bool,
        source: ScoreSource,
    ) -> ReviewResult<Self> {
        check_range(dimension, "raw_score", output.raw_score)?;
        check_range(dimension, "confidence", output.confidence)?;
        Ok(Self {
            dimension,
            raw_score: output.raw_score,
            confidence: output.confidence,
            inverted,
            evidence: output.evidence,
            source,
            effective_floor: None,
        })
    }

    pub fn dimension(&self) -> Dimension {
        self.dimension
    }

    /// Score as reported, never inverted
    pub fn raw_score(&self) -> f64 {
        self.raw_score
    }

    pub fn confidence(&self) -> f64 {
        self.confidence
    }

    pub fn inverted(&self) -> bool {
        self.inverted
    }

    pub fn evidence(&self) -> &[String] {
        &self.evidence
    }

    pub fn source(&self) -> ScoreSource {
        self.source
    }

    /// Floor applied by a dimension dependency, if any
    pub fn effective_floor(&self) -> Option<f64> {
        self.effective_floor
    }

    /// Score after inversion, before any dependency floor
    pub fn base_effective_score(&self) -> f64 {
        if self.inverted {
            1.0 - self.raw_score
        } else {
            self.raw_score
        }
    }

    /// Score after inversion and dependency floor ("higher is better")
    pub fn effective_score(&self) -> f64 {
        let base = self.base_effective_score();
        match self.effective_floor {
            Some(floor) => base.max(floor),
            None => base,
        }
    }

    /// Whether the upstream detector supplied this score
    pub fn is_observed(&self) -> bool {
        self.source == ScoreSource::Detector
    }

    fn with_floor(mut self, floor: f64, note: String) -> Self {
        self.effective_floor = Some(self.effective_floor.map_or(floor, |f| f.max(floor)));
        self.evidence.push(note);
        self
    }
}

/// A floor actually applied during collection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppliedDependency {
    pub id: String,
    pub source: Dimension,
    pub target: Dimension,
    pub floor: f64,
}

/// Result of collection
#[derive(Debug, Clone)]
pub struct Collection {
    /// Scores ordered by configured priority
    pub scores: Vec<ComponentScore>,
    pub applied_dependencies: Vec<AppliedDependency>,
}

impl Collection {
    pub fn get(&self, dimension: Dimension) -> Option<&ComponentScore> {
        self.scores.iter().find(|s| s.dimension == dimension)
    }

    /// Dimensions that were substituted by a default
    pub fn defaulted(&self) -> Vec<Dimension> {
        self.scores
            .iter()
            .filter(|s| !s.is_observed())
            .map(|s| s.dimension)
            .collect()
    }
}

/// Normalizes detector outputs against the dimension configuration.
pub struct Collector<'a> {
    config: &'a EngineConfig,
}

impl<'a> Collector<'a> {
    pub fn new(config: &'a EngineConfig) -> Self {
        Self { config }
    }

    /// Collect one score per configured dimension.
    ///
    /// Fails on the first invalid or missing dimension, in priority order;
    /// no partial collection is returned.
    pub fn collect(
        &self,
        inputs: &BTreeMap<Dimension, DetectorOutput>,
    ) -> ReviewResult<Collection> {
        let mut scores = Vec::with_capacity(Dimension::ALL.len());

        for (dimension, dim_config) in self.config.dimensions_by_priority() {
            let (output, source) = match inputs.get(&dimension) {
                Some(output) => (output.clone(), ScoreSource::Detector),
                None => self.substitute(dimension, dim_config)?,
            };
            scores.push(ComponentScore::new(
                dimension,
                output,
                dim_config.inverted,
                source,
            )?);
        }

        let applied_dependencies = self.apply_dependencies(&mut scores);

        Ok(Collection {
            scores,
            applied_dependencies,
        })
    }

    fn substitute(
        &self,
        dimension: Dimension,
        dim_config: &DimensionConfig,
    ) -> ReviewResult<(DetectorOutput, ScoreSource)> {
        if let Some(default) = &dim_config.default {
            return Ok((default.clone(), ScoreSource::ConfiguredDefault));
        }
        if dim_config.required {
            return Err(ReviewError::MissingDimension(dimension));
        }
        Ok((DetectorOutput::neutral(), ScoreSource::NeutralDefault))
    }

    /// Apply declared dependencies in a single pass over unfloored scores.
    fn apply_dependencies(&self, scores: &mut [ComponentScore]) -> Vec<AppliedDependency> {
        let mut applied = Vec::new();

        for dep in &self.config.dependencies {
            if !self.dependency_holds(dep, scores) {
                continue;
            }
            let Some(idx) = scores.iter().position(|s| s.dimension == dep.target) else {
                continue;
            };
            let note = format!(
                "{} supports {}: effective score floored at {:.2} ({})",
                dep.source, dep.target, dep.floor, dep.id
            );
            let target = scores[idx].clone().with_floor(dep.floor, note);
            scores[idx] = target;
            applied.push(AppliedDependency {
                id: dep.id.clone(),
                source: dep.source,
                target: dep.target,
                floor: dep.floor,
            });
        }

        applied
    }

    fn dependency_holds(&self, dep: &DimensionDependency, scores: &[ComponentScore]) -> bool {
        scores
            .iter()
            .find(|s| s.dimension == dep.source)
            .map(|s| s.is_observed() && s.base_effective_score() >= dep.source_min_effective)
            .unwrap_or(false)
    }
}

pub(crate) fn in_unit_range(value: f64) -> bool {
    value.is_finite() && (0.0..=1.0).contains(&value)
}

fn check_range(dimension: Dimension, field: &'static str, value: f64) -> ReviewResult<()> {
    if in_unit_range(value) {
        Ok(())
    } else {
        Err(ReviewError::InvalidRange {
            dimension,
            field,
            value,
        })
    }
}
