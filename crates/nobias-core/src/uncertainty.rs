//! Score aggregation and uncertainty propagation
//!
//! - aggregate score: `Σ weight_i × effective_i`
//! - per-dimension variance: `variance_scale_i × f(confidence_i)`, with `f`
//!   the configured [`VarianceModel`]
//! - aggregate variance (independent dimensions): `Σ weight_i² × variance_i`
//! - interval: `score ± z × std_dev`, each bound clipped into `[0, 1]`
//!
//! Clipping can make the interval asymmetric around the score; that is the
//! correct result and is never re-centered.
//!
//! Summation always follows collection order so identical inputs give
//! bit-identical outputs.

use serde::{Deserialize, Serialize};

use crate::collect::ComponentScore;
use crate::config::EngineConfig;
use crate::dimension::Dimension;

/// Monotonically decreasing map from confidence to a variance multiplier.
/// Both models give 1.0 at zero confidence and 0.0 at full confidence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum VarianceModel {
    /// `(1 - c)²`: doubt shrinks quickly as confidence rises
    #[default]
    Quadratic,
    /// `1 - c`
    Linear,
}

impl VarianceModel {
    pub fn multiplier(&self, confidence: f64) -> f64 {
        let doubt = (1.0 - confidence).clamp(0.0, 1.0);
        match self {
            Self::Quadratic => doubt * doubt,
            Self::Linear => doubt,
        }
    }
}

/// Interval around the aggregate score
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceInterval {
    pub lower: f64,
    pub upper: f64,
}

impl ConfidenceInterval {
    pub fn width(&self) -> f64 {
        self.upper - self.lower
    }

    pub fn contains(&self, value: f64) -> bool {
        self.lower <= value && value <= self.upper
    }
}

/// Contribution of one dimension
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DimensionContribution {
    pub dimension: Dimension,
    pub weight: f64,
    pub effective_score: f64,
    pub variance: f64,
}

/// Output of propagation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Propagation {
    pub overall_score: f64,
    pub variance: f64,
    pub std_dev: f64,
    pub interval: ConfidenceInterval,
    pub contributions: Vec<DimensionContribution>,
}

/// Aggregates effective scores and their uncertainty.
pub struct Propagator<'a> {
    config: &'a EngineConfig,
}

impl<'a> Propagator<'a> {
    pub fn new(config: &'a EngineConfig) -> Self {
        Self { config }
    }

    /// Variance of a single dimension's score
    pub fn dimension_variance(&self, score: &ComponentScore) -> f64 {
        let scale = self
            .config
            .dimensions
            .get(&score.dimension())
            .map_or(0.0, |c| c.variance_scale);
        scale * self.config.variance_model.multiplier(score.confidence())
    }

    pub fn propagate(&self, scores: &[ComponentScore]) -> Propagation {
        let contributions: Vec<DimensionContribution> = scores
            .iter()
            .map(|s| DimensionContribution {
                dimension: s.dimension(),
                weight: self.config.weight(s.dimension()),
                effective_score: s.effective_score(),
                variance: self.dimension_variance(s),
            })
            .collect();

        let mut overall = 0.0;
        let mut variance = 0.0;
        for c in &contributions {
            overall += c.weight * c.effective_score;
            variance += c.weight * c.weight * c.variance;
        }
        let overall_score = overall.clamp(0.0, 1.0);
        let std_dev = variance.sqrt();

        let half_width = self.config.interval_z * std_dev;
        let interval = ConfidenceInterval {
            lower: (overall_score - half_width).clamp(0.0, 1.0),
            upper: (overall_score + half_width).clamp(0.0, 1.0),
        };

        Propagation {
            overall_score,
            variance,
            std_dev,
            interval,
            contributions,
        }
    }
}
