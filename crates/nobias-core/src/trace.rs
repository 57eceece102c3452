//! Reasoning trace
//!
//! Append-only log of every decision step taken during one review. The
//! recorder is owned by the review in flight; once the review finishes the
//! recorder is consumed into a [`TraceLog`], which only offers read access.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::dimension::Dimension;

/// Pipeline stage a step belongs to.
///
/// Declaration order is the order stages are recorded in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Collection,
    Propagation,
    OverrideEvaluation,
    Classification,
    Audit,
    /// Acted-upon audit recommendation
    Downgrade,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Collection => write!(f, "collection"),
            Self::Propagation => write!(f, "propagation"),
            Self::OverrideEvaluation => write!(f, "override_evaluation"),
            Self::Classification => write!(f, "classification"),
            Self::Audit => write!(f, "audit"),
            Self::Downgrade => write!(f, "downgrade"),
        }
    }
}

/// Step level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StepLevel {
    #[default]
    Info,
    Warning,
}

/// One recorded decision
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReasoningStep {
    /// Position in the log, starting at 0
    pub seq: usize,
    /// Review time supplied by the caller (Unix ms)
    pub timestamp_ms: i64,
    pub stage: Stage,
    #[serde(default)]
    pub level: StepLevel,
    pub message: String,
    /// Dimensions this step draws on
    pub referenced_dimensions: Vec<Dimension>,
}

/// Recorder for a single review.
#[derive(Debug)]
pub struct TraceRecorder {
    timestamp_ms: i64,
    steps: Vec<ReasoningStep>,
}

impl TraceRecorder {
    /// Start an empty trace; every step is stamped with `timestamp_ms`.
    pub fn new(timestamp_ms: i64) -> Self {
        Self {
            timestamp_ms,
            steps: Vec::new(),
        }
    }

    /// Append an informational step.
    pub fn record(
        &mut self,
        stage: Stage,
        message: impl Into<String>,
        referenced_dimensions: Vec<Dimension>,
    ) {
        self.push(stage, StepLevel::Info, message.into(), referenced_dimensions);
    }

    /// Append a warning step.
    pub fn warn(
        &mut self,
        stage: Stage,
        message: impl Into<String>,
        referenced_dimensions: Vec<Dimension>,
    ) {
        self.push(stage, StepLevel::Warning, message.into(), referenced_dimensions);
    }

    fn push(
        &mut self,
        stage: Stage,
        level: StepLevel,
        message: String,
        referenced_dimensions: Vec<Dimension>,
    ) {
        debug_assert!(
            self.last_stage().map_or(true, |last| last <= stage),
            "trace stage {} recorded after {:?}",
            stage,
            self.last_stage()
        );
        debug!(stage = %stage, "{}", message);
        self.steps.push(ReasoningStep {
            seq: self.steps.len(),
            timestamp_ms: self.timestamp_ms,
            stage,
            level,
            message,
            referenced_dimensions,
        });
    }

    /// Stage of the most recent step
    pub fn last_stage(&self) -> Option<Stage> {
        self.steps.last().map(|s| s.stage)
    }

    /// Steps recorded so far
    pub fn steps(&self) -> &[ReasoningStep] {
        &self.steps
    }

    /// Close the trace.
    pub fn finish(self) -> TraceLog {
        TraceLog { steps: self.steps }
    }
}

/// Finished, read-only trace of one review
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TraceLog {
    steps: Vec<ReasoningStep>,
}

impl TraceLog {
    pub fn steps(&self) -> &[ReasoningStep] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ReasoningStep> {
        self.steps.iter()
    }

    /// Steps belonging to one stage
    pub fn stage(&self, stage: Stage) -> impl Iterator<Item = &ReasoningStep> {
        self.steps.iter().filter(move |s| s.stage == stage)
    }

    /// Warning steps
    pub fn warnings(&self) -> impl Iterator<Item = &ReasoningStep> {
        self.steps.iter().filter(|s| s.level == StepLevel::Warning)
    }
}

impl<'a> IntoIterator for &'a TraceLog {
    type Item = &'a ReasoningStep;
    type IntoIter = std::slice::Iter<'a, ReasoningStep>;

    fn into_iter(self) -> Self::IntoIter {
        self.steps.iter()
    }
}
