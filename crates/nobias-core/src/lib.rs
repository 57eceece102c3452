//! Nobias Verdict Engine
//!
//! Fuses per-dimension detector outputs for a research paper into one
//! calibrated trust verdict with an uncertainty interval, then audits its
//! own justification before release.
//!
//! # Features
//!
//! - `parallel` - Batch reviews via rayon
//!
//! # Example
//!
//! ```rust
//! use nobias_core::{review, ConfigSnapshot, DetectorOutput, Dimension, ReviewRequest, VerdictLabel};
//!
//! let snapshot = ConfigSnapshot::default();
//! let request = ReviewRequest::new(0)
//!     .with_dimension(Dimension::Statistics, DetectorOutput::new(0.9, 0.9))
//!     .with_dimension(Dimension::Methodology, DetectorOutput::new(0.9, 0.9))
//!     .with_dimension(Dimension::Replication, DetectorOutput::new(0.9, 0.9))
//!     .with_dimension(Dimension::Citations, DetectorOutput::new(0.9, 0.9))
//!     .with_dimension(Dimension::Fraud, DetectorOutput::new(0.95, 0.9));
//!
//! let outcome = review(&request, &snapshot).unwrap();
//! assert_eq!(outcome.verdict.label, VerdictLabel::HighRisk);
//! assert_eq!(outcome.verdict.deciding_rule.as_deref(), Some("fraud-suspicion"));
//! ```

pub mod audit;
pub mod collect;
pub mod config;
pub mod dimension;
pub mod engine;
pub mod error;
pub mod overrides;
pub mod trace;
pub mod uncertainty;
pub mod verdict;

// Re-export main types at crate root
pub use audit::{AuditCheck, AuditConfig, AuditFinding, HallucinationAudit, Severity};
pub use collect::{ComponentScore, DetectorOutput, ScoreSource};
pub use config::{ConfigSnapshot, ConfigStore, EngineConfig};
pub use dimension::Dimension;
pub use engine::{review, review_json, ReviewEngine, ReviewOutcome, ReviewRequest};
pub use error::{ConfigError, ConfigResult, ReviewError, ReviewResult};
pub use overrides::{OverrideAction, OverrideRule, Predicate};
pub use trace::{ReasoningStep, Stage, TraceLog};
pub use uncertainty::{ConfidenceInterval, VarianceModel};
pub use verdict::{AggregateVerdict, Reason, ThresholdBands, VerdictLabel};
