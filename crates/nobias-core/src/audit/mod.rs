//! Self-Audit Guard
//!
//! Advisory check of the engine's own justification before it is released:
//!
//! - **Overconfidence**: absolute-certainty phrasing ("clearly", "proven")
//! - **Unsupported claims**: numeric conclusions with no evidence reference
//! - **Contradictions**: incompatible signal directions across dimensions
//!   that nothing in the evidence or narrative reconciles
//! - **Textual contradictions**: self-contradicting phrasing
//!
//! The guard is read-only. Its output carries an overall risk, a pass flag
//! and at most a *recommended* downgrade; acting on it is the engine's call
//! and shows up as its own trace step.
//!
//! Audit failures (a lexicon that does not compile) never fail a review:
//! the audit is reported as skipped instead.

mod config;
mod guard;
mod lexicon;
mod types;

pub use config::{AuditConfig, CheckTable, Direction, Incompatibility};
pub use guard::{AuditInput, AuditedStep, SelfAuditGuard, StepOrigin};
pub use lexicon::{AuditError, AuditLexicon};
pub use types::{AuditCheck, AuditFinding, HallucinationAudit, Severity};
