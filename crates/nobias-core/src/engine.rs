//! Review orchestration
//!
//! One review runs the full pipeline against a single configuration
//! snapshot:
//!
//! ```text
//! detector outputs → collect → propagate → overrides → classify
//!                                                        ↓
//!                          released label ← (downgrade?) ← self-audit
//! ```
//!
//! Every stage appends to the reasoning trace. A review is a pure function of
//! its request and the snapshot; the snapshot is never re-read mid-review, so
//! a concurrent configuration swap cannot produce a mixed result.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::audit::{AuditInput, HallucinationAudit, SelfAuditGuard};
use crate::collect::{Collection, Collector, ComponentScore, DetectorOutput, ScoreSource};
use crate::config::{ConfigSnapshot, ConfigStore, EngineConfig};
use crate::dimension::Dimension;
use crate::error::{ConfigResult, ReviewResult};
use crate::overrides::{OverrideEvaluator, OverrideOutcome};
use crate::trace::{Stage, TraceLog, TraceRecorder};
use crate::uncertainty::{Propagation, Propagator};
use crate::verdict::{build_reasons, AggregateVerdict, Classifier, Reason, VerdictLabel};

/// Input for one review
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReviewRequest {
    /// Review time (Unix ms), stamped on every trace step
    pub reviewed_at_ms: i64,
    /// Detector output per dimension; optional dimensions may be omitted
    pub dimensions: BTreeMap<Dimension, DetectorOutput>,
    /// Free-text reasoning supplied by the caller, audited with the rest
    #[serde(default)]
    pub narrative: Vec<String>,
}

impl ReviewRequest {
    pub fn new(reviewed_at_ms: i64) -> Self {
        Self {
            reviewed_at_ms,
            dimensions: BTreeMap::new(),
            narrative: Vec::new(),
        }
    }

    pub fn with_dimension(mut self, dimension: Dimension, output: DetectorOutput) -> Self {
        self.dimensions.insert(dimension, output);
        self
    }

    pub fn with_narrative(mut self, step: impl Into<String>) -> Self {
        self.narrative.push(step.into());
        self
    }
}

/// Result of one review
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewOutcome {
    /// Version of the snapshot the review ran against
    pub config_version: u64,
    pub component_scores: Vec<ComponentScore>,
    pub verdict: AggregateVerdict,
    /// 3-5 human-readable reasons
    pub summary: Vec<Reason>,
    pub hallucination_audit: HallucinationAudit,
    /// Label handed to consumers. Equals `verdict.label` unless the engine
    /// acted on an audit recommendation.
    pub released_label: VerdictLabel,
    pub reasoning_trace: TraceLog,
}

impl ReviewOutcome {
    /// Whether the released label differs from the computed one
    pub fn downgraded(&self) -> bool {
        self.released_label != self.verdict.label
    }
}

/// Run one review against `snapshot`.
///
/// Fails only on invalid or missing detector input. Self-audit problems
/// never fail a review.
pub fn review(request: &ReviewRequest, snapshot: &ConfigSnapshot) -> ReviewResult<ReviewOutcome> {
    let config = snapshot.config();
    let all_dims = config.active_dimensions();
    let mut trace = TraceRecorder::new(request.reviewed_at_ms);

    let collection = Collector::new(config).collect(&request.dimensions)?;
    record_collection(&mut trace, &collection);
    let scores = collection.scores;

    let propagation = Propagator::new(config).propagate(&scores);
    record_propagation(&mut trace, config, &propagation, &all_dims);

    let evaluator = OverrideEvaluator::new(snapshot.rules());
    let overrides = evaluator.evaluate(&scores);
    record_overrides(&mut trace, &evaluator, &overrides);

    let verdict = Classifier::new(config.bands).classify(&propagation, &overrides);
    record_classification(&mut trace, &verdict, &all_dims);

    let summary = build_reasons(&scores, &verdict, &overrides);

    let audit = match snapshot.lexicon() {
        Ok(lexicon) => {
            let input = AuditInput::new(&scores)
                .with_trace(trace.steps())
                .with_summary(&summary)
                .with_narrative(&request.narrative);
            SelfAuditGuard::new(&config.audit, lexicon).audit(&input, verdict.label)
        }
        Err(e) => {
            warn!(version = snapshot.version(), "self-audit skipped: {}", e);
            HallucinationAudit::skipped(e.to_string())
        }
    };
    record_audit(&mut trace, &audit, &all_dims);

    let released_label = match audit.recommended_label {
        Some(recommended) if config.audit.act_on_recommendation => {
            trace.warn(
                Stage::Downgrade,
                format!(
                    "released label {} instead of {} on self-audit recommendation",
                    recommended, verdict.label
                ),
                all_dims.clone(),
            );
            recommended
        }
        _ => verdict.label,
    };

    info!(
        version = snapshot.version(),
        label = %verdict.label,
        released = %released_label,
        score = verdict.overall_score,
        audit_passed = audit.passed_all,
        "review complete"
    );

    Ok(ReviewOutcome {
        config_version: snapshot.version(),
        component_scores: scores,
        verdict,
        summary,
        hallucination_audit: audit,
        released_label,
        reasoning_trace: trace.finish(),
    })
}

fn record_collection(trace: &mut TraceRecorder, collection: &Collection) {
    for score in &collection.scores {
        let dim = score.dimension();
        let message = format!(
            "{}: raw {:.4}, confidence {:.4}, effective {:.4}{}",
            dim,
            score.raw_score(),
            score.confidence(),
            score.effective_score(),
            if score.inverted() { " (inverted)" } else { "" }
        );
        match score.source() {
            ScoreSource::Detector => trace.record(Stage::Collection, message, vec![dim]),
            ScoreSource::ConfiguredDefault => trace.warn(
                Stage::Collection,
                format!("{}; absent, configured default substituted", message),
                vec![dim],
            ),
            ScoreSource::NeutralDefault => trace.warn(
                Stage::Collection,
                format!("{}; absent, neutral default substituted", message),
                vec![dim],
            ),
        }
    }

    for dep in &collection.applied_dependencies {
        trace.record(
            Stage::Collection,
            format!(
                "dependency {}: {} lifts {} to at least {:.4}",
                dep.id, dep.source, dep.target, dep.floor
            ),
            vec![dep.source, dep.target],
        );
    }
}

fn record_propagation(
    trace: &mut TraceRecorder,
    config: &EngineConfig,
    propagation: &Propagation,
    dims: &[Dimension],
) {
    trace.record(
        Stage::Propagation,
        format!(
            "aggregate {:.4}, std dev {:.4}, interval {:.4} to {:.4} (z {:.2}, {:?} variance)",
            propagation.overall_score,
            propagation.std_dev,
            propagation.interval.lower,
            propagation.interval.upper,
            config.interval_z,
            config.variance_model
        ),
        dims.to_vec(),
    );
}

fn record_overrides(
    trace: &mut TraceRecorder,
    evaluator: &OverrideEvaluator<'_>,
    outcome: &OverrideOutcome,
) {
    if outcome.triggered.is_empty() {
        trace.record(
            Stage::OverrideEvaluation,
            format!("{} override rule(s) evaluated, none triggered", evaluator.rule_count()),
            evaluator.dimensions(),
        );
        return;
    }

    for rule in &outcome.triggered {
        trace.warn(
            Stage::OverrideEvaluation,
            format!(
                "rule {} (priority {}) triggered, label at least {}",
                rule.id, rule.priority, rule.floor_label
            ),
            rule.dimensions.clone(),
        );
    }
    if let (Some(label), Some(rule)) = (outcome.forced_label, &outcome.deciding_rule) {
        let dims = outcome
            .triggered
            .iter()
            .find(|t| &t.id == rule)
            .map(|t| t.dimensions.clone())
            .unwrap_or_default();
        trace.record(
            Stage::OverrideEvaluation,
            format!("rule {} decides the override floor {}", rule, label),
            dims,
        );
    }
}

fn record_classification(trace: &mut TraceRecorder, verdict: &AggregateVerdict, dims: &[Dimension]) {
    let message = if verdict.overridden() {
        format!(
            "score {:.4} maps to {}; override raises it to {}",
            verdict.overall_score, verdict.base_label, verdict.label
        )
    } else {
        format!("score {:.4} maps to {}", verdict.overall_score, verdict.label)
    };
    trace.record(Stage::Classification, message, dims.to_vec());
}

fn record_audit(trace: &mut TraceRecorder, audit: &HallucinationAudit, dims: &[Dimension]) {
    if let Some(reason) = &audit.skipped {
        trace.warn(Stage::Audit, format!("self-audit skipped: {}", reason), Vec::new());
        return;
    }

    for finding in audit.triggered() {
        trace.warn(
            Stage::Audit,
            format!("{} ({}): {}", finding.check, finding.severity, finding.detail),
            Vec::new(),
        );
    }
    let recommendation = match audit.recommended_label {
        Some(label) => format!(", recommends {}", label),
        None => String::new(),
    };
    trace.record(
        Stage::Audit,
        format!(
            "self-audit risk {:.4}, {}{}",
            audit.overall_risk,
            if audit.passed_all { "passed" } else { "failed" },
            recommendation
        ),
        dims.to_vec(),
    );
}

/// JSON in, JSON out. Errors are reported as `{"error": "..."}`.
pub fn review_json(input: &str, snapshot: &ConfigSnapshot) -> String {
    let request: ReviewRequest = match serde_json::from_str(input) {
        Ok(r) => r,
        Err(e) => return error_json(format!("invalid review request: {}", e)),
    };

    match review(&request, snapshot) {
        Ok(outcome) => match serde_json::to_string(&outcome) {
            Ok(json) => json,
            Err(e) => error_json(format!("serialization failed: {}", e)),
        },
        Err(e) => error_json(e.to_string()),
    }
}

fn error_json(message: String) -> String {
    serde_json::json!({ "error": message }).to_string()
}

/// Review entry point bound to a swappable configuration
#[derive(Debug, Default)]
pub struct ReviewEngine {
    store: ConfigStore,
}

impl ReviewEngine {
    /// Engine over a validated configuration
    pub fn new(config: EngineConfig) -> ConfigResult<Self> {
        Ok(Self {
            store: ConfigStore::new(config)?,
        })
    }

    pub fn with_store(store: ConfigStore) -> Self {
        Self { store }
    }

    /// Configuration holder, for reloads
    pub fn store(&self) -> &ConfigStore {
        &self.store
    }

    /// Review against the snapshot current at call time.
    pub fn review(&self, request: &ReviewRequest) -> ReviewResult<ReviewOutcome> {
        let snapshot = self.store.snapshot();
        review(request, &snapshot)
    }

    /// Review many requests against one snapshot. Results keep input order.
    pub fn review_batch(&self, requests: &[ReviewRequest]) -> Vec<ReviewResult<ReviewOutcome>> {
        let snapshot = self.store.snapshot();
        debug!(count = requests.len(), version = snapshot.version(), "batch review");
        run_batch(requests, &snapshot)
    }
}

#[cfg(feature = "parallel")]
fn run_batch(
    requests: &[ReviewRequest],
    snapshot: &Arc<ConfigSnapshot>,
) -> Vec<ReviewResult<ReviewOutcome>> {
    use rayon::prelude::*;
    requests.par_iter().map(|r| review(r, snapshot)).collect()
}

#[cfg(not(feature = "parallel"))]
fn run_batch(
    requests: &[ReviewRequest],
    snapshot: &Arc<ConfigSnapshot>,
) -> Vec<ReviewResult<ReviewOutcome>> {
    requests.iter().map(|r| review(r, snapshot)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::AuditCheck;
    use crate::error::ReviewError;
    use crate::trace::StepLevel;

    fn uniform(score: f64, confidence: f64) -> ReviewRequest {
        Dimension::ALL
            .iter()
            .fold(ReviewRequest::new(1_700_000_000_000), |req, d| {
                req.with_dimension(*d, DetectorOutput::new(score, confidence))
            })
    }

    /// Effective 0.9 everywhere
    fn trusted() -> ReviewRequest {
        let config = EngineConfig::default();
        Dimension::ALL
            .iter()
            .fold(ReviewRequest::new(1_700_000_000_000), |req, d| {
                let raw = if config.dimensions[d].inverted { 0.1 } else { 0.9 };
                req.with_dimension(*d, DetectorOutput::new(raw, 0.9))
            })
    }

    #[test]
    fn test_trace_stages_in_order() {
        let outcome = review(&uniform(0.5, 0.8), &ConfigSnapshot::default()).unwrap();
        let stages: Vec<Stage> = outcome.reasoning_trace.iter().map(|s| s.stage).collect();
        let mut sorted = stages.clone();
        sorted.sort();
        assert_eq!(stages, sorted);
        assert_eq!(stages.first(), Some(&Stage::Collection));
        assert_eq!(stages.last(), Some(&Stage::Audit));
        assert!(outcome
            .reasoning_trace
            .iter()
            .all(|s| s.timestamp_ms == 1_700_000_000_000));
    }

    #[test]
    fn test_engine_text_does_not_trip_audit() {
        let outcome = review(&uniform(0.5, 0.8), &ConfigSnapshot::default()).unwrap();
        let audit = &outcome.hallucination_audit;
        assert!(audit.passed_all, "{:?}", audit);
        assert!(!audit.finding(AuditCheck::UnsupportedClaim).unwrap().triggered);
        assert!(!outcome.downgraded());
    }

    #[test]
    fn test_defaulted_dimension_warns() {
        let mut request = uniform(0.6, 0.8);
        request.dimensions.remove(&Dimension::Bias);
        let outcome = review(&request, &ConfigSnapshot::default()).unwrap();

        let warning = outcome
            .reasoning_trace
            .warnings()
            .find(|s| s.referenced_dimensions == vec![Dimension::Bias])
            .unwrap();
        assert_eq!(warning.stage, Stage::Collection);
        assert!(warning.message.contains("neutral default"));
    }

    #[test]
    fn test_invalid_input_fails_review() {
        let request = uniform(0.5, 0.8).with_dimension(Dimension::Citations, DetectorOutput::new(1.2, 0.5));
        assert_eq!(
            review(&request, &ConfigSnapshot::default()),
            Err(ReviewError::InvalidRange {
                dimension: Dimension::Citations,
                field: "raw_score",
                value: 1.2,
            })
        );
    }

    #[test]
    fn test_override_steps_reference_rule_dimensions() {
        let request = uniform(0.5, 0.8).with_dimension(Dimension::Fraud, DetectorOutput::new(0.95, 0.9));
        let outcome = review(&request, &ConfigSnapshot::default()).unwrap();
        let steps: Vec<_> = outcome.reasoning_trace.stage(Stage::OverrideEvaluation).collect();
        assert!(steps.iter().any(|s| s.level == StepLevel::Warning
            && s.referenced_dimensions == vec![Dimension::Fraud]));
    }

    #[test]
    fn test_rule_description_audited_once() {
        use crate::overrides::{Comparison, OverrideAction, OverrideRule, Predicate, Signal};

        let mut config = EngineConfig::default();
        config.overrides.push(OverrideRule {
            id: "bias-loaded".to_string(),
            description: "Language is clearly loaded.".to_string(),
            priority: 50,
            when: Predicate::compare(Dimension::Bias, Signal::Raw, Comparison::Gt, 0.4),
            action: OverrideAction::Force(VerdictLabel::Mixed),
        });
        let snapshot = ConfigSnapshot::build(config, 1).unwrap();

        let request = uniform(0.5, 0.8).with_narrative("The design is obviously sound.");
        let outcome = review(&request, &snapshot).unwrap();
        assert_eq!(outcome.verdict.overrides_applied, vec!["bias-loaded"]);

        let finding = outcome
            .hallucination_audit
            .finding(AuditCheck::Overconfidence)
            .unwrap();
        assert!(!finding.triggered);
        assert_eq!(finding.matches, Vec::<String>::new());
        assert_eq!(finding.detail, "2 absolute-certainty phrase(s) found, threshold 3");
    }

    #[test]
    fn test_review_json_ok() {
        let input = serde_json::to_string(&trusted()).unwrap();
        let output = review_json(&input, &ConfigSnapshot::default());
        let parsed: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert!(parsed["error"].is_null(), "unexpected error: {}", output);
        assert_eq!(parsed["config_version"], 1);
        assert_eq!(parsed["verdict"]["label"], "Reliable");
        assert_eq!(parsed["released_label"], "Reliable");
        assert!(parsed["reasoning_trace"].is_array());
    }

    #[test]
    fn test_review_json_errors() {
        let parsed: serde_json::Value =
            serde_json::from_str(&review_json("not json", &ConfigSnapshot::default())).unwrap();
        assert!(parsed["error"]
            .as_str()
            .unwrap()
            .starts_with("invalid review request"));

        let input = r#"{"reviewed_at_ms": 0, "dimensions": {}}"#;
        let parsed: serde_json::Value =
            serde_json::from_str(&review_json(input, &ConfigSnapshot::default())).unwrap();
        assert_eq!(parsed["error"], "missing required dimension: statistics");
    }

    #[test]
    fn test_batch_keeps_order() {
        let engine = ReviewEngine::default();
        let requests = vec![uniform(0.9, 0.9), uniform(0.2, 0.9), ReviewRequest::new(0)];
        let results = engine.review_batch(&requests);
        assert_eq!(results.len(), 3);
        assert!(results[0].as_ref().unwrap().verdict.overall_score > 0.5);
        assert!(results[1].as_ref().unwrap().verdict.overall_score < 0.5);
        assert!(matches!(results[2], Err(ReviewError::MissingDimension(_))));
    }
}
