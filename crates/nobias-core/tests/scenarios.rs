//! End-to-end review scenarios

use nobias_core::{
    review, AuditCheck, ConfigError, ConfigSnapshot, DetectorOutput, Dimension, EngineConfig,
    ReviewEngine, ReviewError, ReviewRequest, ScoreSource, Stage, VerdictLabel,
};
use pretty_assertions::assert_eq;

const REVIEWED_AT: i64 = 1704067200000; // 2024-01-01 00:00:00 UTC

/// Request with the same effective score and confidence on every dimension
fn effective(score: f64, confidence: f64) -> ReviewRequest {
    let config = EngineConfig::default();
    Dimension::ALL.iter().fold(ReviewRequest::new(REVIEWED_AT), |req, d| {
        let raw = if config.dimensions[d].inverted {
            1.0 - score
        } else {
            score
        };
        req.with_dimension(*d, DetectorOutput::new(raw, confidence))
    })
}

/// Every dimension at raw 0.5
fn neutral() -> ReviewRequest {
    Dimension::ALL.iter().fold(ReviewRequest::new(REVIEWED_AT), |req, d| {
        req.with_dimension(*d, DetectorOutput::new(0.5, 0.8))
    })
}

/// Default config with `dimension`'s weight moved onto statistics
fn without_weight(dimension: Dimension) -> EngineConfig {
    let mut config = EngineConfig::default();
    let moved = config.dimensions[&dimension].weight;
    config.dimensions.get_mut(&dimension).unwrap().weight = 0.0;
    config.dimensions.get_mut(&Dimension::Statistics).unwrap().weight += moved;
    config
}

#[test]
fn test_all_dimensions_strong_is_reliable() {
    let outcome = review(&effective(0.9, 0.9), &ConfigSnapshot::default()).unwrap();

    // Weights sum to 1, so the weighted sum of a uniform 0.9 is 0.9
    assert!((outcome.verdict.overall_score - 0.9).abs() < 1e-9);
    assert_eq!(outcome.verdict.label, VerdictLabel::Reliable);
    assert!(outcome.verdict.overrides_applied.is_empty());
    assert_eq!(outcome.verdict.deciding_rule, None);
    assert_eq!(outcome.released_label, VerdictLabel::Reliable);
    assert!(outcome.hallucination_audit.passed_all);
    assert!((3..=5).contains(&outcome.summary.len()));
}

#[test]
fn test_fraud_suspicion_forces_high_risk() {
    let request = neutral().with_dimension(Dimension::Fraud, DetectorOutput::new(0.95, 0.9));
    let outcome = review(&request, &ConfigSnapshot::default()).unwrap();

    let fraud = outcome
        .component_scores
        .iter()
        .find(|s| s.dimension() == Dimension::Fraud)
        .unwrap();
    assert!((fraud.effective_score() - 0.05).abs() < 1e-9);

    assert_eq!(outcome.verdict.base_label, VerdictLabel::Mixed);
    assert_eq!(outcome.verdict.label, VerdictLabel::HighRisk);
    assert_eq!(outcome.verdict.deciding_rule.as_deref(), Some("fraud-suspicion"));
    assert_eq!(
        outcome.summary[0].text,
        "High fraud/anomaly suspicion signals were detected."
    );
}

#[test]
fn test_missing_statistics_fails_review() {
    let mut request = neutral();
    request.dimensions.remove(&Dimension::Statistics);

    assert_eq!(
        review(&request, &ConfigSnapshot::default()),
        Err(ReviewError::MissingDimension(Dimension::Statistics))
    );
}

#[test]
fn test_configured_default_fills_missing_dimension() {
    let mut config = EngineConfig::default();
    config.dimensions.get_mut(&Dimension::Statistics).unwrap().default =
        Some(DetectorOutput::new(0.4, 0.2));
    let snapshot = ConfigSnapshot::build(config, 1).unwrap();

    let mut request = neutral();
    request.dimensions.remove(&Dimension::Statistics);
    let outcome = review(&request, &snapshot).unwrap();

    let stats = &outcome.component_scores[0];
    assert_eq!(stats.dimension(), Dimension::Statistics);
    assert_eq!(stats.source(), ScoreSource::ConfiguredDefault);
    assert!(outcome
        .reasoning_trace
        .warnings()
        .any(|s| s.stage == Stage::Collection && s.referenced_dimensions == vec![Dimension::Statistics]));
}

#[test]
fn test_overconfident_narrative_fails_audit() {
    let request = effective(0.9, 0.9)
        .with_narrative("The results are clearly significant.")
        .with_narrative("The effect is proven across cohorts.")
        .with_narrative("It holds beyond any doubt.");
    let outcome = review(&request, &ConfigSnapshot::default()).unwrap();

    let audit = &outcome.hallucination_audit;
    assert!(audit.finding(AuditCheck::Overconfidence).unwrap().triggered);
    assert!(!audit.passed_all);
    assert_eq!(audit.recommended_label, Some(VerdictLabel::Mixed));

    // Advisory only
    assert_eq!(outcome.verdict.label, VerdictLabel::Reliable);
    assert_eq!(outcome.released_label, VerdictLabel::Reliable);
    assert!(outcome.reasoning_trace.stage(Stage::Downgrade).next().is_none());
}

#[test]
fn test_acted_on_recommendation_adds_downgrade_step() {
    let mut config = EngineConfig::default();
    config.audit.act_on_recommendation = true;
    let snapshot = ConfigSnapshot::build(config, 1).unwrap();

    let request = effective(0.9, 0.9)
        .with_narrative("Clearly, obviously, definitively sound.");
    let outcome = review(&request, &snapshot).unwrap();

    assert_eq!(outcome.verdict.label, VerdictLabel::Reliable);
    assert_eq!(outcome.released_label, VerdictLabel::Mixed);
    assert!(outcome.downgraded());

    let last = outcome.reasoning_trace.iter().last().unwrap();
    assert_eq!(last.stage, Stage::Downgrade);
    assert!(last.message.contains("Mixed"));
}

#[test]
fn test_bad_lexicon_skips_audit() {
    let mut config = EngineConfig::default();
    config.audit.contradiction_patterns.push("strong evidence(".to_string());
    let snapshot = ConfigSnapshot::build(config, 7).unwrap();

    let outcome = review(&effective(0.9, 0.9), &snapshot).unwrap();
    let audit = &outcome.hallucination_audit;
    assert!(audit.is_skipped());
    assert!(audit.passed_all);
    assert_eq!(audit.overall_risk, 0.0);
    assert_eq!(audit.recommended_label, None);
    assert_eq!(outcome.config_version, 7);

    let warning = outcome.reasoning_trace.warnings().last().unwrap();
    assert_eq!(warning.stage, Stage::Audit);
    assert!(warning.message.starts_with("self-audit skipped"));
}

#[test]
fn test_deterministic_output() {
    let snapshot = ConfigSnapshot::default();
    let request = neutral()
        .with_dimension(Dimension::Bias, DetectorOutput::new(0.33, 0.41).with_evidence("loaded terms"))
        .with_narrative("Methodology looks sound but fraud flags need a closer look.");

    let a = serde_json::to_string(&review(&request, &snapshot).unwrap()).unwrap();
    let b = serde_json::to_string(&review(&request, &snapshot).unwrap()).unwrap();
    assert_eq!(a, b);
}

#[test]
fn test_monotonic_in_each_dimension() {
    let snapshot = ConfigSnapshot::default();
    let config = snapshot.config();

    for dimension in Dimension::ALL {
        let mut previous: Option<f64> = None;
        for step in 0..=10 {
            let raw = step as f64 / 10.0;
            let request = neutral().with_dimension(dimension, DetectorOutput::new(raw, 0.7));
            let score = review(&request, &snapshot).unwrap().verdict.overall_score;

            if let Some(prev) = previous {
                if config.dimensions[&dimension].inverted {
                    assert!(score <= prev + 1e-12, "{} raised score at raw {}", dimension, raw);
                } else {
                    assert!(score >= prev - 1e-12, "{} lowered score at raw {}", dimension, raw);
                }
            }
            previous = Some(score);
        }
    }
}

#[test]
fn test_interval_contains_score() {
    let snapshot = ConfigSnapshot::default();
    for (score, confidence) in [(0.0, 0.0), (1.0, 0.0), (0.5, 0.1), (0.95, 0.3), (0.2, 1.0)] {
        let outcome = review(&effective(score, confidence), &snapshot).unwrap();
        let verdict = &outcome.verdict;
        let interval = verdict.confidence_interval;

        assert!(0.0 <= interval.lower && interval.upper <= 1.0);
        assert!(interval.contains(verdict.overall_score));
    }
}

#[test]
fn test_fraud_override_at_perfect_score() {
    let snapshot = ConfigSnapshot::build(without_weight(Dimension::Fraud), 1).unwrap();
    let request = effective(1.0, 1.0).with_dimension(Dimension::Fraud, DetectorOutput::new(0.95, 1.0));
    let outcome = review(&request, &snapshot).unwrap();

    assert!(outcome.verdict.overall_score > 1.0 - 1e-9);
    assert_eq!(outcome.verdict.base_label, VerdictLabel::Reliable);
    assert_eq!(outcome.verdict.label, VerdictLabel::HighRisk);
}

#[test]
fn test_ethics_risk_forbids_reliable() {
    let snapshot = ConfigSnapshot::build(without_weight(Dimension::Ethics), 1).unwrap();
    let request = effective(1.0, 1.0).with_dimension(Dimension::Ethics, DetectorOutput::new(0.9, 1.0));
    let outcome = review(&request, &snapshot).unwrap();

    assert_eq!(outcome.verdict.base_label, VerdictLabel::Reliable);
    assert_eq!(outcome.verdict.label, VerdictLabel::Mixed);
    assert_eq!(outcome.verdict.deciding_rule.as_deref(), Some("ethics-risk"));
}

#[test]
fn test_unbalanced_weights_rejected() {
    let mut config = EngineConfig::default();
    config.dimensions.get_mut(&Dimension::Bias).unwrap().weight = 0.3;

    assert!(matches!(ReviewEngine::new(config), Err(ConfigError::WeightSum { .. })));
}

#[test]
fn test_config_swap_applies_to_next_review() {
    let engine = ReviewEngine::default();
    let before = engine.store().snapshot();

    let mut stricter = EngineConfig::default();
    stricter.bands.reliable_min = 0.95;
    assert_eq!(engine.store().replace(stricter).unwrap(), 2);

    let request = effective(0.9, 0.9);
    let after = engine.review(&request).unwrap();
    assert_eq!(after.config_version, 2);
    assert_eq!(after.verdict.label, VerdictLabel::Mixed);

    // A review holding the earlier snapshot is unaffected
    let pinned = review(&request, &before).unwrap();
    assert_eq!(pinned.config_version, 1);
    assert_eq!(pinned.verdict.label, VerdictLabel::Reliable);
}
