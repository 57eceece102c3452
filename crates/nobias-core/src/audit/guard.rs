//! Self-audit guard
//!
//! Runs the check battery over everything the pipeline has said so far. The
//! guard only reads its input; it can recommend a downgrade but has no way
//! to change scores or the verdict.

use serde::{Deserialize, Serialize};

use super::config::{AuditConfig, Direction, Incompatibility};
use super::lexicon::AuditLexicon;
use super::types::{AuditCheck, AuditFinding, HallucinationAudit};
use crate::collect::ComponentScore;
use crate::dimension::Dimension;
use crate::trace::ReasoningStep;
use crate::verdict::{Reason, VerdictLabel};

/// Cap on reported matches per finding
const MAX_MATCHES: usize = 10;

/// Where an audited step came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepOrigin {
    /// Engine trace step
    Trace,
    /// Generated summary reason
    Summary,
    /// Caller-supplied narrative
    Narrative,
}

/// One reasoning step as seen by the audit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditedStep {
    pub origin: StepOrigin,
    pub text: String,
    pub referenced_dimensions: Vec<Dimension>,
}

/// Everything the guard inspects
#[derive(Debug, Clone)]
pub struct AuditInput<'a> {
    scores: &'a [ComponentScore],
    steps: Vec<AuditedStep>,
}

impl<'a> AuditInput<'a> {
    pub fn new(scores: &'a [ComponentScore]) -> Self {
        Self {
            scores,
            steps: Vec::new(),
        }
    }

    pub fn with_trace(mut self, steps: &[ReasoningStep]) -> Self {
        self.steps.extend(steps.iter().map(|s| AuditedStep {
            origin: StepOrigin::Trace,
            text: s.message.clone(),
            referenced_dimensions: s.referenced_dimensions.clone(),
        }));
        self
    }

    pub fn with_summary(mut self, reasons: &[Reason]) -> Self {
        self.steps.extend(reasons.iter().map(|r| AuditedStep {
            origin: StepOrigin::Summary,
            text: r.text.clone(),
            referenced_dimensions: r.dimensions.clone(),
        }));
        self
    }

    /// Narrative steps reference the dimensions they name.
    pub fn with_narrative(mut self, narrative: &[String]) -> Self {
        self.steps.extend(narrative.iter().map(|text| AuditedStep {
            origin: StepOrigin::Narrative,
            text: text.clone(),
            referenced_dimensions: Dimension::ALL
                .iter()
                .copied()
                .filter(|d| d.is_mentioned_in(text))
                .collect(),
        }));
        self
    }

    pub fn steps(&self) -> &[AuditedStep] {
        &self.steps
    }

    /// Evidence strings followed by step texts
    fn texts(&self) -> Vec<&str> {
        self.scores
            .iter()
            .flat_map(|s| s.evidence().iter().map(String::as_str))
            .chain(self.steps.iter().map(|s| s.text.as_str()))
            .collect()
    }
}

/// Runs the fixed audit battery
pub struct SelfAuditGuard<'a> {
    config: &'a AuditConfig,
    lexicon: &'a AuditLexicon,
}

impl<'a> SelfAuditGuard<'a> {
    pub fn new(config: &'a AuditConfig, lexicon: &'a AuditLexicon) -> Self {
        Self { config, lexicon }
    }

    /// Audit `input`; `label` is only used to phrase the recommendation.
    pub fn audit(&self, input: &AuditInput<'_>, label: VerdictLabel) -> HallucinationAudit {
        let findings = vec![
            self.check_overconfidence(input),
            self.check_unsupported_claims(input),
            self.check_contradictions(input),
            self.check_textual_contradictions(input),
        ];

        let risk: f64 = findings
            .iter()
            .filter(|f| f.triggered)
            .map(|f| self.config.risk_weights.get(f.check) * f.severity.score())
            .sum();
        let overall_risk = risk.clamp(0.0, 1.0);

        let passed_all = !findings
            .iter()
            .any(|f| f.triggered && f.severity > self.config.pass_threshold);
        let recommended_label = if passed_all { None } else { label.next_worse() };

        HallucinationAudit {
            findings,
            overall_risk,
            passed_all,
            skipped: None,
            recommended_label,
        }
    }

    fn check_overconfidence(&self, input: &AuditInput<'_>) -> AuditFinding {
        let check = AuditCheck::Overconfidence;
        let mut count = 0;
        let mut matches = Vec::new();

        for text in input.texts() {
            for pattern in &self.lexicon.overconfidence {
                for m in pattern.find_iter(text) {
                    count += 1;
                    if matches.len() < MAX_MATCHES {
                        matches.push(m.as_str().to_lowercase());
                    }
                }
            }
        }

        let threshold = self.config.overconfidence_min_matches;
        let detail = format!(
            "{} absolute-certainty phrase(s) found, threshold {}",
            count, threshold
        );
        if count >= threshold {
            AuditFinding::triggered(check, self.config.severities.get(check), detail, matches)
        } else {
            AuditFinding::passed(check, detail)
        }
    }

    fn check_unsupported_claims(&self, input: &AuditInput<'_>) -> AuditFinding {
        let check = AuditCheck::UnsupportedClaim;
        let offending: Vec<&AuditedStep> = input
            .steps()
            .iter()
            .filter(|s| s.referenced_dimensions.is_empty())
            .filter(|s| self.lexicon.numeric_claim.is_match(&s.text))
            .collect();

        if offending.is_empty() {
            return AuditFinding::passed(check, "every numeric claim references evidence");
        }
        let detail = format!(
            "{} step(s) assert a numeric conclusion without referencing any dimension",
            offending.len()
        );
        let matches = offending
            .iter()
            .take(MAX_MATCHES)
            .map(|s| s.text.clone())
            .collect();
        AuditFinding::triggered(check, self.config.severities.get(check), detail, matches)
    }

    fn check_contradictions(&self, input: &AuditInput<'_>) -> AuditFinding {
        let check = AuditCheck::Contradiction;
        let conflicts: Vec<String> = self
            .config
            .incompatibilities
            .iter()
            .filter(|pair| self.pair_holds(pair, input.scores))
            .filter(|pair| !self.reconciled(pair, input))
            .map(|pair| {
                format!(
                    "{} {} vs {} {}",
                    pair.first, pair.first_direction, pair.second, pair.second_direction
                )
            })
            .collect();

        if conflicts.is_empty() {
            return AuditFinding::passed(check, "no unreconciled incompatible signals");
        }
        let detail = format!("{} unreconciled incompatible signal pair(s)", conflicts.len());
        AuditFinding::triggered(check, self.config.severities.get(check), detail, conflicts)
    }

    fn check_textual_contradictions(&self, input: &AuditInput<'_>) -> AuditFinding {
        let check = AuditCheck::TextualContradiction;
        let mut matches = Vec::new();
        let mut count = 0;

        for text in input.texts() {
            for pattern in &self.lexicon.contradictions {
                for m in pattern.find_iter(text) {
                    count += 1;
                    if matches.len() < MAX_MATCHES {
                        matches.push(m.as_str().to_string());
                    }
                }
            }
        }

        if count == 0 {
            return AuditFinding::passed(check, "no self-contradicting phrasing");
        }
        let detail = format!("{} self-contradicting passage(s)", count);
        AuditFinding::triggered(check, self.config.severities.get(check), detail, matches)
    }

    /// Direction of an observed score; defaulted dimensions have none
    fn direction(&self, score: &ComponentScore) -> Option<Direction> {
        if !score.is_observed() {
            return None;
        }
        let effective = score.effective_score();
        if effective >= self.config.positive_threshold {
            Some(Direction::Positive)
        } else if effective <= self.config.negative_threshold {
            Some(Direction::Negative)
        } else {
            None
        }
    }

    fn pair_holds(&self, pair: &Incompatibility, scores: &[ComponentScore]) -> bool {
        let direction_of = |dim: Dimension| {
            scores
                .iter()
                .find(|s| s.dimension() == dim)
                .and_then(|s| self.direction(s))
        };
        direction_of(pair.first) == Some(pair.first_direction)
            && direction_of(pair.second) == Some(pair.second_direction)
    }

    /// A pair is reconciled when evidence of one side names the other, or
    /// a narrative step names both.
    fn reconciled(&self, pair: &Incompatibility, input: &AuditInput<'_>) -> bool {
        let cross_referenced = |from: Dimension, to: Dimension| {
            input
                .scores
                .iter()
                .filter(|s| s.dimension() == from)
                .flat_map(|s| s.evidence())
                .any(|e| to.is_mentioned_in(e))
        };
        if cross_referenced(pair.first, pair.second) || cross_referenced(pair.second, pair.first) {
            return true;
        }
        input.steps().iter().any(|s| {
            s.origin == StepOrigin::Narrative
                && s.referenced_dimensions.contains(&pair.first)
                && s.referenced_dimensions.contains(&pair.second)
        })
    }
}
