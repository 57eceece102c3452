//! Declarative override rules
//!
//! Hard rules that can force a worse verdict regardless of the aggregate
//! score, so one severe localized signal is never diluted by otherwise
//! strong evidence. Each rule is data: a predicate over component scores, an
//! action, and a priority.
//!
//! All rules are evaluated, not just the first match. The deciding label is
//! the most severe among triggered rules; among equally severe rules the
//! highest priority one decides.
//!
//! # Example
//!
//! ```rust
//! use nobias_core::overrides::{Comparison, OverrideAction, OverrideRule, Predicate, Signal};
//! use nobias_core::{Dimension, VerdictLabel};
//!
//! let rule = OverrideRule {
//!     id: "fraud-suspicion".into(),
//!     description: "High fraud suspicion".into(),
//!     priority: 100,
//!     when: Predicate::compare(Dimension::Fraud, Signal::Raw, Comparison::Gt, 0.7),
//!     action: OverrideAction::Force(VerdictLabel::HighRisk),
//! };
//! assert_eq!(rule.action.floor_label(), Some(VerdictLabel::HighRisk));
//! ```

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::collect::{in_unit_range, ComponentScore};
use crate::dimension::Dimension;
use crate::error::{ConfigError, ConfigResult};
use crate::verdict::VerdictLabel;

/// Deepest allowed predicate nesting
pub const MAX_PREDICATE_DEPTH: usize = 8;

/// Which value of a component score a predicate reads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Signal {
    /// Score as reported by the detector (suspicion for inverted dimensions)
    #[default]
    Raw,
    /// Score after inversion and dependency floors
    Effective,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Comparison {
    Gt,
    Ge,
    Lt,
    Le,
}

impl Comparison {
    pub fn holds(&self, value: f64, threshold: f64) -> bool {
        match self {
            Self::Gt => value > threshold,
            Self::Ge => value >= threshold,
            Self::Lt => value < threshold,
            Self::Le => value <= threshold,
        }
    }
}

impl std::fmt::Display for Comparison {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Gt => write!(f, ">"),
            Self::Ge => write!(f, ">="),
            Self::Lt => write!(f, "<"),
            Self::Le => write!(f, "<="),
        }
    }
}

/// Condition over component scores
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Predicate {
    Compare {
        dimension: Dimension,
        #[serde(default)]
        signal: Signal,
        cmp: Comparison,
        threshold: f64,
    },
    All {
        of: Vec<Predicate>,
    },
    Any {
        of: Vec<Predicate>,
    },
    Not {
        predicate: Box<Predicate>,
    },
}

impl Predicate {
    pub fn compare(dimension: Dimension, signal: Signal, cmp: Comparison, threshold: f64) -> Self {
        Self::Compare {
            dimension,
            signal,
            cmp,
            threshold,
        }
    }

    /// Evaluate against collected scores. A dimension with no score never
    /// satisfies a comparison.
    pub fn evaluate(&self, scores: &[ComponentScore]) -> bool {
        match self {
            Self::Compare {
                dimension,
                signal,
                cmp,
                threshold,
            } => scores
                .iter()
                .find(|s| s.dimension() == *dimension)
                .map(|s| {
                    let value = match signal {
                        Signal::Raw => s.raw_score(),
                        Signal::Effective => s.effective_score(),
                    };
                    cmp.holds(value, *threshold)
                })
                .unwrap_or(false),
            Self::All { of } => of.iter().all(|p| p.evaluate(scores)),
            Self::Any { of } => of.iter().any(|p| p.evaluate(scores)),
            Self::Not { predicate } => !predicate.evaluate(scores),
        }
    }

    /// Dimensions the predicate reads, canonical order
    pub fn dimensions(&self) -> Vec<Dimension> {
        let mut dims = Vec::new();
        self.collect_dimensions(&mut dims);
        dims.sort();
        dims.dedup();
        dims
    }

    fn collect_dimensions(&self, out: &mut Vec<Dimension>) {
        match self {
            Self::Compare { dimension, .. } => out.push(*dimension),
            Self::All { of } | Self::Any { of } => {
                for p in of {
                    p.collect_dimensions(out);
                }
            }
            Self::Not { predicate } => predicate.collect_dimensions(out),
        }
    }

    fn validate(&self, depth: usize) -> Result<(), String> {
        if depth > MAX_PREDICATE_DEPTH {
            return Err(format!("predicate nested deeper than {}", MAX_PREDICATE_DEPTH));
        }
        match self {
            Self::Compare {
                dimension,
                threshold,
                ..
            } => {
                if in_unit_range(*threshold) {
                    Ok(())
                } else {
                    Err(format!(
                        "threshold {} for {} outside [0, 1]",
                        threshold, dimension
                    ))
                }
            }
            Self::All { of } | Self::Any { of } => {
                if of.is_empty() {
                    return Err("empty predicate list".to_string());
                }
                of.iter().try_for_each(|p| p.validate(depth + 1))
            }
            Self::Not { predicate } => predicate.validate(depth + 1),
        }
    }
}

/// What a triggered rule does to the label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "label", rename_all = "snake_case")]
pub enum OverrideAction {
    /// Label becomes at least this severe
    Force(VerdictLabel),
    /// Label may not be this one or anything milder
    Forbid(VerdictLabel),
}

impl OverrideAction {
    /// Least severe label the action allows; `None` when nothing is allowed
    pub fn floor_label(&self) -> Option<VerdictLabel> {
        match self {
            Self::Force(label) => Some(*label),
            Self::Forbid(label) => label.next_worse(),
        }
    }
}

/// One declarative override rule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OverrideRule {
    pub id: String,
    #[serde(default)]
    pub description: String,
    pub priority: u32,
    pub when: Predicate,
    pub action: OverrideAction,
}

/// A rule that fired during one review
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggeredRule {
    pub id: String,
    pub description: String,
    pub priority: u32,
    pub floor_label: VerdictLabel,
    pub dimensions: Vec<Dimension>,
}

/// Result of evaluating every rule
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OverrideOutcome {
    /// Triggered rules, highest priority first
    pub triggered: Vec<TriggeredRule>,
    /// Most severe floor among triggered rules
    pub forced_label: Option<VerdictLabel>,
    pub deciding_rule: Option<String>,
}

impl OverrideOutcome {
    pub fn triggered_ids(&self) -> Vec<String> {
        self.triggered.iter().map(|t| t.id.clone()).collect()
    }
}

/// Evaluates a priority-ordered rule table
pub struct OverrideEvaluator<'a> {
    rules: &'a [OverrideRule],
}

impl<'a> OverrideEvaluator<'a> {
    /// `rules` must already be in priority order (see [`sort_rules`]).
    pub fn new(rules: &'a [OverrideRule]) -> Self {
        Self { rules }
    }

    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    /// Dimensions read by any rule
    pub fn dimensions(&self) -> Vec<Dimension> {
        let mut dims: Vec<Dimension> = self.rules.iter().flat_map(|r| r.when.dimensions()).collect();
        dims.sort();
        dims.dedup();
        dims
    }

    pub fn evaluate(&self, scores: &[ComponentScore]) -> OverrideOutcome {
        let mut outcome = OverrideOutcome::default();

        for rule in self.rules {
            if !rule.when.evaluate(scores) {
                continue;
            }
            // Validated at load; a rule without a floor cannot exist here
            let Some(floor_label) = rule.action.floor_label() else {
                continue;
            };
            warn!(rule = %rule.id, label = %floor_label, "override rule triggered");

            if outcome.forced_label.map_or(true, |f| floor_label > f) {
                outcome.forced_label = Some(floor_label);
                outcome.deciding_rule = Some(rule.id.clone());
            }
            outcome.triggered.push(TriggeredRule {
                id: rule.id.clone(),
                description: rule.description.clone(),
                priority: rule.priority,
                floor_label,
                dimensions: rule.when.dimensions(),
            });
        }

        outcome
    }
}

/// Copy of `rules` in evaluation order: priority descending, then id.
pub fn sort_rules(rules: &[OverrideRule]) -> Vec<OverrideRule> {
    let mut sorted = rules.to_vec();
    sorted.sort_by(|a, b| b.priority.cmp(&a.priority).then_with(|| a.id.cmp(&b.id)));
    sorted
}

/// Reject malformed rules at configuration load.
pub fn validate_rules(rules: &[OverrideRule]) -> ConfigResult<()> {
    let mut seen = HashSet::new();
    for rule in rules {
        let malformed = |reason: String| ConfigError::MalformedPredicate {
            rule: rule.id.clone(),
            reason,
        };

        if rule.id.trim().is_empty() {
            return Err(malformed("empty rule id".to_string()));
        }
        if !seen.insert(rule.id.as_str()) {
            return Err(ConfigError::DuplicateRule(rule.id.clone()));
        }
        rule.when.validate(1).map_err(malformed)?;
        if rule.action.floor_label().is_none() {
            return Err(malformed(format!(
                "cannot forbid {}, no more severe label exists",
                VerdictLabel::HighRisk
            )));
        }
    }
    Ok(())
}

/// Built-in rule table
pub fn default_rules() -> Vec<OverrideRule> {
    use Comparison::*;
    use Dimension::*;

    vec![
        OverrideRule {
            id: "fraud-suspicion".to_string(),
            description: "High fraud/anomaly suspicion signals were detected.".to_string(),
            priority: 100,
            when: Predicate::compare(Fraud, Signal::Raw, Gt, 0.7),
            action: OverrideAction::Force(VerdictLabel::HighRisk),
        },
        OverrideRule {
            id: "plagiarism-suspicion".to_string(),
            description: "High plagiarism/redundancy suspicion signals were detected.".to_string(),
            priority: 90,
            when: Predicate::compare(Plagiarism, Signal::Raw, Gt, 0.7),
            action: OverrideAction::Force(VerdictLabel::HighRisk),
        },
        OverrideRule {
            id: "ethics-risk".to_string(),
            description: "High ethics/safety risk signals were detected.".to_string(),
            priority: 80,
            when: Predicate::compare(Ethics, Signal::Raw, Gt, 0.7),
            action: OverrideAction::Forbid(VerdictLabel::Reliable),
        },
        OverrideRule {
            id: "weak-evidence-base".to_string(),
            description: "Statistical and methodology support appears very weak.".to_string(),
            priority: 70,
            when: Predicate::All {
                of: vec![
                    Predicate::compare(Statistics, Signal::Raw, Lt, 0.2),
                    Predicate::compare(Methodology, Signal::Raw, Lt, 0.2),
                ],
            },
            action: OverrideAction::Force(VerdictLabel::HighRisk),
        },
    ]
}
