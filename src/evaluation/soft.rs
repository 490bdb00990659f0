//! Soft-constraint scoring.
//!
//! ```text
//! objective = coverage_term − Σ weight_i × penalty_i
//! ```
//!
//! Weights come from one weight snapshot taken by the caller, so a
//! concurrent re-weighting never splits a single score.

use tracing::debug;

use super::{failure_entries, guarded, EvaluationFailure, SoftTerm, Violation};
use crate::catalog::{ConstraintSet, WeightSnapshot};
use crate::constraints::Severity;
use crate::models::ScheduleView;

/// Soft scoring result.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SoftOutcome {
    /// Findings with weighted penalties, in evaluation order.
    pub violations: Vec<Violation>,
    /// Checks that failed to complete.
    pub failures: Vec<EvaluationFailure>,
    /// Per-constraint contributions.
    pub terms: Vec<SoftTerm>,
    /// Weighted coverage reward.
    pub coverage_term: f64,
    /// Σ weight × penalty.
    pub weighted_penalty: f64,
}

impl SoftOutcome {
    /// `coverage_term - weighted_penalty`.
    pub fn objective(&self) -> f64 {
        self.coverage_term - self.weighted_penalty
    }
}

/// Scores every enabled, unsuspended soft constraint.
#[derive(Debug, Clone, Copy, Default)]
pub struct SoftConstraintScorer;

impl SoftConstraintScorer {
    /// Creates a scorer.
    pub fn new() -> Self {
        Self
    }

    /// Scores `set`'s soft constraints against `view` with `weights`.
    pub fn score(
        &self,
        set: &ConstraintSet,
        view: &ScheduleView<'_>,
        weights: &WeightSnapshot,
    ) -> SoftOutcome {
        let mut out = SoftOutcome::default();

        for def in set.soft() {
            if weights.is_suspended(&def.id) {
                debug!(constraint = %def.id, level = %weights.level(), "suspended at this level");
                continue;
            }
            let weight = weights.weight(&def.id).unwrap_or(def.weight);
            let rule = def.rule();

            match guarded(|| Ok((rule.check(set, view)?, rule.coverage(view)))) {
                Ok((findings, coverage)) => {
                    let penalty: f64 = findings.iter().map(|f| f.penalty).sum();
                    if let Some(amount) = coverage {
                        out.coverage_term += weight * amount;
                    }
                    out.weighted_penalty += weight * penalty;
                    out.terms.push(SoftTerm {
                        constraint_id: def.id.clone(),
                        weight,
                        penalty,
                    });
                    out.violations.extend(findings.into_iter().map(|f| Violation {
                        constraint_id: def.id.clone(),
                        kind: def.kind,
                        severity: Severity::Info,
                        tier: None,
                        message: f.message,
                        affected_entities: f.affected_entities,
                        penalty: weight * f.penalty,
                    }));
                }
                Err(err) => {
                    debug!(constraint = %def.id, error = %err, "soft check failed");
                    let (violation, failure) = failure_entries(def, &err);
                    out.violations.push(violation);
                    out.failures.push(failure);
                }
            }
        }
        out
    }
}
