//! Hard-constraint feasibility evaluation.

use tracing::debug;

use super::{failure_entries, guarded, EvaluationFailure, Violation};
use crate::catalog::ConstraintSet;
use crate::constraints::{Priority, Severity};
use crate::models::ScheduleView;

/// Hard evaluation result.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HardOutcome {
    /// Violations in tier order, then registration order.
    pub violations: Vec<Violation>,
    /// Checks that failed to complete.
    pub failures: Vec<EvaluationFailure>,
    /// Tiers with at least one violation, most severe first.
    pub failed_tiers: Vec<Priority>,
}

impl HardOutcome {
    /// Whether every hard rule held.
    pub fn is_feasible(&self) -> bool {
        self.violations.is_empty()
    }
}

/// Evaluates every enabled hard constraint, tier by tier.
///
/// All tiers are evaluated even after one fails so callers get complete
/// diagnostics; feasibility is lost as soon as any tier has a violation.
#[derive(Debug, Clone, Copy, Default)]
pub struct HardConstraintEvaluator;

impl HardConstraintEvaluator {
    /// Creates an evaluator.
    pub fn new() -> Self {
        Self
    }

    /// Evaluates `set`'s hard constraints against `view`.
    pub fn evaluate(&self, set: &ConstraintSet, view: &ScheduleView<'_>) -> HardOutcome {
        let mut out = HardOutcome::default();

        for tier in Priority::TIERS {
            let before = out.violations.len();
            for def in set.hard().iter().filter(|d| d.priority == tier) {
                match guarded(|| def.rule().check(set, view)) {
                    Ok(findings) => {
                        out.violations.extend(findings.into_iter().map(|f| Violation {
                            constraint_id: def.id.clone(),
                            kind: def.kind,
                            severity: Severity::from(tier),
                            tier: Some(tier),
                            message: f.message,
                            affected_entities: f.affected_entities,
                            penalty: 0.0,
                        }));
                    }
                    Err(err) => {
                        debug!(constraint = %def.id, error = %err, "hard check failed");
                        let (violation, failure) = failure_entries(def, &err);
                        out.violations.push(violation);
                        out.failures.push(failure);
                    }
                }
            }
            if out.violations.len() > before {
                debug!(tier = ?tier, count = out.violations.len() - before, "tier violated");
                out.failed_tiers.push(tier);
            }
        }
        out
    }
}
