//! Validation entry point shared by the solver bridge and ad-hoc callers.

use rayon::prelude::*;
use tracing::debug;

use super::{EvaluationStamp, HardConstraintEvaluator, SoftConstraintScorer, ValidationReport};
use crate::catalog::ConstraintSet;
use crate::constraints::ConstraintKind;
use crate::models::{Assignment, ScheduleView, SchedulingContext};

/// Runs hard evaluation and soft scoring over the same view and merges
/// them into a [`ValidationReport`].
///
/// Stateless and `Sync`: one engine can serve a whole worker pool.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidationEngine {
    hard: HardConstraintEvaluator,
    soft: SoftConstraintScorer,
}

impl ValidationEngine {
    /// Creates an engine.
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates the context's own assignments.
    pub fn validate(&self, set: &ConstraintSet, context: &SchedulingContext) -> ValidationReport {
        self.validate_view(set, &context.view())
    }

    /// Validates a candidate assignment set against `context`.
    pub fn validate_assignments(
        &self,
        set: &ConstraintSet,
        context: &SchedulingContext,
        assignments: &[Assignment],
    ) -> ValidationReport {
        self.validate_view(set, &context.view_of(assignments))
    }

    /// Validates many candidates in parallel, sharing one context and set.
    ///
    /// Reports come back in candidate order.
    pub fn validate_batch(
        &self,
        set: &ConstraintSet,
        context: &SchedulingContext,
        candidates: &[Vec<Assignment>],
    ) -> Vec<ValidationReport> {
        debug!(candidates = candidates.len(), "batch validation");
        candidates
            .par_iter()
            .map(|a| self.validate_assignments(set, context, a))
            .collect()
    }

    /// Validates a resolved view.
    pub fn validate_view(&self, set: &ConstraintSet, view: &ScheduleView<'_>) -> ValidationReport {
        let weights = set.weights();

        let hard = self.hard.evaluate(set, view);
        let soft = self.soft.score(set, view, &weights);

        let is_feasible = hard.is_feasible();
        let objective_score = soft.objective();

        let mut soft_violations = soft.violations;
        // Stable: equal penalties keep registration order.
        soft_violations.sort_by(|a, b| b.penalty.total_cmp(&a.penalty));

        let mut violations = hard.violations;
        violations.extend(soft_violations);

        let mut evaluation_errors = hard.failures;
        evaluation_errors.extend(soft.failures);

        let report = ValidationReport {
            is_feasible,
            violations,
            objective_score,
            coverage_term: soft.coverage_term,
            weighted_penalty: soft.weighted_penalty,
            soft_terms: soft.terms,
            evaluation_errors,
            defense_level: weights.level(),
            evaluated_at: EvaluationStamp {
                set_generation: set.generation(),
                weights_version: weights.version(),
            },
        };

        debug!(
            feasible = report.is_feasible,
            hard = report.violations.iter().filter(|v| v.kind == ConstraintKind::Hard).count(),
            soft = report.violations.iter().filter(|v| v.kind == ConstraintKind::Soft).count(),
            objective = report.objective_score,
            errors = report.evaluation_errors.len(),
            "validation complete"
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraints::library::{ids, standard_catalog};
    use crate::constraints::Severity;
    use crate::models::{Block, Person, RotationTemplate, TemplateKind};
    use chrono::NaiveDate;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 7, day).unwrap()
    }

    fn ctx() -> SchedulingContext {
        SchedulingContext::new()
            .with_person(Person::resident("R1", 1).with_absence(d(2), d(3)))
            .with_person(Person::resident("R2", 2))
            .with_person(Person::faculty("F1"))
            .with_block(Block::am("A1", d(1)))
            .with_block(Block::am("A2", d(2)))
            .with_template(RotationTemplate::new("CLINIC", TemplateKind::Clinic).supervised())
            .with_template(RotationTemplate::new("CONF", TemplateKind::Conference))
    }

    #[test]
    fn test_feasible_schedule() {
        let set = standard_catalog().unwrap().resolve().unwrap();
        let ctx = ctx().with_assignments(vec![
            Assignment::new("R1", "A1", "CLINIC"),
            Assignment::new("F1", "A1", "CLINIC"),
        ]);
        let report = ValidationEngine::new().validate(&set, &ctx);
        assert!(report.is_feasible, "{:?}", report.violations);
        assert!(report.hard_violations().next().is_none());
        // 2 worked assignments, Equity spread 1 at weight 10
        assert_eq!(report.coverage_term, 2000.0);
        assert!(report.objective_score < report.coverage_term);
    }

    #[test]
    fn test_critical_violation_comes_first() {
        let set = standard_catalog().unwrap().resolve().unwrap();
        let ctx = ctx().with_assignments(vec![
            Assignment::new("R2", "A1", "CONF"),
            Assignment::new("R2", "A1", "CONF"),
            Assignment::new("R1", "A2", "CLINIC"),
        ]);
        let report = ValidationEngine::new().validate(&set, &ctx);
        assert!(!report.is_feasible);
        assert_eq!(report.violations[0].severity, Severity::Critical);
        assert_eq!(report.violations[0].constraint_id, ids::AVAILABILITY);
        assert!(report.violations_of(ids::ONE_PERSON_PER_BLOCK).count() >= 1);
    }

    #[test]
    fn test_soft_sorted_by_penalty() {
        let set = standard_catalog().unwrap().resolve().unwrap();
        let ctx = ctx().with_assignments(vec![
            Assignment::new("R2", "A1", "CLINIC"),
            Assignment::new("R2", "A2", "CONF"),
            Assignment::new("F1", "A1", "CLINIC"),
        ]);
        let report = ValidationEngine::new().validate(&set, &ctx);
        let penalties: Vec<f64> = report.soft_violations().map(|v| v.penalty).collect();
        assert!(penalties.windows(2).all(|w| w[0] >= w[1]));
    }

    #[test]
    fn test_repeated_validation_is_identical() {
        let set = standard_catalog().unwrap().resolve().unwrap();
        let ctx = ctx().with_assignments(vec![
            Assignment::new("R1", "A2", "CLINIC"),
            Assignment::new("R2", "A1", "CLINIC"),
        ]);
        let engine = ValidationEngine::new();
        let a = engine.validate(&set, &ctx).to_json().unwrap();
        let b = engine.validate(&set, &ctx).to_json().unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_batch_matches_sequential() {
        let set = standard_catalog().unwrap().resolve().unwrap();
        let ctx = ctx();
        let candidates = vec![
            vec![Assignment::new("R1", "A1", "CLINIC")],
            vec![Assignment::new("R1", "A2", "CLINIC")],
            Vec::new(),
        ];
        let engine = ValidationEngine::new();
        let batch = engine.validate_batch(&set, &ctx, &candidates);
        assert_eq!(batch.len(), 3);
        for (report, cand) in batch.iter().zip(&candidates) {
            assert_eq!(report, &engine.validate_assignments(&set, &ctx, cand));
        }
        assert!(!batch[1].is_feasible);
    }
}
