//! Solver bridge: compile, solve, interpret, verify.
//!
//! Translates a resolved [`ConstraintSet`] and a [`SchedulingContext`]
//! into a [`SolverModel`] of boolean variables and linear rows, hands it
//! to a [`Solver`], maps the answer back to [`Assignment`]s, and re-runs
//! full validation on the result (generate-then-verify).
//!
//! Hard constraints without a linear encoding abort a strict compile and
//! are deferred to post-solve verification otherwise. Soft constraints
//! without an encoding are scored only by validation.
//!
//! # Reference
//! - Wolsey (1998), "Integer Programming", Ch. 1 (formulations)
//! - Hooker (2000), "Logic-Based Methods for Optimization" (generate-and-test)

mod model;
mod solver;

pub use model::{
    Encoding, LinearConstraint, ModelBuilder, ObjectiveTerm, Sense, SolverModel, VarId, VarInfo,
    VarKey, WeightedSum,
};
pub use solver::{CancelToken, GreedySolver, Solver, SolverSolution, SolverStatus};

use tracing::{debug, info, warn};

use crate::catalog::ConstraintSet;
use crate::error::SolverError;
use crate::evaluation::{ValidationEngine, ValidationReport};
use crate::models::{Assignment, SchedulingContext};

/// How non-linearizable hard constraints are handled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CompileMode {
    /// Fail with [`SolverError::UnsupportedConstraint`].
    Strict,
    /// Record in `SolverModel::deferred` and verify after solving.
    #[default]
    Deferred,
}

/// Result of [`SolverBridge::solve_and_verify`].
#[derive(Debug, Clone, PartialEq)]
pub enum BridgeOutcome {
    /// The solution passed full validation.
    Accepted {
        /// Interpreted assignments.
        assignments: Vec<Assignment>,
        /// Validation of `assignments`.
        report: ValidationReport,
        /// Raw solver output.
        solution: SolverSolution,
    },
    /// The solution broke a hard rule; the caller should re-solve.
    Rejected {
        /// Interpreted assignments.
        assignments: Vec<Assignment>,
        /// Validation of `assignments`.
        report: ValidationReport,
        /// Deferred constraints that reported violations.
        failed_deferred: Vec<String>,
    },
    /// The solver produced no assignment.
    NoSolution {
        /// Solver verdict.
        status: SolverStatus,
    },
}

impl BridgeOutcome {
    /// Whether the outcome carries a valid schedule.
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted { .. })
    }

    /// Validation report, if the solver produced assignments.
    pub fn report(&self) -> Option<&ValidationReport> {
        match self {
            Self::Accepted { report, .. } | Self::Rejected { report, .. } => Some(report),
            Self::NoSolution { .. } => None,
        }
    }
}

/// Compiles constraint sets for an external solver and verifies results.
#[derive(Debug, Clone, Copy, Default)]
pub struct SolverBridge {
    mode: CompileMode,
    engine: ValidationEngine,
}

impl SolverBridge {
    /// Creates a bridge in the given mode.
    pub fn new(mode: CompileMode) -> Self {
        Self {
            mode,
            engine: ValidationEngine::new(),
        }
    }

    /// Strict bridge.
    pub fn strict() -> Self {
        Self::new(CompileMode::Strict)
    }

    /// Compile mode.
    pub fn mode(&self) -> CompileMode {
        self.mode
    }

    /// Compiles `set` over `context` into a solver model.
    ///
    /// Soft weights come from one snapshot of the set's weight cell, so
    /// objective terms match what validation would score at that moment.
    pub fn compile(
        &self,
        set: &ConstraintSet,
        context: &SchedulingContext,
    ) -> Result<SolverModel, SolverError> {
        let weights = set.weights();
        let mut builder = ModelBuilder::new(context);
        let mut deferred = Vec::new();
        let mut post_hoc = Vec::new();

        for def in set.hard() {
            builder.begin(&def.id, 0.0);
            match def.rule().encode(&mut builder) {
                Encoding::Encoded => {}
                Encoding::Unsupported | Encoding::ValidationOnly => match self.mode {
                    CompileMode::Strict => {
                        warn!(constraint = %def.id, "hard constraint has no solver encoding");
                        return Err(SolverError::UnsupportedConstraint {
                            constraint_id: def.id.clone(),
                        });
                    }
                    CompileMode::Deferred => {
                        debug!(constraint = %def.id, "deferred to post-solve verification");
                        deferred.push(def.id.clone());
                    }
                },
            }
        }

        for def in set.soft() {
            if weights.is_suspended(&def.id) {
                continue;
            }
            let weight = weights.weight(&def.id).unwrap_or(def.weight);
            builder.begin(&def.id, weight);
            if def.rule().encode(&mut builder) != Encoding::Encoded {
                post_hoc.push(def.id.clone());
            }
        }

        let model = builder.finish(set.generation(), deferred, post_hoc);
        info!(
            variables = model.variable_count(),
            rows = model.constraint_count(),
            objective_terms = model.objective.terms.len(),
            deferred = ?model.deferred,
            post_hoc = ?model.post_hoc,
            "solver model compiled"
        );
        Ok(model)
    }

    /// Maps a solution back to assignments.
    pub fn interpret(
        &self,
        model: &SolverModel,
        solution: &SolverSolution,
    ) -> Result<Vec<Assignment>, SolverError> {
        if solution.status == SolverStatus::Error {
            return Err(SolverError::Failed(
                solution
                    .message
                    .clone()
                    .unwrap_or_else(|| "solver reported ERROR".to_string()),
            ));
        }
        solution
            .assignments
            .iter()
            .map(|key| match model.var(key) {
                Some(_) => Ok(Assignment::from(key)),
                None => Err(SolverError::UnknownVariable {
                    person_id: key.person_id.clone(),
                    block_id: key.block_id.clone(),
                    template_id: key.template_id.clone(),
                }),
            })
            .collect()
    }

    /// Compiles, solves, interprets, and validates.
    ///
    /// INFEASIBLE is an outcome, not an error. Solver errors are returned
    /// as-is and never retried.
    pub fn solve_and_verify(
        &self,
        set: &ConstraintSet,
        context: &SchedulingContext,
        solver: &dyn Solver,
        cancel: &CancelToken,
    ) -> Result<BridgeOutcome, SolverError> {
        let model = self.compile(set, context)?;
        if cancel.is_cancelled() {
            return Err(SolverError::Cancelled);
        }

        let solution = solver.solve(&model, cancel)?;
        debug!(solver = solver.name(), status = ?solution.status, "solver returned");
        match solution.status {
            SolverStatus::Infeasible => {
                return Ok(BridgeOutcome::NoSolution {
                    status: solution.status,
                })
            }
            SolverStatus::Error => {
                return Err(SolverError::Failed(
                    solution.message.unwrap_or_else(|| "solver reported ERROR".to_string()),
                ))
            }
            SolverStatus::Optimal | SolverStatus::Feasible => {}
        }

        let assignments = self.interpret(&model, &solution)?;
        let report = self.engine.validate_assignments(set, context, &assignments);

        if report.is_feasible {
            info!(assignments = assignments.len(), objective = report.objective_score, "solution accepted");
            return Ok(BridgeOutcome::Accepted {
                assignments,
                report,
                solution,
            });
        }

        let failed_deferred: Vec<String> = model
            .deferred
            .iter()
            .filter(|id| report.violations_of(id).next().is_some())
            .cloned()
            .collect();
        warn!(
            hard_violations = report.hard_violations().count(),
            failed_deferred = ?failed_deferred,
            "solution rejected by validation"
        );
        Ok(BridgeOutcome::Rejected {
            assignments,
            report,
            failed_deferred,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraints::library::{ids, standard_catalog};
    use crate::models::{Block, Person, Role, RotationTemplate, TemplateKind};
    use chrono::NaiveDate;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 7, day).unwrap()
    }

    /// Tue/Wed half-days plus Tuesday night call.
    fn ctx() -> SchedulingContext {
        SchedulingContext::new()
            .with_person(Person::resident("R1", 2))
            .with_person(Person::resident("R2", 1))
            .with_person(Person::faculty("F1"))
            .with_person(Person::faculty("F2"))
            .with_block(Block::am("D1-AM", d(1)))
            .with_block(Block::pm("D1-PM", d(1)))
            .with_block(Block::night("D1-N", d(1)))
            .with_block(Block::am("D2-AM", d(2)))
            .with_block(Block::pm("D2-PM", d(2)))
            .with_template(RotationTemplate::new("CLINIC", TemplateKind::Clinic).supervised())
            .with_template(RotationTemplate::new("CALL", TemplateKind::OvernightCall).for_role(Role::Faculty))
    }

    #[test]
    fn test_strict_compile_rejects_unencodable_hard_rule() {
        let set = standard_catalog().unwrap().resolve().unwrap();
        let err = SolverBridge::strict().compile(&set, &ctx()).unwrap_err();
        assert_eq!(
            err,
            SolverError::UnsupportedConstraint {
                constraint_id: ids::ONE_IN_SEVEN_RULE.to_string()
            }
        );
    }

    #[test]
    fn test_deferred_compile_records_deferrals() {
        let set = standard_catalog().unwrap().resolve().unwrap();
        let model = SolverBridge::default().compile(&set, &ctx()).unwrap();
        assert_eq!(model.deferred, vec![ids::ONE_IN_SEVEN_RULE.to_string()]);
        assert!(model.post_hoc.contains(&ids::CONTINUITY.to_string()));
        assert_eq!(model.set_generation, set.generation());
        // 4 people × (4 day blocks × CLINIC + 1 night × CALL)
        assert_eq!(model.variable_count(), 20);
    }

    #[test]
    fn test_round_trip_is_accepted() {
        let set = standard_catalog().unwrap().resolve().unwrap();
        let ctx = ctx();
        let outcome = SolverBridge::default()
            .solve_and_verify(&set, &ctx, &GreedySolver::new(), &CancelToken::new())
            .unwrap();

        let BridgeOutcome::Accepted { assignments, report, .. } = outcome else {
            panic!("expected acceptance, got {outcome:?}");
        };
        assert!(report.is_feasible);
        let calls = assignments.iter().filter(|a| a.template_id == "CALL").count();
        assert_eq!(calls, 1);
    }

    #[test]
    fn test_interpret_unknown_variable() {
        let set = standard_catalog().unwrap().resolve().unwrap();
        let bridge = SolverBridge::default();
        let model = bridge.compile(&set, &ctx()).unwrap();
        let solution = SolverSolution {
            status: SolverStatus::Feasible,
            assignments: vec![VarKey::new("GHOST", "D1-AM", "CLINIC")],
            objective_value: 0.0,
            is_optimal: false,
            gap_pct: None,
            message: None,
        };
        assert!(matches!(
            bridge.interpret(&model, &solution),
            Err(SolverError::UnknownVariable { .. })
        ));
        assert!(matches!(
            bridge.interpret(&model, &SolverSolution::error("boom")),
            Err(SolverError::Failed(_))
        ));
    }

    #[derive(Debug)]
    struct NeverFeasible;

    impl Solver for NeverFeasible {
        fn name(&self) -> &str {
            "never"
        }

        fn solve(&self, _model: &SolverModel, _cancel: &CancelToken) -> Result<SolverSolution, SolverError> {
            Ok(SolverSolution::infeasible("no"))
        }
    }

    #[test]
    fn test_infeasible_is_an_outcome() {
        let set = standard_catalog().unwrap().resolve().unwrap();
        let outcome = SolverBridge::default()
            .solve_and_verify(&set, &ctx(), &NeverFeasible, &CancelToken::new())
            .unwrap();
        assert_eq!(
            outcome,
            BridgeOutcome::NoSolution {
                status: SolverStatus::Infeasible
            }
        );
        assert!(outcome.report().is_none());
    }

    #[test]
    fn test_cancelled_before_solve() {
        let set = standard_catalog().unwrap().resolve().unwrap();
        let token = CancelToken::new();
        token.cancel();
        let err = SolverBridge::default()
            .solve_and_verify(&set, &ctx(), &GreedySolver::new(), &token)
            .unwrap_err();
        assert_eq!(err, SolverError::Cancelled);
    }
}
