//! Solver protocol and a reference greedy solver.
//!
//! # Algorithm (GreedySolver)
//! 1. Shuffle variables with a seeded RNG (tie-breaking only)
//! 2. Stable-sort into tiers: variables that close an equality or
//!    positive covering row first, then supervising-style contributors
//!    to `≥` rows, then everything else; within a tier by objective
//!    coefficient, descending
//! 3. Set each variable to 1 if it improves the objective or fills a
//!    covering deficit, and no incident row would break
//!
//! Complexity: O(n log n + nnz) where nnz is the number of row terms.
//!
//! # Reference
//! Chvátal (1979), "A Greedy Heuristic for the Set-Covering Problem"

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::model::{Sense, SolverModel, VarKey};
use crate::error::SolverError;

/// Cooperative cancellation flag shared between caller and solver.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// Creates an uncancelled token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// Whether cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Solver verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SolverStatus {
    /// Proven optimal.
    Optimal,
    /// Feasible, optimality not proven.
    Feasible,
    /// No assignment satisfies the rows.
    Infeasible,
    /// The solver failed.
    Error,
}

/// Solver output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolverSolution {
    /// Verdict.
    pub status: SolverStatus,
    /// Variables set to 1.
    pub assignments: Vec<VarKey>,
    /// Objective value of `assignments`.
    pub objective_value: f64,
    /// Whether optimality was proven.
    pub is_optimal: bool,
    /// Relative gap to the best bound, in percent.
    pub gap_pct: Option<f64>,
    /// Diagnostic text.
    #[serde(default)]
    pub message: Option<String>,
}

impl SolverSolution {
    /// An INFEASIBLE verdict.
    pub fn infeasible(message: impl Into<String>) -> Self {
        Self {
            status: SolverStatus::Infeasible,
            assignments: Vec::new(),
            objective_value: 0.0,
            is_optimal: false,
            gap_pct: None,
            message: Some(message.into()),
        }
    }

    /// An ERROR verdict.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: SolverStatus::Error,
            message: Some(message.into()),
            ..Self::infeasible("")
        }
    }

    /// Whether the solution carries usable assignments.
    pub fn has_assignments(&self) -> bool {
        matches!(self.status, SolverStatus::Optimal | SolverStatus::Feasible)
    }
}

/// Anything that can solve a [`SolverModel`].
///
/// Implementations should poll `cancel` and return
/// [`SolverError::Cancelled`] promptly once it is set.
pub trait Solver: Send + Sync {
    /// Display name for logs.
    fn name(&self) -> &str;

    /// Solves `model`.
    fn solve(&self, model: &SolverModel, cancel: &CancelToken) -> Result<SolverSolution, SolverError>;
}

/// Single-pass greedy construction over the linear rows.
///
/// Never violates an `≤` row; may leave `≥`/`=` rows short, in which case
/// it reports INFEASIBLE.
#[derive(Debug, Clone, Copy)]
pub struct GreedySolver {
    seed: u64,
}

impl Default for GreedySolver {
    fn default() -> Self {
        Self { seed: 42 }
    }
}

impl GreedySolver {
    /// Creates a solver with the default seed.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the tie-breaking seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Tie-breaking seed.
    pub fn seed(&self) -> u64 {
        self.seed
    }
}

impl Solver for GreedySolver {
    fn name(&self) -> &str {
        "greedy"
    }

    fn solve(&self, model: &SolverModel, cancel: &CancelToken) -> Result<SolverSolution, SolverError> {
        let n = model.variable_count();
        let rows = &model.hard_constraints;
        let objective = model.objective.coefficients(n);

        // var -> [(row, coef)]
        let mut incidence: Vec<Vec<(usize, i64)>> = vec![Vec::new(); n];
        for (r, row) in rows.iter().enumerate() {
            for &(v, c) in &row.terms {
                let slot = incidence.get_mut(v).ok_or_else(|| {
                    SolverError::Failed(format!("row '{}' references variable {v} of {n}", row.source))
                })?;
                slot.push((r, c));
            }
        }

        let tier = |v: usize| -> u8 {
            let covering = |(r, c): &(usize, i64)| {
                let row = &rows[*r];
                *c > 0 && matches!(row.sense, Sense::Eq | Sense::Ge) && row.rhs > 0
            };
            if incidence[v].iter().any(covering) {
                0
            } else if incidence[v]
                .iter()
                .any(|&(r, c)| c > 0 && rows[r].sense == Sense::Ge)
            {
                1
            } else {
                2
            }
        };

        let mut order: Vec<usize> = (0..n).collect();
        let mut rng = StdRng::seed_from_u64(self.seed);
        order.shuffle(&mut rng);
        order.sort_by(|&a, &b| {
            tier(a)
                .cmp(&tier(b))
                .then(objective[b].total_cmp(&objective[a]))
        });

        let mut lhs = vec![0i64; rows.len()];
        let mut values = vec![false; n];

        for v in order {
            if cancel.is_cancelled() {
                debug!(solver = self.name(), "solve cancelled");
                return Err(SolverError::Cancelled);
            }

            let fills_deficit = incidence[v].iter().any(|&(r, c)| {
                let row = &rows[r];
                c > 0 && matches!(row.sense, Sense::Eq | Sense::Ge) && lhs[r] < row.rhs
            });
            if objective[v] <= 0.0 && !fills_deficit {
                continue;
            }

            let keeps_rows = incidence[v].iter().all(|&(r, c)| {
                let row = &rows[r];
                let next = lhs[r] + c;
                match row.sense {
                    Sense::Le => c <= 0 || next <= row.rhs,
                    Sense::Eq if c > 0 => next <= row.rhs,
                    Sense::Eq => next >= row.rhs,
                    Sense::Ge => c >= 0 || next >= row.rhs,
                }
            });
            if !keeps_rows {
                continue;
            }

            values[v] = true;
            for &(r, c) in &incidence[v] {
                lhs[r] += c;
            }
        }

        let unsatisfied = model.unsatisfied(&values);
        if !unsatisfied.is_empty() {
            let mut sources: Vec<&str> = unsatisfied.iter().map(|c| c.source.as_str()).collect();
            sources.dedup();
            debug!(solver = self.name(), unsatisfied = unsatisfied.len(), "greedy pass left rows open");
            return Ok(SolverSolution::infeasible(format!(
                "{} rows unsatisfied ({})",
                unsatisfied.len(),
                sources.join(", ")
            )));
        }

        let objective_value = model.objective.value(&values);
        let bound: f64 = objective.iter().filter(|c| **c > 0.0).sum();
        let gap = if bound > 0.0 {
            ((bound - objective_value) / bound * 100.0).max(0.0)
        } else {
            0.0
        };
        let is_optimal = gap < 1e-9;

        let assignments: Vec<VarKey> = values
            .iter()
            .enumerate()
            .filter(|(_, on)| **on)
            .map(|(v, _)| model.variables[v].clone())
            .collect();

        debug!(
            solver = self.name(),
            selected = assignments.len(),
            objective = objective_value,
            gap_pct = gap,
            "greedy solve complete"
        );

        Ok(SolverSolution {
            status: if is_optimal {
                SolverStatus::Optimal
            } else {
                SolverStatus::Feasible
            },
            assignments,
            objective_value,
            is_optimal,
            gap_pct: Some(gap),
            message: None,
        })
    }
}
