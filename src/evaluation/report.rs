//! Validation report types.

use serde::{Deserialize, Serialize};

use crate::constraints::{ConstraintKind, Priority, Severity};
use crate::models::DefenseLevel;

/// One constraint finding, as reported to callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Violation {
    /// Constraint that produced the finding.
    pub constraint_id: String,
    /// Hard or soft origin.
    pub kind: ConstraintKind,
    /// Tier severity for hard rules, `Info` for soft ones, `Critical` for
    /// evaluation failures.
    pub severity: Severity,
    /// Evaluation tier of a hard rule, kept even when its check failed;
    /// `None` for soft rules.
    #[serde(default)]
    pub tier: Option<Priority>,
    /// Human-readable description.
    pub message: String,
    /// Implicated people and blocks.
    pub affected_entities: Vec<String>,
    /// Weighted objective cost; always 0 for hard rules.
    pub penalty: f64,
}

/// A constraint whose check could not complete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluationFailure {
    /// Failing constraint.
    pub constraint_id: String,
    /// Error detail.
    pub error: String,
}

/// Logical evaluation time: which resolution and which weight table the
/// report was computed against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EvaluationStamp {
    /// Generation of the constraint set.
    pub set_generation: u64,
    /// Version of the weight snapshot.
    pub weights_version: u64,
}

/// Per-constraint objective contribution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SoftTerm {
    /// Constraint id.
    pub constraint_id: String,
    /// Effective weight used.
    pub weight: f64,
    /// Unweighted penalty sum.
    pub penalty: f64,
}

/// Result of one validation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    /// True iff no enabled hard constraint was violated or failed.
    pub is_feasible: bool,
    /// Hard violations by tier then registration order, then soft
    /// violations by penalty descending.
    pub violations: Vec<Violation>,
    /// `coverage_term - weighted_penalty`.
    pub objective_score: f64,
    /// Weighted coverage reward.
    pub coverage_term: f64,
    /// Σ weight × penalty over enabled soft constraints.
    pub weighted_penalty: f64,
    /// Per soft constraint contributions, in registration order.
    pub soft_terms: Vec<SoftTerm>,
    /// Checks that raised instead of completing.
    pub evaluation_errors: Vec<EvaluationFailure>,
    /// Defense level of the weight table used.
    pub defense_level: DefenseLevel,
    /// Logical evaluation time.
    pub evaluated_at: EvaluationStamp,
}

impl ValidationReport {
    /// Hard-constraint violations.
    pub fn hard_violations(&self) -> impl Iterator<Item = &Violation> {
        self.violations.iter().filter(|v| v.kind == ConstraintKind::Hard)
    }

    /// Soft-constraint violations.
    pub fn soft_violations(&self) -> impl Iterator<Item = &Violation> {
        self.violations.iter().filter(|v| v.kind == ConstraintKind::Soft)
    }

    /// Violations of one constraint.
    pub fn violations_of<'a>(&'a self, id: &'a str) -> impl Iterator<Item = &'a Violation> + 'a {
        self.violations.iter().filter(move |v| v.constraint_id == id)
    }

    /// Pretty-printed JSON.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
