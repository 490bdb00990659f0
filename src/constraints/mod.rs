//! Constraint definitions and the check interface.
//!
//! Every rule is a `ConstraintDef`: identity, category, hard/soft kind,
//! priority or weight, lock and dependency metadata, plus the check logic
//! behind the `ConstraintCheck` trait object. The catalog holds
//! heterogeneous rules in one homogeneous collection.
//!
//! # Score Convention
//! Hard checks return findings whose presence means infeasibility.
//! Soft checks return findings carrying non-negative penalties;
//! the scorer multiplies their sum by the live weight.
//!
//! # Submodules
//!
//! - [`hard`]: regulatory, capacity, role, call, and FMIT rules
//! - [`soft`]: coverage, equity, continuity, and call-fairness objectives
//! - [`resilience`]: defense-level-sensitive objectives
//! - [`library`]: the standard catalog and built-in presets

pub mod hard;
pub mod library;
pub mod resilience;
pub mod soft;

use std::fmt::{self, Debug};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::bridge::{Encoding, ModelBuilder};
use crate::catalog::ConstraintSet;
use crate::error::CheckError;
use crate::models::ScheduleView;

/// Hard rules gate feasibility; soft rules shape the objective.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConstraintKind {
    /// Violation makes the schedule invalid.
    Hard,
    /// Weighted optimization objective.
    Soft,
}

/// Rule family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    /// Accreditation duty-hour and supervision rules.
    Regulatory,
    /// Slot and headcount limits.
    Capacity,
    /// Filling the schedule.
    Coverage,
    /// Fair distribution of work.
    Equity,
    /// Time-based rules.
    Temporal,
    /// Who may do what.
    Role,
    /// Overnight call.
    Call,
    /// Specialty services (FMIT).
    Specialty,
    /// Program-health protections.
    Resilience,
}

/// Hard-constraint evaluation tier.
///
/// Ordering follows the numeric value: `Low < Medium < High < Critical`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    /// 25
    Low,
    /// 50
    Medium,
    /// 75
    High,
    /// 100
    Critical,
}

impl Priority {
    /// Tiers in evaluation order.
    pub const TIERS: [Priority; 4] = [Self::Critical, Self::High, Self::Medium, Self::Low];

    /// Numeric priority.
    pub fn value(self) -> u8 {
        match self {
            Self::Critical => 100,
            Self::High => 75,
            Self::Medium => 50,
            Self::Low => 25,
        }
    }
}

/// Violation severity as reported to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Critical-tier hard violation, or an evaluation failure.
    Critical,
    /// High-tier hard violation.
    High,
    /// Medium-tier hard violation.
    Medium,
    /// Low-tier hard violation.
    Low,
    /// Soft-constraint finding.
    Info,
}

impl From<Priority> for Severity {
    fn from(p: Priority) -> Self {
        match p {
            Priority::Critical => Self::Critical,
            Priority::High => Self::High,
            Priority::Medium => Self::Medium,
            Priority::Low => Self::Low,
        }
    }
}

/// One problem found by a check.
#[derive(Debug, Clone, PartialEq)]
pub struct Finding {
    /// Human-readable description.
    pub message: String,
    /// Implicated people and blocks.
    pub affected_entities: Vec<String>,
    /// Penalty contribution (soft only; ignored for hard rules).
    pub penalty: f64,
}

impl Finding {
    /// Creates a finding with no penalty.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            affected_entities: Vec::new(),
            penalty: 0.0,
        }
    }

    /// Adds an implicated entity.
    pub fn with_entity(mut self, id: impl Into<String>) -> Self {
        self.affected_entities.push(id.into());
        self
    }

    /// Sets the penalty.
    pub fn with_penalty(mut self, penalty: f64) -> Self {
        self.penalty = penalty;
        self
    }
}

/// Check logic for one constraint.
///
/// Implementations are pure functions of their inputs: they must not
/// mutate the context and must produce findings in a deterministic
/// order (iterate context vectors or ordered maps, never hash maps).
pub trait ConstraintCheck: Send + Sync + Debug {
    /// Evaluates the rule against a resolved schedule view.
    fn check(&self, set: &ConstraintSet, view: &ScheduleView<'_>) -> Result<Vec<Finding>, CheckError>;

    /// Coverage amount this rule contributes to the objective, if it is
    /// the coverage rule.
    fn coverage(&self, _view: &ScheduleView<'_>) -> Option<f64> {
        None
    }

    /// Emits solver-native constraints or objective terms.
    ///
    /// The default declares the rule not linearizable.
    fn encode(&self, _builder: &mut ModelBuilder<'_>) -> Encoding {
        Encoding::Unsupported
    }
}

/// A registered rule.
#[derive(Clone)]
pub struct ConstraintDef {
    /// Unique identifier.
    pub id: String,
    /// One-line description.
    pub description: String,
    /// Rule family.
    pub category: Category,
    /// Hard or soft.
    pub kind: ConstraintKind,
    /// Evaluation tier (hard).
    pub priority: Priority,
    /// Default weight (soft).
    pub weight: f64,
    /// Enabled when first registered.
    pub enabled: bool,
    /// Can never be disabled.
    pub locked: bool,
    /// Ids that must be enabled whenever this one is.
    pub dependencies: Vec<String>,
    rule: Arc<dyn ConstraintCheck>,
}

impl ConstraintDef {
    /// Creates a hard constraint.
    pub fn hard(
        id: impl Into<String>,
        category: Category,
        priority: Priority,
        rule: impl ConstraintCheck + 'static,
    ) -> Self {
        Self {
            id: id.into(),
            description: String::new(),
            category,
            kind: ConstraintKind::Hard,
            priority,
            weight: 0.0,
            enabled: true,
            locked: false,
            dependencies: Vec::new(),
            rule: Arc::new(rule),
        }
    }

    /// Creates a soft constraint.
    pub fn soft(
        id: impl Into<String>,
        category: Category,
        weight: f64,
        rule: impl ConstraintCheck + 'static,
    ) -> Self {
        Self {
            id: id.into(),
            description: String::new(),
            category,
            kind: ConstraintKind::Soft,
            priority: Priority::Low,
            weight,
            enabled: true,
            locked: false,
            dependencies: Vec::new(),
            rule: Arc::new(rule),
        }
    }

    /// Sets the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Marks the constraint as locked (always enabled).
    pub fn locked(mut self) -> Self {
        self.locked = true;
        self.enabled = true;
        self
    }

    /// Registers the constraint disabled.
    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// Adds a dependency.
    pub fn depends_on(mut self, id: impl Into<String>) -> Self {
        self.dependencies.push(id.into());
        self
    }

    /// Whether this is a hard constraint.
    #[inline]
    pub fn is_hard(&self) -> bool {
        self.kind == ConstraintKind::Hard
    }

    /// The check logic.
    pub fn rule(&self) -> &dyn ConstraintCheck {
        self.rule.as_ref()
    }
}

impl Debug for ConstraintDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConstraintDef")
            .field("id", &self.id)
            .field("category", &self.category)
            .field("kind", &self.kind)
            .field("priority", &self.priority)
            .field("weight", &self.weight)
            .field("enabled", &self.enabled)
            .field("locked", &self.locked)
            .field("dependencies", &self.dependencies)
            .finish_non_exhaustive()
    }
}
