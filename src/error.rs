//! Error types.
//!
//! One enum per concern. Configuration errors are always caller-fixable
//! and leave the catalog unchanged; evaluation errors are contained per
//! constraint; solver errors are surfaced, never retried here.

use std::time::Duration;

use thiserror::Error;

/// Catalog configuration errors.
#[derive(Debug, Clone, PartialEq, Error)]
#[non_exhaustive]
pub enum CatalogError {
    /// A constraint with this id is already registered.
    #[error("constraint '{id}' is already registered")]
    DuplicateId {
        /// The colliding id.
        id: String,
    },

    /// No constraint with this id is registered.
    #[error("unknown constraint '{id}'")]
    UnknownConstraint {
        /// The unknown id.
        id: String,
    },

    /// No preset with this name is registered.
    #[error("unknown preset '{name}'")]
    UnknownPreset {
        /// The unknown preset name.
        name: String,
    },

    /// Registering the constraint would close a dependency cycle.
    #[error("dependency cycle: {}", path.join(" -> "))]
    DependencyCycle {
        /// Constraint ids along the cycle, first id repeated at the end.
        path: Vec<String>,
    },

    /// A constraint would be enabled while one of its dependencies is not.
    #[error("constraint '{constraint}' requires '{dependency}' to be enabled")]
    MissingDependency {
        /// The dependent constraint.
        constraint: String,
        /// The dependency that is not enabled.
        dependency: String,
    },

    /// Attempt to disable a locked constraint.
    #[error("constraint '{id}' is locked and cannot be disabled")]
    LockedConstraint {
        /// The locked id.
        id: String,
    },

    /// Weight is negative or not finite.
    #[error("invalid weight {weight} for constraint '{id}'")]
    InvalidWeight {
        /// Constraint id.
        id: String,
        /// Rejected weight.
        weight: f64,
    },
}

/// Failure raised by a single constraint check.
///
/// Never escapes an evaluation: the evaluators convert it into a
/// critical violation plus an entry in `evaluation_errors`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum CheckError {
    /// An assignment references an entity missing from the context.
    #[error("assignment references unknown {kind} '{id}'")]
    UnknownReference {
        /// Entity kind ("person", "block", "template").
        kind: &'static str,
        /// Missing id.
        id: String,
    },

    /// Context data is inconsistent for this check.
    #[error("malformed context: {0}")]
    Malformed(String),

    /// The check panicked.
    #[error("check panicked: {0}")]
    Panicked(String),
}

/// Solver interaction errors.
#[derive(Debug, Clone, PartialEq, Error)]
#[non_exhaustive]
pub enum SolverError {
    /// A hard constraint has no solver-native encoding (strict compile).
    #[error("constraint '{constraint_id}' cannot be expressed in the solver model")]
    UnsupportedConstraint {
        /// Constraint id.
        constraint_id: String,
    },

    /// The caller cancelled the solve.
    #[error("solve cancelled")]
    Cancelled,

    /// The solver could not be reached or returned garbage.
    #[error("solver transport failure: {0}")]
    Transport(String),

    /// The solver reported an ERROR status.
    #[error("solver failed: {0}")]
    Failed(String),

    /// The solution references a variable that is not in the model.
    #[error("solution references unknown variable ({person_id}, {block_id}, {template_id})")]
    UnknownVariable {
        /// Person id.
        person_id: String,
        /// Block id.
        block_id: String,
        /// Template id.
        template_id: String,
    },
}

/// Manual defense-level override rejections.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum OverrideError {
    /// Reason string is empty.
    #[error("override requires a reason")]
    MissingReason,

    /// Source identity is empty.
    #[error("override requires a source identity")]
    MissingSource,

    /// Duration is zero or exceeds the configured maximum.
    #[error("override duration {requested:?} must be positive and at most {max:?}")]
    InvalidDuration {
        /// Requested duration.
        requested: Duration,
        /// Configured maximum.
        max: Duration,
    },
}

/// Settings loading errors.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SettingsError {
    /// Failed to read the settings file.
    #[error("failed to read settings file '{path}': {source}")]
    Read {
        /// File path.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse TOML.
    #[error("failed to parse settings: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value is out of range.
    #[error("invalid setting '{field}': {reason}")]
    Invalid {
        /// Dotted field path.
        field: String,
        /// Why it was rejected.
        reason: String,
    },

    /// A preset from the settings was rejected by the catalog.
    #[error(transparent)]
    Catalog(#[from] CatalogError),
}
