//! Constraint engine for residency program schedules.
//!
//! Holds the catalog of scheduling rules (duty hours, supervision, call,
//! FMIT, fairness, resilience), validates candidate schedules against the
//! enabled set, re-weights soft rules as program health changes, and
//! compiles the active rules into a linear model for an external solver.
//!
//! # Modules
//!
//! - **`models`**: Domain types: `Person`, `Block`, `RotationTemplate`,
//!   `Assignment`, `SchedulingContext`, `ResilienceSnapshot`
//! - **`constraints`**: `ConstraintDef`, the `ConstraintCheck` trait, and
//!   the built-in rule library
//! - **`catalog`**: Registration, presets, dependency resolution, and
//!   copy-on-write weights
//! - **`evaluation`**: Hard evaluation, soft scoring, `ValidationEngine`
//! - **`adaptive`**: Defense-level hysteresis controller
//! - **`bridge`**: Solver model compilation and generate-then-verify
//! - **`settings`**: TOML engine settings
//! - **`cli`**: The `roster` command line
//!
//! # Architecture
//!
//! ```text
//! ConstraintCatalog ──resolve──▶ ConstraintSet ──▶ ValidationEngine ──▶ ValidationReport
//!        │                            │
//!   WeightCell ◀── AdaptiveWeightController ◀── ResilienceSignal
//!                                     │
//!                               SolverBridge ──▶ Solver ──▶ Assignments
//! ```
//!
//! Resolved sets and contexts are immutable and shared by reference across
//! validation workers; only the weight cell changes, by atomic swap.
//!
//! # References
//!
//! - ACGME Common Program Requirements (Residency), Section VI
//! - Burke et al. (2004), "The State of the Art of Nurse Rostering"
//! - Ernst et al. (2004), "Staff scheduling and rostering: A review of
//!   applications, methods and models"

pub mod adaptive;
pub mod bridge;
pub mod catalog;
pub mod cli;
pub mod constraints;
pub mod error;
pub mod evaluation;
pub mod models;
pub mod settings;

pub use adaptive::{AdaptiveWeightController, ResilienceSignal};
pub use bridge::{SolverBridge, SolverModel};
pub use catalog::{ConstraintCatalog, ConstraintSet, Preset};
pub use evaluation::{ValidationEngine, ValidationReport};
pub use models::{Assignment, DefenseLevel, SchedulingContext};
