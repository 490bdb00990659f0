//! Constraint evaluation: hard feasibility, soft scoring, and reports.
//!
//! # Containment
//! A check that returns an error or panics is converted into a
//! `Critical` violation naming the constraint, plus an entry in the
//! report's `evaluation_errors`. One broken rule never aborts a run.
//!
//! # Determinism
//! Given the same constraint set, weight snapshot, and context, the
//! report is identical, including `evaluated_at`, which is a logical stamp.

mod engine;
mod hard;
mod report;
mod soft;

pub use engine::ValidationEngine;
pub use hard::{HardConstraintEvaluator, HardOutcome};
pub use report::{EvaluationFailure, EvaluationStamp, SoftTerm, ValidationReport, Violation};
pub use soft::{SoftConstraintScorer, SoftOutcome};

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use crate::constraints::{ConstraintDef, Severity};
use crate::error::CheckError;

/// Runs `f`, turning a panic into `CheckError::Panicked`.
pub(crate) fn guarded<T, F>(f: F) -> Result<T, CheckError>
where
    F: FnOnce() -> Result<T, CheckError>,
{
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(result) => result,
        Err(payload) => Err(CheckError::Panicked(panic_message(payload.as_ref()))),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// The violation and failure entries for a check that did not complete.
pub(crate) fn failure_entries(def: &ConstraintDef, err: &CheckError) -> (Violation, EvaluationFailure) {
    let violation = Violation {
        constraint_id: def.id.clone(),
        kind: def.kind,
        severity: Severity::Critical,
        tier: def.is_hard().then_some(def.priority),
        message: format!("evaluation of '{}' failed: {err}", def.id),
        affected_entities: Vec::new(),
        penalty: 0.0,
    };
    let failure = EvaluationFailure {
        constraint_id: def.id.clone(),
        error: err.to_string(),
    };
    (violation, failure)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guarded_catches_panics() {
        let r: Result<(), CheckError> = guarded(|| panic!("boom"));
        assert_eq!(r, Err(CheckError::Panicked("boom".into())));

        let r: Result<u8, CheckError> = guarded(|| Ok(3));
        assert_eq!(r, Ok(3));

        let r: Result<(), CheckError> = guarded(|| Err(CheckError::Malformed("x".into())));
        assert_eq!(r, Err(CheckError::Malformed("x".into())));
    }

    #[test]
    fn test_panic_message_formats() {
        let owned = format!("code {}", 7);
        let r: Result<(), CheckError> = guarded(move || panic!("{owned}"));
        assert_eq!(r, Err(CheckError::Panicked("code 7".into())));
    }
}
