//! Residency scheduling domain models.
//!
//! Provides the in-memory data contract the constraint engine evaluates:
//! who can be scheduled, when, on what, and the candidate assignments.
//!
//! # Domain Mappings
//!
//! | u-roster | Residency program | Generic scheduling |
//! |----------|-------------------|--------------------|
//! | Person | Resident / Faculty | Resource |
//! | Block | Half-day or night | Time slot |
//! | RotationTemplate | Clinic, FMIT, Call | Activity type |
//! | Assignment | Who works what, when | Allocation |

mod calendar;
mod context;
mod person;
mod resilience;
mod schedule;
mod template;

pub use calendar::{complete_windows, rolling_windows, Block, DateRange, Session};
pub use context::SchedulingContext;
pub use person::{Absence, Person, Role};
pub use resilience::{DefenseLevel, ResilienceSnapshot};
pub use schedule::{Assignment, Dangling, Placement, ScheduleView};
pub use template::{RotationTemplate, TemplateKind};
