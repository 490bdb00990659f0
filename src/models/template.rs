//! Rotation template model.
//!
//! A rotation template is what a person does during a block: clinic,
//! inpatient service, overnight call, a post-call recovery half-day.
//! Templates carry capacity limits, supervision requirements, and the
//! duty hours a block on them counts for.

use serde::{Deserialize, Serialize};

use super::{Person, Role, Session};

/// Rotation classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemplateKind {
    /// Outpatient clinic.
    Clinic,
    /// Inpatient ward service.
    Inpatient,
    /// Family Medicine Inpatient Team week.
    Fmit,
    /// Procedure half-day.
    Procedure,
    /// Didactics / conference.
    Conference,
    /// Overnight call.
    OvernightCall,
    /// Post-call recovery.
    PostCall,
    /// Scheduled time off.
    Off,
}

impl TemplateKind {
    /// Whether the template is patient-facing work.
    pub fn is_clinical(self) -> bool {
        !matches!(self, Self::Conference | Self::PostCall | Self::Off)
    }

    /// Whether a block on this template counts as a worked day.
    pub fn is_duty(self) -> bool {
        !matches!(self, Self::PostCall | Self::Off)
    }

    /// Whether the template may be placed on a block of `session`.
    pub fn fits(self, session: Session) -> bool {
        match self {
            Self::OvernightCall => session == Session::Night,
            _ => session != Session::Night,
        }
    }

    /// Default duty hours for one block.
    pub fn default_hours(self) -> u32 {
        match self {
            Self::OvernightCall => 12,
            Self::Conference => 4,
            Self::PostCall | Self::Off => 0,
            _ => 6,
        }
    }
}

/// A rotation template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RotationTemplate {
    /// Unique template identifier.
    pub id: String,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Classification.
    pub kind: TemplateKind,
    /// Maximum residents per block. `None` = unlimited.
    #[serde(default)]
    pub max_residents: Option<u32>,
    /// Residents on this template must be supervised by faculty in the same block.
    #[serde(default)]
    pub requires_supervision: bool,
    /// Duty hours counted per block.
    pub hours: u32,
    /// Roles allowed on this template. Empty = any role.
    #[serde(default)]
    pub allowed_roles: Vec<Role>,
    /// Minimum PGY level for residents.
    #[serde(default)]
    pub min_pgy: Option<u8>,
}

impl RotationTemplate {
    /// Creates a template with the kind's default hours.
    pub fn new(id: impl Into<String>, kind: TemplateKind) -> Self {
        Self {
            id: id.into(),
            name: String::new(),
            kind,
            max_residents: None,
            requires_supervision: false,
            hours: kind.default_hours(),
            allowed_roles: Vec::new(),
            min_pgy: None,
        }
    }

    /// Sets the display name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets the per-block resident capacity.
    pub fn with_max_residents(mut self, max: u32) -> Self {
        self.max_residents = Some(max);
        self
    }

    /// Requires faculty supervision.
    pub fn supervised(mut self) -> Self {
        self.requires_supervision = true;
        self
    }

    /// Sets the duty hours per block.
    pub fn with_hours(mut self, hours: u32) -> Self {
        self.hours = hours;
        self
    }

    /// Restricts the template to a role.
    pub fn for_role(mut self, role: Role) -> Self {
        self.allowed_roles.push(role);
        self
    }

    /// Sets the minimum PGY level.
    pub fn with_min_pgy(mut self, pgy: u8) -> Self {
        self.min_pgy = Some(pgy);
        self
    }

    /// Whether `person` may be placed on this template.
    pub fn admits(&self, person: &Person) -> bool {
        if !self.allowed_roles.is_empty() && !self.allowed_roles.contains(&person.role) {
            return false;
        }
        match (self.min_pgy, person.is_resident()) {
            (Some(min), true) => person.pgy_level.unwrap_or(0) >= min,
            _ => true,
        }
    }
}
