//! People model.
//!
//! People are the resources a residency schedule assigns: residents
//! (with a PGY training level) and faculty. Each person carries
//! absences, call-day preferences, and an optional coverage zone.

use chrono::{NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

use super::DateRange;

/// Role within the program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Trainee physician.
    Resident,
    /// Attending physician.
    Faculty,
}

/// A period when a person cannot be scheduled (leave, TDY, conference).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Absence {
    /// Dates covered.
    pub range: DateRange,
    /// Free-form reason.
    #[serde(default)]
    pub reason: String,
}

/// A schedulable person.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Person {
    /// Unique person identifier.
    pub id: String,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Role.
    pub role: Role,
    /// Post-graduate year (residents only).
    #[serde(default)]
    pub pgy_level: Option<u8>,
    /// Periods of unavailability.
    #[serde(default)]
    pub absences: Vec<Absence>,
    /// Weekdays the person prefers not to take overnight call.
    #[serde(default)]
    pub avoid_call_days: Vec<Weekday>,
    /// Coverage zone the person normally works in.
    #[serde(default)]
    pub zone: Option<String>,
}

impl Person {
    /// Creates a new person.
    pub fn new(id: impl Into<String>, role: Role) -> Self {
        Self {
            id: id.into(),
            name: String::new(),
            role,
            pgy_level: None,
            absences: Vec::new(),
            avoid_call_days: Vec::new(),
            zone: None,
        }
    }

    /// Creates a resident at the given PGY level.
    pub fn resident(id: impl Into<String>, pgy_level: u8) -> Self {
        let mut p = Self::new(id, Role::Resident);
        p.pgy_level = Some(pgy_level);
        p
    }

    /// Creates a faculty member.
    pub fn faculty(id: impl Into<String>) -> Self {
        Self::new(id, Role::Faculty)
    }

    /// Sets the display name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Adds an absence over [start, end).
    pub fn with_absence(mut self, start: NaiveDate, end: NaiveDate) -> Self {
        self.absences.push(Absence {
            range: DateRange::new(start, end),
            reason: String::new(),
        });
        self
    }

    /// Adds a weekday the person prefers to avoid for call.
    pub fn with_avoid_call_day(mut self, day: Weekday) -> Self {
        self.avoid_call_days.push(day);
        self
    }

    /// Sets the coverage zone.
    pub fn with_zone(mut self, zone: impl Into<String>) -> Self {
        self.zone = Some(zone.into());
        self
    }

    /// Whether this person is a resident.
    #[inline]
    pub fn is_resident(&self) -> bool {
        self.role == Role::Resident
    }

    /// Whether this person is faculty.
    #[inline]
    pub fn is_faculty(&self) -> bool {
        self.role == Role::Faculty
    }

    /// Whether this person is an intern (PGY-1).
    pub fn is_intern(&self) -> bool {
        self.is_resident() && self.pgy_level == Some(1)
    }

    /// Whether the person is free of absences on `date`.
    pub fn is_available_on(&self, date: NaiveDate) -> bool {
        !self.absences.iter().any(|a| a.range.contains(date))
    }

    /// Whether the person prefers not to take call on `day`.
    pub fn avoids_call_on(&self, day: Weekday) -> bool {
        self.avoid_call_days.contains(&day)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 7, day).unwrap()
    }

    #[test]
    fn test_person_builders() {
        let r = Person::resident("R1", 1).with_name("Intern One");
        assert!(r.is_resident());
        assert!(r.is_intern());
        assert_eq!(r.name, "Intern One");

        let f = Person::faculty("F1").with_zone("north");
        assert!(f.is_faculty());
        assert!(!f.is_intern());
        assert_eq!(f.zone.as_deref(), Some("north"));
    }

    #[test]
    fn test_availability() {
        let p = Person::resident("R2", 2).with_absence(d(3), d(5));
        assert!(p.is_available_on(d(2)));
        assert!(!p.is_available_on(d(3)));
        assert!(!p.is_available_on(d(4)));
        assert!(p.is_available_on(d(5))); // Exclusive end
    }

    #[test]
    fn test_avoid_call_days() {
        let p = Person::faculty("F2").with_avoid_call_day(Weekday::Sun);
        assert!(p.avoids_call_on(Weekday::Sun));
        assert!(!p.avoids_call_on(Weekday::Mon));
    }
}
