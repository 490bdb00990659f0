//! Static weight tables per defense level.
//!
//! | Level | Posture |
//! |-------|---------|
//! | GREEN | Normal operation; N-1 scoring suspended |
//! | YELLOW | Buffer and hub protection raised |
//! | ORANGE | Resilience dominates; preference terms near zero |
//! | RED | Fairness terms minimal |
//! | BLACK | Everything except coverage and resilience zeroed |
//!
//! Coverage is never re-weighted at any level.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::constraints::library::ids;
use crate::models::DefenseLevel;

/// Weight overlay and suspended constraints for one level.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LevelProfile {
    /// Weights replacing the preset weights while the level is active.
    #[serde(default)]
    pub weights: BTreeMap<String, f64>,
    /// Soft constraints not scored while the level is active.
    #[serde(default)]
    pub suspended: BTreeSet<String>,
}

impl LevelProfile {
    /// Sets a weight.
    pub fn with_weight(mut self, id: impl Into<String>, weight: f64) -> Self {
        self.weights.insert(id.into(), weight);
        self
    }

    /// Suspends a constraint.
    pub fn suspend(mut self, id: impl Into<String>) -> Self {
        self.suspended.insert(id.into());
        self
    }
}

/// `DefenseLevel -> LevelProfile`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LevelTables {
    profiles: BTreeMap<DefenseLevel, LevelProfile>,
}

impl LevelTables {
    /// Tables with no overlays at any level.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Built-in residency program tables.
    pub fn standard() -> Self {
        use ids::*;

        Self::empty()
            .with(
                DefenseLevel::Green,
                LevelProfile::default().suspend(N1_VULNERABILITY),
            )
            .with(
                DefenseLevel::Yellow,
                LevelProfile::default()
                    .with_weight(UTILIZATION_BUFFER, 30.0)
                    .with_weight(HUB_PROTECTION, 20.0)
                    .with_weight(EQUITY, 8.0),
            )
            .with(
                DefenseLevel::Orange,
                LevelProfile::default()
                    .with_weight(UTILIZATION_BUFFER, 40.0)
                    .with_weight(HUB_PROTECTION, 30.0)
                    .with_weight(N1_VULNERABILITY, 30.0)
                    .with_weight(EQUITY, 5.0)
                    .with_weight(CALL_PREFERENCE, 1.0)
                    .with_weight(CONTINUITY, 1.0),
            )
            .with(
                DefenseLevel::Red,
                LevelProfile::default()
                    .with_weight(UTILIZATION_BUFFER, 60.0)
                    .with_weight(HUB_PROTECTION, 45.0)
                    .with_weight(N1_VULNERABILITY, 50.0)
                    .with_weight(EQUITY, 3.0)
                    .with_weight(CALL_PREFERENCE, 0.0)
                    .with_weight(CONTINUITY, 0.0)
                    .with_weight(WEEKDAY_CALL_EQUITY, 2.0),
            )
            .with(
                DefenseLevel::Black,
                LevelProfile::default()
                    .with_weight(UTILIZATION_BUFFER, 80.0)
                    .with_weight(HUB_PROTECTION, 60.0)
                    .with_weight(N1_VULNERABILITY, 75.0)
                    .with_weight(EQUITY, 0.0)
                    .with_weight(CALL_PREFERENCE, 0.0)
                    .with_weight(CONTINUITY, 0.0)
                    .with_weight(WEEKDAY_CALL_EQUITY, 0.0)
                    .with_weight(SUNDAY_CALL_EQUITY, 2.0),
            )
    }

    /// Sets a level's profile.
    pub fn with(mut self, level: DefenseLevel, profile: LevelProfile) -> Self {
        self.set(level, profile);
        self
    }

    /// Sets a level's profile in place.
    pub fn set(&mut self, level: DefenseLevel, profile: LevelProfile) {
        self.profiles.insert(level, profile);
    }

    /// Profile for `level`; empty when none is configured.
    pub fn profile(&self, level: DefenseLevel) -> LevelProfile {
        self.profiles.get(&level).cloned().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coverage_never_reweighted() {
        let t = LevelTables::standard();
        for level in DefenseLevel::ALL {
            assert!(!t.profile(level).weights.contains_key(ids::COVERAGE));
        }
    }

    #[test]
    fn test_resilience_weights_rise_with_severity() {
        let t = LevelTables::standard();
        let buffer = |l| t.profile(l).weights.get(ids::UTILIZATION_BUFFER).copied();
        assert_eq!(buffer(DefenseLevel::Green), None);
        assert!(buffer(DefenseLevel::Yellow) < buffer(DefenseLevel::Orange));
        assert!(buffer(DefenseLevel::Red) < buffer(DefenseLevel::Black));
        assert!(t.profile(DefenseLevel::Green).suspended.contains(ids::N1_VULNERABILITY));
    }

    #[test]
    fn test_empty_profile_default() {
        assert_eq!(LevelTables::empty().profile(DefenseLevel::Red), LevelProfile::default());
    }
}
