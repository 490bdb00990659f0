//! Resilience signals supplied by the program-health collaborator.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Aggregate system health, ordered from healthy to collapse.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DefenseLevel {
    /// Normal operations.
    #[default]
    Green,
    /// Elevated load.
    Yellow,
    /// Degraded; protections tightened.
    Orange,
    /// Critical staffing.
    Red,
    /// Emergency.
    Black,
}

impl DefenseLevel {
    /// All levels in ascending severity.
    pub const ALL: [DefenseLevel; 5] = [
        Self::Green,
        Self::Yellow,
        Self::Orange,
        Self::Red,
        Self::Black,
    ];

    /// The most severe level.
    pub const MAX: DefenseLevel = Self::Black;

    /// Lowercase name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Green => "green",
            Self::Yellow => "yellow",
            Self::Orange => "orange",
            Self::Red => "red",
            Self::Black => "black",
        }
    }
}

impl fmt::Display for DefenseLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DefenseLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|l| l.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown defense level '{s}'"))
    }
}

/// Point-in-time resilience data used by resilience-category constraints.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResilienceSnapshot {
    /// Observed utilization per person (0.0..1.0).
    #[serde(default)]
    pub utilization: BTreeMap<String, f64>,
    /// Network hub centrality per person (0.0..1.0, higher = more critical).
    #[serde(default)]
    pub hub_scores: BTreeMap<String, f64>,
    /// Defense level at snapshot time.
    #[serde(default)]
    pub defense_level: DefenseLevel,
}

impl ResilienceSnapshot {
    /// Creates an empty snapshot at the given level.
    pub fn at_level(level: DefenseLevel) -> Self {
        Self {
            defense_level: level,
            ..Default::default()
        }
    }

    /// Sets a hub score.
    pub fn with_hub_score(mut self, person_id: impl Into<String>, score: f64) -> Self {
        self.hub_scores.insert(person_id.into(), score);
        self
    }

    /// Sets an observed utilization.
    pub fn with_utilization(mut self, person_id: impl Into<String>, load: f64) -> Self {
        self.utilization.insert(person_id.into(), load);
        self
    }

    /// Observed utilization for a person, if measured.
    pub fn observed_utilization(&self, person_id: &str) -> Option<f64> {
        self.utilization.get(person_id).copied()
    }

    /// Hub score for a person, 0.0 when unknown.
    pub fn hub_score(&self, person_id: &str) -> f64 {
        self.hub_scores.get(person_id).copied().unwrap_or(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_ordering() {
        assert!(DefenseLevel::Green < DefenseLevel::Yellow);
        assert!(DefenseLevel::Red < DefenseLevel::Black);
        assert_eq!(DefenseLevel::MAX, DefenseLevel::Black);
    }

    #[test]
    fn test_level_parse_roundtrip() {
        for level in DefenseLevel::ALL {
            assert_eq!(level.as_str().parse::<DefenseLevel>().unwrap(), level);
        }
        assert_eq!("ORANGE".parse::<DefenseLevel>().unwrap(), DefenseLevel::Orange);
        assert!("purple".parse::<DefenseLevel>().is_err());
    }

    #[test]
    fn test_hub_score_default() {
        let s = ResilienceSnapshot::at_level(DefenseLevel::Yellow).with_hub_score("F1", 0.9);
        assert!((s.hub_score("F1") - 0.9).abs() < 1e-12);
        assert_eq!(s.hub_score("F2"), 0.0);
    }
}
