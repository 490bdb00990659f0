//! Defense-level driven re-weighting with hysteresis.
//!
//! The controller tracks a `current_level` and a pending `candidate_level`
//! with a count of consecutive confirming readings:
//!
//! - reading == current: pending candidate is dropped
//! - escalation commits after `escalation_confirmations` readings (2)
//! - de-escalation commits after `deescalation_confirmations` readings (3)
//! - a BLACK reading, or one more severe than a pending escalation
//!   candidate, commits immediately
//!
//! A commit swaps the level's [`LevelProfile`] into the shared weight cell.
//! A manual override pins the level until it expires.
//!
//! # Reference
//! Astrom & Murray (2008), "Feedback Systems", Ch. 9 (hysteresis and
//! relay feedback)

mod observer;
mod tables;

pub use observer::spawn_observer;
pub use tables::{LevelProfile, LevelTables};

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::catalog::WeightCell;
use crate::error::{OverrideError, SettingsError};
use crate::models::DefenseLevel;

/// Health reading from the resilience collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResilienceSignal {
    /// Reported level.
    pub defense_level: DefenseLevel,
    /// Reading time, milliseconds since the Unix epoch.
    pub timestamp_ms: i64,
}

impl ResilienceSignal {
    /// Creates a signal.
    pub fn new(defense_level: DefenseLevel, timestamp_ms: i64) -> Self {
        Self {
            defense_level,
            timestamp_ms,
        }
    }
}

/// Hysteresis and override limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerSettings {
    /// Consecutive readings needed to escalate.
    pub escalation_confirmations: u32,
    /// Consecutive readings needed to de-escalate.
    pub deescalation_confirmations: u32,
    /// Longest allowed manual override.
    pub max_override_secs: u64,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self {
            escalation_confirmations: 2,
            deescalation_confirmations: 3,
            max_override_secs: 24 * 60 * 60,
        }
    }
}

impl ControllerSettings {
    /// Rejects zero confirmation counts and a zero override ceiling.
    pub fn validate(self) -> Result<Self, SettingsError> {
        let invalid = |field: &str, reason: &str| SettingsError::Invalid {
            field: format!("controller.{field}"),
            reason: reason.to_string(),
        };
        if self.escalation_confirmations == 0 {
            return Err(invalid("escalation_confirmations", "must be at least 1"));
        }
        if self.deescalation_confirmations == 0 {
            return Err(invalid("deescalation_confirmations", "must be at least 1"));
        }
        if self.max_override_secs == 0 {
            return Err(invalid("max_override_secs", "must be positive"));
        }
        Ok(self)
    }

    /// `max_override_secs` as a duration.
    pub fn max_override(&self) -> Duration {
        Duration::from_secs(self.max_override_secs)
    }
}

/// An operator-forced level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManualOverride {
    /// Forced level.
    pub level: DefenseLevel,
    /// Why it was forced.
    pub reason: String,
    /// Who forced it.
    pub source: String,
    /// When it was set (ms).
    pub set_at_ms: i64,
    /// When observation-driven control resumes (ms).
    pub expires_at_ms: i64,
}

/// What drove a [`Transition`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trigger {
    /// Reading matched the current level.
    Stable,
    /// A candidate level is accumulating confirmations.
    Pending,
    /// The candidate reached its confirmation count.
    Confirmed,
    /// Severe escalation skipped hysteresis.
    Emergency,
    /// An operator forced the level.
    Manual,
    /// Reading ignored while an override is active.
    Overridden,
}

/// Outcome of one observation or override.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transition {
    /// Level before.
    pub from: DefenseLevel,
    /// Level after.
    pub to: DefenseLevel,
    /// Whether the level changed.
    pub changed: bool,
    /// Why.
    pub trigger: Trigger,
    /// Pending candidate after this step.
    pub candidate: DefenseLevel,
    /// Confirmations accumulated for the candidate.
    pub consecutive: u32,
}

/// Hysteresis-gated controller over a shared weight cell.
#[derive(Debug)]
pub struct AdaptiveWeightController {
    settings: ControllerSettings,
    tables: LevelTables,
    weights: Arc<WeightCell>,
    current: DefenseLevel,
    candidate: DefenseLevel,
    consecutive: u32,
    manual: Option<ManualOverride>,
}

impl AdaptiveWeightController {
    /// Creates a controller at GREEN and applies the GREEN profile.
    pub fn new(
        weights: Arc<WeightCell>,
        tables: LevelTables,
        settings: ControllerSettings,
    ) -> Result<Self, SettingsError> {
        let controller = Self {
            settings: settings.validate()?,
            tables,
            weights,
            current: DefenseLevel::Green,
            candidate: DefenseLevel::Green,
            consecutive: 0,
            manual: None,
        };
        controller.apply(DefenseLevel::Green);
        Ok(controller)
    }

    /// Standard tables and default settings.
    pub fn standard(weights: Arc<WeightCell>) -> Result<Self, SettingsError> {
        Self::new(weights, LevelTables::standard(), ControllerSettings::default())
    }

    /// Starts from `level` instead of GREEN (e.g. restored state).
    pub fn with_initial_level(mut self, level: DefenseLevel) -> Self {
        self.current = level;
        self.candidate = level;
        self.consecutive = 0;
        self.apply(level);
        self
    }

    /// Committed level.
    pub fn current_level(&self) -> DefenseLevel {
        self.current
    }

    /// Pending level.
    pub fn candidate_level(&self) -> DefenseLevel {
        self.candidate
    }

    /// Confirmations accumulated for the candidate.
    pub fn consecutive_count(&self) -> u32 {
        self.consecutive
    }

    /// Active manual override.
    pub fn manual_override(&self) -> Option<&ManualOverride> {
        self.manual.as_ref()
    }

    /// Settings in force.
    pub fn settings(&self) -> &ControllerSettings {
        &self.settings
    }

    /// The weight cell this controller writes.
    pub fn weights(&self) -> &Arc<WeightCell> {
        &self.weights
    }

    fn apply(&self, level: DefenseLevel) -> u64 {
        let profile = self.tables.profile(level);
        self.weights
            .update(|w| w.set_level(level, profile.weights, profile.suspended))
    }

    fn step(&self, from: DefenseLevel, trigger: Trigger) -> Transition {
        Transition {
            from,
            to: self.current,
            changed: from != self.current,
            trigger,
            candidate: self.candidate,
            consecutive: self.consecutive,
        }
    }

    fn commit(&mut self, level: DefenseLevel, trigger: Trigger) -> Transition {
        let from = self.current;
        self.current = level;
        self.candidate = level;
        self.consecutive = 0;
        let version = self.apply(level);
        info!(from = %from, to = %level, trigger = ?trigger, weights_version = version, "defense level committed");
        self.step(from, trigger)
    }

    /// Feeds one reading through the hysteresis gate.
    pub fn observe(&mut self, signal: ResilienceSignal) -> Transition {
        let from = self.current;

        if let Some(manual) = &self.manual {
            if signal.timestamp_ms < manual.expires_at_ms {
                debug!(reading = %signal.defense_level, pinned = %manual.level, "reading ignored under override");
                return self.step(from, Trigger::Overridden);
            }
            info!(level = %manual.level, source = %manual.source, "manual override expired");
            self.manual = None;
            self.candidate = self.current;
            self.consecutive = 0;
        }

        let reading = signal.defense_level;
        if reading == self.current {
            self.candidate = self.current;
            self.consecutive = 0;
            return self.step(from, Trigger::Stable);
        }

        let escalating = reading > self.current;
        let pending_escalation = self.candidate > self.current;
        if escalating
            && (reading == DefenseLevel::MAX || (pending_escalation && reading > self.candidate))
        {
            warn!(from = %self.current, to = %reading, "emergency escalation");
            return self.commit(reading, Trigger::Emergency);
        }

        if reading == self.candidate {
            self.consecutive += 1;
        } else {
            self.candidate = reading;
            self.consecutive = 1;
        }

        let required = if escalating {
            self.settings.escalation_confirmations
        } else {
            self.settings.deescalation_confirmations
        };
        if self.consecutive >= required {
            self.commit(reading, Trigger::Confirmed)
        } else {
            debug!(candidate = %reading, count = self.consecutive, required, "level change pending");
            self.step(from, Trigger::Pending)
        }
    }

    /// Forces `level` for `duration`, bypassing hysteresis.
    ///
    /// Rejected requests leave the level untouched.
    pub fn force_level(
        &mut self,
        level: DefenseLevel,
        reason: &str,
        source: &str,
        duration: Duration,
        now_ms: i64,
    ) -> Result<Transition, OverrideError> {
        if reason.trim().is_empty() {
            return Err(OverrideError::MissingReason);
        }
        if source.trim().is_empty() {
            return Err(OverrideError::MissingSource);
        }
        let max = self.settings.max_override();
        if duration.is_zero() || duration > max {
            return Err(OverrideError::InvalidDuration {
                requested: duration,
                max,
            });
        }

        let millis = i64::try_from(duration.as_millis()).unwrap_or(i64::MAX);
        let manual = ManualOverride {
            level,
            reason: reason.to_string(),
            source: source.to_string(),
            set_at_ms: now_ms,
            expires_at_ms: now_ms.saturating_add(millis),
        };
        warn!(
            level = %level,
            reason,
            source,
            expires_at_ms = manual.expires_at_ms,
            "manual defense level override"
        );
        self.manual = Some(manual);
        Ok(self.commit(level, Trigger::Manual))
    }

    /// Ends an active override early; the forced level stays until
    /// readings move it.
    pub fn clear_override(&mut self) -> Option<ManualOverride> {
        let cleared = self.manual.take();
        if let Some(m) = &cleared {
            info!(level = %m.level, source = %m.source, "manual override cleared");
        }
        cleared
    }
}
