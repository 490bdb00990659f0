//! Engine configuration loaded from TOML.
//!
//! ```toml
//! [controller]
//! escalation_confirmations = 2
//! deescalation_confirmations = 3
//! max_override_secs = 86400
//!
//! [[presets]]
//! name = "night_float"
//! enabled = ["Availability", "EightyHourRule", "Coverage"]
//! weight_overrides = { Coverage = 1500.0 }
//!
//! [levels.orange]
//! weights = { UtilizationBuffer = 50.0 }
//! suspended = ["CallPreference"]
//! ```
//!
//! Every section is optional; missing values take the built-in defaults.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::adaptive::{ControllerSettings, LevelProfile, LevelTables};
use crate::catalog::{ConstraintCatalog, Preset};
use crate::error::SettingsError;
use crate::models::DefenseLevel;

/// Top-level settings file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    /// Hysteresis and override limits.
    pub controller: ControllerSettings,
    /// Presets registered on top of the built-ins.
    pub presets: Vec<Preset>,
    /// Per-level weight tables keyed by lowercase level name.
    pub levels: BTreeMap<String, LevelProfile>,
}

impl EngineSettings {
    /// Reads and validates a settings file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| SettingsError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let settings = Self::from_toml_str(&text)?;
        debug!(path = %path.display(), presets = settings.presets.len(), "settings loaded");
        Ok(settings)
    }

    /// Parses and validates TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self, SettingsError> {
        let settings: Self = toml::from_str(text)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Checks ranges and level names.
    pub fn validate(&self) -> Result<(), SettingsError> {
        self.controller.validate()?;

        for (i, preset) in self.presets.iter().enumerate() {
            if preset.name.trim().is_empty() {
                return Err(SettingsError::Invalid {
                    field: format!("presets[{i}].name"),
                    reason: "must not be empty".to_string(),
                });
            }
        }

        for (name, profile) in &self.levels {
            name.parse::<DefenseLevel>().map_err(|reason| SettingsError::Invalid {
                field: format!("levels.{name}"),
                reason,
            })?;
            if let Some((id, w)) = profile
                .weights
                .iter()
                .find(|(_, w)| !w.is_finite() || **w < 0.0)
            {
                return Err(SettingsError::Invalid {
                    field: format!("levels.{name}.weights.{id}"),
                    reason: format!("weight {w} must be finite and non-negative"),
                });
            }
        }
        Ok(())
    }

    /// Controller settings.
    pub fn controller_settings(&self) -> ControllerSettings {
        self.controller
    }

    /// Built-in tables with configured levels replacing theirs.
    pub fn level_tables(&self) -> Result<LevelTables, SettingsError> {
        let mut tables = LevelTables::standard();
        for (name, profile) in &self.levels {
            let level = name.parse::<DefenseLevel>().map_err(|reason| SettingsError::Invalid {
                field: format!("levels.{name}"),
                reason,
            })?;
            tables.set(level, profile.clone());
        }
        Ok(tables)
    }

    /// Registers the configured presets on `catalog`.
    ///
    /// Each preset is planned against the catalog before registration, so a
    /// bad preset is reported at load time.
    pub fn apply_to_catalog(&self, catalog: &mut ConstraintCatalog) -> Result<(), SettingsError> {
        for preset in &self.presets {
            catalog.check_preset(preset)?;
            catalog.register_preset(preset.clone());
        }
        Ok(())
    }
}
