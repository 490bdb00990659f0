//! Named, versioned constraint configurations.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A total configuration: every constraint not listed in `enabled` ends up
/// disabled (locked constraints excepted).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Preset {
    /// Preset name.
    pub name: String,
    /// Revision of this preset's contents.
    #[serde(default = "default_version")]
    pub version: u32,
    /// Constraints switched on.
    #[serde(default)]
    pub enabled: Vec<String>,
    /// Constraints switched off explicitly. Wins over `enabled`.
    #[serde(default)]
    pub disabled: Vec<String>,
    /// Soft weights replacing the registered defaults.
    #[serde(default)]
    pub weight_overrides: BTreeMap<String, f64>,
}

fn default_version() -> u32 {
    1
}

impl Preset {
    /// Creates an empty preset.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: default_version(),
            ..Default::default()
        }
    }

    /// Sets the version.
    pub fn with_version(mut self, version: u32) -> Self {
        self.version = version;
        self
    }

    /// Enables a constraint.
    pub fn enable(mut self, id: impl Into<String>) -> Self {
        self.enabled.push(id.into());
        self
    }

    /// Enables several constraints.
    pub fn enable_all<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.enabled.extend(ids.into_iter().map(Into::into));
        self
    }

    /// Disables a constraint.
    pub fn disable(mut self, id: impl Into<String>) -> Self {
        self.disabled.push(id.into());
        self
    }

    /// Overrides a weight.
    pub fn with_weight(mut self, id: impl Into<String>, weight: f64) -> Self {
        self.weight_overrides.insert(id.into(), weight);
        self
    }

    /// Whether the preset leaves `id` on.
    pub fn enables(&self, id: &str) -> bool {
        self.enabled.iter().any(|e| e == id) && !self.disabled.iter().any(|d| d == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_wins() {
        let p = Preset::new("p").enable("A").enable("B").disable("B");
        assert!(p.enables("A"));
        assert!(!p.enables("B"));
        assert!(!p.enables("C"));
    }

    #[test]
    fn test_toml_defaults() {
        let p: Preset = toml::from_str(r#"name = "night""#).unwrap();
        assert_eq!(p.version, 1);
        assert!(p.enabled.is_empty());
        assert!(p.weight_overrides.is_empty());
    }
}
