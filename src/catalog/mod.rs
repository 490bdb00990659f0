//! Constraint registry, presets, and resolved constraint sets.
//!
//! A `ConstraintCatalog` is the single mutable authority over which rules
//! are enabled and at what weight. `resolve()` freezes its current state
//! into an immutable [`ConstraintSet`] that evaluators share freely across
//! threads. Preset weights are frozen with the set; the defense-level
//! table is not. A set holds a handle to the catalog's [`WeightCell`], so
//! re-weighting by the adaptive controller reaches existing sets on their
//! next evaluation.
//!
//! # Invariants
//! - Ids are unique; locked constraints are always enabled.
//! - Every enabled constraint's dependencies are enabled.
//! - The dependency graph is acyclic (checked at registration).
//! - Failed operations leave the catalog unchanged.

mod preset;
mod resolver;
mod weights;

pub use preset::Preset;
pub use resolver::DependencyResolver;
pub use weights::{WeightCell, WeightSnapshot};

use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info};

use crate::constraints::{ConstraintDef, ConstraintKind};
use crate::error::CatalogError;

/// Registry of constraint definitions and their enabled state.
#[derive(Debug)]
pub struct ConstraintCatalog {
    defs: Vec<Arc<ConstraintDef>>,
    enabled: Vec<bool>,
    presets: BTreeMap<String, Preset>,
    active_preset: Option<String>,
    weights: Arc<WeightCell>,
    resolutions: AtomicU64,
}

impl Default for ConstraintCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl ConstraintCatalog {
    /// Creates an empty catalog.
    pub fn new() -> Self {
        Self {
            defs: Vec::new(),
            enabled: Vec::new(),
            presets: BTreeMap::new(),
            active_preset: None,
            weights: Arc::new(WeightCell::new()),
            resolutions: AtomicU64::new(0),
        }
    }

    fn position(&self, id: &str) -> Result<usize, CatalogError> {
        self.defs
            .iter()
            .position(|d| d.id == id)
            .ok_or_else(|| CatalogError::UnknownConstraint { id: id.to_string() })
    }

    fn check_weight(id: &str, weight: f64) -> Result<(), CatalogError> {
        if weight.is_finite() && weight >= 0.0 {
            Ok(())
        } else {
            Err(CatalogError::InvalidWeight {
                id: id.to_string(),
                weight,
            })
        }
    }

    /// Registers a constraint.
    ///
    /// Dependencies may name constraints registered later. Fails if the id
    /// collides, the weight is invalid, the new edges close a cycle, or the
    /// enabled state would break a dependency with a registered constraint.
    pub fn register(&mut self, def: ConstraintDef) -> Result<(), CatalogError> {
        if self.defs.iter().any(|d| d.id == def.id) {
            return Err(CatalogError::DuplicateId { id: def.id });
        }
        Self::check_weight(&def.id, def.weight)?;

        let (id, kind, weight) = (def.id.clone(), def.kind, def.weight);
        let enabled = def.enabled || def.locked;
        self.defs.push(Arc::new(def));
        self.enabled.push(enabled);

        let resolver = DependencyResolver::new(&self.defs);
        let checked = match resolver.cycle_through(&id) {
            Some(path) => Err(CatalogError::DependencyCycle { path }),
            None => resolver.check_registered(&id, &self.enabled),
        };
        if let Err(err) = checked {
            self.defs.pop();
            self.enabled.pop();
            return Err(err);
        }

        if kind == ConstraintKind::Soft {
            self.weights.update(|w| w.set_base(id.clone(), weight));
        }
        debug!(id = %id, kind = ?kind, enabled, "registered constraint");
        Ok(())
    }

    /// Registers (or replaces) a preset.
    pub fn register_preset(&mut self, preset: Preset) {
        debug!(name = %preset.name, version = preset.version, "registered preset");
        self.presets.insert(preset.name.clone(), preset);
    }

    /// Looks up a preset.
    pub fn preset(&self, name: &str) -> Option<&Preset> {
        self.presets.get(name)
    }

    /// Registered presets in name order.
    pub fn presets(&self) -> impl Iterator<Item = &Preset> {
        self.presets.values()
    }

    /// Name of the last preset applied, unless the state was modified since.
    pub fn active_preset(&self) -> Option<&str> {
        self.active_preset.as_deref()
    }

    /// Looks up a definition.
    pub fn get(&self, id: &str) -> Option<&ConstraintDef> {
        self.defs.iter().find(|d| d.id == id).map(Arc::as_ref)
    }

    /// Whether `id` is enabled; `false` for unknown ids.
    pub fn is_enabled(&self, id: &str) -> bool {
        self.position(id).map(|i| self.enabled[i]).unwrap_or(false)
    }

    /// Definitions with their enabled state, in registration order.
    pub fn constraints(&self) -> impl Iterator<Item = (&ConstraintDef, bool)> {
        self.defs.iter().map(Arc::as_ref).zip(self.enabled.iter().copied())
    }

    /// Number of registered constraints.
    pub fn len(&self) -> usize {
        self.defs.len()
    }

    /// Whether nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.defs.is_empty()
    }

    /// The live weight table shared with resolved sets.
    pub fn weights(&self) -> &Arc<WeightCell> {
        &self.weights
    }

    /// Enables or disables one constraint.
    ///
    /// Enabling requires every dependency to be enabled already; nothing is
    /// enabled transitively. Disabling fails for locked constraints and for
    /// constraints an enabled constraint depends on.
    pub fn set_enabled(&mut self, id: &str, enabled: bool) -> Result<(), CatalogError> {
        let i = self.position(id)?;
        let resolver = DependencyResolver::new(&self.defs);
        if enabled {
            resolver.check_enable(id, &self.enabled)?;
        } else {
            resolver.check_disable(id, &self.enabled)?;
        }

        if self.enabled[i] != enabled {
            self.enabled[i] = enabled;
            self.active_preset = None;
        }
        info!(id, enabled, "constraint toggled");
        Ok(())
    }

    /// Sets the preset weight of a soft constraint.
    pub fn set_weight(&mut self, id: &str, weight: f64) -> Result<(), CatalogError> {
        self.position(id)?;
        Self::check_weight(id, weight)?;
        let key = id.to_string();
        self.weights.update(|w| w.set_base(key, weight));
        self.active_preset = None;
        info!(id, weight, "constraint weight set");
        Ok(())
    }

    /// Applies a registered preset by name.
    pub fn apply_preset(&mut self, name: &str) -> Result<(), CatalogError> {
        let preset = self
            .presets
            .get(name)
            .cloned()
            .ok_or_else(|| CatalogError::UnknownPreset { name: name.to_string() })?;
        self.apply(&preset)
    }

    /// Applies a preset value: all changes or none.
    ///
    /// The resulting enabled set is exactly the preset's (plus locked
    /// constraints); weights are the registered defaults with the preset's
    /// overrides on top.
    pub fn apply(&mut self, preset: &Preset) -> Result<(), CatalogError> {
        let (next, base) = self.plan(preset)?;

        self.enabled = next;
        self.weights.update(|w| w.replace_base(base));
        self.active_preset = Some(preset.name.clone());
        info!(
            preset = %preset.name,
            version = preset.version,
            enabled = self.enabled.iter().filter(|e| **e).count(),
            "preset applied"
        );
        Ok(())
    }

    /// Applies a captured state and records `active` as the active preset.
    pub fn restore(&mut self, state: &Preset, active: Option<String>) -> Result<(), CatalogError> {
        self.apply(state)?;
        self.active_preset = active;
        Ok(())
    }

    /// Validates a preset against this catalog without applying it.
    pub fn check_preset(&self, preset: &Preset) -> Result<(), CatalogError> {
        self.plan(preset).map(|_| ())
    }

    fn plan(&self, preset: &Preset) -> Result<(Vec<bool>, BTreeMap<String, f64>), CatalogError> {
        for id in preset
            .enabled
            .iter()
            .chain(&preset.disabled)
            .chain(preset.weight_overrides.keys())
        {
            self.position(id)?;
        }
        for (id, &weight) in &preset.weight_overrides {
            Self::check_weight(id, weight)?;
        }

        let disabled: HashSet<&str> = preset.disabled.iter().map(String::as_str).collect();
        if let Some(locked) = self.defs.iter().find(|d| d.locked && disabled.contains(d.id.as_str())) {
            return Err(CatalogError::LockedConstraint { id: locked.id.clone() });
        }

        let next: Vec<bool> = self
            .defs
            .iter()
            .map(|d| d.locked || preset.enables(&d.id))
            .collect();
        DependencyResolver::new(&self.defs).validate(&next)?;

        let base: BTreeMap<String, f64> = self
            .defs
            .iter()
            .filter(|d| d.kind == ConstraintKind::Soft)
            .map(|d| {
                let w = preset.weight_overrides.get(&d.id).copied().unwrap_or(d.weight);
                (d.id.clone(), w)
            })
            .collect();
        Ok((next, base))
    }

    /// Current state as a preset, named `name`.
    ///
    /// Applying the capture to a catalog with the same registrations
    /// reproduces this state.
    pub fn capture(&self, name: impl Into<String>) -> Preset {
        let snapshot = self.weights.load();
        let mut preset = Preset::new(name);
        for (def, on) in self.constraints() {
            if on {
                preset.enabled.push(def.id.clone());
            } else {
                preset.disabled.push(def.id.clone());
            }
            if let Some(w) = snapshot.base_weight(&def.id) {
                if w != def.weight {
                    preset.weight_overrides.insert(def.id.clone(), w);
                }
            }
        }
        preset
    }

    /// Freezes the current state into an immutable set.
    pub fn resolve(&self) -> Result<ConstraintSet, CatalogError> {
        let resolver = DependencyResolver::new(&self.defs);
        resolver.validate(&self.enabled)?;
        let order = resolver.order()?;

        let active = || {
            self.defs
                .iter()
                .zip(&self.enabled)
                .filter(|(_, on)| **on)
                .map(|(d, _)| Arc::clone(d))
        };
        let mut hard: Vec<Arc<ConstraintDef>> = active().filter(|d| d.is_hard()).collect();
        // Stable: ties keep registration order.
        hard.sort_by(|a, b| b.priority.cmp(&a.priority));
        let soft: Vec<Arc<ConstraintDef>> = active().filter(|d| !d.is_hard()).collect();

        let generation = self.resolutions.fetch_add(1, Ordering::Relaxed) + 1;
        info!(
            generation,
            hard = hard.len(),
            soft = soft.len(),
            preset = self.active_preset.as_deref().unwrap_or("-"),
            "constraint set resolved"
        );

        Ok(ConstraintSet {
            generation,
            preset: self.active_preset.clone(),
            hard,
            soft,
            order,
            base: Arc::new(self.weights.load().base().clone()),
            weights: Arc::clone(&self.weights),
        })
    }
}

/// Immutable, resolved configuration shared by evaluators.
#[derive(Debug, Clone)]
pub struct ConstraintSet {
    generation: u64,
    preset: Option<String>,
    hard: Vec<Arc<ConstraintDef>>,
    soft: Vec<Arc<ConstraintDef>>,
    order: Vec<String>,
    base: Arc<BTreeMap<String, f64>>,
    weights: Arc<WeightCell>,
}

impl ConstraintSet {
    /// Resolution counter of the originating catalog.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Preset active at resolution time.
    pub fn preset(&self) -> Option<&str> {
        self.preset.as_deref()
    }

    /// Enabled hard constraints, priority descending then registration order.
    pub fn hard(&self) -> &[Arc<ConstraintDef>] {
        &self.hard
    }

    /// Enabled soft constraints in registration order.
    pub fn soft(&self) -> &[Arc<ConstraintDef>] {
        &self.soft
    }

    /// All registered ids, dependencies first.
    pub fn dependency_order(&self) -> &[String] {
        &self.order
    }

    /// Preset weights frozen at resolution under the current level table.
    pub fn weights(&self) -> Arc<WeightSnapshot> {
        let live = self.weights.load();
        if live.base() == self.base.as_ref() {
            return live;
        }
        let mut frozen = WeightSnapshot::clone(&live);
        frozen.replace_base(BTreeMap::clone(&self.base));
        Arc::new(frozen)
    }

    /// Looks up an enabled constraint.
    pub fn get(&self, id: &str) -> Option<&ConstraintDef> {
        self.hard
            .iter()
            .chain(&self.soft)
            .find(|d| d.id == id)
            .map(Arc::as_ref)
    }

    /// Whether `id` is enabled in this set.
    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    /// Number of enabled constraints.
    pub fn len(&self) -> usize {
        self.hard.len() + self.soft.len()
    }

    /// Whether nothing is enabled.
    pub fn is_empty(&self) -> bool {
        self.hard.is_empty() && self.soft.is_empty()
    }

    /// Comparable description of the set's contents.
    pub fn summary(&self) -> SetSummary {
        let weights = self.weights();
        SetSummary {
            preset: self.preset.clone(),
            hard: self.hard.iter().map(|d| d.id.clone()).collect(),
            soft: self
                .soft
                .iter()
                .map(|d| (d.id.clone(), weights.weight(&d.id).unwrap_or(d.weight)))
                .collect(),
            level: weights.level(),
        }
    }
}

/// What a [`ConstraintSet`] enables and at which weights.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SetSummary {
    /// Preset active at resolution time.
    pub preset: Option<String>,
    /// Hard constraint ids in evaluation order.
    pub hard: Vec<String>,
    /// Soft constraint ids with effective weights.
    pub soft: Vec<(String, f64)>,
    /// Defense level of the weight table.
    pub level: crate::models::DefenseLevel,
}
