//! Copy-on-write soft-constraint weights.
//!
//! Readers take an `Arc` to the current snapshot and keep it for the whole
//! evaluation; writers clone, modify, and swap. A reader never sees a
//! half-applied table.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, PoisonError, RwLock};

use serde::Serialize;

use crate::models::DefenseLevel;

/// One immutable generation of effective weights.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct WeightSnapshot {
    version: u64,
    base: BTreeMap<String, f64>,
    level: DefenseLevel,
    overlay: BTreeMap<String, f64>,
    suspended: BTreeSet<String>,
}

impl WeightSnapshot {
    /// Monotonic version, bumped on every swap.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Defense level whose table is applied.
    pub fn level(&self) -> DefenseLevel {
        self.level
    }

    /// Effective weight: the level table wins over the preset weight.
    pub fn weight(&self, id: &str) -> Option<f64> {
        self.overlay.get(id).or_else(|| self.base.get(id)).copied()
    }

    /// Preset (or operator) weight, ignoring the level table.
    pub fn base_weight(&self, id: &str) -> Option<f64> {
        self.base.get(id).copied()
    }

    /// Whether the level table switched this constraint off.
    pub fn is_suspended(&self, id: &str) -> bool {
        self.suspended.contains(id)
    }

    /// All preset weights.
    pub fn base(&self) -> &BTreeMap<String, f64> {
        &self.base
    }

    /// Suspended ids.
    pub fn suspended(&self) -> &BTreeSet<String> {
        &self.suspended
    }

    pub(crate) fn set_base(&mut self, id: impl Into<String>, weight: f64) {
        self.base.insert(id.into(), weight);
    }

    pub(crate) fn replace_base(&mut self, base: BTreeMap<String, f64>) {
        self.base = base;
    }

    pub(crate) fn set_level(
        &mut self,
        level: DefenseLevel,
        overlay: BTreeMap<String, f64>,
        suspended: BTreeSet<String>,
    ) {
        self.level = level;
        self.overlay = overlay;
        self.suspended = suspended;
    }
}

/// Shared, atomically swapped weight table.
#[derive(Debug, Default)]
pub struct WeightCell {
    current: RwLock<Arc<WeightSnapshot>>,
}

impl WeightCell {
    /// Creates a cell with an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current snapshot.
    pub fn load(&self) -> Arc<WeightSnapshot> {
        let guard = self.current.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&guard)
    }

    /// Clones the current snapshot, applies `f`, and swaps it in.
    ///
    /// Returns the new version.
    pub fn update<F>(&self, f: F) -> u64
    where
        F: FnOnce(&mut WeightSnapshot),
    {
        let mut guard = self.current.write().unwrap_or_else(PoisonError::into_inner);
        let mut next = WeightSnapshot::clone(&guard);
        f(&mut next);
        next.version = guard.version + 1;
        let version = next.version;
        *guard = Arc::new(next);
        version
    }
}
