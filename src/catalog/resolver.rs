//! Dependency graph checks over registered constraints.
//!
//! Edges run from a constraint to each constraint it depends on. The
//! graph is kept acyclic at registration time, so resolution only has to
//! verify that every enabled constraint's dependencies are enabled too.
//!
//! # Reference
//! Cormen et al. (2009), "Introduction to Algorithms", Ch. 22.4 (Topological Sort)

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::constraints::ConstraintDef;
use crate::error::CatalogError;

/// Read-only dependency view over a catalog's definitions.
///
/// `enabled` slices passed to the checks are indexed like `defs`.
#[derive(Debug)]
pub struct DependencyResolver<'a> {
    defs: &'a [Arc<ConstraintDef>],
    index: HashMap<&'a str, usize>,
}

impl<'a> DependencyResolver<'a> {
    /// Indexes the definitions.
    pub fn new(defs: &'a [Arc<ConstraintDef>]) -> Self {
        let index = defs.iter().enumerate().map(|(i, d)| (d.id.as_str(), i)).collect();
        Self { defs, index }
    }

    fn lookup(&self, id: &str) -> Result<usize, CatalogError> {
        self.index
            .get(id)
            .copied()
            .ok_or_else(|| CatalogError::UnknownConstraint { id: id.to_string() })
    }

    /// Cycle that returns to `start`, if one exists.
    ///
    /// Dependencies that are not registered yet are skipped; they cannot
    /// close a cycle until they are.
    pub fn cycle_through(&self, start: &str) -> Option<Vec<String>> {
        let (&start, _) = self.index.get_key_value(start)?;
        let mut visited = HashSet::new();
        let mut path = vec![start];
        if self.cycle_dfs(start, start, &mut visited, &mut path) {
            Some(path.into_iter().map(str::to_string).collect())
        } else {
            None
        }
    }

    fn cycle_dfs(
        &self,
        node: &'a str,
        start: &str,
        visited: &mut HashSet<&'a str>,
        path: &mut Vec<&'a str>,
    ) -> bool {
        let defs: &'a [Arc<ConstraintDef>] = self.defs;
        visited.insert(node);
        let Some(&i) = self.index.get(node) else {
            return false;
        };
        for dep in &defs[i].dependencies {
            let dep = dep.as_str();
            if dep == start {
                path.push(dep);
                return true;
            }
            if !visited.contains(dep) && self.index.contains_key(dep) {
                path.push(dep);
                if self.cycle_dfs(dep, start, visited, path) {
                    return true;
                }
                path.pop();
            }
        }
        false
    }

    /// Enabling `id` requires each of its dependencies to be enabled.
    pub fn check_enable(&self, id: &str, enabled: &[bool]) -> Result<(), CatalogError> {
        let i = self.lookup(id)?;
        for dep in &self.defs[i].dependencies {
            let j = self.lookup(dep)?;
            if !enabled[j] {
                return Err(CatalogError::MissingDependency {
                    constraint: id.to_string(),
                    dependency: dep.clone(),
                });
            }
        }
        Ok(())
    }

    /// Checks a just-registered `id` against the enabled state.
    ///
    /// If it is enabled, its registered dependencies must be enabled; if it
    /// is disabled, no enabled constraint may depend on it. Dependencies
    /// that are not registered yet are skipped.
    pub fn check_registered(&self, id: &str, enabled: &[bool]) -> Result<(), CatalogError> {
        let i = self.lookup(id)?;
        if !enabled[i] {
            return self.check_disable(id, enabled);
        }
        for dep in &self.defs[i].dependencies {
            if let Some(&j) = self.index.get(dep.as_str()) {
                if !enabled[j] {
                    return Err(CatalogError::MissingDependency {
                        constraint: id.to_string(),
                        dependency: dep.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Disabling `id` requires it to be unlocked and no enabled constraint
    /// to depend on it.
    pub fn check_disable(&self, id: &str, enabled: &[bool]) -> Result<(), CatalogError> {
        let i = self.lookup(id)?;
        if self.defs[i].locked {
            return Err(CatalogError::LockedConstraint { id: id.to_string() });
        }
        let dependent = self
            .defs
            .iter()
            .zip(enabled)
            .find(|(d, on)| **on && d.dependencies.iter().any(|dep| dep == id));
        match dependent {
            Some((d, _)) => Err(CatalogError::MissingDependency {
                constraint: d.id.clone(),
                dependency: id.to_string(),
            }),
            None => Ok(()),
        }
    }

    /// Verifies a complete enabled-state: locked constraints on, and every
    /// enabled constraint's dependencies registered and enabled.
    pub fn validate(&self, enabled: &[bool]) -> Result<(), CatalogError> {
        for (def, &on) in self.defs.iter().zip(enabled) {
            if def.locked && !on {
                return Err(CatalogError::LockedConstraint { id: def.id.clone() });
            }
            if on {
                self.check_enable(&def.id, enabled)?;
            }
        }
        Ok(())
    }

    /// All ids with dependencies before dependents; ties keep registration
    /// order. Dependencies that are not registered are left out.
    pub fn order(&self) -> Result<Vec<String>, CatalogError> {
        let mut done = HashSet::new();
        let mut in_stack = HashSet::new();
        let mut out = Vec::with_capacity(self.defs.len());
        let defs: &'a [Arc<ConstraintDef>] = self.defs;
        for def in defs {
            self.order_dfs(&def.id, &mut done, &mut in_stack, &mut out)?;
        }
        Ok(out)
    }

    fn order_dfs(
        &self,
        node: &'a str,
        done: &mut HashSet<&'a str>,
        in_stack: &mut HashSet<&'a str>,
        out: &mut Vec<String>,
    ) -> Result<(), CatalogError> {
        if done.contains(node) {
            return Ok(());
        }
        if !in_stack.insert(node) {
            return Err(CatalogError::DependencyCycle {
                path: vec![node.to_string(), node.to_string()],
            });
        }
        let defs: &'a [Arc<ConstraintDef>] = self.defs;
        let i = self.lookup(node)?;
        for dep in &defs[i].dependencies {
            if self.index.contains_key(dep.as_str()) {
                self.order_dfs(dep, done, in_stack, out)?;
            }
        }
        in_stack.remove(node);
        done.insert(node);
        out.push(node.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ConstraintSet;
    use crate::constraints::{Category, ConstraintCheck, Finding, Priority};
    use crate::error::CheckError;
    use crate::models::ScheduleView;

    #[derive(Debug)]
    struct Noop;

    impl ConstraintCheck for Noop {
        fn check(&self, _set: &ConstraintSet, _view: &ScheduleView<'_>) -> Result<Vec<Finding>, CheckError> {
            Ok(Vec::new())
        }
    }

    fn def(id: &str, deps: &[&str]) -> Arc<ConstraintDef> {
        let mut d = ConstraintDef::hard(id, Category::Call, Priority::High, Noop);
        for dep in deps {
            d = d.depends_on(*dep);
        }
        Arc::new(d)
    }

    #[test]
    fn test_cycle_detection() {
        let defs = vec![def("A", &["B"]), def("B", &["C"]), def("C", &["A"])];
        let r = DependencyResolver::new(&defs);
        let path = r.cycle_through("C").unwrap();
        assert_eq!(path, vec!["C", "A", "B", "C"]);

        let acyclic = vec![def("A", &["B"]), def("B", &[])];
        assert!(DependencyResolver::new(&acyclic).cycle_through("A").is_none());
    }

    #[test]
    fn test_self_dependency_is_a_cycle() {
        let defs = vec![def("A", &["A"])];
        assert_eq!(
            DependencyResolver::new(&defs).cycle_through("A").unwrap(),
            vec!["A", "A"]
        );
    }

    #[test]
    fn test_enable_and_disable_checks() {
        let defs = vec![def("Call", &[]), def("PostCall", &["Call"])];
        let r = DependencyResolver::new(&defs);

        let err = r.check_enable("PostCall", &[false, false]).unwrap_err();
        assert_eq!(
            err,
            CatalogError::MissingDependency {
                constraint: "PostCall".into(),
                dependency: "Call".into()
            }
        );
        assert!(r.check_enable("PostCall", &[true, false]).is_ok());

        let err = r.check_disable("Call", &[true, true]).unwrap_err();
        assert!(matches!(err, CatalogError::MissingDependency { .. }));
        assert!(r.check_disable("Call", &[true, false]).is_ok());
    }

    #[test]
    fn test_order_puts_dependencies_first() {
        let defs = vec![def("PostCall", &["Call"]), def("Call", &[]), def("Other", &[])];
        let order = DependencyResolver::new(&defs).order().unwrap();
        assert_eq!(order, vec!["Call", "PostCall", "Other"]);
    }

    #[test]
    fn test_unregistered_dependency_fails_resolution() {
        let defs = vec![def("A", &["Ghost"])];
        let r = DependencyResolver::new(&defs);
        assert!(matches!(
            r.validate(&[true]),
            Err(CatalogError::UnknownConstraint { .. })
        ));
        assert!(r.validate(&[false]).is_ok());
        assert_eq!(r.order().unwrap(), vec!["A"]);
    }

    #[test]
    fn test_registration_check() {
        let defs = vec![def("Call", &[]), def("PostCall", &["Call", "Later"])];
        let r = DependencyResolver::new(&defs);
        assert!(matches!(
            r.check_registered("PostCall", &[false, true]),
            Err(CatalogError::MissingDependency { .. })
        ));
        assert!(r.check_registered("PostCall", &[true, true]).is_ok());
        assert!(matches!(
            r.check_registered("Call", &[false, true]),
            Err(CatalogError::MissingDependency { .. })
        ));
    }
}
