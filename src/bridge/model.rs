//! Solver-native model: boolean variables, linear constraints, and a
//! weighted objective.
//!
//! One boolean variable exists per (person, block, template) triple whose
//! template fits the block's session. Constraints are integer linear
//! rows over those variables; the objective is maximized.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::models::{Assignment, Block, Person, RotationTemplate, SchedulingContext};

/// Variable index into `SolverModel::variables`.
pub type VarId = usize;

/// Decision variable identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VarKey {
    /// Person id.
    pub person_id: String,
    /// Block id.
    pub block_id: String,
    /// Template id.
    pub template_id: String,
}

impl VarKey {
    /// Creates a key.
    pub fn new(
        person_id: impl Into<String>,
        block_id: impl Into<String>,
        template_id: impl Into<String>,
    ) -> Self {
        Self {
            person_id: person_id.into(),
            block_id: block_id.into(),
            template_id: template_id.into(),
        }
    }
}

impl From<&VarKey> for Assignment {
    fn from(k: &VarKey) -> Self {
        Assignment::new(&k.person_id, &k.block_id, &k.template_id)
    }
}

/// Row comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sense {
    /// lhs ≤ rhs
    Le,
    /// lhs ≥ rhs
    Ge,
    /// lhs = rhs
    Eq,
}

/// `Σ coef·x (sense) rhs`, tagged with the constraint it came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearConstraint {
    /// Originating constraint id.
    pub source: String,
    /// (variable, coefficient) pairs.
    pub terms: Vec<(VarId, i64)>,
    /// Comparison.
    pub sense: Sense,
    /// Right-hand side.
    pub rhs: i64,
}

impl LinearConstraint {
    /// Left-hand side under an assignment of values.
    pub fn lhs(&self, values: &[bool]) -> i64 {
        self.terms
            .iter()
            .filter(|(v, _)| values.get(*v).copied().unwrap_or(false))
            .map(|(_, c)| c)
            .sum()
    }

    /// Whether the row holds under `values`.
    pub fn is_satisfied(&self, values: &[bool]) -> bool {
        let lhs = self.lhs(values);
        match self.sense {
            Sense::Le => lhs <= self.rhs,
            Sense::Ge => lhs >= self.rhs,
            Sense::Eq => lhs == self.rhs,
        }
    }
}

/// One soft constraint's contribution: `weight × Σ coef·x`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectiveTerm {
    /// Originating constraint id.
    pub source: String,
    /// Live weight at compile time.
    pub weight: f64,
    /// (variable, coefficient) pairs. Penalties carry negative coefficients.
    pub coefficients: Vec<(VarId, f64)>,
}

/// Maximized objective.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WeightedSum {
    /// Terms in soft-constraint order.
    pub terms: Vec<ObjectiveTerm>,
}

impl WeightedSum {
    /// Objective value under `values`.
    pub fn value(&self, values: &[bool]) -> f64 {
        self.terms
            .iter()
            .flat_map(|t| t.coefficients.iter().map(move |(v, c)| (v, t.weight * c)))
            .filter(|(v, _)| values.get(**v).copied().unwrap_or(false))
            .map(|(_, c)| c)
            .sum()
    }

    /// Aggregated objective coefficient per variable.
    pub fn coefficients(&self, variable_count: usize) -> Vec<f64> {
        let mut out = vec![0.0; variable_count];
        for t in &self.terms {
            for &(v, c) in &t.coefficients {
                if let Some(slot) = out.get_mut(v) {
                    *slot += t.weight * c;
                }
            }
        }
        out
    }
}

/// How a constraint was handled by the compiler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    /// Rows or objective terms were emitted.
    Encoded,
    /// Not linearizable; must be verified after solving.
    Unsupported,
    /// Deliberately left to post-solve validation.
    ValidationOnly,
}

/// Compiled solver input.
#[derive(Debug, Clone, Serialize)]
pub struct SolverModel {
    /// Decision variables.
    pub variables: Vec<VarKey>,
    /// Hard rows.
    pub hard_constraints: Vec<LinearConstraint>,
    /// Objective (maximize).
    pub objective: WeightedSum,
    /// Hard constraints left for post-solve verification.
    pub deferred: Vec<String>,
    /// Soft constraints scored only by validation.
    pub post_hoc: Vec<String>,
    /// Generation of the constraint set this model was compiled from.
    pub set_generation: u64,
    #[serde(skip)]
    index: HashMap<VarKey, VarId>,
}

impl SolverModel {
    /// Looks up a variable.
    pub fn var(&self, key: &VarKey) -> Option<VarId> {
        self.index.get(key).copied()
    }

    /// Number of variables.
    pub fn variable_count(&self) -> usize {
        self.variables.len()
    }

    /// Number of hard rows.
    pub fn constraint_count(&self) -> usize {
        self.hard_constraints.len()
    }

    /// Rows that fail under `values`.
    pub fn unsatisfied(&self, values: &[bool]) -> Vec<&LinearConstraint> {
        self.hard_constraints
            .iter()
            .filter(|c| !c.is_satisfied(values))
            .collect()
    }
}

/// A variable with its references resolved.
#[derive(Debug, Clone, Copy)]
pub struct VarInfo<'a> {
    /// Variable index.
    pub id: VarId,
    /// Person.
    pub person: &'a Person,
    /// Block.
    pub block: &'a Block,
    /// Template.
    pub template: &'a RotationTemplate,
}

/// Incremental model construction handed to each constraint's `encode`.
#[derive(Debug)]
pub struct ModelBuilder<'a> {
    context: &'a SchedulingContext,
    vars: Vec<VarInfo<'a>>,
    by_block: BTreeMap<&'a str, Vec<VarId>>,
    by_person: BTreeMap<&'a str, Vec<VarId>>,
    source: String,
    weight: f64,
    constraints: Vec<LinearConstraint>,
    objective: Vec<ObjectiveTerm>,
}

impl<'a> ModelBuilder<'a> {
    /// Enumerates the variable domain: person-major, then block, then template.
    pub(crate) fn new(context: &'a SchedulingContext) -> Self {
        let mut vars = Vec::new();
        let mut by_block: BTreeMap<&str, Vec<VarId>> = BTreeMap::new();
        let mut by_person: BTreeMap<&str, Vec<VarId>> = BTreeMap::new();

        for person in &context.people {
            for block in &context.blocks {
                for template in &context.templates {
                    if !template.kind.fits(block.session) {
                        continue;
                    }
                    let id = vars.len();
                    vars.push(VarInfo { id, person, block, template });
                    by_block.entry(block.id.as_str()).or_default().push(id);
                    by_person.entry(person.id.as_str()).or_default().push(id);
                }
            }
        }

        Self {
            context,
            vars,
            by_block,
            by_person,
            source: String::new(),
            weight: 0.0,
            constraints: Vec::new(),
            objective: Vec::new(),
        }
    }

    /// The context being compiled.
    pub fn context(&self) -> &'a SchedulingContext {
        self.context
    }

    /// All variables.
    pub fn vars(&self) -> &[VarInfo<'a>] {
        &self.vars
    }

    /// One variable.
    pub fn var(&self, id: VarId) -> &VarInfo<'a> {
        &self.vars[id]
    }

    /// Variables in a block.
    pub fn vars_in_block(&self, block_id: &str) -> &[VarId] {
        self.by_block.get(block_id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Variables of a person.
    pub fn vars_of_person(&self, person_id: &str) -> &[VarId] {
        self.by_person.get(person_id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Adds a hard row attributed to the current constraint.
    pub fn require(&mut self, terms: Vec<(VarId, i64)>, sense: Sense, rhs: i64) {
        self.constraints.push(LinearConstraint {
            source: self.source.clone(),
            terms,
            sense,
            rhs,
        });
    }

    /// Fixes a variable to zero.
    pub fn forbid(&mut self, var: VarId) {
        self.require(vec![(var, 1)], Sense::Le, 0);
    }

    /// Adds objective coefficients attributed to the current constraint.
    pub fn objective(&mut self, coefficients: Vec<(VarId, f64)>) {
        if coefficients.is_empty() {
            return;
        }
        self.objective.push(ObjectiveTerm {
            source: self.source.clone(),
            weight: self.weight,
            coefficients,
        });
    }

    pub(crate) fn begin(&mut self, source: &str, weight: f64) {
        self.source = source.to_string();
        self.weight = weight;
    }

    pub(crate) fn finish(
        self,
        set_generation: u64,
        deferred: Vec<String>,
        post_hoc: Vec<String>,
    ) -> SolverModel {
        let variables: Vec<VarKey> = self
            .vars
            .iter()
            .map(|v| VarKey::new(&v.person.id, &v.block.id, &v.template.id))
            .collect();
        let index = variables
            .iter()
            .enumerate()
            .map(|(i, k)| (k.clone(), i))
            .collect();

        SolverModel {
            variables,
            hard_constraints: self.constraints,
            objective: WeightedSum { terms: self.objective },
            deferred,
            post_hoc,
            set_generation,
            index,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Block, Person, RotationTemplate, TemplateKind};
    use chrono::NaiveDate;

    fn ctx() -> SchedulingContext {
        let day = NaiveDate::from_ymd_opt(2025, 7, 1).unwrap();
        SchedulingContext::new()
            .with_person(Person::resident("R1", 1))
            .with_person(Person::faculty("F1"))
            .with_block(Block::am("B1", day))
            .with_block(Block::night("N1", day))
            .with_template(RotationTemplate::new("CLINIC", TemplateKind::Clinic))
            .with_template(RotationTemplate::new("CALL", TemplateKind::OvernightCall))
    }

    #[test]
    fn test_domain_respects_sessions() {
        let c = ctx();
        let b = ModelBuilder::new(&c);
        // 2 people × (AM: CLINIC, Night: CALL)
        assert_eq!(b.vars().len(), 4);
        assert_eq!(b.vars_in_block("B1").len(), 2);
        assert_eq!(b.vars_of_person("R1").len(), 2);
        assert!(b.vars_in_block("NOPE").is_empty());
    }

    #[test]
    fn test_rows_and_objective() {
        let c = ctx();
        let mut b = ModelBuilder::new(&c);
        b.begin("Cap", 0.0);
        b.require(vec![(0, 1), (1, 1)], Sense::Le, 1);
        b.begin("Coverage", 1000.0);
        b.objective(vec![(0, 1.0), (1, 1.0)]);
        let model = b.finish(7, Vec::new(), Vec::new());

        assert_eq!(model.constraint_count(), 1);
        assert_eq!(model.set_generation, 7);
        assert_eq!(model.hard_constraints[0].source, "Cap");

        let values = vec![true, false, false, false];
        assert!(model.hard_constraints[0].is_satisfied(&values));
        assert!((model.objective.value(&values) - 1000.0).abs() < 1e-9);

        let both = vec![true, true, false, false];
        assert_eq!(model.unsatisfied(&both).len(), 1);

        let key = VarKey::new("R1", "B1", "CLINIC");
        assert_eq!(model.var(&key), Some(0));
    }
}
