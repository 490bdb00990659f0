//! Assignments and the per-evaluation schedule view.
//!
//! An assignment places one person on one template during one block.
//! `ScheduleView` resolves a candidate assignment set against a
//! `SchedulingContext` once, so every constraint check works from the
//! same indexed data.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use super::{Block, Person, RotationTemplate, SchedulingContext};

/// A person × block × template assignment.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Assignment {
    /// Assigned person.
    pub person_id: String,
    /// Block.
    pub block_id: String,
    /// Rotation template.
    pub template_id: String,
}

impl Assignment {
    /// Creates a new assignment.
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

/// An assignment with its references resolved.
#[derive(Debug, Clone, Copy)]
pub struct Placement<'a> {
    /// Index into the candidate assignment slice.
    pub index: usize,
    /// Raw assignment.
    pub assignment: &'a Assignment,
    /// Resolved person.
    pub person: &'a Person,
    /// Resolved block.
    pub block: &'a Block,
    /// Resolved template.
    pub template: &'a RotationTemplate,
}

/// An assignment with at least one unresolvable reference.
#[derive(Debug, Clone, Copy)]
pub struct Dangling<'a> {
    /// Raw assignment.
    pub assignment: &'a Assignment,
    /// Which reference failed.
    pub kind: &'static str,
    /// The missing id.
    pub id: &'a str,
}

/// A candidate assignment set resolved against a context.
///
/// Placements keep the order of the candidate slice; per-person and
/// per-block indexes iterate in id order.
#[derive(Debug)]
pub struct ScheduleView<'a> {
    context: &'a SchedulingContext,
    placements: Vec<Placement<'a>>,
    dangling: Vec<Dangling<'a>>,
    by_person: BTreeMap<&'a str, Vec<usize>>,
    by_block: BTreeMap<&'a str, Vec<usize>>,
}

impl<'a> ScheduleView<'a> {
    /// Resolves `assignments` against `context`.
    pub fn new(context: &'a SchedulingContext, assignments: &'a [Assignment]) -> Self {
        let people: HashMap<&str, &Person> =
            context.people.iter().map(|p| (p.id.as_str(), p)).collect();
        let blocks: HashMap<&str, &Block> =
            context.blocks.iter().map(|b| (b.id.as_str(), b)).collect();
        let templates: HashMap<&str, &RotationTemplate> =
            context.templates.iter().map(|t| (t.id.as_str(), t)).collect();

        let mut placements = Vec::with_capacity(assignments.len());
        let mut dangling = Vec::new();
        let mut by_person: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
        let mut by_block: BTreeMap<&str, Vec<usize>> = BTreeMap::new();

        for (index, a) in assignments.iter().enumerate() {
            let Some(&person) = people.get(a.person_id.as_str()) else {
                dangling.push(Dangling { assignment: a, kind: "person", id: &a.person_id });
                continue;
            };
            let Some(&block) = blocks.get(a.block_id.as_str()) else {
                dangling.push(Dangling { assignment: a, kind: "block", id: &a.block_id });
                continue;
            };
            let Some(&template) = templates.get(a.template_id.as_str()) else {
                dangling.push(Dangling { assignment: a, kind: "template", id: &a.template_id });
                continue;
            };

            let slot = placements.len();
            placements.push(Placement { index, assignment: a, person, block, template });
            by_person.entry(person.id.as_str()).or_default().push(slot);
            by_block.entry(block.id.as_str()).or_default().push(slot);
        }

        Self { context, placements, dangling, by_person, by_block }
    }

    /// The underlying context.
    pub fn context(&self) -> &'a SchedulingContext {
        self.context
    }

    /// All resolved placements, in candidate order.
    pub fn placements(&self) -> &[Placement<'a>] {
        &self.placements
    }

    /// Assignments that could not be resolved.
    pub fn dangling(&self) -> &[Dangling<'a>] {
        &self.dangling
    }

    /// Placements of one person.
    pub fn for_person(&self, person_id: &str) -> impl Iterator<Item = &Placement<'a>> + '_ {
        self.by_person
            .get(person_id)
            .into_iter()
            .flatten()
            .map(move |&i| &self.placements[i])
    }

    /// Placements in one block.
    pub fn for_block(&self, block_id: &str) -> impl Iterator<Item = &Placement<'a>> + '_ {
        self.by_block
            .get(block_id)
            .into_iter()
            .flatten()
            .map(move |&i| &self.placements[i])
    }

    /// Per-person placement groups in person-id order.
    pub fn by_person(&self) -> impl Iterator<Item = (&'a str, Vec<&Placement<'a>>)> + '_ {
        self.by_person
            .iter()
            .map(move |(&id, idx)| (id, idx.iter().map(|&i| &self.placements[i]).collect()))
    }

    /// Number of resolved placements.
    pub fn len(&self) -> usize {
        self.placements.len()
    }

    /// Whether there are no resolved placements.
    pub fn is_empty(&self) -> bool {
        self.placements.is_empty()
    }
}
