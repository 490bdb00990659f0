//! Scheduling context: the read-only snapshot every evaluation borrows.

use serde::{Deserialize, Serialize};

use super::{Assignment, Block, Person, ResilienceSnapshot, RotationTemplate, ScheduleView};

/// Everything an evaluation needs about one scheduling run.
///
/// Constructed by the caller per run or per validation request and never
/// mutated by the engine. Shared by reference across validation workers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SchedulingContext {
    /// Residents and faculty, in roster order.
    #[serde(default)]
    pub people: Vec<Person>,
    /// Schedulable blocks, in calendar order.
    #[serde(default)]
    pub blocks: Vec<Block>,
    /// Rotation templates.
    #[serde(default)]
    pub templates: Vec<RotationTemplate>,
    /// Current or candidate assignments.
    #[serde(default)]
    pub assignments: Vec<Assignment>,
    /// Resilience data for resilience-category constraints.
    #[serde(default)]
    pub resilience: Option<ResilienceSnapshot>,
}

impl SchedulingContext {
    /// Creates an empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a person.
    pub fn with_person(mut self, person: Person) -> Self {
        self.people.push(person);
        self
    }

    /// Adds a block.
    pub fn with_block(mut self, block: Block) -> Self {
        self.blocks.push(block);
        self
    }

    /// Adds a template.
    pub fn with_template(mut self, template: RotationTemplate) -> Self {
        self.templates.push(template);
        self
    }

    /// Adds an assignment.
    pub fn with_assignment(mut self, assignment: Assignment) -> Self {
        self.assignments.push(assignment);
        self
    }

    /// Replaces the assignment set.
    pub fn with_assignments(mut self, assignments: Vec<Assignment>) -> Self {
        self.assignments = assignments;
        self
    }

    /// Sets the resilience snapshot.
    pub fn with_resilience(mut self, snapshot: ResilienceSnapshot) -> Self {
        self.resilience = Some(snapshot);
        self
    }

    /// Finds a person by id.
    pub fn person(&self, id: &str) -> Option<&Person> {
        self.people.iter().find(|p| p.id == id)
    }

    /// Finds a block by id.
    pub fn block(&self, id: &str) -> Option<&Block> {
        self.blocks.iter().find(|b| b.id == id)
    }

    /// Finds a template by id.
    pub fn template(&self, id: &str) -> Option<&RotationTemplate> {
        self.templates.iter().find(|t| t.id == id)
    }

    /// Residents, in roster order.
    pub fn residents(&self) -> impl Iterator<Item = &Person> {
        self.people.iter().filter(|p| p.is_resident())
    }

    /// Faculty, in roster order.
    pub fn faculty(&self) -> impl Iterator<Item = &Person> {
        self.people.iter().filter(|p| p.is_faculty())
    }

    /// View over the context's own assignments.
    pub fn view(&self) -> ScheduleView<'_> {
        ScheduleView::new(self, &self.assignments)
    }

    /// View over a candidate assignment set sharing this context.
    pub fn view_of<'a>(&'a self, assignments: &'a [Assignment]) -> ScheduleView<'a> {
        ScheduleView::new(self, assignments)
    }
}
