//! Resilience objectives.
//!
//! These protect the program's capacity to absorb disruption. Their
//! weights are driven by the adaptive controller rather than fixed:
//! they sit at modest values under normal operation and climb as the
//! defense level escalates.
//!
//! # Reference
//! Queueing-theory utilization ceiling (Kingman): wait times grow
//! sharply above ~80% load. N-1 contingency as used in power-grid
//! reliability planning.

use super::{ConstraintCheck, Finding};
use crate::bridge::{Encoding, ModelBuilder, VarId};
use crate::catalog::ConstraintSet;
use crate::error::CheckError;
use crate::models::{Placement, ScheduleView, Session};

/// Keeps high-centrality faculty off routine duty.
///
/// Vacuously satisfied when the context carries no resilience snapshot.
#[derive(Debug, Clone, Copy)]
pub struct HubProtectionRule {
    /// Hub score at which a person counts as a hub.
    pub threshold: f64,
}

impl Default for HubProtectionRule {
    fn default() -> Self {
        Self { threshold: 0.5 }
    }
}

impl ConstraintCheck for HubProtectionRule {
    fn check(&self, _set: &ConstraintSet, view: &ScheduleView<'_>) -> Result<Vec<Finding>, CheckError> {
        let Some(snapshot) = view.context().resilience.as_ref() else {
            return Ok(Vec::new());
        };

        let mut findings = Vec::new();
        for (person_id, placements) in view.by_person() {
            let score = snapshot.hub_score(person_id);
            if score <= self.threshold {
                continue;
            }
            let duty = placements.iter().filter(|p| p.template.kind.is_duty()).count();
            if duty > 0 {
                findings.push(
                    Finding::new(format!(
                        "hub {person_id} (score {score:.2}) holds {duty} duty assignments"
                    ))
                    .with_entity(person_id)
                    .with_penalty(score * duty as f64),
                );
            }
        }
        Ok(findings)
    }

    fn encode(&self, builder: &mut ModelBuilder<'_>) -> Encoding {
        let Some(snapshot) = builder.context().resilience.as_ref() else {
            return Encoding::Encoded;
        };
        let coefficients: Vec<(VarId, f64)> = builder
            .vars()
            .iter()
            .filter(|v| v.template.kind.is_duty())
            .filter_map(|v| {
                let score = snapshot.hub_score(&v.person.id);
                (score > self.threshold).then_some((v.id, -score))
            })
            .collect();
        builder.objective(coefficients);
        Encoding::Encoded
    }
}

/// Keeps each person's scheduled load under the utilization ceiling.
///
/// Utilization is worked half-day blocks over available half-day blocks,
/// or the snapshot's observed utilization when that is higher. Each person
/// above `ceiling` costs the overshoot.
#[derive(Debug, Clone, Copy)]
pub struct UtilizationBufferRule {
    /// Highest utilization that costs nothing.
    pub ceiling: f64,
}

impl Default for UtilizationBufferRule {
    fn default() -> Self {
        Self { ceiling: 0.8 }
    }
}

impl ConstraintCheck for UtilizationBufferRule {
    fn check(&self, _set: &ConstraintSet, view: &ScheduleView<'_>) -> Result<Vec<Finding>, CheckError> {
        let ctx = view.context();
        let mut findings = Vec::new();

        for person in &ctx.people {
            let available = ctx
                .blocks
                .iter()
                .filter(|b| b.session != Session::Night && person.is_available_on(b.date))
                .count();
            let scheduled = (available > 0).then(|| {
                let worked = view
                    .for_person(&person.id)
                    .filter(|p| p.block.session != Session::Night && p.template.kind.is_clinical())
                    .count();
                worked as f64 / available as f64
            });
            let observed = ctx
                .resilience
                .as_ref()
                .and_then(|r| r.observed_utilization(&person.id));
            let Some(utilization) = scheduled.into_iter().chain(observed).reduce(f64::max) else {
                continue;
            };
            if utilization > self.ceiling {
                findings.push(
                    Finding::new(format!(
                        "{} is at {:.0}% utilization (ceiling {:.0}%)",
                        person.id,
                        utilization * 100.0,
                        self.ceiling * 100.0
                    ))
                    .with_entity(&person.id)
                    .with_penalty(utilization - self.ceiling),
                );
            }
        }
        Ok(findings)
    }
}

/// Flags blocks whose supervision would collapse if one faculty member
/// became unavailable.
#[derive(Debug, Clone, Copy, Default)]
pub struct N1VulnerabilityRule;

impl ConstraintCheck for N1VulnerabilityRule {
    fn check(&self, _set: &ConstraintSet, view: &ScheduleView<'_>) -> Result<Vec<Finding>, CheckError> {
        let mut findings = Vec::new();
        for block in &view.context().blocks {
            let (faculty, residents): (Vec<&Placement<'_>>, Vec<&Placement<'_>>) = view
                .for_block(&block.id)
                .filter(|p| p.template.requires_supervision)
                .partition(|p| p.person.is_faculty());
            if faculty.len() == 1 && !residents.is_empty() {
                let sole = &faculty[0].person.id;
                findings.push(
                    Finding::new(format!(
                        "block {}: {sole} is the only supervisor for {} residents",
                        block.id,
                        residents.len()
                    ))
                    .with_entity(&block.id)
                    .with_entity(sole)
                    .with_penalty(1.0),
                );
            }
        }
        Ok(findings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ConstraintCatalog;
    use crate::models::{
        Assignment, Block, DefenseLevel, Person, ResilienceSnapshot, RotationTemplate,
        SchedulingContext, TemplateKind,
    };
    use chrono::NaiveDate;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 7, day).unwrap()
    }

    fn run(rule: &dyn ConstraintCheck, ctx: &SchedulingContext) -> Vec<Finding> {
        let set = ConstraintCatalog::new().resolve().unwrap();
        rule.check(&set, &ctx.view()).unwrap()
    }

    fn base() -> SchedulingContext {
        SchedulingContext::new()
            .with_person(Person::resident("R1", 2))
            .with_person(Person::faculty("F1"))
            .with_block(Block::am("B1", d(1)))
            .with_block(Block::pm("B2", d(1)))
            .with_template(RotationTemplate::new("CLINIC", TemplateKind::Clinic).supervised())
    }

    #[test]
    fn test_hub_protection_vacuous_without_snapshot() {
        let ctx = base().with_assignment(Assignment::new("F1", "B1", "CLINIC"));
        assert!(run(&HubProtectionRule::default(), &ctx).is_empty());
    }

    #[test]
    fn test_hub_protection_penalizes_hubs() {
        let ctx = base()
            .with_assignment(Assignment::new("F1", "B1", "CLINIC"))
            .with_assignment(Assignment::new("F1", "B2", "CLINIC"))
            .with_resilience(ResilienceSnapshot::at_level(DefenseLevel::Orange).with_hub_score("F1", 0.9));
        let findings = run(&HubProtectionRule::default(), &ctx);
        assert_eq!(findings.len(), 1);
        assert!((findings[0].penalty - 1.8).abs() < 1e-9);
    }

    #[test]
    fn test_utilization_buffer() {
        let ctx = base()
            .with_assignment(Assignment::new("R1", "B1", "CLINIC"))
            .with_assignment(Assignment::new("R1", "B2", "CLINIC"));
        let findings = run(&UtilizationBufferRule::default(), &ctx);
        assert_eq!(findings.len(), 1);
        assert!((findings[0].penalty - 0.2).abs() < 1e-9);

        let half = base().with_assignment(Assignment::new("R1", "B1", "CLINIC"));
        assert!(run(&UtilizationBufferRule::default(), &half).is_empty());
    }

    #[test]
    fn test_utilization_buffer_uses_observed_load() {
        // Half scheduled, but 90% observed
        let ctx = base()
            .with_assignment(Assignment::new("R1", "B1", "CLINIC"))
            .with_resilience(ResilienceSnapshot::default().with_utilization("R1", 0.9));
        let findings = run(&UtilizationBufferRule::default(), &ctx);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].affected_entities, vec!["R1".to_string()]);
        assert!((findings[0].penalty - 0.1).abs() < 1e-9);

        // A lower observation never hides scheduled overload
        let busy = base()
            .with_assignment(Assignment::new("R1", "B1", "CLINIC"))
            .with_assignment(Assignment::new("R1", "B2", "CLINIC"))
            .with_resilience(ResilienceSnapshot::default().with_utilization("R1", 0.1));
        let findings = run(&UtilizationBufferRule::default(), &busy);
        assert!((findings[0].penalty - 0.2).abs() < 1e-9);
    }

    #[test]
    fn test_n1_vulnerability() {
        let ctx = base()
            .with_assignment(Assignment::new("R1", "B1", "CLINIC"))
            .with_assignment(Assignment::new("F1", "B1", "CLINIC"));
        let findings = run(&N1VulnerabilityRule, &ctx);
        assert_eq!(findings.len(), 1);
        assert!(findings[0].affected_entities.contains(&"F1".to_string()));
    }
}
