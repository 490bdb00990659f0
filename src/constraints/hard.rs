//! Hard rules.
//!
//! Each rule's `check` and `encode` describe the same predicate: a
//! solution that satisfies every emitted row passes the check. Rules that
//! cannot be written as linear rows keep the default `Unsupported`
//! encoding and are verified after solving.
//!
//! # Reference
//! ACGME Common Program Requirements (Residency), Section VI.F
//! (clinical and educational work hours) and VI.A.2 (supervision).

use std::collections::{BTreeMap, BTreeSet};

use chrono::Duration;

use super::{ConstraintCheck, Finding};
use crate::bridge::{Encoding, ModelBuilder, Sense, VarId};
use crate::catalog::ConstraintSet;
use crate::error::CheckError;
use crate::models::{complete_windows, rolling_windows, ScheduleView, Session, TemplateKind};

// ======================== Temporal / capacity ========================

/// No one works while absent.
///
/// Also the rule that refuses assignments with unresolvable references,
/// since availability cannot be verified for unknown people or blocks.
#[derive(Debug, Clone, Copy, Default)]
pub struct Availability;

impl ConstraintCheck for Availability {
    fn check(&self, _set: &ConstraintSet, view: &ScheduleView<'_>) -> Result<Vec<Finding>, CheckError> {
        if let Some(d) = view.dangling().first() {
            return Err(CheckError::UnknownReference {
                kind: d.kind,
                id: d.id.to_string(),
            });
        }

        Ok(view
            .placements()
            .iter()
            .filter(|p| !p.person.is_available_on(p.block.date))
            .map(|p| {
                Finding::new(format!(
                    "{} is absent on {} but assigned to {} ({})",
                    p.person.id, p.block.date, p.template.id, p.block.id
                ))
                .with_entity(&p.person.id)
                .with_entity(&p.block.id)
            })
            .collect())
    }

    fn encode(&self, builder: &mut ModelBuilder<'_>) -> Encoding {
        let absent: Vec<VarId> = builder
            .vars()
            .iter()
            .filter(|v| !v.person.is_available_on(v.block.date))
            .map(|v| v.id)
            .collect();
        for v in absent {
            builder.forbid(v);
        }
        Encoding::Encoded
    }
}

/// A person holds at most one assignment per block.
#[derive(Debug, Clone, Copy, Default)]
pub struct OnePersonPerBlock;

impl ConstraintCheck for OnePersonPerBlock {
    fn check(&self, _set: &ConstraintSet, view: &ScheduleView<'_>) -> Result<Vec<Finding>, CheckError> {
        let mut findings = Vec::new();
        for (person_id, placements) in view.by_person() {
            let mut per_block: BTreeMap<&str, usize> = BTreeMap::new();
            for p in &placements {
                *per_block.entry(p.block.id.as_str()).or_insert(0) += 1;
            }
            for (block_id, count) in per_block.into_iter().filter(|(_, c)| *c > 1) {
                findings.push(
                    Finding::new(format!("{person_id} has {count} assignments in block {block_id}"))
                        .with_entity(person_id)
                        .with_entity(block_id),
                );
            }
        }
        Ok(findings)
    }

    fn encode(&self, builder: &mut ModelBuilder<'_>) -> Encoding {
        let mut rows: Vec<Vec<(VarId, i64)>> = Vec::new();
        for person in &builder.context().people {
            let mut per_block: BTreeMap<&str, Vec<(VarId, i64)>> = BTreeMap::new();
            for &v in builder.vars_of_person(&person.id) {
                per_block
                    .entry(builder.var(v).block.id.as_str())
                    .or_default()
                    .push((v, 1));
            }
            rows.extend(per_block.into_values().filter(|t| t.len() > 1));
        }
        for terms in rows {
            builder.require(terms, Sense::Le, 1);
        }
        Encoding::Encoded
    }
}

/// Residents per block on a template stay within the template's capacity.
#[derive(Debug, Clone, Copy, Default)]
pub struct RotationCapacity;

impl ConstraintCheck for RotationCapacity {
    fn check(&self, _set: &ConstraintSet, view: &ScheduleView<'_>) -> Result<Vec<Finding>, CheckError> {
        let ctx = view.context();
        let mut findings = Vec::new();
        for block in &ctx.blocks {
            for template in &ctx.templates {
                let Some(max) = template.max_residents else {
                    continue;
                };
                let count = view
                    .for_block(&block.id)
                    .filter(|p| p.template.id == template.id && p.person.is_resident())
                    .count();
                if count > max as usize {
                    findings.push(
                        Finding::new(format!(
                            "{} has {count} residents in block {} (capacity {max})",
                            template.id, block.id
                        ))
                        .with_entity(&block.id),
                    );
                }
            }
        }
        Ok(findings)
    }

    fn encode(&self, builder: &mut ModelBuilder<'_>) -> Encoding {
        let ctx = builder.context();
        let mut rows = Vec::new();
        for block in &ctx.blocks {
            for template in &ctx.templates {
                let Some(max) = template.max_residents else {
                    continue;
                };
                let terms: Vec<(VarId, i64)> = builder
                    .vars_in_block(&block.id)
                    .iter()
                    .map(|&v| builder.var(v))
                    .filter(|v| v.template.id == template.id && v.person.is_resident())
                    .map(|v| (v.id, 1))
                    .collect();
                if terms.len() > max as usize {
                    rows.push((terms, i64::from(max)));
                }
            }
        }
        for (terms, max) in rows {
            builder.require(terms, Sense::Le, max);
        }
        Encoding::Encoded
    }
}

// ======================== Regulatory ========================

/// Residents average at most `max_weekly_hours` over every rolling window.
#[derive(Debug, Clone, Copy)]
pub struct EightyHourRule {
    /// Weekly ceiling.
    pub max_weekly_hours: u32,
    /// Averaging window.
    pub window_days: i64,
}

impl Default for EightyHourRule {
    fn default() -> Self {
        Self {
            max_weekly_hours: 80,
            window_days: 28,
        }
    }
}

impl EightyHourRule {
    fn limit(&self) -> i64 {
        i64::from(self.max_weekly_hours) * self.window_days / 7
    }
}

impl ConstraintCheck for EightyHourRule {
    fn check(&self, _set: &ConstraintSet, view: &ScheduleView<'_>) -> Result<Vec<Finding>, CheckError> {
        let windows = rolling_windows(&view.context().blocks, self.window_days);
        let weeks = self.window_days as f64 / 7.0;
        let mut findings = Vec::new();

        for (person_id, placements) in view.by_person() {
            if !placements.first().is_some_and(|p| p.person.is_resident()) {
                continue;
            }
            for w in &windows {
                let hours: i64 = placements
                    .iter()
                    .filter(|p| w.contains(p.block.date))
                    .map(|p| i64::from(p.template.hours))
                    .sum();
                if hours > self.limit() {
                    findings.push(
                        Finding::new(format!(
                            "{person_id} averages {:.1} h/week from {} to {}",
                            hours as f64 / weeks,
                            w.start,
                            w.end
                        ))
                        .with_entity(person_id),
                    );
                }
            }
        }
        Ok(findings)
    }

    fn encode(&self, builder: &mut ModelBuilder<'_>) -> Encoding {
        let ctx = builder.context();
        let windows = rolling_windows(&ctx.blocks, self.window_days);
        let limit = self.limit();
        let mut rows = Vec::new();

        for person in ctx.residents() {
            for w in &windows {
                let terms: Vec<(VarId, i64)> = builder
                    .vars_of_person(&person.id)
                    .iter()
                    .map(|&v| builder.var(v))
                    .filter(|v| w.contains(v.block.date) && v.template.hours > 0)
                    .map(|v| (v.id, i64::from(v.template.hours)))
                    .collect();
                if terms.iter().map(|(_, h)| h).sum::<i64>() > limit {
                    rows.push(terms);
                }
            }
        }
        for terms in rows {
            builder.require(terms, Sense::Le, limit);
        }
        Encoding::Encoded
    }
}

/// Residents get at least one duty-free day in every complete 7-day window.
///
/// Requires day-off indicator variables, so it is verified after solving.
#[derive(Debug, Clone, Copy, Default)]
pub struct OneInSevenRule;

impl ConstraintCheck for OneInSevenRule {
    fn check(&self, _set: &ConstraintSet, view: &ScheduleView<'_>) -> Result<Vec<Finding>, CheckError> {
        let windows = complete_windows(&view.context().blocks, 7);
        if windows.is_empty() {
            return Ok(Vec::new());
        }

        let mut findings = Vec::new();
        for (person_id, placements) in view.by_person() {
            if !placements.first().is_some_and(|p| p.person.is_resident()) {
                continue;
            }
            let duty_days: BTreeSet<_> = placements
                .iter()
                .filter(|p| p.template.kind.is_duty())
                .map(|p| p.block.date)
                .collect();
            for w in &windows {
                let worked = duty_days.range(w.start..w.end).count() as i64;
                if worked >= w.len_days() {
                    findings.push(
                        Finding::new(format!(
                            "{person_id} has no day off between {} and {}",
                            w.start,
                            w.end - Duration::days(1)
                        ))
                        .with_entity(person_id),
                    );
                }
            }
        }
        Ok(findings)
    }
}

/// Faculty supervision per block: `4·faculty ≥ 2·interns + other residents`.
///
/// Interns need one supervisor per two, senior residents one per four.
/// Only templates that require supervision are counted, on both sides.
#[derive(Debug, Clone, Copy, Default)]
pub struct SupervisionRatio;

impl ConstraintCheck for SupervisionRatio {
    fn check(&self, _set: &ConstraintSet, view: &ScheduleView<'_>) -> Result<Vec<Finding>, CheckError> {
        let mut findings = Vec::new();
        for block in &view.context().blocks {
            let (mut interns, mut seniors, mut faculty) = (0i64, 0i64, 0i64);
            for p in view.for_block(&block.id).filter(|p| p.template.requires_supervision) {
                if p.person.is_faculty() {
                    faculty += 1;
                } else if p.person.is_intern() {
                    interns += 1;
                } else {
                    seniors += 1;
                }
            }
            let demand = 2 * interns + seniors;
            if 4 * faculty < demand {
                let needed = (demand + 3) / 4;
                findings.push(
                    Finding::new(format!(
                        "block {}: {interns} interns and {seniors} residents need {needed} faculty, found {faculty}",
                        block.id
                    ))
                    .with_entity(&block.id),
                );
            }
        }
        Ok(findings)
    }

    fn encode(&self, builder: &mut ModelBuilder<'_>) -> Encoding {
        let mut rows = Vec::new();
        for block in &builder.context().blocks {
            let terms: Vec<(VarId, i64)> = builder
                .vars_in_block(&block.id)
                .iter()
                .map(|&v| builder.var(v))
                .filter(|v| v.template.requires_supervision)
                .map(|v| {
                    let coef = if v.person.is_faculty() {
                        4
                    } else if v.person.is_intern() {
                        -2
                    } else {
                        -1
                    };
                    (v.id, coef)
                })
                .collect();
            if terms.iter().any(|(_, c)| *c < 0) {
                rows.push(terms);
            }
        }
        for terms in rows {
            builder.require(terms, Sense::Ge, 0);
        }
        Encoding::Encoded
    }
}

// ======================== Role ========================

/// People only work templates their role and PGY level admit.
#[derive(Debug, Clone, Copy, Default)]
pub struct RoleRestriction;

impl ConstraintCheck for RoleRestriction {
    fn check(&self, _set: &ConstraintSet, view: &ScheduleView<'_>) -> Result<Vec<Finding>, CheckError> {
        Ok(view
            .placements()
            .iter()
            .filter(|p| !p.template.admits(p.person))
            .map(|p| {
                Finding::new(format!(
                    "{} ({:?}) is not eligible for {} in block {}",
                    p.person.id, p.person.role, p.template.id, p.block.id
                ))
                .with_entity(&p.person.id)
                .with_entity(&p.block.id)
            })
            .collect())
    }

    fn encode(&self, builder: &mut ModelBuilder<'_>) -> Encoding {
        let barred: Vec<VarId> = builder
            .vars()
            .iter()
            .filter(|v| !v.template.admits(v.person))
            .map(|v| v.id)
            .collect();
        for v in barred {
            builder.forbid(v);
        }
        Encoding::Encoded
    }
}

// ======================== Call ========================

/// Exactly one faculty member on overnight call each Sunday–Thursday night.
#[derive(Debug, Clone, Copy, Default)]
pub struct OvernightCallGeneration;

impl ConstraintCheck for OvernightCallGeneration {
    fn check(&self, _set: &ConstraintSet, view: &ScheduleView<'_>) -> Result<Vec<Finding>, CheckError> {
        let mut findings = Vec::new();
        for block in view.context().blocks.iter().filter(|b| b.requires_overnight_call()) {
            let on_call: Vec<&str> = view
                .for_block(&block.id)
                .filter(|p| p.template.kind == TemplateKind::OvernightCall && p.person.is_faculty())
                .map(|p| p.person.id.as_str())
                .collect();
            if on_call.len() != 1 {
                let mut f = Finding::new(format!(
                    "night {} ({}) has {} faculty on call, expected 1",
                    block.id,
                    block.date,
                    on_call.len()
                ))
                .with_entity(&block.id);
                for id in on_call {
                    f = f.with_entity(id);
                }
                findings.push(f);
            }
        }
        Ok(findings)
    }

    fn encode(&self, builder: &mut ModelBuilder<'_>) -> Encoding {
        let mut rows = Vec::new();
        for block in builder.context().blocks.iter().filter(|b| b.requires_overnight_call()) {
            let terms: Vec<(VarId, i64)> = builder
                .vars_in_block(&block.id)
                .iter()
                .map(|&v| builder.var(v))
                .filter(|v| v.template.kind == TemplateKind::OvernightCall && v.person.is_faculty())
                .map(|v| (v.id, 1))
                .collect();
            rows.push(terms);
        }
        for terms in rows {
            builder.require(terms, Sense::Eq, 1);
        }
        Encoding::Encoded
    }
}

/// No clinical work the day after overnight call.
#[derive(Debug, Clone, Copy, Default)]
pub struct PostCallAutoAssignment;

impl ConstraintCheck for PostCallAutoAssignment {
    fn check(&self, _set: &ConstraintSet, view: &ScheduleView<'_>) -> Result<Vec<Finding>, CheckError> {
        let mut findings = Vec::new();
        for call in view
            .placements()
            .iter()
            .filter(|p| p.template.kind == TemplateKind::OvernightCall)
        {
            let next_day = call.block.date + Duration::days(1);
            for p in view.for_person(&call.person.id).filter(|p| {
                p.block.date == next_day
                    && p.block.session != Session::Night
                    && p.template.kind.is_clinical()
            }) {
                findings.push(
                    Finding::new(format!(
                        "{} is post-call on {} but assigned to {} ({})",
                        call.person.id, next_day, p.template.id, p.block.id
                    ))
                    .with_entity(&call.person.id)
                    .with_entity(&p.block.id),
                );
            }
        }
        Ok(findings)
    }

    fn encode(&self, builder: &mut ModelBuilder<'_>) -> Encoding {
        let mut rows = Vec::new();
        for call in builder
            .vars()
            .iter()
            .filter(|v| v.template.kind == TemplateKind::OvernightCall)
        {
            let next_day = call.block.date + Duration::days(1);
            for &v in builder.vars_of_person(&call.person.id) {
                let info = builder.var(v);
                if info.block.date == next_day
                    && info.block.session != Session::Night
                    && info.template.kind.is_clinical()
                {
                    rows.push(vec![(call.id, 1), (v, 1)]);
                }
            }
        }
        for terms in rows {
            builder.require(terms, Sense::Le, 1);
        }
        Encoding::Encoded
    }
}

// ======================== Specialty (FMIT) ========================

/// Exactly one faculty member staffs FMIT in every FMIT-eligible block.
#[derive(Debug, Clone, Copy, Default)]
pub struct FmitStaffing;

impl ConstraintCheck for FmitStaffing {
    fn check(&self, _set: &ConstraintSet, view: &ScheduleView<'_>) -> Result<Vec<Finding>, CheckError> {
        let mut findings = Vec::new();
        for block in view.context().blocks.iter().filter(|b| b.fmit_eligible) {
            let staffed = view
                .for_block(&block.id)
                .filter(|p| p.template.kind == TemplateKind::Fmit && p.person.is_faculty())
                .count();
            if staffed != 1 {
                findings.push(
                    Finding::new(format!(
                        "FMIT block {} has {staffed} faculty, expected 1",
                        block.id
                    ))
                    .with_entity(&block.id),
                );
            }
        }
        Ok(findings)
    }

    fn encode(&self, builder: &mut ModelBuilder<'_>) -> Encoding {
        let mut rows = Vec::new();
        for block in builder.context().blocks.iter().filter(|b| b.fmit_eligible) {
            let terms: Vec<(VarId, i64)> = builder
                .vars_in_block(&block.id)
                .iter()
                .map(|&v| builder.var(v))
                .filter(|v| v.template.kind == TemplateKind::Fmit && v.person.is_faculty())
                .map(|v| (v.id, 1))
                .collect();
            rows.push(terms);
        }
        for terms in rows {
            builder.require(terms, Sense::Eq, 1);
        }
        Encoding::Encoded
    }
}

/// A person on FMIT during a week holds no clinic that week.
#[derive(Debug, Clone, Copy, Default)]
pub struct FmitWeekBlocking;

impl ConstraintCheck for FmitWeekBlocking {
    fn check(&self, _set: &ConstraintSet, view: &ScheduleView<'_>) -> Result<Vec<Finding>, CheckError> {
        let mut findings = Vec::new();
        for (person_id, placements) in view.by_person() {
            let fmit_weeks: BTreeSet<(i32, u32)> = placements
                .iter()
                .filter(|p| p.template.kind == TemplateKind::Fmit)
                .map(|p| p.block.iso_week())
                .collect();
            if fmit_weeks.is_empty() {
                continue;
            }
            for p in placements.iter().filter(|p| {
                p.template.kind == TemplateKind::Clinic && fmit_weeks.contains(&p.block.iso_week())
            }) {
                findings.push(
                    Finding::new(format!(
                        "{person_id} is on FMIT in week {:?} but has clinic in block {}",
                        p.block.iso_week(),
                        p.block.id
                    ))
                    .with_entity(person_id)
                    .with_entity(&p.block.id),
                );
            }
        }
        Ok(findings)
    }

    fn encode(&self, builder: &mut ModelBuilder<'_>) -> Encoding {
        let mut rows = Vec::new();
        for person in &builder.context().people {
            let mut weeks: BTreeMap<(i32, u32), (Vec<VarId>, Vec<VarId>)> = BTreeMap::new();
            for &v in builder.vars_of_person(&person.id) {
                let info = builder.var(v);
                let slot = weeks.entry(info.block.iso_week()).or_default();
                match info.template.kind {
                    TemplateKind::Fmit => slot.0.push(v),
                    TemplateKind::Clinic => slot.1.push(v),
                    _ => {}
                }
            }
            for (fmit, clinic) in weeks.into_values() {
                for &f in &fmit {
                    for &c in &clinic {
                        rows.push(vec![(f, 1), (c, 1)]);
                    }
                }
            }
        }
        for terms in rows {
            builder.require(terms, Sense::Le, 1);
        }
        Encoding::Encoded
    }
}
