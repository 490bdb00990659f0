//! Soft objectives: coverage, workload equity, continuity, and call fairness.
//!
//! Penalties are non-negative; the scorer multiplies them by the live
//! weight. Coverage is the only reward term and carries no penalty.

use chrono::{NaiveDate, Weekday};

use super::{ConstraintCheck, Finding};
use crate::bridge::{Encoding, ModelBuilder, VarId};
use crate::catalog::ConstraintSet;
use crate::error::CheckError;
use crate::models::{Placement, ScheduleView, Session, TemplateKind};

/// Spread between the most- and least-loaded people in a group.
///
/// Returns `(max_id, max, min_id, min)`, or `None` for fewer than two
/// people. Ties resolve to the first person in roster order.
fn spread<'a>(counts: &[(&'a str, usize)]) -> Option<(&'a str, usize, &'a str, usize)> {
    if counts.len() < 2 {
        return None;
    }
    let mut hi = counts[0];
    let mut lo = counts[0];
    for &c in &counts[1..] {
        if c.1 > hi.1 {
            hi = c;
        }
        if c.1 < lo.1 {
            lo = c;
        }
    }
    Some((hi.0, hi.1, lo.0, lo.1))
}

fn spread_finding(what: &str, counts: &[(&str, usize)]) -> Option<Finding> {
    let (hi_id, hi, lo_id, lo) = spread(counts)?;
    (hi > lo).then(|| {
        Finding::new(format!(
            "{what} range {lo}..{hi} ({hi_id} has {hi}, {lo_id} has {lo})"
        ))
        .with_entity(hi_id)
        .with_entity(lo_id)
        .with_penalty((hi - lo) as f64)
    })
}

fn is_call(p: &Placement<'_>) -> bool {
    p.template.kind == TemplateKind::OvernightCall
}

// ======================== Coverage ========================

/// Rewards every worked (non-`Off`) assignment.
///
/// Reports uncovered weekday half-day blocks as zero-penalty findings.
#[derive(Debug, Clone, Copy, Default)]
pub struct CoverageRule;

impl ConstraintCheck for CoverageRule {
    fn check(&self, _set: &ConstraintSet, view: &ScheduleView<'_>) -> Result<Vec<Finding>, CheckError> {
        Ok(view
            .context()
            .blocks
            .iter()
            .filter(|b| b.session != Session::Night && !b.is_weekend())
            .filter(|b| view.for_block(&b.id).all(|p| p.template.kind == TemplateKind::Off))
            .map(|b| {
                Finding::new(format!("block {} ({}) has no coverage", b.id, b.date))
                    .with_entity(&b.id)
            })
            .collect())
    }

    fn coverage(&self, view: &ScheduleView<'_>) -> Option<f64> {
        Some(
            view.placements()
                .iter()
                .filter(|p| p.template.kind != TemplateKind::Off)
                .count() as f64,
        )
    }

    fn encode(&self, builder: &mut ModelBuilder<'_>) -> Encoding {
        let coefficients: Vec<(VarId, f64)> = builder
            .vars()
            .iter()
            .filter(|v| v.template.kind != TemplateKind::Off)
            .map(|v| (v.id, 1.0))
            .collect();
        builder.objective(coefficients);
        Encoding::Encoded
    }
}

// ======================== Equity ========================

/// Balances clinical load across residents.
#[derive(Debug, Clone, Copy, Default)]
pub struct EquityRule;

impl ConstraintCheck for EquityRule {
    fn check(&self, _set: &ConstraintSet, view: &ScheduleView<'_>) -> Result<Vec<Finding>, CheckError> {
        let counts: Vec<(&str, usize)> = view
            .context()
            .residents()
            .map(|r| {
                let n = view.for_person(&r.id).filter(|p| p.template.kind.is_clinical()).count();
                (r.id.as_str(), n)
            })
            .collect();
        Ok(spread_finding("clinical load", &counts).into_iter().collect())
    }
}

// ======================== Continuity ========================

/// Penalizes residents switching templates between consecutive day blocks.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContinuityRule;

impl ConstraintCheck for ContinuityRule {
    fn check(&self, _set: &ConstraintSet, view: &ScheduleView<'_>) -> Result<Vec<Finding>, CheckError> {
        let mut findings = Vec::new();
        for (person_id, mut placements) in view.by_person() {
            if !placements.first().is_some_and(|p| p.person.is_resident()) {
                continue;
            }
            placements.retain(|p| p.block.session != Session::Night);
            placements.sort_by_key(|p| (p.block.date, p.block.session, p.index));

            let switches = placements
                .windows(2)
                .filter(|w| w[0].template.id != w[1].template.id)
                .count();
            if switches > 0 {
                findings.push(
                    Finding::new(format!("{person_id} switches rotation {switches} times"))
                        .with_entity(person_id)
                        .with_penalty(switches as f64),
                );
            }
        }
        Ok(findings)
    }

    fn encode(&self, _builder: &mut ModelBuilder<'_>) -> Encoding {
        Encoding::ValidationOnly
    }
}

// ======================== Call ========================

/// Penalizes back-to-back overnight calls for one person.
///
/// Each pair of consecutive calls closer than `min_gap_days` costs
/// `min_gap_days - gap`.
#[derive(Debug, Clone, Copy)]
pub struct CallSpacingRule {
    /// Smallest gap that costs nothing.
    pub min_gap_days: i64,
}

impl Default for CallSpacingRule {
    fn default() -> Self {
        Self { min_gap_days: 3 }
    }
}

impl ConstraintCheck for CallSpacingRule {
    fn check(&self, _set: &ConstraintSet, view: &ScheduleView<'_>) -> Result<Vec<Finding>, CheckError> {
        let mut findings = Vec::new();
        for (person_id, placements) in view.by_person() {
            let mut dates: Vec<NaiveDate> =
                placements.iter().filter(|p| is_call(p)).map(|p| p.block.date).collect();
            dates.sort_unstable();

            for pair in dates.windows(2) {
                let gap = (pair[1] - pair[0]).num_days();
                if gap < self.min_gap_days {
                    findings.push(
                        Finding::new(format!(
                            "{person_id} has calls on {} and {} ({gap} days apart)",
                            pair[0], pair[1]
                        ))
                        .with_entity(person_id)
                        .with_penalty((self.min_gap_days - gap) as f64),
                    );
                }
            }
        }
        Ok(findings)
    }
}

/// Balances calls on a set of weekdays across faculty.
#[derive(Debug, Clone)]
pub struct CallDayEquity {
    label: &'static str,
    days: &'static [Weekday],
}

impl CallDayEquity {
    /// Sunday-night call equity.
    pub const SUNDAY: Self = Self {
        label: "Sunday call",
        days: &[Weekday::Sun],
    };

    /// Monday-through-Thursday call equity.
    pub const WEEKDAY: Self = Self {
        label: "weekday call",
        days: &[Weekday::Mon, Weekday::Tue, Weekday::Wed, Weekday::Thu],
    };
}

impl ConstraintCheck for CallDayEquity {
    fn check(&self, _set: &ConstraintSet, view: &ScheduleView<'_>) -> Result<Vec<Finding>, CheckError> {
        let counts: Vec<(&str, usize)> = view
            .context()
            .faculty()
            .map(|f| {
                let n = view
                    .for_person(&f.id)
                    .filter(|p| is_call(p) && self.days.contains(&p.block.weekday()))
                    .count();
                (f.id.as_str(), n)
            })
            .collect();
        Ok(spread_finding(self.label, &counts).into_iter().collect())
    }
}

/// Penalizes call on days a person asked to avoid.
#[derive(Debug, Clone, Copy, Default)]
pub struct CallPreferenceRule;

impl ConstraintCheck for CallPreferenceRule {
    fn check(&self, _set: &ConstraintSet, view: &ScheduleView<'_>) -> Result<Vec<Finding>, CheckError> {
        Ok(view
            .placements()
            .iter()
            .filter(|p| is_call(p) && p.person.avoids_call_on(p.block.weekday()))
            .map(|p| {
                Finding::new(format!(
                    "{} prefers no call on {} but is on call {}",
                    p.person.id,
                    p.block.weekday(),
                    p.block.date
                ))
                .with_entity(&p.person.id)
                .with_entity(&p.block.id)
                .with_penalty(1.0)
            })
            .collect())
    }

    fn encode(&self, builder: &mut ModelBuilder<'_>) -> Encoding {
        let coefficients: Vec<(VarId, f64)> = builder
            .vars()
            .iter()
            .filter(|v| {
                v.template.kind == TemplateKind::OvernightCall
                    && v.person.avoids_call_on(v.block.weekday())
            })
            .map(|v| (v.id, -1.0))
            .collect();
        builder.objective(coefficients);
        Encoding::Encoded
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ConstraintCatalog;
    use crate::models::{Assignment, Block, Person, RotationTemplate, SchedulingContext};

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 7, day).unwrap()
    }

    fn run(rule: &dyn ConstraintCheck, ctx: &SchedulingContext) -> Vec<Finding> {
        let set = ConstraintCatalog::new().resolve().unwrap();
        rule.check(&set, &ctx.view()).unwrap()
    }

    fn base() -> SchedulingContext {
        SchedulingContext::new()
            .with_person(Person::resident("R1", 1))
            .with_person(Person::resident("R2", 2))
            .with_person(Person::faculty("F1").with_avoid_call_day(Weekday::Wed))
            .with_person(Person::faculty("F2"))
            .with_template(RotationTemplate::new("CLINIC", TemplateKind::Clinic))
            .with_template(RotationTemplate::new("INPT", TemplateKind::Inpatient))
            .with_template(RotationTemplate::new("OFF", TemplateKind::Off))
            .with_template(RotationTemplate::new("CALL", TemplateKind::OvernightCall))
    }

    #[test]
    fn test_coverage_counts_worked_assignments() {
        let ctx = base()
            .with_block(Block::am("B1", d(1)))
            .with_block(Block::pm("B2", d(1)))
            .with_assignment(Assignment::new("R1", "B1", "CLINIC"))
            .with_assignment(Assignment::new("R2", "B2", "OFF"));
        let view = ctx.view();
        assert_eq!(CoverageRule.coverage(&view), Some(1.0));

        let findings = run(&CoverageRule, &ctx);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].penalty, 0.0);
        assert_eq!(findings[0].affected_entities, vec!["B2".to_string()]);
    }

    #[test]
    fn test_equity_spread() {
        let ctx = base()
            .with_block(Block::am("B1", d(1)))
            .with_block(Block::pm("B2", d(1)))
            .with_assignment(Assignment::new("R1", "B1", "CLINIC"))
            .with_assignment(Assignment::new("R1", "B2", "CLINIC"));
        let findings = run(&EquityRule, &ctx);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].penalty, 2.0);

        let balanced = ctx
            .clone()
            .with_assignments(vec![
                Assignment::new("R1", "B1", "CLINIC"),
                Assignment::new("R2", "B2", "CLINIC"),
            ]);
        assert!(run(&EquityRule, &balanced).is_empty());
    }

    #[test]
    fn test_continuity_switches() {
        let ctx = base()
            .with_block(Block::am("B1", d(1)))
            .with_block(Block::pm("B2", d(1)))
            .with_block(Block::am("B3", d(2)))
            .with_assignment(Assignment::new("R1", "B3", "CLINIC"))
            .with_assignment(Assignment::new("R1", "B1", "CLINIC"))
            .with_assignment(Assignment::new("R1", "B2", "INPT"));
        let findings = run(&ContinuityRule, &ctx);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].penalty, 2.0);
    }

    #[test]
    fn test_call_spacing() {
        let ctx = base()
            .with_block(Block::night("N1", d(1)))
            .with_block(Block::night("N2", d(2)))
            .with_block(Block::night("N5", d(5)))
            .with_assignment(Assignment::new("F1", "N1", "CALL"))
            .with_assignment(Assignment::new("F1", "N2", "CALL"))
            .with_assignment(Assignment::new("F1", "N5", "CALL"));
        let findings = run(&CallSpacingRule::default(), &ctx);
        // 1-day gap costs 2; 3-day gap is free
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].penalty, 2.0);
    }

    #[test]
    fn test_sunday_and_weekday_equity() {
        // 2025-07-06 is a Sunday, 07-07 a Monday
        let ctx = base()
            .with_block(Block::night("N6", d(6)))
            .with_block(Block::night("N7", d(7)))
            .with_assignment(Assignment::new("F1", "N6", "CALL"))
            .with_assignment(Assignment::new("F2", "N7", "CALL"));
        let sunday = run(&CallDayEquity::SUNDAY, &ctx);
        assert_eq!(sunday.len(), 1);
        assert_eq!(sunday[0].affected_entities[0], "F1");

        let weekday = run(&CallDayEquity::WEEKDAY, &ctx);
        assert_eq!(weekday.len(), 1);
        assert_eq!(weekday[0].affected_entities[0], "F2");
    }

    #[test]
    fn test_call_preference() {
        // 2025-07-02 is a Wednesday
        let ctx = base()
            .with_block(Block::night("N2", d(2)))
            .with_assignment(Assignment::new("F1", "N2", "CALL"));
        let findings = run(&CallPreferenceRule, &ctx);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].penalty, 1.0);

        let other = ctx.with_assignments(vec![Assignment::new("F2", "N2", "CALL")]);
        assert!(run(&CallPreferenceRule, &other).is_empty());
    }

    #[test]
    fn test_spread_needs_two_people() {
        assert!(spread(&[("A", 3)]).is_none());
        assert_eq!(spread(&[("A", 3), ("B", 1)]), Some(("A", 3, "B", 1)));
    }
}
