//! End-to-end properties of the roster engine.

use std::sync::Arc;

use chrono::NaiveDate;
use proptest::prelude::*;

use u_roster::adaptive::{AdaptiveWeightController, ResilienceSignal};
use u_roster::bridge::{BridgeOutcome, CancelToken, GreedySolver, SolverBridge};
use u_roster::catalog::ConstraintCatalog;
use u_roster::constraints::library::{ids, standard_catalog};
use u_roster::constraints::{Priority, Severity};
use u_roster::error::CatalogError;
use u_roster::evaluation::ValidationEngine;
use u_roster::models::{
    Assignment, Block, DefenseLevel, Person, Role, RotationTemplate, SchedulingContext, TemplateKind,
};

// ============================================================================
// Fixtures
// ============================================================================

fn d(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 7, day).unwrap()
}

/// Three residents, one faculty, four weekday half-days, one template.
fn clinic_context() -> SchedulingContext {
    SchedulingContext::new()
        .with_person(Person::resident("R1", 1))
        .with_person(Person::resident("R2", 2))
        .with_person(Person::resident("R3", 3).with_absence(d(2), d(3)))
        .with_person(Person::faculty("F1"))
        .with_block(Block::am("B1", d(1)))
        .with_block(Block::pm("B2", d(1)))
        .with_block(Block::am("B3", d(2)))
        .with_block(Block::pm("B4", d(2)))
        .with_template(RotationTemplate::new("CLINIC", TemplateKind::Clinic).supervised())
}

/// Every (person, block) pair on CLINIC.
fn pool(ctx: &SchedulingContext) -> Vec<Assignment> {
    ctx.people
        .iter()
        .flat_map(|p| ctx.blocks.iter().map(move |b| Assignment::new(&p.id, &b.id, "CLINIC")))
        .collect()
}

fn pick(pool: &[Assignment], mask: &[bool]) -> Vec<Assignment> {
    pool.iter()
        .zip(mask)
        .filter(|(_, on)| **on)
        .map(|(a, _)| a.clone())
        .collect()
}

/// Tuesday through Thursday with nightly call; solvable for any tie-break.
fn call_context() -> SchedulingContext {
    let mut ctx = SchedulingContext::new()
        .with_person(Person::resident("R1", 2))
        .with_person(Person::resident("R2", 1))
        .with_person(Person::faculty("F1"))
        .with_person(Person::faculty("F2"))
        .with_person(Person::faculty("F3"))
        .with_template(RotationTemplate::new("CLINIC", TemplateKind::Clinic).supervised())
        .with_template(RotationTemplate::new("CALL", TemplateKind::OvernightCall).for_role(Role::Faculty));
    for day in 1..=3 {
        ctx = ctx
            .with_block(Block::am(format!("D{day}-AM"), d(day)))
            .with_block(Block::pm(format!("D{day}-PM"), d(day)))
            .with_block(Block::night(format!("D{day}-N"), d(day)));
    }
    ctx
}

fn rank(s: Severity) -> u8 {
    match s {
        Severity::Critical => 0,
        Severity::High => 1,
        Severity::Medium => 2,
        Severity::Low => 3,
        Severity::Info => 4,
    }
}

// ============================================================================
// Catalog
// ============================================================================

#[test]
fn test_availability_is_locked() {
    let mut c = standard_catalog().unwrap();
    assert_eq!(
        c.set_enabled(ids::AVAILABILITY, false),
        Err(CatalogError::LockedConstraint {
            id: ids::AVAILABILITY.to_string()
        })
    );
    assert!(c.is_enabled(ids::AVAILABILITY));

    c.apply_preset("minimal").unwrap();
    assert!(c.is_enabled(ids::AVAILABILITY));
}

#[test]
fn test_post_call_depends_on_call_generation() {
    let mut c = standard_catalog().unwrap();
    let err = c.set_enabled(ids::OVERNIGHT_CALL_GENERATION, false).unwrap_err();
    assert!(matches!(err, CatalogError::MissingDependency { .. }));
    assert!(c.is_enabled(ids::OVERNIGHT_CALL_GENERATION));

    c.apply_preset("minimal").unwrap();
    let err = c.set_enabled(ids::POST_CALL_AUTO_ASSIGNMENT, true).unwrap_err();
    assert_eq!(
        err,
        CatalogError::MissingDependency {
            constraint: ids::POST_CALL_AUTO_ASSIGNMENT.to_string(),
            dependency: ids::OVERNIGHT_CALL_GENERATION.to_string(),
        }
    );
}

#[test]
fn test_minimal_preset_is_idempotent() {
    let mut c = standard_catalog().unwrap();
    c.apply_preset("minimal").unwrap();
    let once = c.resolve().unwrap().summary();
    c.apply_preset("minimal").unwrap();
    let twice = c.resolve().unwrap().summary();
    assert_eq!(once, twice);
}

#[test]
fn test_fmit_rules_vacuous_without_fmit_blocks() {
    let set = standard_catalog().unwrap().resolve().unwrap();
    let ctx = clinic_context();
    let all = pool(&ctx);
    let report = ValidationEngine::new().validate_assignments(&set, &ctx, &all);
    assert_eq!(report.violations_of(ids::FMIT_STAFFING).count(), 0);
    assert_eq!(report.violations_of(ids::FMIT_WEEK_BLOCKING).count(), 0);
}

#[test]
fn test_empty_catalog_resolves_empty() {
    let set = ConstraintCatalog::new().resolve().unwrap();
    let report = ValidationEngine::new().validate(&set, &clinic_context());
    assert!(report.is_feasible);
    assert_eq!(report.objective_score, 0.0);
}

// ============================================================================
// Adaptive weights
// ============================================================================

fn feed(c: &mut AdaptiveWeightController, levels: &[DefenseLevel]) -> Vec<DefenseLevel> {
    levels
        .iter()
        .enumerate()
        .map(|(i, &l)| c.observe(ResilienceSignal::new(l, i as i64 * 60_000)).to)
        .collect()
}

#[test]
fn test_hysteresis_sequences() {
    use DefenseLevel::*;
    let catalog = standard_catalog().unwrap();

    let mut c = AdaptiveWeightController::standard(Arc::clone(catalog.weights())).unwrap();
    assert_eq!(feed(&mut c, &[Green, Yellow, Yellow]), vec![Green, Green, Yellow]);

    let mut c = AdaptiveWeightController::standard(Arc::clone(catalog.weights())).unwrap().with_initial_level(Red);
    assert_eq!(
        feed(&mut c, &[Orange, Orange, Orange]),
        vec![Red, Red, Orange]
    );

    let mut c = AdaptiveWeightController::standard(Arc::clone(catalog.weights())).unwrap();
    assert_eq!(feed(&mut c, &[Green, Black]), vec![Green, Black]);
}

#[test]
fn test_reweighting_reaches_resolved_sets() {
    let mut catalog = standard_catalog().unwrap();
    catalog.apply_preset("resilience_tier2").unwrap();
    let set = catalog.resolve().unwrap();
    let before = set.weights();

    let mut c = AdaptiveWeightController::standard(Arc::clone(catalog.weights())).unwrap();
    feed(&mut c, &[DefenseLevel::Black]);

    // Held snapshot is untouched; the set sees the new table
    assert_eq!(before.weight(ids::EQUITY), Some(10.0));
    assert_eq!(set.weights().weight(ids::EQUITY), Some(0.0));
    assert_eq!(set.weights().weight(ids::COVERAGE), Some(1000.0));

    let report = ValidationEngine::new().validate(&set, &clinic_context());
    assert_eq!(report.defense_level, DefenseLevel::Black);
    assert!(report.evaluated_at.weights_version > before.version());
}

// ============================================================================
// Solver
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// Property: validation is a pure function of set, weights, and context.
    #[test]
    fn prop_validation_is_deterministic(mask in prop::collection::vec(any::<bool>(), 16)) {
        let set = standard_catalog().unwrap().resolve().unwrap();
        let ctx = clinic_context();
        let candidate = pick(&pool(&ctx), &mask);
        let engine = ValidationEngine::new();

        let a = engine.validate_assignments(&set, &ctx, &candidate);
        let b = engine.validate_assignments(&set, &ctx, &candidate);
        prop_assert_eq!(a.to_json().unwrap(), b.to_json().unwrap());

        let batch = engine.validate_batch(&set, &ctx, &[candidate.clone(), candidate]);
        prop_assert_eq!(&batch[0], &a);
        prop_assert_eq!(&batch[1], &a);
    }

    /// Property: hard violations come most severe first, before soft ones.
    #[test]
    fn prop_violations_ordered_by_priority(picks in prop::collection::vec(0usize..16, 0..24)) {
        let set = standard_catalog().unwrap().resolve().unwrap();
        let ctx = clinic_context();
        let all = pool(&ctx);
        let candidate: Vec<Assignment> = picks.iter().map(|&i| all[i].clone()).collect();

        let report = ValidationEngine::new().validate_assignments(&set, &ctx, &candidate);
        let ranks: Vec<u8> = report.violations.iter().map(|v| rank(v.severity)).collect();
        prop_assert!(ranks.windows(2).all(|w| w[0] <= w[1]), "{:?}", ranks);
        prop_assert_eq!(report.is_feasible, report.hard_violations().next().is_none());

        let tiers: Vec<Option<Priority>> = report.hard_violations().map(|v| v.tier).collect();
        prop_assert!(tiers.iter().all(Option::is_some));
        prop_assert!(tiers.windows(2).all(|w| w[0] >= w[1]), "{:?}", tiers);
    }

    /// Property: one more worked assignment always raises the objective.
    #[test]
    fn prop_coverage_dominates_penalties(mask in prop::collection::vec(any::<bool>(), 16)) {
        let set = standard_catalog().unwrap().resolve().unwrap();
        let ctx = clinic_context();
        let all = pool(&ctx);
        let extra = mask.iter().position(|on| !on);
        prop_assume!(extra.is_some());

        let base = pick(&all, &mask);
        let mut more = base.clone();
        more.push(all[extra.unwrap()].clone());

        let engine = ValidationEngine::new();
        let lo = engine.validate_assignments(&set, &ctx, &base).objective_score;
        let hi = engine.validate_assignments(&set, &ctx, &more).objective_score;
        prop_assert!(hi > lo, "{} !> {}", hi, lo);
    }

    /// Property: greedy solutions survive full re-validation.
    #[test]
    fn prop_solver_round_trip(seed in any::<u64>()) {
        let set = standard_catalog().unwrap().resolve().unwrap();
        let ctx = call_context();
        let outcome = SolverBridge::default()
            .solve_and_verify(&set, &ctx, &GreedySolver::new().with_seed(seed), &CancelToken::new())
            .unwrap();

        match outcome {
            BridgeOutcome::Accepted { assignments, report, .. } => {
                prop_assert!(report.is_feasible);
                let calls = assignments.iter().filter(|a| a.template_id == "CALL").count();
                prop_assert_eq!(calls, 3);
            }
            other => prop_assert!(false, "not accepted: {:?}", other),
        }
    }
}
