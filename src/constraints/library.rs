//! Standard residency constraint catalog and built-in presets.
//!
//! # Presets
//!
//! | Preset | Contents |
//! |--------|----------|
//! | `default` | every hard rule, every non-resilience soft rule |
//! | `minimal` | locked rules, one-person-per-block, capacity, coverage |
//! | `strict` | `default` with every soft weight doubled |
//! | `resilience_tier1` | `default` + hub protection + utilization buffer |
//! | `resilience_tier2` | `resilience_tier1` + N-1 vulnerability |

use super::hard::{
    Availability, EightyHourRule, FmitStaffing, FmitWeekBlocking, OneInSevenRule,
    OnePersonPerBlock, OvernightCallGeneration, PostCallAutoAssignment, RoleRestriction,
    RotationCapacity, SupervisionRatio,
};
use super::resilience::{HubProtectionRule, N1VulnerabilityRule, UtilizationBufferRule};
use super::soft::{
    CallDayEquity, CallPreferenceRule, CallSpacingRule, ContinuityRule, CoverageRule, EquityRule,
};
use super::{Category, ConstraintDef, ConstraintKind, Priority};
use crate::catalog::{ConstraintCatalog, Preset};
use crate::error::CatalogError;

/// Built-in constraint ids.
pub mod ids {
    pub const AVAILABILITY: &str = "Availability";
    pub const ONE_PERSON_PER_BLOCK: &str = "OnePersonPerBlock";
    pub const EIGHTY_HOUR_RULE: &str = "EightyHourRule";
    pub const ONE_IN_SEVEN_RULE: &str = "OneInSevenRule";
    pub const SUPERVISION_RATIO: &str = "SupervisionRatio";
    pub const ROTATION_CAPACITY: &str = "RotationCapacity";
    pub const ROLE_RESTRICTION: &str = "RoleRestriction";
    pub const OVERNIGHT_CALL_GENERATION: &str = "OvernightCallGeneration";
    pub const POST_CALL_AUTO_ASSIGNMENT: &str = "PostCallAutoAssignment";
    pub const FMIT_STAFFING: &str = "FmitStaffing";
    pub const FMIT_WEEK_BLOCKING: &str = "FmitWeekBlocking";

    pub const COVERAGE: &str = "Coverage";
    pub const EQUITY: &str = "Equity";
    pub const CONTINUITY: &str = "Continuity";
    pub const CALL_SPACING: &str = "CallSpacing";
    pub const SUNDAY_CALL_EQUITY: &str = "SundayCallEquity";
    pub const WEEKDAY_CALL_EQUITY: &str = "WeekdayCallEquity";
    pub const CALL_PREFERENCE: &str = "CallPreference";
    pub const HUB_PROTECTION: &str = "HubProtection";
    pub const UTILIZATION_BUFFER: &str = "UtilizationBuffer";
    pub const N1_VULNERABILITY: &str = "N1Vulnerability";
}

/// Name of the preset applied by [`standard_catalog`].
pub const DEFAULT_PRESET: &str = "default";

/// Weight of the coverage reward.
pub const COVERAGE_WEIGHT: f64 = 1000.0;

/// Every built-in constraint, in registration order.
pub fn standard_constraints() -> Vec<ConstraintDef> {
    use ids::*;

    vec![
        // Hard
        ConstraintDef::hard(AVAILABILITY, Category::Temporal, Priority::Critical, Availability)
            .with_description("No assignments during absences")
            .locked(),
        ConstraintDef::hard(ONE_PERSON_PER_BLOCK, Category::Capacity, Priority::Critical, OnePersonPerBlock)
            .with_description("At most one assignment per person per block"),
        ConstraintDef::hard(EIGHTY_HOUR_RULE, Category::Regulatory, Priority::Critical, EightyHourRule::default())
            .with_description("80 hours/week averaged over rolling 4 weeks")
            .locked(),
        ConstraintDef::hard(ONE_IN_SEVEN_RULE, Category::Regulatory, Priority::Critical, OneInSevenRule)
            .with_description("One duty-free day in every 7")
            .locked(),
        ConstraintDef::hard(SUPERVISION_RATIO, Category::Regulatory, Priority::Critical, SupervisionRatio)
            .with_description("1 faculty per 2 PGY-1 or 4 senior residents")
            .locked(),
        ConstraintDef::hard(ROTATION_CAPACITY, Category::Capacity, Priority::High, RotationCapacity)
            .with_description("Residents per rotation within capacity"),
        ConstraintDef::hard(ROLE_RESTRICTION, Category::Role, Priority::High, RoleRestriction)
            .with_description("Role and PGY eligibility per template"),
        ConstraintDef::hard(OVERNIGHT_CALL_GENERATION, Category::Call, Priority::High, OvernightCallGeneration)
            .with_description("One faculty on call Sunday-Thursday nights"),
        ConstraintDef::hard(POST_CALL_AUTO_ASSIGNMENT, Category::Call, Priority::High, PostCallAutoAssignment)
            .with_description("No clinical work the day after call")
            .depends_on(OVERNIGHT_CALL_GENERATION),
        ConstraintDef::hard(FMIT_STAFFING, Category::Specialty, Priority::Medium, FmitStaffing)
            .with_description("One faculty per FMIT block"),
        ConstraintDef::hard(FMIT_WEEK_BLOCKING, Category::Specialty, Priority::Medium, FmitWeekBlocking)
            .with_description("No clinic during an FMIT week")
            .depends_on(FMIT_STAFFING),
        // Soft
        ConstraintDef::soft(COVERAGE, Category::Coverage, COVERAGE_WEIGHT, CoverageRule)
            .with_description("Reward for every worked assignment"),
        ConstraintDef::soft(EQUITY, Category::Equity, 10.0, EquityRule)
            .with_description("Balanced clinical load across residents"),
        ConstraintDef::soft(CONTINUITY, Category::Temporal, 2.0, ContinuityRule)
            .with_description("Few rotation switches (validation only)"),
        ConstraintDef::soft(CALL_SPACING, Category::Call, 10.0, CallSpacingRule::default())
            .with_description("Spread overnight calls apart")
            .depends_on(OVERNIGHT_CALL_GENERATION),
        ConstraintDef::soft(SUNDAY_CALL_EQUITY, Category::Call, 8.0, CallDayEquity::SUNDAY)
            .with_description("Balanced Sunday call across faculty")
            .depends_on(OVERNIGHT_CALL_GENERATION),
        ConstraintDef::soft(WEEKDAY_CALL_EQUITY, Category::Call, 5.0, CallDayEquity::WEEKDAY)
            .with_description("Balanced Monday-Thursday call across faculty")
            .depends_on(OVERNIGHT_CALL_GENERATION),
        ConstraintDef::soft(CALL_PREFERENCE, Category::Call, 3.0, CallPreferenceRule)
            .with_description("Honor avoided call days")
            .depends_on(OVERNIGHT_CALL_GENERATION),
        ConstraintDef::soft(HUB_PROTECTION, Category::Resilience, 15.0, HubProtectionRule::default())
            .with_description("Keep hub faculty off routine duty")
            .disabled(),
        ConstraintDef::soft(UTILIZATION_BUFFER, Category::Resilience, 20.0, UtilizationBufferRule::default())
            .with_description("Stay under 80% utilization")
            .disabled(),
        ConstraintDef::soft(N1_VULNERABILITY, Category::Resilience, 25.0, N1VulnerabilityRule)
            .with_description("No single-supervisor blocks")
            .depends_on(HUB_PROTECTION)
            .disabled(),
    ]
}

/// Built-in presets for the constraints in `catalog`.
pub fn builtin_presets(catalog: &ConstraintCatalog) -> Vec<Preset> {
    use ids::*;

    let resilience = [HUB_PROTECTION, UTILIZATION_BUFFER, N1_VULNERABILITY];
    let non_resilience: Vec<&str> = catalog
        .constraints()
        .map(|(d, _)| d.id.as_str())
        .filter(|id| !resilience.contains(id))
        .collect();

    let default = Preset::new(DEFAULT_PRESET)
        .enable_all(non_resilience.iter().copied())
        .disable(HUB_PROTECTION)
        .disable(UTILIZATION_BUFFER)
        .disable(N1_VULNERABILITY);

    let minimal = Preset::new("minimal").enable_all(
        catalog
            .constraints()
            .filter(|(d, _)| d.locked)
            .map(|(d, _)| d.id.as_str())
            .chain([ONE_PERSON_PER_BLOCK, ROTATION_CAPACITY, COVERAGE]),
    );

    let mut strict = default.clone();
    strict.name = "strict".to_string();
    for (def, _) in catalog.constraints().filter(|(d, _)| d.kind == ConstraintKind::Soft) {
        if default.enables(&def.id) {
            strict.weight_overrides.insert(def.id.clone(), def.weight * 2.0);
        }
    }

    let tier1 = Preset::new("resilience_tier1")
        .enable_all(non_resilience.iter().copied())
        .enable(HUB_PROTECTION)
        .enable(UTILIZATION_BUFFER)
        .disable(N1_VULNERABILITY);

    let tier2 = Preset::new("resilience_tier2")
        .enable_all(non_resilience.iter().copied())
        .enable_all(resilience);

    vec![default, minimal, strict, tier1, tier2]
}

/// A catalog with every built-in constraint and preset, `default` applied.
pub fn standard_catalog() -> Result<ConstraintCatalog, CatalogError> {
    let mut catalog = ConstraintCatalog::new();
    for def in standard_constraints() {
        catalog.register(def)?;
    }
    for preset in builtin_presets(&catalog) {
        catalog.register_preset(preset);
    }
    catalog.apply_preset(DEFAULT_PRESET)?;
    Ok(catalog)
}

#[cfg(test)]
mod tests {
    use super::ids::*;
    use super::*;

    #[test]
    fn test_standard_catalog_registers_everything() {
        let c = standard_catalog().unwrap();
        assert_eq!(c.len(), 21);
        assert_eq!(c.active_preset(), Some("default"));
        assert!(c.is_enabled(POST_CALL_AUTO_ASSIGNMENT));
        assert!(!c.is_enabled(HUB_PROTECTION));
        assert_eq!(c.presets().count(), 5);
    }

    #[test]
    fn test_locked_regulatory_rules() {
        let c = standard_catalog().unwrap();
        for id in [AVAILABILITY, EIGHTY_HOUR_RULE, ONE_IN_SEVEN_RULE, SUPERVISION_RATIO] {
            assert!(c.get(id).unwrap().locked, "{id} should be locked");
        }
    }

    #[test]
    fn test_minimal_preset() {
        let mut c = standard_catalog().unwrap();
        c.apply_preset("minimal").unwrap();
        let set = c.resolve().unwrap();
        let hard: Vec<&str> = set.hard().iter().map(|d| d.id.as_str()).collect();
        assert_eq!(
            hard,
            vec![
                AVAILABILITY,
                ONE_PERSON_PER_BLOCK,
                EIGHTY_HOUR_RULE,
                ONE_IN_SEVEN_RULE,
                SUPERVISION_RATIO,
                ROTATION_CAPACITY
            ]
        );
        assert_eq!(set.soft().len(), 1);
        assert_eq!(set.soft()[0].id, COVERAGE);
    }

    #[test]
    fn test_strict_doubles_soft_weights() {
        let mut c = standard_catalog().unwrap();
        c.apply_preset("strict").unwrap();
        let w = c.weights().load();
        assert_eq!(w.weight(COVERAGE), Some(2000.0));
        assert_eq!(w.weight(EQUITY), Some(20.0));
        assert_eq!(w.weight(CALL_PREFERENCE), Some(6.0));
    }

    #[test]
    fn test_resilience_tiers() {
        let mut c = standard_catalog().unwrap();
        c.apply_preset("resilience_tier1").unwrap();
        assert!(c.is_enabled(HUB_PROTECTION));
        assert!(c.is_enabled(UTILIZATION_BUFFER));
        assert!(!c.is_enabled(N1_VULNERABILITY));

        c.apply_preset("resilience_tier2").unwrap();
        assert!(c.is_enabled(N1_VULNERABILITY));

        c.apply_preset("default").unwrap();
        assert!(!c.is_enabled(HUB_PROTECTION));
    }
}
