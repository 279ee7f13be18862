//! System settings resolved once per run
//!
//! Providers answer key lookups and bracket tables; `SettingsSnapshot::resolve`
//! reads every value a run needs up front so calculators never go back to a
//! provider mid-run.

pub mod loader;

use std::collections::BTreeMap;

use log::debug;

use crate::catalog::YieldLine;
use crate::client::MAX_TERM_MONTHS;
use crate::pension::PensionConstants;
use crate::tax::{
    default_brackets, progressive_scale, CofinancingBracket, CofinancingTerms, PdsCofinancingSimulator,
    ProgressiveTaxEngine, TaxBracket, TaxSchedule, DEFAULT_SCHEDULE_FIRST_YEAR, DEFAULT_SCHEDULE_LAST_YEAR,
};

pub use loader::load_settings;

/// Setting keys understood by the planner
pub mod keys {
    pub const INFLATION_RATE: &str = "inflation_rate";
    pub const CONTRIBUTION_INDEXATION_RATE: &str = "contribution_indexation_rate";
    pub const PENSION_CONTRIBUTION_RATE: &str = "pension_contribution_rate";
    pub const PENSION_MAX_SALARY_BASE: &str = "pension_max_salary_base";
    pub const PENSION_POINT_COST: &str = "pension_point_cost";
    pub const PENSION_FIXED_PAYMENT: &str = "pension_fixed_payment";
    pub const PENSION_PAST_POINTS_COEFFICIENT: &str = "pension_past_points_coefficient";
    pub const PENSION_PAYOUT_MONTHS: &str = "pension_payout_months";
    pub const COFINANCING_ANNUAL_CAP: &str = "cofinancing_annual_cap";
    pub const COFINANCING_MAX_YEARS: &str = "cofinancing_max_years";
    pub const COFINANCING_CREDIT_MONTH: &str = "cofinancing_credit_month";
    pub const TAX_DEDUCTION_LIMIT: &str = "tax_deduction_limit";
    pub const FIN_RESERVE_MONTHS: &str = "fin_reserve_months";
    pub const FIN_RESERVE_YIELD_PCT: &str = "fin_reserve_yield_pct";
    pub const LIFE_FALLBACK_YIELD_PCT: &str = "life_fallback_yield_pct";
    pub const LIFE_RISK_LOAD: &str = "life_risk_load";
    pub const GOAL_STATUS_TOLERANCE: &str = "goal_status_tolerance";

    pub const ALL: &[&str] = &[
        INFLATION_RATE,
        CONTRIBUTION_INDEXATION_RATE,
        PENSION_CONTRIBUTION_RATE,
        PENSION_MAX_SALARY_BASE,
        PENSION_POINT_COST,
        PENSION_FIXED_PAYMENT,
        PENSION_PAST_POINTS_COEFFICIENT,
        PENSION_PAYOUT_MONTHS,
        COFINANCING_ANNUAL_CAP,
        COFINANCING_MAX_YEARS,
        COFINANCING_CREDIT_MONTH,
        TAX_DEDUCTION_LIMIT,
        FIN_RESERVE_MONTHS,
        FIN_RESERVE_YIELD_PCT,
        LIFE_FALLBACK_YIELD_PCT,
        LIFE_RISK_LOAD,
        GOAL_STATUS_TOLERANCE,
    ];
}

/// Scalar system constants
pub trait SettingsProvider {
    fn get(&self, key: &str) -> Option<f64>;

    /// Payout-yield bands (term x amount -> annual percent)
    fn payout_yields(&self) -> Vec<YieldLine> {
        Vec::new()
    }
}

/// Income tax brackets for every configured year
pub trait TaxBracketProvider {
    fn tax_brackets(&self) -> Vec<TaxBracket>;
}

/// Co-financing ratio brackets
pub trait CofinancingBracketProvider {
    fn cofinancing_brackets(&self) -> Vec<CofinancingBracket>;
}

/// Every constant a run needs, fixed for the duration of the run
#[derive(Debug, Clone)]
pub struct SettingsSnapshot {
    /// Annual inflation (fraction)
    pub inflation_rate: f64,
    /// Annual contribution indexation (fraction)
    pub contribution_indexation_rate: f64,
    pub pension: PensionConstants,
    /// Months over which a pension shortfall is paid out of capital
    pub pension_payout_months: u32,
    pub payout_yields: Vec<YieldLine>,
    pub tax_schedule: TaxSchedule,
    pub tax_deduction_limit: f64,
    pub cofinancing: CofinancingTerms,
    pub fin_reserve_months: u32,
    pub fin_reserve_yield_pct: f64,
    pub life_fallback_yield_pct: f64,
    pub life_risk_load: f64,
    /// Relative shortfall still reported as OK
    pub goal_status_tolerance: f64,
}

impl SettingsSnapshot {
    pub fn defaults() -> Self {
        Self {
            inflation_rate: 0.04,
            contribution_indexation_rate: 0.04,
            pension: PensionConstants::default(),
            pension_payout_months: 240,
            payout_yields: default_payout_yields(),
            tax_schedule: TaxSchedule::default_progressive(),
            tax_deduction_limit: 400_000.0,
            cofinancing: CofinancingTerms::default(),
            fin_reserve_months: 6,
            fin_reserve_yield_pct: 8.0,
            life_fallback_yield_pct: 4.0,
            life_risk_load: 0.1,
            goal_status_tolerance: 0.01,
        }
    }

    /// Read every key once; missing keys keep their defaults
    pub fn resolve(
        settings: &dyn SettingsProvider,
        tax: &dyn TaxBracketProvider,
        cofinancing: &dyn CofinancingBracketProvider,
    ) -> Self {
        let mut snapshot = Self::defaults();
        let value = |key: &str, default: f64| match settings.get(key) {
            Some(v) => {
                debug!("setting {} = {}", key, v);
                v
            }
            None => default,
        };

        snapshot.inflation_rate = value(keys::INFLATION_RATE, snapshot.inflation_rate);
        snapshot.contribution_indexation_rate =
            value(keys::CONTRIBUTION_INDEXATION_RATE, snapshot.contribution_indexation_rate);

        let p = &mut snapshot.pension;
        p.contribution_rate = value(keys::PENSION_CONTRIBUTION_RATE, p.contribution_rate);
        p.max_salary_base = value(keys::PENSION_MAX_SALARY_BASE, p.max_salary_base);
        p.point_cost = value(keys::PENSION_POINT_COST, p.point_cost);
        p.fixed_payment = value(keys::PENSION_FIXED_PAYMENT, p.fixed_payment);
        p.past_points_coefficient = value(keys::PENSION_PAST_POINTS_COEFFICIENT, p.past_points_coefficient);
        snapshot.pension_payout_months = value(keys::PENSION_PAYOUT_MONTHS, snapshot.pension_payout_months as f64)
            .clamp(0.0, MAX_TERM_MONTHS as f64) as u32;

        snapshot.tax_deduction_limit = value(keys::TAX_DEDUCTION_LIMIT, snapshot.tax_deduction_limit);
        snapshot.tax_schedule = TaxSchedule::from_brackets(tax.tax_brackets());

        let c = &mut snapshot.cofinancing;
        c.annual_cap = value(keys::COFINANCING_ANNUAL_CAP, c.annual_cap);
        c.max_years = value(keys::COFINANCING_MAX_YEARS, c.max_years as f64).max(0.0) as u32;
        c.credit_month = value(keys::COFINANCING_CREDIT_MONTH, c.credit_month as f64).clamp(1.0, 12.0) as u32;
        c.brackets = cofinancing.cofinancing_brackets();

        snapshot.fin_reserve_months = value(keys::FIN_RESERVE_MONTHS, snapshot.fin_reserve_months as f64)
            .clamp(1.0, MAX_TERM_MONTHS as f64) as u32;
        snapshot.fin_reserve_yield_pct = value(keys::FIN_RESERVE_YIELD_PCT, snapshot.fin_reserve_yield_pct);
        snapshot.life_fallback_yield_pct = value(keys::LIFE_FALLBACK_YIELD_PCT, snapshot.life_fallback_yield_pct);
        snapshot.life_risk_load = value(keys::LIFE_RISK_LOAD, snapshot.life_risk_load);
        snapshot.goal_status_tolerance = value(keys::GOAL_STATUS_TOLERANCE, snapshot.goal_status_tolerance);

        let payout = settings.payout_yields();
        if !payout.is_empty() {
            snapshot.payout_yields = payout;
        }

        snapshot
    }

    /// Monthly contribution indexation, compounded from the annual rate
    pub fn monthly_indexation(&self) -> f64 {
        (1.0 + self.contribution_indexation_rate).powf(1.0 / 12.0) - 1.0
    }

    pub fn tax_engine(&self) -> ProgressiveTaxEngine<'_> {
        ProgressiveTaxEngine::new(&self.tax_schedule, self.tax_deduction_limit)
    }

    pub fn cofinancing_simulator(&self) -> PdsCofinancingSimulator<'_> {
        PdsCofinancingSimulator::new(&self.cofinancing)
    }
}

impl Default for SettingsSnapshot {
    fn default() -> Self {
        Self::defaults()
    }
}

/// Payout yield by funding horizon: longer horizons fund riskier payout mixes
pub fn default_payout_yields() -> Vec<YieldLine> {
    vec![
        YieldLine::new((0, Some(120)), (0.0, None), 6.0),
        YieldLine::new((121, Some(240)), (0.0, None), 7.0),
        YieldLine::new((241, None), (0.0, None), 8.0),
    ]
}

/// In-memory provider for settings and both bracket tables
#[derive(Debug, Clone, Default)]
pub struct StaticSettings {
    values: BTreeMap<String, f64>,
    tax_brackets: Vec<TaxBracket>,
    cofinancing_brackets: Vec<CofinancingBracket>,
    payout_yields: Vec<YieldLine>,
}

impl StaticSettings {
    /// No overrides, default bracket tables
    pub fn defaults() -> Self {
        let mut tax_brackets = Vec::new();
        for year in DEFAULT_SCHEDULE_FIRST_YEAR..=DEFAULT_SCHEDULE_LAST_YEAR {
            tax_brackets.extend(progressive_scale(year));
        }
        Self {
            values: BTreeMap::new(),
            tax_brackets,
            cofinancing_brackets: default_brackets(),
            payout_yields: default_payout_yields(),
        }
    }

    pub fn with_value(mut self, key: &str, value: f64) -> Self {
        self.values.insert(key.to_string(), value);
        self
    }

    pub fn with_tax_brackets(mut self, brackets: Vec<TaxBracket>) -> Self {
        self.tax_brackets = brackets;
        self
    }

    pub fn with_cofinancing_brackets(mut self, brackets: Vec<CofinancingBracket>) -> Self {
        self.cofinancing_brackets = brackets;
        self
    }

    pub fn with_payout_yields(mut self, lines: Vec<YieldLine>) -> Self {
        self.payout_yields = lines;
        self
    }

    /// Resolve a snapshot from this provider
    pub fn snapshot(&self) -> SettingsSnapshot {
        SettingsSnapshot::resolve(self, self, self)
    }
}

impl SettingsProvider for StaticSettings {
    fn get(&self, key: &str) -> Option<f64> {
        self.values.get(key).copied()
    }

    fn payout_yields(&self) -> Vec<YieldLine> {
        self.payout_yields.clone()
    }
}

impl TaxBracketProvider for StaticSettings {
    fn tax_brackets(&self) -> Vec<TaxBracket> {
        self.tax_brackets.clone()
    }
}

impl CofinancingBracketProvider for StaticSettings {
    fn cofinancing_brackets(&self) -> Vec<CofinancingBracket> {
        self.cofinancing_brackets.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_defaults_resolve_to_default_snapshot() {
        let snapshot = StaticSettings::defaults().snapshot();
        let defaults = SettingsSnapshot::defaults();

        assert_eq!(snapshot.inflation_rate, defaults.inflation_rate);
        assert_eq!(snapshot.pension, defaults.pension);
        assert_eq!(snapshot.cofinancing, defaults.cofinancing);
        assert_eq!(snapshot.payout_yields, defaults.payout_yields);
        assert!(snapshot.tax_schedule.for_year(2030).is_some());
    }

    #[test]
    fn test_overrides() {
        let snapshot = StaticSettings::defaults()
            .with_value(keys::INFLATION_RATE, 0.06)
            .with_value(keys::COFINANCING_ANNUAL_CAP, 50_000.0)
            .with_value(keys::PENSION_POINT_COST, 156.76)
            .with_value(keys::COFINANCING_CREDIT_MONTH, 15.0)
            .snapshot();

        assert_eq!(snapshot.inflation_rate, 0.06);
        assert_eq!(snapshot.cofinancing.annual_cap, 50_000.0);
        assert_eq!(snapshot.pension.point_cost, 156.76);
        assert_eq!(snapshot.cofinancing.credit_month, 12);
    }

    #[test]
    fn test_term_settings_clamped() {
        let snapshot = StaticSettings::defaults()
            .with_value(keys::FIN_RESERVE_MONTHS, 1e10)
            .with_value(keys::PENSION_PAYOUT_MONTHS, -5.0)
            .snapshot();

        assert_eq!(snapshot.fin_reserve_months, MAX_TERM_MONTHS);
        assert_eq!(snapshot.pension_payout_months, 0);
    }

    #[test]
    fn test_empty_tax_table_yields_empty_schedule() {
        let snapshot = StaticSettings::defaults().with_tax_brackets(Vec::new()).snapshot();
        assert!(snapshot.tax_schedule.for_year(2025).is_none());
    }

    #[test]
    fn test_monthly_indexation() {
        let snapshot = SettingsSnapshot::defaults();
        let monthly = snapshot.monthly_indexation();
        assert_abs_diff_eq!((1.0 + monthly).powi(12), 1.04, epsilon = 1e-12);
    }
}
