//! Progressive personal income tax (NDFL) and deduction refunds
//!
//! Tax due is a walk over an ascending bracket schedule. Refunds for
//! deductible contributions use the delta method: tax on income reduced by
//! the deduction base already used this year, minus tax on income reduced by
//! the base after adding the new contribution (capped at the annual limit).

use std::collections::BTreeMap;

use log::warn;
use serde::{Deserialize, Serialize};

/// Flat rate applied when no schedule is configured for a year
pub const FALLBACK_FLAT_RATE: f64 = 0.13;

/// Years covered by the built-in schedule
pub const DEFAULT_SCHEDULE_FIRST_YEAR: i32 = 2025;
pub const DEFAULT_SCHEDULE_LAST_YEAR: i32 = 2100;

/// One bracket of the annual income tax schedule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaxBracket {
    pub year: i32,

    /// Lower bound of annual income taxed in this bracket
    pub income_from: f64,

    /// Upper bound, `None` = unbounded
    pub income_to: Option<f64>,

    /// Marginal rate (fraction)
    pub rate: f64,
}

impl TaxBracket {
    pub fn new(year: i32, income_from: f64, income_to: Option<f64>, rate: f64) -> Self {
        Self { year, income_from, income_to, rate }
    }

    /// Part of `income` that falls into this bracket
    pub fn taxable_in_bracket(&self, income: f64) -> f64 {
        let upper = match self.income_to {
            Some(to) => income.min(to),
            None => income,
        };
        (upper - self.income_from).max(0.0)
    }
}

/// Bracket schedules by tax year
#[derive(Debug, Clone, Default)]
pub struct TaxSchedule {
    by_year: BTreeMap<i32, Vec<TaxBracket>>,
}

impl TaxSchedule {
    /// Group brackets by year, each year sorted ascending
    pub fn from_brackets(brackets: Vec<TaxBracket>) -> Self {
        let mut by_year: BTreeMap<i32, Vec<TaxBracket>> = BTreeMap::new();
        for bracket in brackets {
            by_year.entry(bracket.year).or_default().push(bracket);
        }
        for brackets in by_year.values_mut() {
            brackets.sort_by(|a, b| a.income_from.total_cmp(&b.income_from));
        }
        Self { by_year }
    }

    /// 2025 progressive scale, repeated for every year of the default horizon
    pub fn default_progressive() -> Self {
        let mut brackets = Vec::new();
        for year in DEFAULT_SCHEDULE_FIRST_YEAR..=DEFAULT_SCHEDULE_LAST_YEAR {
            brackets.extend(progressive_scale(year));
        }
        Self::from_brackets(brackets)
    }

    pub fn for_year(&self, year: i32) -> Option<&[TaxBracket]> {
        self.by_year
            .get(&year)
            .map(|b| b.as_slice())
            .filter(|b| !b.is_empty())
    }

    pub fn years(&self) -> impl Iterator<Item = i32> + '_ {
        self.by_year.keys().copied()
    }

    pub fn all_brackets(&self) -> Vec<TaxBracket> {
        self.by_year.values().flatten().cloned().collect()
    }
}

/// Progressive scale in force from 2025
pub fn progressive_scale(year: i32) -> Vec<TaxBracket> {
    vec![
        TaxBracket::new(year, 0.0, Some(2_400_000.0), 0.13),
        TaxBracket::new(year, 2_400_000.0, Some(5_000_000.0), 0.15),
        TaxBracket::new(year, 5_000_000.0, Some(20_000_000.0), 0.18),
        TaxBracket::new(year, 20_000_000.0, Some(50_000_000.0), 0.20),
        TaxBracket::new(year, 50_000_000.0, None, 0.22),
    ]
}

/// Tax due on an annual income
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TaxAssessment {
    pub tax: f64,
    pub effective_rate: f64,
    /// Computed with the flat fallback rate
    pub flat_fallback: bool,
}

/// Refund produced by one deductible contribution
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DeductionRefund {
    pub refund: f64,
    /// Part of the contribution that fit under the annual limit
    pub base_applied: f64,
    /// Deduction base used this year after the contribution
    pub used_base_after: f64,
}

/// Bracket walker over a tax schedule
#[derive(Debug, Clone, Copy)]
pub struct ProgressiveTaxEngine<'a> {
    schedule: &'a TaxSchedule,
    deduction_limit: f64,
}

impl<'a> ProgressiveTaxEngine<'a> {
    pub fn new(schedule: &'a TaxSchedule, deduction_limit: f64) -> Self {
        Self { schedule, deduction_limit }
    }

    pub fn deduction_limit(&self) -> f64 {
        self.deduction_limit
    }

    /// Tax due on `income` in `year`
    pub fn tax_due(&self, year: i32, income: f64) -> TaxAssessment {
        if income <= 0.0 {
            return TaxAssessment { tax: 0.0, effective_rate: 0.0, flat_fallback: false };
        }

        let (tax, flat_fallback) = match self.schedule.for_year(year) {
            Some(brackets) => {
                let tax = brackets
                    .iter()
                    .map(|b| b.taxable_in_bracket(income) * b.rate)
                    .sum::<f64>();
                (tax, false)
            }
            None => {
                warn!("No tax bracket schedule for {}, using flat {:.0}% rate", year, FALLBACK_FLAT_RATE * 100.0);
                (income * FALLBACK_FLAT_RATE, true)
            }
        };

        TaxAssessment { tax, effective_rate: tax / income, flat_fallback }
    }

    /// Delta-method refund for a new deductible contribution.
    ///
    /// # Arguments
    /// * `year` - Tax year the contribution is paid in
    /// * `income` - Gross annual income for that year
    /// * `contribution` - Deductible amount paid by this goal
    /// * `used_base_before` - Deduction base already taken by earlier goals this year
    ///
    /// # Returns
    /// * `DeductionRefund` - Refund (never negative), base consumed and base used afterwards
    pub fn refund(&self, year: i32, income: f64, contribution: f64, used_base_before: f64) -> DeductionRefund {
        // Only what is left under the yearly limit can be deducted
        let used_before = used_base_before.clamp(0.0, self.deduction_limit);
        let used_after = (used_before + contribution.max(0.0)).min(self.deduction_limit);

        // Refund is the tax saved by moving from one deducted base to the other
        let tax_before = self.tax_due(year, income - used_before).tax;
        let tax_after = self.tax_due(year, income - used_after).tax;

        DeductionRefund {
            refund: (tax_before - tax_after).max(0.0),
            base_applied: used_after - used_before,
            used_base_after: used_after,
        }
    }

    /// Refund additionally capped by the tax actually paid this year,
    /// net of refunds already granted against it
    pub fn capped_refund(
        &self,
        year: i32,
        income: f64,
        contribution: f64,
        used_base_before: f64,
        already_refunded: f64,
    ) -> DeductionRefund {
        let mut result = self.refund(year, income, contribution, used_base_before);
        let tax_paid = self.tax_due(year, income).tax;
        let headroom = (tax_paid - already_refunded).max(0.0);
        result.refund = result.refund.min(headroom);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn two_bracket_schedule() -> TaxSchedule {
        TaxSchedule::from_brackets(vec![
            TaxBracket::new(2025, 2_400_000.0, Some(5_000_000.0), 0.15),
            TaxBracket::new(2025, 0.0, Some(2_400_000.0), 0.13),
        ])
    }

    #[test]
    fn test_income_inside_first_bracket() {
        let schedule = two_bracket_schedule();
        let engine = ProgressiveTaxEngine::new(&schedule, 400_000.0);

        let assessment = engine.tax_due(2025, 1_000_000.0);
        assert_abs_diff_eq!(assessment.tax, 130_000.0, epsilon = 1e-6);
        assert_abs_diff_eq!(assessment.effective_rate, 0.13, epsilon = 1e-12);
        assert!(!assessment.flat_fallback);
    }

    #[test]
    fn test_first_bracket_is_proportional() {
        let schedule = two_bracket_schedule();
        let engine = ProgressiveTaxEngine::new(&schedule, 400_000.0);

        for income in [1.0, 55_000.0, 777_777.0, 2_400_000.0] {
            assert_abs_diff_eq!(engine.tax_due(2025, income).tax, income * 0.13, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_multi_bracket_income() {
        let schedule = two_bracket_schedule();
        let engine = ProgressiveTaxEngine::new(&schedule, 400_000.0);

        let assessment = engine.tax_due(2025, 3_000_000.0);
        assert_abs_diff_eq!(assessment.tax, 402_000.0, epsilon = 1e-6);
        assert_abs_diff_eq!(assessment.effective_rate, 0.134, epsilon = 1e-12);
    }

    #[test]
    fn test_non_positive_income() {
        let schedule = two_bracket_schedule();
        let engine = ProgressiveTaxEngine::new(&schedule, 400_000.0);

        let assessment = engine.tax_due(2025, -5.0);
        assert_eq!(assessment.tax, 0.0);
        assert_eq!(assessment.effective_rate, 0.0);
    }

    #[test]
    fn test_flat_fallback_for_unconfigured_year() {
        let schedule = two_bracket_schedule();
        let engine = ProgressiveTaxEngine::new(&schedule, 400_000.0);

        let assessment = engine.tax_due(2031, 3_000_000.0);
        assert!(assessment.flat_fallback);
        assert_abs_diff_eq!(assessment.tax, 390_000.0, epsilon = 1e-6);
    }

    #[test]
    fn test_refund_delta_method() {
        let schedule = two_bracket_schedule();
        let engine = ProgressiveTaxEngine::new(&schedule, 400_000.0);

        // Income 2.6M: the first 200k of deduction comes off the 15% bracket
        let refund = engine.refund(2025, 2_600_000.0, 300_000.0, 0.0);
        assert_abs_diff_eq!(refund.refund, 200_000.0 * 0.15 + 100_000.0 * 0.13, epsilon = 1e-6);
        assert_abs_diff_eq!(refund.base_applied, 300_000.0, epsilon = 1e-9);
        assert_abs_diff_eq!(refund.used_base_after, 300_000.0, epsilon = 1e-9);
    }

    #[test]
    fn test_refund_respects_annual_limit() {
        let schedule = two_bracket_schedule();
        let engine = ProgressiveTaxEngine::new(&schedule, 400_000.0);

        let refund = engine.refund(2025, 1_000_000.0, 300_000.0, 250_000.0);
        assert_abs_diff_eq!(refund.base_applied, 150_000.0, epsilon = 1e-9);
        assert_abs_diff_eq!(refund.refund, 150_000.0 * 0.13, epsilon = 1e-6);

        let exhausted = engine.refund(2025, 1_000_000.0, 300_000.0, 400_000.0);
        assert_eq!(exhausted.refund, 0.0);
        assert_eq!(exhausted.base_applied, 0.0);
    }

    #[test]
    fn test_refund_capped_by_tax_paid() {
        let schedule = two_bracket_schedule();
        let engine = ProgressiveTaxEngine::new(&schedule, 400_000.0);

        // Delta arithmetic alone gives 52,000 but only 10,000 of the
        // 130,000 paid is left after earlier refunds
        let uncapped = engine.refund(2025, 1_000_000.0, 400_000.0, 0.0);
        assert_abs_diff_eq!(uncapped.refund, 52_000.0, epsilon = 1e-6);

        let capped = engine.capped_refund(2025, 1_000_000.0, 400_000.0, 0.0, 120_000.0);
        assert_abs_diff_eq!(capped.refund, 10_000.0, epsilon = 1e-6);
        assert!(capped.refund <= engine.tax_due(2025, 1_000_000.0).tax);
    }

    #[test]
    fn test_refund_never_exceeds_tax_on_small_income() {
        let schedule = two_bracket_schedule();
        let engine = ProgressiveTaxEngine::new(&schedule, 400_000.0);

        let refund = engine.capped_refund(2025, 100_000.0, 400_000.0, 0.0, 0.0);
        assert_abs_diff_eq!(refund.refund, 13_000.0, epsilon = 1e-6);
    }

    #[test]
    fn test_default_schedule_covers_horizon() {
        let schedule = TaxSchedule::default_progressive();
        assert!(schedule.for_year(DEFAULT_SCHEDULE_FIRST_YEAR).is_some());
        assert!(schedule.for_year(2060).is_some());
        assert!(schedule.for_year(DEFAULT_SCHEDULE_FIRST_YEAR - 1).is_none());
        assert_eq!(schedule.for_year(2030).map(|b| b.len()), Some(5));
    }
}
