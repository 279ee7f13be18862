//! State co-financing of PDS contributions
//!
//! The simulator follows the same month loop as the compounding projector
//! (growth first, then deposits) but carries two balances: the client-funded
//! one and the state-funded one. Every August, starting the calendar year
//! after participation begins and for at most `max_years` years, the prior
//! year's client contributions are multiplied by the income-bracket ratio,
//! capped at the annual maximum, and credited to the state balance.

use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate};
use log::debug;
use serde::{Deserialize, Serialize};

use super::ndfl::ProgressiveTaxEngine;

/// Income bracket selecting the co-financing ratio
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CofinancingBracket {
    /// Average monthly income lower bound (inclusive)
    pub income_from: f64,

    /// Upper bound (inclusive), `None` = unbounded
    pub income_to: Option<f64>,

    pub numerator: f64,

    pub denominator: f64,
}

impl CofinancingBracket {
    pub fn new(income_from: f64, income_to: Option<f64>, numerator: f64, denominator: f64) -> Self {
        Self { income_from, income_to, numerator, denominator }
    }

    pub fn contains(&self, income: f64) -> bool {
        income >= self.income_from && self.income_to.map_or(true, |to| income <= to)
    }

    pub fn ratio(&self) -> f64 {
        if self.denominator <= 0.0 {
            0.0
        } else {
            self.numerator / self.denominator
        }
    }
}

/// Programme parameters of the co-financing subsidy
#[derive(Debug, Clone, PartialEq)]
pub struct CofinancingTerms {
    /// Maximum credited per calendar year
    pub annual_cap: f64,

    /// Years after the start year during which credits are paid
    pub max_years: u32,

    /// Calendar month (1-12) in which credits are paid
    pub credit_month: u32,

    pub brackets: Vec<CofinancingBracket>,
}

impl Default for CofinancingTerms {
    fn default() -> Self {
        Self {
            annual_cap: 36_000.0,
            max_years: 10,
            credit_month: 8,
            brackets: default_brackets(),
        }
    }
}

/// 1:1 up to 80k monthly income, 1:2 up to 150k, 1:4 above
pub fn default_brackets() -> Vec<CofinancingBracket> {
    vec![
        CofinancingBracket::new(0.0, Some(80_000.0), 1.0, 1.0),
        CofinancingBracket::new(80_000.0, Some(150_000.0), 1.0, 2.0),
        CofinancingBracket::new(150_000.0, None, 1.0, 4.0),
    ]
}

impl CofinancingTerms {
    /// Ratio for an average monthly income; first matching bracket wins
    pub fn ratio_for_income(&self, avg_monthly_income: f64) -> f64 {
        match self.brackets.iter().find(|b| b.contains(avg_monthly_income)) {
            Some(bracket) => bracket.ratio(),
            None => {
                debug!("No co-financing bracket for income {:.2}", avg_monthly_income);
                0.0
            }
        }
    }

    /// Amount credited for one year's contributions, before cross-goal usage
    pub fn credit_for(&self, prior_year_contribution: f64, ratio: f64) -> f64 {
        (prior_year_contribution.max(0.0) * ratio).min(self.annual_cap)
    }
}

/// Inputs for one PDS simulation pass
#[derive(Debug, Clone)]
pub struct PdsParams {
    /// Calculation date; month 1 is the following calendar month
    pub start_date: NaiveDate,
    pub term_months: u32,
    /// Client contribution in month 1
    pub monthly_contribution: f64,
    pub monthly_indexation: f64,
    pub monthly_yield: f64,
    pub avg_monthly_income: f64,
}

/// One calendar year of the PDS breakdown
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PdsYear {
    pub year: i32,
    pub start_balance: f64,
    pub own_contribution: f64,
    pub cofinancing: f64,
    pub investment_income: f64,
    pub end_balance: f64,
    pub tax_refund: f64,
}

impl PdsYear {
    fn opening(year: i32, balance: f64) -> Self {
        Self {
            year,
            start_balance: balance,
            own_contribution: 0.0,
            cofinancing: 0.0,
            investment_income: 0.0,
            end_balance: balance,
            tax_refund: 0.0,
        }
    }
}

/// Result of a PDS simulation pass
#[derive(Debug, Clone, PartialEq)]
pub struct PdsSimulation {
    pub participation_start_year: i32,
    pub own_balance: f64,
    pub state_balance: f64,
    pub total_contributions: f64,
    pub total_cofinancing: f64,
    /// Co-financing credited per calendar year
    pub credits: BTreeMap<i32, f64>,
    /// Client contributions per calendar year
    pub contributions_by_year: BTreeMap<i32, f64>,
    pub yearly: Vec<PdsYear>,
}

/// Calendar (year, month) of projection month `m`, month 1 following `start`
pub fn calendar_month(start: NaiveDate, m: u32) -> (i32, u32) {
    let total = start.year() * 12 + start.month0() as i32 + m as i32;
    (total.div_euclid(12), total.rem_euclid(12) as u32 + 1)
}

/// Monthly state machine for co-financed PDS savings
#[derive(Debug, Clone, Copy)]
pub struct PdsCofinancingSimulator<'a> {
    terms: &'a CofinancingTerms,
}

impl<'a> PdsCofinancingSimulator<'a> {
    pub fn new(terms: &'a CofinancingTerms) -> Self {
        Self { terms }
    }

    /// Run one pass of the monthly PDS state machine.
    ///
    /// # Arguments
    /// * `params` - Start date, term, contribution series, yield and income of the goal
    /// * `used` - Co-financing already credited per year to earlier goals in the run;
    ///   read, never written
    ///
    /// # Returns
    /// * `PdsSimulation` - Own and state balances at the horizon, credits and
    ///   contributions per year, and the yearly breakdown
    pub fn simulate(&self, params: &PdsParams, used: &BTreeMap<i32, f64>) -> PdsSimulation {
        // Participation starts in the calendar year of month 1
        let (start_year, _) = calendar_month(params.start_date, 1);
        let ratio = self.terms.ratio_for_income(params.avg_monthly_income);

        let mut own = 0.0;
        let mut state = 0.0;
        let mut total_contributions = 0.0;
        let mut total_cofinancing = 0.0;
        let mut credits = BTreeMap::new();
        let mut contributions_by_year: BTreeMap<i32, f64> = BTreeMap::new();
        let mut yearly = Vec::new();
        let mut current = PdsYear::opening(start_year, 0.0);

        for m in 1..=params.term_months {
            let (year, month) = calendar_month(params.start_date, m);
            // Close the previous year's row on a year boundary
            if year != current.year {
                let opening = PdsYear::opening(year, own + state);
                yearly.push(std::mem::replace(&mut current, opening));
            }

            // Both balances earn the same yield, before this month's cash lands
            let growth = (own + state) * params.monthly_yield;
            own *= 1.0 + params.monthly_yield;
            state *= 1.0 + params.monthly_yield;
            current.investment_income += growth;

            // Own contribution, indexed from month 1
            let contribution =
                params.monthly_contribution * (1.0 + params.monthly_indexation).powi(m as i32 - 1);
            own += contribution;
            total_contributions += contribution;
            current.own_contribution += contribution;
            *contributions_by_year.entry(year).or_insert(0.0) += contribution;

            // State credit: once a year in the credit month, on last year's
            // contributions, inside the participation window and under what
            // earlier goals left of this year's cap
            let years_since_start = (year - start_year) as u32;
            if month == self.terms.credit_month && year > start_year && years_since_start <= self.terms.max_years {
                let prior = contributions_by_year.get(&(year - 1)).copied().unwrap_or(0.0);
                let available = (self.terms.annual_cap - used.get(&year).copied().unwrap_or(0.0)).max(0.0);
                let credited = self.terms.credit_for(prior, ratio).min(available);
                if credited > 0.0 {
                    state += credited;
                    total_cofinancing += credited;
                    current.cofinancing += credited;
                    *credits.entry(year).or_insert(0.0) += credited;
                }
            }

            current.end_balance = own + state;
        }
        // The last, possibly partial, year
        if params.term_months > 0 {
            yearly.push(current);
        }

        PdsSimulation {
            participation_start_year: start_year,
            own_balance: own,
            state_balance: state,
            total_contributions,
            total_cofinancing,
            credits,
            contributions_by_year,
            yearly,
        }
    }
}

impl PdsSimulation {
    /// Compute delta-method refunds on each year's contributions and record
    /// them in the yearly breakdown. Inputs are the run's per-year used
    /// deduction base and refunds already granted; returned maps hold this
    /// goal's additions only.
    pub fn apply_tax_refunds(
        &mut self,
        engine: &ProgressiveTaxEngine<'_>,
        annual_income: f64,
        used_base: &BTreeMap<i32, f64>,
        refunded: &BTreeMap<i32, f64>,
    ) -> TaxRefundSchedule {
        let schedule = refund_schedule(engine, annual_income, &self.contributions_by_year, used_base, refunded);
        for row in &mut self.yearly {
            row.tax_refund = schedule.refunds.get(&row.year).copied().unwrap_or(0.0);
        }
        schedule
    }
}

/// Refunds and deduction base consumed, per year
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaxRefundSchedule {
    pub refunds: BTreeMap<i32, f64>,
    pub base_applied: BTreeMap<i32, f64>,
}

impl TaxRefundSchedule {
    pub fn total_refund(&self) -> f64 {
        self.refunds.values().sum()
    }
}

/// Delta-method refunds for a series of yearly deductible payments
pub fn refund_schedule(
    engine: &ProgressiveTaxEngine<'_>,
    annual_income: f64,
    payments_by_year: &BTreeMap<i32, f64>,
    used_base: &BTreeMap<i32, f64>,
    refunded: &BTreeMap<i32, f64>,
) -> TaxRefundSchedule {
    let mut schedule = TaxRefundSchedule::default();
    // Each year stands alone: its own limit, its own tax paid
    for (&year, &paid) in payments_by_year {
        let before = used_base.get(&year).copied().unwrap_or(0.0);
        let already = refunded.get(&year).copied().unwrap_or(0.0);
        let result = engine.capped_refund(year, annual_income, paid, before, already);
        schedule.refunds.insert(year, result.refund);
        schedule.base_applied.insert(year, result.base_applied);
    }
    schedule
}
