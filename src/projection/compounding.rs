//! Month-by-month capital projection
//!
//! Every month the balance first earns the monthly yield, then receives the
//! month's contribution and any one-off inflows. The contribution for month
//! `m` is `base * (1 + indexation)^(m - 1)`.

use serde::{Deserialize, Serialize};

/// One-off amount arriving at a projection month (0 = at the start)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Inflow {
    pub month: u32,
    pub amount: f64,
}

impl Inflow {
    pub fn new(month: u32, amount: f64) -> Self {
        Self { month, amount }
    }
}

/// A single month of projection output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompoundingRow {
    pub month: u32,
    pub start_balance: f64,
    pub growth: f64,
    pub contribution: f64,
    pub inflow: f64,
    pub end_balance: f64,
}

/// Full projection with totals
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompoundingResult {
    pub final_balance: f64,
    pub total_contributions: f64,
    pub total_inflows: f64,
    pub investment_income: f64,
    pub rows: Vec<CompoundingRow>,
}

/// Projector for one funding leg
#[derive(Debug, Clone, PartialEq)]
pub struct MonthlyCompoundingSimulator {
    initial_capital: f64,
    monthly_yield: f64,
    monthly_indexation: f64,
    term_months: u32,
    inflows: Vec<Inflow>,
}

impl MonthlyCompoundingSimulator {
    pub fn new(initial_capital: f64, monthly_yield: f64, term_months: u32) -> Self {
        Self {
            initial_capital,
            monthly_yield,
            monthly_indexation: 0.0,
            term_months,
            inflows: Vec::new(),
        }
    }

    pub fn with_indexation(mut self, monthly_indexation: f64) -> Self {
        self.monthly_indexation = monthly_indexation;
        self
    }

    /// Inflows after the horizon never reach the balance and are dropped
    pub fn with_inflows(mut self, inflows: impl IntoIterator<Item = Inflow>) -> Self {
        let term = self.term_months;
        self.inflows.extend(inflows.into_iter().filter(|i| i.month <= term));
        self
    }

    pub fn term_months(&self) -> u32 {
        self.term_months
    }

    pub fn monthly_yield(&self) -> f64 {
        self.monthly_yield
    }

    pub fn monthly_indexation(&self) -> f64 {
        self.monthly_indexation
    }

    pub fn has_inflows(&self) -> bool {
        !self.inflows.is_empty()
    }

    fn inflow_at(&self, month: u32) -> f64 {
        self.inflows
            .iter()
            .filter(|i| i.month == month)
            .map(|i| i.amount)
            .sum()
    }

    /// Ending balance after `term_months` of compounding.
    ///
    /// # Arguments
    /// * `monthly_contribution` - Deposit made in month 1; later deposits are indexed from it
    ///
    /// # Returns
    /// * `f64` - Balance at the end of the last month, in future money
    pub fn final_balance(&self, monthly_contribution: f64) -> f64 {
        // Month-0 inflows land together with the starting capital
        let mut balance = self.initial_capital + self.inflow_at(0);
        let mut contribution = monthly_contribution;
        for m in 1..=self.term_months {
            // Growth on the opening balance first, so this month's deposit earns nothing yet
            balance *= 1.0 + self.monthly_yield;
            balance += contribution + self.inflow_at(m);

            // Next month's deposit
            contribution *= 1.0 + self.monthly_indexation;
        }
        balance
    }

    /// Project with month-level rows
    pub fn project(&self, monthly_contribution: f64) -> CompoundingResult {
        // Same ordering as `final_balance`, with the components kept per row
        let mut balance = self.initial_capital + self.inflow_at(0);
        let mut total_contributions = 0.0;
        let mut total_inflows = self.inflow_at(0);
        let mut investment_income = 0.0;
        let mut rows = Vec::with_capacity(self.term_months as usize);

        for m in 1..=self.term_months {
            let start_balance = balance;
            let growth = balance * self.monthly_yield;
            let contribution = monthly_contribution * (1.0 + self.monthly_indexation).powi(m as i32 - 1);
            let inflow = self.inflow_at(m);
            balance += growth + contribution + inflow;

            total_contributions += contribution;
            total_inflows += inflow;
            investment_income += growth;
            rows.push(CompoundingRow {
                month: m,
                start_balance,
                growth,
                contribution,
                inflow,
                end_balance: balance,
            });
        }

        CompoundingResult {
            final_balance: balance,
            total_contributions,
            total_inflows,
            investment_income,
            rows,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_growth_before_deposit() {
        let sim = MonthlyCompoundingSimulator::new(0.0, 0.01, 2);
        // Month 1 deposit earns nothing in month 1; it earns month 2 growth
        assert_relative_eq!(sim.final_balance(100.0), 100.0 * 1.01 + 100.0, epsilon = 1e-12);
    }

    #[test]
    fn test_initial_capital_compounds() {
        let sim = MonthlyCompoundingSimulator::new(1_000.0, 0.005, 120);
        assert_relative_eq!(sim.final_balance(0.0), 1_000.0 * 1.005_f64.powi(120), max_relative = 1e-12);
    }

    #[test]
    fn test_indexed_contribution() {
        let sim = MonthlyCompoundingSimulator::new(0.0, 0.0, 3).with_indexation(0.1);
        let result = sim.project(100.0);
        assert_relative_eq!(result.rows[2].contribution, 121.0, epsilon = 1e-9);
        assert_relative_eq!(result.final_balance, 331.0, epsilon = 1e-9);
        assert_relative_eq!(sim.final_balance(100.0), 331.0, epsilon = 1e-9);
    }

    #[test]
    fn test_inflows() {
        let sim = MonthlyCompoundingSimulator::new(0.0, 0.01, 3)
            .with_inflows([Inflow::new(0, 100.0), Inflow::new(2, 50.0), Inflow::new(9, 1e9)]);
        let expected = (100.0 * 1.01 * 1.01 + 50.0) * 1.01;
        assert_relative_eq!(sim.final_balance(0.0), expected, epsilon = 1e-9);

        let result = sim.project(0.0);
        assert_relative_eq!(result.total_inflows, 150.0, epsilon = 1e-12);
        assert_relative_eq!(result.rows[1].inflow, 50.0, epsilon = 1e-12);
    }

    #[test]
    fn test_rows_roll_forward() {
        let sim = MonthlyCompoundingSimulator::new(500.0, 0.007, 24).with_indexation(0.003);
        let result = sim.project(250.0);

        for pair in result.rows.windows(2) {
            assert_relative_eq!(pair[0].end_balance, pair[1].start_balance);
        }
        let rolled = 500.0 + result.total_contributions + result.total_inflows + result.investment_income;
        assert_relative_eq!(rolled, result.final_balance, max_relative = 1e-12);
        assert_relative_eq!(result.final_balance, sim.final_balance(250.0), max_relative = 1e-12);
    }

    #[test]
    fn test_zero_term() {
        let sim = MonthlyCompoundingSimulator::new(10.0, 0.01, 0).with_inflows([Inflow::new(0, 5.0)]);
        assert_eq!(sim.final_balance(100.0), 15.0);
        assert!(sim.project(100.0).rows.is_empty());
    }
}
