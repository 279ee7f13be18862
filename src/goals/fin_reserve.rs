//! Emergency reserve: a short fixed-yield accumulation, always reported as
//! funded

use log::debug;

use super::result::{FinReserveDetail, GoalDetails, GoalResult, GoalStatus, GoalSummary};
use super::{GoalCalculator, GoalInput, RunContext, Services};
use crate::error::PlanError;
use crate::projection::{monthly_rate, MonthlyCompoundingSimulator};

pub struct FinReserveCalculator;

impl GoalCalculator for FinReserveCalculator {
    fn calculate(
        &self,
        input: &GoalInput<'_>,
        ctx: &mut RunContext,
        _services: &Services<'_>,
    ) -> Result<GoalResult, PlanError> {
        let goal = input.goal;
        let months = input.term_months;
        let reserve_months = ctx.settings.fin_reserve_months;
        let income = input.client.avg_monthly_income;
        let target = if goal.target_amount > 0.0 {
            goal.target_amount
        } else {
            reserve_months as f64 * income
        };

        let yield_pct = ctx.settings.fin_reserve_yield_pct;
        let rate = monthly_rate(yield_pct);
        let capital_value = MonthlyCompoundingSimulator::new(goal.initial_capital, rate, months)
            .with_inflows(input.dedicated.iter().copied())
            .final_balance(0.0);

        let mut gap = target - capital_value;
        let pool_value: f64 = if gap > 0.0 {
            ctx.pool.draw(gap, months, rate).iter().map(|d| d.value_at_horizon).sum()
        } else {
            0.0
        };
        gap -= pool_value;

        // Straight-line saving over the term
        let monthly_contribution = if gap > 0.0 { gap / months.max(1) as f64 } else { 0.0 };
        let contribution_value = MonthlyCompoundingSimulator::new(0.0, rate, months).final_balance(monthly_contribution);
        let projected_capital = capital_value + pool_value + contribution_value;
        debug!("Reserve '{}': target {:.2}, contribution {:.2}", goal.name, target, monthly_contribution);

        let summary = GoalSummary {
            status: GoalStatus::Ok,
            term_months: months,
            target_future_value: target,
            recommended_monthly_contribution: monthly_contribution,
            projected_capital,
            state_benefit: 0.0,
            capital_yield_pct: yield_pct,
            top_up_yield_pct: yield_pct,
            pool_used: pool_value,
        };
        let details = GoalDetails {
            fin_reserve: Some(FinReserveDetail {
                reserve_months,
                avg_monthly_income: income,
                target,
                yield_pct,
                capital_value,
                pool_value,
                monthly_contribution,
                projected_capital,
            }),
            ..GoalDetails::default()
        };
        Ok(GoalResult::success(goal, summary, details))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::InMemoryCatalog;
    use crate::client::{Client, Goal, GoalType};
    use crate::goals::life::UnavailableLifeQuotes;
    use crate::goals::pool::{PoolEvent, SharedPool};
    use crate::settings::SettingsSnapshot;
    use approx::assert_relative_eq;
    use chrono::NaiveDate;

    fn run(goal: &Goal, pool: SharedPool) -> GoalResult {
        let catalog = InMemoryCatalog::default();
        let services = Services { products: &catalog, portfolios: &catalog, life_quotes: &UnavailableLifeQuotes };
        let client = Client { avg_monthly_income: 100_000.0, ..Client::default() };
        let date = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        let mut ctx = RunContext::new(date, SettingsSnapshot::defaults(), pool);
        let input = GoalInput { goal, client: &client, term_months: 6, dedicated: Vec::new() };
        FinReserveCalculator.calculate(&input, &mut ctx, &services).unwrap()
    }

    #[test]
    fn test_default_target_from_income() {
        let goal = Goal::new(GoalType::FinReserve, "Reserve", 0.0, 0);
        let result = run(&goal, SharedPool::default());

        let summary = result.summary.unwrap();
        assert_eq!(summary.status, GoalStatus::Ok);
        assert_eq!(summary.target_future_value, 600_000.0);
        assert_relative_eq!(summary.recommended_monthly_contribution, 100_000.0);
        assert!(summary.projected_capital >= 600_000.0);
        assert_eq!(summary.capital_yield_pct, 8.0);
    }

    #[test]
    fn test_pool_covers_reserve() {
        let goal = Goal::new(GoalType::FinReserve, "Reserve", 300_000.0, 6);
        let result = run(&goal, SharedPool::new(vec![PoolEvent::new("cash", 0, 1_000_000.0)]));

        let detail = result.details.fin_reserve.unwrap();
        assert_eq!(detail.monthly_contribution, 0.0);
        assert_relative_eq!(detail.pool_value, 300_000.0, max_relative = 1e-12);
    }
}
