//! Passive income: capital whose payout yield covers the desired monthly
//! income indefinitely

use super::funding::fund_goal;
use super::result::{GoalDetails, GoalResult, GoalSummary, PassiveIncomeDetail};
use super::{inflate, GoalCalculator, GoalInput, RunContext, Services};
use crate::error::PlanError;
use crate::projection::{resolve_line_yield, ReplenishmentSolver};

pub struct PassiveIncomeCalculator;

impl GoalCalculator for PassiveIncomeCalculator {
    fn calculate(
        &self,
        input: &GoalInput<'_>,
        ctx: &mut RunContext,
        services: &Services<'_>,
    ) -> Result<GoalResult, PlanError> {
        let goal = input.goal;
        let inflation = input.inflation_rate(&ctx.settings);
        let desired_future = inflate(goal.target_amount, inflation, input.term_months);
        let annual_income = desired_future * 12.0;

        let payout_yield_pct = resolve_line_yield(&ctx.settings.payout_yields, input.term_months, annual_income);
        if payout_yield_pct <= 0.0 {
            return Err(PlanError::Computation(format!(
                "payout yield {:.2}% cannot fund a perpetual income",
                payout_yield_pct
            )));
        }
        let required_capital = annual_income / (payout_yield_pct / 100.0);

        let mut details = GoalDetails {
            passive_income: Some(PassiveIncomeDetail {
                desired_income_today: goal.target_amount,
                desired_income_future: desired_future,
                payout_yield_pct,
                required_capital,
            }),
            ..GoalDetails::default()
        };

        if required_capital <= 0.0 {
            return Ok(GoalResult::success(goal, GoalSummary::funded(input.term_months), details));
        }

        let outcome = fund_goal(input, required_capital, ReplenishmentSolver::closed_form(), ctx, services)?;
        details.capital_projection = Some(outcome.projection);
        details.pds_cofinancing = outcome.pds;
        Ok(GoalResult::success(goal, outcome.summary, details))
    }
}
