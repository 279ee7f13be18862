//! Pension top-up: capital that pays the shortfall between the desired and
//! the projected state pension over the payout period

use super::funding::fund_goal;
use super::result::{GoalDetails, GoalResult, GoalSummary, PensionGap};
use super::{inflate, GoalCalculator, GoalInput, RunContext, Services};
use crate::error::PlanError;
use crate::pension::StatePensionEstimator;
use crate::projection::{monthly_rate, resolve_line_yield, ReplenishmentSolver};

/// Present value of `months` level payments at a monthly rate
pub fn annuity_present_value(payment: f64, monthly_rate: f64, months: u32) -> f64 {
    if monthly_rate.abs() < 1e-12 {
        payment * months as f64
    } else {
        payment * (1.0 - (1.0 + monthly_rate).powi(-(months as i32))) / monthly_rate
    }
}

pub struct PensionCalculator;

impl GoalCalculator for PensionCalculator {
    fn calculate(
        &self,
        input: &GoalInput<'_>,
        ctx: &mut RunContext,
        services: &Services<'_>,
    ) -> Result<GoalResult, PlanError> {
        let goal = input.goal;
        let settings = &ctx.settings;
        let inflation = input.inflation_rate(settings);

        let state_pension =
            StatePensionEstimator::new(settings.pension, inflation).estimate(input.client, ctx.calculation_date)?;

        // Desired and state pension are both priced in the retirement year,
        // whatever funding term the goal carries
        let retirement_months = state_pension.years_to_pension * 12;
        let desired_future = inflate(goal.target_amount, inflation, retirement_months);
        let shortfall = (desired_future - state_pension.monthly_pension).max(0.0);
        let payout_months = settings.pension_payout_months;
        let payout_yield_pct =
            resolve_line_yield(&settings.payout_yields, payout_months, shortfall * payout_months as f64);
        let required_capital = annuity_present_value(shortfall, monthly_rate(payout_yield_pct), payout_months);

        let mut details = GoalDetails {
            pension_gap: Some(PensionGap {
                desired_pension_today: goal.target_amount,
                desired_pension_future: desired_future,
                state_pension_future: state_pension.monthly_pension,
                monthly_shortfall: shortfall,
                payout_months,
                payout_yield_pct,
                required_capital,
            }),
            state_pension: Some(state_pension),
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
