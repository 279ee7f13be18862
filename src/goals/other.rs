//! Lump-sum purchase priced today and bought at the end of the term

use super::funding::fund_goal;
use super::result::{GoalDetails, GoalResult};
use super::{inflate, GoalCalculator, GoalInput, RunContext, Services};
use crate::error::PlanError;
use crate::projection::ReplenishmentSolver;

pub struct OtherCalculator;

impl GoalCalculator for OtherCalculator {
    fn calculate(
        &self,
        input: &GoalInput<'_>,
        ctx: &mut RunContext,
        services: &Services<'_>,
    ) -> Result<GoalResult, PlanError> {
        let inflation = input.inflation_rate(&ctx.settings);
        let target = inflate(input.goal.target_amount, inflation, input.term_months);

        let outcome = fund_goal(input, target, ReplenishmentSolver::bisection(), ctx, services)?;
        let details = GoalDetails {
            capital_projection: Some(outcome.projection),
            pds_cofinancing: outcome.pds,
            ..GoalDetails::default()
        };
        Ok(GoalResult::success(input.goal, outcome.summary, details))
    }
}
