//! Capital growth to an explicit future amount

use super::funding::fund_goal;
use super::result::{GoalDetails, GoalResult};
use super::{GoalCalculator, GoalInput, RunContext, Services};
use crate::error::PlanError;
use crate::projection::ReplenishmentSolver;

pub struct InvestmentCalculator;

impl GoalCalculator for InvestmentCalculator {
    fn calculate(
        &self,
        input: &GoalInput<'_>,
        ctx: &mut RunContext,
        services: &Services<'_>,
    ) -> Result<GoalResult, PlanError> {
        let outcome = fund_goal(input, input.goal.target_amount, ReplenishmentSolver::bisection(), ctx, services)?;
        let details = GoalDetails {
            capital_projection: Some(outcome.projection),
            pds_cofinancing: outcome.pds,
            ..GoalDetails::default()
        };
        Ok(GoalResult::success(input.goal, outcome.summary, details))
    }
}
