//! Funding pipeline shared by the capital goals
//!
//! 1. Own capital and dedicated assets grow at the INITIAL_CAPITAL yield.
//! 2. Any residual gap is covered from the shared pool at the same yield.
//! 3. The rest is solved as an indexed monthly contribution at the TOP_UP
//!    yield. When the TOP_UP bucket holds a PDS product, a first pass
//!    estimates the state co-financing balance, the contribution is re-solved
//!    for the reduced gap, and a second pass produces the reported figures.
//!    Only the second pass is committed to the run context.

use log::debug;

use super::context::RunContext;
use super::result::{CapitalProjection, GoalStatus, GoalSummary, PdsCofinancingDetail};
use super::{GoalInput, Services};
use crate::catalog::Bucket;
use crate::error::PlanError;
use crate::projection::{BlendedYield, MonthlyCompoundingSimulator, ReplenishmentSolver, YieldCurveResolver};
use crate::tax::PdsParams;

/// Bucket yields for one goal
#[derive(Debug, Clone, PartialEq)]
pub struct FundingRates {
    pub capital: BlendedYield,
    pub top_up: BlendedYield,
}

/// Look up the goal's model portfolio and blend both buckets. An empty
/// bucket borrows the other bucket's yield.
pub fn resolve_rates(
    input: &GoalInput<'_>,
    capital_amount: f64,
    target_future_value: f64,
    services: &Services<'_>,
) -> Result<FundingRates, PlanError> {
    let goal = input.goal;
    let term = input.term_months;

    let portfolio = services
        .portfolios
        .find_by_criteria(goal.goal_type, target_future_value, term)
        .ok_or_else(|| {
            PlanError::NotFound(format!(
                "no {} portfolio for amount {:.2} and term {}",
                goal.goal_type.as_str(),
                target_future_value,
                term
            ))
        })?;
    let profile = portfolio.profile(goal.risk_profile).ok_or_else(|| {
        PlanError::NotFound(format!(
            "portfolio {} has no {} risk profile",
            portfolio.id,
            goal.risk_profile.as_str()
        ))
    })?;

    let resolver = YieldCurveResolver::new(services.products);
    let capital = resolver.resolve(&profile.bucket(Bucket::InitialCapital), term, capital_amount)?;
    let top_up = resolver.resolve(&profile.bucket(Bucket::TopUp), term, target_future_value)?;

    match (capital, top_up) {
        (Some(capital), Some(top_up)) => Ok(FundingRates { capital, top_up }),
        (Some(capital), None) => Ok(FundingRates { top_up: capital.borrowed(), capital }),
        (None, Some(top_up)) => Ok(FundingRates { capital: top_up.borrowed(), top_up }),
        (None, None) => Err(PlanError::NotFound(format!(
            "portfolio {} has no instruments for {}",
            portfolio.id,
            goal.risk_profile.as_str()
        ))),
    }
}

/// Everything the pipeline produced for one goal
#[derive(Debug, Clone)]
pub struct FundingOutcome {
    pub summary: GoalSummary,
    pub projection: CapitalProjection,
    pub pds: Option<PdsCofinancingDetail>,
}

/// Contribution leg after solving
struct ContributionLeg {
    monthly_contribution: f64,
    value: f64,
    total_contributions: f64,
    state_benefit: f64,
    pds: Option<PdsCofinancingDetail>,
}

impl ContributionLeg {
    fn none() -> Self {
        Self {
            monthly_contribution: 0.0,
            value: 0.0,
            total_contributions: 0.0,
            state_benefit: 0.0,
            pds: None,
        }
    }
}

/// Fund `target_future_value` at the goal's horizon
pub fn fund_goal(
    input: &GoalInput<'_>,
    target_future_value: f64,
    solver: ReplenishmentSolver,
    ctx: &mut RunContext,
    services: &Services<'_>,
) -> Result<FundingOutcome, PlanError> {
    let goal = input.goal;
    let term = input.term_months;
    let dedicated = input.dedicated_total();

    let rates = resolve_rates(input, goal.initial_capital + dedicated, target_future_value, services)?;
    let capital_rate = rates.capital.monthly_rate();

    let capital_sim = MonthlyCompoundingSimulator::new(goal.initial_capital, capital_rate, term)
        .with_inflows(input.dedicated.iter().copied());
    let capital_value = capital_sim.final_balance(0.0);

    // Draws are taken from a copy and only kept once the contribution leg
    // has been solved
    let mut pool = ctx.pool.clone();
    let mut gap = target_future_value - capital_value;
    let pool_draws = if gap > 0.0 {
        pool.draw(gap, term, capital_rate)
    } else {
        Vec::new()
    };
    let pool_value: f64 = pool_draws.iter().map(|d| d.value_at_horizon).sum();
    gap -= pool_value;

    let top_up_sim = MonthlyCompoundingSimulator::new(0.0, rates.top_up.monthly_rate(), term)
        .with_indexation(ctx.settings.monthly_indexation());

    let leg = if gap <= 0.0 {
        ContributionLeg::none()
    } else if rates.top_up.pds_share > 0.0 {
        pds_contribution(input, gap, &top_up_sim, rates.top_up.pds_share, solver, ctx)?
    } else {
        let solved = solver.solve(&top_up_sim, gap)?;
        ContributionLeg {
            monthly_contribution: solved.monthly_contribution,
            value: solved.final_balance,
            total_contributions: top_up_sim.project(solved.monthly_contribution).total_contributions,
            state_benefit: 0.0,
            pds: None,
        }
    };
    ctx.pool = pool;

    let projected_capital = capital_value + pool_value + leg.value;
    let tolerance = ctx.settings.goal_status_tolerance;
    let status = if projected_capital >= target_future_value * (1.0 - tolerance) {
        GoalStatus::Ok
    } else {
        GoalStatus::Gap
    };
    debug!(
        "Goal '{}': target {:.2}, capital {:.2}, pool {:.2}, contributions {:.2} -> {:?}",
        goal.name, target_future_value, capital_value, pool_value, leg.value, status
    );

    let summary = GoalSummary {
        status,
        term_months: term,
        target_future_value,
        recommended_monthly_contribution: leg.monthly_contribution,
        projected_capital,
        state_benefit: leg.state_benefit,
        capital_yield_pct: rates.capital.annual_pct,
        top_up_yield_pct: rates.top_up.annual_pct,
        pool_used: pool_value,
    };
    let projection = CapitalProjection {
        initial_capital: goal.initial_capital,
        dedicated_assets: dedicated,
        capital_value,
        pool_draws,
        pool_value,
        contribution_value: leg.value,
        total_contributions: leg.total_contributions,
        capital_yield_pct: rates.capital.annual_pct,
        top_up_yield_pct: rates.top_up.annual_pct,
        capital_instruments: rates.capital.instruments,
        top_up_instruments: rates.top_up.instruments,
        solver: solver.method(),
    };

    Ok(FundingOutcome { summary, projection, pds: leg.pds })
}

/// Two-pass contribution solve with co-financing and tax refunds
fn pds_contribution(
    input: &GoalInput<'_>,
    gap: f64,
    top_up_sim: &MonthlyCompoundingSimulator,
    pds_share: f64,
    solver: ReplenishmentSolver,
    ctx: &mut RunContext,
) -> Result<ContributionLeg, PlanError> {
    let params = |monthly_contribution: f64| PdsParams {
        start_date: ctx.calculation_date,
        term_months: top_up_sim.term_months(),
        monthly_contribution: monthly_contribution * pds_share,
        monthly_indexation: top_up_sim.monthly_indexation(),
        monthly_yield: top_up_sim.monthly_yield(),
        avg_monthly_income: input.client.avg_monthly_income,
    };
    let simulator = ctx.settings.cofinancing_simulator();

    let first = solver.solve(top_up_sim, gap)?;
    let estimate = simulator.simulate(&params(first.monthly_contribution), &ctx.used_cofinancing);

    let corrected = solver.solve(top_up_sim, (gap - estimate.state_balance).max(0.0))?;
    let corrected_params = params(corrected.monthly_contribution);
    let mut pds = simulator.simulate(&corrected_params, &ctx.used_cofinancing);
    let refunds = pds.apply_tax_refunds(
        &ctx.settings.tax_engine(),
        input.client.annual_income(),
        &ctx.used_tax_base,
        &ctx.used_tax_refund,
    );
    debug!(
        "PDS passes for '{}': contribution {:.2} -> {:.2}, co-financing {:.2}",
        input.goal.name, first.monthly_contribution, corrected.monthly_contribution, pds.total_cofinancing
    );

    ctx.commit_cofinancing(&pds.credits);
    ctx.commit_tax_refunds(&refunds);

    let total_tax_refund = refunds.total_refund();
    Ok(ContributionLeg {
        monthly_contribution: corrected.monthly_contribution,
        value: corrected.final_balance + pds.state_balance,
        total_contributions: top_up_sim.project(corrected.monthly_contribution).total_contributions,
        state_benefit: pds.total_cofinancing + total_tax_refund,
        pds: Some(PdsCofinancingDetail {
            pds_share,
            monthly_pds_contribution: corrected_params.monthly_contribution,
            participation_start_year: pds.participation_start_year,
            estimated_state_balance: estimate.state_balance,
            own_balance: pds.own_balance,
            state_balance: pds.state_balance,
            total_contributions: pds.total_contributions,
            total_cofinancing: pds.total_cofinancing,
            total_tax_refund,
            yearly: pds.yearly,
        }),
    })
}
