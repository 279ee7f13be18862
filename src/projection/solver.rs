//! Required monthly contribution for a target ending balance
//!
//! Two methods share one contract: the smallest month-1 contribution whose
//! indexed series, run through the simulator, reaches the target.
//!
//! - Bisection over `[0, target]`, fixed iteration count. Works with any
//!   inflow pattern.
//! - Closed form: the ending balance is linear in the contribution, so the
//!   gap over the zero-contribution baseline is divided by the future value
//!   of a unit indexed annuity:
//!   `((1+y)^T - (1+g)^T) / (y - g)`, or `T (1+y)^(T-1)` when `y == g`.

use log::debug;
use serde::{Deserialize, Serialize};

use super::compounding::MonthlyCompoundingSimulator;
use crate::error::PlanError;

pub const BISECTION_ITERATIONS: u32 = 40;

/// Rates closer than this are treated as equal in the closed form
const RATE_EPSILON: f64 = 1e-12;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SolverMethod {
    Bisection,
    ClosedForm,
}

/// Solver outcome
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Replenishment {
    pub monthly_contribution: f64,
    /// Simulated ending balance at that contribution
    pub final_balance: f64,
    pub method: SolverMethod,
}

#[derive(Debug, Clone, Copy)]
pub struct ReplenishmentSolver {
    method: SolverMethod,
}

impl ReplenishmentSolver {
    pub fn new(method: SolverMethod) -> Self {
        Self { method }
    }

    pub fn bisection() -> Self {
        Self::new(SolverMethod::Bisection)
    }

    pub fn closed_form() -> Self {
        Self::new(SolverMethod::ClosedForm)
    }

    pub fn method(&self) -> SolverMethod {
        self.method
    }

    /// Solve for the month-1 contribution that reaches `target`.
    ///
    /// # Arguments
    /// * `sim` - Simulator carrying the capital, rates, term and inflows of the goal
    /// * `target` - Required ending balance, in future money
    ///
    /// # Returns
    /// * `Result<Replenishment, PlanError>` - Contribution and the balance it produces;
    ///   `Computation` when no non-negative contribution reaches the target
    pub fn solve(&self, sim: &MonthlyCompoundingSimulator, target: f64) -> Result<Replenishment, PlanError> {
        if !target.is_finite() {
            return Err(PlanError::Computation(format!("non-finite target {}", target)));
        }

        // Capital and inflows alone may already cover the target
        let baseline = sim.final_balance(0.0);
        if baseline >= target {
            return Ok(Replenishment {
                monthly_contribution: 0.0,
                final_balance: baseline,
                method: self.method,
            });
        }
        if sim.term_months() == 0 {
            return Err(PlanError::Computation(
                "cannot reach target with a zero-month term".to_string(),
            ));
        }

        let contribution = match self.method {
            SolverMethod::Bisection => bisect(sim, target)?,
            SolverMethod::ClosedForm => closed_form(sim, target - baseline)?,
        };
        let final_balance = sim.final_balance(contribution);
        debug!(
            "{:?} solve: target {:.2}, contribution {:.2}, balance {:.2}",
            self.method, target, contribution, final_balance
        );

        Ok(Replenishment {
            monthly_contribution: contribution,
            final_balance,
            method: self.method,
        })
    }
}

fn bisect(sim: &MonthlyCompoundingSimulator, target: f64) -> Result<f64, PlanError> {
    let mut lo = 0.0;
    let mut hi = target;

    // Depositing the whole target every month must overshoot, otherwise
    // there is no bracket to search
    if sim.final_balance(hi) < target {
        return Err(PlanError::Computation(format!(
            "no contribution up to {:.2} reaches the target",
            target
        )));
    }

    // Keep `hi` on the reaching side so the result never undershoots
    for _ in 0..BISECTION_ITERATIONS {
        let mid = 0.5 * (lo + hi);
        if sim.final_balance(mid) >= target {
            hi = mid;
        } else {
            lo = mid;
        }
    }

    Ok(hi)
}

/// Future value of a unit month-1 contribution indexed at `g`, grown at `y`
pub fn annuity_factor(monthly_yield: f64, monthly_indexation: f64, term_months: u32) -> f64 {
    let t = term_months as i32;
    let (y, g) = (monthly_yield, monthly_indexation);
    if (y - g).abs() < RATE_EPSILON {
        // Limit of the geometric ratio as g -> y
        term_months as f64 * (1.0 + y).powi(t - 1)
    } else {
        ((1.0 + y).powi(t) - (1.0 + g).powi(t)) / (y - g)
    }
}

fn closed_form(sim: &MonthlyCompoundingSimulator, gap: f64) -> Result<f64, PlanError> {
    let factor = annuity_factor(sim.monthly_yield(), sim.monthly_indexation(), sim.term_months());
    if !factor.is_finite() || factor <= 0.0 {
        return Err(PlanError::Computation(format!("degenerate annuity factor {}", factor)));
    }
    Ok(gap / factor)
}
