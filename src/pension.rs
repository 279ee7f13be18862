//! State pension estimate from pension points (IPK)
//!
//! Annual point accrual at the current income is
//! `min(10, 10 * capped_contributions / max_contributions)`, with income
//! capped at the maximum salary base. Past points are either supplied or
//! estimated from years worked; future points accrue until retirement.
//! The point cost and fixed payment are inflated to the retirement year.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::client::{Client, WORKING_START_AGE};
use crate::error::PlanError;

/// Maximum points accrued in one year
pub const MAX_ANNUAL_POINTS: f64 = 10.0;

/// Pension formula constants
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PensionConstants {
    /// Employer insurance contribution rate (fraction of salary)
    pub contribution_rate: f64,
    /// Annual salary cap for insurance contributions
    pub max_salary_base: f64,
    /// Value of one pension point, current prices
    pub point_cost: f64,
    /// Fixed monthly payment, current prices
    pub fixed_payment: f64,
    /// Share of full accrual assumed for past working years
    pub past_points_coefficient: f64,
}

impl Default for PensionConstants {
    fn default() -> Self {
        Self {
            contribution_rate: 0.22,
            max_salary_base: 2_759_000.0,
            point_cost: 145.69,
            fixed_payment: 8_907.70,
            past_points_coefficient: 0.7,
        }
    }
}

/// Projected state pension, reported under `state_pension`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatePensionEstimate {
    pub retirement_age: u32,
    pub retirement_year: i32,
    pub years_to_pension: u32,
    pub current_age: u32,
    pub years_worked: u32,
    pub annual_points: f64,
    pub past_points: f64,
    /// Past points were supplied rather than estimated
    pub past_points_known: bool,
    pub future_points: f64,
    pub total_points: f64,
    pub future_point_cost: f64,
    pub future_fixed_payment: f64,
    /// Monthly pension at retirement, in retirement-year prices
    pub monthly_pension: f64,
    /// Same pension discounted to current prices
    pub monthly_pension_today: f64,
}

/// Estimator bound to one set of formula constants
#[derive(Debug, Clone, Copy)]
pub struct StatePensionEstimator {
    constants: PensionConstants,
    inflation_rate: f64,
}

impl StatePensionEstimator {
    pub fn new(constants: PensionConstants, inflation_rate: f64) -> Self {
        Self { constants, inflation_rate }
    }

    /// Points accrued per year at a monthly income
    pub fn annual_points(&self, avg_monthly_income: f64) -> f64 {
        let c = &self.constants;
        let max_contributions = c.max_salary_base * c.contribution_rate;
        if max_contributions <= 0.0 {
            return 0.0;
        }
        let capped_income = (avg_monthly_income.max(0.0) * 12.0).min(c.max_salary_base);
        let capped_contributions = capped_income * c.contribution_rate;
        (MAX_ANNUAL_POINTS * capped_contributions / max_contributions).min(MAX_ANNUAL_POINTS)
    }

    /// Estimate the pension of `client` as seen on `today`
    pub fn estimate(&self, client: &Client, today: NaiveDate) -> Result<StatePensionEstimate, PlanError> {
        let birth = client.require_birth_date()?;
        let sex = client.require_sex()?;

        let retirement_age = sex.retirement_age();
        let retirement_year = birth.year() + retirement_age as i32;
        let years_to_pension = (retirement_year - today.year()).max(0) as u32;
        let current_age = client.age_at(today)?;
        let years_worked = current_age.saturating_sub(WORKING_START_AGE);

        let annual_points = self.annual_points(client.avg_monthly_income);
        let (past_points, past_points_known) = match client.ipk_current {
            Some(points) => (points.max(0.0), true),
            None => (
                annual_points * self.constants.past_points_coefficient * years_worked as f64,
                false,
            ),
        };
        let future_points = annual_points * years_to_pension as f64;
        let total_points = past_points + future_points;

        let inflation_factor = (1.0 + self.inflation_rate).powi(years_to_pension as i32);
        let future_point_cost = self.constants.point_cost * inflation_factor;
        let future_fixed_payment = self.constants.fixed_payment * inflation_factor;
        let monthly_pension = total_points * future_point_cost + future_fixed_payment;

        Ok(StatePensionEstimate {
            retirement_age,
            retirement_year,
            years_to_pension,
            current_age,
            years_worked,
            annual_points,
            past_points,
            past_points_known,
            future_points,
            total_points,
            future_point_cost,
            future_fixed_payment,
            monthly_pension,
            monthly_pension_today: monthly_pension / inflation_factor,
        })
    }
}
