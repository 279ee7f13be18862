//! Goal calculators and the per-run state they share
//!
//! Each goal type has one calculator. The planner picks it with an
//! exhaustive match over `GoalType` and runs goals one at a time against the
//! same `RunContext`.

pub mod context;
pub mod pool;
pub mod funding;
pub mod result;
mod pension;
mod passive_income;
mod investment;
mod other;
mod fin_reserve;
pub mod life;

use chrono::NaiveDate;

use crate::catalog::{PortfolioCatalog, ProductCatalog};
use crate::client::{Client, Goal, GoalType};
use crate::error::PlanError;
use crate::projection::Inflow;
use crate::settings::SettingsSnapshot;

pub use context::RunContext;
pub use pool::{PoolDraw, PoolEvent, SharedPool};
pub use result::{
    CapitalProjection, FinReserveDetail, GoalDetails, GoalError, GoalResult, GoalStatus, GoalSummary, NsjCalculation,
    PassiveIncomeDetail, PdsCofinancingDetail, PensionGap, QuoteSource,
};
pub use pension::PensionCalculator;
pub use passive_income::PassiveIncomeCalculator;
pub use investment::InvestmentCalculator;
pub use other::OtherCalculator;
pub use fin_reserve::FinReserveCalculator;
pub use life::{LifeCalculator, LifeQuote, LifeQuoteRequest, LifeQuoteService, SmartEngine, UnavailableLifeQuotes};

/// External collaborators available to calculators
#[derive(Clone, Copy)]
pub struct Services<'a> {
    pub products: &'a dyn ProductCatalog,
    pub portfolios: &'a dyn PortfolioCatalog,
    pub life_quotes: &'a dyn LifeQuoteService,
}

/// One goal prepared for calculation
#[derive(Debug, Clone)]
pub struct GoalInput<'a> {
    pub goal: &'a Goal,
    pub client: &'a Client,
    /// Resolved term, never 0
    pub term_months: u32,
    /// Dedicated assets as one-off inflows
    pub dedicated: Vec<Inflow>,
}

impl GoalInput<'_> {
    pub fn dedicated_total(&self) -> f64 {
        self.dedicated.iter().map(|i| i.amount).sum()
    }

    /// Goal override, else the system rate
    pub fn inflation_rate(&self, settings: &SettingsSnapshot) -> f64 {
        self.goal.inflation_rate.unwrap_or(settings.inflation_rate)
    }
}

pub trait GoalCalculator {
    fn calculate(
        &self,
        input: &GoalInput<'_>,
        ctx: &mut RunContext,
        services: &Services<'_>,
    ) -> Result<GoalResult, PlanError>;
}

pub fn calculator_for(goal_type: GoalType) -> &'static dyn GoalCalculator {
    match goal_type {
        GoalType::Pension => &PensionCalculator,
        GoalType::PassiveIncome => &PassiveIncomeCalculator,
        GoalType::Investment => &InvestmentCalculator,
        GoalType::Other => &OtherCalculator,
        GoalType::FinReserve => &FinReserveCalculator,
        GoalType::Life => &LifeCalculator,
    }
}

/// Term of a goal; `term_months = 0` is derived where the goal type allows it
pub fn resolve_term(
    goal: &Goal,
    client: &Client,
    settings: &SettingsSnapshot,
    date: NaiveDate,
) -> Result<u32, PlanError> {
    if goal.term_months > 0 {
        return Ok(goal.term_months);
    }
    match goal.goal_type {
        GoalType::Pension | GoalType::PassiveIncome => {
            let months = client.months_to_retirement(date)?;
            if months == 0 {
                Err(PlanError::Validation(format!(
                    "goal '{}': client has already reached retirement age",
                    goal.name
                )))
            } else {
                Ok(months)
            }
        }
        GoalType::FinReserve => Ok(settings.fin_reserve_months),
        GoalType::Investment | GoalType::Other | GoalType::Life => Err(PlanError::Validation(format!(
            "goal '{}': term_months is required for {}",
            goal.name,
            goal.goal_type.as_str()
        ))),
    }
}

/// `amount` in prices `term_months` from now
pub fn inflate(amount: f64, annual_rate: f64, term_months: u32) -> f64 {
    amount * (1.0 + annual_rate).powf(term_months as f64 / 12.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::Sex;
    use approx::assert_relative_eq;

    fn client() -> Client {
        Client {
            birth_date: NaiveDate::from_ymd_opt(1980, 1, 1),
            sex: Some(Sex::Male),
            avg_monthly_income: 100_000.0,
            ..Client::default()
        }
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, 1).unwrap()
    }

    #[test]
    fn test_explicit_term_wins() {
        let goal = Goal::new(GoalType::Pension, "Pension", 50_000.0, 100);
        assert_eq!(resolve_term(&goal, &client(), &SettingsSnapshot::defaults(), date()).unwrap(), 100);
    }

    #[test]
    fn test_term_derived_from_retirement() {
        let settings = SettingsSnapshot::defaults();
        for goal_type in [GoalType::Pension, GoalType::PassiveIncome] {
            let goal = Goal::new(goal_type, "Retire", 50_000.0, 0);
            assert_eq!(resolve_term(&goal, &client(), &settings, date()).unwrap(), 240);
        }

        let reserve = Goal::new(GoalType::FinReserve, "Reserve", 0.0, 0);
        assert_eq!(resolve_term(&reserve, &client(), &settings, date()).unwrap(), 6);
    }

    #[test]
    fn test_term_required() {
        let settings = SettingsSnapshot::defaults();
        for goal_type in [GoalType::Investment, GoalType::Other, GoalType::Life] {
            let goal = Goal::new(goal_type, "No term", 1.0, 0);
            assert!(matches!(resolve_term(&goal, &client(), &settings, date()), Err(PlanError::Validation(_))));
        }
    }

    #[test]
    fn test_retired_client_rejected() {
        let goal = Goal::new(GoalType::Pension, "Pension", 50_000.0, 0);
        let late = NaiveDate::from_ymd_opt(2046, 1, 1).unwrap();
        let result = resolve_term(&goal, &client(), &SettingsSnapshot::defaults(), late);
        assert!(matches!(result, Err(PlanError::Validation(_))));
    }

    #[test]
    fn test_missing_birth_date() {
        let goal = Goal::new(GoalType::Pension, "Pension", 50_000.0, 0);
        let mut c = client();
        c.birth_date = None;
        let result = resolve_term(&goal, &c, &SettingsSnapshot::defaults(), date());
        assert!(matches!(result, Err(PlanError::Validation(_))));
    }

    #[test]
    fn test_inflate() {
        assert_relative_eq!(inflate(100.0, 0.04, 24), 108.16, max_relative = 1e-12);
        assert_eq!(inflate(100.0, 0.04, 0), 100.0);
    }
}
