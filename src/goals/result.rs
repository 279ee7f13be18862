//! Per-goal result and its detail blocks

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::pool::PoolDraw;
use crate::client::{Goal, GoalType, PaymentVariant};
use crate::error::{ErrorKind, PlanError};
use crate::pension::StatePensionEstimate;
use crate::projection::{InstrumentYield, SolverMethod};
use crate::tax::PdsYear;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GoalStatus {
    /// Projected capital reaches the target
    Ok,
    /// Shortfall beyond tolerance
    Gap,
}

/// Headline numbers of a goal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoalSummary {
    pub status: GoalStatus,
    pub term_months: u32,
    pub target_future_value: f64,
    /// Month-1 contribution; later months are indexed
    pub recommended_monthly_contribution: f64,
    pub projected_capital: f64,
    /// Co-financing plus tax refunds
    pub state_benefit: f64,
    pub capital_yield_pct: f64,
    pub top_up_yield_pct: f64,
    /// Value of shared-pool draws at the horizon
    pub pool_used: f64,
}

impl GoalSummary {
    /// Summary of a goal that needs no funding
    pub fn funded(term_months: u32) -> Self {
        Self {
            status: GoalStatus::Ok,
            term_months,
            target_future_value: 0.0,
            recommended_monthly_contribution: 0.0,
            projected_capital: 0.0,
            state_benefit: 0.0,
            capital_yield_pct: 0.0,
            top_up_yield_pct: 0.0,
            pool_used: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PensionGap {
    pub desired_pension_today: f64,
    pub desired_pension_future: f64,
    pub state_pension_future: f64,
    pub monthly_shortfall: f64,
    pub payout_months: u32,
    pub payout_yield_pct: f64,
    pub required_capital: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PassiveIncomeDetail {
    pub desired_income_today: f64,
    pub desired_income_future: f64,
    pub payout_yield_pct: f64,
    pub required_capital: f64,
}

/// How the target is covered: own capital, pool draws, contributions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapitalProjection {
    pub initial_capital: f64,
    pub dedicated_assets: f64,
    /// Own capital and dedicated assets at the horizon
    pub capital_value: f64,
    pub pool_draws: Vec<PoolDraw>,
    pub pool_value: f64,
    /// Contributions (and co-financing) at the horizon
    pub contribution_value: f64,
    pub total_contributions: f64,
    pub capital_yield_pct: f64,
    pub top_up_yield_pct: f64,
    pub capital_instruments: Vec<InstrumentYield>,
    pub top_up_instruments: Vec<InstrumentYield>,
    pub solver: SolverMethod,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PdsCofinancingDetail {
    pub pds_share: f64,
    /// Month-1 contribution routed to the PDS product
    pub monthly_pds_contribution: f64,
    pub participation_start_year: i32,
    /// State balance estimated by the first pass
    pub estimated_state_balance: f64,
    pub own_balance: f64,
    pub state_balance: f64,
    pub total_contributions: f64,
    pub total_cofinancing: f64,
    pub total_tax_refund: f64,
    pub yearly: Vec<PdsYear>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QuoteSource {
    External,
    SmartEngine,
}

/// Life-insurance (NSJ) premium and refunds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NsjCalculation {
    pub source: QuoteSource,
    pub program: Option<String>,
    pub payment_variant: PaymentVariant,
    pub sum_insured: f64,
    pub term_months: u32,
    pub premium: f64,
    pub periods_per_year: u32,
    pub total_premiums: f64,
    pub premiums_by_year: BTreeMap<i32, f64>,
    pub tax_refunds: BTreeMap<i32, f64>,
    pub total_tax_refund: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinReserveDetail {
    pub reserve_months: u32,
    pub avg_monthly_income: f64,
    pub target: f64,
    pub yield_pct: f64,
    pub capital_value: f64,
    pub pool_value: f64,
    pub monthly_contribution: f64,
    pub projected_capital: f64,
}

/// Type-specific blocks, flattened into the goal result
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GoalDetails {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_pension: Option<StatePensionEstimate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pension_gap: Option<PensionGap>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub passive_income: Option<PassiveIncomeDetail>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capital_projection: Option<CapitalProjection>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pds_cofinancing: Option<PdsCofinancingDetail>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nsj_calculation: Option<NsjCalculation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fin_reserve: Option<FinReserveDetail>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoalError {
    pub kind: ErrorKind,
    pub message: String,
}

impl From<&PlanError> for GoalError {
    fn from(err: &PlanError) -> Self {
        Self {
            kind: err.kind(),
            message: err.message().to_string(),
        }
    }
}

/// Outcome of one goal: a summary with details, or an error
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoalResult {
    pub goal_name: String,
    pub goal_type: GoalType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<GoalSummary>,
    #[serde(flatten)]
    pub details: GoalDetails,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<GoalError>,
}

impl GoalResult {
    pub fn success(goal: &Goal, summary: GoalSummary, details: GoalDetails) -> Self {
        Self {
            goal_name: goal.name.clone(),
            goal_type: goal.goal_type,
            summary: Some(summary),
            details,
            error: None,
        }
    }

    pub fn failure(goal: &Goal, err: &PlanError) -> Self {
        Self {
            goal_name: goal.name.clone(),
            goal_type: goal.goal_type,
            summary: None,
            details: GoalDetails::default(),
            error: Some(GoalError::from(err)),
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_result_shape() {
        let goal = Goal::new(GoalType::Pension, "Pension", 100_000.0, 0);
        let result = GoalResult::failure(&goal, &PlanError::Validation("client birth_date is required".to_string()));
        let json = serde_json::to_value(&result).unwrap();

        assert_eq!(json["goal_name"], "Pension");
        assert_eq!(json["goal_type"], "PENSION");
        assert_eq!(json["error"]["kind"], "VALIDATION");
        assert_eq!(json["error"]["message"], "client birth_date is required");
        assert!(json.get("summary").is_none());
        assert!(json.get("state_pension").is_none());
    }

    #[test]
    fn test_details_flattened() {
        let goal = Goal::new(GoalType::FinReserve, "Reserve", 600_000.0, 6);
        let details = GoalDetails {
            fin_reserve: Some(FinReserveDetail {
                reserve_months: 6,
                avg_monthly_income: 100_000.0,
                target: 600_000.0,
                yield_pct: 8.0,
                capital_value: 0.0,
                pool_value: 0.0,
                monthly_contribution: 100_000.0,
                projected_capital: 605_000.0,
            }),
            ..GoalDetails::default()
        };
        let result = GoalResult::success(&goal, GoalSummary::funded(6), details);
        let json = serde_json::to_value(&result).unwrap();

        assert_eq!(json["summary"]["status"], "OK");
        assert_eq!(json["fin_reserve"]["reserve_months"], 6);
        assert!(json.get("error").is_none());
    }
}
