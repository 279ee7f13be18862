//! Life-insurance (NSJ) goals
//!
//! The premium comes from an external quoting service. When the service
//! fails and the goal was created by an advisor, the smart engine estimates
//! the premium instead: the closed-form contribution that accumulates the
//! sum insured at a fallback yield, grossed up by a risk load. Premiums paid
//! each calendar year earn income tax refunds.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use log::warn;
use serde::{Deserialize, Serialize};

use super::result::{GoalDetails, GoalResult, GoalStatus, GoalSummary, NsjCalculation, QuoteSource};
use super::{GoalCalculator, GoalInput, RunContext, Services};
use crate::client::{PaymentVariant, Sex};
use crate::error::PlanError;
use crate::projection::{annuity_factor, monthly_rate};
use crate::tax::{calendar_month, refund_schedule};

/// Parameters sent to the quoting service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LifeQuoteRequest {
    pub birth_date: NaiveDate,
    pub sex: Sex,
    pub term_months: u32,
    pub sum_insured: f64,
    pub payment_variant: PaymentVariant,
    pub program: Option<String>,
    pub calculation_date: NaiveDate,
}

/// Premium per payment under the requested variant
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LifeQuote {
    pub premium: f64,
}

pub trait LifeQuoteService {
    fn quote(&self, request: &LifeQuoteRequest) -> Result<LifeQuote, PlanError>;
}

/// Service used when no quoting backend is configured; every call fails
#[derive(Debug, Clone, Copy, Default)]
pub struct UnavailableLifeQuotes;

impl LifeQuoteService for UnavailableLifeQuotes {
    fn quote(&self, _request: &LifeQuoteRequest) -> Result<LifeQuote, PlanError> {
        Err(PlanError::ExternalService("life quoting service is not configured".to_string()))
    }
}

/// Approximate premium when no quote is available
#[derive(Debug, Clone, Copy)]
pub struct SmartEngine {
    pub yield_pct: f64,
    pub risk_load: f64,
}

impl SmartEngine {
    pub fn premium(&self, request: &LifeQuoteRequest) -> Result<f64, PlanError> {
        let rate = monthly_rate(self.yield_pct);
        let term = request.term_months;
        let load = 1.0 + self.risk_load;

        let premium = match request.payment_variant {
            PaymentVariant::Single => request.sum_insured * (1.0 + rate).powi(-(term as i32)),
            variant => {
                let factor = annuity_factor(rate, 0.0, term);
                if !factor.is_finite() || factor <= 0.0 {
                    return Err(PlanError::Computation(format!("degenerate annuity factor {}", factor)));
                }
                let monthly = request.sum_insured / factor;
                monthly * (12 / variant.periods_per_year()) as f64
            }
        };
        Ok(premium * load)
    }
}

/// Months (1-based) on which premiums fall due
fn payment_months(variant: PaymentVariant, term_months: u32) -> Vec<u32> {
    match variant.periods_per_year() {
        0 => vec![1],
        periods => {
            let step = (12 / periods) as usize;
            (1..=term_months).step_by(step).collect()
        }
    }
}

pub struct LifeCalculator;

impl GoalCalculator for LifeCalculator {
    fn calculate(
        &self,
        input: &GoalInput<'_>,
        ctx: &mut RunContext,
        services: &Services<'_>,
    ) -> Result<GoalResult, PlanError> {
        let goal = input.goal;
        let request = LifeQuoteRequest {
            birth_date: input.client.require_birth_date()?,
            sex: input.client.require_sex()?,
            term_months: input.term_months,
            sum_insured: goal.target_amount,
            payment_variant: goal.payment_variant.unwrap_or_default(),
            program: goal.program.clone(),
            calculation_date: ctx.calculation_date,
        };

        let (premium, source, yield_pct) = match services.life_quotes.quote(&request) {
            Ok(quote) => (quote.premium, QuoteSource::External, 0.0),
            Err(err) if goal.advisor_originated => {
                warn!("Life quote failed for '{}' ({}), using smart engine estimate", goal.name, err);
                let engine = SmartEngine {
                    yield_pct: ctx.settings.life_fallback_yield_pct,
                    risk_load: ctx.settings.life_risk_load,
                };
                (engine.premium(&request)?, QuoteSource::SmartEngine, engine.yield_pct)
            }
            Err(PlanError::ExternalService(message)) => return Err(PlanError::ExternalService(message)),
            Err(err) => return Err(PlanError::ExternalService(err.to_string())),
        };

        let mut premiums_by_year: BTreeMap<i32, f64> = BTreeMap::new();
        for m in payment_months(request.payment_variant, request.term_months) {
            let (year, _) = calendar_month(ctx.calculation_date, m);
            *premiums_by_year.entry(year).or_insert(0.0) += premium;
        }
        let total_premiums: f64 = premiums_by_year.values().sum();

        let refunds = refund_schedule(
            &ctx.settings.tax_engine(),
            input.client.annual_income(),
            &premiums_by_year,
            &ctx.used_tax_base,
            &ctx.used_tax_refund,
        );
        ctx.commit_tax_refunds(&refunds);
        let total_tax_refund = refunds.total_refund();

        let summary = GoalSummary {
            status: GoalStatus::Ok,
            term_months: request.term_months,
            target_future_value: request.sum_insured,
            recommended_monthly_contribution: total_premiums / request.term_months.max(1) as f64,
            projected_capital: request.sum_insured,
            state_benefit: total_tax_refund,
            capital_yield_pct: yield_pct,
            top_up_yield_pct: yield_pct,
            pool_used: 0.0,
        };
        let details = GoalDetails {
            nsj_calculation: Some(NsjCalculation {
                source,
                program: request.program,
                payment_variant: request.payment_variant,
                sum_insured: request.sum_insured,
                term_months: request.term_months,
                premium,
                periods_per_year: request.payment_variant.periods_per_year(),
                total_premiums,
                premiums_by_year,
                tax_refunds: refunds.refunds,
                total_tax_refund,
            }),
            ..GoalDetails::default()
        };
        Ok(GoalResult::success(goal, summary, details))
    }
}
