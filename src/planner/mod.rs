//! First-run plan calculation
//!
//! A `Planner` holds its collaborators and can serve many requests. Each
//! call resolves a fresh settings snapshot, builds its own `RunContext`,
//! runs the goals one by one in scheduled order and returns results in
//! request order.

mod scheduler;

use chrono::{Local, NaiveDate};
use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::client::{Goal, PlanRequest, MAX_TERM_MONTHS};
use crate::error::PlanError;
use crate::goals::{calculator_for, GoalInput, GoalResult, RunContext, Services, SharedPool};
use crate::projection::Inflow;
use crate::settings::{CofinancingBracketProvider, SettingsProvider, SettingsSnapshot, TaxBracketProvider};

pub use scheduler::{GoalScheduler, ScheduledGoal};

/// Totals over the successful goals
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanSummary {
    pub goals_count: usize,
    pub total_capital: f64,
    /// Co-financing and tax refunds
    pub total_state_benefit: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanResponse {
    pub summary: PlanSummary,
    pub goals: Vec<GoalResult>,
}

impl PlanResponse {
    fn from_results(goals: Vec<GoalResult>) -> Self {
        let successful = goals.iter().filter_map(|g| g.summary.as_ref());
        let (total_capital, total_state_benefit) =
            successful.fold((0.0, 0.0), |(capital, benefit), s| (capital + s.projected_capital, benefit + s.state_benefit));
        Self {
            summary: PlanSummary {
                goals_count: goals.len(),
                total_capital,
                total_state_benefit,
            },
            goals,
        }
    }
}

/// Reject requests that are malformed as a whole, before any goal runs
pub fn validate_request(request: &PlanRequest) -> Result<(), PlanError> {
    let invalid = |field: &str, value: f64| -> Result<(), PlanError> {
        if value.is_finite() && value >= 0.0 {
            Ok(())
        } else {
            Err(PlanError::Validation(format!("{} must be a non-negative number, got {}", field, value)))
        }
    };

    let client = &request.client;
    invalid("client.avg_monthly_income", client.avg_monthly_income)?;
    invalid("client.liquid_capital", client.liquid_capital)?;
    if let Some(points) = client.ipk_current {
        invalid("client.ipk_current", points)?;
    }

    let mut ids: Vec<&str> = Vec::new();
    for goal in &request.goals {
        if goal.name.trim().is_empty() {
            return Err(PlanError::Validation("goal name must not be empty".to_string()));
        }
        invalid(&format!("goal '{}' target_amount", goal.name), goal.target_amount)?;
        invalid(&format!("goal '{}' initial_capital", goal.name), goal.initial_capital)?;
        if goal.term_months > MAX_TERM_MONTHS {
            return Err(PlanError::Validation(format!(
                "goal '{}' term_months {} exceeds {}",
                goal.name, goal.term_months, MAX_TERM_MONTHS
            )));
        }
        if let Some(rate) = goal.inflation_rate {
            if !rate.is_finite() || rate <= -1.0 {
                return Err(PlanError::Validation(format!(
                    "goal '{}' inflation_rate {} is out of range",
                    goal.name, rate
                )));
            }
        }
        if let Some(id) = goal.id.as_deref() {
            if ids.contains(&id) {
                return Err(PlanError::Validation(format!("duplicate goal id '{}'", id)));
            }
            ids.push(id);
        }
    }

    for asset in &request.assets {
        if asset.id.trim().is_empty() {
            return Err(PlanError::Validation("asset id must not be empty".to_string()));
        }
        invalid(&format!("asset '{}' value", asset.id), asset.value)?;
        if asset.unlock_month > MAX_TERM_MONTHS {
            return Err(PlanError::Validation(format!(
                "asset '{}' unlock_month {} exceeds {}",
                asset.id, asset.unlock_month, MAX_TERM_MONTHS
            )));
        }
    }

    Ok(())
}

/// Assets dedicated to the goal at `index`; an asset claimed by several
/// goals belongs to the first of them in the request
fn dedicated_inflows(request: &PlanRequest, index: usize) -> Vec<Inflow> {
    let goal = &request.goals[index];
    request
        .assets
        .iter()
        .filter(|asset| goal.owns_asset(asset))
        .filter(|asset| !request.goals[..index].iter().any(|earlier| earlier.owns_asset(asset)))
        .map(|asset| Inflow::new(asset.unlock_month, asset.value))
        .collect()
}

pub struct Planner<'a> {
    settings: &'a dyn SettingsProvider,
    tax_brackets: &'a dyn TaxBracketProvider,
    cofinancing_brackets: &'a dyn CofinancingBracketProvider,
    services: Services<'a>,
}

impl<'a> Planner<'a> {
    /// Planner over a provider that serves settings and both bracket tables
    pub fn new<S>(settings: &'a S, services: Services<'a>) -> Self
    where
        S: SettingsProvider + TaxBracketProvider + CofinancingBracketProvider,
    {
        Self::with_providers(settings, settings, settings, services)
    }

    pub fn with_providers(
        settings: &'a dyn SettingsProvider,
        tax_brackets: &'a dyn TaxBracketProvider,
        cofinancing_brackets: &'a dyn CofinancingBracketProvider,
        services: Services<'a>,
    ) -> Self {
        Self { settings, tax_brackets, cofinancing_brackets, services }
    }

    /// Calculate every goal of `request`
    pub fn calculate_first_run(&self, request: &PlanRequest) -> Result<PlanResponse, PlanError> {
        validate_request(request)?;

        let date = request.calculation_date.unwrap_or_else(|| Local::now().date_naive());
        let snapshot = SettingsSnapshot::resolve(self.settings, self.tax_brackets, self.cofinancing_brackets);
        let (response, _) = self.run(request, date, snapshot);
        Ok(response)
    }

    /// Run the goals; the final context is returned for inspection
    fn run(&self, request: &PlanRequest, date: NaiveDate, settings: SettingsSnapshot) -> (PlanResponse, RunContext) {
        info!("Calculating {} goals as of {}", request.goals.len(), date);

        let schedule = GoalScheduler::schedule(&request.goals, &request.client, &settings, date);
        let mut ctx = RunContext::new(date, settings, SharedPool::from_request(request));
        let mut results: Vec<Option<GoalResult>> = vec![None; request.goals.len()];

        for slot in schedule {
            let goal = &request.goals[slot.index];
            let outcome = slot.term.and_then(|term_months| {
                let input = GoalInput {
                    goal,
                    client: &request.client,
                    term_months,
                    dedicated: dedicated_inflows(request, slot.index),
                };
                calculator_for(goal.goal_type).calculate(&input, &mut ctx, &self.services)
            });
            results[slot.index] = Some(match outcome {
                Ok(result) => {
                    debug!("Goal '{}' ({}) calculated", goal.name, goal.goal_type.as_str());
                    result
                }
                Err(err) => {
                    debug!("Goal '{}' failed: {}", goal.name, err);
                    GoalResult::failure(goal, &err)
                }
            });
        }

        let goals: Vec<GoalResult> = results
            .into_iter()
            .zip(&request.goals)
            .map(|(result, goal)| result.unwrap_or_else(|| missing_result(goal)))
            .collect();
        let response = PlanResponse::from_results(goals);
        info!(
            "Plan done: {} goals, total capital {:.2}, state benefit {:.2}",
            response.summary.goals_count, response.summary.total_capital, response.summary.total_state_benefit
        );
        (response, ctx)
    }
}

fn missing_result(goal: &Goal) -> GoalResult {
    GoalResult::failure(goal, &PlanError::Computation("goal was not scheduled".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::InMemoryCatalog;
    use crate::client::{load_request_from_reader, Asset, Client, GoalType, PaymentVariant, Sex};
    use crate::error::ErrorKind;
    use crate::goals::{GoalStatus, UnavailableLifeQuotes};
    use crate::settings::StaticSettings;
    use approx::assert_relative_eq;

    fn calculate(request: &PlanRequest) -> Result<PlanResponse, PlanError> {
        let catalog = InMemoryCatalog::default_catalog();
        let settings = StaticSettings::defaults();
        let services = Services { products: &catalog, portfolios: &catalog, life_quotes: &UnavailableLifeQuotes };
        Planner::new(&settings, services).calculate_first_run(request)
    }

    fn client() -> Client {
        Client {
            birth_date: NaiveDate::from_ymd_opt(1980, 1, 1),
            sex: Some(Sex::Male),
            avg_monthly_income: 100_000.0,
            ..Client::default()
        }
    }

    fn request(goals: Vec<Goal>) -> PlanRequest {
        PlanRequest {
            calculation_date: NaiveDate::from_ymd_opt(2025, 1, 1),
            client: client(),
            goals,
            assets: Vec::new(),
        }
    }

    #[test]
    fn test_pension_end_to_end() {
        let json = r#"{
            "calculation_date": "2025-01-01",
            "client": { "birth_date": "1980-01-01", "sex": "MALE", "avg_monthly_income": 100000 },
            "goals": [{ "goal_type": "PENSION", "name": "Pension", "target_amount": 150000, "term_months": 0,
                        "risk_profile": "BALANCED" }]
        }"#;
        let request = load_request_from_reader(json.as_bytes()).unwrap();
        let response = calculate(&request).unwrap();
        let value = serde_json::to_value(&response).unwrap();

        let goal = &value["goals"][0];
        assert_eq!(goal["state_pension"]["retirement_age"], 65);
        assert_eq!(goal["state_pension"]["retirement_year"], 2045);
        assert_eq!(goal["state_pension"]["years_to_pension"], 20);
        assert_eq!(goal["summary"]["term_months"], 240);
        assert!(goal["pension_gap"]["required_capital"].as_f64().unwrap() > 0.0);
        assert!(goal["pds_cofinancing"]["total_cofinancing"].as_f64().unwrap() > 0.0);
        assert_eq!(value["summary"]["goals_count"], 1);
    }

    #[test]
    fn test_idempotent_output() {
        let mut reserve = Goal::new(GoalType::FinReserve, "Reserve", 0.0, 0);
        reserve.initial_capital = 100_000.0;
        let mut req = request(vec![
            Goal::new(GoalType::Pension, "Pension", 150_000.0, 0),
            Goal::new(GoalType::Other, "Car", 2_000_000.0, 36),
            reserve,
        ]);
        req.client.liquid_capital = 500_000.0;

        let first = serde_json::to_string(&calculate(&req).unwrap()).unwrap();
        let second = serde_json::to_string(&calculate(&req).unwrap()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_mixed_results_keep_input_order() {
        let mut req = request(vec![
            Goal::new(GoalType::Investment, "Invest", 1_000_000.0, 60),
            Goal::new(GoalType::Pension, "Pension", 150_000.0, 0),
            Goal::new(GoalType::Life, "Life", 1_000_000.0, 120),
            Goal::new(GoalType::Other, "No term", 500_000.0, 0),
        ]);
        req.client.birth_date = None;

        let response = calculate(&req).unwrap();
        let names: Vec<&str> = response.goals.iter().map(|g| g.goal_name.as_str()).collect();
        assert_eq!(names, vec!["Invest", "Pension", "Life", "No term"]);

        assert!(response.goals[0].summary.is_some());
        assert_eq!(response.goals[1].error.as_ref().unwrap().kind, ErrorKind::Validation);
        assert_eq!(response.goals[2].error.as_ref().unwrap().kind, ErrorKind::Validation);
        assert_eq!(response.goals[3].error.as_ref().unwrap().kind, ErrorKind::Validation);

        assert_eq!(response.summary.goals_count, 4);
        let invest = response.goals[0].summary.as_ref().unwrap();
        assert_relative_eq!(response.summary.total_capital, invest.projected_capital);
    }

    #[test]
    fn test_life_quote_failure_is_goal_level() {
        let req = request(vec![
            Goal::new(GoalType::Life, "Life", 1_000_000.0, 120),
            Goal::new(GoalType::FinReserve, "Reserve", 0.0, 0),
        ]);
        let response = calculate(&req).unwrap();

        assert_eq!(response.goals[0].error.as_ref().unwrap().kind, ErrorKind::ExternalService);
        assert_eq!(response.goals[1].summary.as_ref().unwrap().status, GoalStatus::Ok);
    }

    #[test]
    fn test_pool_not_double_spent_across_goals() {
        let mut req = request(vec![
            Goal::new(GoalType::Other, "A", 800_000.0, 12),
            Goal::new(GoalType::Other, "B", 800_000.0, 24),
            Goal::new(GoalType::Investment, "C", 800_000.0, 36),
        ]);
        req.client.liquid_capital = 1_000_000.0;
        req.assets.push(Asset {
            id: "deposit".to_string(),
            asset_type: "DEPOSIT".to_string(),
            value: 300_000.0,
            goal_id: None,
            unlock_month: 6,
        });

        let response = calculate(&req).unwrap();
        let mut drawn_liquid = 0.0;
        let mut drawn_deposit = 0.0;
        for goal in &response.goals {
            for draw in &goal.details.capital_projection.as_ref().unwrap().pool_draws {
                match draw.source.as_str() {
                    "deposit" => drawn_deposit += draw.amount,
                    _ => drawn_liquid += draw.amount,
                }
            }
        }
        assert!(drawn_liquid <= 1_000_000.0 + 1e-6);
        assert!(drawn_deposit <= 300_000.0 + 1e-6);
        // The first goal in order takes from the pool first
        assert!(response.goals[0].summary.as_ref().unwrap().pool_used > 0.0);
    }

    #[test]
    fn test_dedicated_asset_goes_to_first_owner() {
        let mut first = Goal::new(GoalType::Other, "First", 100_000.0, 12);
        first.id = Some("g1".to_string());
        let mut second = Goal::new(GoalType::Other, "Second", 100_000.0, 12);
        second.linked_asset_ids = vec!["car-fund".to_string()];
        let mut req = request(vec![first, second]);
        req.assets.push(Asset {
            id: "car-fund".to_string(),
            asset_type: "DEPOSIT".to_string(),
            value: 50_000.0,
            goal_id: Some("g1".to_string()),
            unlock_month: 0,
        });

        assert_eq!(dedicated_inflows(&req, 0), vec![Inflow::new(0, 50_000.0)]);
        assert!(dedicated_inflows(&req, 1).is_empty());
    }

    #[test]
    fn test_request_level_validation() {
        let mut req = request(vec![Goal::new(GoalType::Other, "Car", 1.0, 12)]);
        req.client.avg_monthly_income = -1.0;
        assert!(matches!(calculate(&req), Err(PlanError::Validation(_))));

        let mut req = request(vec![Goal::new(GoalType::Other, "Car", f64::NAN, 12)]);
        assert!(matches!(calculate(&req), Err(PlanError::Validation(_))));

        req.goals[0].target_amount = 1.0;
        let duplicate = req.goals[0].clone();
        req.goals.push(duplicate);
        req.goals[0].id = Some("dup".to_string());
        req.goals[1].id = Some("dup".to_string());
        assert!(matches!(calculate(&req), Err(PlanError::Validation(_))));
    }

    #[test]
    fn test_tax_deduction_shared_between_life_and_pds() {
        let mut life = Goal::new(GoalType::Life, "Life", 30_000_000.0, 36);
        life.payment_variant = Some(PaymentVariant::Annual);
        life.advisor_originated = true;
        let req = request(vec![Goal::new(GoalType::Pension, "Pension", 150_000.0, 0), life]);

        let catalog = InMemoryCatalog::default_catalog();
        let settings = StaticSettings::defaults();
        let services = Services { products: &catalog, portfolios: &catalog, life_quotes: &UnavailableLifeQuotes };
        let planner = Planner::new(&settings, services);
        let date = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        let (response, ctx) = planner.run(&req, date, settings.snapshot());

        let pension = response.goals[0].details.pds_cofinancing.as_ref().unwrap();
        let nsj = response.goals[1].details.nsj_calculation.as_ref().unwrap();
        let annual_income = req.client.annual_income();
        let engine = ctx.settings.tax_engine();

        // Life runs first and takes the full deduction base in 2025-2027
        for year in 2025..=2027 {
            assert_relative_eq!(nsj.tax_refunds[&year], 400_000.0 * 0.13, max_relative = 1e-12);
            let pds_refund = pension.yearly.iter().find(|row| row.year == year).unwrap().tax_refund;
            assert_eq!(pds_refund, 0.0);
        }
        assert!(pension.total_tax_refund > 0.0);

        for (&year, &base) in &ctx.used_tax_base {
            assert!(base <= ctx.settings.tax_deduction_limit + 1e-6, "base {} in {}", base, year);
        }
        for (&year, &refunded) in &ctx.used_tax_refund {
            let life_refund = nsj.tax_refunds.get(&year).copied().unwrap_or(0.0);
            let pds_refund: f64 = pension.yearly.iter().filter(|row| row.year == year).map(|row| row.tax_refund).sum();
            assert_relative_eq!(refunded, life_refund + pds_refund, max_relative = 1e-9);
            assert!(refunded <= engine.tax_due(year, annual_income).tax + 1e-6);
        }
    }

    #[test]
    fn test_oversized_term_rejected_before_any_goal_runs() {
        let req = request(vec![Goal::new(GoalType::Investment, "Forever", 1_000_000.0, 3_000_000_000)]);
        assert!(matches!(calculate(&req), Err(PlanError::Validation(_))));

        let longest = request(vec![Goal::new(GoalType::Investment, "Century", 1_000_000.0, MAX_TERM_MONTHS)]);
        let response = calculate(&longest).unwrap();
        assert!(response.goals[0].summary.is_some());

        let mut late_asset = request(vec![Goal::new(GoalType::Other, "Car", 100_000.0, 12)]);
        late_asset.assets.push(Asset {
            id: "bond".to_string(),
            asset_type: "BONDS".to_string(),
            value: 10_000.0,
            goal_id: None,
            unlock_month: u32::MAX,
        });
        assert!(matches!(calculate(&late_asset), Err(PlanError::Validation(_))));
    }

    #[test]
    fn test_empty_request() {
        let response = calculate(&request(Vec::new())).unwrap();
        assert_eq!(response.summary.goals_count, 0);
        assert_eq!(response.summary.total_capital, 0.0);
        assert!(response.goals.is_empty());
    }
}
