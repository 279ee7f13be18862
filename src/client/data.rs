//! Client, goal and asset records matching the first-run request format

use chrono::{Datelike, Months, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::PlanError;

/// Statutory retirement age for men
pub const MALE_RETIREMENT_AGE: u32 = 65;

/// Statutory retirement age for women
pub const FEMALE_RETIREMENT_AGE: u32 = 60;

/// Age at which pension-point accrual is assumed to start
pub const WORKING_START_AGE: u32 = 18;

/// Longest goal term accepted, 100 years
pub const MAX_TERM_MONTHS: u32 = 1200;

/// Sex of the client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Sex {
    Male,
    Female,
}

impl Sex {
    pub fn retirement_age(&self) -> u32 {
        match self {
            Sex::Male => MALE_RETIREMENT_AGE,
            Sex::Female => FEMALE_RETIREMENT_AGE,
        }
    }
}

/// Goal type
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GoalType {
    /// State-pension top-up
    Pension,
    /// Monthly passive income funded from capital
    PassiveIncome,
    /// Capital growth to an explicit future amount
    Investment,
    /// Lump-sum purchase
    Other,
    /// Life-insurance-funded goal
    Life,
    /// Emergency reserve
    FinReserve,
}

impl GoalType {
    /// Default scheduling tier (lower runs first)
    pub fn default_priority(&self) -> u32 {
        match self {
            GoalType::FinReserve => 0,
            GoalType::Life => 1,
            GoalType::Pension => 2,
            GoalType::PassiveIncome => 3,
            GoalType::Other => 4,
            GoalType::Investment => 5,
        }
    }

    /// Wire code used in catalog files and logs
    pub fn as_str(&self) -> &'static str {
        match self {
            GoalType::Pension => "PENSION",
            GoalType::PassiveIncome => "PASSIVE_INCOME",
            GoalType::Investment => "INVESTMENT",
            GoalType::Other => "OTHER",
            GoalType::Life => "LIFE",
            GoalType::FinReserve => "FIN_RESERVE",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "PENSION" => Some(GoalType::Pension),
            "PASSIVE_INCOME" => Some(GoalType::PassiveIncome),
            "INVESTMENT" => Some(GoalType::Investment),
            "OTHER" => Some(GoalType::Other),
            "LIFE" => Some(GoalType::Life),
            "FIN_RESERVE" => Some(GoalType::FinReserve),
            _ => None,
        }
    }
}

/// Risk profile selecting the instrument mix of a portfolio
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskProfile {
    Conservative,
    Balanced,
    Aggressive,
}

impl RiskProfile {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskProfile::Conservative => "CONSERVATIVE",
            RiskProfile::Balanced => "BALANCED",
            RiskProfile::Aggressive => "AGGRESSIVE",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "CONSERVATIVE" => Some(RiskProfile::Conservative),
            "BALANCED" => Some(RiskProfile::Balanced),
            "AGGRESSIVE" => Some(RiskProfile::Aggressive),
            _ => None,
        }
    }
}

impl Default for RiskProfile {
    fn default() -> Self {
        RiskProfile::Balanced
    }
}

/// Premium payment schedule of a life-insurance programme
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentVariant {
    Monthly,
    Quarterly,
    Annual,
    /// One premium at inception
    Single,
}

impl PaymentVariant {
    /// Premium payments per year (0 for a single premium)
    pub fn periods_per_year(&self) -> u32 {
        match self {
            PaymentVariant::Monthly => 12,
            PaymentVariant::Quarterly => 4,
            PaymentVariant::Annual => 1,
            PaymentVariant::Single => 0,
        }
    }
}

impl Default for PaymentVariant {
    fn default() -> Self {
        PaymentVariant::Monthly
    }
}

/// The client a plan is calculated for. Immutable for the duration of a run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Client {
    #[serde(default)]
    pub birth_date: Option<NaiveDate>,

    #[serde(default)]
    pub sex: Option<Sex>,

    /// Average monthly income before tax
    #[serde(default)]
    pub avg_monthly_income: f64,

    /// Known pension-point balance (IPK), estimated when absent
    #[serde(default)]
    pub ipk_current: Option<f64>,

    /// Liquid capital not dedicated to any goal
    #[serde(default)]
    pub liquid_capital: f64,
}

impl Client {
    pub fn require_birth_date(&self) -> Result<NaiveDate, PlanError> {
        self.birth_date
            .ok_or_else(|| PlanError::Validation("client birth_date is required".to_string()))
    }

    pub fn require_sex(&self) -> Result<Sex, PlanError> {
        self.sex
            .ok_or_else(|| PlanError::Validation("client sex is required".to_string()))
    }

    /// Full years of age on the given date
    pub fn age_at(&self, date: NaiveDate) -> Result<u32, PlanError> {
        let birth = self.require_birth_date()?;
        if date < birth {
            return Err(PlanError::Validation(format!(
                "calculation date {} precedes birth date {}",
                date, birth
            )));
        }
        let mut age = date.year() - birth.year();
        if (date.month(), date.day()) < (birth.month(), birth.day()) {
            age -= 1;
        }
        Ok(age.max(0) as u32)
    }

    /// Date the client reaches statutory retirement age
    pub fn retirement_date(&self) -> Result<NaiveDate, PlanError> {
        let birth = self.require_birth_date()?;
        let sex = self.require_sex()?;
        birth
            .checked_add_months(Months::new(sex.retirement_age() * 12))
            .ok_or_else(|| PlanError::Computation("retirement date out of range".to_string()))
    }

    /// Whole months from `date` until retirement (0 once retired)
    pub fn months_to_retirement(&self, date: NaiveDate) -> Result<u32, PlanError> {
        let retirement = self.retirement_date()?;
        Ok(months_between(date, retirement))
    }

    pub fn annual_income(&self) -> f64 {
        self.avg_monthly_income.max(0.0) * 12.0
    }
}

/// Whole calendar months from `from` to `to`, floored at zero
pub fn months_between(from: NaiveDate, to: NaiveDate) -> u32 {
    if to <= from {
        return 0;
    }
    let mut months = (to.year() - from.year()) * 12 + to.month() as i32 - from.month() as i32;
    if to.day() < from.day() {
        months -= 1;
    }
    months.max(0) as u32
}

/// A single financial goal
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Goal {
    #[serde(default)]
    pub id: Option<String>,

    pub goal_type: GoalType,

    pub name: String,

    /// Target amount; its meaning depends on the goal type
    #[serde(default)]
    pub target_amount: f64,

    /// Term in months, 0 = derive
    #[serde(default)]
    pub term_months: u32,

    #[serde(default)]
    pub risk_profile: RiskProfile,

    #[serde(default)]
    pub initial_capital: f64,

    /// Annual inflation override (fraction)
    #[serde(default)]
    pub inflation_rate: Option<f64>,

    /// Explicit scheduling tier, overrides the type default
    #[serde(default)]
    pub priority: Option<u32>,

    #[serde(default)]
    pub linked_asset_ids: Vec<String>,

    #[serde(default)]
    pub payment_variant: Option<PaymentVariant>,

    /// Life-insurance programme code
    #[serde(default)]
    pub program: Option<String>,

    /// Created by an advisor rather than the client
    #[serde(default)]
    pub advisor_originated: bool,
}

impl Goal {
    /// Create a goal with the required fields; everything else defaults
    pub fn new(goal_type: GoalType, name: &str, target_amount: f64, term_months: u32) -> Self {
        Self {
            id: None,
            goal_type,
            name: name.to_string(),
            target_amount,
            term_months,
            risk_profile: RiskProfile::default(),
            initial_capital: 0.0,
            inflation_rate: None,
            priority: None,
            linked_asset_ids: Vec::new(),
            payment_variant: None,
            program: None,
            advisor_originated: false,
        }
    }

    pub fn priority_tier(&self) -> u32 {
        self.priority.unwrap_or_else(|| self.goal_type.default_priority())
    }

    /// Whether an asset is dedicated to this goal
    pub fn owns_asset(&self, asset: &Asset) -> bool {
        let by_goal_id = match (&self.id, &asset.goal_id) {
            (Some(goal_id), Some(asset_goal)) => goal_id == asset_goal,
            _ => false,
        };
        by_goal_id || self.linked_asset_ids.iter().any(|id| *id == asset.id)
    }
}

/// A client asset, either dedicated to a goal or part of the shared pool
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Asset {
    pub id: String,

    #[serde(default)]
    pub asset_type: String,

    pub value: f64,

    /// Goal this asset is dedicated to
    #[serde(default)]
    pub goal_id: Option<String>,

    /// Month from the calculation date when the value becomes available
    #[serde(default)]
    pub unlock_month: u32,
}

/// First-run calculation request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanRequest {
    /// Fixes the calendar for the run; defaults to today
    #[serde(default)]
    pub calculation_date: Option<NaiveDate>,

    pub client: Client,

    pub goals: Vec<Goal>,

    #[serde(default)]
    pub assets: Vec<Asset>,
}
