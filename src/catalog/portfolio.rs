//! Model portfolios: per risk profile, instrument shares by bucket

use serde::{Deserialize, Serialize};

use crate::client::{GoalType, RiskProfile};

/// Role of an instrument inside a risk profile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Bucket {
    /// Capital the client already has
    InitialCapital,
    /// Recurring contributions
    TopUp,
}

impl Bucket {
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "INITIAL_CAPITAL" => Some(Bucket::InitialCapital),
            "TOP_UP" => Some(Bucket::TopUp),
            _ => None,
        }
    }
}

/// Share of a product inside a bucket
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Allocation {
    pub product_id: String,
    /// Share in percent
    pub share_pct: f64,
    pub bucket: Bucket,
}

impl Allocation {
    pub fn new(product_id: &str, share_pct: f64, bucket: Bucket) -> Self {
        Self {
            product_id: product_id.to_string(),
            share_pct,
            bucket,
        }
    }
}

/// Instrument mix for one risk profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskProfilePortfolio {
    pub profile: RiskProfile,
    pub allocations: Vec<Allocation>,
}

impl RiskProfilePortfolio {
    pub fn bucket(&self, bucket: Bucket) -> Vec<Allocation> {
        self.allocations
            .iter()
            .filter(|a| a.bucket == bucket)
            .cloned()
            .collect()
    }
}

/// Model portfolio for a goal class within amount and term ranges
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Portfolio {
    pub id: String,
    pub goal_type: GoalType,
    pub amount_from: f64,
    pub amount_to: Option<f64>,
    pub term_from: u32,
    pub term_to: Option<u32>,
    pub risk_profiles: Vec<RiskProfilePortfolio>,
}

impl Portfolio {
    /// Portfolio applying to any amount and term of a goal class
    pub fn for_goal_type(id: &str, goal_type: GoalType) -> Self {
        Self {
            id: id.to_string(),
            goal_type,
            amount_from: 0.0,
            amount_to: None,
            term_from: 0,
            term_to: None,
            risk_profiles: Vec::new(),
        }
    }

    pub fn with_profile(mut self, profile: RiskProfile, allocations: Vec<Allocation>) -> Self {
        self.risk_profiles.push(RiskProfilePortfolio { profile, allocations });
        self
    }

    pub fn matches(&self, goal_type: GoalType, amount: f64, term_months: u32) -> bool {
        self.goal_type == goal_type
            && amount >= self.amount_from
            && self.amount_to.map_or(true, |to| amount <= to)
            && term_months >= self.term_from
            && self.term_to.map_or(true, |to| term_months <= to)
    }

    pub fn profile(&self, profile: RiskProfile) -> Option<&RiskProfilePortfolio> {
        self.risk_profiles.iter().find(|p| p.profile == profile)
    }
}
