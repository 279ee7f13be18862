//! Goal Planner - financial plan simulation for a client's goals
//!
//! This library provides:
//! - State pension estimation from pension points
//! - Monthly compounding projections with indexed contributions
//! - Replenishment solving (bisection and closed form)
//! - PDS co-financing and progressive income tax refunds
//! - Shared-pool allocation of liquid assets across goals
//! - First-run planning over pension, passive income, investment, purchase,
//!   life-insurance and reserve goals

pub mod error;
pub mod client;
pub mod settings;
pub mod catalog;
pub mod projection;
pub mod pension;
pub mod tax;
pub mod goals;
pub mod planner;

// Re-export commonly used types
pub use error::{ErrorKind, LoadError, PlanError};
pub use client::{Asset, Client, Goal, GoalType, PlanRequest};
pub use settings::{SettingsSnapshot, StaticSettings};
pub use catalog::InMemoryCatalog;
pub use goals::{GoalResult, LifeQuoteService, Services, UnavailableLifeQuotes};
pub use planner::{PlanResponse, PlanSummary, Planner};
