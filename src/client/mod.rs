//! Client, goal and asset inputs for a plan calculation

mod data;
pub mod loader;

pub use data::{
    months_between, Asset, Client, Goal, GoalType, PaymentVariant, PlanRequest, RiskProfile, Sex,
    FEMALE_RETIREMENT_AGE, MALE_RETIREMENT_AGE, MAX_TERM_MONTHS, WORKING_START_AGE,
};
pub use loader::{load_request, load_request_from_reader};
