//! Product and portfolio catalogs consumed by the planner

mod product;
mod portfolio;
mod memory;
pub mod loader;

pub use product::{Product, ProductType, YieldLine};
pub use portfolio::{Allocation, Bucket, Portfolio, RiskProfilePortfolio};
pub use memory::InMemoryCatalog;
pub use loader::load_catalog;

use crate::client::GoalType;

/// Lookup of products by id
pub trait ProductCatalog {
    fn find_by_id(&self, id: &str) -> Option<Product>;
}

/// Lookup of the model portfolio for a goal class, amount and term
pub trait PortfolioCatalog {
    fn find_by_criteria(&self, goal_type: GoalType, amount: f64, term_months: u32) -> Option<Portfolio>;
}
