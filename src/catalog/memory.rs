//! In-memory product and portfolio catalog

use std::collections::BTreeMap;

use super::portfolio::{Allocation, Bucket, Portfolio};
use super::product::{Product, ProductType, YieldLine};
use super::{PortfolioCatalog, ProductCatalog};
use crate::client::{GoalType, RiskProfile};

/// Catalog backed by plain collections
#[derive(Debug, Clone, Default)]
pub struct InMemoryCatalog {
    products: BTreeMap<String, Product>,
    portfolios: Vec<Portfolio>,
}

impl InMemoryCatalog {
    pub fn new(products: Vec<Product>, portfolios: Vec<Portfolio>) -> Self {
        Self {
            products: products.into_iter().map(|p| (p.id.clone(), p)).collect(),
            portfolios,
        }
    }

    pub fn add_product(&mut self, product: Product) {
        self.products.insert(product.id.clone(), product);
    }

    pub fn add_portfolio(&mut self, portfolio: Portfolio) {
        self.portfolios.push(portfolio);
    }

    pub fn products(&self) -> impl Iterator<Item = &Product> {
        self.products.values()
    }

    pub fn portfolios(&self) -> &[Portfolio] {
        &self.portfolios
    }

    /// Built-in product line used by the CLI and tests
    pub fn default_catalog() -> Self {
        let products = vec![
            Product::new(
                "DEP-1",
                ProductType::Deposit,
                vec![
                    YieldLine::new((0, Some(12)), (0.0, None), 12.0),
                    YieldLine::new((13, Some(36)), (0.0, None), 10.0),
                    YieldLine::new((37, None), (0.0, None), 8.0),
                ],
            ),
            Product::new(
                "BOND-1",
                ProductType::Bonds,
                vec![
                    YieldLine::new((0, Some(36)), (0.0, Some(999_999.99)), 10.5),
                    YieldLine::new((0, Some(36)), (1_000_000.0, None), 11.0),
                    YieldLine::new((37, None), (0.0, Some(999_999.99)), 9.5),
                    YieldLine::new((37, None), (1_000_000.0, None), 10.0),
                ],
            ),
            Product::new(
                "EQ-1",
                ProductType::Equity,
                vec![
                    YieldLine::new((0, Some(60)), (0.0, None), 12.0),
                    YieldLine::new((61, None), (0.0, None), 14.0),
                ],
            ),
            Product::new("PDS-1", ProductType::Pds, vec![YieldLine::flat(10.0)]),
        ];

        let long_term = |id: &str, goal_type: GoalType| {
            Portfolio::for_goal_type(id, goal_type)
                .with_profile(
                    RiskProfile::Conservative,
                    vec![
                        Allocation::new("BOND-1", 100.0, Bucket::InitialCapital),
                        Allocation::new("PDS-1", 50.0, Bucket::TopUp),
                        Allocation::new("BOND-1", 50.0, Bucket::TopUp),
                    ],
                )
                .with_profile(
                    RiskProfile::Balanced,
                    vec![
                        Allocation::new("BOND-1", 50.0, Bucket::InitialCapital),
                        Allocation::new("EQ-1", 50.0, Bucket::InitialCapital),
                        Allocation::new("PDS-1", 50.0, Bucket::TopUp),
                        Allocation::new("EQ-1", 50.0, Bucket::TopUp),
                    ],
                )
                .with_profile(
                    RiskProfile::Aggressive,
                    vec![
                        Allocation::new("EQ-1", 100.0, Bucket::InitialCapital),
                        Allocation::new("PDS-1", 30.0, Bucket::TopUp),
                        Allocation::new("EQ-1", 70.0, Bucket::TopUp),
                    ],
                )
        };

        let portfolios = vec![
            long_term("PF-PENSION", GoalType::Pension),
            long_term("PF-PASSIVE", GoalType::PassiveIncome),
            Portfolio::for_goal_type("PF-INVEST", GoalType::Investment)
                .with_profile(
                    RiskProfile::Conservative,
                    vec![
                        Allocation::new("DEP-1", 100.0, Bucket::InitialCapital),
                        Allocation::new("BOND-1", 100.0, Bucket::TopUp),
                    ],
                )
                .with_profile(
                    RiskProfile::Balanced,
                    vec![
                        Allocation::new("BOND-1", 50.0, Bucket::InitialCapital),
                        Allocation::new("EQ-1", 50.0, Bucket::InitialCapital),
                        Allocation::new("BOND-1", 40.0, Bucket::TopUp),
                        Allocation::new("EQ-1", 60.0, Bucket::TopUp),
                    ],
                )
                .with_profile(
                    RiskProfile::Aggressive,
                    vec![
                        Allocation::new("EQ-1", 100.0, Bucket::InitialCapital),
                        Allocation::new("BOND-1", 20.0, Bucket::TopUp),
                        Allocation::new("EQ-1", 80.0, Bucket::TopUp),
                    ],
                ),
            Portfolio::for_goal_type("PF-OTHER", GoalType::Other)
                .with_profile(
                    RiskProfile::Conservative,
                    vec![
                        Allocation::new("DEP-1", 100.0, Bucket::InitialCapital),
                        Allocation::new("DEP-1", 100.0, Bucket::TopUp),
                    ],
                )
                .with_profile(
                    RiskProfile::Balanced,
                    vec![
                        Allocation::new("DEP-1", 50.0, Bucket::InitialCapital),
                        Allocation::new("BOND-1", 50.0, Bucket::InitialCapital),
                        Allocation::new("BOND-1", 100.0, Bucket::TopUp),
                    ],
                )
                .with_profile(
                    RiskProfile::Aggressive,
                    vec![
                        Allocation::new("BOND-1", 50.0, Bucket::InitialCapital),
                        Allocation::new("EQ-1", 50.0, Bucket::InitialCapital),
                        Allocation::new("BOND-1", 50.0, Bucket::TopUp),
                        Allocation::new("EQ-1", 50.0, Bucket::TopUp),
                    ],
                ),
        ];

        Self::new(products, portfolios)
    }
}

impl ProductCatalog for InMemoryCatalog {
    fn find_by_id(&self, id: &str) -> Option<Product> {
        self.products.get(id).cloned()
    }
}

impl PortfolioCatalog for InMemoryCatalog {
    fn find_by_criteria(&self, goal_type: GoalType, amount: f64, term_months: u32) -> Option<Portfolio> {
        self.portfolios
            .iter()
            .find(|p| p.matches(goal_type, amount, term_months))
            .cloned()
    }
}
