//! CSV-based catalog loader
//!
//! Loads products and model portfolios from `products.csv` and
//! `portfolios.csv` in a data directory.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use serde::Deserialize;

use super::memory::InMemoryCatalog;
use super::portfolio::{Allocation, Bucket, Portfolio, RiskProfilePortfolio};
use super::product::{Product, ProductType, YieldLine};
use crate::client::{GoalType, RiskProfile};
use crate::error::LoadError;

/// Raw row of products.csv: one yield line per row
#[derive(Debug, Deserialize)]
struct ProductRow {
    product_id: String,
    product_type: String,
    term_from: u32,
    term_to: Option<u32>,
    amount_from: f64,
    amount_to: Option<f64>,
    yield_pct: f64,
}

/// Raw row of portfolios.csv: one allocation per row
#[derive(Debug, Deserialize)]
struct PortfolioRow {
    portfolio_id: String,
    goal_type: String,
    risk_profile: String,
    bucket: String,
    product_id: String,
    share_pct: f64,
}

/// Load products; rows of the same product keep their file order
pub fn load_products_from_reader<R: Read>(reader: R) -> Result<Vec<Product>, LoadError> {
    let mut csv_reader = csv::Reader::from_reader(reader);
    let mut products: Vec<Product> = Vec::new();

    for result in csv_reader.deserialize() {
        let row: ProductRow = result?;
        let product_type = ProductType::from_code(&row.product_type).ok_or_else(|| LoadError::InvalidValue {
            field: "product_type",
            value: row.product_type.clone(),
        })?;
        let line = YieldLine::new((row.term_from, row.term_to), (row.amount_from, row.amount_to), row.yield_pct);

        match products.iter_mut().find(|p| p.id == row.product_id) {
            Some(product) => product.yield_lines.push(line),
            None => products.push(Product::new(&row.product_id, product_type, vec![line])),
        }
    }

    Ok(products)
}

/// Load portfolios; each applies to any amount and term of its goal class
pub fn load_portfolios_from_reader<R: Read>(reader: R) -> Result<Vec<Portfolio>, LoadError> {
    let mut csv_reader = csv::Reader::from_reader(reader);
    let mut portfolios: Vec<Portfolio> = Vec::new();

    for result in csv_reader.deserialize() {
        let row: PortfolioRow = result?;
        let goal_type = GoalType::from_code(&row.goal_type).ok_or_else(|| LoadError::InvalidValue {
            field: "goal_type",
            value: row.goal_type.clone(),
        })?;
        let profile = RiskProfile::from_code(&row.risk_profile).ok_or_else(|| LoadError::InvalidValue {
            field: "risk_profile",
            value: row.risk_profile.clone(),
        })?;
        let bucket = Bucket::from_code(&row.bucket).ok_or_else(|| LoadError::InvalidValue {
            field: "bucket",
            value: row.bucket.clone(),
        })?;
        let allocation = Allocation::new(&row.product_id, row.share_pct, bucket);

        let idx = match portfolios.iter().position(|p| p.id == row.portfolio_id) {
            Some(idx) => idx,
            None => {
                portfolios.push(Portfolio::for_goal_type(&row.portfolio_id, goal_type));
                portfolios.len() - 1
            }
        };
        let portfolio = &mut portfolios[idx];
        match portfolio.risk_profiles.iter_mut().find(|p| p.profile == profile) {
            Some(existing) => existing.allocations.push(allocation),
            None => portfolio.risk_profiles.push(RiskProfilePortfolio { profile, allocations: vec![allocation] }),
        }
    }

    Ok(portfolios)
}

/// Load the catalog from `products.csv` and `portfolios.csv` in `path`
pub fn load_catalog(path: &Path) -> Result<InMemoryCatalog, LoadError> {
    let products = load_products_from_reader(File::open(path.join("products.csv"))?)?;
    let portfolios = load_portfolios_from_reader(File::open(path.join("portfolios.csv"))?)?;
    Ok(InMemoryCatalog::new(products, portfolios))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{PortfolioCatalog, ProductCatalog};

    const PRODUCTS: &str = "\
product_id,product_type,term_from,term_to,amount_from,amount_to,yield_pct
DEP-1,DEPOSIT,0,12,0,,12.0
DEP-1,DEPOSIT,13,,0,,8.0
PDS-1,PDS,0,,0,,10.0
";

    const PORTFOLIOS: &str = "\
portfolio_id,goal_type,risk_profile,bucket,product_id,share_pct
PF-1,INVESTMENT,BALANCED,INITIAL_CAPITAL,DEP-1,100
PF-1,INVESTMENT,BALANCED,TOP_UP,DEP-1,50
PF-1,INVESTMENT,BALANCED,TOP_UP,PDS-1,50
PF-1,INVESTMENT,AGGRESSIVE,TOP_UP,PDS-1,100
";

    #[test]
    fn test_load_products() {
        let products = load_products_from_reader(PRODUCTS.as_bytes()).expect("products");
        assert_eq!(products.len(), 2);
        assert_eq!(products[0].yield_lines.len(), 2);
        assert_eq!(products[0].yield_lines[1].term_to, None);
        assert!(products[1].is_pds());
    }

    #[test]
    fn test_load_portfolios() {
        let portfolios = load_portfolios_from_reader(PORTFOLIOS.as_bytes()).expect("portfolios");
        assert_eq!(portfolios.len(), 1);
        assert_eq!(portfolios[0].risk_profiles.len(), 2);
        let balanced = portfolios[0].profile(RiskProfile::Balanced).unwrap();
        assert_eq!(balanced.allocations.len(), 3);
    }

    #[test]
    fn test_unknown_code_rejected() {
        let bad = "product_id,product_type,term_from,term_to,amount_from,amount_to,yield_pct\nX,CRYPTO,0,,0,,50\n";
        let result = load_products_from_reader(bad.as_bytes());
        assert!(matches!(result, Err(LoadError::InvalidValue { field: "product_type", .. })));
    }

    #[test]
    fn test_load_bundled_catalog() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("data");
        let catalog = load_catalog(&path).expect("bundled catalog should load");
        assert!(catalog.find_by_id("PDS-1").is_some());
        assert!(catalog.find_by_criteria(GoalType::Pension, 5_000_000.0, 240).is_some());
    }
}
