//! Investment products and their banded yield tables

use serde::{Deserialize, Serialize};

/// Product family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProductType {
    Deposit,
    Bonds,
    Equity,
    Mixed,
    /// Long-term savings programme eligible for state co-financing
    Pds,
}

impl ProductType {
    pub fn is_pds(&self) -> bool {
        matches!(self, ProductType::Pds)
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "DEPOSIT" => Some(ProductType::Deposit),
            "BONDS" => Some(ProductType::Bonds),
            "EQUITY" => Some(ProductType::Equity),
            "MIXED" => Some(ProductType::Mixed),
            "PDS" => Some(ProductType::Pds),
            _ => None,
        }
    }
}

/// Annual yield for a term range and an amount range (both inclusive)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YieldLine {
    pub term_from: u32,
    /// `None` = unbounded
    pub term_to: Option<u32>,
    pub amount_from: f64,
    /// `None` = unbounded
    pub amount_to: Option<f64>,
    /// Annual yield in percent
    pub yield_pct: f64,
}

impl YieldLine {
    pub fn new(term: (u32, Option<u32>), amount: (f64, Option<f64>), yield_pct: f64) -> Self {
        Self {
            term_from: term.0,
            term_to: term.1,
            amount_from: amount.0,
            amount_to: amount.1,
            yield_pct,
        }
    }

    /// Line covering every term and amount
    pub fn flat(yield_pct: f64) -> Self {
        Self::new((0, None), (0.0, None), yield_pct)
    }

    pub fn contains(&self, term_months: u32, amount: f64) -> bool {
        let term_ok = term_months >= self.term_from && self.term_to.map_or(true, |to| term_months <= to);
        let amount_ok = amount >= self.amount_from && self.amount_to.map_or(true, |to| amount <= to);
        term_ok && amount_ok
    }
}

/// An investment product with an ordered yield table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: String,
    pub product_type: ProductType,
    pub yield_lines: Vec<YieldLine>,
}

impl Product {
    pub fn new(id: &str, product_type: ProductType, yield_lines: Vec<YieldLine>) -> Self {
        Self {
            id: id.to_string(),
            product_type,
            yield_lines,
        }
    }

    pub fn is_pds(&self) -> bool {
        self.product_type.is_pds()
    }
}
