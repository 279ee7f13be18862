//! Yield resolution for products and risk-profile buckets

use log::warn;
use serde::{Deserialize, Serialize};

use crate::catalog::{Allocation, ProductCatalog, ProductType, YieldLine};
use crate::error::PlanError;

/// Nominal monthly rate for an annual percent
pub fn monthly_rate(annual_pct: f64) -> f64 {
    annual_pct / 1200.0
}

/// Yield of the first line containing (term, amount); otherwise the first
/// line; 0 when there are no lines
pub fn resolve_line_yield(lines: &[YieldLine], term_months: u32, amount: f64) -> f64 {
    lines
        .iter()
        .find(|line| line.contains(term_months, amount))
        .or_else(|| lines.first())
        .map_or(0.0, |line| line.yield_pct)
}

/// One instrument's contribution to a blended yield
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstrumentYield {
    pub product_id: String,
    pub product_type: ProductType,
    /// Share as configured, in percent
    pub share_pct: f64,
    /// Normalised weight (fraction of the bucket)
    pub weight: f64,
    pub yield_pct: f64,
}

/// Share-weighted annual yield of a bucket
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlendedYield {
    pub annual_pct: f64,
    /// Fraction of the bucket invested in PDS products
    pub pds_share: f64,
    pub instruments: Vec<InstrumentYield>,
}

impl BlendedYield {
    pub fn monthly_rate(&self) -> f64 {
        monthly_rate(self.annual_pct)
    }

    /// Same rate without the PDS component, used when a bucket borrows
    /// another bucket's yield
    pub fn borrowed(&self) -> Self {
        Self {
            annual_pct: self.annual_pct,
            pds_share: 0.0,
            instruments: Vec::new(),
        }
    }
}

/// Resolves bucket yields against a product catalog
pub struct YieldCurveResolver<'a> {
    products: &'a dyn ProductCatalog,
}

impl<'a> YieldCurveResolver<'a> {
    pub fn new(products: &'a dyn ProductCatalog) -> Self {
        Self { products }
    }

    /// Blend the yields of `allocations` for a bucket holding `amount` over
    /// `term_months`. Each instrument is priced on its own slice of the
    /// amount. `None` when the bucket is empty.
    pub fn resolve(
        &self,
        allocations: &[Allocation],
        term_months: u32,
        amount: f64,
    ) -> Result<Option<BlendedYield>, PlanError> {
        let total_share: f64 = allocations.iter().map(|a| a.share_pct.max(0.0)).sum();
        if allocations.is_empty() || total_share <= 0.0 {
            return Ok(None);
        }
        if (total_share - 100.0).abs() > 1e-6 {
            warn!("Bucket shares sum to {:.2}%, normalising to 100%", total_share);
        }

        let mut blended = 0.0;
        let mut pds_share = 0.0;
        let mut instruments = Vec::with_capacity(allocations.len());

        for allocation in allocations {
            let product = self
                .products
                .find_by_id(&allocation.product_id)
                .ok_or_else(|| PlanError::NotFound(format!("product {}", allocation.product_id)))?;

            let weight = allocation.share_pct.max(0.0) / total_share;
            let yield_pct = resolve_line_yield(&product.yield_lines, term_months, amount * weight);
            blended += weight * yield_pct;
            if product.is_pds() {
                pds_share += weight;
            }

            instruments.push(InstrumentYield {
                product_id: product.id.clone(),
                product_type: product.product_type,
                share_pct: allocation.share_pct,
                weight,
                yield_pct,
            });
        }

        Ok(Some(BlendedYield { annual_pct: blended, pds_share, instruments }))
    }
}
