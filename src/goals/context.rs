//! Mutable state shared by the goals of one run

use std::collections::BTreeMap;

use chrono::NaiveDate;

use super::pool::SharedPool;
use crate::settings::SettingsSnapshot;
use crate::tax::TaxRefundSchedule;

/// Created once per calculation, passed by `&mut` to each goal in
/// priority order and dropped with the response
#[derive(Debug, Clone)]
pub struct RunContext {
    pub calculation_date: NaiveDate,
    pub settings: SettingsSnapshot,
    pub pool: SharedPool,
    /// Co-financing already credited, per calendar year
    pub used_cofinancing: BTreeMap<i32, f64>,
    /// Deduction base already used, per tax year
    pub used_tax_base: BTreeMap<i32, f64>,
    /// Refunds already granted, per tax year
    pub used_tax_refund: BTreeMap<i32, f64>,
}

impl RunContext {
    pub fn new(calculation_date: NaiveDate, settings: SettingsSnapshot, pool: SharedPool) -> Self {
        Self {
            calculation_date,
            settings,
            pool,
            used_cofinancing: BTreeMap::new(),
            used_tax_base: BTreeMap::new(),
            used_tax_refund: BTreeMap::new(),
        }
    }

    pub fn commit_cofinancing(&mut self, credits: &BTreeMap<i32, f64>) {
        for (&year, &amount) in credits {
            *self.used_cofinancing.entry(year).or_insert(0.0) += amount;
        }
    }

    pub fn commit_tax_refunds(&mut self, schedule: &TaxRefundSchedule) {
        for (&year, &base) in &schedule.base_applied {
            *self.used_tax_base.entry(year).or_insert(0.0) += base;
        }
        for (&year, &refund) in &schedule.refunds {
            *self.used_tax_refund.entry(year).or_insert(0.0) += refund;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_commits_accumulate() {
        let date = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        let mut ctx = RunContext::new(date, SettingsSnapshot::defaults(), SharedPool::default());

        let credits = BTreeMap::from([(2026, 10_000.0), (2027, 5_000.0)]);
        ctx.commit_cofinancing(&credits);
        ctx.commit_cofinancing(&credits);
        assert_eq!(ctx.used_cofinancing[&2026], 20_000.0);

        let schedule = TaxRefundSchedule {
            refunds: BTreeMap::from([(2025, 13_000.0)]),
            base_applied: BTreeMap::from([(2025, 100_000.0)]),
        };
        ctx.commit_tax_refunds(&schedule);
        assert_eq!(ctx.used_tax_base[&2025], 100_000.0);
        assert_eq!(ctx.used_tax_refund[&2025], 13_000.0);
    }
}
