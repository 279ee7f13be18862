//! State incentives: progressive income tax refunds and PDS co-financing

mod ndfl;
mod cofinancing;

pub use ndfl::{
    progressive_scale, DeductionRefund, ProgressiveTaxEngine, TaxAssessment, TaxBracket, TaxSchedule,
    DEFAULT_SCHEDULE_FIRST_YEAR, DEFAULT_SCHEDULE_LAST_YEAR, FALLBACK_FLAT_RATE,
};
pub use cofinancing::{
    calendar_month, default_brackets, refund_schedule, CofinancingBracket, CofinancingTerms,
    PdsCofinancingSimulator, PdsParams, PdsSimulation, PdsYear, TaxRefundSchedule,
};
