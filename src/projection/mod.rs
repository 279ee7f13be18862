//! Capital projection primitives: yield resolution, compounding and the
//! contribution solver

mod yield_curve;
mod compounding;
mod solver;

pub use yield_curve::{monthly_rate, resolve_line_yield, BlendedYield, InstrumentYield, YieldCurveResolver};
pub use compounding::{CompoundingResult, CompoundingRow, Inflow, MonthlyCompoundingSimulator};
pub use solver::{annuity_factor, Replenishment, ReplenishmentSolver, SolverMethod, BISECTION_ITERATIONS};
