//! Shared primitive types used across the entire simulation.

/// A simulation month. Month 0 is the instant before construction starts;
/// month 1 is the first simulated month.
pub type Month = u32;

/// Index of one Monte Carlo path within a run.
pub type PathIndex = u64;

/// Months per year, used for annualising rates and NOI.
pub const MONTHS_PER_YEAR: f64 = 12.0;
