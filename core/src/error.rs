use crate::types::Month;
use serde::Serialize;
use thiserror::Error;

/// A malformed configuration. Raised before any sampling begins and never
/// clamped into range.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("Distribution '{name}' is malformed: min={min}, mode={mode}, max={max}")]
    InvalidDistribution {
        name: &'static str,
        min: f64,
        mode: f64,
        max: f64,
    },

    #[error(
        "Phase boundaries must be strictly increasing: construction_end={construction_end}, \
         refinancing={refinancing}, demand_driver={demand_driver}, exit={exit}"
    )]
    NonIncreasingBoundaries {
        construction_end: Month,
        refinancing: Month,
        demand_driver: Month,
        exit: Month,
    },

    #[error("'{field}' must be positive, got {value}")]
    NonPositive { field: &'static str, value: f64 },

    #[error("'{field}' must be non-negative, got {value}")]
    Negative { field: &'static str, value: f64 },

    #[error("Ratio '{field}' must lie in [0, 1], got {value}")]
    RatioOutOfRange { field: &'static str, value: f64 },

    #[error("Horizon of {horizon} months cannot hold exit month {exit} plus a delay of up to {max_delay} months")]
    HorizonTooShort {
        horizon: Month,
        exit: Month,
        max_delay: Month,
    },

    #[error("Trailing NOI lookback must be at least one month")]
    EmptyLookback,

    #[error("Iteration count must be at least one")]
    NoIterations,
}

/// An internal invariant broken mid-path. Only the offending path is aborted;
/// it is recorded with a distinct outcome so aggregates stay clean.
#[derive(Error, Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SimulationAnomaly {
    #[error("Negative revenue {revenue} at month {month}")]
    NegativeRevenue { month: Month, revenue: f64 },

    #[error("Non-finite {field} at month {month}")]
    NonFiniteState { month: Month, field: &'static str },
}

#[derive(Error, Debug)]
pub enum RiskError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Run timed out after {elapsed_ms} ms ({budget_ms} ms budget)")]
    RunTimedOut { elapsed_ms: u128, budget_ms: u128 },

    #[error("Worker pool error: {0}")]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),
}

pub type RiskResult<T> = Result<T, RiskError>;
