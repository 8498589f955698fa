//! Monte Carlo liquidity-risk engine for a leveraged single-asset
//! real-estate development.
//!
//! Data flows strictly forward:
//!   sampler → path simulator → Monte Carlo driver → risk aggregator

pub mod config;
pub mod engine;
pub mod error;
pub mod irr;
pub mod noi_window;
pub mod path;
pub mod phase;
pub mod results;
pub mod risk;
pub mod rng;
pub mod sampler;
pub mod types;

pub use config::RiskConfig;
pub use engine::{MonteCarloEngine, RunSettings};
pub use error::{ConfigError, RiskError, RiskResult, SimulationAnomaly};
pub use path::OutcomeRecord;
pub use phase::Outcome;
pub use results::ResultSet;
pub use risk::{RiskAggregator, RiskSummary};
