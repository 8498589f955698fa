//! Monte Carlo driver.
//!
//! RULES:
//!   - Path i always uses the RNG stream derived from (master_seed, i).
//!   - Paths share nothing mutable; the config is read-only.
//!   - Records are returned in path-index order, whatever the scheduling.
//!   - The only cancellation point is the run-level timeout.

use crate::{
    config::RiskConfig,
    error::{ConfigError, RiskError, RiskResult},
    path::{OutcomeRecord, PathEvent, PathSimulator},
    phase::Outcome,
    results::ResultSet,
    rng::RngBank,
    types::PathIndex,
};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// Paths between wall-clock checks against the run timeout.
const DEADLINE_CHECK_INTERVAL: usize = 256;

/// Run-level parameters. Independent of the financial configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSettings {
    pub iterations: usize,
    /// Master seed. Drawn from entropy and logged when absent.
    pub seed: Option<u64>,
    pub parallel: bool,
    /// Worker cap. None uses every available core.
    pub threads: Option<usize>,
    /// Wall-clock budget for the whole batch.
    pub timeout: Option<Duration>,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            iterations: 30_000,
            seed: None,
            parallel: true,
            threads: None,
            timeout: None,
        }
    }
}

impl RunSettings {
    pub fn seeded(iterations: usize, seed: u64) -> Self {
        Self { iterations, seed: Some(seed), ..Self::default() }
    }

    pub fn sequential(mut self) -> Self {
        self.parallel = false;
        self
    }
}

#[derive(Debug, Clone, Copy)]
struct Deadline {
    started: Instant,
    budget: Option<Duration>,
}

impl Deadline {
    /// An exhausted budget fails, so a zero budget never runs a path.
    fn check(&self) -> RiskResult<()> {
        match self.budget {
            Some(budget) if self.started.elapsed() >= budget => Err(RiskError::RunTimedOut {
                elapsed_ms: self.started.elapsed().as_millis(),
                budget_ms: budget.as_millis(),
            }),
            _ => Ok(()),
        }
    }
}

pub struct MonteCarloEngine {
    config: RiskConfig,
}

impl MonteCarloEngine {
    /// Validate the config up front; a bad config never reaches sampling.
    pub fn new(config: RiskConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &RiskConfig {
        &self.config
    }

    /// Simulate `settings.iterations` independent paths.
    pub fn run(&self, settings: &RunSettings) -> RiskResult<ResultSet> {
        if settings.iterations == 0 {
            return Err(ConfigError::NoIterations.into());
        }

        let bank = settings.seed.map(RngBank::new).unwrap_or_else(RngBank::from_entropy);
        let simulator = PathSimulator::new(&self.config)?;
        let deadline = Deadline { started: Instant::now(), budget: settings.timeout };

        log::info!(
            "Monte Carlo run: iterations={} master_seed={} mode={}",
            settings.iterations,
            bank.master_seed(),
            if settings.parallel { "parallel" } else { "sequential" }
        );

        let run_one = |i: usize| -> RiskResult<OutcomeRecord> {
            if i % DEADLINE_CHECK_INTERVAL == 0 {
                deadline.check()?;
            }
            let mut rng = bank.for_path(i as PathIndex);
            Ok(simulator.simulate(&mut rng))
        };

        let mut records = if !settings.parallel {
            (0..settings.iterations).map(run_one).collect::<RiskResult<Vec<_>>>()?
        } else if let Some(threads) = settings.threads {
            let pool = rayon::ThreadPoolBuilder::new().num_threads(threads).build()?;
            pool.install(|| {
                (0..settings.iterations)
                    .into_par_iter()
                    .map(run_one)
                    .collect::<RiskResult<Vec<_>>>()
            })?
        } else {
            (0..settings.iterations)
                .into_par_iter()
                .map(run_one)
                .collect::<RiskResult<Vec<_>>>()?
        };
        records.sort_by_key(|r| r.path_index);

        let anomalies = records.iter().filter(|r| r.outcome == Outcome::Anomaly).count();
        if anomalies > 0 {
            log::warn!("{anomalies} of {} paths aborted on an anomaly", records.len());
        }
        log::info!(
            "Monte Carlo run finished: paths={} elapsed_ms={}",
            records.len(),
            deadline.started.elapsed().as_millis()
        );

        Ok(ResultSet {
            config: self.config.clone(),
            master_seed: bank.master_seed(),
            records,
        })
    }

    /// Re-simulate a single path of an earlier run.
    pub fn replay_path(&self, master_seed: u64, path_index: PathIndex) -> RiskResult<OutcomeRecord> {
        let simulator = PathSimulator::new(&self.config)?;
        let mut rng = RngBank::new(master_seed).for_path(path_index);
        Ok(simulator.simulate(&mut rng))
    }

    /// Re-simulate a single path and return its checkpoint trail.
    pub fn trace_path(
        &self,
        master_seed: u64,
        path_index: PathIndex,
    ) -> RiskResult<(OutcomeRecord, Vec<PathEvent>)> {
        let simulator = PathSimulator::new(&self.config)?;
        let mut rng = RngBank::new(master_seed).for_path(path_index);
        Ok(simulator.simulate_traced(&mut rng))
    }
}
