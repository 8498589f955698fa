//! Result collection: the ordered set of outcome records from one run.

use crate::{
    config::RiskConfig,
    path::OutcomeRecord,
    phase::Outcome,
    types::{Month, PathIndex},
};
use serde::Serialize;

/// Every path of one run, ordered by path index, plus the config that made them.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultSet {
    pub config: RiskConfig,
    pub master_seed: u64,
    pub records: Vec<OutcomeRecord>,
}

impl ResultSet {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records that finished without an anomaly.
    pub fn clean_records(&self) -> impl Iterator<Item = &OutcomeRecord> {
        self.records.iter().filter(|r| r.outcome != Outcome::Anomaly)
    }

    /// One flat row per path, for tabular consumers.
    pub fn rows(&self) -> Vec<PathRow> {
        self.records.iter().map(PathRow::from).collect()
    }
}

/// Flat, per-path view of an OutcomeRecord.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PathRow {
    pub path_index: PathIndex,
    pub seed: u64,
    pub outcome: Outcome,
    pub month: Month,
    pub final_equity: f64,
    pub irr: Option<f64>,
    pub exit_multiple: Option<f64>,
    pub construction_delay: Month,
}

impl From<&OutcomeRecord> for PathRow {
    fn from(record: &OutcomeRecord) -> Self {
        Self {
            path_index: record.path_index,
            seed: record.seed,
            outcome: record.outcome,
            month: record.month,
            final_equity: record.final_equity,
            irr: record.irr,
            exit_multiple: record.exit_multiple,
            construction_delay: record.construction_delay(),
        }
    }
}
