//! Risk aggregator: outcome probabilities, tail loss, return distribution
//! and survival curve over a ResultSet.
//!
//! Anomalous paths are counted and reported but excluded from every
//! statistic except the outcome probabilities. Statistics that cannot be
//! computed are reported as None with a warning, never as zero.

use crate::{
    error::ConfigError,
    path::OutcomeRecord,
    phase::Outcome,
    results::ResultSet,
    types::Month,
};
use serde::Serialize;

pub const DEFAULT_CONFIDENCE: f64 = 0.95;

/// VaR levels always reported alongside the configured one.
pub const REPORTED_VAR_LEVELS: [f64; 3] = [0.90, 0.95, 0.99];

/// A non-fatal condition met while aggregating.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AggregationWarning {
    /// No path exited; IRR and exit-multiple statistics are undefined.
    NoExits,
    /// One exit only; dispersion statistics are undefined.
    SingleExit,
    /// Every path was anomalous; loss and survival statistics are undefined.
    NoCleanPaths,
    AnomalousPaths { count: usize, rate: f64 },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct OutcomeCounts {
    pub exit: usize,
    pub default: usize,
    pub refi_fail: usize,
    pub survived_no_exit: usize,
    pub anomaly: usize,
}

impl OutcomeCounts {
    pub fn tally<'a>(records: impl IntoIterator<Item = &'a OutcomeRecord>) -> Self {
        let mut counts = Self::default();
        for record in records {
            *counts.slot(record.outcome) += 1;
        }
        counts
    }

    fn slot(&mut self, outcome: Outcome) -> &mut usize {
        match outcome {
            Outcome::Exit           => &mut self.exit,
            Outcome::Default        => &mut self.default,
            Outcome::RefiFail       => &mut self.refi_fail,
            Outcome::SurvivedNoExit => &mut self.survived_no_exit,
            Outcome::Anomaly        => &mut self.anomaly,
        }
    }

    pub fn get(&self, outcome: Outcome) -> usize {
        match outcome {
            Outcome::Exit           => self.exit,
            Outcome::Default        => self.default,
            Outcome::RefiFail       => self.refi_fail,
            Outcome::SurvivedNoExit => self.survived_no_exit,
            Outcome::Anomaly        => self.anomaly,
        }
    }

    pub fn total(&self) -> usize {
        Outcome::ALL.iter().map(|&o| self.get(o)).sum()
    }
}

/// Share of all paths ending in each outcome.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct OutcomeProbabilities {
    pub exit: f64,
    pub default: f64,
    pub refi_fail: f64,
    pub survived_no_exit: f64,
    pub anomaly: f64,
}

impl OutcomeProbabilities {
    pub fn from_counts(counts: &OutcomeCounts) -> Self {
        let n = counts.total();
        if n == 0 {
            return Self::default();
        }
        let share = |c: usize| c as f64 / n as f64;
        Self {
            exit: share(counts.exit),
            default: share(counts.default),
            refi_fail: share(counts.refi_fail),
            survived_no_exit: share(counts.survived_no_exit),
            anomaly: share(counts.anomaly),
        }
    }

    pub fn get(&self, outcome: Outcome) -> f64 {
        match outcome {
            Outcome::Exit           => self.exit,
            Outcome::Default        => self.default,
            Outcome::RefiFail       => self.refi_fail,
            Outcome::SurvivedNoExit => self.survived_no_exit,
            Outcome::Anomaly        => self.anomaly,
        }
    }

    pub fn total(&self) -> f64 {
        Outcome::ALL.iter().map(|&o| self.get(o)).sum()
    }
}

/// Summary of a sample: location, dispersion and quantiles.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DistributionStats {
    pub count: usize,
    pub mean: f64,
    pub median: f64,
    /// Sample standard deviation; None below two observations.
    pub std_dev: Option<f64>,
    pub min: f64,
    pub max: f64,
    pub p5: f64,
    pub p25: f64,
    pub p75: f64,
    pub p95: f64,
    pub iqr: f64,
}

impl DistributionStats {
    /// None for an empty sample.
    pub fn from_values(mut values: Vec<f64>) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        values.sort_by(f64::total_cmp);
        let count = values.len();
        let mean = values.iter().sum::<f64>() / count as f64;
        let std_dev = (count >= 2).then(|| {
            let ss = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>();
            (ss / (count - 1) as f64).sqrt()
        });
        let p25 = percentile(&values, 0.25);
        let p75 = percentile(&values, 0.75);
        Some(Self {
            count,
            mean,
            median: percentile(&values, 0.5),
            std_dev,
            min: values[0],
            max: values[count - 1],
            p5: percentile(&values, 0.05),
            p25,
            p75,
            p95: percentile(&values, 0.95),
            iqr: p75 - p25,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ValueAtRisk {
    pub confidence: f64,
    /// Loss at the confidence percentile, as a fraction of initial equity.
    pub loss_fraction: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiskSummary {
    pub iterations: usize,
    pub master_seed: u64,
    pub initial_equity: f64,
    pub counts: OutcomeCounts,
    pub probabilities: OutcomeProbabilities,
    pub anomaly_rate: f64,
    /// VaR at the aggregator's confidence level.
    pub value_at_risk: Option<ValueAtRisk>,
    pub var_levels: Vec<ValueAtRisk>,
    /// Mean loss over initial equity.
    pub expected_loss: Option<f64>,
    pub irr: Option<DistributionStats>,
    pub exit_multiple: Option<DistributionStats>,
    /// Mean IRR over IRR standard deviation, exits only.
    pub risk_adjusted_return: Option<f64>,
    /// `survival_curve[m]` is the share of paths alive at month m.
    pub survival_curve: Vec<f64>,
    pub warnings: Vec<AggregationWarning>,
}

impl RiskSummary {
    pub fn survival_at(&self, month: Month) -> Option<f64> {
        self.survival_curve.get(month as usize).copied()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RiskAggregator {
    confidence: f64,
}

impl Default for RiskAggregator {
    fn default() -> Self {
        Self { confidence: DEFAULT_CONFIDENCE }
    }
}

impl RiskAggregator {
    pub fn new(confidence: f64) -> Result<Self, ConfigError> {
        if !(confidence > 0.0 && confidence < 1.0) {
            return Err(ConfigError::RatioOutOfRange { field: "confidence", value: confidence });
        }
        Ok(Self { confidence })
    }

    pub fn confidence(&self) -> f64 {
        self.confidence
    }

    pub fn summarize(&self, results: &ResultSet) -> RiskSummary {
        let initial_equity = results.config.initial_equity;
        let horizon = results.config.horizon_months;
        let mut warnings = Vec::new();

        let counts = OutcomeCounts::tally(&results.records);
        let probabilities = OutcomeProbabilities::from_counts(&counts);
        let anomaly_rate = probabilities.anomaly;
        if counts.anomaly > 0 {
            warnings.push(AggregationWarning::AnomalousPaths {
                count: counts.anomaly,
                rate: anomaly_rate,
            });
        }

        let clean: Vec<&OutcomeRecord> = results.clean_records().collect();
        if clean.is_empty() {
            warnings.push(AggregationWarning::NoCleanPaths);
        }

        let mut losses: Vec<f64> = clean
            .iter()
            .map(|r| loss_fraction(r.final_equity, initial_equity))
            .collect();
        losses.sort_by(f64::total_cmp);

        let var_at = |confidence: f64| {
            (!losses.is_empty()).then(|| ValueAtRisk {
                confidence,
                loss_fraction: percentile(&losses, confidence),
            })
        };
        let value_at_risk = var_at(self.confidence);
        let var_levels = REPORTED_VAR_LEVELS.iter().filter_map(|&c| var_at(c)).collect();
        let expected_loss =
            (!losses.is_empty()).then(|| losses.iter().sum::<f64>() / losses.len() as f64);

        let exits: Vec<&OutcomeRecord> =
            clean.iter().copied().filter(|r| r.outcome == Outcome::Exit).collect();
        let irr = DistributionStats::from_values(exits.iter().filter_map(|r| r.irr).collect());
        let exit_multiple =
            DistributionStats::from_values(exits.iter().filter_map(|r| r.exit_multiple).collect());
        match exits.len() {
            0 => warnings.push(AggregationWarning::NoExits),
            1 => warnings.push(AggregationWarning::SingleExit),
            _ => {}
        }
        let risk_adjusted_return = irr.as_ref().and_then(|s| match s.std_dev {
            Some(sd) if sd > 0.0 => Some(s.mean / sd),
            _ => None,
        });

        let survival_curve = survival_curve(clean.iter().copied(), horizon);

        for warning in &warnings {
            log::warn!("Aggregation warning: {warning:?}");
        }
        log::debug!(
            "Summary: exit={:.4} default={:.4} refi_fail={:.4} survived_no_exit={:.4} var={:?}",
            probabilities.exit,
            probabilities.default,
            probabilities.refi_fail,
            probabilities.survived_no_exit,
            value_at_risk.map(|v| v.loss_fraction)
        );

        RiskSummary {
            iterations: results.len(),
            master_seed: results.master_seed,
            initial_equity,
            counts,
            probabilities,
            anomaly_rate,
            value_at_risk,
            var_levels,
            expected_loss,
            irr,
            exit_multiple,
            risk_adjusted_return,
            survival_curve,
            warnings,
        }
    }
}

/// Loss over initial equity. Final equity below zero is a full wipeout, so
/// the loss never exceeds the initial equity. Gains give negative losses.
pub fn loss_fraction(final_equity: f64, initial_equity: f64) -> f64 {
    (initial_equity - final_equity).min(initial_equity) / initial_equity
}

/// Linear interpolation between closest ranks of a sorted sample.
pub fn percentile(sorted: &[f64], q: f64) -> f64 {
    match sorted.len() {
        0 => f64::NAN,
        1 => sorted[0],
        n => {
            let rank = q.clamp(0.0, 1.0) * (n - 1) as f64;
            let lo = rank.floor() as usize;
            let hi = rank.ceil() as usize;
            let weight = rank - lo as f64;
            sorted[lo] + (sorted[hi] - sorted[lo]) * weight
        }
    }
}

/// Share of paths alive at each month 0..=horizon. Summed per month
/// independently, so record order does not matter.
pub fn survival_curve<'a>(records: impl Iterator<Item = &'a OutcomeRecord>, horizon: Month) -> Vec<f64> {
    let len = horizon as usize + 1;
    let mut alive_counts = vec![0usize; len];
    let mut paths = 0usize;
    for record in records {
        paths += 1;
        for (count, &alive) in alive_counts.iter_mut().zip(&record.alive) {
            if alive {
                *count += 1;
            }
        }
    }
    if paths == 0 {
        return Vec::new();
    }
    alive_counts.into_iter().map(|c| c as f64 / paths as f64).collect()
}
