use crate::{
    error::ConfigError,
    phase::Phase,
    sampler::{round_delay, TriangularDist},
    types::Month,
};
use serde::{Deserialize, Serialize};
use std::path::Path;

// ── Timeline ───────────────────────────────────────────────────────

/// Phase boundary months, before any construction delay is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseSchedule {
    /// First month with operating revenue.
    pub construction_end: Month,
    /// Month at whose end the refinancing gate is evaluated.
    pub refinancing_month: Month,
    /// First month at post-opening revenue.
    pub demand_driver_month: Month,
    /// Month at whose end the asset is sold.
    pub exit_month: Month,
}

impl PhaseSchedule {
    /// Every boundary moved later by `delay` months.
    pub fn shifted(&self, delay: Month) -> Self {
        Self {
            construction_end: self.construction_end + delay,
            refinancing_month: self.refinancing_month + delay,
            demand_driver_month: self.demand_driver_month + delay,
            exit_month: self.exit_month + delay,
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let increasing = self.construction_end >= 1
            && self.construction_end < self.refinancing_month
            && self.refinancing_month < self.demand_driver_month
            && self.demand_driver_month < self.exit_month;
        if !increasing {
            return Err(ConfigError::NonIncreasingBoundaries {
                construction_end: self.construction_end,
                refinancing: self.refinancing_month,
                demand_driver: self.demand_driver_month,
                exit: self.exit_month,
            });
        }
        Ok(())
    }
}

// ── Interest capitalization ────────────────────────────────────────

/// Fraction of each month's interest added to principal instead of paid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CapitalizationRatios {
    pub construction: f64,
    pub critical_window: f64,
    pub stabilization: f64,
    pub post_opening: f64,
}

impl CapitalizationRatios {
    pub fn for_phase(&self, phase: Phase) -> f64 {
        match phase {
            Phase::Construction   => self.construction,
            Phase::CriticalWindow => self.critical_window,
            Phase::Stabilization  => self.stabilization,
            Phase::PostOpening    => self.post_opening,
        }
    }

    /// All interest paid in cash in every phase.
    pub const fn cash_pay() -> Self {
        Self {
            construction: 0.0,
            critical_window: 0.0,
            stabilization: 0.0,
            post_opening: 0.0,
        }
    }
}

impl Default for CapitalizationRatios {
    fn default() -> Self {
        Self {
            construction: 1.0,
            critical_window: 0.4,
            stabilization: 0.4,
            post_opening: 0.0,
        }
    }
}

// ── Stochastic inputs ──────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Distributions {
    pub pre_refi_rate: TriangularDist,
    pub post_refi_rate: TriangularDist,
    pub stabilization_revenue: TriangularDist,
    pub post_opening_revenue: TriangularDist,
    /// Continuous months; each draw is rounded to a whole month.
    pub construction_delay: TriangularDist,
    pub refi_ltv: TriangularDist,
}

impl Distributions {
    fn validate(&self) -> Result<(), ConfigError> {
        self.pre_refi_rate.validate("pre_refi_rate")?;
        self.post_refi_rate.validate("post_refi_rate")?;
        self.stabilization_revenue.validate("stabilization_revenue")?;
        self.post_opening_revenue.validate("post_opening_revenue")?;
        self.construction_delay.validate("construction_delay")?;
        self.refi_ltv.validate("refi_ltv")?;
        check_ratio("refi_ltv.min", self.refi_ltv.min)?;
        check_ratio("refi_ltv.max", self.refi_ltv.max)?;
        Ok(())
    }
}

// ── Run configuration ──────────────────────────────────────────────

/// The immutable parameter set for one run. Shared read-only by every worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskConfig {
    /// Months covered by the survival curve. Must fit the latest possible exit.
    pub horizon_months: Month,
    pub schedule: PhaseSchedule,
    pub initial_equity: f64,
    pub initial_debt: f64,
    /// Subtracted from revenue to get NOI. Zero when costs are netted upstream.
    #[serde(default)]
    pub monthly_operating_cost: f64,
    /// Equity charge per month of delay, as a multiple of the operating cost.
    #[serde(default)]
    pub delay_carry_cost_factor: f64,
    pub distributions: Distributions,
    #[serde(default)]
    pub capitalization: CapitalizationRatios,
    pub exit_cap_rate: f64,
    pub exit_cost_rate: f64,
    /// Months of trailing NOI averaged for refinancing and exit valuation.
    pub noi_lookback_months: usize,
}

impl RiskConfig {
    /// Load a JSON config file and validate it.
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Cannot read {}: {e}", path.display()))?;
        let config: RiskConfig = serde_json::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Cannot parse {}: {e}", path.display()))?;
        config.validate()?;
        log::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Reject anything the simulator cannot run. Nothing is clamped.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.distributions.validate()?;
        self.schedule.validate()?;

        check_positive("initial_equity", self.initial_equity)?;
        check_positive("initial_debt", self.initial_debt)?;
        check_positive("exit_cap_rate", self.exit_cap_rate)?;
        check_non_negative("monthly_operating_cost", self.monthly_operating_cost)?;
        check_non_negative("delay_carry_cost_factor", self.delay_carry_cost_factor)?;

        check_ratio("capitalization.construction", self.capitalization.construction)?;
        check_ratio("capitalization.critical_window", self.capitalization.critical_window)?;
        check_ratio("capitalization.stabilization", self.capitalization.stabilization)?;
        check_ratio("capitalization.post_opening", self.capitalization.post_opening)?;
        check_ratio("exit_cost_rate", self.exit_cost_rate)?;

        if self.noi_lookback_months == 0 {
            return Err(ConfigError::EmptyLookback);
        }

        let max_delay = self.max_construction_delay();
        let latest_exit = self.schedule.exit_month.checked_add(max_delay);
        if latest_exit.map_or(true, |exit| self.horizon_months < exit) {
            return Err(ConfigError::HorizonTooShort {
                horizon: self.horizon_months,
                exit: self.schedule.exit_month,
                max_delay,
            });
        }
        Ok(())
    }

    /// Largest delay any draw can round to.
    pub fn max_construction_delay(&self) -> Month {
        round_delay(self.distributions.construction_delay.max)
    }

    /// Absolute-unit base case: a 36-month development with a 5.6B equity
    /// cheque against 19.0B of senior debt.
    ///
    /// Calibrated, not the raw underwriting inputs. Operating cost is 10M a
    /// month rather than 100M. Construction interest is cash-paid rather than
    /// fully capitalized, with a 3-month NOI lookback rather than 6. The raw
    /// inputs fail refinancing on every path.
    pub fn base_case() -> Self {
        Self {
            horizon_months: 42,
            schedule: PhaseSchedule {
                construction_end: 16,
                refinancing_month: 19,
                demand_driver_month: 24,
                exit_month: 36,
            },
            initial_equity: 5_600_000_000.0,
            initial_debt: 19_000_000_000.0,
            monthly_operating_cost: 10_000_000.0,
            delay_carry_cost_factor: 0.6,
            distributions: Distributions {
                pre_refi_rate: TriangularDist::new(0.10, 0.14, 0.18),
                post_refi_rate: TriangularDist::new(0.05, 0.07, 0.09),
                stabilization_revenue: TriangularDist::new(50e6, 120e6, 150e6),
                post_opening_revenue: TriangularDist::new(120e6, 200e6, 250e6),
                construction_delay: TriangularDist::new(0.0, 2.0, 6.0),
                refi_ltv: TriangularDist::new(0.70, 0.80, 0.85),
            },
            // Construction interest is serviced from the equity cheque.
            capitalization: CapitalizationRatios {
                construction: 0.0,
                ..CapitalizationRatios::default()
            },
            exit_cap_rate: 0.055,
            exit_cost_rate: 0.015,
            noi_lookback_months: 3,
        }
    }

    /// [`base_case`](Self::base_case) with every capital figure indexed to
    /// initial equity = 100. Carries the same calibration.
    pub fn public_normalized() -> Self {
        let mut config = Self::base_case();
        config.initial_equity = 100.0;
        config.initial_debt = 339.3;
        config.monthly_operating_cost = 0.179;
        config.distributions.stabilization_revenue = TriangularDist::new(0.89, 2.14, 2.68);
        config.distributions.post_opening_revenue = TriangularDist::new(2.14, 3.57, 4.46);
        config
    }

    /// Config with single-valued distributions for use in tests.
    /// Every path it produces is identical.
    pub fn default_test() -> Self {
        Self {
            horizon_months: 36,
            schedule: PhaseSchedule {
                construction_end: 16,
                refinancing_month: 19,
                demand_driver_month: 24,
                exit_month: 36,
            },
            initial_equity: 5_600_000_000.0,
            initial_debt: 19_000_000_000.0,
            monthly_operating_cost: 0.0,
            delay_carry_cost_factor: 0.0,
            distributions: Distributions {
                pre_refi_rate: TriangularDist::fixed(0.14),
                post_refi_rate: TriangularDist::fixed(0.07),
                stabilization_revenue: TriangularDist::fixed(120e6),
                post_opening_revenue: TriangularDist::fixed(200e6),
                construction_delay: TriangularDist::fixed(0.0),
                refi_ltv: TriangularDist::fixed(0.80),
            },
            capitalization: CapitalizationRatios::cash_pay(),
            exit_cap_rate: 0.055,
            exit_cost_rate: 0.015,
            noi_lookback_months: 3,
        }
    }
}

fn check_positive(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::NonPositive { field, value })
    }
}

fn check_non_negative(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::Negative { field, value })
    }
}

fn check_ratio(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::RatioOutOfRange { field, value })
    }
}
