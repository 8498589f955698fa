//! Distribution sampler: one realization of every stochastic input per path.
//!
//! All six variables are drawn independently from triangular distributions.
//! There is no cross-variable correlation; that is a model assumption.

use crate::{
    config::RiskConfig,
    error::ConfigError,
    rng::UniformSource,
    types::Month,
};
use serde::{Deserialize, Serialize};

/// A triangular distribution given by (min, mode, max).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TriangularDist {
    pub min: f64,
    pub mode: f64,
    pub max: f64,
}

impl TriangularDist {
    pub const fn new(min: f64, mode: f64, max: f64) -> Self {
        Self { min, mode, max }
    }

    /// A single-valued distribution. Every draw returns `value`.
    pub const fn fixed(value: f64) -> Self {
        Self::new(value, value, value)
    }

    /// Fails fast on min > mode, mode > max or non-finite bounds.
    pub fn validate(&self, name: &'static str) -> Result<(), ConfigError> {
        let finite = self.min.is_finite() && self.mode.is_finite() && self.max.is_finite();
        if !finite || self.min > self.mode || self.mode > self.max {
            return Err(ConfigError::InvalidDistribution {
                name,
                min: self.min,
                mode: self.mode,
                max: self.max,
            });
        }
        Ok(())
    }

    /// Inverse-CDF draw. The density peaks at `mode`.
    pub fn sample<R: UniformSource + ?Sized>(&self, rng: &mut R) -> f64 {
        let u = rng.next_f64();
        self.quantile(u)
    }

    /// Inverse CDF at `u` in [0, 1].
    pub fn quantile(&self, u: f64) -> f64 {
        let span = self.max - self.min;
        if span <= 0.0 {
            return self.min;
        }
        let left = self.mode - self.min;
        let right = self.max - self.mode;
        let split = left / span;
        if u < split {
            self.min + (u * span * left).sqrt()
        } else {
            self.max - ((1.0 - u) * span * right).sqrt()
        }
    }
}

/// One realization of all stochastic inputs. Drawn once per path and never
/// mutated afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StochasticDraw {
    /// Annual rate charged until the refinancing gate passes.
    pub pre_refi_rate: f64,
    /// Annual rate charged after a successful refinancing.
    pub post_refi_rate: f64,
    /// Monthly revenue once construction completes.
    pub stabilization_revenue: f64,
    /// Monthly revenue from the demand-driver month onward.
    pub post_opening_revenue: f64,
    pub construction_delay: Month,
    pub refi_ltv_threshold: f64,
}

impl StochasticDraw {
    /// Draw every variable for one path. Draw order is fixed; changing it
    /// changes every seeded result.
    pub fn sample<R: UniformSource + ?Sized>(config: &RiskConfig, rng: &mut R) -> Self {
        let dists = &config.distributions;
        let pre_refi_rate = dists.pre_refi_rate.sample(rng);
        let post_refi_rate = dists.post_refi_rate.sample(rng);
        let stabilization_revenue = dists.stabilization_revenue.sample(rng);
        let post_opening_revenue = dists.post_opening_revenue.sample(rng);
        let construction_delay = round_delay(dists.construction_delay.sample(rng));
        let refi_ltv_threshold = dists.refi_ltv.sample(rng);

        Self {
            pre_refi_rate,
            post_refi_rate,
            stabilization_revenue,
            post_opening_revenue,
            construction_delay,
            refi_ltv_threshold,
        }
    }
}

/// Round a continuous delay to the nearest non-negative whole month.
pub fn round_delay(months: f64) -> Month {
    if !months.is_finite() || months <= 0.0 {
        return 0;
    }
    months.round() as Month
}
