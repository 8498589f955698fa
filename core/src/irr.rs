//! Internal rate of return on monthly equity cash flows.

use crate::types::MONTHS_PER_YEAR;

const MAX_BISECTIONS: usize = 200;
const RATE_TOLERANCE: f64 = 1e-12;
const LOWEST_RATE: f64 = -0.999_999;
const HIGHEST_RATE: f64 = 1.0e6;

/// Net present value of `flows`, where `flows[t]` lands at the end of month t.
pub fn npv(monthly_rate: f64, flows: &[f64]) -> f64 {
    let growth = 1.0 + monthly_rate;
    let mut discount = 1.0;
    let mut total = 0.0;
    for &cash in flows {
        if cash != 0.0 {
            total += cash / discount;
        }
        discount *= growth;
    }
    total
}

/// Monthly rate at which the flows' NPV is zero, by bracketed bisection.
///
/// None when the flows never change sign or no root lies in the bracket.
pub fn monthly_irr(flows: &[f64]) -> Option<f64> {
    let has_outflow = flows.iter().any(|&c| c < 0.0);
    let has_inflow = flows.iter().any(|&c| c > 0.0);
    if !has_outflow || !has_inflow {
        return None;
    }

    let mut lo = LOWEST_RATE;
    let mut hi = 1.0;
    let mut f_lo = npv(lo, flows);
    let mut f_hi = npv(hi, flows);
    while f_lo.signum() == f_hi.signum() {
        if hi >= HIGHEST_RATE {
            return None;
        }
        lo = hi;
        f_lo = f_hi;
        hi *= 10.0;
        f_hi = npv(hi, flows);
    }

    for _ in 0..MAX_BISECTIONS {
        let mid = 0.5 * (lo + hi);
        let f_mid = npv(mid, flows);
        if f_mid == 0.0 || (hi - lo) < RATE_TOLERANCE {
            return Some(mid);
        }
        if f_mid.signum() == f_lo.signum() {
            lo = mid;
            f_lo = f_mid;
        } else {
            hi = mid;
        }
    }
    Some(0.5 * (lo + hi))
}

/// Compound a monthly rate to an annual one.
pub fn annualize(monthly_rate: f64) -> f64 {
    (1.0 + monthly_rate).powf(MONTHS_PER_YEAR) - 1.0
}

/// Annualised IRR of monthly flows.
pub fn annual_irr(flows: &[f64]) -> Option<f64> {
    monthly_irr(flows).map(annualize)
}
