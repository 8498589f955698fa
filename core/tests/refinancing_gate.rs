//! Refinancing gate and checkpoint precedence, driven through full paths.
//!
//! The fixtures use a 12.0 loan at a 100% annual rate so monthly interest is
//! exactly 1.0, revenue of 1.0 so it is exactly serviced, and a 0.5 cap
//! rate so value = NOI × 24. Every figure is exact in binary floating point.

use pf_risk_core::{
    config::CapitalizationRatios,
    path::{PathEvent, PathSimulator},
    phase::Outcome,
    rng::PathRng,
    sampler::TriangularDist,
    RiskConfig,
};

fn knife_edge_config(ltv: f64) -> RiskConfig {
    let mut config = RiskConfig::default_test();
    config.initial_debt = 12.0;
    config.initial_equity = 100.0;
    config.exit_cap_rate = 0.5;
    config.exit_cost_rate = 0.0;
    config.noi_lookback_months = 3;
    config.capitalization = CapitalizationRatios::cash_pay();
    config.distributions.pre_refi_rate = TriangularDist::fixed(1.0);
    config.distributions.post_refi_rate = TriangularDist::fixed(1.0);
    config.distributions.stabilization_revenue = TriangularDist::fixed(1.0);
    config.distributions.post_opening_revenue = TriangularDist::fixed(1.0);
    config.distributions.refi_ltv = TriangularDist::fixed(ltv);
    config
}

fn gate_events(events: &[PathEvent]) -> Vec<&PathEvent> {
    events
        .iter()
        .filter(|e| matches!(e, PathEvent::GateEvaluated { .. }))
        .collect()
}

#[test]
fn debt_exactly_at_ltv_limit_refinances() {
    let config = knife_edge_config(0.5);
    let sim = PathSimulator::new(&config).unwrap();
    let (record, events) = sim.simulate_traced(&mut PathRng::for_path(1, 0));

    let gates = gate_events(&events);
    assert_eq!(gates.len(), 1);
    match gates[0] {
        PathEvent::GateEvaluated { month, debt, property_value, ltv_threshold, passed } => {
            assert_eq!(*month, 19);
            assert_eq!(*debt, 12.0);
            assert_eq!(*property_value * *ltv_threshold, 12.0);
            assert!(*passed, "inclusive boundary must pass");
        }
        _ => unreachable!(),
    }
    assert_eq!(record.outcome, Outcome::Exit);
}

#[test]
fn debt_above_ltv_limit_fails_refinancing() {
    let config = knife_edge_config(0.49);
    let sim = PathSimulator::new(&config).unwrap();
    let record = sim.simulate(&mut PathRng::for_path(1, 0));

    assert_eq!(record.outcome, Outcome::RefiFail);
    assert_eq!(record.month, 19);
    assert_eq!(record.final_equity, 0.0);
    assert!(record.irr.is_none());
    assert!(record.alive[18]);
    assert!(!record.alive[19]);
}

#[test]
fn insolvency_is_checked_before_the_gate() {
    // Equity runs out at exactly month 19 while the gate would also fail.
    let mut config = knife_edge_config(0.8);
    config.initial_equity = 17.0;
    config.distributions.stabilization_revenue = TriangularDist::fixed(0.5);
    let sim = PathSimulator::new(&config).unwrap();
    let (record, events) = sim.simulate_traced(&mut PathRng::for_path(1, 0));

    assert_eq!(record.outcome, Outcome::Default);
    assert_eq!(record.month, 19);
    assert!(gate_events(&events).is_empty(), "gate must not be evaluated after default");
}

#[test]
fn passed_gate_switches_rate_from_next_month() {
    let mut config = knife_edge_config(0.5);
    config.distributions.post_refi_rate = TriangularDist::fixed(0.0);
    let sim = PathSimulator::new(&config).unwrap();
    let record = sim.simulate(&mut PathRng::for_path(1, 0));

    // Months 20..=36 each sweep 1.0: the 12.0 loan is gone after month 31 and
    // the last five months flow back to equity.
    assert_eq!(record.outcome, Outcome::Exit);
    assert_eq!(record.final_equity, 24.0);
    assert_eq!(record.residual_equity_balance, 85.0 + 5.0);
}
