//! Construction delay shifts every later boundary by the same whole number
//! of months, never truncating or overlapping phases.

use pf_risk_core::{
    path::{PathEvent, PathSimulator},
    phase::{Outcome, Phase},
    rng::PathRng,
    sampler::TriangularDist,
    types::Month,
    RiskConfig,
};

fn delayed_config(delay: f64) -> RiskConfig {
    let mut config = RiskConfig::default_test();
    config.horizon_months = 42;
    config.distributions.construction_delay = TriangularDist::fixed(delay);
    config
}

fn phase_entries(events: &[PathEvent]) -> Vec<(Month, Phase)> {
    events
        .iter()
        .filter_map(|e| match e {
            PathEvent::PhaseEntered { month, phase } => Some((*month, *phase)),
            _ => None,
        })
        .collect()
}

#[test]
fn undelayed_path_follows_nominal_schedule() {
    let config = delayed_config(0.0);
    let (record, events) = PathSimulator::new(&config)
        .unwrap()
        .simulate_traced(&mut PathRng::for_path(5, 0));

    assert_eq!(
        phase_entries(&events),
        vec![
            (1, Phase::Construction),
            (16, Phase::CriticalWindow),
            (20, Phase::Stabilization),
            (24, Phase::PostOpening),
        ]
    );
    assert_eq!(record.month, 36);
    assert!(!events.iter().any(|e| matches!(e, PathEvent::DelayCharged { .. })));
}

#[test]
fn maximum_delay_shifts_every_boundary_by_six_months() {
    let config = delayed_config(6.0);
    let (record, events) = PathSimulator::new(&config)
        .unwrap()
        .simulate_traced(&mut PathRng::for_path(5, 0));

    assert_eq!(record.construction_delay(), 6);
    assert_eq!(
        phase_entries(&events),
        vec![
            (1, Phase::Construction),
            (22, Phase::CriticalWindow),
            (26, Phase::Stabilization),
            (30, Phase::PostOpening),
        ]
    );

    let gate_month = events.iter().find_map(|e| match e {
        PathEvent::GateEvaluated { month, .. } => Some(*month),
        _ => None,
    });
    assert_eq!(gate_month, Some(25));

    let charged = events.iter().find_map(|e| match e {
        PathEvent::DelayCharged { month, delay_months, .. } => Some((*month, *delay_months)),
        _ => None,
    });
    assert_eq!(charged, Some((22, 6)));

    assert_eq!(record.outcome, Outcome::Exit);
    assert_eq!(record.month, 42);
    assert_eq!(record.alive.len(), 43);
}

#[test]
fn delay_carry_cost_is_charged_at_completion() {
    let mut config = delayed_config(3.0);
    config.monthly_operating_cost = 10.0e6;
    config.delay_carry_cost_factor = 0.6;
    let (_, events) = PathSimulator::new(&config)
        .unwrap()
        .simulate_traced(&mut PathRng::for_path(5, 0));

    let amount = events.iter().find_map(|e| match e {
        PathEvent::DelayCharged { month: 19, amount, .. } => Some(*amount),
        _ => None,
    });
    let expected = 3.0 * 10.0e6 * 0.6;
    assert!((amount.expect("delay charged") - expected).abs() < 1e-6);
}

#[test]
fn horizon_must_fit_the_longest_delay() {
    let mut config = delayed_config(6.0);
    config.horizon_months = 41;
    assert!(PathSimulator::new(&config).is_err());
}

#[test]
fn completion_at_month_one_skips_construction() {
    let mut config = delayed_config(0.0);
    config.schedule.construction_end = 1;
    let (_, events) = PathSimulator::new(&config)
        .unwrap()
        .simulate_traced(&mut PathRng::for_path(5, 0));

    assert_eq!(
        phase_entries(&events),
        vec![
            (1, Phase::CriticalWindow),
            (20, Phase::Stabilization),
            (24, Phase::PostOpening),
        ]
    );
}

#[test]
fn delayed_month_one_completion_still_builds_first() {
    let mut config = delayed_config(2.0);
    config.schedule.construction_end = 1;
    let (_, events) = PathSimulator::new(&config)
        .unwrap()
        .simulate_traced(&mut PathRng::for_path(5, 0));

    assert_eq!(phase_entries(&events)[..2], [(1, Phase::Construction), (3, Phase::CriticalWindow)]);
}
