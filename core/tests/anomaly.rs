//! Paths that break an internal invariant are isolated, not averaged in.

use pf_risk_core::{
    engine::{MonteCarloEngine, RunSettings},
    error::SimulationAnomaly,
    phase::Outcome,
    risk::{AggregationWarning, RiskAggregator},
    sampler::TriangularDist,
    RiskConfig,
};

fn with_stabilization_revenue(dist: TriangularDist) -> RiskConfig {
    let mut config = RiskConfig::default_test();
    config.distributions.stabilization_revenue = dist;
    config
}

#[test]
fn negative_revenue_aborts_every_path() {
    let engine = MonteCarloEngine::new(with_stabilization_revenue(TriangularDist::fixed(-1.0))).unwrap();
    let results = engine.run(&RunSettings::seeded(50, 3)).unwrap();

    for record in &results.records {
        assert_eq!(record.outcome, Outcome::Anomaly);
        assert_eq!(record.month, 16);
        assert_eq!(record.final_equity, 0.0);
        assert_eq!(
            record.anomaly,
            Some(SimulationAnomaly::NegativeRevenue { month: 16, revenue: -1.0 })
        );
    }

    let summary = RiskAggregator::default().summarize(&results);
    assert_eq!(summary.counts.anomaly, 50);
    assert_eq!(summary.anomaly_rate, 1.0);
    assert!(summary.warnings.contains(&AggregationWarning::NoCleanPaths));
    assert!(summary.value_at_risk.is_none());
    assert!(summary.var_levels.is_empty());
    assert!(summary.expected_loss.is_none());
    assert!(summary.survival_curve.is_empty());
    assert!(summary.irr.is_none());
}

#[test]
fn mixed_revenue_isolates_negative_draws() {
    let config = with_stabilization_revenue(TriangularDist::new(-20e6, 60e6, 120e6));
    let engine = MonteCarloEngine::new(config).unwrap();
    let results = engine.run(&RunSettings::seeded(2_000, 11)).unwrap();

    let anomalies: Vec<_> = results
        .records
        .iter()
        .filter(|r| r.outcome == Outcome::Anomaly)
        .collect();
    // P(revenue < 0) = 20^2 / (140 * 80), about 3.6%.
    assert!(!anomalies.is_empty());
    assert!(anomalies.len() < results.len() / 5);
    for record in &anomalies {
        assert!(record.draw.stabilization_revenue < 0.0);
        assert_eq!(record.month, 16);
        assert_eq!(record.final_equity, 0.0);
        assert!(matches!(
            record.anomaly,
            Some(SimulationAnomaly::NegativeRevenue { month: 16, .. })
        ));
    }
    for record in results.clean_records() {
        assert!(record.draw.stabilization_revenue >= 0.0);
        assert!(record.anomaly.is_none());
    }

    let summary = RiskAggregator::default().summarize(&results);
    assert_eq!(summary.counts.anomaly, anomalies.len());
    assert!((summary.probabilities.total() - 1.0).abs() < 1e-12);
    assert_eq!(summary.survival_at(0), Some(1.0));
    assert!(summary
        .warnings
        .iter()
        .any(|w| matches!(w, AggregationWarning::AnomalousPaths { .. })));
}
