//! Same config, same N, same seed: identical ResultSets, whatever the
//! scheduling. Any divergence here breaks reproducibility of every report.

use pf_risk_core::{
    engine::{MonteCarloEngine, RunSettings},
    RiskConfig,
};

const SEED: u64 = 0xDEAD_BEEF_CAFE_1234;
const PATHS: usize = 2_000;

fn engine() -> MonteCarloEngine {
    let _ = env_logger::builder().is_test(true).try_init();
    MonteCarloEngine::new(RiskConfig::base_case()).expect("valid base case")
}

fn assert_bit_identical(a: &[pf_risk_core::OutcomeRecord], b: &[pf_risk_core::OutcomeRecord]) {
    assert_eq!(a.len(), b.len(), "Result set sizes differ");
    for (i, (x, y)) in a.iter().zip(b).enumerate() {
        assert_eq!(x.path_index, y.path_index, "order diverged at {i}");
        assert_eq!(x.seed, y.seed);
        assert_eq!(x.outcome, y.outcome, "outcome diverged at path {i}");
        assert_eq!(x.month, y.month);
        assert_eq!(x.final_equity.to_bits(), y.final_equity.to_bits(), "equity diverged at path {i}");
        assert_eq!(x.irr.map(f64::to_bits), y.irr.map(f64::to_bits));
        assert_eq!(x.alive, y.alive);
    }
}

#[test]
fn same_seed_sequential_runs_are_identical() {
    let engine = engine();
    let settings = RunSettings::seeded(PATHS, SEED).sequential();
    let a = engine.run(&settings).expect("run a");
    let b = engine.run(&settings).expect("run b");
    assert_bit_identical(&a.records, &b.records);
}

#[test]
fn parallel_matches_sequential() {
    let engine = engine();
    let sequential = engine.run(&RunSettings::seeded(PATHS, SEED).sequential()).expect("sequential");
    let parallel = engine.run(&RunSettings::seeded(PATHS, SEED)).expect("parallel");
    assert_bit_identical(&sequential.records, &parallel.records);
}

#[test]
fn thread_cap_does_not_change_results() {
    let engine = engine();
    let wide = engine.run(&RunSettings::seeded(PATHS, SEED)).expect("wide");
    let narrow = engine
        .run(&RunSettings { threads: Some(2), ..RunSettings::seeded(PATHS, SEED) })
        .expect("narrow");
    assert_bit_identical(&wide.records, &narrow.records);
}

#[test]
fn different_seeds_produce_different_results() {
    let engine = engine();
    let a = engine.run(&RunSettings::seeded(500, 42)).expect("run a");
    let b = engine.run(&RunSettings::seeded(500, 99)).expect("run b");
    let any_different = a
        .records
        .iter()
        .zip(&b.records)
        .any(|(x, y)| x.draw != y.draw);
    assert!(any_different, "Different seeds produced identical draws; the seed is not being used");
}

#[test]
fn any_path_replays_in_isolation() {
    let engine = engine();
    let results = engine.run(&RunSettings::seeded(300, SEED)).expect("run");
    for index in [0u64, 17, 299] {
        let replayed = engine.replay_path(results.master_seed, index).expect("replay");
        assert_eq!(replayed, results.records[index as usize]);
    }
}

#[test]
fn entropy_seed_is_reported_and_reproducible() {
    let engine = engine();
    let first = engine
        .run(&RunSettings { iterations: 200, ..RunSettings::default() })
        .expect("entropy run");
    let again = engine
        .run(&RunSettings::seeded(200, first.master_seed))
        .expect("replay run");
    assert_bit_identical(&first.records, &again.records);
}
