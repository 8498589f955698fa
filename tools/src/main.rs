//! pf-risk-runner: headless Monte Carlo runner.
//!
//! Usage:
//!   pf-risk-runner --preset base --iterations 30000 --seed 42
//!   pf-risk-runner --config data/base_case.json --json
//!   pf-risk-runner --seed 42 --trace-path 17

use anyhow::{bail, Result};
use pf_risk_core::{
    engine::{MonteCarloEngine, RunSettings},
    risk::{RiskAggregator, RiskSummary, DEFAULT_CONFIDENCE},
    RiskConfig,
};
use std::env;
use std::time::Duration;

#[derive(serde::Serialize)]
struct JsonReport<'a> {
    summary: &'a RiskSummary,
    rows: Vec<pf_risk_core::results::PathRow>,
}

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let iterations = parse_arg(&args, "--iterations", 30_000usize);
    let seed = parse_opt::<u64>(&args, "--seed");
    let threads = parse_opt::<usize>(&args, "--threads");
    let timeout = parse_opt::<u64>(&args, "--timeout-secs").map(Duration::from_secs);
    let confidence = parse_arg(&args, "--confidence", DEFAULT_CONFIDENCE);
    let trace_path = parse_opt::<u64>(&args, "--trace-path");
    let sequential = args.iter().any(|a| a == "--sequential");
    let json = args.iter().any(|a| a == "--json");

    let config = match (find_value(&args, "--config"), find_value(&args, "--preset")) {
        (Some(path), _) => RiskConfig::load(path)?,
        (None, Some("public")) => RiskConfig::public_normalized(),
        (None, Some("base")) | (None, None) => RiskConfig::base_case(),
        (None, Some(other)) => bail!("Unknown preset '{other}' (expected base or public)"),
    };

    log::info!(
        "Config: horizon={} exit_month={} equity={} debt={}",
        config.horizon_months,
        config.schedule.exit_month,
        config.initial_equity,
        config.initial_debt
    );
    let engine = MonteCarloEngine::new(config)?;
    let aggregator = RiskAggregator::new(confidence)?;

    if let Some(index) = trace_path {
        let Some(seed) = seed else {
            bail!("--trace-path needs --seed to identify the run");
        };
        let (record, events) = engine.trace_path(seed, index)?;
        println!("{}", serde_json::to_string_pretty(&events)?);
        println!("{}", serde_json::to_string_pretty(&record)?);
        return Ok(());
    }

    let settings = RunSettings {
        iterations,
        seed,
        parallel: !sequential,
        threads,
        timeout,
    };

    if !json {
        println!("pf-risk-runner: PF liquidity risk");
        println!("  iterations: {iterations}");
        println!("  seed:       {}", seed.map_or("entropy".to_string(), |s| s.to_string()));
        println!("  mode:       {}", if sequential { "sequential" } else { "parallel" });
        println!();
    }

    let results = engine.run(&settings)?;
    let summary = aggregator.summarize(&results);
    log::info!("Aggregated {} paths at {:.0}% confidence", results.len(), aggregator.confidence() * 100.0);

    if json {
        let report = JsonReport { summary: &summary, rows: results.rows() };
        println!("{}", serde_json::to_string(&report)?);
    } else {
        print_summary(&summary);
    }
    Ok(())
}

fn print_summary(summary: &RiskSummary) {
    let p = &summary.probabilities;
    println!("=== OUTCOMES ===");
    println!("  master seed:       {}", summary.master_seed);
    println!("  paths:             {}", summary.iterations);
    println!("  exit:              {:.2}%", p.exit * 100.0);
    println!("  default:           {:.2}%", p.default * 100.0);
    println!("  refi_fail:         {:.2}%", p.refi_fail * 100.0);
    println!("  survived_no_exit:  {:.2}%", p.survived_no_exit * 100.0);
    if summary.counts.anomaly > 0 {
        println!("  anomaly:           {} ({:.2}%)", summary.counts.anomaly, summary.anomaly_rate * 100.0);
    }

    println!();
    println!("=== TAIL LOSS (fraction of initial equity) ===");
    for var in &summary.var_levels {
        println!("  VaR {:>4.1}%:        {:.1}%", var.confidence * 100.0, var.loss_fraction * 100.0);
    }
    match summary.expected_loss {
        Some(el) => println!("  expected loss:     {:.1}%", el * 100.0),
        None => println!("  expected loss:     undefined"),
    }

    println!();
    println!("=== EQUITY IRR (exits only) ===");
    match &summary.irr {
        None => println!("  undefined (no exits)"),
        Some(irr) => {
            println!("  exits:             {}", irr.count);
            println!("  median:            {:.2}%", irr.median * 100.0);
            println!("  mean:              {:.2}%", irr.mean * 100.0);
            match irr.std_dev {
                Some(sd) => println!("  std dev:           {:.2}%", sd * 100.0),
                None => println!("  std dev:           undefined"),
            }
            println!("  p25 / p75:         {:.2}% / {:.2}%", irr.p25 * 100.0, irr.p75 * 100.0);
        }
    }
    if let Some(multiple) = &summary.exit_multiple {
        println!("  exit multiple:     {:.2}x median", multiple.median);
    }

    println!();
    println!("=== SURVIVAL ===");
    for (month, share) in summary.survival_curve.iter().enumerate().step_by(6) {
        println!("  month {month:>3}:         {:.2}%", share * 100.0);
    }
}

fn find_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2).find(|w| w[0] == flag).map(|w| w[1].as_str())
}

fn parse_opt<T: std::str::FromStr>(args: &[String], flag: &str) -> Option<T> {
    find_value(args, flag).and_then(|v| v.parse().ok())
}

fn parse_arg<T: std::str::FromStr + Copy>(args: &[String], flag: &str, default: T) -> T {
    parse_opt(args, flag).unwrap_or(default)
}
