//! Path simulator: one realization of the project's monthly cash flows.
//!
//! MONTHLY ORDER (fixed, documented, never reordered):
//!   1. Phase from the delay-shifted schedule
//!   2. Revenue for the phase
//!   3. Interest at the active rate (pre- or post-refinancing)
//!   4. Capitalization split, cash waterfall, sweep or equity draw
//!   5. Trailing-NOI window update
//!   6. Checkpoints via phase::transition (insolvency, gate, exit)
//!
//! A path is a pure function of (config, draw). It performs no I/O and
//! owns its PathState exclusively.

use crate::{
    config::{PhaseSchedule, RiskConfig},
    error::{ConfigError, SimulationAnomaly},
    irr,
    noi_window::NoiWindow,
    phase::{self, GateCheck, MonthEnd, Outcome, Phase, ProjectState},
    rng::PathRng,
    sampler::StochasticDraw,
    types::{Month, PathIndex, MONTHS_PER_YEAR},
};
use serde::Serialize;

/// Mutable state of one path, advanced one month at a time.
#[derive(Debug, Clone)]
pub struct PathState {
    pub month: Month,
    pub state: ProjectState,
    pub debt: f64,
    /// Interest added to principal so far.
    pub capitalized_interest: f64,
    pub equity_balance: f64,
    pub revenue: f64,
    pub interest: f64,
    /// Interest paid in cash this month.
    pub debt_service: f64,
    pub refinanced: bool,
    pub noi_window: NoiWindow,
}

impl PathState {
    /// Fresh state before month 1, in whichever phase month 1 falls.
    pub fn new(config: &RiskConfig, schedule: &PhaseSchedule) -> Self {
        Self {
            month: 0,
            state: ProjectState::Operating(Phase::at_month(1, schedule)),
            debt: config.initial_debt,
            capitalized_interest: 0.0,
            equity_balance: config.initial_equity,
            revenue: 0.0,
            interest: 0.0,
            debt_service: 0.0,
            refinanced: false,
            noi_window: NoiWindow::new(config.noi_lookback_months),
        }
    }
}

/// Terminal artifact of one path. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutcomeRecord {
    pub path_index: PathIndex,
    /// Per-path seed; replays this path on its own.
    pub seed: u64,
    pub outcome: Outcome,
    /// Month the path terminated.
    pub month: Month,
    /// Exit equity for exits and unsold paths; zero after default or refi failure.
    pub final_equity: f64,
    /// Annualised equity IRR; exits only.
    pub irr: Option<f64>,
    /// Sale proceeds net of debt and costs over initial equity; exits only.
    /// Unlike `irr`, this excludes the undrawn equity balance.
    pub exit_multiple: Option<f64>,
    /// Undrawn equity balance at termination. Returned to the investor at
    /// exit, so it is part of the IRR payoff.
    pub residual_equity_balance: f64,
    /// Interest added to principal over the life of the path.
    pub capitalized_interest: f64,
    pub draw: StochasticDraw,
    pub anomaly: Option<SimulationAnomaly>,
    /// `alive[m]` is false once the path has defaulted or failed refinancing
    /// at or before month m. Indexed 0..=horizon.
    pub alive: Vec<bool>,
}

impl OutcomeRecord {
    pub fn construction_delay(&self) -> Month {
        self.draw.construction_delay
    }
}

/// Audit trail of one path's checkpoints.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PathEvent {
    PhaseEntered {
        month: Month,
        phase: Phase,
    },
    DelayCharged {
        month: Month,
        delay_months: Month,
        amount: f64,
    },
    GateEvaluated {
        month: Month,
        debt: f64,
        property_value: f64,
        ltv_threshold: f64,
        passed: bool,
    },
    ExitValued {
        month: Month,
        property_value: f64,
        debt: f64,
        exit_cost: f64,
        exit_equity: f64,
    },
    Terminated {
        month: Month,
        outcome: Outcome,
        equity_balance: f64,
        debt: f64,
        capitalized_interest: f64,
    },
    AnomalyRaised {
        anomaly: SimulationAnomaly,
    },
}

/// Runs paths against one validated config.
#[derive(Debug, Clone, Copy)]
pub struct PathSimulator<'a> {
    config: &'a RiskConfig,
}

impl<'a> PathSimulator<'a> {
    pub fn new(config: &'a RiskConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &'a RiskConfig {
        self.config
    }

    /// Draw this path's inputs from `rng` and simulate it.
    pub fn simulate(&self, rng: &mut PathRng) -> OutcomeRecord {
        let draw = StochasticDraw::sample(self.config, rng);
        self.simulate_draw(rng.path_index, rng.seed(), &draw)
    }

    /// Simulate a path from an explicit draw.
    pub fn simulate_draw(&self, path_index: PathIndex, seed: u64, draw: &StochasticDraw) -> OutcomeRecord {
        self.run(path_index, seed, draw, None)
    }

    /// Like [`simulate`](Self::simulate), also returning every checkpoint event.
    pub fn simulate_traced(&self, rng: &mut PathRng) -> (OutcomeRecord, Vec<PathEvent>) {
        let draw = StochasticDraw::sample(self.config, rng);
        let mut events = Vec::new();
        let record = self.run(rng.path_index, rng.seed(), &draw, Some(&mut events));
        (record, events)
    }

    fn run(
        &self,
        path_index: PathIndex,
        seed: u64,
        draw: &StochasticDraw,
        mut trace: Option<&mut Vec<PathEvent>>,
    ) -> OutcomeRecord {
        let schedule = self.config.schedule.shifted(draw.construction_delay);
        let mut ps = PathState::new(self.config, &schedule);
        let mut exit_equity = 0.0;

        if let (Some(events), ProjectState::Operating(phase)) = (trace.as_deref_mut(), ps.state) {
            events.push(PathEvent::PhaseEntered { month: 1, phase });
        }

        while !ps.state.is_terminal() && ps.month < schedule.exit_month {
            let previous = ps.state;
            match self.step(&mut ps, draw, &schedule, trace.as_deref_mut()) {
                Ok(Some(equity)) => exit_equity = equity,
                Ok(None) => {}
                Err(anomaly) => {
                    log::debug!("path={path_index} seed={seed} aborted: {anomaly}");
                    if let Some(events) = trace.as_deref_mut() {
                        events.push(PathEvent::AnomalyRaised { anomaly: anomaly.clone() });
                    }
                    return self.anomaly_record(path_index, seed, draw, &ps, anomaly);
                }
            }

            if let Some(events) = trace.as_deref_mut() {
                match ps.state {
                    ProjectState::Operating(phase) if previous != ps.state => {
                        events.push(PathEvent::PhaseEntered { month: ps.month + 1, phase });
                    }
                    ProjectState::Terminated(outcome) => events.push(PathEvent::Terminated {
                        month: ps.month,
                        outcome,
                        equity_balance: ps.equity_balance,
                        debt: ps.debt,
                        capitalized_interest: ps.capitalized_interest,
                    }),
                    _ => {}
                }
            }
        }

        let outcome = match ps.state {
            ProjectState::Terminated(outcome) => outcome,
            // The exit checkpoint always terminates; reaching here means the
            // schedule ended without one.
            ProjectState::Operating(_) => Outcome::SurvivedNoExit,
        };

        log::trace!(
            "path={path_index} outcome={} month={} debt={:.2} equity_balance={:.2}",
            outcome.name(),
            ps.month,
            ps.debt,
            ps.equity_balance
        );

        self.terminal_record(path_index, seed, draw, &ps, outcome, exit_equity)
    }

    /// Advance one month. Returns the exit equity on the exit month.
    fn step(
        &self,
        ps: &mut PathState,
        draw: &StochasticDraw,
        schedule: &PhaseSchedule,
        mut trace: Option<&mut Vec<PathEvent>>,
    ) -> Result<Option<f64>, SimulationAnomaly> {
        let cfg = self.config;
        ps.month += 1;
        let month = ps.month;

        let phase = match ps.state {
            ProjectState::Operating(phase) => phase,
            ProjectState::Terminated(_) => return Ok(None),
        };

        ps.revenue = match phase {
            Phase::Construction => 0.0,
            Phase::CriticalWindow | Phase::Stabilization => draw.stabilization_revenue,
            Phase::PostOpening => draw.post_opening_revenue,
        };
        if ps.revenue < 0.0 {
            return Err(SimulationAnomaly::NegativeRevenue { month, revenue: ps.revenue });
        }

        let annual_rate = if ps.refinanced { draw.post_refi_rate } else { draw.pre_refi_rate };
        ps.interest = ps.debt * annual_rate / MONTHS_PER_YEAR;

        let capitalized = ps.interest * cfg.capitalization.for_phase(phase);
        ps.debt += capitalized;
        ps.capitalized_interest += capitalized;
        ps.debt_service = ps.interest - capitalized;

        let noi = ps.revenue - cfg.monthly_operating_cost;
        let net_cash_flow = noi - ps.debt_service;
        if net_cash_flow > 0.0 {
            ps.debt -= net_cash_flow;
            if ps.debt < 0.0 {
                ps.equity_balance -= ps.debt;
                ps.debt = 0.0;
            }
        } else {
            ps.equity_balance += net_cash_flow;
        }

        if month == schedule.construction_end && draw.construction_delay > 0 {
            let amount = f64::from(draw.construction_delay)
                * cfg.monthly_operating_cost
                * cfg.delay_carry_cost_factor;
            ps.equity_balance -= amount;
            if let Some(events) = trace.as_deref_mut() {
                events.push(PathEvent::DelayCharged {
                    month,
                    delay_months: draw.construction_delay,
                    amount,
                });
            }
        }

        ps.noi_window.push(noi);
        check_finite(month, "debt", ps.debt)?;
        check_finite(month, "equity_balance", ps.equity_balance)?;
        check_finite(month, "interest", ps.interest)?;

        let gate = (month == schedule.refinancing_month).then(|| GateCheck {
            debt: ps.debt,
            property_value: phase::property_value(ps.noi_window.average(), cfg.exit_cap_rate),
            ltv_threshold: draw.refi_ltv_threshold,
        });

        let exit_equity = (month == schedule.exit_month).then(|| {
            let property_value = phase::property_value(ps.noi_window.average(), cfg.exit_cap_rate);
            let exit_cost = property_value * cfg.exit_cost_rate;
            let exit_equity = property_value - ps.debt - exit_cost;
            if let Some(events) = trace.as_deref_mut() {
                events.push(PathEvent::ExitValued {
                    month,
                    property_value,
                    debt: ps.debt,
                    exit_cost,
                    exit_equity,
                });
            }
            exit_equity
        });

        let end = MonthEnd {
            month,
            equity_balance: ps.equity_balance,
            gate,
            exit_equity,
        };
        let next = phase::transition(ps.state, schedule, &end);

        // The gate is only reported when it was actually reached.
        if let (Some(gate), Some(events)) = (gate, trace) {
            if ps.equity_balance > 0.0 {
                events.push(PathEvent::GateEvaluated {
                    month,
                    debt: gate.debt,
                    property_value: gate.property_value,
                    ltv_threshold: gate.ltv_threshold,
                    passed: gate.passes(),
                });
            }
        }

        ps.state = next.state;
        if next.refinanced {
            ps.refinanced = true;
        }
        Ok(exit_equity)
    }

    fn terminal_record(
        &self,
        path_index: PathIndex,
        seed: u64,
        draw: &StochasticDraw,
        ps: &PathState,
        outcome: Outcome,
        exit_equity: f64,
    ) -> OutcomeRecord {
        let initial_equity = self.config.initial_equity;
        let (final_equity, irr, exit_multiple) = match outcome {
            Outcome::Exit => {
                let flows = equity_cash_flows(initial_equity, ps.month, exit_equity + ps.equity_balance);
                (exit_equity, irr::annual_irr(&flows), Some(exit_equity / initial_equity))
            }
            Outcome::SurvivedNoExit => (exit_equity, None, None),
            Outcome::Default | Outcome::RefiFail | Outcome::Anomaly => (0.0, None, None),
        };

        OutcomeRecord {
            path_index,
            seed,
            outcome,
            month: ps.month,
            final_equity,
            irr,
            exit_multiple,
            residual_equity_balance: ps.equity_balance,
            capitalized_interest: ps.capitalized_interest,
            draw: *draw,
            anomaly: None,
            alive: alive_flags(self.config.horizon_months, outcome, ps.month),
        }
    }

    fn anomaly_record(
        &self,
        path_index: PathIndex,
        seed: u64,
        draw: &StochasticDraw,
        ps: &PathState,
        anomaly: SimulationAnomaly,
    ) -> OutcomeRecord {
        let mut record = self.terminal_record(path_index, seed, draw, ps, Outcome::Anomaly, 0.0);
        record.anomaly = Some(anomaly);
        record
    }
}

/// Equity investor flows: the initial cheque at month 0 and the sale
/// proceeds plus any undrawn equity at the exit month.
pub fn equity_cash_flows(initial_equity: f64, exit_month: Month, proceeds: f64) -> Vec<f64> {
    let mut flows = vec![0.0; exit_month as usize + 1];
    flows[0] = -initial_equity;
    flows[exit_month as usize] += proceeds;
    flows
}

/// Month-indexed survival flags for a path that ended at `month`.
pub fn alive_flags(horizon: Month, outcome: Outcome, month: Month) -> Vec<bool> {
    let len = horizon as usize + 1;
    let mut alive = vec![true; len];
    if outcome.is_failure() {
        let from = (month as usize).min(len);
        alive[from..].iter_mut().for_each(|flag| *flag = false);
    }
    alive
}

fn check_finite(month: Month, field: &'static str, value: f64) -> Result<(), SimulationAnomaly> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(SimulationAnomaly::NonFiniteState { month, field })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CapitalizationRatios;

    #[test]
    fn alive_flags_drop_from_failure_month() {
        let flags = alive_flags(6, Outcome::Default, 4);
        assert_eq!(flags, vec![true, true, true, true, false, false, false]);
    }

    #[test]
    fn exits_stay_alive_through_horizon() {
        let flags = alive_flags(5, Outcome::Exit, 3);
        assert!(flags.iter().all(|&f| f));
        assert_eq!(flags.len(), 6);
    }

    #[test]
    fn cash_flows_bracket_the_holding_period() {
        let flows = equity_cash_flows(100.0, 4, 150.0);
        assert_eq!(flows, vec![-100.0, 0.0, 0.0, 0.0, 150.0]);
    }

    #[test]
    fn path_state_starts_in_construction() {
        let config = RiskConfig::default_test();
        let ps = PathState::new(&config, &config.schedule);
        assert_eq!(ps.state, ProjectState::Operating(Phase::Construction));
        assert_eq!(ps.debt, config.initial_debt);
        assert_eq!(ps.equity_balance, config.initial_equity);
        assert!(ps.noi_window.is_empty());
    }

    #[test]
    fn month_one_completion_starts_in_critical_window() {
        let mut config = RiskConfig::default_test();
        config.schedule.construction_end = 1;
        let ps = PathState::new(&config, &config.schedule);
        assert_eq!(ps.state, ProjectState::Operating(Phase::CriticalWindow));
    }

    #[test]
    fn capitalized_interest_is_reported_at_termination() {
        let mut config = RiskConfig::default_test();
        config.capitalization = CapitalizationRatios::default();
        let simulator = PathSimulator::new(&config).unwrap();
        let mut rng = PathRng::for_path(1, 0);
        let (record, events) = simulator.simulate_traced(&mut rng);

        let Some(PathEvent::Terminated { capitalized_interest, .. }) = events.last() else {
            panic!("trace must end in a termination");
        };
        // Fifteen construction months fully capitalized at 14% on at least 19B.
        assert!(*capitalized_interest > 15.0 * 19e9 * 0.14 / 12.0);
        assert_eq!(*capitalized_interest, record.capitalized_interest);
    }
}
