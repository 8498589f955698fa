//! Project state machine.
//!
//! Operating phases run in strict forward order:
//!   Construction → CriticalWindow → Stabilization → PostOpening
//! and every path ends in exactly one terminal outcome. Terminal states are
//! absorbing. The transition function is pure: it sees only the month-end
//! facts handed to it, so the checkpoint rules can be tested in isolation.
//!
//! CHECKPOINT ORDER (fixed, never reordered):
//!   1. Insolvency: every month
//!   2. Refinancing: once, at the refinancing month
//!   3. Exit: once, at the exit month

use crate::{config::PhaseSchedule, types::{Month, MONTHS_PER_YEAR}};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Construction,
    /// Built and earning, debt not yet refinanced.
    CriticalWindow,
    /// Refinanced, demand driver not yet active.
    Stabilization,
    PostOpening,
}

impl Phase {
    /// Phase of `month` given boundaries already shifted by the path's delay.
    pub fn at_month(month: Month, schedule: &PhaseSchedule) -> Self {
        if month < schedule.construction_end {
            Phase::Construction
        } else if month <= schedule.refinancing_month {
            Phase::CriticalWindow
        } else if month < schedule.demand_driver_month {
            Phase::Stabilization
        } else {
            Phase::PostOpening
        }
    }
}

/// How a path ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Exit,
    Default,
    RefiFail,
    SurvivedNoExit,
    /// Aborted on a broken invariant. Kept apart from the financial outcomes.
    Anomaly,
}

impl Outcome {
    pub const ALL: [Outcome; 5] = [
        Outcome::Exit,
        Outcome::Default,
        Outcome::RefiFail,
        Outcome::SurvivedNoExit,
        Outcome::Anomaly,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Outcome::Exit           => "exit",
            Outcome::Default        => "default",
            Outcome::RefiFail       => "refi_fail",
            Outcome::SurvivedNoExit => "survived_no_exit",
            Outcome::Anomaly        => "anomaly",
        }
    }

    /// Default and refinancing failure kill the path for the survival curve.
    pub fn is_failure(&self) -> bool {
        matches!(self, Outcome::Default | Outcome::RefiFail)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "value", rename_all = "snake_case")]
pub enum ProjectState {
    Operating(Phase),
    Terminated(Outcome),
}

impl ProjectState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ProjectState::Terminated(_))
    }
}

/// Income-approach valuation: annualised NOI capitalised at `cap_rate`.
pub fn property_value(trailing_noi: f64, cap_rate: f64) -> f64 {
    trailing_noi * MONTHS_PER_YEAR / cap_rate
}

/// Inputs to the refinancing gate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GateCheck {
    pub debt: f64,
    pub property_value: f64,
    pub ltv_threshold: f64,
}

impl GateCheck {
    /// Inclusive: debt exactly at the LTV limit refinances.
    pub fn passes(&self) -> bool {
        self.debt <= self.property_value * self.ltv_threshold
    }
}

/// Facts known at the end of one month, handed to [`transition`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MonthEnd {
    pub month: Month,
    pub equity_balance: f64,
    /// Present only at the refinancing month.
    pub gate: Option<GateCheck>,
    /// Present only at the exit month: sale price less debt and costs.
    pub exit_equity: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub state: ProjectState,
    /// The gate passed this month; the post-refinancing rate applies next.
    pub refinanced: bool,
}

/// Advance the state machine across the end of `end.month`.
pub fn transition(state: ProjectState, schedule: &PhaseSchedule, end: &MonthEnd) -> Transition {
    let stay = |state| Transition { state, refinanced: false };

    let current = match state {
        ProjectState::Terminated(_) => return stay(state),
        ProjectState::Operating(phase) => phase,
    };

    if end.equity_balance <= 0.0 {
        return stay(ProjectState::Terminated(Outcome::Default));
    }

    let mut refinanced = false;
    if let Some(gate) = end.gate {
        if !gate.passes() {
            return stay(ProjectState::Terminated(Outcome::RefiFail));
        }
        refinanced = true;
    }

    if let Some(exit_equity) = end.exit_equity {
        let outcome = if exit_equity > 0.0 { Outcome::Exit } else { Outcome::SurvivedNoExit };
        return Transition { state: ProjectState::Terminated(outcome), refinanced };
    }

    let next = Phase::at_month(end.month + 1, schedule);
    debug_assert!(next >= current, "phase moved backwards: {current:?} -> {next:?}");
    Transition { state: ProjectState::Operating(next), refinanced }
}
