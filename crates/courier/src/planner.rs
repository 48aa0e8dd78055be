//! # Planner Seam
//!
//! The session owns the wire; a [`Planner`] owns the decisions. Per round the
//! session decodes every agent's perception into the decode arena, hands the
//! planner a [`Round`] once, then asks it for one [`Action`] per agent.
//!
//! ```text
//! sim-start ──> on_sim_start(agent) x N
//! request   ──> on_request_action(round) ──> act(agent) x N ──> send
//! sim-end   ──> on_sim_end(agent) x N
//! ```

use courier_core::Arena;
use courier_protocol::{Action, Perception, ProtocolContext, SimEnd, Simulation};
use tracing::debug;

use crate::stats::GameStatistic;

/// Everything visible to the planner during one round.
#[derive(Clone, Copy, Debug)]
pub struct Round<'a> {
    /// Simulation step.
    pub step: u16,
    /// Decode arena holding this round's records.
    pub arena: &'a Arena,
    /// Names and grid of the session.
    pub context: &'a ProtocolContext,
    /// One perception per agent, in login order.
    pub perceptions: &'a [Perception],
}

/// Decision logic plugged into a session.
pub trait Planner {
    /// A simulation starts; called once per agent.
    fn on_sim_start(&mut self, _agent: usize, _simulation: &Simulation, _arena: &Arena, _context: &ProtocolContext) {}

    /// All perceptions of a round are decoded.
    fn on_request_action(&mut self, _round: &Round<'_>) {}

    /// The action of `agent` for this round. Item lists referenced by the
    /// action are written into `scratch`, which is cleared every round.
    fn act(&mut self, agent: usize, round: &Round<'_>, scratch: &mut Arena) -> Action;

    /// The simulation ended; called once per agent.
    fn on_sim_end(&mut self, _agent: usize, _result: &SimEnd) {}
}

/// Always skips. Drives dummy agents.
#[derive(Clone, Copy, Debug, Default)]
pub struct SkipPlanner;

impl Planner for SkipPlanner {
    fn act(&mut self, _agent: usize, _round: &Round<'_>, _scratch: &mut Arena) -> Action {
        Action::Skip
    }
}

/// Skips every turn while summarizing the simulation into a [`GameStatistic`].
#[derive(Clone, Debug, Default)]
pub struct StatisticsPlanner {
    statistic: GameStatistic,
    /// One bit per job id seen.
    jobs_seen: [u64; 4],
}

impl StatisticsPlanner {
    /// A planner with an empty summary.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The summary so far.
    #[must_use]
    pub fn statistic(&self) -> GameStatistic {
        let distinct: u32 = self.jobs_seen.iter().map(|word| word.count_ones()).sum();
        GameStatistic {
            distinct_jobs: u8::try_from(distinct).unwrap_or(u8::MAX),
            ..self.statistic
        }
    }

    fn see_job(&mut self, id: u8) {
        self.jobs_seen[usize::from(id / 64)] |= 1 << (id % 64);
    }
}

impl Planner for StatisticsPlanner {
    fn on_sim_start(&mut self, agent: usize, simulation: &Simulation, arena: &Arena, _context: &ProtocolContext) {
        if agent == 0 {
            *self = Self::default();
            self.statistic.seed_capital = simulation.seed_capital;
            self.statistic.products = u8::try_from(simulation.products().len(arena)).unwrap_or(u8::MAX);
        }
        self.statistic.agents = self.statistic.agents.saturating_add(1);
    }

    fn on_request_action(&mut self, round: &Round<'_>) {
        self.statistic.steps = round.step.saturating_add(1);
        if let Some(first) = round.perceptions.first() {
            self.statistic.final_money = first.team.money;
        }
        for perception in round.perceptions {
            for job in perception.auction_jobs().iter(round.arena) {
                self.see_job(job.id);
            }
            for job in perception.priced_jobs().iter(round.arena) {
                self.see_job(job.id);
            }
        }
    }

    fn act(&mut self, _agent: usize, _round: &Round<'_>, _scratch: &mut Arena) -> Action {
        Action::Skip
    }

    fn on_sim_end(&mut self, agent: usize, result: &SimEnd) {
        if agent == 0 {
            self.statistic.score = result.score;
            self.statistic.ranking = result.ranking;
            debug!(score = result.score, ranking = result.ranking, "simulation summarized");
        }
    }
}
