//! # Supervised Run Loop
//!
//! Sessions run back to back. A failed session is logged, the connections
//! are dropped, and a fresh session starts after the reconnect delay. In
//! `stats` mode every completed session appends its summary to the
//! statistics log.

use std::fs::File;
use std::net::TcpStream;
use std::thread;

use courier_protocol::{StreamTransport, Transport, TransportResult};
use tracing::{error, info, warn};

use crate::config::{AgentConfig, ClientConfig, Mode};
use crate::error::CourierResult;
use crate::planner::{SkipPlanner, StatisticsPlanner};
use crate::session::{Session, SessionOutcome};
use crate::stats::StatisticsLog;

/// Counters of a bounded supervised run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SupervisorReport {
    /// Sessions started.
    pub sessions: u32,
    /// Sessions that ended in an error.
    pub failures: u32,
    /// Simulations played across all sessions.
    pub simulations: u32,
}

/// Runs sessions over TCP until `max_sessions` is reached, or forever.
pub fn run_supervised(config: &ClientConfig) -> SupervisorReport {
    run_supervised_with(config, |_agent: &AgentConfig| -> TransportResult<StreamTransport<TcpStream>> {
        StreamTransport::connect(&config.host, config.port)
    })
}

/// Runs sessions, opening one transport per agent with `connect`.
pub fn run_supervised_with<T, F>(config: &ClientConfig, mut connect: F) -> SupervisorReport
where
    T: Transport,
    F: FnMut(&AgentConfig) -> TransportResult<T>,
{
    let agents = config.expanded_agents();
    let mut report = SupervisorReport::default();

    // Sessions append to the dump; a new run starts it afresh.
    if let Some(path) = &config.dump_xml {
        if let Err(err) = File::create(path) {
            warn!(path = %path.display(), error = %err, "cannot truncate XML dump");
        }
    }

    while config.max_sessions.map_or(true, |max| report.sessions < max) {
        report.sessions += 1;
        match run_session(config, &agents, &mut connect) {
            Ok(outcome) => {
                report.simulations += outcome.simulations;
                info!(
                    session = report.sessions,
                    simulations = outcome.simulations,
                    bytes_received = outcome.traffic.bytes_received,
                    "session finished"
                );
            }
            Err(err) => {
                report.failures += 1;
                error!(session = report.sessions, error = %err, "session failed, starting next session");
                if config.max_sessions.map_or(true, |max| report.sessions < max) {
                    thread::sleep(config.reconnect_delay());
                }
            }
        }
    }
    report
}

/// Connects every agent and plays one session in the configured mode.
///
/// # Errors
///
/// Any connection, session or statistics failure.
pub fn run_session<T, F>(config: &ClientConfig, agents: &[AgentConfig], connect: &mut F) -> CourierResult<SessionOutcome>
where
    T: Transport,
    F: FnMut(&AgentConfig) -> TransportResult<T>,
{
    let mut session = Session::new(config.message_reserve);
    if let Some(path) = &config.dump_xml {
        session.dump_to(path)?;
    }
    for agent in agents {
        session.add_agent(agent, connect(agent)?);
    }

    match config.mode {
        Mode::Play | Mode::Dummy => session.run(&mut SkipPlanner),
        Mode::Stats => {
            let mut planner = StatisticsPlanner::new();
            let outcome = session.run(&mut planner)?;
            match &config.statistics_file {
                Some(path) if outcome.simulations > 0 => {
                    let records = StatisticsLog::append(path, &planner.statistic())?;
                    info!(path = %path.display(), records, "statistic appended");
                }
                Some(_) => warn!("session played no simulation, nothing to record"),
                None => warn!("no statistics file configured"),
            }
            Ok(outcome)
        }
    }
}
