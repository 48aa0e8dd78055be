//! # Session
//!
//! One connection per agent, played in lock step. Every round:
//!
//! 1. Clear the decode and scratch arenas (allocations are kept)
//! 2. Read one frame per agent and decode it into the decode arena
//! 3. Let the planner see the whole round, then ask it for each action
//! 4. Encode each action, terminate it with NUL and send it
//!
//! The agents of a team receive the same kind of message each round; a
//! mismatch means the session lost track of the server and is abandoned.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;

use courier_core::Arena;
use courier_protocol::{
    action_document, auth_request_document, decode_message, write_document, Action, Decoded,
    Element, FrameReader, GridMapper, MessageKind, Perception, ProtocolContext, Transport,
    TransportStats,
};
use tracing::{debug, info, warn};

use crate::config::{AgentConfig, ConfigError};
use crate::error::{CourierError, CourierResult};
use crate::planner::{Planner, Round, SkipPlanner};

/// Initial capacity of the inbox and scratch arenas.
const SMALL_RESERVE: usize = 16 * 1024;

/// What a finished session did.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SessionOutcome {
    /// Simulations played to their end.
    pub simulations: u32,
    /// Request-action rounds answered.
    pub rounds: u64,
    /// Traffic of all agents together.
    pub traffic: TransportStats,
}

/// One agent's connection.
#[derive(Debug)]
struct AgentLink<T> {
    name: String,
    password: String,
    dummy: bool,
    transport: T,
    frames: FrameReader,
}

/// A team of agents connected to one server.
#[derive(Debug)]
pub struct Session<T> {
    agents: Vec<AgentLink<T>>,
    context: ProtocolContext,
    /// Decoded records of the current round.
    arena: Arena,
    /// Raw frame being decoded.
    inbox: Arena,
    /// Planner item lists and encoded actions.
    scratch: Arena,
    /// Decoded messages of the current round, one per agent.
    round: Vec<Decoded>,
    /// Perceptions of the current round, one per agent.
    perceptions: Vec<Perception>,
    dump: Option<BufWriter<File>>,
}

impl<T: Transport> Session<T> {
    /// An empty session; the decode arena starts with `message_reserve` bytes.
    #[must_use]
    pub fn new(message_reserve: usize) -> Self {
        Self {
            agents: Vec::new(),
            context: ProtocolContext::new(),
            arena: Arena::with_capacity(message_reserve),
            inbox: Arena::with_capacity(SMALL_RESERVE),
            scratch: Arena::with_capacity(SMALL_RESERVE),
            round: Vec::new(),
            perceptions: Vec::new(),
            dump: None,
        }
    }

    /// Appends every exchanged document to `path`. Consecutive sessions of
    /// one run share the file; the supervisor truncates it once at startup.
    ///
    /// # Errors
    ///
    /// [`CourierError::Dump`] if the file cannot be opened.
    pub fn dump_to(&mut self, path: impl AsRef<Path>) -> CourierResult<()> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(CourierError::Dump)?;
        self.dump = Some(BufWriter::new(file));
        Ok(())
    }

    /// Adds an agent on an open transport. Agents log in in the order added.
    pub fn add_agent(&mut self, agent: &AgentConfig, transport: T) {
        self.agents.push(AgentLink {
            name: agent.name.clone(),
            password: agent.password.clone(),
            dummy: agent.dummy,
            transport,
            frames: FrameReader::new(),
        });
    }

    /// Number of agents.
    #[must_use]
    pub fn agent_count(&self) -> usize {
        self.agents.len()
    }

    /// Names and grid of the session.
    #[must_use]
    pub const fn context(&self) -> &ProtocolContext {
        &self.context
    }

    /// Transport of agent `index`.
    #[must_use]
    pub fn transport(&self, index: usize) -> Option<&T> {
        self.agents.get(index).map(|agent| &agent.transport)
    }

    /// Logs in, then plays simulations until the server says `bye`.
    ///
    /// # Errors
    ///
    /// Any [`CourierError`]; the session cannot be resumed afterwards.
    pub fn run<P: Planner>(&mut self, planner: &mut P) -> CourierResult<SessionOutcome> {
        let played = self.play(planner);
        let traffic = self.disconnect_report();
        let outcome = SessionOutcome { traffic, ..played? };
        info!(
            simulations = outcome.simulations,
            rounds = outcome.rounds,
            "server closed the session"
        );
        Ok(outcome)
    }

    fn play<P: Planner>(&mut self, planner: &mut P) -> CourierResult<SessionOutcome> {
        self.authenticate()?;
        let mut outcome = SessionOutcome::default();
        while let Some(rounds) = self.play_simulation(planner)? {
            outcome.simulations += 1;
            outcome.rounds += rounds;
        }
        Ok(outcome)
    }

    /// Logs each connection's traffic and returns the team total.
    fn disconnect_report(&self) -> TransportStats {
        let mut total = TransportStats::default();
        for agent in &self.agents {
            let stats = agent.transport.stats();
            debug!(
                agent = %agent.name,
                sends = stats.sends,
                receives = stats.receives,
                bytes_sent = stats.bytes_sent,
                bytes_received = stats.bytes_received,
                "connection traffic"
            );
            total += stats;
        }
        info!(
            agents = self.agents.len(),
            bytes_sent = total.bytes_sent,
            bytes_received = total.bytes_received,
            "session traffic"
        );
        total
    }

    /// Sends every agent's credentials and checks the answers.
    ///
    /// # Errors
    ///
    /// [`CourierError::AuthenticationFailed`] for a refused agent, or any
    /// transport or protocol failure.
    pub fn authenticate(&mut self) -> CourierResult<()> {
        for index in 0..self.agents.len() {
            let agent = &self.agents[index];
            let request = auth_request_document(&agent.name, &agent.password);
            self.send(index, &request)?;
        }
        self.receive_round()?;
        for (index, decoded) in self.round.iter().enumerate() {
            let name = &self.agents[index].name;
            match decoded.auth_response(&self.arena) {
                Some(response) if response.succeeded() => debug!(agent = %name, "authenticated"),
                Some(_) => return Err(CourierError::AuthenticationFailed(name.clone())),
                None => return Err(CourierError::unexpected(name, "auth-response", decoded.kind)),
            }
        }
        info!(agents = self.agents.len(), "all agents authenticated");
        Ok(())
    }

    /// Plays one simulation. Returns the rounds answered, or `None` if the
    /// server said `bye` instead of starting one.
    fn play_simulation<P: Planner>(&mut self, planner: &mut P) -> CourierResult<Option<u64>> {
        match self.receive_round()? {
            MessageKind::Bye => return Ok(None),
            MessageKind::SimStart => {}
            other => return Err(CourierError::unexpected(&self.agents[0].name, "sim-start", other)),
        }

        // Bounds are scoped to one simulation, not to the process: each
        // simulation may use a different map. Names stay interned.
        *self.context.grid_mut() = GridMapper::new();
        for (agent, decoded) in self.round.iter().enumerate() {
            if let Some(simulation) = decoded.simulation(&self.arena) {
                planner.on_sim_start(agent, &simulation, &self.arena, &self.context);
            }
        }
        info!(agents = self.agents.len(), "simulation started");

        let mut rounds = 0u64;
        loop {
            match self.receive_round()? {
                MessageKind::RequestAction => {
                    self.answer_round(planner)?;
                    rounds += 1;
                }
                MessageKind::SimEnd => break,
                other => {
                    return Err(CourierError::unexpected(&self.agents[0].name, "request-action", other))
                }
            }
        }

        for (agent, decoded) in self.round.iter().enumerate() {
            if let Some(result) = decoded.sim_end(&self.arena) {
                if agent == 0 {
                    info!(score = result.score, ranking = result.ranking, rounds, "simulation ended");
                }
                planner.on_sim_end(agent, &result);
            }
        }
        Ok(Some(rounds))
    }

    /// Reads one message per agent into a freshly cleared decode arena and
    /// returns their common kind.
    fn receive_round(&mut self) -> CourierResult<MessageKind> {
        self.arena.reset();
        self.round.clear();
        for index in 0..self.agents.len() {
            let decoded = self.receive(index)?;
            if let Some(first) = self.round.first() {
                if decoded.kind != first.kind {
                    return Err(CourierError::unexpected(
                        &self.agents[index].name,
                        first.kind.as_str(),
                        decoded.kind,
                    ));
                }
            }
            self.round.push(decoded);
        }
        self.round
            .first()
            .map(|decoded| decoded.kind)
            .ok_or_else(|| CourierError::Config(ConfigError::NoAgents))
    }

    fn receive(&mut self, index: usize) -> CourierResult<Decoded> {
        let agent = &mut self.agents[index];
        self.inbox.reset();
        let frame = agent.frames.read_frame(&mut agent.transport, &mut self.inbox)?;
        let bytes = &self.inbox.as_slice()[frame];
        if let Some(dump) = self.dump.as_mut() {
            dump.write_all(bytes)
                .and_then(|()| dump.write_all(b"\n"))
                .map_err(CourierError::Dump)?;
        }
        let decoded = decode_message(bytes, &mut self.context, &mut self.arena).map_err(|err| {
            warn!(agent = %agent.name, error = %err, "rejected document");
            err
        })?;
        Ok(decoded)
    }

    fn answer_round<P: Planner>(&mut self, planner: &mut P) -> CourierResult<()> {
        self.scratch.reset();
        self.perceptions.clear();
        for decoded in &self.round {
            if let Some(perception) = decoded.perception(&self.arena) {
                self.perceptions.push(perception);
            }
        }
        let round = Round {
            step: self.perceptions.first().map_or(0, |p| p.simulation_step),
            arena: &self.arena,
            context: &self.context,
            perceptions: &self.perceptions,
        };
        debug!(step = round.step, "request-action");
        planner.on_request_action(&round);

        for (index, perception) in self.perceptions.iter().enumerate() {
            let agent = &mut self.agents[index];
            let action = if agent.dummy {
                SkipPlanner.act(index, &round, &mut self.scratch)
            } else {
                planner.act(index, &round, &mut self.scratch)
            };
            let document = action_document(perception.id, &action, &self.context, &self.scratch)?;
            let start = self.scratch.size();
            write_document(&document, &mut self.scratch)?;
            self.scratch.append(&[0]);
            let bytes = &self.scratch.as_slice()[start..];
            if let Some(dump) = self.dump.as_mut() {
                dump.write_all(&bytes[..bytes.len() - 1])
                    .and_then(|()| dump.write_all(b"\n"))
                    .map_err(CourierError::Dump)?;
            }
            agent.transport.send(bytes)?;
            log_action(&agent.name, &action);
        }
        if let Some(dump) = self.dump.as_mut() {
            dump.flush().map_err(CourierError::Dump)?;
        }
        Ok(())
    }

    /// Encodes `document` into the scratch arena and sends it to agent `index`.
    fn send(&mut self, index: usize, document: &Element) -> CourierResult<()> {
        let start = self.scratch.size();
        write_document(document, &mut self.scratch)?;
        self.scratch.append(&[0]);
        let bytes = &self.scratch.as_slice()[start..];
        if let Some(dump) = self.dump.as_mut() {
            dump.write_all(&bytes[..bytes.len() - 1])
                .and_then(|()| dump.write_all(b"\n"))
                .map_err(CourierError::Dump)?;
        }
        self.agents[index].transport.send(bytes)?;
        self.scratch.resize(start);
        Ok(())
    }
}

fn log_action(agent: &str, action: &Action) {
    if !matches!(action, Action::Skip) {
        debug!(agent, kind = action.kind().as_str(), "action sent");
    }
}
