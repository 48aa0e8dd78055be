//! # COURIER
//!
//! Competition agent client built on the arena substrate and the codec.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                       run_supervised                         │
//! │   session failed? log it, wait, start a new one              │
//! │  ┌────────────────────────────────────────────────────────┐  │
//! │  │                      Session                           │  │
//! │  │  agent 1..N ──> FrameReader ──> decode_message ──┐     │  │
//! │  │                                                  v     │  │
//! │  │                         decode arena (per round)       │  │
//! │  │                                                  │     │  │
//! │  │  agent 1..N <── action_document <── Planner <────┘     │  │
//! │  └────────────────────────────────────────────────────────┘  │
//! │                stats mode: StatisticsLog::append             │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - `config`: TOML file plus command-line overrides
//! - `session`: lock-step rounds over one connection per agent
//! - `planner`: the decision seam and the shipped planners
//! - `stats`: the persistent statistics log
//! - `supervisor`: the restart loop

#![warn(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::perf)]

pub mod config;
pub mod error;
pub mod planner;
pub mod session;
pub mod stats;
pub mod supervisor;

pub use config::{AgentConfig, ClientConfig, CommandLine, ConfigError, Mode, USAGE};
pub use error::{CourierError, CourierResult};
pub use planner::{Planner, Round, SkipPlanner, StatisticsPlanner};
pub use session::{Session, SessionOutcome};
pub use stats::{GameStatistic, StatisticsLog, StatsError, STATS_MAGIC};
pub use supervisor::{run_session, run_supervised, run_supervised_with, SupervisorReport};
