//! # Client Configuration
//!
//! Loaded once at startup from an optional TOML file, then overridden by
//! command-line options.
//!
//! ```toml
//! host = "localhost"
//! port = 12300
//! mode = "stats"
//! statistics_file = "stats.bin"
//!
//! [[agents]]
//! name = "agentA%"        # expands to agentA1 ..= agentA16
//! password = "1"
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

/// Default server port.
pub const DEFAULT_PORT: u16 = 12300;

/// Agents per team, used when expanding a `%` or `,` name suffix.
pub const DEFAULT_AGENTS_PER_TEAM: u8 = 16;

/// Initial decode arena capacity.
pub const DEFAULT_MESSAGE_RESERVE: usize = 150 * 1024;

/// Errors raised while building a [`ClientConfig`].
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("cannot read config file {path}: {source}")]
    Io {
        /// File path.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The configuration file is not valid TOML for this schema.
    #[error("invalid config file: {0}")]
    Parse(#[from] toml::de::Error),

    /// An option was given without its value.
    #[error("option {0} expects a value")]
    MissingValue(&'static str),

    /// An option value could not be parsed.
    #[error("invalid value for {option}: {value}")]
    InvalidValue {
        /// Option name.
        option: &'static str,
        /// Value as given.
        value: String,
    },

    /// An argument that is not an option.
    #[error("unknown option: {0}")]
    UnknownOption(String),

    /// No agent was configured.
    #[error("no agents configured")]
    NoAgents,

    /// More agents than one-byte ids can address.
    #[error("too many agents: {0}")]
    TooManyAgents(usize),

    /// `stats` mode without a statistics file.
    #[error("stats mode requires a statistics file")]
    MissingStatisticsFile,
}

/// What the client does with its agents.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Play with the configured planner.
    #[default]
    Play,
    /// Connect every agent as a dummy that always skips.
    Dummy,
    /// Skip every turn and append a summary of each session to the statistics file.
    Stats,
}

impl Mode {
    fn parse(value: &str) -> Option<Self> {
        match value {
            "play" => Some(Self::Play),
            "dummy" => Some(Self::Dummy),
            "stats" => Some(Self::Stats),
            _ => None,
        }
    }
}

/// Login credentials of one agent, or of a team if the name ends in `%`.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct AgentConfig {
    /// Login name.
    pub name: String,
    /// Login password.
    pub password: String,
    /// A dummy agent always skips.
    #[serde(default)]
    pub dummy: bool,
}

impl AgentConfig {
    /// Creates an agent entry.
    #[must_use]
    pub fn new(name: impl Into<String>, password: impl Into<String>, dummy: bool) -> Self {
        Self {
            name: name.into(),
            password: password.into(),
            dummy,
        }
    }
}

/// Client configuration.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClientConfig {
    /// Server host name or address.
    pub host: String,
    /// Server port.
    pub port: u16,
    /// Operating mode.
    pub mode: Mode,
    /// Agents as configured, before name expansion.
    pub agents: Vec<AgentConfig>,
    /// Team size used for name expansion.
    pub agents_per_team: u8,
    /// Statistics log, required in `stats` mode.
    pub statistics_file: Option<PathBuf>,
    /// Every inbound and outbound document of this run is written here.
    pub dump_xml: Option<PathBuf>,
    /// Tracing filter directive, overridden by `RUST_LOG`.
    pub log_filter: String,
    /// Stop after this many sessions. Runs forever if absent.
    pub max_sessions: Option<u32>,
    /// Initial decode arena capacity in bytes.
    pub message_reserve: usize,
    /// Pause after a failed session, in milliseconds.
    pub reconnect_delay_ms: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_owned(),
            port: DEFAULT_PORT,
            mode: Mode::Play,
            agents: Vec::new(),
            agents_per_team: DEFAULT_AGENTS_PER_TEAM,
            statistics_file: None,
            dump_xml: None,
            log_filter: "info".to_owned(),
            max_sessions: None,
            message_reserve: DEFAULT_MESSAGE_RESERVE,
            reconnect_delay_ms: 1000,
        }
    }
}

/// Result of parsing the command line.
#[derive(Debug)]
pub enum CommandLine {
    /// Run with this configuration.
    Run(ClientConfig),
    /// Print usage and exit.
    Help,
}

/// Usage text for `--help`.
pub const USAGE: &str = "\
Usage: courier [OPTIONS]

Options:
  --config <PATH>              Load a TOML configuration file first
  --host <HOST>                Server host (default: localhost)
  --port <PORT>                Server port (default: 12300)
  --mode <play|dummy|stats>    Operating mode (default: play)
  --agent <NAME> <PASSWORD>    Add an agent; a trailing % or , expands to a team
  --dummy <NAME> <PASSWORD>    Like --agent, but the agent always skips
  --stats-file <PATH>          Statistics log for stats mode
  --dump-xml <PATH>            Write every exchanged document to this file
  --max-sessions <N>           Stop after N sessions
  -h, --help                   Show this help";

impl ClientConfig {
    /// Parses a TOML document.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Parse`] on malformed input or unknown keys.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Reads and parses a TOML file.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Io`] or [`ConfigError::Parse`].
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Builds the configuration from command-line arguments, program name
    /// excluded. `--config` is applied first wherever it appears as an
    /// option; every
    /// other option overrides the file in order. Agents given on the command
    /// line are added to those from the file.
    ///
    /// # Errors
    ///
    /// Any [`ConfigError`]; the result is validated.
    pub fn from_args<I, S>(args: I) -> Result<CommandLine, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let args: Vec<String> = args.into_iter().map(Into::into).collect();

        // Only option positions count; a password may well read "--help".
        let mut config_path = None;
        let mut i = 0;
        while i < args.len() {
            let option = args[i].as_str();
            let arity = option_arity(option).ok_or_else(|| ConfigError::UnknownOption(option.to_owned()))?;
            match option {
                "-h" | "--help" => return Ok(CommandLine::Help),
                "--config" => {
                    config_path = Some(args.get(i + 1).ok_or(ConfigError::MissingValue("--config"))?);
                }
                _ => {}
            }
            i += 1 + arity;
        }

        let mut config = match config_path {
            Some(path) => Self::load(path)?,
            None => Self::default(),
        };

        let mut i = 0;
        while i < args.len() {
            let value = |n: usize, option: &'static str| {
                args.get(i + n).map(String::as_str).ok_or(ConfigError::MissingValue(option))
            };
            match args[i].as_str() {
                "--config" => i += 1,
                "--host" => {
                    config.host = value(1, "--host")?.to_owned();
                    i += 1;
                }
                "--port" => {
                    config.port = parse_value(value(1, "--port")?, "--port")?;
                    i += 1;
                }
                "--mode" => {
                    let mode = value(1, "--mode")?;
                    config.mode = Mode::parse(mode).ok_or_else(|| ConfigError::InvalidValue {
                        option: "--mode",
                        value: mode.to_owned(),
                    })?;
                    i += 1;
                }
                option @ ("--agent" | "--dummy") => {
                    let option = if option == "--agent" { "--agent" } else { "--dummy" };
                    let name = value(1, option)?;
                    let password = value(2, option)?;
                    config
                        .agents
                        .push(AgentConfig::new(name, password, option == "--dummy"));
                    i += 2;
                }
                "--stats-file" => {
                    config.statistics_file = Some(PathBuf::from(value(1, "--stats-file")?));
                    i += 1;
                }
                "--dump-xml" => {
                    config.dump_xml = Some(PathBuf::from(value(1, "--dump-xml")?));
                    i += 1;
                }
                "--max-sessions" => {
                    config.max_sessions = Some(parse_value(value(1, "--max-sessions")?, "--max-sessions")?);
                    i += 1;
                }
                other => return Err(ConfigError::UnknownOption(other.to_owned())),
            }
            i += 1;
        }

        config.validate()?;
        Ok(CommandLine::Run(config))
    }

    /// Agents after name expansion, in login order. In `dummy` mode every
    /// agent is a dummy.
    #[must_use]
    pub fn expanded_agents(&self) -> Vec<AgentConfig> {
        let mut agents = Vec::new();
        for agent in &self.agents {
            let dummy = agent.dummy || self.mode == Mode::Dummy;
            match agent.name.strip_suffix(['%', ',']) {
                Some(prefix) => agents.extend(
                    (1..=self.agents_per_team)
                        .map(|n| AgentConfig::new(format!("{prefix}{n}"), agent.password.as_str(), dummy)),
                ),
                None => agents.push(AgentConfig::new(agent.name.as_str(), agent.password.as_str(), dummy)),
            }
        }
        agents
    }

    /// Pause after a failed session.
    #[must_use]
    pub const fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }

    /// Checks the cross-field rules.
    ///
    /// # Errors
    ///
    /// [`ConfigError::NoAgents`], [`ConfigError::TooManyAgents`] or
    /// [`ConfigError::MissingStatisticsFile`].
    pub fn validate(&self) -> Result<(), ConfigError> {
        let agents = self.expanded_agents().len();
        if agents == 0 {
            return Err(ConfigError::NoAgents);
        }
        if agents > usize::from(u8::MAX) {
            return Err(ConfigError::TooManyAgents(agents));
        }
        if self.mode == Mode::Stats && self.statistics_file.is_none() {
            return Err(ConfigError::MissingStatisticsFile);
        }
        Ok(())
    }
}

/// Number of values following `option`, or `None` for an unknown option.
fn option_arity(option: &str) -> Option<usize> {
    match option {
        "-h" | "--help" => Some(0),
        "--agent" | "--dummy" => Some(2),
        "--config" | "--host" | "--port" | "--mode" | "--stats-file" | "--dump-xml" | "--max-sessions" => {
            Some(1)
        }
        _ => None,
    }
}

fn parse_value<T: std::str::FromStr>(value: &str, option: &'static str) -> Result<T, ConfigError> {
    value.parse().map_err(|_| ConfigError::InvalidValue {
        option,
        value: value.to_owned(),
    })
}
