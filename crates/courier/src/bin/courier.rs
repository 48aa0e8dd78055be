//! # Courier Agent Client
//!
//! Connects a team of agents to the simulation server and keeps playing.
//!
//! ## Usage
//!
//! ```bash
//! courier --host 10.0.0.2 --agent agentA% 1
//! courier --config team.toml --mode stats --stats-file stats.bin
//! RUST_LOG=courier=debug courier --config team.toml
//! ```

use courier::{run_supervised, ClientConfig, CommandLine, USAGE};
use tracing::info;
use tracing_subscriber::EnvFilter;

fn main() {
    let config = match ClientConfig::from_args(std::env::args().skip(1)) {
        Ok(CommandLine::Run(config)) => config,
        Ok(CommandLine::Help) => {
            println!("{USAGE}");
            return;
        }
        Err(err) => {
            eprintln!("Error: {err}");
            eprintln!();
            eprintln!("{USAGE}");
            std::process::exit(1);
        }
    };

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_filter))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();

    info!(
        host = %config.host,
        port = config.port,
        mode = ?config.mode,
        agents = config.expanded_agents().len(),
        "courier starting"
    );
    let report = run_supervised(&config);
    info!(
        sessions = report.sessions,
        failures = report.failures,
        simulations = report.simulations,
        "courier stopped"
    );
}
