//! Binary crate for the `weather` command-line tool.
//!
//! This crate focuses on:
//! - Parsing and validating CLI arguments into engine queries
//! - Wiring configuration, cache and upstream client into the engine
//! - Interactive configuration
//! - Human-friendly output formatting

use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod output;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cmd = cli::Cli::parse();
    init_tracing(cmd.verbose);
    cmd.run().await
}

/// `RUST_LOG` wins when set; otherwise `-v` switches from warnings to debug output.
fn init_tracing(verbose: bool) {
    let default = if verbose { "weather_engine=debug,weather_cli=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
