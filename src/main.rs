use clap::Parser;
use tracing_subscriber::EnvFilter;

use cask::cli::{self, output, Cli};

/// Environment variable holding the log filter (e.g. `CASK_LOG=debug`).
const LOG_ENV: &str = "CASK_LOG";

fn main() {
    init_tracing();
    let cli = Cli::parse();

    if let Err(e) = cli::execute(&cli) {
        output::error(&e.to_string());
        std::process::exit(1);
    }
}

/// Logs go to stderr so they never mix with session output.
fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
