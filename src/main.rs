//! flproxy: forward HTTP from one local port to another.
//!
//! ```text
//! flproxy [--limit <N>] <fromPort>:<toPort>
//! ```

use clap::CommandFactory;
use tracing::Instrument;

use flproxy::config::{load_from_args, Cli, ConfigError};
use flproxy::lifecycle;
use flproxy::observability::logging::init_logging;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = match load_from_args(std::env::args_os()) {
        Ok(config) => config,
        Err(ConfigError::Usage(e)) => e.exit(),
        Err(e) => {
            eprintln!("configuration error: {}\n", e);
            eprintln!("{}", Cli::command().render_usage());
            std::process::exit(2);
        }
    };

    init_logging();

    let span = tracing::info_span!("flproxy", from = config.listen_port, to = config.target_port);
    tracing::info!(
        parent: &span,
        limit = config.max_concurrency,
        drain_timeout = ?config.timeouts.drain,
        "flproxy v{} starting",
        env!("CARGO_PKG_VERSION")
    );

    let outcome = lifecycle::run(config).instrument(span.clone()).await?;

    tracing::info!(parent: &span, outcome = ?outcome, "Shutdown complete");
    Ok(())
}
