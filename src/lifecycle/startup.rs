//! Startup orchestration.
//!
//! # Responsibilities
//! - Install the optional metrics exporter
//! - Bind the listener (a bind failure is fatal)
//! - Map OS signals to a shutdown request
//! - Run the server until it has drained
//!
//! # Design Decisions
//! - Fail fast: any startup error is returned before traffic is accepted
//! - Listener binds last, once everything else is ready

use thiserror::Error;

use crate::config::ProxyConfig;
use crate::http::HttpServer;
use crate::lifecycle::shutdown::Shutdown;
use crate::lifecycle::signals::forward_signals;
use crate::lifecycle::state::DrainOutcome;
use crate::net::{Listener, ListenerError};
use crate::observability::metrics::init_metrics;

/// Fatal error while bringing the server up.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error(transparent)]
    Listener(#[from] ListenerError),

    #[error("failed to start metrics exporter: {0}")]
    Metrics(#[from] metrics_exporter_prometheus::BuildError),
}

/// Run the forwarder until a termination signal has been handled.
pub async fn run(config: ProxyConfig) -> Result<DrainOutcome, ServerError> {
    let shutdown = Shutdown::new();
    forward_signals(shutdown.clone());
    run_until(config, shutdown).await
}

/// Run the forwarder until `shutdown` is triggered.
pub async fn run_until(config: ProxyConfig, shutdown: Shutdown) -> Result<DrainOutcome, ServerError> {
    if let Some(address) = config.observability.metrics_address {
        init_metrics(address)?;
    }

    let listener = Listener::bind(config.listen_address()).await?;
    let server = HttpServer::new(config);

    Ok(server.run(listener, shutdown.wait()).await)
}
