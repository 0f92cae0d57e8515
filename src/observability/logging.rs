//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the tracing subscriber once per process
//! - Render forwarding/lifecycle events as log lines ([`TracingObserver`])
//!
//! # Design Decisions
//! - Uses tracing crate for structured logging
//! - Log level from `RUST_LOG`, falling back to `flproxy=info`

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::observability::events::{Event, Observer};

/// Default filter when `RUST_LOG` is unset.
pub const DEFAULT_FILTER: &str = "flproxy=info";

/// Install the global subscriber. Later calls are no-ops.
pub fn init_logging() {
    let _ = tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_FILTER.into()))
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}

/// [`Observer`] that writes events through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl Observer for TracingObserver {
    fn on_event(&self, event: &Event<'_>) {
        match event {
            Event::AttemptStarted {
                attempt,
                method,
                target,
            } => {
                tracing::debug!(attempt, method = %method, target = %target, "Forwarding attempt");
            }
            Event::RetryScheduled {
                attempt,
                delay,
                method,
                target,
                error,
            } => {
                tracing::warn!(
                    attempt,
                    method = %method,
                    target = %target,
                    delay = ?delay,
                    error = %error,
                    "Retrying after transport error"
                );
            }
            Event::ForwardSucceeded {
                attempts,
                status,
                method,
                target,
            } => {
                tracing::debug!(attempts, status = %status, method = %method, target = %target, "Upstream responded");
            }
            Event::RetryExhausted {
                attempts,
                elapsed,
                method,
                target,
                error,
            } => {
                tracing::warn!(
                    attempts,
                    elapsed = ?elapsed,
                    method = %method,
                    target = %target,
                    error = %error,
                    "Retry budget exhausted"
                );
            }
            Event::AdmissionCanceled { method, target } => {
                tracing::debug!(method = %method, target = %target, "Canceled while waiting for a slot");
            }
            Event::Canceled {
                attempts,
                method,
                target,
            } => {
                tracing::debug!(attempts, method = %method, target = %target, "Forwarding canceled");
            }
            Event::ForwardFailed {
                method,
                target,
                error,
            } => {
                tracing::warn!(method = %method, target = %target, error = %error, "Request failed");
            }
            Event::ListenerStarted {
                address,
                max_concurrency,
            } => {
                tracing::info!(address = %address, limit = max_concurrency, "Proxy listening");
            }
            Event::DrainStarted {
                active_connections,
                window,
            } => {
                tracing::info!(active_connections, window = ?window, "Shutdown requested, draining");
            }
            Event::DrainCompleted { elapsed } => {
                tracing::info!(elapsed = ?elapsed, "Drain complete");
            }
            Event::DrainTimedOut { remaining, window } => {
                tracing::warn!(remaining, window = ?window, "Drain window expired, closing remaining connections");
            }
        }
    }
}
