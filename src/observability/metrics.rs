//! Metrics collection and exposition.
//!
//! # Metrics
//! - `flproxy_attempts_total` (counter): upstream exchanges started
//! - `flproxy_retries_total` (counter): retries scheduled after transport errors
//! - `flproxy_responses_total` (counter): upstream responses by status
//! - `flproxy_forward_failures_total` (counter): gateway failures by reason
//! - `flproxy_drain_seconds` (histogram): time spent draining on shutdown
//!
//! Recording is a no-op until an exporter is installed with [`init_metrics`].

use std::net::SocketAddr;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

use crate::observability::events::{Event, Observer};

/// Install the Prometheus exporter with an HTTP scrape endpoint on `addr`.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

/// [`Observer`] that records events through the `metrics` facade.
#[derive(Debug, Clone, Copy, Default)]
pub struct MetricsObserver;

impl Observer for MetricsObserver {
    fn on_event(&self, event: &Event<'_>) {
        match event {
            Event::AttemptStarted { .. } => {
                ::metrics::counter!("flproxy_attempts_total").increment(1);
            }
            Event::RetryScheduled { error, .. } => {
                ::metrics::counter!("flproxy_retries_total", "error" => error.as_label()).increment(1);
            }
            Event::ForwardSucceeded { status, .. } => {
                ::metrics::counter!("flproxy_responses_total", "status" => status.as_u16().to_string())
                    .increment(1);
            }
            Event::ForwardFailed { error, .. } => {
                ::metrics::counter!("flproxy_forward_failures_total", "reason" => error.as_label())
                    .increment(1);
            }
            Event::DrainCompleted { elapsed } => {
                ::metrics::histogram!("flproxy_drain_seconds").record(elapsed.as_secs_f64());
            }
            Event::DrainTimedOut { window, .. } => {
                ::metrics::histogram!("flproxy_drain_seconds").record(window.as_secs_f64());
            }
            _ => {}
        }
    }
}
