//! Observer capability for forwarding and lifecycle events.
//!
//! The transport, the forwarding handler and the server loop never log
//! directly; they publish an [`Event`] to an injected [`Observer`].
//!
//! ```text
//! RetryTransport ─┐
//! forward_handler ├─► Observer::on_event(&Event)
//! HttpServer::run ┘          │
//!              ┌─────────────┼──────────────┐
//!              ▼             ▼              ▼
//!       TracingObserver  MetricsObserver  custom
//! ```

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::http::{Method, StatusCode, Uri};

use crate::http::upstream::UpstreamError;
use crate::resilience::retries::ForwardError;

/// Something worth reporting happened.
#[derive(Debug)]
#[non_exhaustive]
pub enum Event<'a> {
    /// An exchange with the upstream is about to start.
    AttemptStarted {
        attempt: u32,
        method: &'a Method,
        target: &'a Uri,
    },
    /// An attempt failed at transport level and another one will follow.
    RetryScheduled {
        attempt: u32,
        delay: Duration,
        method: &'a Method,
        target: &'a Uri,
        error: &'a UpstreamError,
    },
    /// The upstream answered (any status).
    ForwardSucceeded {
        attempts: u32,
        status: StatusCode,
        method: &'a Method,
        target: &'a Uri,
    },
    /// The elapsed-time budget ran out.
    RetryExhausted {
        attempts: u32,
        elapsed: Duration,
        method: &'a Method,
        target: &'a Uri,
        error: &'a UpstreamError,
    },
    /// Cancellation fired before a permit was granted.
    AdmissionCanceled {
        method: &'a Method,
        target: &'a Uri,
    },
    /// Cancellation fired during an attempt or a backoff wait.
    Canceled {
        attempts: u32,
        method: &'a Method,
        target: &'a Uri,
    },
    /// The handler turned a forwarding error into a gateway failure.
    ForwardFailed {
        method: &'a Method,
        target: &'a Uri,
        error: &'a ForwardError,
    },
    ListenerStarted {
        address: SocketAddr,
        max_concurrency: usize,
    },
    DrainStarted {
        active_connections: u64,
        window: Duration,
    },
    DrainCompleted {
        elapsed: Duration,
    },
    /// The drain window expired; remaining connections are force-closed.
    DrainTimedOut {
        remaining: usize,
        window: Duration,
    },
}

impl Event<'_> {
    /// Short stable label (snake_case) for logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            Event::AttemptStarted { .. } => "attempt_started",
            Event::RetryScheduled { .. } => "retry_scheduled",
            Event::ForwardSucceeded { .. } => "forward_succeeded",
            Event::RetryExhausted { .. } => "retry_exhausted",
            Event::AdmissionCanceled { .. } => "admission_canceled",
            Event::Canceled { .. } => "canceled",
            Event::ForwardFailed { .. } => "forward_failed",
            Event::ListenerStarted { .. } => "listener_started",
            Event::DrainStarted { .. } => "drain_started",
            Event::DrainCompleted { .. } => "drain_completed",
            Event::DrainTimedOut { .. } => "drain_timed_out",
        }
    }
}

/// Receives every [`Event`]. Called inline, so implementations must be cheap.
pub trait Observer: Send + Sync {
    fn on_event(&self, event: &Event<'_>);
}

/// Fans an event out to several observers in order.
#[derive(Clone, Default)]
pub struct ObserverSet {
    observers: Vec<Arc<dyn Observer>>,
}

impl ObserverSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, observer: Arc<dyn Observer>) -> Self {
        self.observers.push(observer);
        self
    }

    pub fn len(&self) -> usize {
        self.observers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }
}

impl Observer for ObserverSet {
    fn on_event(&self, event: &Event<'_>) {
        for observer in &self.observers {
            observer.on_event(event);
        }
    }
}
