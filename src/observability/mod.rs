//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! transport / handler / server loop
//!     → events.rs (Event published to the injected Observer)
//!     → logging.rs (TracingObserver: structured log lines)
//!     → metrics.rs (MetricsObserver: counters, histograms)
//!
//! Consumers:
//!     → stdout via tracing-subscriber
//!     → Prometheus scrape endpoint (optional)
//! ```
//!
//! # Design Decisions
//! - Logging is an injected capability, not ambient calls in the hot path
//! - Metrics are cheap (atomic increments) and no-ops without an exporter

pub mod events;
pub mod logging;
pub mod metrics;

use std::sync::Arc;

pub use events::{Event, Observer, ObserverSet};
pub use logging::TracingObserver;
pub use metrics::MetricsObserver;

/// Observer used by the binary: log lines plus metrics.
pub fn default_observer() -> Arc<dyn Observer> {
    Arc::new(
        ObserverSet::new()
            .with(Arc::new(TracingObserver))
            .with(Arc::new(MetricsObserver)),
    )
}
