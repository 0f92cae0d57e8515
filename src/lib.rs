//! Local HTTP port forwarder with bounded concurrency and retries.
//!
//! ```text
//!   client ──► HttpServer (accept loop, drain)
//!                 │
//!                 ▼
//!           forward_handler ──► RetryTransport ──► ConcurrencyLimiter
//!                 ▲                  │
//!                 │                  ▼
//!           502 / relay  ◄──── Upstream (127.0.0.1:<toPort>)
//! ```

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod resilience;

pub use config::ProxyConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use resilience::{ConcurrencyLimiter, RetryPolicy, RetryTransport};
