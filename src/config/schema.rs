//! Configuration schema definitions.
//!
//! [`ProxyConfig`] is built once at startup from the command line and is
//! read-only afterwards.

use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

use crate::config::validation::{validate_limit, validate_port, ConfigError, PortSide};
use crate::resilience::backoff::RetryPolicy;

/// Default concurrent transfer limit.
pub const DEFAULT_LIMIT: i64 = 10;

/// Default cap for a buffered request body (16 MiB).
pub const DEFAULT_MAX_BODY_BYTES: usize = 16 * 1024 * 1024;

/// Root configuration for the forwarder.
#[derive(Debug, Clone, PartialEq)]
pub struct ProxyConfig {
    /// Port to listen on (all interfaces).
    pub listen_port: u16,

    /// Loopback port requests are forwarded to.
    pub target_port: u16,

    /// Maximum simultaneous upstream exchanges.
    pub max_concurrency: usize,

    /// Backoff for transport-level failures.
    pub retry: RetryPolicy,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Largest request body buffered for forwarding.
    pub max_body_bytes: usize,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

impl ProxyConfig {
    /// Validate raw values and build a config with defaults for everything else.
    pub fn new(listen_port: i64, target_port: i64, max_concurrency: i64) -> Result<Self, ConfigError> {
        Ok(Self {
            listen_port: validate_port(PortSide::From, listen_port)?,
            target_port: validate_port(PortSide::To, target_port)?,
            max_concurrency: validate_limit(max_concurrency)?,
            retry: RetryPolicy::default(),
            timeouts: TimeoutConfig::default(),
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            observability: ObservabilityConfig::default(),
        })
    }

    /// Address the listener binds to.
    pub fn listen_address(&self) -> SocketAddr {
        SocketAddr::from((Ipv4Addr::UNSPECIFIED, self.listen_port))
    }

    /// Loopback address of the upstream.
    pub fn target_address(&self) -> SocketAddr {
        SocketAddr::from((Ipv4Addr::LOCALHOST, self.target_port))
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeoutConfig {
    /// Upstream TCP connect timeout, per attempt.
    pub connect: Duration,

    /// How long shutdown waits for in-flight work.
    pub drain: Duration,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect: Duration::from_secs(30),
            drain: Duration::from_secs(10),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObservabilityConfig {
    /// Prometheus scrape address; exporter disabled when `None`.
    pub metrics_address: Option<SocketAddr>,
}
