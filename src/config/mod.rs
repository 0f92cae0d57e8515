//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! command line
//!     → loader.rs (clap parse, `-limit=N` accepted)
//!     → validation.rs (port format/range, limit)
//!     → ProxyConfig (validated, immutable)
//!     → owned by the server, shared read-only
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded
//! - Every error here is fatal and happens before any socket is bound

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_from_args, Cli};
pub use schema::{ObservabilityConfig, ProxyConfig, TimeoutConfig};
pub use validation::ConfigError;
