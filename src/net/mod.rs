//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming TCP connection
//!     → listener.rs (bind, accept)
//!     → connection.rs (id + live-connection count)
//!     → Hand off to HTTP layer (http::server)
//! ```
//!
//! # Design Decisions
//! - Bind errors are fatal at startup; accept errors are logged and skipped
//! - Each connection is counted so drain can report stragglers

pub mod connection;
pub mod listener;

pub use connection::{ConnectionGuard, ConnectionId, ConnectionTracker};
pub use listener::{Listener, ListenerError};
