//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Validated config → metrics exporter → bind listener → serve
//!
//! Signals (signals.rs):
//!     SIGINT/SIGTERM/SIGHUP → Shutdown::trigger (shutdown.rs)
//!
//! Shutdown (state.rs, driven by http::server):
//!     Listening → Draining (stop accept, drain window) → Terminated
//! ```
//!
//! # Design Decisions
//! - The server only sees a shutdown future, never OS signals
//! - Shutdown has timeout: remaining connections are force-closed after the window
//! - A forced close is reported, not treated as a process failure

pub mod shutdown;
pub mod signals;
pub mod startup;
pub mod state;

pub use shutdown::Shutdown;
pub use startup::{run, run_until, ServerError};
pub use state::{DrainOutcome, Lifecycle, ServerLifecycle};
