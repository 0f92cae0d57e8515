//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! ForwardRequest from the handler:
//!     → limiter.rs (wait for a permit or cancellation)
//!     → retries.rs (attempt loop against the Upstream)
//!     → On transport error: backoff.rs (next delay or budget exhausted)
//!     → permit released when the loop exits
//! ```
//!
//! # Design Decisions
//! - Only transport-level failures are retried; any HTTP response is final
//! - Retries are bounded by elapsed time, not by attempt count
//! - The limiter is an owned handle passed in, never a global

pub mod backoff;
pub mod limiter;
pub mod retries;

pub use backoff::{AttemptState, RetryPolicy};
pub use limiter::{AdmissionError, ConcurrencyLimiter, Permit};
pub use retries::{ForwardError, RetryTransport};
