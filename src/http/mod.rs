//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (hyper HTTP/1 connection, Axum router, forward_handler)
//!     → request.rs (buffer body, rewrite target, strip hop-by-hop)
//!     → resilience::RetryTransport
//!     → upstream.rs (one exchange with 127.0.0.1:<toPort>)
//!     → response.rs (relay, or 502 on failure)
//!     → Send to client
//! ```

pub mod request;
pub mod response;
pub mod server;
pub mod upstream;

pub use request::ForwardRequest;
pub use server::{AppState, HttpServer, RequestCancellation};
pub use upstream::{HyperUpstream, Upstream, UpstreamError};
