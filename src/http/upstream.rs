//! Outbound exchange with the fixed upstream.
//!
//! [`Upstream`] is the single "relay one request, get one response" capability
//! the retry transport is built on. [`HyperUpstream`] is the production
//! implementation over hyper-util's pooled client.

use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, Response};
use futures_util::future::BoxFuture;
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::{TokioExecutor, TokioTimer},
};
use thiserror::Error;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Transport-level failure of a single exchange.
///
/// A completed HTTP response, whatever its status, is never an `UpstreamError`.
#[derive(Debug, Error)]
pub enum UpstreamError {
    /// The TCP connection could not be established (refused, timed out).
    #[error("connect to {target} failed: {source}")]
    Connect {
        target: String,
        #[source]
        source: BoxError,
    },
    /// The connection broke while sending or awaiting the response.
    #[error("exchange with {target} failed: {source}")]
    Exchange {
        target: String,
        #[source]
        source: BoxError,
    },
    /// No response arrived before the retry budget ran out.
    #[error("no response from {target} within {after:?}")]
    Timeout { target: String, after: Duration },
}

impl UpstreamError {
    pub fn as_label(&self) -> &'static str {
        match self {
            UpstreamError::Connect { .. } => "upstream_connect",
            UpstreamError::Exchange { .. } => "upstream_exchange",
            UpstreamError::Timeout { .. } => "upstream_timeout",
        }
    }
}

/// Capability to perform one HTTP exchange with the upstream.
pub trait Upstream: Send + Sync {
    fn send(&self, request: Request<Body>) -> BoxFuture<'static, Result<Response<Body>, UpstreamError>>;
}

/// hyper-util backed [`Upstream`].
#[derive(Clone)]
pub struct HyperUpstream {
    client: Client<HttpConnector, Body>,
}

impl HyperUpstream {
    pub fn new(connect_timeout: Duration) -> Self {
        let mut connector = HttpConnector::new();
        connector.set_connect_timeout(Some(connect_timeout));
        connector.set_nodelay(true);

        let client = Client::builder(TokioExecutor::new())
            .pool_timer(TokioTimer::new())
            .pool_idle_timeout(Duration::from_secs(90))
            .build(connector);

        Self { client }
    }
}

impl Upstream for HyperUpstream {
    fn send(&self, request: Request<Body>) -> BoxFuture<'static, Result<Response<Body>, UpstreamError>> {
        let client = self.client.clone();
        let target = request.uri().to_string();

        Box::pin(async move {
            match client.request(request).await {
                Ok(response) => Ok(response.map(Body::new)),
                Err(e) if e.is_connect() => Err(UpstreamError::Connect {
                    target,
                    source: Box::new(e),
                }),
                Err(e) => Err(UpstreamError::Exchange {
                    target,
                    source: Box::new(e),
                }),
            }
        })
    }
}
