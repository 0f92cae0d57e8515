//! HTTP server and forwarding handler.
//!
//! # Responsibilities
//! - Create the Axum Router with the forwarding handler
//! - Serve each client connection with hyper's HTTP/1 builder
//! - Own the accept loop and the Listening → Draining → Terminated sequence
//! - Translate forwarding failures into 502 responses

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{Request, StatusCode},
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use hyper::{body::Incoming, server::conn::http1, service::service_fn};
use hyper_util::rt::TokioIo;
use tokio::net::TcpStream;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;
use tower_http::{limit::RequestBodyLimitLayer, trace::TraceLayer};

use crate::config::ProxyConfig;
use crate::http::request::ForwardRequest;
use crate::http::response;
use crate::http::upstream::HyperUpstream;
use crate::lifecycle::state::{DrainOutcome, Lifecycle, ServerLifecycle};
use crate::net::{ConnectionTracker, Listener};
use crate::observability::{default_observer, Event, Observer};
use crate::resilience::{ConcurrencyLimiter, RetryTransport};

/// Cancellation token for one inbound request.
///
/// Child of the connection's token, so it fires when the client connection
/// ends or is force-closed.
#[derive(Debug, Clone)]
pub struct RequestCancellation(pub CancellationToken);

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub transport: Arc<RetryTransport>,
    pub target: SocketAddr,
    pub max_body_bytes: usize,
    pub observer: Arc<dyn Observer>,
}

/// HTTP server for the forwarder.
pub struct HttpServer {
    router: Router,
    config: ProxyConfig,
    transport: Arc<RetryTransport>,
    observer: Arc<dyn Observer>,
    lifecycle: Lifecycle,
    tracker: ConnectionTracker,
}

impl HttpServer {
    /// Create a server that logs and records metrics.
    pub fn new(config: ProxyConfig) -> Self {
        Self::with_observer(config, default_observer())
    }

    /// Create a server reporting to `observer`.
    pub fn with_observer(config: ProxyConfig, observer: Arc<dyn Observer>) -> Self {
        let upstream = Arc::new(HyperUpstream::new(config.timeouts.connect));
        let transport = RetryTransport::new(
            upstream,
            ConcurrencyLimiter::new(config.max_concurrency),
            config.retry,
            observer.clone(),
        );
        Self::with_transport(config, Arc::new(transport), observer)
    }

    /// Create a server around an existing transport.
    pub fn with_transport(
        config: ProxyConfig,
        transport: Arc<RetryTransport>,
        observer: Arc<dyn Observer>,
    ) -> Self {
        let state = AppState {
            transport: transport.clone(),
            target: config.target_address(),
            max_body_bytes: config.max_body_bytes,
            observer: observer.clone(),
        };

        let router = Self::build_router(&config, state);
        Self {
            router,
            config,
            transport,
            observer,
            lifecycle: Lifecycle::new(),
            tracker: ConnectionTracker::new(),
        }
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(config: &ProxyConfig, state: AppState) -> Router {
        Router::new()
            .route("/{*path}", any(forward_handler))
            .route("/", any(forward_handler))
            .with_state(state)
            .layer(RequestBodyLimitLayer::new(config.max_body_bytes))
            .layer(TraceLayer::new_for_http())
    }

    pub fn transport(&self) -> &Arc<RetryTransport> {
        &self.transport
    }

    /// Watch the lifecycle state.
    pub fn lifecycle(&self) -> watch::Receiver<ServerLifecycle> {
        self.lifecycle.subscribe()
    }

    /// Serve connections from `listener` until `shutdown` completes, then drain.
    ///
    /// Per-connection and accept failures are logged, never returned.
    pub async fn run<F>(self, listener: Listener, shutdown: F) -> DrainOutcome
    where
        F: Future<Output = ()> + Send,
    {
        let drain = CancellationToken::new();
        let mut connections = JoinSet::new();
        tokio::pin!(shutdown);

        if let Ok(address) = listener.local_addr() {
            self.observer.on_event(&Event::ListenerStarted {
                address,
                max_concurrency: self.transport.limiter().max(),
            });
        }

        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                accepted = listener.accept() => match accepted {
                    Ok((stream, peer)) => self.spawn_connection(&mut connections, stream, peer, &drain),
                    Err(e) => {
                        tracing::warn!(error = %e, "Accept failed");
                        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
                    }
                },
                Some(joined) = connections.join_next(), if !connections.is_empty() => {
                    if let Err(e) = joined {
                        tracing::error!(error = %e, "Connection task failed");
                    }
                }
            }
        }

        // Stop accepting before anything else.
        drop(listener);
        self.lifecycle.advance(ServerLifecycle::Draining);

        let window = self.config.timeouts.drain;
        self.observer.on_event(&Event::DrainStarted {
            active_connections: self.tracker.active_count(),
            window,
        });
        drain.cancel();

        let started = Instant::now();
        let all_done = async {
            while connections.join_next().await.is_some() {}
        };

        let outcome = match tokio::time::timeout(window, all_done).await {
            Ok(()) => {
                let elapsed = started.elapsed();
                self.observer.on_event(&Event::DrainCompleted { elapsed });
                DrainOutcome::Clean { elapsed }
            }
            Err(_) => {
                let remaining = connections.len();
                self.observer
                    .on_event(&Event::DrainTimedOut { remaining, window });
                connections.abort_all();
                while connections.join_next().await.is_some() {}
                DrainOutcome::Forced { remaining }
            }
        };

        self.lifecycle.advance(ServerLifecycle::Terminated);
        outcome
    }

    fn spawn_connection(
        &self,
        connections: &mut JoinSet<()>,
        stream: TcpStream,
        peer: SocketAddr,
        drain: &CancellationToken,
    ) {
        let router = self.router.clone();
        let drain = drain.clone();
        let guard = self.tracker.track();

        connections.spawn(async move {
            let closed = CancellationToken::new();
            let _cancel_on_close = closed.clone().drop_guard();

            let service = service_fn(move |mut request: Request<Incoming>| {
                request.extensions_mut().insert(ConnectInfo(peer));
                request
                    .extensions_mut()
                    .insert(RequestCancellation(closed.child_token()));
                router.clone().oneshot(request.map(Body::new))
            });

            let connection = http1::Builder::new().serve_connection(TokioIo::new(stream), service);
            tokio::pin!(connection);

            let result = tokio::select! {
                result = connection.as_mut() => result,
                _ = drain.cancelled() => {
                    connection.as_mut().graceful_shutdown();
                    connection.as_mut().await
                }
            };

            if let Err(e) = result {
                tracing::debug!(connection_id = %guard.id(), peer_addr = %peer, error = %e, "Connection closed with error");
            }
        });
    }
}

/// Forwarding handler: rewrite to the loopback target and relay.
async fn forward_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let (parts, body) = request.into_parts();

    let client_ip = parts
        .extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip());
    let cancel = parts
        .extensions
        .get::<RequestCancellation>()
        .map(|c| c.0.clone())
        .unwrap_or_default();

    let body = match axum::body::to_bytes(body, state.max_body_bytes).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::debug!(method = %parts.method, uri = %parts.uri, error = %e, "Rejected request body");
            return response::body_rejection(&e);
        }
    };

    let forward = match ForwardRequest::from_parts(&parts, state.target, client_ip, body) {
        Ok(forward) => forward,
        Err(e) => {
            tracing::debug!(method = %parts.method, uri = %parts.uri, error = %e, "Invalid request target");
            return (StatusCode::BAD_REQUEST, "Invalid request target").into_response();
        }
    };

    match state.transport.forward(&forward, &cancel).await {
        Ok(upstream) => response::relay(upstream),
        Err(error) => {
            state.observer.on_event(&Event::ForwardFailed {
                method: forward.method(),
                target: forward.uri(),
                error: &error,
            });
            response::gateway_failure(&error)
        }
    }
}
