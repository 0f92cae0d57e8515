//! Bounded, retrying forwarding transport.
//!
//! # Responsibilities
//! - Admit at most `max_concurrency` exchanges at once ([`ConcurrencyLimiter`])
//! - Retry transport-level failures with exponential backoff ([`RetryPolicy`])
//! - Observe the caller's cancellation token at every suspension point
//!
//! # Design Decisions
//! - Any completed HTTP response counts as success, 5xx included
//! - One permit is held across the whole attempt loop, backoff included
//! - A single attempt is cut off once the elapsed-time budget is spent
//! - The permit is released by drop, so every exit path releases it once

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Method, Response, Uri};
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::http::request::ForwardRequest;
use crate::http::upstream::{Upstream, UpstreamError};
use crate::observability::events::{Event, Observer};
use crate::resilience::backoff::{AttemptState, RetryPolicy};
use crate::resilience::limiter::{AdmissionError, ConcurrencyLimiter};

/// Outcome of a forwarding call that produced no response.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum ForwardError {
    /// No permit was granted before cancellation; nothing was sent.
    #[error("admission canceled: {0}")]
    AdmissionCanceled(#[source] AdmissionError),

    /// Cancellation fired during an attempt or a backoff wait.
    #[error("forwarding canceled after {attempts} attempt(s)")]
    Canceled {
        attempts: u32,
        #[source]
        last_error: Option<UpstreamError>,
    },

    /// The elapsed-time budget ran out without a response.
    #[error("retries exhausted after {attempts} attempt(s) in {elapsed:?}: {last_error}")]
    RetryExhausted {
        attempts: u32,
        elapsed: Duration,
        #[source]
        last_error: UpstreamError,
    },
}

impl ForwardError {
    /// Short stable label (snake_case) for logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            ForwardError::AdmissionCanceled(_) => "admission_canceled",
            ForwardError::Canceled { .. } => "canceled",
            ForwardError::RetryExhausted { .. } => "retry_exhausted",
        }
    }
}

/// Forwarding transport shared by every request.
pub struct RetryTransport {
    upstream: Arc<dyn Upstream>,
    limiter: ConcurrencyLimiter,
    policy: RetryPolicy,
    observer: Arc<dyn Observer>,
}

impl RetryTransport {
    pub fn new(
        upstream: Arc<dyn Upstream>,
        limiter: ConcurrencyLimiter,
        policy: RetryPolicy,
        observer: Arc<dyn Observer>,
    ) -> Self {
        Self {
            upstream,
            limiter,
            policy,
            observer,
        }
    }

    pub fn limiter(&self) -> &ConcurrencyLimiter {
        &self.limiter
    }

    /// Relay `request` to the upstream, retrying transport failures.
    ///
    /// Returns the first completed response, or an error once `cancel` fires
    /// or the policy's elapsed-time budget is spent.
    pub async fn forward(
        &self,
        request: &ForwardRequest,
        cancel: &CancellationToken,
    ) -> Result<Response<Body>, ForwardError> {
        let method = request.method();
        let target = request.uri();

        let _permit = match self.limiter.acquire(cancel).await {
            Ok(permit) => permit,
            Err(e) => {
                self.observer
                    .on_event(&Event::AdmissionCanceled { method, target });
                return Err(ForwardError::AdmissionCanceled(e));
            }
        };

        let mut state = AttemptState::new(self.policy);
        loop {
            let attempt = state.begin_attempt();
            self.observer.on_event(&Event::AttemptStarted {
                attempt,
                method,
                target,
            });

            // An attempt never outlives the elapsed-time budget.
            let remaining = state.remaining();
            let exchange = tokio::time::timeout(remaining, self.upstream.send(request.to_request()));

            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                result = exchange => Some(result.unwrap_or_else(|_| {
                    Err(UpstreamError::Timeout {
                        target: target.to_string(),
                        after: remaining,
                    })
                })),
            };

            let error = match outcome {
                None => return Err(self.canceled(&mut state, method, target)),
                Some(Ok(response)) => {
                    self.observer.on_event(&Event::ForwardSucceeded {
                        attempts: attempt,
                        status: response.status(),
                        method,
                        target,
                    });
                    return Ok(response);
                }
                Some(Err(e)) => e,
            };

            let Some(delay) = state.next_backoff() else {
                let elapsed = state.elapsed();
                self.observer.on_event(&Event::RetryExhausted {
                    attempts: attempt,
                    elapsed,
                    method,
                    target,
                    error: &error,
                });
                return Err(ForwardError::RetryExhausted {
                    attempts: attempt,
                    elapsed,
                    last_error: error,
                });
            };

            self.observer.on_event(&Event::RetryScheduled {
                attempt,
                delay,
                method,
                target,
                error: &error,
            });
            state.record_failure(error);

            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(self.canceled(&mut state, method, target)),
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }

    fn canceled(
        &self,
        state: &mut AttemptState<UpstreamError>,
        method: &Method,
        target: &Uri,
    ) -> ForwardError {
        self.observer.on_event(&Event::Canceled {
            attempts: state.attempts(),
            method,
            target,
        });
        ForwardError::Canceled {
            attempts: state.attempts(),
            last_error: state.take_last_error(),
        }
    }
}
