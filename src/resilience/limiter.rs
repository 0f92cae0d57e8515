//! Admission control for outbound exchanges.
//!
//! A counting gate over a tokio [`Semaphore`]. Every forwarding call holds one
//! [`Permit`] for the whole attempt loop; the permit returns to the pool when
//! dropped, so it is released exactly once on every exit path.

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio_util::sync::CancellationToken;

/// Failure to obtain a permit.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum AdmissionError {
    /// The caller's cancellation token fired while waiting.
    #[error("canceled while waiting for a forwarding slot")]
    Canceled,
    /// The underlying semaphore was closed.
    #[error("concurrency limiter closed")]
    Closed,
}

/// Shared limiter bounding simultaneous outbound exchanges.
#[derive(Debug, Clone)]
pub struct ConcurrencyLimiter {
    permits: Arc<Semaphore>,
    max: usize,
}

impl ConcurrencyLimiter {
    /// Create a limiter with `max` permits (at least one).
    pub fn new(max: usize) -> Self {
        let max = max.clamp(1, Semaphore::MAX_PERMITS);
        Self {
            permits: Arc::new(Semaphore::new(max)),
            max,
        }
    }

    /// Wait for a free permit, giving up when `cancel` fires.
    pub async fn acquire(&self, cancel: &CancellationToken) -> Result<Permit, AdmissionError> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(AdmissionError::Canceled),
            permit = self.permits.clone().acquire_owned() => permit
                .map(|permit| Permit { _permit: permit })
                .map_err(|_| AdmissionError::Closed),
        }
    }

    /// Take a permit only if one is free right now.
    pub fn try_acquire(&self) -> Option<Permit> {
        self.permits
            .clone()
            .try_acquire_owned()
            .ok()
            .map(|permit| Permit { _permit: permit })
    }

    /// Permits currently free.
    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }

    /// Permits currently held.
    pub fn in_flight(&self) -> usize {
        self.max - self.available()
    }

    pub fn max(&self) -> usize {
        self.max
    }
}

/// A held admission slot. Dropping it releases the slot.
#[derive(Debug)]
#[must_use = "the slot is released as soon as the permit is dropped"]
pub struct Permit {
    _permit: OwnedSemaphorePermit,
}

impl Permit {
    /// Return the slot to the limiter.
    pub fn release(self) {
        drop(self);
    }
}
