//! Exponential backoff with jitter, bounded by an elapsed-time budget.
//!
//! [`RetryPolicy`] is the immutable value shared by every forwarding call.
//! [`AttemptState`] is created per call and answers one question after each
//! failed attempt: how long to wait before the next one, or whether to stop.
//!
//! The un-jittered delay before retry `n` (1-indexed) is
//! `initial_interval × multiplier^(n-1)`, clamped to `max_interval`. Jitter
//! spreads it uniformly over `±randomization_factor` and the result is clamped
//! to `max_interval` again. A retry is only scheduled while
//! `elapsed + delay <= max_elapsed_time`.

use std::time::Duration;

use rand::Rng;
use tokio::time::Instant;

/// Retry/backoff parameters for the forwarding transport.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Delay before the first retry.
    pub initial_interval: Duration,
    /// Growth factor applied per retry.
    pub multiplier: f64,
    /// Jitter spread as a fraction of the delay (`0.0` disables jitter).
    pub randomization_factor: f64,
    /// Upper bound for a single backoff interval.
    pub max_interval: Duration,
    /// Total budget measured from the first attempt.
    pub max_elapsed_time: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            initial_interval: Duration::from_millis(500),
            multiplier: 1.5,
            randomization_factor: 0.5,
            max_interval: Duration::from_secs(3),
            max_elapsed_time: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    /// Un-jittered delay before retry number `retry` (1-indexed).
    pub fn interval(&self, retry: u32) -> Duration {
        if retry == 0 {
            return Duration::ZERO;
        }

        let exponent = (retry - 1).min(i32::MAX as u32) as i32;
        let secs = self.initial_interval.as_secs_f64() * self.multiplier.powi(exponent);

        if !secs.is_finite() || secs > self.max_interval.as_secs_f64() {
            self.max_interval
        } else if secs <= 0.0 {
            Duration::ZERO
        } else {
            Duration::from_secs_f64(secs)
        }
    }

    /// Apply jitter to `base`, never exceeding `max_interval`.
    pub fn jittered(&self, base: Duration) -> Duration {
        let factor = self.randomization_factor.clamp(0.0, 1.0);
        if factor == 0.0 || base.is_zero() {
            return base.min(self.max_interval);
        }

        let base_secs = base.as_secs_f64();
        let delta = base_secs * factor;
        let secs = rand::thread_rng().gen_range((base_secs - delta)..=(base_secs + delta));

        Duration::from_secs_f64(secs).min(self.max_interval)
    }

    /// Whether a retry waiting `delay` still fits the elapsed-time budget.
    pub fn within_budget(&self, elapsed: Duration, delay: Duration) -> bool {
        elapsed.saturating_add(delay) <= self.max_elapsed_time
    }
}

/// Per-call retry bookkeeping: attempt counter, clock and last failure.
#[derive(Debug)]
pub struct AttemptState<E> {
    policy: RetryPolicy,
    started: Instant,
    attempts: u32,
    last_error: Option<E>,
}

impl<E> AttemptState<E> {
    /// Start the clock for a new forwarding call.
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            started: Instant::now(),
            attempts: 0,
            last_error: None,
        }
    }

    /// Count a new attempt and return its 1-based index.
    pub fn begin_attempt(&mut self) -> u32 {
        self.attempts = self.attempts.saturating_add(1);
        self.attempts
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Time left in the elapsed-time budget.
    pub fn remaining(&self) -> Duration {
        self.policy.max_elapsed_time.saturating_sub(self.elapsed())
    }

    pub fn record_failure(&mut self, error: E) {
        self.last_error = Some(error);
    }

    pub fn take_last_error(&mut self) -> Option<E> {
        self.last_error.take()
    }

    /// Delay before the next attempt, or `None` once the budget is spent.
    pub fn next_backoff(&self) -> Option<Duration> {
        let delay = self.policy.jittered(self.policy.interval(self.attempts));
        self.policy
            .within_budget(self.elapsed(), delay)
            .then_some(delay)
    }
}
