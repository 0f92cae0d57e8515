//! Server lifecycle state machine.
//!
//! # State Transitions
//! ```text
//! Listening → Draining: shutdown requested, listener closed
//! Draining → Terminated: all connections done, or drain window expired
//! ```
//!
//! Transitions only move forward; anything else is rejected.

use std::time::Duration;

use tokio::sync::watch;

/// Phase of the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerLifecycle {
    /// Accepting and serving connections.
    Listening,
    /// No new connections; in-flight work is finishing.
    Draining,
    /// Everything is closed.
    Terminated,
}

impl ServerLifecycle {
    pub fn can_transition_to(self, next: ServerLifecycle) -> bool {
        matches!(
            (self, next),
            (ServerLifecycle::Listening, ServerLifecycle::Draining)
                | (ServerLifecycle::Draining, ServerLifecycle::Terminated)
        )
    }
}

/// How the drain phase ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrainOutcome {
    /// Every connection finished inside the window.
    Clean { elapsed: Duration },
    /// The window expired; `remaining` connections were force-closed.
    Forced { remaining: usize },
}

/// Owner of the current [`ServerLifecycle`], observable through a watch channel.
#[derive(Debug)]
pub struct Lifecycle {
    tx: watch::Sender<ServerLifecycle>,
}

impl Lifecycle {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(ServerLifecycle::Listening);
        Self { tx }
    }

    pub fn current(&self) -> ServerLifecycle {
        *self.tx.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<ServerLifecycle> {
        self.tx.subscribe()
    }

    /// Move to `next`. Returns `false` (and changes nothing) if not allowed.
    pub fn advance(&self, next: ServerLifecycle) -> bool {
        let moved = self.tx.send_if_modified(|state| {
            if state.can_transition_to(next) {
                *state = next;
                true
            } else {
                false
            }
        });

        if !moved {
            tracing::warn!(from = ?self.current(), to = ?next, "Rejected lifecycle transition");
        }
        moved
    }
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transitions_are_one_directional() {
        use ServerLifecycle::*;

        assert!(Listening.can_transition_to(Draining));
        assert!(Draining.can_transition_to(Terminated));

        assert!(!Listening.can_transition_to(Terminated));
        assert!(!Draining.can_transition_to(Listening));
        assert!(!Terminated.can_transition_to(Listening));
        assert!(!Terminated.can_transition_to(Draining));
        assert!(!Listening.can_transition_to(Listening));
    }

    #[test]
    fn lifecycle_publishes_state() {
        let lifecycle = Lifecycle::new();
        let rx = lifecycle.subscribe();
        assert_eq!(lifecycle.current(), ServerLifecycle::Listening);

        assert!(!lifecycle.advance(ServerLifecycle::Terminated));
        assert_eq!(*rx.borrow(), ServerLifecycle::Listening);

        assert!(lifecycle.advance(ServerLifecycle::Draining));
        assert!(lifecycle.advance(ServerLifecycle::Terminated));
        assert_eq!(*rx.borrow(), ServerLifecycle::Terminated);

        assert!(!lifecycle.advance(ServerLifecycle::Draining));
        assert_eq!(lifecycle.current(), ServerLifecycle::Terminated);
    }
}
