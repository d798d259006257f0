//! Service state machine with drain signalling and in-flight request tracking.
//!
//! Uses `ArcSwap` for lock-free state transitions and an atomic counter with
//! RAII guards for accurate in-flight request tracking.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use tokio::sync::watch;

/// Lifecycle state of the service.
///
/// State machine: Uninitialized -> Initializing -> Serving -> Draining -> Stopped.
/// Transitions only ever move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ServiceState {
    /// Constructed, nothing started yet.
    Uninitialized,
    /// Validating config and bringing up the provider and publisher.
    Initializing,
    /// Listener bound; new requests are admitted.
    Serving,
    /// No new requests admitted; in-flight requests are finishing.
    Draining,
    /// Drained and the publisher is disconnected.
    Stopped,
}

impl ServiceState {
    /// Lowercase name used in health output and logs.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Uninitialized => "uninitialized",
            Self::Initializing => "initializing",
            Self::Serving => "serving",
            Self::Draining => "draining",
            Self::Stopped => "stopped",
        }
    }
}

/// A requested transition was not allowed from the current state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("cannot move service from {} to {}", from.as_str(), to.as_str())]
pub struct TransitionError {
    pub from: ServiceState,
    pub to: ServiceState,
}

/// Owns the service state and coordinates draining.
///
/// 1. The lifecycle drives `transition()` through startup
/// 2. The admission middleware checks `service_state()` and holds an
///    `in_flight_guard()` per admitted request
/// 3. `begin_drain()` moves Serving -> Draining and wakes `drain_requested()`
/// 4. `wait_for_drain()` waits until in-flight requests complete
#[derive(Debug)]
pub struct ShutdownController {
    drain_signal: watch::Sender<bool>,
    in_flight: Arc<AtomicU64>,
    state: Arc<ArcSwap<ServiceState>>,
}

impl ShutdownController {
    /// Creates a new controller in the `Uninitialized` state.
    #[must_use]
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self {
            drain_signal: tx,
            in_flight: Arc::new(AtomicU64::new(0)),
            state: Arc::new(ArcSwap::from_pointee(ServiceState::Uninitialized)),
        }
    }

    /// Returns the current state.
    #[must_use]
    pub fn service_state(&self) -> ServiceState {
        **self.state.load()
    }

    /// Moves to `next` if it lies strictly ahead of the current state.
    ///
    /// Returns the state that was replaced.
    ///
    /// # Errors
    ///
    /// Returns [`TransitionError`] for backward or repeated transitions; the
    /// state is left unchanged.
    pub fn transition(&self, next: ServiceState) -> Result<ServiceState, TransitionError> {
        self.advance_if(next, |current| current < next)
    }

    /// Starts draining. Only the call that observes `Serving` wins.
    ///
    /// Returns `false` when the service is not serving, including when a
    /// drain is already in progress.
    pub fn begin_drain(&self) -> bool {
        let started = self
            .advance_if(ServiceState::Draining, |current| {
                current == ServiceState::Serving
            })
            .is_ok();
        if started {
            self.drain_signal.send_replace(true);
        }
        started
    }

    /// Resolves once draining has begun.
    ///
    /// The returned future does not borrow the controller, so it can be
    /// handed to a server as its graceful-shutdown trigger.
    pub fn drain_requested(&self) -> impl Future<Output = ()> + Send + 'static {
        let mut rx = self.drain_signal.subscribe();
        async move {
            // A closed channel means the controller is gone; treat as drained.
            let _ = rx.wait_for(|draining| *draining).await;
        }
    }

    /// Creates an RAII guard that tracks an in-flight request.
    ///
    /// The in-flight counter is incremented on creation and decremented
    /// when the guard is dropped, even if the handler panics.
    #[must_use]
    pub fn in_flight_guard(&self) -> InFlightGuard {
        self.in_flight.fetch_add(1, Ordering::Relaxed);
        InFlightGuard {
            in_flight: Arc::clone(&self.in_flight),
        }
    }

    /// Returns the current number of in-flight requests.
    #[must_use]
    pub fn in_flight_count(&self) -> u64 {
        self.in_flight.load(Ordering::Relaxed)
    }

    /// Waits for all in-flight requests to complete, up to the given timeout.
    ///
    /// Returns `false` if the timeout expired with requests still running.
    pub async fn wait_for_drain(&self, timeout: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + timeout;

        loop {
            if self.in_flight.load(Ordering::Relaxed) == 0 {
                return true;
            }

            if tokio::time::Instant::now() >= deadline {
                return false;
            }

            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    fn advance_if(
        &self,
        next: ServiceState,
        allowed: impl Fn(ServiceState) -> bool,
    ) -> Result<ServiceState, TransitionError> {
        let previous = self.state.rcu(|current| {
            if allowed(**current) {
                Arc::new(next)
            } else {
                Arc::clone(current)
            }
        });
        if allowed(*previous) {
            Ok(*previous)
        } else {
            Err(TransitionError {
                from: *previous,
                to: next,
            })
        }
    }
}

impl Default for ShutdownController {
    fn default() -> Self {
        Self::new()
    }
}

/// RAII guard that decrements the in-flight counter when dropped.
#[derive(Debug)]
pub struct InFlightGuard {
    in_flight: Arc<AtomicU64>,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.in_flight.fetch_sub(1, Ordering::Relaxed);
    }
}
