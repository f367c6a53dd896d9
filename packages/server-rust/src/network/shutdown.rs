//! Graceful shutdown controller with in-flight request tracking.
//!
//! Uses `ArcSwap` for lock-free health state transitions and an atomic
//! counter with RAII guards for in-flight request tracking. Once draining,
//! [`ShutdownController::try_enter`] refuses new requests, so the drain wait
//! only ever covers work that was admitted before shutdown.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;

/// Server health state, transitioned by the shutdown controller.
///
/// State machine: Starting -> Ready -> Draining -> Stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthState {
    /// Registry built, listener not yet serving.
    Starting,
    /// Accepting requests.
    Ready,
    /// Finishing admitted requests; new ones are refused.
    Draining,
    /// All admitted requests completed.
    Stopped,
}

impl HealthState {
    /// Lowercase name used in health responses.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Starting => "starting",
            Self::Ready => "ready",
            Self::Draining => "draining",
            Self::Stopped => "stopped",
        }
    }

    /// Whether new requests may be admitted in this state.
    #[must_use]
    pub fn is_accepting(self) -> bool {
        matches!(self, Self::Starting | Self::Ready)
    }
}

/// Coordinates shutdown across the server:
/// 1. Health probes read `health_state()`
/// 2. Handlers call `try_enter()` and hold the guard while they work
/// 3. `trigger_shutdown()` moves to Draining
/// 4. `wait_for_drain()` waits until the guards are gone
#[derive(Debug)]
pub struct ShutdownController {
    in_flight: Arc<AtomicU64>,
    health_state: ArcSwap<HealthState>,
}

impl ShutdownController {
    /// Creates a new shutdown controller in the `Starting` state.
    #[must_use]
    pub fn new() -> Self {
        Self {
            in_flight: Arc::new(AtomicU64::new(0)),
            health_state: ArcSwap::from_pointee(HealthState::Starting),
        }
    }

    pub fn set_ready(&self) {
        self.health_state.store(Arc::new(HealthState::Ready));
    }

    /// Moves to `Draining`; later `try_enter` calls are refused.
    pub fn trigger_shutdown(&self) {
        self.health_state.store(Arc::new(HealthState::Draining));
    }

    #[must_use]
    pub fn health_state(&self) -> HealthState {
        **self.health_state.load()
    }

    /// Admits a request, or returns `None` once shutdown has begun.
    ///
    /// The in-flight counter is decremented when the guard drops, even if
    /// the handler panics.
    #[must_use]
    pub fn try_enter(&self) -> Option<InFlightGuard> {
        self.in_flight.fetch_add(1, Ordering::SeqCst);
        let guard = InFlightGuard {
            in_flight: Arc::clone(&self.in_flight),
        };
        // Checked after incrementing so a concurrent drain either sees this
        // request or the request sees the drain.
        if self.health_state().is_accepting() {
            Some(guard)
        } else {
            None
        }
    }

    #[must_use]
    pub fn in_flight_count(&self) -> u64 {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Waits for all admitted requests to complete, up to `timeout`.
    ///
    /// Returns `true` and moves to `Stopped` if everything drained; returns
    /// `false` and stays `Draining` if the timeout expired.
    pub async fn wait_for_drain(&self, timeout: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + timeout;

        loop {
            if self.in_flight.load(Ordering::SeqCst) == 0 {
                self.health_state.store(Arc::new(HealthState::Stopped));
                return true;
            }

            if tokio::time::Instant::now() >= deadline {
                return false;
            }

            tokio::time::sleep(Duration::from_millis(10)).await;
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
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}
