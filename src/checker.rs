//! Periodic remote-capability polling.
//!
//! The renderer refuses chat input while the avatar is speaking, so the
//! page polls a remote boolean capability ("can the remote side accept
//! new input") and forwards the result to a UI callback. The checker is
//! an explicitly constructed, explicitly owned scheduler: whoever owns
//! the page's lifetime owns the checker, and there is no ambient global.
//!
//! # Scheduling
//!
//! The poll loop ticks on a fine-grained timer and fires a check only
//! once the next-check deadline has passed. The deadline advances one
//! interval from *check completion*, not from the previous deadline, so
//! slow responses produce natural backoff instead of a burst of catch-up
//! polls. A re-entrancy guard set synchronously before the request and
//! cleared in a guaranteed-run finalizer ensures two checks never share
//! the bridge concurrently.
//!
//! [`StateChecker::delay_next_check`] pushes the deadline forward once,
//! suppressing the immediate re-poll race right after a user action
//! changes remote state.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use serde_json::Value;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval};
use tracing::{debug, trace};

use crate::bridge::Bridge;
use crate::error::Result;
use crate::protocol::{Envelope, Target, truthy};

// ============================================================================
// Constants
// ============================================================================

/// Interval between checks, measured from check completion.
const CHECK_INTERVAL: Duration = Duration::from_secs(1);

/// Scheduler tick granularity.
const TICK: Duration = Duration::from_millis(250);

// ============================================================================
// Types
// ============================================================================

/// Callback receiving the polled capability result.
pub type EnabledCallback = Arc<dyn Fn(bool) + Send + Sync>;

// ============================================================================
// CapabilityProbe
// ============================================================================

/// The remote capability polled by the checker.
///
/// Defaults to the avatar's readiness check.
#[derive(Debug, Clone)]
pub struct CapabilityProbe {
    /// Remote object addressing.
    pub target: Target,
    /// Component holding the capability.
    pub component: String,
    /// Boolean-returning method to invoke.
    pub method: String,
}

impl Default for CapabilityProbe {
    fn default() -> Self {
        Self {
            target: Target::by_tag("Avatar"),
            component: "HumanState".to_string(),
            method: "CanReceiveNewMessage".to_string(),
        }
    }
}

impl CapabilityProbe {
    /// Builds the invocation envelope for this probe.
    fn to_payload(&self) -> Result<Value> {
        Envelope::call(self.target.clone(), &self.component, &self.method).to_value()
    }
}

// ============================================================================
// StateChecker
// ============================================================================

/// Shared state between the checker handle and its poll task.
struct CheckerInner {
    /// The running poll task, if any.
    task: Mutex<Option<JoinHandle<()>>>,
    /// Deadline for the next check.
    next_check_at: Mutex<Instant>,
    /// Re-entrancy guard: a check is in flight.
    checking: AtomicBool,
}

/// Periodic poller of a remote boolean capability.
///
/// At most one poll loop runs per checker; [`StateChecker::init`]
/// cancels any previous loop before starting a new one.
pub struct StateChecker {
    inner: Arc<CheckerInner>,
    probe: CapabilityProbe,
}

impl StateChecker {
    /// Creates a checker polling the default capability.
    #[must_use]
    pub fn new() -> Self {
        Self::with_probe(CapabilityProbe::default())
    }

    /// Creates a checker polling a custom capability.
    #[must_use]
    pub fn with_probe(probe: CapabilityProbe) -> Self {
        Self {
            inner: Arc::new(CheckerInner {
                task: Mutex::new(None),
                next_check_at: Mutex::new(Instant::now() + CHECK_INTERVAL),
                checking: AtomicBool::new(false),
            }),
            probe,
        }
    }

    /// (Re)configures the checker and (re)starts its schedule.
    ///
    /// Any previously running poll loop is cancelled first; at most one
    /// loop is ever active per checker.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`](crate::Error::Json) if the probe envelope
    /// cannot be serialized.
    pub fn init(&self, bridge: Bridge, callback: EnabledCallback) -> Result<()> {
        let payload = self.probe.to_payload()?;

        self.stop();
        *self.inner.next_check_at.lock() = Instant::now() + CHECK_INTERVAL;

        let inner = Arc::clone(&self.inner);
        let handle = tokio::spawn(Self::poll_loop(inner, bridge, callback, payload));
        *self.inner.task.lock() = Some(handle);

        debug!("State checker (re)initialized");
        Ok(())
    }

    /// Pushes the next-check deadline forward by `delay` from now.
    ///
    /// Affects only the next cycle; subsequent checks return to the
    /// normal cadence.
    pub fn delay_next_check(&self, delay: Duration) {
        *self.inner.next_check_at.lock() = Instant::now() + delay;
        trace!(delay_ms = delay.as_millis() as u64, "Next check delayed");
    }

    /// Cancels the poll loop. Idempotent.
    pub fn stop(&self) {
        if let Some(handle) = self.inner.task.lock().take() {
            handle.abort();
            debug!("State checker stopped");
        }
    }

    /// Returns `true` while a poll loop is scheduled.
    #[inline]
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.inner.task.lock().is_some()
    }

    async fn poll_loop(
        inner: Arc<CheckerInner>,
        bridge: Bridge,
        callback: EnabledCallback,
        payload: Value,
    ) {
        let mut ticker = interval(TICK);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;

            if Instant::now() < *inner.next_check_at.lock() {
                continue;
            }
            if inner.checking.swap(true, Ordering::SeqCst) {
                trace!("Check already in flight, tick skipped");
                continue;
            }
            let _guard = CheckGuard(&inner.checking);

            let enabled = match bridge.request(payload.clone()).await {
                Ok(value) => truthy(&value),
                Err(e) => {
                    debug!(error = %e, "Capability check failed, treating as disabled");
                    false
                }
            };
            callback(enabled);

            // Interval measured from completion: slow responses back off
            // instead of bunching.
            *inner.next_check_at.lock() = Instant::now() + CHECK_INTERVAL;
        }
    }
}

impl Default for StateChecker {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for StateChecker {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Clears the re-entrancy guard on every exit path.
struct CheckGuard<'a>(&'a AtomicBool);

impl Drop for CheckGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

// ============================================================================
// Tests
// ============================================================================
