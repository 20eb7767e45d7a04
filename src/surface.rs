//! Chat submit control.
//!
//! The interaction surface is the text-input-plus-button control the
//! operator uses to talk to the avatar. The control itself lives in the
//! embedding UI behind [`SurfaceHost`]; this module owns the state
//! machine driving it and the submit lifecycle against the bridge.
//!
//! # Button state machine
//!
//! ```text
//!          set_send_enabled(true)            submit
//!   waiting ◄──────────────────► ready ────────────► sending
//!          set_send_enabled(false)                  │       │
//!                                           failure │       │ success,
//!                                        (→ ready)  │       │ still sending
//!                                                   ▼       ▼
//!                                                 ready    sent
//! ```
//!
//! The external enable/disable signal overwrites whatever state is
//! current, including `sending`/`sent`: the remote poll result is
//! authoritative for the affordance. That policy opens a race: a send
//! can complete after a poll already flipped the state. The
//! stale-completion guard closes it by promoting to `sent` only while
//! the state is still `sending`.
//!
//! # Remounting
//!
//! Embedding UI frameworks periodically re-render their containers,
//! discarding the control. [`ChatSurface::ensure_mounted`] is the
//! idempotent reconciliation: call it at startup and from whatever
//! change notification the embedder provides, and it rebuilds through
//! the same construction path and reapplies the current state.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::bridge::Bridge;
use crate::checker::StateChecker;
use crate::error::Result;
use crate::protocol::Envelope;

// ============================================================================
// Constants
// ============================================================================

/// Poll suppression after a successful send, giving the renderer time to
/// ingest the message before the next capability check.
const POST_SEND_POLL_DELAY: Duration = Duration::from_secs(1);

// ============================================================================
// ButtonState
// ============================================================================

/// Submit-affordance state of the chat control.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonState {
    /// Actionable; the remote side accepts input.
    Ready,
    /// Disabled; the remote side is busy.
    Waiting,
    /// A send is in flight.
    Sending,
    /// The last send completed.
    Sent,
}

// ============================================================================
// SurfaceHost
// ============================================================================

/// The embedding UI's side of the chat control.
///
/// Implementations own the concrete widgets. Two obligations beyond the
/// methods below: key events on the text input must not propagate to the
/// surrounding page (the renderer treats raw key events as game input),
/// and [`mount`](SurfaceHost::mount) must build the control through the
/// same path every time so reconstruction after an external teardown is
/// indistinguishable from first construction.
pub trait SurfaceHost: Send + Sync {
    /// Reflects a button state in the control's appearance.
    fn apply_state(&self, state: ButtonState);

    /// Clears the text input and refocuses it.
    fn clear_input(&self);

    /// Returns `true` while the control is present in the embedder's UI.
    fn is_mounted(&self) -> bool;

    /// (Re)builds the control.
    fn mount(&self);
}

// ============================================================================
// ChatSurface
// ============================================================================

struct SurfaceInner {
    bridge: Bridge,
    host: Arc<dyn SurfaceHost>,
    state: Mutex<ButtonState>,
    checker: Option<Arc<StateChecker>>,
}

/// State machine and submit lifecycle of the chat control.
///
/// Cheap to clone; clones share state, so the checker callback and the
/// submit path can hold their own handles.
#[derive(Clone)]
pub struct ChatSurface {
    inner: Arc<SurfaceInner>,
}

impl ChatSurface {
    /// Creates a surface in the `ready` state.
    #[must_use]
    pub fn new(bridge: Bridge, host: Arc<dyn SurfaceHost>) -> Self {
        Self::build(bridge, host, None)
    }

    /// Creates a surface that delays the checker's next poll after each
    /// successful send.
    #[must_use]
    pub fn with_checker(bridge: Bridge, host: Arc<dyn SurfaceHost>, checker: Arc<StateChecker>) -> Self {
        Self::build(bridge, host, Some(checker))
    }

    fn build(bridge: Bridge, host: Arc<dyn SurfaceHost>, checker: Option<Arc<StateChecker>>) -> Self {
        Self {
            inner: Arc::new(SurfaceInner {
                bridge,
                host,
                state: Mutex::new(ButtonState::Ready),
                checker,
            }),
        }
    }

    /// Returns the current button state.
    #[inline]
    #[must_use]
    pub fn state(&self) -> ButtonState {
        *self.inner.state.lock()
    }

    /// Applies the remote capability signal: `true → ready`,
    /// `false → waiting`.
    ///
    /// Overwrites any current state, `sending`/`sent` included; the
    /// stale-completion guard in [`submit`](Self::submit) keeps a late
    /// success from clobbering the newer state back to `sent`.
    pub fn set_send_enabled(&self, enabled: bool) {
        self.transition(if enabled {
            ButtonState::Ready
        } else {
            ButtonState::Waiting
        });
    }

    /// Submits the input text as a chat message.
    ///
    /// No-op for empty (after trimming) text or while a send is already
    /// in flight. The input is cleared optimistically, before the remote
    /// call completes. Success promotes `sending → sent` (guarded);
    /// failure reverts to `ready` and propagates the error after the
    /// revert.
    ///
    /// # Errors
    ///
    /// - [`Error::Remote`](crate::Error::Remote) if the renderer rejects the message
    /// - [`Error::RequestTimeout`](crate::Error::RequestTimeout) if no response arrives
    pub async fn submit(&self, text: &str) -> Result<()> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(());
        }
        {
            let mut state = self.inner.state.lock();
            if *state == ButtonState::Sending {
                debug!("Submit ignored, send already in flight");
                return Ok(());
            }
            *state = ButtonState::Sending;
        }
        self.inner.host.apply_state(ButtonState::Sending);

        // Optimistic clear: the operator gets the input back immediately.
        self.inner.host.clear_input();

        let payload = Envelope::chat(text).to_value()?;
        match self.inner.bridge.request(payload).await {
            Ok(_) => {
                self.promote_sent();
                if let Some(checker) = &self.inner.checker {
                    checker.delay_next_check(POST_SEND_POLL_DELAY);
                }
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "Chat send failed, reverting to ready");
                self.transition(ButtonState::Ready);
                Err(e)
            }
        }
    }

    /// Idempotently reconciles the control with the embedder's UI.
    ///
    /// Rebuilds and rewires the control when it has been torn down by an
    /// external re-render, reapplying the current state; does nothing
    /// while the control is mounted.
    pub fn ensure_mounted(&self) {
        if self.inner.host.is_mounted() {
            return;
        }
        debug!("Chat control missing, remounting");
        self.inner.host.mount();
        self.inner.host.apply_state(self.state());
    }

    /// Sets a state and reflects it on the host.
    fn transition(&self, state: ButtonState) {
        *self.inner.state.lock() = state;
        self.inner.host.apply_state(state);
    }

    /// Stale-completion guard: promote to `sent` only while still
    /// `sending`.
    fn promote_sent(&self) {
        let promoted = {
            let mut state = self.inner.state.lock();
            if *state == ButtonState::Sending {
                *state = ButtonState::Sent;
                true
            } else {
                debug!(state = ?*state, "Send completed after state moved on, leaving it");
                false
            }
        };
        if promoted {
            self.inner.host.apply_state(ButtonState::Sent);
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::{Value, json};

    use crate::transport::{InboundFrame, ResponseHandler, Transport};

    #[derive(Default)]
    struct FakeTransport {
        emitted: Mutex<Vec<Value>>,
        handler: Mutex<Option<ResponseHandler>>,
    }

    impl FakeTransport {
        fn respond(&self, envelope: Value) {
            let handler = self.handler.lock().clone();
            if let Some(handler) = handler {
                handler(InboundFrame::Structured(envelope));
            }
        }

        fn emitted_request_id(&self, index: usize) -> String {
            self.emitted.lock()[index]["requestId"]
                .as_str()
                .expect("requestId")
                .to_string()
        }
    }

    impl Transport for FakeTransport {
        fn emit(&self, message: Value) {
            self.emitted.lock().push(message);
        }

        fn on_response(&self, handler: ResponseHandler) {
            *self.handler.lock() = Some(handler);
        }
    }

    #[derive(Default)]
    struct FakeHost {
        applied: Mutex<Vec<ButtonState>>,
        cleared: Mutex<usize>,
        mounted: Mutex<bool>,
        mounts: Mutex<usize>,
    }

    impl SurfaceHost for FakeHost {
        fn apply_state(&self, state: ButtonState) {
            self.applied.lock().push(state);
        }

        fn clear_input(&self) {
            *self.cleared.lock() += 1;
        }

        fn is_mounted(&self) -> bool {
            *self.mounted.lock()
        }

        fn mount(&self) {
            *self.mounted.lock() = true;
            *self.mounts.lock() += 1;
        }
    }

    fn harness() -> (Arc<FakeTransport>, Arc<FakeHost>, ChatSurface) {
        let transport = Arc::new(FakeTransport::default());
        let host = Arc::new(FakeHost {
            mounted: Mutex::new(true),
            ..FakeHost::default()
        });
        let bridge = Bridge::new(Arc::clone(&transport) as Arc<dyn Transport>);
        let surface = ChatSurface::new(bridge, Arc::clone(&host) as Arc<dyn SurfaceHost>);
        (transport, host, surface)
    }

    async fn settle() {
        for _ in 0..4 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn test_submit_happy_path() {
        let (transport, host, surface) = harness();

        let task = tokio::spawn({
            let surface = surface.clone();
            async move { surface.submit("hello").await }
        });
        settle().await;

        // Sending state applied, input cleared optimistically, chat emitted.
        assert_eq!(surface.state(), ButtonState::Sending);
        assert_eq!(*host.cleared.lock(), 1);
        let emitted = transport.emitted.lock()[0].clone();
        assert_eq!(emitted["type"], "chat");
        assert_eq!(emitted["text"], "hello");
        assert!(emitted["requestId"].is_string());

        let id = transport.emitted_request_id(0);
        transport.respond(json!({"requestId": id, "type": "chat/ok"}));
        task.await.expect("join").expect("submit");

        assert_eq!(surface.state(), ButtonState::Sent);
        assert_eq!(
            host.applied.lock().as_slice(),
            [ButtonState::Sending, ButtonState::Sent]
        );
    }

    #[tokio::test]
    async fn test_stale_completion_does_not_clobber_newer_state() {
        let (transport, host, surface) = harness();

        let task = tokio::spawn({
            let surface = surface.clone();
            async move { surface.submit("hello").await }
        });
        settle().await;

        // A poll tick disables the control while the send is in flight.
        surface.set_send_enabled(false);
        assert_eq!(surface.state(), ButtonState::Waiting);

        let id = transport.emitted_request_id(0);
        transport.respond(json!({"requestId": id, "type": "chat/ok"}));
        task.await.expect("join").expect("submit");

        // The late success must not force the button back to sent.
        assert_eq!(surface.state(), ButtonState::Waiting);
        assert!(!host.applied.lock().contains(&ButtonState::Sent));
    }

    #[tokio::test]
    async fn test_failure_reverts_to_ready() {
        let (transport, _host, surface) = harness();

        let task = tokio::spawn({
            let surface = surface.clone();
            async move { surface.submit("hello").await }
        });
        settle().await;

        let id = transport.emitted_request_id(0);
        transport.respond(json!({"requestId": id, "type": "chat/error", "message": "busy"}));

        let err = task.await.expect("join").expect_err("must fail");
        assert!(err.is_remote());
        assert_eq!(surface.state(), ButtonState::Ready);
    }

    #[tokio::test]
    async fn test_empty_and_reentrant_submits_are_ignored() {
        let (transport, _host, surface) = harness();

        surface.submit("   ").await.expect("no-op");
        assert!(transport.emitted.lock().is_empty());

        let task = tokio::spawn({
            let surface = surface.clone();
            async move { surface.submit("first").await }
        });
        settle().await;

        // Second submit while sending: ignored, nothing emitted.
        surface.submit("second").await.expect("no-op");
        assert_eq!(transport.emitted.lock().len(), 1);

        let id = transport.emitted_request_id(0);
        transport.respond(json!({"requestId": id, "type": "chat/ok"}));
        task.await.expect("join").expect("submit");
    }

    #[tokio::test]
    async fn test_enable_signal_mapping() {
        let (_transport, _host, surface) = harness();

        surface.set_send_enabled(false);
        assert_eq!(surface.state(), ButtonState::Waiting);

        surface.set_send_enabled(true);
        assert_eq!(surface.state(), ButtonState::Ready);
    }

    /// Transport that answers every emitted request synchronously, so
    /// both the checker's polls and the submit path complete in-line.
    #[derive(Default)]
    struct AutoTransport {
        emitted: Mutex<Vec<Value>>,
        handler: Mutex<Option<ResponseHandler>>,
    }

    impl AutoTransport {
        fn call_count(&self) -> usize {
            self.emitted
                .lock()
                .iter()
                .filter(|m| m["type"] == "call")
                .count()
        }
    }

    impl Transport for AutoTransport {
        fn emit(&self, message: Value) {
            let id = message["requestId"].as_str().map(str::to_string);
            let kind = message["type"].as_str().unwrap_or_default().to_string();
            self.emitted.lock().push(message);

            if let (Some(id), Some(handler)) = (id, self.handler.lock().clone()) {
                let reply = match kind.as_str() {
                    "call" => json!({"requestId": id, "type": "call/ok", "value": true}),
                    _ => json!({"requestId": id, "type": "chat/ok"}),
                };
                handler(InboundFrame::Structured(reply));
            }
        }

        fn on_response(&self, handler: ResponseHandler) {
            *self.handler.lock() = Some(handler);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_successful_submit_delays_next_capability_poll() {
        let transport = Arc::new(AutoTransport::default());
        let bridge = Bridge::new(Arc::clone(&transport) as Arc<dyn Transport>);
        let checker = Arc::new(StateChecker::new());
        let host = Arc::new(FakeHost {
            mounted: Mutex::new(true),
            ..FakeHost::default()
        });
        let surface = ChatSurface::with_checker(
            bridge.clone(),
            Arc::clone(&host) as Arc<dyn SurfaceHost>,
            Arc::clone(&checker),
        );

        checker.init(bridge, Arc::new(|_: bool| {})).expect("init");

        // Just before the first scheduled poll, a send completes and
        // pushes the deadline forward.
        tokio::time::sleep(Duration::from_millis(900)).await;
        assert_eq!(transport.call_count(), 0);
        surface.submit("hello").await.expect("submit");
        assert_eq!(surface.state(), ButtonState::Sent);

        // The poll that was due at the interval boundary must not fire.
        tokio::time::sleep(Duration::from_millis(400)).await;
        assert_eq!(transport.call_count(), 0);

        // Past the pushed deadline, polling resumes.
        tokio::time::sleep(Duration::from_millis(900)).await;
        assert!(transport.call_count() >= 1);
    }

    #[tokio::test]
    async fn test_ensure_mounted_is_idempotent() {
        let (_transport, host, surface) = harness();

        surface.set_send_enabled(false);
        *host.mounted.lock() = false;

        surface.ensure_mounted();
        assert_eq!(*host.mounts.lock(), 1);
        // Current state reapplied after the rebuild.
        assert_eq!(host.applied.lock().last(), Some(&ButtonState::Waiting));

        surface.ensure_mounted();
        surface.ensure_mounted();
        assert_eq!(*host.mounts.lock(), 1);
    }
}
