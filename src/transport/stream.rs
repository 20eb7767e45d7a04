//! Layered-stack vendor adapter with response-channel probing.
//!
//! The lower-level streaming SDK exposes its internals as a stack (input
//! handler → data-channel controller → raw data channel), and which
//! response path exists at any moment depends on the SDK's own
//! initialization order. The documented application-level listener is
//! therefore not guaranteed present when this adapter is constructed.
//!
//! The adapter resolves this with an explicit capability-detection step:
//! after a short fixed delay (giving the SDK time to finish its internal
//! wiring) it probes the candidate channels in descending priority and
//! attaches to the best one that exists. When the SDK renegotiates and
//! replaces its data channel, probing is re-run and the attachment
//! re-established.
//!
//! # Candidate channels, descending priority
//!
//! 1. [`ResponseRegistry`]: application-level response listeners
//! 2. [`InputHandler`]: the input layer's listener hook
//! 3. [`MessageRouter`]: the message-router handler slot
//! 4. [`DataChannel`]: raw message interception with byte decoding
//!
//! If none exist, inbound responses are dropped (logged once); outbound
//! emits still work, the channel directions are independent.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::watch;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::error::Result;

use super::decode::decode_frame;
use super::{HandlerSlot, InboundFrame, ResponseHandler, Transport};

// ============================================================================
// Constants
// ============================================================================

/// Delay before probing, letting the SDK finish its internal wiring.
const PROBE_DELAY: Duration = Duration::from_millis(500);

// ============================================================================
// Vendor surface traits
// ============================================================================

/// Text listener registered on a vendor response channel.
pub type TextListener = Box<dyn Fn(String) + Send + Sync>;

/// Outbound interaction path of the stream SDK.
pub trait InteractionEmitter: Send + Sync {
    /// Emits serialized interaction data toward the renderer.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Transport`](crate::Error::Transport) when the
    /// stream rejects the send.
    fn emit_ui_interaction(&self, data: &str) -> Result<()>;
}

/// Application-level response-listener registry.
pub trait ResponseRegistry: Send + Sync {
    /// Adds a listener invoked once per inbound response string.
    fn add_response_listener(&self, listener: TextListener);
}

/// The input layer's response-listener hook.
pub trait InputHandler: Send + Sync {
    /// Adds a listener invoked once per inbound response string.
    fn add_response_listener(&self, listener: TextListener);
}

/// The message router's handler slot.
pub trait MessageRouter: Send + Sync {
    /// Installs the handler for routed response messages.
    fn set_response_handler(&self, handler: TextListener);
}

/// The raw data channel underneath the router.
pub trait DataChannel: Send + Sync {
    /// Installs a sink intercepting raw inbound frames.
    fn set_message_sink(&self, sink: Box<dyn Fn(Vec<u8>) + Send + Sync>);
}

// ============================================================================
// StreamStack
// ============================================================================

/// Handles into the stream SDK's layered internals.
///
/// Every response-side layer is optional; availability depends on
/// initialization order outside this crate's control. `renegotiations`
/// ticks whenever the SDK replaces its data channel.
pub struct StreamStack {
    /// Outbound interaction path; always present.
    pub emitter: Arc<dyn InteractionEmitter>,
    /// Application-level response registry, if already constructed.
    pub responses: Option<Arc<dyn ResponseRegistry>>,
    /// Input-handler layer, if already constructed.
    pub input: Option<Arc<dyn InputHandler>>,
    /// Message router, if already constructed.
    pub router: Option<Arc<dyn MessageRouter>>,
    /// Raw data channel, if already constructed.
    pub channel: Option<Arc<dyn DataChannel>>,
    /// Renegotiation notifications from the SDK.
    pub renegotiations: Option<watch::Receiver<u64>>,
}

impl StreamStack {
    /// Creates a stack with only the outbound path, no response layers.
    #[must_use]
    pub fn emit_only(emitter: Arc<dyn InteractionEmitter>) -> Self {
        Self {
            emitter,
            responses: None,
            input: None,
            router: None,
            channel: None,
            renegotiations: None,
        }
    }
}

// ============================================================================
// ResponseChannel
// ============================================================================

/// The response channel selected by capability detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseChannel {
    /// Application-level response-listener registry.
    Registry,
    /// Input-handler listener.
    Input,
    /// Message-router handler.
    Router,
    /// Raw data-channel interception.
    Raw,
}

impl ResponseChannel {
    /// Probes the stack's layers in descending priority.
    ///
    /// Returns `None` when no response path exists.
    #[must_use]
    pub fn detect(stack: &StreamStack) -> Option<Self> {
        if stack.responses.is_some() {
            Some(Self::Registry)
        } else if stack.input.is_some() {
            Some(Self::Input)
        } else if stack.router.is_some() {
            Some(Self::Router)
        } else if stack.channel.is_some() {
            Some(Self::Raw)
        } else {
            None
        }
    }
}

// ============================================================================
// StreamTransport
// ============================================================================

/// [`Transport`] over a [`StreamStack`].
///
/// Must be constructed inside a tokio runtime: probing runs on a spawned
/// task so construction itself never blocks.
pub struct StreamTransport {
    stack: Arc<StreamStack>,
    slot: HandlerSlot,
    attached: Arc<Mutex<Option<ResponseChannel>>>,
}

impl StreamTransport {
    /// Wraps a stream stack and schedules deferred response probing.
    #[must_use]
    pub fn new(stack: StreamStack) -> Self {
        let stack = Arc::new(stack);
        let slot = HandlerSlot::new();
        let attached = Arc::new(Mutex::new(None));

        tokio::spawn(Self::probe_loop(
            Arc::clone(&stack),
            slot.clone(),
            Arc::clone(&attached),
        ));

        Self {
            stack,
            slot,
            attached,
        }
    }

    /// Returns the channel the adapter is currently attached to.
    #[inline]
    #[must_use]
    pub fn attached_channel(&self) -> Option<ResponseChannel> {
        *self.attached.lock()
    }

    /// Deferred probe, then re-probe on every renegotiation.
    async fn probe_loop(
        stack: Arc<StreamStack>,
        slot: HandlerSlot,
        attached: Arc<Mutex<Option<ResponseChannel>>>,
    ) {
        sleep(PROBE_DELAY).await;
        Self::attach(&stack, &slot, &attached);

        let Some(mut renegotiations) = stack.renegotiations.clone() else {
            return;
        };
        while renegotiations.changed().await.is_ok() {
            debug!("Data channel renegotiated, re-probing response path");
            sleep(PROBE_DELAY).await;
            Self::attach(&stack, &slot, &attached);
        }
    }

    /// Detects and attaches to the best available response channel.
    ///
    /// Attaching twice to the same layer is harmless: duplicate
    /// deliveries fail correlation and are dropped by the bridge.
    fn attach(stack: &StreamStack, slot: &HandlerSlot, attached: &Mutex<Option<ResponseChannel>>) {
        let Some(channel) = ResponseChannel::detect(stack) else {
            warn!("No response channel discoverable; inbound responses will be dropped");
            *attached.lock() = None;
            return;
        };

        let forward = slot.clone();
        match channel {
            ResponseChannel::Registry => {
                if let Some(responses) = &stack.responses {
                    responses.add_response_listener(Box::new(move |text| {
                        forward.deliver(InboundFrame::Text(text));
                    }));
                }
            }
            ResponseChannel::Input => {
                if let Some(input) = &stack.input {
                    input.add_response_listener(Box::new(move |text| {
                        forward.deliver(InboundFrame::Text(text));
                    }));
                }
            }
            ResponseChannel::Router => {
                if let Some(router) = &stack.router {
                    router.set_response_handler(Box::new(move |text| {
                        forward.deliver(InboundFrame::Text(text));
                    }));
                }
            }
            ResponseChannel::Raw => {
                if let Some(data_channel) = &stack.channel {
                    data_channel.set_message_sink(Box::new(move |bytes| {
                        match decode_frame(&bytes) {
                            Some(text) => forward.deliver(InboundFrame::Text(text)),
                            None => warn!(len = bytes.len(), "Dropped undecodable frame"),
                        }
                    }));
                }
            }
        }

        debug!(?channel, "Attached to response channel");
        *attached.lock() = Some(channel);
    }
}

impl Transport for StreamTransport {
    fn emit(&self, message: Value) {
        let data = match serde_json::to_string(&message) {
            Ok(data) => data,
            Err(e) => {
                warn!(error = %e, "Unserializable interaction, message dropped");
                return;
            }
        };
        if let Err(e) = self.stack.emitter.emit_ui_interaction(&data) {
            warn!(error = %e, "Stream emit rejected, message dropped");
        }
    }

    fn on_response(&self, handler: ResponseHandler) {
        self.slot.set(handler);
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;

    #[derive(Default)]
    struct FakeEmitter {
        emitted: Mutex<Vec<String>>,
    }

    impl InteractionEmitter for FakeEmitter {
        fn emit_ui_interaction(&self, data: &str) -> Result<()> {
            self.emitted.lock().push(data.to_string());
            Ok(())
        }
    }

    #[derive(Default)]
    struct FakeRegistry {
        listeners: Mutex<Vec<TextListener>>,
    }

    impl FakeRegistry {
        fn push(&self, text: &str) {
            for listener in self.listeners.lock().iter() {
                listener(text.to_string());
            }
        }
    }

    impl ResponseRegistry for FakeRegistry {
        fn add_response_listener(&self, listener: TextListener) {
            self.listeners.lock().push(listener);
        }
    }

    #[derive(Default)]
    struct FakeChannel {
        sink: Mutex<Option<Box<dyn Fn(Vec<u8>) + Send + Sync>>>,
        installs: Mutex<usize>,
    }

    impl FakeChannel {
        fn push(&self, bytes: &[u8]) {
            if let Some(sink) = &*self.sink.lock() {
                sink(bytes.to_vec());
            }
        }
    }

    impl DataChannel for FakeChannel {
        fn set_message_sink(&self, sink: Box<dyn Fn(Vec<u8>) + Send + Sync>) {
            *self.installs.lock() += 1;
            *self.sink.lock() = Some(sink);
        }
    }

    fn collected() -> (ResponseHandler, Arc<Mutex<Vec<String>>>) {
        let seen: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = Arc::clone(&seen);
        let handler: ResponseHandler = Arc::new(move |frame| {
            if let InboundFrame::Text(text) = frame {
                seen_clone.lock().push(text);
            }
        });
        (handler, seen)
    }

    #[test]
    fn test_detection_priority() {
        let emitter: Arc<dyn InteractionEmitter> = Arc::new(FakeEmitter::default());

        let mut stack = StreamStack::emit_only(Arc::clone(&emitter));
        assert_eq!(ResponseChannel::detect(&stack), None);

        stack.channel = Some(Arc::new(FakeChannel::default()));
        assert_eq!(ResponseChannel::detect(&stack), Some(ResponseChannel::Raw));

        stack.responses = Some(Arc::new(FakeRegistry::default()));
        assert_eq!(
            ResponseChannel::detect(&stack),
            Some(ResponseChannel::Registry)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_probe_attaches_to_registry_after_delay() {
        let registry = Arc::new(FakeRegistry::default());
        let mut stack = StreamStack::emit_only(Arc::new(FakeEmitter::default()));
        stack.responses = Some(Arc::clone(&registry) as Arc<dyn ResponseRegistry>);

        let transport = StreamTransport::new(stack);
        let (handler, seen) = collected();
        transport.on_response(handler);

        assert_eq!(transport.attached_channel(), None);

        sleep(PROBE_DELAY * 2).await;
        assert_eq!(transport.attached_channel(), Some(ResponseChannel::Registry));

        registry.push(r#"{"requestId":"r1","type":"x/ok"}"#);
        assert_eq!(seen.lock().as_slice(), [r#"{"requestId":"r1","type":"x/ok"}"#]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_raw_channel_fallback_decodes_bytes() {
        let channel = Arc::new(FakeChannel::default());
        let mut stack = StreamStack::emit_only(Arc::new(FakeEmitter::default()));
        stack.channel = Some(Arc::clone(&channel) as Arc<dyn DataChannel>);

        let transport = StreamTransport::new(stack);
        let (handler, seen) = collected();
        transport.on_response(handler);

        sleep(PROBE_DELAY * 2).await;
        assert_eq!(transport.attached_channel(), Some(ResponseChannel::Raw));

        let utf16: Vec<u8> = r#"{"a":1}"#.encode_utf16().flat_map(u16::to_le_bytes).collect();
        channel.push(&utf16);
        channel.push(br#"{"b":2}"#);
        assert_eq!(seen.lock().as_slice(), [r#"{"a":1}"#, r#"{"b":2}"#]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rehook_on_renegotiation() {
        let channel = Arc::new(FakeChannel::default());
        let (tx, rx) = watch::channel(0u64);

        let mut stack = StreamStack::emit_only(Arc::new(FakeEmitter::default()));
        stack.channel = Some(Arc::clone(&channel) as Arc<dyn DataChannel>);
        stack.renegotiations = Some(rx);

        let transport = StreamTransport::new(stack);
        sleep(PROBE_DELAY * 2).await;
        assert_eq!(*channel.installs.lock(), 1);

        // The SDK replaced its data channel; the sink must be reinstalled.
        tx.send(1).expect("watch alive");
        sleep(PROBE_DELAY * 2).await;
        assert_eq!(*channel.installs.lock(), 2);
        assert_eq!(transport.attached_channel(), Some(ResponseChannel::Raw));
    }

    #[tokio::test(start_paused = true)]
    async fn test_emit_works_without_response_channel() {
        let emitter = Arc::new(FakeEmitter::default());
        let stack = StreamStack::emit_only(Arc::clone(&emitter) as Arc<dyn InteractionEmitter>);

        let transport = StreamTransport::new(stack);
        sleep(PROBE_DELAY * 2).await;
        assert_eq!(transport.attached_channel(), None);

        transport.emit(json!({"type": "chat", "text": "hi"}));
        let emitted = emitter.emitted.lock();
        assert_eq!(emitted.len(), 1);
        assert!(emitted[0].contains("\"type\":\"chat\""));
    }
}
