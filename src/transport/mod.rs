//! Streaming transport layer.
//!
//! This module normalizes the two supported vendor streaming SDKs into a
//! single fire-and-forget [`Transport`] capability: emit a message toward
//! the remote renderer, and subscribe to whatever inbound payloads the
//! vendor surface produces.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐   emit / on_response   ┌─────────────────────┐
//! │    Bridge    │◄──────────────────────►│  Transport adapter  │
//! └──────────────┘                        │  managed | stream   │
//!                                         └──────────┬──────────┘
//!                                                    │ vendor SDK surface
//!                                         ┌──────────▼──────────┐
//!                                         │   remote renderer   │
//!                                         └─────────────────────┘
//! ```
//!
//! The managed adapter wraps a platform whose SDK exposes an
//! application-level interaction/response pair. The stream adapter wraps
//! a lower-level SDK whose response path must be capability-detected
//! among several candidate channels, because which layers exist depends
//! on the SDK's own initialization order.
//!
//! # Failure model
//!
//! `emit` never propagates failure: a transport that rejects a send logs
//! the rejection and drops the message. A transport with no discoverable
//! response channel drops inbound responses silently; the caller observes
//! this only as request timeouts.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `managed` | Application-level vendor adapter |
//! | `stream` | Layered-stack vendor adapter with channel probing |
//! | `decode` | Data-channel byte decoding (UTF-8 / UTF-16) |

// ============================================================================
// Submodules
// ============================================================================

/// Application-level vendor adapter.
pub mod managed;

/// Layered-stack vendor adapter with response-channel probing.
pub mod stream;

/// Data-channel byte decoding.
pub mod decode;

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value;
use tracing::trace;

// ============================================================================
// Re-exports
// ============================================================================

pub use managed::{ManagedApplication, ManagedTransport};
pub use stream::{
    DataChannel, InputHandler, InteractionEmitter, MessageRouter, ResponseChannel,
    ResponseRegistry, StreamStack, StreamTransport,
};

// ============================================================================
// Types
// ============================================================================

/// Callback receiving raw inbound payloads from a transport.
pub type ResponseHandler = Arc<dyn Fn(InboundFrame) + Send + Sync>;

/// A raw inbound payload prior to envelope parsing.
///
/// Vendor surfaces deliver either an already-structured value or text
/// that still requires JSON parsing; adapters decode raw bytes into
/// [`InboundFrame::Text`] before forwarding.
#[derive(Debug, Clone)]
pub enum InboundFrame {
    /// A structured value delivered by an application-level surface.
    Structured(Value),
    /// Text requiring JSON parsing.
    Text(String),
}

// ============================================================================
// Transport
// ============================================================================

/// Uniform two-method capability over a vendor streaming SDK.
///
/// Both directions are independent: a transport whose response path was
/// never discovered still accepts outbound emits.
pub trait Transport: Send + Sync {
    /// Emits a message toward the remote renderer, fire-and-forget.
    ///
    /// Never panics or propagates failure for a well-formed message;
    /// vendor rejections are logged and the message is dropped.
    fn emit(&self, message: Value);

    /// Registers the handler receiving inbound payloads.
    ///
    /// Replaces any previously registered handler.
    fn on_response(&self, handler: ResponseHandler);
}

// ============================================================================
// HandlerSlot
// ============================================================================

/// Shared slot holding the currently registered response handler.
///
/// Vendor listener closures capture a clone of the slot, so a handler
/// registered after the vendor wiring completed still receives frames.
#[derive(Clone, Default)]
pub(crate) struct HandlerSlot {
    handler: Arc<Mutex<Option<ResponseHandler>>>,
}

impl HandlerSlot {
    /// Creates an empty slot.
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Installs a handler, replacing any previous one.
    pub(crate) fn set(&self, handler: ResponseHandler) {
        *self.handler.lock() = Some(handler);
    }

    /// Delivers a frame to the registered handler, if any.
    ///
    /// Frames arriving before a handler is registered are dropped.
    pub(crate) fn deliver(&self, frame: InboundFrame) {
        let handler = self.handler.lock().clone();
        match handler {
            Some(handler) => handler(frame),
            None => trace!("Inbound frame before handler registration, dropped"),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
