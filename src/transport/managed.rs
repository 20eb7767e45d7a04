//! Application-level vendor adapter.
//!
//! The managed streaming platform's SDK exposes a ready-made
//! application object with a direct interaction/response pair, so this
//! adapter is a thin passthrough: no probing, no decoding, no deferred
//! wiring.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, warn};

use crate::error::Result;

use super::{HandlerSlot, InboundFrame, ResponseHandler, Transport};

// ============================================================================
// ManagedApplication
// ============================================================================

/// Surface of the managed platform's application object.
///
/// The application object is owned by the embedding page for its whole
/// lifetime; the adapter only borrows it behind an `Arc`.
pub trait ManagedApplication: Send + Sync {
    /// Emits a UI interaction toward the renderer.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Transport`](crate::Error::Transport) when the
    /// platform rejects the send.
    fn emit_ui_interaction(&self, data: Value) -> Result<()>;

    /// Registers the application-level response listener.
    ///
    /// The platform invokes the listener once per inbound response.
    fn on_application_response(&self, listener: Box<dyn Fn(InboundFrame) + Send + Sync>);
}

// ============================================================================
// ManagedTransport
// ============================================================================

/// [`Transport`] over a [`ManagedApplication`].
pub struct ManagedTransport {
    app: Arc<dyn ManagedApplication>,
    slot: HandlerSlot,
}

impl ManagedTransport {
    /// Wraps a managed application object.
    ///
    /// The platform's response listener is wired immediately; frames
    /// arriving before [`Transport::on_response`] are dropped.
    #[must_use]
    pub fn new(app: Arc<dyn ManagedApplication>) -> Self {
        let slot = HandlerSlot::new();

        let forward = slot.clone();
        app.on_application_response(Box::new(move |frame| forward.deliver(frame)));
        debug!("Managed transport wired to application response listener");

        Self { app, slot }
    }
}

impl Transport for ManagedTransport {
    fn emit(&self, message: Value) {
        if let Err(e) = self.app.emit_ui_interaction(message) {
            warn!(error = %e, "Managed emit rejected, message dropped");
        }
    }

    fn on_response(&self, handler: ResponseHandler) {
        self.slot.set(handler);
    }
}

// ============================================================================
// Tests
// ============================================================================
