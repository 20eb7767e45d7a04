//! Request/response correlation bridge.
//!
//! The streaming transports are fire-and-forget: an emit has no return
//! path, and inbound payloads arrive in arbitrary order on a separate
//! listener. This module layers request/response semantics on top with a
//! correlation table: one single-resolution oneshot channel per pending
//! request, keyed by [`RequestId`]. Fixed timeout eviction keeps
//! responses that never arrive from growing the table without bound.
//!
//! # Correlation
//!
//! - An entry is registered *before* the request is emitted, so a
//!   response cannot race the registration.
//! - Arrival order is meaningless; matching is purely by identifier.
//! - An entry leaves the table exactly once: on its first matching
//!   response or on timeout. Each future resolves or rejects exactly
//!   once.
//!
//! Malformed inbound payloads and responses with an unknown or missing
//! `requestId` are logged and dropped; they never resolve, reject, or
//! crash anything.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use serde_json::Value;
use tokio::sync::oneshot;
use tokio::time::timeout;
use tracing::{debug, trace, warn};

use crate::error::{Error, Result};
use crate::identifiers::RequestId;
use crate::protocol::{Outcome, classify};
use crate::transport::{InboundFrame, Transport};

// ============================================================================
// Constants
// ============================================================================

/// Default timeout for a correlated request.
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

// ============================================================================
// Types
// ============================================================================

/// Map of request IDs to response channels.
type PendingMap = FxHashMap<RequestId, oneshot::Sender<Value>>;

// ============================================================================
// Bridge
// ============================================================================

/// Correlated messaging over a fire-and-forget [`Transport`].
///
/// # Thread Safety
///
/// `Bridge` is `Send + Sync` and cheap to clone; clones share the same
/// transport and pending-request table.
pub struct Bridge {
    /// Transport adapter, owned exclusively by this bridge.
    transport: Arc<dyn Transport>,
    /// Pending-request table (shared with the inbound handler).
    pending: Arc<Mutex<PendingMap>>,
    /// Per-request response timeout.
    request_timeout: Duration,
}

impl Clone for Bridge {
    fn clone(&self) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
            pending: Arc::clone(&self.pending),
            request_timeout: self.request_timeout,
        }
    }
}

impl Bridge {
    /// Creates a bridge over the given transport with the default
    /// request timeout (10 s).
    ///
    /// Registers the bridge's inbound handler on the transport,
    /// replacing any previously registered handler.
    #[must_use]
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self::with_timeout(transport, DEFAULT_REQUEST_TIMEOUT)
    }

    /// Creates a bridge with a custom request timeout.
    #[must_use]
    pub fn with_timeout(transport: Arc<dyn Transport>, request_timeout: Duration) -> Self {
        let pending: Arc<Mutex<PendingMap>> = Arc::new(Mutex::new(PendingMap::default()));

        let pending_clone = Arc::clone(&pending);
        transport.on_response(Arc::new(move |frame| {
            Self::handle_inbound(frame, &pending_clone);
        }));

        Self {
            transport,
            pending,
            request_timeout,
        }
    }

    /// Emits a message with no expectation of a reply.
    pub fn send(&self, message: Value) {
        self.transport.emit(message);
    }

    /// Emits a request and awaits its correlated response.
    ///
    /// A fresh correlation identifier is merged into `payload`; all
    /// original keys are preserved. A pre-existing `requestId` key is a
    /// caller error and is overwritten (logged).
    ///
    /// Resolution follows the response envelope's signal: success
    /// envelopes resolve with the extracted payload, failure envelopes
    /// reject with the remote error text, and envelopes carrying no
    /// recognized signal resolve with the raw envelope.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidArgument`] if `payload` is not a JSON object
    /// - [`Error::Remote`] if the response signals failure
    /// - [`Error::RequestTimeout`] if no response arrives in time
    /// - [`Error::BridgeClosed`] if the pending channel is torn down
    pub async fn request(&self, payload: Value) -> Result<Value> {
        let Value::Object(mut fields) = payload else {
            return Err(Error::invalid_argument("request payload must be a JSON object"));
        };

        let request_id = RequestId::generate();
        if fields.contains_key("requestId") {
            warn!(%request_id, "Caller-supplied requestId overwritten");
        }
        fields.insert("requestId".to_string(), Value::String(request_id.to_string()));

        // Register before emitting so the response cannot race us.
        let (response_tx, response_rx) = oneshot::channel();
        self.pending.lock().insert(request_id, response_tx);
        self.transport.emit(Value::Object(fields));
        trace!(%request_id, "Request emitted");

        let envelope = match timeout(self.request_timeout, response_rx).await {
            Ok(Ok(envelope)) => envelope,
            Ok(Err(_)) => return Err(Error::BridgeClosed),
            Err(_) => {
                // Evict so the table cannot leak; a late response is
                // then dropped as unmatched.
                self.pending.lock().remove(&request_id);
                return Err(Error::request_timeout(
                    request_id,
                    self.request_timeout.as_millis() as u64,
                ));
            }
        };

        match classify(&envelope) {
            Outcome::Success(value) => Ok(value),
            Outcome::Failure(message) => Err(Error::remote(message)),
            Outcome::Ambiguous => Ok(envelope),
        }
    }

    /// Returns the number of pending requests.
    #[inline]
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.pending.lock().len()
    }

    /// Parses an inbound frame and resolves the matching pending entry.
    fn handle_inbound(frame: InboundFrame, pending: &Mutex<PendingMap>) {
        let envelope = match frame {
            InboundFrame::Structured(value) => value,
            InboundFrame::Text(text) => match serde_json::from_str::<Value>(&text) {
                Ok(value) => value,
                Err(e) => {
                    warn!(error = %e, "Malformed inbound payload dropped");
                    return;
                }
            },
        };

        let Some(raw_id) = envelope.get("requestId").and_then(Value::as_str) else {
            debug!("Inbound payload without requestId dropped");
            return;
        };
        let Some(request_id) = RequestId::parse(raw_id) else {
            warn!(raw_id, "Inbound requestId not issued by this bridge, dropped");
            return;
        };

        let tx = pending.lock().remove(&request_id);
        match tx {
            Some(tx) => {
                let _ = tx.send(envelope);
            }
            None => warn!(%request_id, "Response for unknown request dropped"),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
