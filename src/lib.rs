//! Pixel-stream bridge - correlated messaging with a remote-rendered avatar.
//!
//! This library lets an embedding page exchange structured, correlated
//! messages with a remote-rendered application over the fire-and-forget
//! data channel of a streaming vendor SDK, and drives the chat control
//! that sits on top of it.
//!
//! # Architecture
//!
//! The transport is unreliable in shape, not in delivery: each vendor
//! SDK exposes different send/receive primitives, and the lower-level
//! SDK does not even guarantee which of its response channels exist at
//! construction time. Everything above the adapters is vendor-agnostic:
//!
//! - [`Transport`] adapters normalize a vendor surface into emit +
//!   subscribe ([`ManagedTransport`], [`StreamTransport`])
//! - [`Bridge`] adds request/response correlation with timeout eviction
//! - [`StateChecker`] polls the remote "can accept input" capability
//! - [`ChatSurface`] runs the submit-control state machine
//! - [`bootstrap`] selects the transport from launch parameters and
//!   wires a [`Session`] together
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use pixelstream_bridge::{
//!     BootstrapConfig, LaunchParams, ManagedApplication, ManagedTransport, Result, Session,
//!     SurfaceHost, select_transport,
//! };
//!
//! # async fn example(
//! #     app: Arc<dyn ManagedApplication>,
//! #     host: Arc<dyn SurfaceHost>,
//! # ) -> Result<()> {
//! let params = LaunchParams::from_url("https://avatar.example/play?shareId=share-abc")?;
//! let kind = select_transport(&params, &BootstrapConfig::default())?;
//! println!("selected transport: {kind:?}");
//!
//! let transport = Arc::new(ManagedTransport::new(app));
//! let session = Session::connect(transport, host)?;
//!
//! session.surface().submit("hello there").await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`bootstrap`] | Launch parameters, transport selection, session wiring |
//! | [`bridge`] | Request/response correlation over a transport |
//! | [`checker`] | Periodic remote-capability polling |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`identifiers`] | Type-safe ID wrappers |
//! | [`protocol`] | Message envelope and response classification |
//! | [`surface`] | Chat submit-control state machine |
//! | [`transport`] | Vendor transport adapters |

// ============================================================================
// Modules
// ============================================================================

/// Launch parameters, transport selection, and session wiring.
pub mod bootstrap;

/// Request/response correlation over a fire-and-forget transport.
pub mod bridge;

/// Periodic remote-capability polling.
pub mod checker;

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Type-safe identifiers.
///
/// Newtype wrappers prevent mixing incompatible IDs at compile time.
pub mod identifiers;

/// Wire-format message types.
pub mod protocol;

/// Chat submit control.
pub mod surface;

/// Streaming transport layer.
pub mod transport;

// ============================================================================
// Re-exports
// ============================================================================

// Bootstrap types
pub use bootstrap::{
    BootstrapConfig, FallbackPolicy, LaunchParams, Session, TransportKind, select_transport,
};

// Bridge types
pub use bridge::Bridge;

// Checker types
pub use checker::{CapabilityProbe, EnabledCallback, StateChecker};

// Error types
pub use error::{Error, Result};

// Identifier types
pub use identifiers::{ProjectId, RequestId, ShareId};

// Protocol types
pub use protocol::{Envelope, Outcome, Target, TargetBy};

// Surface types
pub use surface::{ButtonState, ChatSurface, SurfaceHost};

// Transport types
pub use transport::{
    InboundFrame, ManagedApplication, ManagedTransport, ResponseHandler, StreamStack,
    StreamTransport, Transport,
};
