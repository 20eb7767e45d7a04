//! Wire-format message types.
//!
//! This module defines the JSON envelope exchanged with the remote
//! renderer over the streaming data channel, and the classification of
//! inbound response envelopes.
//!
//! # Protocol Overview
//!
//! | Message | Direction | Purpose |
//! |---------|-----------|---------|
//! | `{"type":"chat", "text":…}` | Local → Remote | Chat text for the avatar |
//! | `{"type":"call", "target":…, "component":…, "method":…}` | Local → Remote | Remote capability invocation |
//! | `{"type":"<domain>/ok", …}` | Remote → Local | Success response |
//! | `{"type":"<domain>/error", …}` | Remote → Local | Failure response |
//!
//! A `requestId` field is present on exactly the messages that expect a
//! correlated response; the remote side echoes it back verbatim.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `envelope` | Outbound envelope construction and addressing |
//! | `outcome` | Inbound response classification |

// ============================================================================
// Submodules
// ============================================================================

/// Outbound envelope construction and remote addressing.
pub mod envelope;

/// Inbound response classification.
pub mod outcome;

// ============================================================================
// Re-exports
// ============================================================================

pub use envelope::{Envelope, Target, TargetBy};
pub use outcome::{Outcome, classify, truthy};
