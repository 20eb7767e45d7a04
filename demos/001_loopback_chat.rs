//! End-to-end chat session over an in-process loopback transport.
//!
//! Demonstrates:
//! - Wiring a Session over a ManagedTransport
//! - A ManagedApplication that answers its own emits
//! - Submitting chat text and observing button state changes
//! - The capability poll driving the surface's enable signal
//!
//! Usage:
//!   cargo run --example 001_loopback_chat
//!   cargo run --example 001_loopback_chat -- --debug

mod common;

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use parking_lot::Mutex;
use serde_json::{Value, json};

use common::Args;
use pixelstream_bridge::{
    ButtonState, InboundFrame, ManagedApplication, ManagedTransport, Session, SurfaceHost,
};

// ============================================================================
// Loopback Application
// ============================================================================

/// Managed-platform stand-in that echoes a success response for every
/// correlated emit: `call/ok` with a `true` capability for invocations,
/// `chat/ok` for chat.
#[derive(Default)]
struct LoopbackApp {
    listener: Mutex<Option<Box<dyn Fn(InboundFrame) + Send + Sync>>>,
}

impl ManagedApplication for LoopbackApp {
    fn emit_ui_interaction(&self, data: Value) -> pixelstream_bridge::Result<()> {
        let Some(id) = data["requestId"].as_str() else {
            return Ok(());
        };
        let reply = match data["type"].as_str() {
            Some("call") => json!({"requestId": id, "type": "call/ok", "value": true}),
            _ => json!({"requestId": id, "type": "chat/ok"}),
        };
        if let Some(listener) = &*self.listener.lock() {
            listener(InboundFrame::Structured(reply));
        }
        Ok(())
    }

    fn on_application_response(&self, listener: Box<dyn Fn(InboundFrame) + Send + Sync>) {
        *self.listener.lock() = Some(listener);
    }
}

// ============================================================================
// Console Surface Host
// ============================================================================

/// Surface host that renders state transitions to stdout.
struct ConsoleHost {
    mounted: Mutex<bool>,
}

impl SurfaceHost for ConsoleHost {
    fn apply_state(&self, state: ButtonState) {
        println!("[Surface] state -> {state:?}");
    }

    fn clear_input(&self) {
        println!("[Surface] input cleared");
    }

    fn is_mounted(&self) -> bool {
        *self.mounted.lock()
    }

    fn mount(&self) {
        *self.mounted.lock() = true;
        println!("[Surface] control mounted");
    }
}

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() {
    let args = Args::parse();
    common::init_logging(args.debug);

    if let Err(e) = run().await {
        eprintln!("\n[ERROR] {e:#}");
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    println!("=== 001: Loopback Chat ===\n");

    let app = Arc::new(LoopbackApp::default());
    let transport = Arc::new(ManagedTransport::new(
        Arc::clone(&app) as Arc<dyn ManagedApplication>
    ));
    let host = Arc::new(ConsoleHost {
        mounted: Mutex::new(false),
    });

    let session =
        Session::connect(transport, host).context("failed to wire the loopback session")?;

    // Let a capability poll land and enable the surface.
    tokio::time::sleep(Duration::from_millis(1500)).await;
    println!("\n[Session] state before submit: {:?}", session.surface().state());

    session
        .surface()
        .submit("hello there")
        .await
        .context("chat submit rejected")?;
    println!("[Session] state after submit: {:?}\n", session.surface().state());

    session.shutdown();
    println!("[Session] shut down");
    Ok(())
}
