//! Launch parameters, transport selection, and session wiring.
//!
//! The page is launched with a query string that decides which vendor
//! transport carries the session: `shareId` (plus optional `projectId`)
//! selects the managed platform, `epic=1` forces the direct stream stack
//! regardless of `shareId`. When neither is present, deployments have
//! historically disagreed on what to do: hardcode a default session,
//! silently switch vendors, or refuse. The fallback is therefore an
//! explicit [`FallbackPolicy`] instead of replicated accident, and
//! refusing is the default.
//!
//! [`Session::connect`] assembles the running system over a selected
//! transport: bridge, chat surface, and state checker, with the
//! checker's poll result wired to the surface's enable signal.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use tracing::{debug, info};
use url::Url;

use crate::bridge::Bridge;
use crate::checker::{CapabilityProbe, StateChecker};
use crate::error::{Error, Result};
use crate::identifiers::{ProjectId, ShareId};
use crate::surface::{ChatSurface, SurfaceHost};
use crate::transport::Transport;

// ============================================================================
// LaunchParams
// ============================================================================

/// Launch parameters extracted from the page URL.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LaunchParams {
    /// Managed-platform session selector.
    pub share_id: Option<ShareId>,
    /// Optional session sub-selector.
    pub project_id: Option<ProjectId>,
    /// `epic=1`: force the direct stream transport.
    pub force_direct: bool,
}

impl LaunchParams {
    /// Parses launch parameters from a full URL.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Url`] if `url` is not a valid absolute URL.
    pub fn from_url(url: &str) -> Result<Self> {
        let url = Url::parse(url)?;
        Ok(Self::from_query(url.query().unwrap_or_default()))
    }

    /// Parses launch parameters from a bare query string (no leading `?`).
    ///
    /// Unknown parameters are ignored; empty values count as absent.
    #[must_use]
    pub fn from_query(query: &str) -> Self {
        let mut params = Self::default();

        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            match key.as_ref() {
                "shareId" if !value.is_empty() => {
                    params.share_id = Some(ShareId::new(value.into_owned()));
                }
                "projectId" if !value.is_empty() => {
                    params.project_id = Some(ProjectId::new(value.into_owned()));
                }
                "epic" if value == "1" => params.force_direct = true,
                _ => {}
            }
        }

        params
    }
}

// ============================================================================
// FallbackPolicy
// ============================================================================

/// What to do when launch parameters select no session.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum FallbackPolicy {
    /// Refuse with [`Error::MissingSession`].
    #[default]
    Fail,
    /// Use a deployment-configured default managed session.
    DefaultShare(ShareId),
    /// Fall back to the direct stream transport.
    Direct,
}

// ============================================================================
// BootstrapConfig
// ============================================================================

/// Deployment configuration for transport selection.
#[derive(Debug, Clone, Default)]
pub struct BootstrapConfig {
    /// Policy applied when no session selector is present.
    pub fallback: FallbackPolicy,
}

impl BootstrapConfig {
    /// Creates a config with the given fallback policy.
    #[inline]
    #[must_use]
    pub fn with_fallback(fallback: FallbackPolicy) -> Self {
        Self { fallback }
    }
}

// ============================================================================
// TransportKind
// ============================================================================

/// The transport variant selected for a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportKind {
    /// Managed platform session.
    Managed {
        /// Session selector.
        share_id: ShareId,
        /// Optional sub-selector.
        project_id: Option<ProjectId>,
    },
    /// Direct stream stack.
    Direct,
}

/// Selects the transport variant for the given launch parameters.
///
/// `epic=1` wins over `shareId`; `shareId` wins over the fallback.
///
/// # Errors
///
/// Returns [`Error::MissingSession`] when no selector is present and the
/// policy is [`FallbackPolicy::Fail`].
pub fn select_transport(params: &LaunchParams, config: &BootstrapConfig) -> Result<TransportKind> {
    if params.force_direct {
        debug!("Direct transport forced by launch parameter");
        return Ok(TransportKind::Direct);
    }

    if let Some(share_id) = &params.share_id {
        return Ok(TransportKind::Managed {
            share_id: share_id.clone(),
            project_id: params.project_id.clone(),
        });
    }

    match &config.fallback {
        FallbackPolicy::Fail => Err(Error::MissingSession),
        FallbackPolicy::DefaultShare(share_id) => {
            info!(%share_id, "No session selector, using configured default share");
            Ok(TransportKind::Managed {
                share_id: share_id.clone(),
                project_id: params.project_id.clone(),
            })
        }
        FallbackPolicy::Direct => {
            info!("No session selector, falling back to direct transport");
            Ok(TransportKind::Direct)
        }
    }
}

// ============================================================================
// Session
// ============================================================================

/// A wired-up page session: bridge, chat surface, and state checker.
///
/// Owns the checker's lifetime; dropping the session (or calling
/// [`shutdown`](Session::shutdown)) stops polling.
pub struct Session {
    bridge: Bridge,
    surface: ChatSurface,
    checker: Arc<StateChecker>,
}

impl Session {
    /// Connects a session over the given transport, polling the default
    /// capability.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`] if the capability probe cannot be
    /// serialized.
    pub fn connect(transport: Arc<dyn Transport>, host: Arc<dyn SurfaceHost>) -> Result<Self> {
        Self::connect_with_probe(transport, host, CapabilityProbe::default())
    }

    /// Connects a session polling a custom capability.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`] if the capability probe cannot be
    /// serialized.
    pub fn connect_with_probe(
        transport: Arc<dyn Transport>,
        host: Arc<dyn SurfaceHost>,
        probe: CapabilityProbe,
    ) -> Result<Self> {
        let bridge = Bridge::new(transport);
        let checker = Arc::new(StateChecker::with_probe(probe));
        let surface = ChatSurface::with_checker(bridge.clone(), host, Arc::clone(&checker));

        surface.ensure_mounted();

        let enable_target = surface.clone();
        checker.init(
            bridge.clone(),
            Arc::new(move |enabled| enable_target.set_send_enabled(enabled)),
        )?;

        info!("Session connected");
        Ok(Self {
            bridge,
            surface,
            checker,
        })
    }

    /// Returns the session's bridge.
    #[inline]
    #[must_use]
    pub fn bridge(&self) -> &Bridge {
        &self.bridge
    }

    /// Returns the chat surface.
    #[inline]
    #[must_use]
    pub fn surface(&self) -> &ChatSurface {
        &self.surface
    }

    /// Returns the state checker.
    #[inline]
    #[must_use]
    pub fn checker(&self) -> &StateChecker {
        &self.checker
    }

    /// Stops the checker's polling. Idempotent.
    pub fn shutdown(&self) {
        self.checker.stop();
    }
}

// ============================================================================
// Tests
// ============================================================================
