//! Peer resolution for signaling messages.
//!
//! Resolution order:
//!
//! 1. An explicit `targetId` that is still connected.
//! 2. The sender's peer link, if that peer still holds the opposite role
//!    (and, when it is a host, is still ready).
//! 3. The earliest-registered viewer (for a host sender) or the
//!    earliest-registered ready host (for a viewer sender).
//!
//! A miss is never fatal: the caller logs it and drops the message.

use screenlink_core::{EndpointId, Role};
use thiserror::Error;

use super::registry::Registry;

/// Why no recipient could be found.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RouteMiss {
    /// The sender never registered and named no connected target.
    #[error("sender {0} has no role and no valid target")]
    Unregistered(EndpointId),

    /// No endpoint of the wanted role is available.
    #[error("no {wanted} available for {sender}")]
    NoPeer { sender: EndpointId, wanted: &'static str },
}

/// Picks the recipient of a signaling message from `sender`.
///
/// # Errors
///
/// Returns a [`RouteMiss`] when none of the rules yields a recipient.
pub fn resolve(
    registry: &Registry,
    sender: EndpointId,
    explicit: Option<EndpointId>,
) -> Result<EndpointId, RouteMiss> {
    if let Some(target) = explicit {
        if registry.contains(target) {
            return Ok(target);
        }
        tracing::debug!(%sender, %target, "explicit target not connected; falling back");
    }

    let role = registry.role_of(sender).ok_or(RouteMiss::Unregistered(sender))?;

    if let Some(peer) = registry.peer_of(sender) {
        if acceptable(registry, role, peer) {
            return Ok(peer);
        }
    }

    let found = match role {
        Role::Host => registry.viewers().first().copied(),
        Role::Viewer => registry.ready_hosts().first().copied(),
    };
    found.ok_or(RouteMiss::NoPeer {
        sender,
        wanted: match role {
            Role::Host => "viewer",
            Role::Viewer => "ready host",
        },
    })
}

fn acceptable(registry: &Registry, sender_role: Role, peer: EndpointId) -> bool {
    match sender_role {
        Role::Host => registry.role_of(peer) == Some(Role::Viewer),
        Role::Viewer => registry.is_ready_host(peer),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
