//! Message router: forwards signaling to one peer and control to all hosts.
//!
//! Presence notices are originated by the registry itself; this module only
//! handles traffic that one endpoint addresses to another.

use screenlink_core::protocol::SignalMessage;
use screenlink_core::{ControlAction, EndpointId, ServerMessage};
use tracing::debug;

use super::registry::Registry;
use super::resolver::{resolve, RouteMiss};

/// Forwards an offer, answer or ICE candidate from `sender`.
///
/// The payload is passed through untouched with `fromId` added.  A routed
/// offer or answer records a peer link between sender and recipient.
///
/// Returns the recipient; delivery itself is fire-and-forget.
///
/// # Errors
///
/// Returns a [`RouteMiss`] if no recipient could be resolved.
pub fn route_signal(
    registry: &mut Registry,
    sender: EndpointId,
    signal: SignalMessage,
) -> Result<EndpointId, RouteMiss> {
    let target = resolve(registry, sender, signal.target_id)?;
    let kind = signal.kind;

    let delivered = registry.send_to(target, ServerMessage::signal(kind, signal.payload, sender));
    if delivered && kind.links_peers() {
        registry.link_peers(sender, target);
    }
    debug!(%sender, %target, kind = kind.type_name(), delivered, "signal routed");
    Ok(target)
}

/// Relays one accepted viewer input action to every host.
///
/// Returns how many hosts accepted it.
pub fn relay_control(registry: &Registry, from: EndpointId, action: ControlAction) -> usize {
    registry.broadcast_hosts(ServerMessage::Control {
        from_id: from,
        action,
    })
}
