//! Message types for the signaling and control protocol.
//!
//! Every text frame is a flat JSON object whose `"type"` field names the
//! variant; all other fields sit next to it:
//!
//! ```json
//! {"type":"register","role":"viewer"}
//! {"type":"offer","offer":{"type":"offer","sdp":"v=0..."},"targetId":2}
//! {"type":"control","action":"mousemove","x":0.25,"y":0.5}
//! ```
//!
//! # Why separate inbound and outbound types?
//!
//! Endpoints *send* requests (register, host-ready, offer, control, ...) and
//! the relay *sends* notices (registered, host-available, ...).  Two distinct
//! types make it a compile-time error to relay a request back out verbatim
//! or to accept a server-only notice from a client.
//!
//! Inbound messages are decoded by [`crate::protocol::codec::parse_client_message`],
//! which dispatches on the discriminant by hand so that an unknown `type`
//! surfaces as its own error instead of a generic deserialization failure.

use serde::de::Deserializer;
use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;

use crate::domain::endpoint::{EndpointId, Role};

// ── Opaque payloads ───────────────────────────────────────────────────────────

/// A session description or ICE candidate the relay forwards without looking
/// inside.
///
/// The original JSON text is kept verbatim and re-emitted byte-for-byte.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OpaquePayload(Box<RawValue>);

impl OpaquePayload {
    /// Wraps a JSON fragment.
    ///
    /// # Errors
    ///
    /// Returns the `serde_json` error when `json` is not a single valid JSON
    /// value.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        RawValue::from_string(json.to_owned()).map(Self)
    }

    /// Returns the payload exactly as it was received.
    pub fn get(&self) -> &str {
        self.0.get()
    }
}

impl PartialEq for OpaquePayload {
    fn eq(&self, other: &Self) -> bool {
        self.get() == other.get()
    }
}

/// Deserializes a present field (including an explicit `null`) as `Some`.
///
/// Paired with `#[serde(default)]` so a *missing* field stays `None`, which
/// lets the codec tell "no candidate" apart from a browser's end-of-candidates
/// `null`.
pub(crate) fn present_payload<'de, D>(deserializer: D) -> Result<Option<OpaquePayload>, D::Error>
where
    D: Deserializer<'de>,
{
    OpaquePayload::deserialize(deserializer).map(Some)
}

// ── Signaling kinds ───────────────────────────────────────────────────────────

/// The three session-negotiation messages the relay forwards between peers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignalKind {
    Offer,
    Answer,
    IceCandidate,
}

impl SignalKind {
    /// The `type` discriminant on the wire.
    pub fn type_name(self) -> &'static str {
        match self {
            SignalKind::Offer => "offer",
            SignalKind::Answer => "answer",
            SignalKind::IceCandidate => "ice-candidate",
        }
    }

    /// The name of the field carrying the opaque payload.
    pub fn payload_field(self) -> &'static str {
        match self {
            SignalKind::Offer => "offer",
            SignalKind::Answer => "answer",
            SignalKind::IceCandidate => "candidate",
        }
    }

    /// Whether successful routing of this kind records a peer link.
    pub fn links_peers(self) -> bool {
        matches!(self, SignalKind::Offer | SignalKind::Answer)
    }
}

/// An inbound offer, answer, or ICE candidate.
#[derive(Debug, Clone, PartialEq)]
pub struct SignalMessage {
    pub kind: SignalKind,
    pub payload: OpaquePayload,
    /// Explicit recipient; `None` falls back to peer discovery.
    pub target_id: Option<EndpointId>,
}

// ── Control actions ───────────────────────────────────────────────────────────

/// Which mouse button a press/release refers to.
///
/// Accepts either the names `"left" | "middle" | "right"` or the DOM
/// `MouseEvent.button` indices `0 | 1 | 2`.  Always serialized by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "ButtonRepr")]
pub enum PointerButton {
    #[default]
    Left,
    Middle,
    Right,
}

impl PointerButton {
    /// The actuator-facing button name.
    pub fn as_str(self) -> &'static str {
        match self {
            PointerButton::Left => "left",
            PointerButton::Middle => "middle",
            PointerButton::Right => "right",
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ButtonRepr {
    Index(u8),
    Name(String),
}

impl TryFrom<ButtonRepr> for PointerButton {
    type Error = String;

    fn try_from(repr: ButtonRepr) -> Result<Self, Self::Error> {
        match repr {
            ButtonRepr::Index(0) => Ok(PointerButton::Left),
            ButtonRepr::Index(1) => Ok(PointerButton::Middle),
            ButtonRepr::Index(2) => Ok(PointerButton::Right),
            ButtonRepr::Index(n) => Err(format!("unsupported mouse button index {n}")),
            ButtonRepr::Name(name) => match name.as_str() {
                "left" => Ok(PointerButton::Left),
                "middle" => Ok(PointerButton::Middle),
                "right" => Ok(PointerButton::Right),
                other => Err(format!("unsupported mouse button '{other}'")),
            },
        }
    }
}

fn is_false(v: &bool) -> bool {
    !*v
}

fn is_zero(v: &f64) -> bool {
    *v == 0.0
}

fn is_left(b: &PointerButton) -> bool {
    *b == PointerButton::Left
}

/// Pointer position update.
///
/// `x`/`y` are normalized to the shared video surface.  When `relative` is
/// set, `delta_x`/`delta_y` are device-pixel deltas applied to the last known
/// absolute position instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PointerMotion {
    pub x: f64,
    pub y: f64,
    #[serde(default, skip_serializing_if = "is_false")]
    pub relative: bool,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub delta_x: f64,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub delta_y: f64,
}

impl PointerMotion {
    /// An absolute move to normalized `(x, y)`.
    pub fn absolute(x: f64, y: f64) -> Self {
        Self {
            x,
            y,
            relative: false,
            delta_x: 0.0,
            delta_y: 0.0,
        }
    }
}

/// A mouse button transition at a normalized position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointerPress {
    pub x: f64,
    pub y: f64,
    #[serde(default, skip_serializing_if = "is_left")]
    pub button: PointerButton,
}

/// A wheel scroll.  `mode` follows DOM `WheelEvent.deltaMode`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WheelScroll {
    pub x: f64,
    pub y: f64,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub delta_x: f64,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub delta_y: f64,
    #[serde(default, alias = "deltaMode", skip_serializing_if = "Option::is_none")]
    pub mode: Option<u8>,
}

/// A keyboard transition as reported by a DOM `KeyboardEvent`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyStroke {
    pub key: String,
    #[serde(default)]
    pub code: String,
    #[serde(default, skip_serializing_if = "is_false")]
    pub shift_key: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub ctrl_key: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub alt_key: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub meta_key: bool,
}

/// One viewer input action carried by a `control` envelope.
///
/// Serializes with only the fields relevant to its action, which is the
/// minimized payload relayed to hosts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum ControlAction {
    MouseMove(PointerMotion),
    MouseDown(PointerPress),
    MouseUp(PointerPress),
    Click(PointerPress),
    RightClick(PointerPress),
    Wheel(WheelScroll),
    KeyDown(KeyStroke),
    KeyUp(KeyStroke),
    /// The viewer's input surface lost focus; anything held must be released.
    Blur,
}

impl ControlAction {
    /// The wire name of the action, for log lines.
    pub fn name(&self) -> &'static str {
        match self {
            ControlAction::MouseMove(_) => "mousemove",
            ControlAction::MouseDown(_) => "mousedown",
            ControlAction::MouseUp(_) => "mouseup",
            ControlAction::Click(_) => "click",
            ControlAction::RightClick(_) => "rightclick",
            ControlAction::Wheel(_) => "wheel",
            ControlAction::KeyDown(_) => "keydown",
            ControlAction::KeyUp(_) => "keyup",
            ControlAction::Blur => "blur",
        }
    }
}

/// An inbound `control` envelope.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ControlEnvelope {
    #[serde(flatten)]
    pub action: ControlAction,
    /// Accepted for compatibility; control is always relayed to every host.
    #[serde(default)]
    pub target_id: Option<EndpointId>,
}

// ── Endpoint → relay ──────────────────────────────────────────────────────────

/// All messages an endpoint can send to the relay over a text frame.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientMessage {
    /// Classify this endpoint.  Allowed once per connection.
    Register { role: Role },
    /// A host started streaming.
    HostReady,
    /// A host stopped streaming.
    HostStopped,
    /// Offer, answer, or ICE candidate for a peer.
    Signal(SignalMessage),
    /// Viewer input.
    Control(ControlEnvelope),
}

impl ClientMessage {
    /// Returns the wire discriminant, for log lines that must not echo
    /// payloads.
    pub fn type_name(&self) -> &'static str {
        match self {
            ClientMessage::Register { .. } => "register",
            ClientMessage::HostReady => "host-ready",
            ClientMessage::HostStopped => "host-stopped",
            ClientMessage::Signal(signal) => signal.kind.type_name(),
            ClientMessage::Control(_) => "control",
        }
    }
}

// ── Relay → endpoint ──────────────────────────────────────────────────────────

/// All messages the relay sends to endpoints.
///
/// # Serde representation
///
/// ```json
/// {"type":"registered","clientId":1,"role":"host"}
/// {"type":"host-available","hostId":1}
/// {"type":"offer","offer":"SDP-A","fromId":1}
/// {"type":"control","fromId":2,"action":"wheel","x":0.5,"y":0.5,"deltaY":120.0}
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum ServerMessage {
    /// Acknowledges a `register`.
    Registered { client_id: EndpointId, role: Role },
    /// A ready host can be negotiated with.
    HostAvailable { host_id: EndpointId },
    /// Sent to a ready host for each viewer that can reach it.
    ClientJoined { client_id: EndpointId },
    /// A host stopped streaming but is still connected.  Carries the host
    /// id, like `host-disconnected`.
    HostStopped { host_id: EndpointId },
    /// A ready host's connection went away.
    HostDisconnected { host_id: EndpointId },
    /// The relay is terminating; the connection will close next.
    ServerShutdown,
    Offer {
        offer: OpaquePayload,
        from_id: EndpointId,
    },
    Answer {
        answer: OpaquePayload,
        from_id: EndpointId,
    },
    IceCandidate {
        candidate: OpaquePayload,
        from_id: EndpointId,
    },
    /// Viewer input relayed to a host.
    Control {
        from_id: EndpointId,
        #[serde(flatten)]
        action: ControlAction,
    },
}

impl ServerMessage {
    /// Builds the forwarded form of a signaling message.
    pub fn signal(kind: SignalKind, payload: OpaquePayload, from_id: EndpointId) -> Self {
        match kind {
            SignalKind::Offer => ServerMessage::Offer {
                offer: payload,
                from_id,
            },
            SignalKind::Answer => ServerMessage::Answer {
                answer: payload,
                from_id,
            },
            SignalKind::IceCandidate => ServerMessage::IceCandidate {
                candidate: payload,
                from_id,
            },
        }
    }

    /// Returns the wire discriminant.
    pub fn type_name(&self) -> &'static str {
        match self {
            ServerMessage::Registered { .. } => "registered",
            ServerMessage::HostAvailable { .. } => "host-available",
            ServerMessage::ClientJoined { .. } => "client-joined",
            ServerMessage::HostStopped { .. } => "host-stopped",
            ServerMessage::HostDisconnected { .. } => "host-disconnected",
            ServerMessage::ServerShutdown => "server-shutdown",
            ServerMessage::Offer { .. } => "offer",
            ServerMessage::Answer { .. } => "answer",
            ServerMessage::IceCandidate { .. } => "ice-candidate",
            ServerMessage::Control { .. } => "control",
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn to_value(msg: &ServerMessage) -> Value {
        serde_json::to_value(msg).unwrap()
    }

    #[test]
    fn test_registered_uses_kebab_type_and_camel_fields() {
        let msg = ServerMessage::Registered {
            client_id: EndpointId(1),
            role: Role::Host,
        };
        assert_eq!(
            to_value(&msg),
            json!({"type": "registered", "clientId": 1, "role": "host"})
        );
    }

    #[test]
    fn test_presence_notices_serialize() {
        assert_eq!(
            to_value(&ServerMessage::HostAvailable { host_id: EndpointId(3) }),
            json!({"type": "host-available", "hostId": 3})
        );
        assert_eq!(
            to_value(&ServerMessage::ClientJoined { client_id: EndpointId(4) }),
            json!({"type": "client-joined", "clientId": 4})
        );
        assert_eq!(
            to_value(&ServerMessage::HostDisconnected { host_id: EndpointId(5) }),
            json!({"type": "host-disconnected", "hostId": 5})
        );
        // viewers watching several hosts need to know which one stopped
        assert_eq!(
            to_value(&ServerMessage::HostStopped { host_id: EndpointId(6) }),
            json!({"type": "host-stopped", "hostId": 6})
        );
        assert_eq!(
            to_value(&ServerMessage::ServerShutdown),
            json!({"type": "server-shutdown"})
        );
    }

    #[test]
    fn test_forwarded_offer_keeps_payload_verbatim() {
        // Arrange: odd spacing must survive untouched
        let payload = OpaquePayload::from_json(r#"{"sdp":  "v=0\r\n",  "type":"offer"}"#).unwrap();
        let msg = ServerMessage::signal(SignalKind::Offer, payload, EndpointId(1));

        // Act
        let text = serde_json::to_string(&msg).unwrap();

        // Assert
        assert!(text.contains(r#""offer":{"sdp":  "v=0\r\n",  "type":"offer"}"#));
        assert!(text.contains(r#""fromId":1"#));
        assert!(text.starts_with(r#"{"type":"offer""#));
    }

    #[test]
    fn test_ice_candidate_type_name() {
        let payload = OpaquePayload::from_json("null").unwrap();
        let msg = ServerMessage::signal(SignalKind::IceCandidate, payload, EndpointId(9));
        assert_eq!(to_value(&msg)["type"], "ice-candidate");
        assert_eq!(to_value(&msg)["candidate"], Value::Null);
    }

    #[test]
    fn test_relayed_mousemove_is_minimized() {
        // Arrange
        let msg = ServerMessage::Control {
            from_id: EndpointId(2),
            action: ControlAction::MouseMove(PointerMotion::absolute(0.25, 0.5)),
        };

        // Act / Assert: no relative / delta fields when they carry nothing
        assert_eq!(
            to_value(&msg),
            json!({"type": "control", "fromId": 2, "action": "mousemove", "x": 0.25, "y": 0.5})
        );
    }

    #[test]
    fn test_relayed_keydown_omits_unset_modifiers() {
        let msg = ServerMessage::Control {
            from_id: EndpointId(2),
            action: ControlAction::KeyDown(KeyStroke {
                key: "A".into(),
                code: "KeyA".into(),
                shift_key: true,
                ..KeyStroke::default()
            }),
        };
        assert_eq!(
            to_value(&msg),
            json!({
                "type": "control", "fromId": 2, "action": "keydown",
                "key": "A", "code": "KeyA", "shiftKey": true
            })
        );
    }

    #[test]
    fn test_blur_serializes_with_action_only() {
        let msg = ServerMessage::Control {
            from_id: EndpointId(7),
            action: ControlAction::Blur,
        };
        assert_eq!(
            to_value(&msg),
            json!({"type": "control", "fromId": 7, "action": "blur"})
        );
    }

    #[test]
    fn test_pointer_button_accepts_names_and_indices() {
        let by_name: PointerButton = serde_json::from_str(r#""right""#).unwrap();
        let by_index: PointerButton = serde_json::from_str("1").unwrap();
        assert_eq!(by_name, PointerButton::Right);
        assert_eq!(by_index, PointerButton::Middle);
        assert!(serde_json::from_str::<PointerButton>("7").is_err());
        assert!(serde_json::from_str::<PointerButton>(r#""thumb""#).is_err());
    }

    #[test]
    fn test_control_action_deserializes_wheel_defaults() {
        let action: ControlAction =
            serde_json::from_str(r#"{"action":"wheel","x":0.1,"y":0.2,"deltaY":-3}"#).unwrap();
        assert_eq!(
            action,
            ControlAction::Wheel(WheelScroll {
                x: 0.1,
                y: 0.2,
                delta_x: 0.0,
                delta_y: -3.0,
                mode: None,
            })
        );
    }

    #[test]
    fn test_signal_kind_payload_fields() {
        assert_eq!(SignalKind::Offer.payload_field(), "offer");
        assert_eq!(SignalKind::Answer.payload_field(), "answer");
        assert_eq!(SignalKind::IceCandidate.payload_field(), "candidate");
        assert!(SignalKind::Offer.links_peers());
        assert!(!SignalKind::IceCandidate.links_peers());
    }
}
