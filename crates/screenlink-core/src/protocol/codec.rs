//! Codec for the two frame shapes an endpoint can send.
//!
//! Text frames carry JSON envelopes discriminated by `"type"`:
//! [`parse_client_message`] turns one into a [`ClientMessage`].
//!
//! Binary frames carry a pointer position only:
//! ```text
//! [x: f32 LE][y: f32 LE]
//! ```
//! Total size: 8 bytes.  Both coordinates are normalized to `[0, 1]`
//! relative to the shared video surface.

use serde::Deserialize;
use thiserror::Error;

use crate::domain::endpoint::{EndpointId, Role};
use crate::protocol::messages::{
    present_payload, ClientMessage, ControlEnvelope, OpaquePayload, ServerMessage, SignalKind,
    SignalMessage,
};

/// Size of a binary pointer frame in bytes.
pub const POINTER_FRAME_LEN: usize = 8;

/// Errors that can occur while decoding inbound frames or encoding outbound
/// ones.
#[derive(Debug, Error, PartialEq)]
pub enum ProtocolError {
    /// The text frame is not valid JSON or not a JSON object.
    #[error("malformed JSON: {0}")]
    MalformedJson(String),

    /// The JSON object has no string `"type"` field.
    #[error("message has no 'type' discriminant")]
    MissingType,

    /// The `"type"` value does not name any message an endpoint may send.
    #[error("unrecognized message type '{0}'")]
    UnrecognizedType(String),

    /// The discriminant is known but the type-specific fields are wrong.
    #[error("invalid '{kind}' message: {reason}")]
    InvalidFields { kind: &'static str, reason: String },

    /// A binary frame had the wrong size.
    #[error("binary frame must be {expected} bytes, got {actual}")]
    BadFrameLength { expected: usize, actual: usize },

    /// A binary frame carried NaN or an infinity.
    #[error("pointer coordinate is not finite")]
    NonFiniteCoordinate,

    /// An outbound message could not be serialized.
    #[error("failed to encode '{kind}': {reason}")]
    Encode { kind: &'static str, reason: String },
}

// ── Text frames ───────────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct Discriminant {
    #[serde(rename = "type")]
    kind: Option<String>,
}

#[derive(Deserialize)]
struct RegisterFields {
    role: Role,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignalFields {
    #[serde(default, deserialize_with = "present_payload")]
    offer: Option<OpaquePayload>,
    #[serde(default, deserialize_with = "present_payload")]
    answer: Option<OpaquePayload>,
    #[serde(default, deserialize_with = "present_payload")]
    candidate: Option<OpaquePayload>,
    #[serde(default)]
    target_id: Option<EndpointId>,
}

/// Decodes one inbound text frame.
///
/// The discriminant is read first so that the three failure modes stay
/// distinct: broken JSON, a `type` nobody understands, and a known `type`
/// with bad fields.
///
/// # Errors
///
/// Returns [`ProtocolError`] describing why the frame was rejected.  None of
/// these are fatal to the connection.
///
/// # Examples
///
/// ```rust
/// use screenlink_core::protocol::{parse_client_message, ClientMessage};
/// use screenlink_core::Role;
///
/// let msg = parse_client_message(r#"{"type":"register","role":"host"}"#).unwrap();
/// assert_eq!(msg, ClientMessage::Register { role: Role::Host });
/// ```
pub fn parse_client_message(text: &str) -> Result<ClientMessage, ProtocolError> {
    let discriminant: Discriminant =
        serde_json::from_str(text).map_err(|e| ProtocolError::MalformedJson(e.to_string()))?;
    let kind = discriminant.kind.ok_or(ProtocolError::MissingType)?;

    match kind.as_str() {
        "register" => {
            let fields: RegisterFields = fields_of("register", text)?;
            Ok(ClientMessage::Register { role: fields.role })
        }
        "host-ready" => Ok(ClientMessage::HostReady),
        "host-stopped" => Ok(ClientMessage::HostStopped),
        "offer" => parse_signal(SignalKind::Offer, text),
        "answer" => parse_signal(SignalKind::Answer, text),
        "ice-candidate" => parse_signal(SignalKind::IceCandidate, text),
        "control" => {
            let envelope: ControlEnvelope = fields_of("control", text)?;
            Ok(ClientMessage::Control(envelope))
        }
        _ => Err(ProtocolError::UnrecognizedType(kind)),
    }
}

fn fields_of<'a, T: Deserialize<'a>>(kind: &'static str, text: &'a str) -> Result<T, ProtocolError> {
    serde_json::from_str(text).map_err(|e| ProtocolError::InvalidFields {
        kind,
        reason: e.to_string(),
    })
}

fn parse_signal(kind: SignalKind, text: &str) -> Result<ClientMessage, ProtocolError> {
    let fields: SignalFields = fields_of(kind.type_name(), text)?;
    let payload = match kind {
        SignalKind::Offer => fields.offer,
        SignalKind::Answer => fields.answer,
        SignalKind::IceCandidate => fields.candidate,
    };
    let payload = payload.ok_or_else(|| ProtocolError::InvalidFields {
        kind: kind.type_name(),
        reason: format!("missing field `{}`", kind.payload_field()),
    })?;

    Ok(ClientMessage::Signal(SignalMessage {
        kind,
        payload,
        target_id: fields.target_id,
    }))
}

/// Serializes an outbound message into the text of one WebSocket frame.
///
/// # Errors
///
/// Returns [`ProtocolError::Encode`] if serialization fails.
pub fn encode_server_message(msg: &ServerMessage) -> Result<String, ProtocolError> {
    serde_json::to_string(msg).map_err(|e| ProtocolError::Encode {
        kind: msg.type_name(),
        reason: e.to_string(),
    })
}

// ── Binary frames ─────────────────────────────────────────────────────────────

/// Decodes an 8-byte pointer frame into normalized `(x, y)`.
///
/// Coordinates outside `[0, 1]` are clamped onto the surface edge.
///
/// # Errors
///
/// Returns [`ProtocolError::BadFrameLength`] for any size other than 8 and
/// [`ProtocolError::NonFiniteCoordinate`] for NaN or infinite values.
///
/// # Examples
///
/// ```rust
/// use screenlink_core::protocol::{decode_pointer_frame, encode_pointer_frame};
///
/// let frame = encode_pointer_frame(0.5, 0.25);
/// assert_eq!(decode_pointer_frame(&frame).unwrap(), (0.5, 0.25));
/// ```
pub fn decode_pointer_frame(bytes: &[u8]) -> Result<(f64, f64), ProtocolError> {
    if bytes.len() != POINTER_FRAME_LEN {
        return Err(ProtocolError::BadFrameLength {
            expected: POINTER_FRAME_LEN,
            actual: bytes.len(),
        });
    }

    let x = f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
    let y = f32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);
    if !x.is_finite() || !y.is_finite() {
        return Err(ProtocolError::NonFiniteCoordinate);
    }

    Ok((
        f64::from(x).clamp(0.0, 1.0),
        f64::from(y).clamp(0.0, 1.0),
    ))
}

/// Encodes normalized `(x, y)` as a binary pointer frame.
pub fn encode_pointer_frame(x: f32, y: f32) -> [u8; POINTER_FRAME_LEN] {
    let mut frame = [0u8; POINTER_FRAME_LEN];
    frame[..4].copy_from_slice(&x.to_le_bytes());
    frame[4..].copy_from_slice(&y.to_le_bytes());
    frame
}

// ── Tests ─────────────────────────────────────────────────────────────────────
