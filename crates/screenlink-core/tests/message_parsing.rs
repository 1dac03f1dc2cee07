//! Integration tests for the screenlink-core wire protocol.
//!
//! These tests drive the public API the way the relay does: parse what a
//! browser sends, then build and encode what the relay forwards.

use screenlink_core::{
    parse_client_message,
    protocol::{
        decode_pointer_frame, encode_pointer_frame, encode_server_message, KeyStroke,
        PointerMotion, SignalKind, POINTER_FRAME_LEN,
    },
    ClientMessage, ControlAction, EndpointId, EventClass, PendingEvents, ProtocolError, Role,
    ServerMessage,
};
use serde_json::{json, Value};

fn encode(msg: &ServerMessage) -> Value {
    let text = encode_server_message(msg).expect("encode must succeed");
    serde_json::from_str(&text).expect("relay output must be valid JSON")
}

#[test]
fn test_offer_is_forwarded_byte_for_byte() {
    // Arrange: the SDP text a browser produced, with its own key order
    let inbound = r#"{"type":"offer","offer":{"type":"offer","sdp":"v=0\r\no=- 1 2 IN IP4 0.0.0.0\r\n"},"targetId":2}"#;

    // Act
    let signal = match parse_client_message(inbound).expect("parse must succeed") {
        ClientMessage::Signal(signal) => signal,
        other => panic!("expected Signal, got {other:?}"),
    };
    let outbound = encode_server_message(&ServerMessage::signal(
        signal.kind,
        signal.payload,
        EndpointId(1),
    ))
    .unwrap();

    // Assert
    assert!(outbound.contains(
        r#""offer":{"type":"offer","sdp":"v=0\r\no=- 1 2 IN IP4 0.0.0.0\r\n"}"#
    ));
    let value: Value = serde_json::from_str(&outbound).unwrap();
    assert_eq!(value["fromId"], 1);
    assert!(value.get("targetId").is_none());
}

#[test]
fn test_each_signal_kind_keeps_its_payload_field() {
    for (text, kind, field) in [
        (r#"{"type":"offer","offer":"A"}"#, SignalKind::Offer, "offer"),
        (r#"{"type":"answer","answer":"B"}"#, SignalKind::Answer, "answer"),
        (
            r#"{"type":"ice-candidate","candidate":{"candidate":"c","sdpMid":"0"}}"#,
            SignalKind::IceCandidate,
            "candidate",
        ),
    ] {
        let signal = match parse_client_message(text).unwrap() {
            ClientMessage::Signal(signal) => signal,
            other => panic!("expected Signal, got {other:?}"),
        };
        assert_eq!(signal.kind, kind);
        let forwarded = encode(&ServerMessage::signal(kind, signal.payload, EndpointId(5)));
        assert_eq!(forwarded["type"], kind.type_name());
        assert!(forwarded.get(field).is_some(), "missing {field}");
    }
}

#[test]
fn test_unknown_type_is_a_distinct_outcome() {
    let unknown = parse_client_message(r#"{"type":"screenshot"}"#).unwrap_err();
    let broken = parse_client_message(r#"{"type":"#).unwrap_err();
    assert_eq!(unknown, ProtocolError::UnrecognizedType("screenshot".into()));
    assert!(matches!(broken, ProtocolError::MalformedJson(_)));
}

#[test]
fn test_register_roles() {
    assert_eq!(
        parse_client_message(r#"{"type":"register","role":"viewer"}"#).unwrap(),
        ClientMessage::Register { role: Role::Viewer }
    );
    let missing_role = parse_client_message(r#"{"type":"register"}"#).unwrap_err();
    assert!(matches!(missing_role, ProtocolError::InvalidFields { kind: "register", .. }));
}

#[test]
fn test_relative_mousemove_parses_deltas() {
    let msg = parse_client_message(
        r#"{"type":"control","action":"mousemove","x":0,"y":0,"relative":true,"deltaX":-4,"deltaY":12.5}"#,
    )
    .unwrap();
    match msg {
        ClientMessage::Control(envelope) => assert_eq!(
            envelope.action,
            ControlAction::MouseMove(PointerMotion {
                x: 0.0,
                y: 0.0,
                relative: true,
                delta_x: -4.0,
                delta_y: 12.5,
            })
        ),
        other => panic!("expected Control, got {other:?}"),
    }
}

#[test]
fn test_parsed_control_drains_in_priority_order() {
    // Arrange: keydown, wheel, then mousemove, as a browser might send them
    let texts = [
        r#"{"type":"control","action":"keydown","key":"a","code":"KeyA"}"#,
        r#"{"type":"control","action":"wheel","x":0.5,"y":0.5,"deltaY":100}"#,
        r#"{"type":"control","action":"mousemove","x":0.1,"y":0.1}"#,
    ];
    let mut pending = PendingEvents::new(16);

    // Act
    for text in texts {
        let action = match parse_client_message(text).unwrap() {
            ClientMessage::Control(envelope) => envelope.action,
            other => panic!("expected Control, got {other:?}"),
        };
        let class = action.class().expect("queued actions have a class");
        pending.push(class, action);
    }
    let names: Vec<&str> = pending.drain().iter().map(ControlAction::name).collect();

    // Assert
    assert_eq!(names, vec!["mousemove", "wheel", "keydown"]);
}

#[test]
fn test_relayed_control_is_minimized() {
    let relayed = encode(&ServerMessage::Control {
        from_id: EndpointId(2),
        action: ControlAction::KeyUp(KeyStroke {
            key: "Shift".into(),
            code: "ShiftLeft".into(),
            ..KeyStroke::default()
        }),
    });
    assert_eq!(
        relayed,
        json!({"type": "control", "fromId": 2, "action": "keyup", "key": "Shift", "code": "ShiftLeft"})
    );
}

#[test]
fn test_pointer_frame_contract() {
    let frame = encode_pointer_frame(0.75, 0.125);
    assert_eq!(frame.len(), POINTER_FRAME_LEN);
    assert_eq!(decode_pointer_frame(&frame).unwrap(), (0.75, 0.125));
    assert!(decode_pointer_frame(&frame[..6]).is_err());
    assert_eq!(EventClass::PointerMove.rank(), 0);
}
