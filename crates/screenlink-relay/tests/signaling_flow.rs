//! Integration tests for registration, readiness and signal routing.
//!
//! These drive [`RelayHub`] directly with in-memory outbound queues, so the
//! exact notice sequence each endpoint receives can be asserted.

use std::sync::Arc;

use screenlink_core::protocol::OpaquePayload;
use screenlink_core::{EndpointId, Role, ServerMessage};
use screenlink_relay::application::{Outbound, RelayHub};
use screenlink_relay::domain::RelayConfig;
use screenlink_relay::infrastructure::NoopActuator;
use tokio::sync::mpsc::Receiver;
use tokio_test::assert_ok;

fn hub() -> Arc<RelayHub> {
    let config = RelayConfig::default();
    let actuator = Arc::new(NoopActuator::new(config.fallback_surface));
    RelayHub::new(config, actuator)
}

async fn join(hub: &Arc<RelayHub>) -> (EndpointId, Receiver<ServerMessage>) {
    hub.connect(Outbound::channel).await
}

fn drain(rx: &mut Receiver<ServerMessage>) -> Vec<ServerMessage> {
    let mut out = Vec::new();
    while let Ok(msg) = rx.try_recv() {
        out.push(msg);
    }
    out
}

async fn register(hub: &Arc<RelayHub>, id: EndpointId, role: &str) {
    let text = format!(r#"{{"type":"register","role":"{role}"}}"#);
    assert_ok!(hub.handle_text(id, &text).await);
}

#[tokio::test]
async fn test_host_viewer_offer_and_silent_viewer_disconnect() {
    // Arrange
    let hub = hub();
    let (host, mut host_rx) = join(&hub).await;
    let (viewer, mut viewer_rx) = join(&hub).await;
    assert_eq!((host, viewer), (EndpointId(1), EndpointId(2)));

    // Act: register both, host goes ready
    register(&hub, host, "host").await;
    register(&hub, viewer, "viewer").await;
    assert_ok!(hub.handle_text(host, r#"{"type":"host-ready"}"#).await);

    // Assert: registration and readiness notices
    assert_eq!(
        drain(&mut host_rx),
        vec![
            ServerMessage::Registered { client_id: host, role: Role::Host },
            ServerMessage::ClientJoined { client_id: viewer },
        ]
    );
    assert_eq!(
        drain(&mut viewer_rx),
        vec![
            ServerMessage::Registered { client_id: viewer, role: Role::Viewer },
            ServerMessage::HostAvailable { host_id: host },
        ]
    );

    // Act: targeted offer from host to viewer
    assert_ok!(
        hub.handle_text(host, r#"{"type":"offer","offer":"SDP-A","targetId":2}"#)
            .await
    );

    // Assert
    assert_eq!(
        drain(&mut viewer_rx),
        vec![ServerMessage::Offer {
            offer: OpaquePayload::from_json(r#""SDP-A""#).unwrap(),
            from_id: host,
        }]
    );

    // Act: viewer leaves
    hub.disconnect(viewer).await;

    // Assert: hosts are not told about departing viewers
    assert!(drain(&mut host_rx).is_empty());
    let summary = hub.summary().await;
    assert_eq!((summary.hosts, summary.ready_hosts, summary.viewers), (1, 1, 0));
}

#[tokio::test]
async fn test_ready_host_disconnect_notifies_every_viewer() {
    // Arrange
    let hub = hub();
    let (host, _host_rx) = join(&hub).await;
    let (v1, mut v1_rx) = join(&hub).await;
    let (v2, mut v2_rx) = join(&hub).await;
    register(&hub, host, "host").await;
    assert_ok!(hub.handle_text(host, r#"{"type":"host-ready"}"#).await);
    register(&hub, v1, "viewer").await;
    register(&hub, v2, "viewer").await;
    drain(&mut v1_rx);
    drain(&mut v2_rx);

    // Act
    hub.disconnect(host).await;

    // Assert
    for rx in [&mut v1_rx, &mut v2_rx] {
        assert_eq!(
            drain(rx),
            vec![ServerMessage::HostDisconnected { host_id: host }]
        );
    }
    assert_eq!(hub.summary().await.hosts, 0);
}

#[tokio::test]
async fn test_host_stopped_notifies_viewers_once() {
    let hub = hub();
    let (host, _host_rx) = join(&hub).await;
    let (viewer, mut viewer_rx) = join(&hub).await;
    register(&hub, host, "host").await;
    register(&hub, viewer, "viewer").await;
    assert_ok!(hub.handle_text(host, r#"{"type":"host-ready"}"#).await);
    drain(&mut viewer_rx);

    assert_ok!(hub.handle_text(host, r#"{"type":"host-stopped"}"#).await);
    assert_ok!(hub.handle_text(host, r#"{"type":"host-stopped"}"#).await);

    assert_eq!(
        drain(&mut viewer_rx),
        vec![ServerMessage::HostStopped { host_id: host }]
    );
}

#[tokio::test]
async fn test_untargeted_answer_goes_to_linked_host() {
    // Arrange: two ready hosts; the second one offers to the viewer
    let hub = hub();
    let (h1, mut h1_rx) = join(&hub).await;
    let (h2, mut h2_rx) = join(&hub).await;
    let (viewer, _viewer_rx) = join(&hub).await;
    for h in [h1, h2] {
        register(&hub, h, "host").await;
        assert_ok!(hub.handle_text(h, r#"{"type":"host-ready"}"#).await);
    }
    register(&hub, viewer, "viewer").await;
    assert_ok!(
        hub.handle_text(h2, r#"{"type":"offer","offer":{"sdp":"x"},"targetId":3}"#)
            .await
    );
    drain(&mut h1_rx);
    drain(&mut h2_rx);

    // Act: the answer names no target
    assert_ok!(
        hub.handle_text(viewer, r#"{"type":"answer","answer":{"sdp":"y"}}"#)
            .await
    );

    // Assert: the peer link wins over the earliest ready host
    assert!(drain(&mut h1_rx).is_empty());
    assert_eq!(
        drain(&mut h2_rx),
        vec![ServerMessage::Answer {
            answer: OpaquePayload::from_json(r#"{"sdp":"y"}"#).unwrap(),
            from_id: viewer,
        }]
    );
}

#[tokio::test]
async fn test_duplicate_registration_keeps_first_role() {
    let hub = hub();
    let (id, mut rx) = join(&hub).await;
    register(&hub, id, "viewer").await;

    let second = hub
        .handle_text(id, r#"{"type":"register","role":"host"}"#)
        .await;

    assert!(second.is_err());
    assert_eq!(
        drain(&mut rx),
        vec![ServerMessage::Registered { client_id: id, role: Role::Viewer }]
    );
    assert_eq!(hub.summary().await.viewers, 1);
}
