//! Connection registry: every live endpoint, its role and readiness.
//!
//! The registry is a plain struct.  [`RelayHub`](super::lifecycle::RelayHub)
//! keeps it behind a single `tokio::sync::Mutex` so that every broadcast
//! below observes a consistent membership snapshot, and so that removal of
//! an endpoint from every index completes before anyone is told about it.
//!
//! # Role index
//!
//! Hosts and viewers are kept in two `Vec`s in registration order.  The
//! fallback peer rule ("earliest-registered viewer", "earliest-registered
//! ready host") reads them front to back, so discovery is deterministic.
//!
//! # Peer links
//!
//! A symmetric `id → id` map written when an offer or answer is routed.  It
//! is a hint for un-targeted follow-up messages and never outranks the role
//! index.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use screenlink_core::{EndpointId, Role, ServerMessage};
use thiserror::Error;
use tracing::debug;

use super::outbound::Outbound;
use super::pipeline::ControlSlot;

/// Errors from registry operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("endpoint {0} is not connected")]
    UnknownEndpoint(EndpointId),

    /// A second `register` on an endpoint that already has a role.  The
    /// existing role is kept.
    #[error("endpoint {id} is already registered as {role}")]
    DuplicateRegistration { id: EndpointId, role: Role },

    #[error("endpoint {0} is not a host")]
    NotAHost(EndpointId),
}

/// One live connection.
#[derive(Debug)]
pub struct EndpointEntry {
    pub id: EndpointId,
    pub outbound: Outbound,
    pub role: Option<Role>,
    /// Host only: actively streaming.
    pub ready: bool,
    pub connected_at: Instant,
    pub last_activity: Instant,
    /// Viewer only: input pipeline state and worker.
    pub control: Option<Arc<ControlSlot>>,
}

impl EndpointEntry {
    /// Time since the connection was accepted, as of `now`.
    pub fn connected_for(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.connected_at)
    }
}

/// Endpoint counts for log lines.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Summary {
    pub hosts: usize,
    pub ready_hosts: usize,
    pub viewers: usize,
    pub unclassified: usize,
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "hosts={} (ready={}) viewers={} unregistered={}",
            self.hosts, self.ready_hosts, self.viewers, self.unclassified
        )
    }
}

/// In-memory registry of all connected endpoints.
#[derive(Debug, Default)]
pub struct Registry {
    endpoints: HashMap<EndpointId, EndpointEntry>,
    hosts: Vec<EndpointId>,
    viewers: Vec<EndpointId>,
    peers: HashMap<EndpointId, EndpointId>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a freshly connected endpoint with no role.
    pub fn insert(&mut self, outbound: Outbound, now: Instant) -> EndpointId {
        let id = outbound.id();
        self.endpoints.insert(
            id,
            EndpointEntry {
                id,
                outbound,
                role: None,
                ready: false,
                connected_at: now,
                last_activity: now,
                control: None,
            },
        );
        id
    }

    /// Classifies an endpoint and sends the resulting notices.
    ///
    /// The caller receives `registered`.  A new viewer additionally receives
    /// `host-available` for every ready host, each of which receives
    /// `client-joined`, in host registration order.
    ///
    /// # Errors
    ///
    /// [`RegistryError::DuplicateRegistration`] if a role is already set,
    /// [`RegistryError::UnknownEndpoint`] if `id` is not connected.
    pub fn register(&mut self, id: EndpointId, role: Role) -> Result<(), RegistryError> {
        let entry = self
            .endpoints
            .get_mut(&id)
            .ok_or(RegistryError::UnknownEndpoint(id))?;
        if let Some(existing) = entry.role {
            return Err(RegistryError::DuplicateRegistration { id, role: existing });
        }
        entry.role = Some(role);
        entry.ready = false;
        entry.outbound.send(ServerMessage::Registered { client_id: id, role });

        match role {
            Role::Host => self.hosts.push(id),
            Role::Viewer => {
                self.viewers.push(id);
                for host in self.ready_hosts() {
                    self.send_to(id, ServerMessage::HostAvailable { host_id: host });
                    self.send_to(host, ServerMessage::ClientJoined { client_id: id });
                }
            }
        }
        Ok(())
    }

    /// Attaches input pipeline state to a viewer.
    pub fn attach_control(&mut self, id: EndpointId, slot: Arc<ControlSlot>) {
        if let Some(entry) = self.endpoints.get_mut(&id) {
            entry.control = Some(slot);
        }
    }

    /// Changes a host's readiness.
    ///
    /// Returns `Ok(false)` when `ready` matches the current state; nothing
    /// is sent in that case.
    ///
    /// # Errors
    ///
    /// [`RegistryError::NotAHost`] if the endpoint is not a registered host.
    pub fn set_ready(&mut self, id: EndpointId, ready: bool) -> Result<bool, RegistryError> {
        let entry = self
            .endpoints
            .get_mut(&id)
            .ok_or(RegistryError::UnknownEndpoint(id))?;
        if entry.role != Some(Role::Host) {
            return Err(RegistryError::NotAHost(id));
        }
        if entry.ready == ready {
            return Ok(false);
        }
        entry.ready = ready;

        if ready {
            for &viewer in &self.viewers {
                self.send_to(viewer, ServerMessage::HostAvailable { host_id: id });
                self.send_to(id, ServerMessage::ClientJoined { client_id: viewer });
            }
        } else {
            self.broadcast_viewers(ServerMessage::HostStopped { host_id: id });
        }
        Ok(true)
    }

    /// Removes an endpoint from every index, then announces a ready host's
    /// departure to all remaining viewers.
    ///
    /// Returns the removed entry, or `None` if `id` was not connected.
    pub fn remove(&mut self, id: EndpointId) -> Option<EndpointEntry> {
        let entry = self.endpoints.remove(&id)?;
        self.hosts.retain(|&h| h != id);
        self.viewers.retain(|&v| v != id);
        self.unlink(id);

        if entry.role == Some(Role::Host) && entry.ready {
            self.broadcast_viewers(ServerMessage::HostDisconnected { host_id: id });
        }
        Some(entry)
    }

    /// Removes and returns every endpoint, clearing all indexes.
    pub fn drain(&mut self) -> Vec<EndpointEntry> {
        self.hosts.clear();
        self.viewers.clear();
        self.peers.clear();
        let mut entries: Vec<EndpointEntry> = self.endpoints.drain().map(|(_, e)| e).collect();
        entries.sort_by_key(|e| e.id);
        entries
    }

    /// Records inbound traffic from `id`.
    pub fn touch(&mut self, id: EndpointId, now: Instant) {
        if let Some(entry) = self.endpoints.get_mut(&id) {
            entry.last_activity = now;
        }
    }

    // ── Queries ───────────────────────────────────────────────────────────────

    pub fn get(&self, id: EndpointId) -> Option<&EndpointEntry> {
        self.endpoints.get(&id)
    }

    pub fn contains(&self, id: EndpointId) -> bool {
        self.endpoints.contains_key(&id)
    }

    pub fn role_of(&self, id: EndpointId) -> Option<Role> {
        self.endpoints.get(&id).and_then(|e| e.role)
    }

    pub fn is_ready_host(&self, id: EndpointId) -> bool {
        self.endpoints
            .get(&id)
            .is_some_and(|e| e.role == Some(Role::Host) && e.ready)
    }

    /// Hosts in registration order.
    pub fn hosts(&self) -> &[EndpointId] {
        &self.hosts
    }

    /// Viewers in registration order.
    pub fn viewers(&self) -> &[EndpointId] {
        &self.viewers
    }

    /// Ready hosts in registration order.
    pub fn ready_hosts(&self) -> Vec<EndpointId> {
        self.hosts
            .iter()
            .copied()
            .filter(|&h| self.is_ready_host(h))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }

    pub fn summary(&self) -> Summary {
        Summary {
            hosts: self.hosts.len(),
            ready_hosts: self.hosts.iter().filter(|&&h| self.is_ready_host(h)).count(),
            viewers: self.viewers.len(),
            unclassified: self.endpoints.values().filter(|e| e.role.is_none()).count(),
        }
    }

    // ── Peer links ────────────────────────────────────────────────────────────

    /// Records `a ↔ b`, replacing any previous link of either side.
    pub fn link_peers(&mut self, a: EndpointId, b: EndpointId) {
        if a == b || !self.contains(a) || !self.contains(b) {
            return;
        }
        self.unlink(a);
        self.unlink(b);
        self.peers.insert(a, b);
        self.peers.insert(b, a);
        debug!(%a, %b, "peer link recorded");
    }

    pub fn peer_of(&self, id: EndpointId) -> Option<EndpointId> {
        self.peers.get(&id).copied()
    }

    fn unlink(&mut self, id: EndpointId) {
        if let Some(other) = self.peers.remove(&id) {
            if self.peers.get(&other) == Some(&id) {
                self.peers.remove(&other);
            }
        }
    }

    // ── Delivery ──────────────────────────────────────────────────────────────

    /// Queues `msg` for `id`.  Returns `false` if `id` is gone or its queue
    /// rejected the message.
    pub fn send_to(&self, id: EndpointId, msg: ServerMessage) -> bool {
        match self.endpoints.get(&id) {
            Some(entry) => entry.outbound.send(msg),
            None => {
                debug!(endpoint = %id, kind = msg.type_name(), "target not connected; message dropped");
                false
            }
        }
    }

    /// Queues `msg` for every viewer.  Returns how many accepted it.
    pub fn broadcast_viewers(&self, msg: ServerMessage) -> usize {
        self.viewers
            .iter()
            .filter(|&&v| self.send_to(v, msg.clone()))
            .count()
    }

    /// Queues `msg` for every host.  Returns how many accepted it.
    pub fn broadcast_hosts(&self, msg: ServerMessage) -> usize {
        self.hosts
            .iter()
            .filter(|&&h| self.send_to(h, msg.clone()))
            .count()
    }

    /// Queues `msg` for every connected endpoint, registered or not.
    pub fn broadcast_all(&self, msg: ServerMessage) -> usize {
        self.endpoints
            .values()
            .filter(|e| e.outbound.send(msg.clone()))
            .count()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc::Receiver;

    fn connect(reg: &mut Registry, id: u64) -> Receiver<ServerMessage> {
        let (out, rx) = Outbound::channel(EndpointId(id), 32);
        reg.insert(out, Instant::now());
        rx
    }

    fn drain(rx: &mut Receiver<ServerMessage>) -> Vec<ServerMessage> {
        let mut out = Vec::new();
        while let Ok(msg) = rx.try_recv() {
            out.push(msg);
        }
        out
    }

    fn assert_disjoint(reg: &Registry) {
        for h in reg.hosts() {
            assert!(!reg.viewers().contains(h), "{h} is in both role indexes");
        }
    }

    #[test]
    fn test_removed_entry_reports_time_connected() {
        // Arrange
        let mut reg = Registry::new();
        let t0 = Instant::now();
        let (out, _rx) = Outbound::channel(EndpointId(1), 4);
        reg.insert(out, t0);

        // Act
        let entry = reg.remove(EndpointId(1)).unwrap();

        // Assert
        assert_eq!(entry.connected_for(t0 + Duration::from_secs(90)), Duration::from_secs(90));
        assert_eq!(entry.connected_for(t0), Duration::ZERO);
    }

    #[test]
    fn test_register_acknowledges_with_id_and_role() {
        // Arrange
        let mut reg = Registry::new();
        let mut rx = connect(&mut reg, 1);

        // Act
        reg.register(EndpointId(1), Role::Host).unwrap();

        // Assert
        assert_eq!(
            drain(&mut rx),
            vec![ServerMessage::Registered {
                client_id: EndpointId(1),
                role: Role::Host
            }]
        );
        assert_eq!(reg.hosts(), &[EndpointId(1)]);
        assert!(!reg.is_ready_host(EndpointId(1)));
    }

    #[test]
    fn test_duplicate_registration_keeps_existing_role() {
        let mut reg = Registry::new();
        let _rx = connect(&mut reg, 1);
        reg.register(EndpointId(1), Role::Host).unwrap();

        let err = reg.register(EndpointId(1), Role::Viewer).unwrap_err();

        assert_eq!(
            err,
            RegistryError::DuplicateRegistration {
                id: EndpointId(1),
                role: Role::Host
            }
        );
        assert_eq!(reg.role_of(EndpointId(1)), Some(Role::Host));
        assert!(reg.viewers().is_empty());
        assert_disjoint(&reg);
    }

    #[test]
    fn test_viewer_joining_learns_every_ready_host_in_order() {
        // Arrange: hosts 1 and 3 ready, host 2 not
        let mut reg = Registry::new();
        let mut rx1 = connect(&mut reg, 1);
        let mut rx2 = connect(&mut reg, 2);
        let mut rx3 = connect(&mut reg, 3);
        let mut rx4 = connect(&mut reg, 4);
        for id in 1..=3 {
            reg.register(EndpointId(id), Role::Host).unwrap();
        }
        reg.set_ready(EndpointId(1), true).unwrap();
        reg.set_ready(EndpointId(3), true).unwrap();
        drain(&mut rx1);
        drain(&mut rx2);
        drain(&mut rx3);

        // Act
        reg.register(EndpointId(4), Role::Viewer).unwrap();

        // Assert
        assert_eq!(
            drain(&mut rx4),
            vec![
                ServerMessage::Registered {
                    client_id: EndpointId(4),
                    role: Role::Viewer
                },
                ServerMessage::HostAvailable { host_id: EndpointId(1) },
                ServerMessage::HostAvailable { host_id: EndpointId(3) },
            ]
        );
        assert_eq!(drain(&mut rx1), vec![ServerMessage::ClientJoined { client_id: EndpointId(4) }]);
        assert!(drain(&mut rx2).is_empty());
        assert_eq!(drain(&mut rx3), vec![ServerMessage::ClientJoined { client_id: EndpointId(4) }]);
    }

    #[test]
    fn test_set_ready_only_acts_on_transitions() {
        // Arrange
        let mut reg = Registry::new();
        let mut host = connect(&mut reg, 1);
        let mut viewer = connect(&mut reg, 2);
        reg.register(EndpointId(1), Role::Host).unwrap();
        reg.register(EndpointId(2), Role::Viewer).unwrap();
        drain(&mut host);
        drain(&mut viewer);

        // Act / Assert: first ready is a transition
        assert_eq!(reg.set_ready(EndpointId(1), true), Ok(true));
        assert_eq!(drain(&mut viewer), vec![ServerMessage::HostAvailable { host_id: EndpointId(1) }]);
        assert_eq!(drain(&mut host), vec![ServerMessage::ClientJoined { client_id: EndpointId(2) }]);

        // second ready is a no-op
        assert_eq!(reg.set_ready(EndpointId(1), true), Ok(false));
        assert!(drain(&mut viewer).is_empty());

        // stop announces host-stopped with the host id
        assert_eq!(reg.set_ready(EndpointId(1), false), Ok(true));
        assert_eq!(drain(&mut viewer), vec![ServerMessage::HostStopped { host_id: EndpointId(1) }]);
    }

    #[test]
    fn test_set_ready_from_viewer_is_rejected() {
        let mut reg = Registry::new();
        let _rx = connect(&mut reg, 1);
        reg.register(EndpointId(1), Role::Viewer).unwrap();
        assert_eq!(reg.set_ready(EndpointId(1), true), Err(RegistryError::NotAHost(EndpointId(1))));

        let _rx2 = connect(&mut reg, 2);
        assert_eq!(reg.set_ready(EndpointId(2), true), Err(RegistryError::NotAHost(EndpointId(2))));
        assert_eq!(
            reg.set_ready(EndpointId(9), true),
            Err(RegistryError::UnknownEndpoint(EndpointId(9)))
        );
    }

    #[test]
    fn test_removing_ready_host_notifies_viewers_after_removal() {
        // Arrange
        let mut reg = Registry::new();
        let _host = connect(&mut reg, 1);
        let mut v1 = connect(&mut reg, 2);
        let mut v2 = connect(&mut reg, 3);
        reg.register(EndpointId(1), Role::Host).unwrap();
        reg.register(EndpointId(2), Role::Viewer).unwrap();
        reg.register(EndpointId(3), Role::Viewer).unwrap();
        reg.set_ready(EndpointId(1), true).unwrap();
        drain(&mut v1);
        drain(&mut v2);

        // Act
        let removed = reg.remove(EndpointId(1)).unwrap();

        // Assert
        assert_eq!(removed.id, EndpointId(1));
        assert!(!reg.hosts().contains(&EndpointId(1)));
        let expected = vec![ServerMessage::HostDisconnected { host_id: EndpointId(1) }];
        assert_eq!(drain(&mut v1), expected);
        assert_eq!(drain(&mut v2), expected);
    }

    #[test]
    fn test_removing_viewer_is_silent() {
        let mut reg = Registry::new();
        let mut host = connect(&mut reg, 1);
        let _viewer = connect(&mut reg, 2);
        reg.register(EndpointId(1), Role::Host).unwrap();
        reg.set_ready(EndpointId(1), true).unwrap();
        reg.register(EndpointId(2), Role::Viewer).unwrap();
        drain(&mut host);

        reg.remove(EndpointId(2));

        assert!(drain(&mut host).is_empty());
        assert!(reg.viewers().is_empty());
    }

    #[test]
    fn test_remove_is_idempotent() {
        let mut reg = Registry::new();
        let _rx = connect(&mut reg, 1);
        assert!(reg.remove(EndpointId(1)).is_some());
        assert!(reg.remove(EndpointId(1)).is_none());
        assert!(reg.is_empty());
    }

    #[test]
    fn test_role_indexes_stay_disjoint_across_churn() {
        // Arrange / Act: interleave registrations and removals
        let mut reg = Registry::new();
        let mut receivers = Vec::new();
        for id in 1..=12u64 {
            receivers.push(connect(&mut reg, id));
            let role = if id % 3 == 0 { Role::Host } else { Role::Viewer };
            reg.register(EndpointId(id), role).unwrap();
            let _ = reg.register(EndpointId(id), role.opposite());
            if id % 4 == 0 {
                reg.remove(EndpointId(id - 1));
            }
            assert_disjoint(&reg);
        }

        // Assert: removed ids are in neither index
        for gone in [3u64, 7, 11] {
            assert!(!reg.hosts().contains(&EndpointId(gone)));
            assert!(!reg.viewers().contains(&EndpointId(gone)));
        }
    }

    #[test]
    fn test_peer_links_are_symmetric_and_dropped_on_remove() {
        let mut reg = Registry::new();
        let _a = connect(&mut reg, 1);
        let _b = connect(&mut reg, 2);
        let _c = connect(&mut reg, 3);

        reg.link_peers(EndpointId(1), EndpointId(2));
        assert_eq!(reg.peer_of(EndpointId(1)), Some(EndpointId(2)));
        assert_eq!(reg.peer_of(EndpointId(2)), Some(EndpointId(1)));

        // relinking 1 replaces its old partner on both sides
        reg.link_peers(EndpointId(1), EndpointId(3));
        assert_eq!(reg.peer_of(EndpointId(2)), None);

        reg.remove(EndpointId(3));
        assert_eq!(reg.peer_of(EndpointId(1)), None);
    }

    #[test]
    fn test_summary_counts() {
        let mut reg = Registry::new();
        let _rx: Vec<_> = (1..=4).map(|id| connect(&mut reg, id)).collect();
        reg.register(EndpointId(1), Role::Host).unwrap();
        reg.register(EndpointId(2), Role::Host).unwrap();
        reg.register(EndpointId(3), Role::Viewer).unwrap();
        reg.set_ready(EndpointId(2), true).unwrap();

        assert_eq!(
            reg.summary(),
            Summary {
                hosts: 2,
                ready_hosts: 1,
                viewers: 1,
                unclassified: 1
            }
        );
    }
}
