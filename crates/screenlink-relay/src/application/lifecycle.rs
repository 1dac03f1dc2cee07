//! Connection lifecycle: the hub every session task talks to.
//!
//! [`RelayHub`] owns the registry, the id allocator and the actuator.  A
//! session calls [`connect`](RelayHub::connect) once, feeds each inbound
//! frame to [`handle_text`](RelayHub::handle_text) or
//! [`handle_binary`](RelayHub::handle_binary), and calls
//! [`disconnect`](RelayHub::disconnect) exactly once when it ends.
//!
//! # Locking
//!
//! The registry sits behind one `tokio::sync::Mutex`.  Every registry
//! mutation together with the notices it causes happens under that lock, so
//! two endpoints never observe each other's notices out of order.  Sends are
//! `try_send` into bounded queues and never await under the lock.
//!
//! Each viewer's pipeline state sits behind its own lock inside a
//! [`ControlSlot`]; the session task only enqueues there and a per-viewer
//! worker drains it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use screenlink_core::input::PushOutcome;
use screenlink_core::protocol::SignalMessage;
use screenlink_core::{
    decode_pointer_frame, parse_client_message, ClientMessage, ControlAction, EndpointId,
    EndpointIdAllocator, ProtocolError, Role, ServerMessage,
};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::actuator::InputActuator;
use super::outbound::Outbound;
use super::pipeline::{Admission, ControlSlot, Dispatch, PendingInput, PipelineSettings};
use super::registry::{Registry, RegistryError, Summary};
use super::resolver::RouteMiss;
use super::router::{relay_control, route_signal};

use crate::domain::RelayConfig;

/// Why an inbound frame was not acted on.  None of these end the session.
#[derive(Debug, Error, PartialEq)]
pub enum RelayError {
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("signal not routed: {0}")]
    Route(#[from] RouteMiss),

    /// Input from an endpoint that is not a viewer.
    #[error("input from {0} ignored: not a viewer")]
    NotAViewer(EndpointId),
}

/// Shared state of a running relay.
pub struct RelayHub {
    registry: Mutex<Registry>,
    ids: EndpointIdAllocator,
    actuator: Arc<dyn InputActuator>,
    config: RelayConfig,
    settings: PipelineSettings,
    /// Set once the "no actuator" warning has been logged.
    gap_logged: AtomicBool,
}

impl RelayHub {
    pub fn new(config: RelayConfig, actuator: Arc<dyn InputActuator>) -> Arc<Self> {
        Arc::new(Self {
            registry: Mutex::new(Registry::new()),
            ids: EndpointIdAllocator::new(),
            settings: PipelineSettings::from(&config),
            config,
            actuator,
            gap_logged: AtomicBool::new(false),
        })
    }

    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    /// Registers a new connection and returns its id.
    ///
    /// `make_outbound` receives the id so the queue can be labelled with it.
    pub async fn connect<F, R>(&self, make_outbound: F) -> (EndpointId, R)
    where
        F: FnOnce(EndpointId, usize) -> (Outbound, R),
    {
        let id = self.ids.next();
        let (outbound, rx) = make_outbound(id, self.config.outbound_capacity);
        let mut registry = self.registry.lock().await;
        registry.insert(outbound, Instant::now());
        info!(endpoint = %id, summary = %registry.summary(), "endpoint connected");
        (id, rx)
    }

    /// Handles one text frame from `id`.
    ///
    /// # Errors
    ///
    /// Returns a [`RelayError`] if the frame was rejected or had no effect.
    /// The caller logs it and keeps the session open.
    pub async fn handle_text(self: &Arc<Self>, id: EndpointId, text: &str) -> Result<(), RelayError> {
        let now = Instant::now();
        self.registry.lock().await.touch(id, now);

        let msg = parse_client_message(text)?;
        debug!(endpoint = %id, kind = msg.type_name(), "message received");

        match msg {
            ClientMessage::Register { role } => self.register(id, role).await,
            ClientMessage::HostReady => self.set_ready(id, true).await,
            ClientMessage::HostStopped => self.set_ready(id, false).await,
            ClientMessage::Signal(signal) => self.signal(id, signal).await,
            ClientMessage::Control(envelope) => self.control(id, envelope.action, now).await,
        }
    }

    /// Handles one binary pointer frame from `id`.
    ///
    /// # Errors
    ///
    /// [`RelayError::Protocol`] for a bad frame, [`RelayError::NotAViewer`]
    /// if the sender is not a viewer.
    pub async fn handle_binary(&self, id: EndpointId, frame: &[u8]) -> Result<(), RelayError> {
        let now = Instant::now();
        let (x, y) = decode_pointer_frame(frame)?;
        let slot = {
            let mut registry = self.registry.lock().await;
            registry.touch(id, now);
            Self::viewer_slot(&registry, id)?
        };
        self.enqueue(id, &slot, PendingInput::pointer_frame(x, y, now));
        Ok(())
    }

    /// Tears down an endpoint.  Safe to call for an id that is already gone.
    pub async fn disconnect(&self, id: EndpointId) {
        let entry = {
            let mut registry = self.registry.lock().await;
            let entry = registry.remove(id);
            if let Some(entry) = &entry {
                info!(
                    endpoint = %id,
                    role = ?entry.role,
                    connected_for = ?entry.connected_for(Instant::now()),
                    summary = %registry.summary(),
                    "endpoint disconnected"
                );
            }
            entry
        };
        let Some(entry) = entry else {
            return;
        };

        if let Some(slot) = entry.control {
            slot.stop_worker();
            let dispatch = slot.lock().release_all(self.surface());
            if !dispatch.is_empty() {
                debug!(endpoint = %id, released = dispatch.actuate.len(), "released held input");
            }
            self.dispatch(id, dispatch).await;
        }
    }

    /// Tells every endpoint the relay is going away, then drops them all.
    ///
    /// Dropping the registry's outbound handles closes each writer once it
    /// has flushed `server-shutdown`.
    pub async fn shutdown_all(&self) {
        let entries = {
            let mut registry = self.registry.lock().await;
            let notified = registry.broadcast_all(ServerMessage::ServerShutdown);
            info!(notified, "server-shutdown sent");
            registry.drain()
        };

        for entry in entries {
            if let Some(slot) = entry.control {
                slot.stop_worker();
                let dispatch = slot.lock().release_all(self.surface());
                self.actuate(dispatch);
            }
        }
    }

    pub async fn summary(&self) -> Summary {
        self.registry.lock().await.summary()
    }

    // ── Message handlers ──────────────────────────────────────────────────────

    async fn register(self: &Arc<Self>, id: EndpointId, role: Role) -> Result<(), RelayError> {
        let mut registry = self.registry.lock().await;
        registry.register(id, role)?;
        if role == Role::Viewer {
            let slot = Arc::new(ControlSlot::new(&self.settings));
            slot.set_worker(tokio::spawn(input_worker(Arc::clone(self), id, Arc::clone(&slot))));
            registry.attach_control(id, slot);
        }
        info!(endpoint = %id, %role, summary = %registry.summary(), "endpoint registered");
        Ok(())
    }

    async fn set_ready(&self, id: EndpointId, ready: bool) -> Result<(), RelayError> {
        let mut registry = self.registry.lock().await;
        let changed = registry.set_ready(id, ready)?;
        if changed {
            info!(host = %id, ready, summary = %registry.summary(), "host readiness changed");
        }
        Ok(())
    }

    async fn signal(&self, id: EndpointId, signal: SignalMessage) -> Result<(), RelayError> {
        let mut registry = self.registry.lock().await;
        route_signal(&mut registry, id, signal)?;
        Ok(())
    }

    async fn control(&self, id: EndpointId, action: ControlAction, now: Instant) -> Result<(), RelayError> {
        let slot = {
            let registry = self.registry.lock().await;
            Self::viewer_slot(&registry, id)?
        };

        if action == ControlAction::Blur {
            let dispatch = slot.lock().release_all(self.surface());
            debug!(endpoint = %id, released = dispatch.actuate.len(), "viewer lost focus");
            self.dispatch(id, dispatch).await;
            return Ok(());
        }

        self.enqueue(id, &slot, PendingInput::structured(action, now));
        Ok(())
    }

    // ── Pipeline plumbing ─────────────────────────────────────────────────────

    fn viewer_slot(registry: &Registry, id: EndpointId) -> Result<Arc<ControlSlot>, RelayError> {
        registry
            .get(id)
            .filter(|entry| entry.role == Some(Role::Viewer))
            .and_then(|entry| entry.control.clone())
            .ok_or(RelayError::NotAViewer(id))
    }

    fn enqueue(&self, id: EndpointId, slot: &ControlSlot, input: PendingInput) {
        match slot.lock().enqueue(input) {
            Admission::Pushed(PushOutcome::Overflow) => {
                warn!(endpoint = %id, "input queue full; event dropped");
            }
            Admission::TooSoon | Admission::Release => return,
            Admission::Pushed(_) => {}
        }
        slot.notify();
    }

    fn surface(&self) -> (u32, u32) {
        self.actuator
            .surface_size()
            .unwrap_or(self.config.fallback_surface)
    }

    /// Relays to hosts, then actuates.
    async fn dispatch(&self, from: EndpointId, dispatch: Dispatch) {
        if !dispatch.relay.is_empty() {
            let registry = self.registry.lock().await;
            for action in dispatch.relay.iter().cloned() {
                relay_control(&registry, from, action);
            }
        }
        self.actuate(dispatch);
    }

    fn actuate(&self, dispatch: Dispatch) {
        if dispatch.actuate.is_empty() {
            return;
        }
        if !self.actuator.is_available() {
            if !self.gap_logged.swap(true, Ordering::Relaxed) {
                warn!("input received but no actuator is available; relaying only");
            }
            return;
        }
        for actuation in &dispatch.actuate {
            if let Err(e) = actuation.apply(self.actuator.as_ref()) {
                warn!(?actuation, "actuator call failed: {e}");
            }
        }
    }
}

/// Drains one viewer's pending input each time it is woken.
async fn input_worker(hub: Arc<RelayHub>, id: EndpointId, slot: Arc<ControlSlot>) {
    loop {
        slot.notified().await;
        let dispatch = slot.lock().drain(hub.surface());
        if !dispatch.is_empty() {
            hub.dispatch(id, dispatch).await;
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
