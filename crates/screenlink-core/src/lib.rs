//! # screenlink-core
//!
//! Shared library for the screenlink relay containing the signaling wire
//! protocol, endpoint identity types, DOM key translation, and the pure
//! building blocks of the input-event pipeline.
//!
//! This crate has zero dependencies on sockets, async runtimes, or OS input
//! APIs.  Everything here can be unit-tested in isolation.
//!
//! # Architecture overview
//!
//! screenlink lets a *host* share its screen with a *viewer* over a direct
//! peer-to-peer transport.  A small relay server brokers the connection setup
//! (offer / answer / ICE candidates) and forwards the viewer's pointer and
//! keyboard input back to the host.
//!
//! - **`domain`** – Endpoint ids and roles.  Ids are handed out by a
//!   monotonic allocator and never reused during a process lifetime.
//!
//! - **`protocol`** – The JSON envelopes exchanged over WebSocket text frames
//!   and the compact 8-byte binary pointer frame.
//!
//! - **`keymap`** – Translation of DOM `KeyboardEvent.key` / `.code` strings
//!   into the key names understood by the input actuator.
//!
//! - **`input`** – Event classes and priority ranks, the per-class pending
//!   queue with pointer-move coalescing, the pointer motion filter, and the
//!   held-input tracker used to avoid stuck keys and buttons.

pub mod domain;
pub mod input;
pub mod keymap;
pub mod protocol;

// Re-export the most-used types at the crate root so callers can write
// `screenlink_core::EndpointId` instead of the full module path.
pub use domain::endpoint::{EndpointId, EndpointIdAllocator, Role};
pub use input::{EventClass, HeldInputs, MotionFilter, PendingEvents};
pub use keymap::{actuator_key, Modifier};
pub use protocol::codec::{decode_pointer_frame, parse_client_message, ProtocolError};
pub use protocol::messages::{ClientMessage, ControlAction, ServerMessage};
