//! Fire-and-forget delivery to one endpoint.
//!
//! Each connection owns a bounded queue drained by its writer task.  The
//! relay only ever `try_send`s into it: a slow or dead endpoint loses
//! messages, it never stalls delivery to anyone else.  Dropping the last
//! [`Outbound`] for an endpoint closes its queue, which makes the writer
//! flush what is left and close the socket.

use screenlink_core::{EndpointId, ServerMessage};
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, warn};

/// Sending half of an endpoint's outbound queue.
#[derive(Debug, Clone)]
pub struct Outbound {
    id: EndpointId,
    tx: mpsc::Sender<ServerMessage>,
}

impl Outbound {
    /// Creates a queue of `capacity` messages for endpoint `id`.
    pub fn channel(id: EndpointId, capacity: usize) -> (Self, mpsc::Receiver<ServerMessage>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { id, tx }, rx)
    }

    pub fn id(&self) -> EndpointId {
        self.id
    }

    /// Queues `msg` without waiting.  Returns `false` if it was dropped.
    pub fn send(&self, msg: ServerMessage) -> bool {
        let kind = msg.type_name();
        match self.tx.try_send(msg) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                warn!(endpoint = %self.id, kind, "outbound queue full; message dropped");
                false
            }
            Err(TrySendError::Closed(_)) => {
                debug!(endpoint = %self.id, kind, "endpoint gone; message dropped");
                false
            }
        }
    }

    /// Whether the receiving side is gone.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}
