//! Endpoint identity: ids, roles, and the id allocator.
//!
//! # Why a monotonic counter instead of UUIDs?
//!
//! Endpoint ids travel in every signaling envelope (`clientId`, `hostId`,
//! `fromId`, `targetId`) and are read by browser code.  Small integers are
//! easy to log and compare, and a process-lifetime counter guarantees that an
//! id belonging to a disconnected endpoint is never handed to a new one, so a
//! late `targetId` can never be misrouted to a stranger.

use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Identifier of one live connection.
///
/// Serialized as a bare JSON number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EndpointId(pub u64);

impl fmt::Display for EndpointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The role an endpoint declares with its `register` message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Offers a stream and accepts control input.
    Host,
    /// Receives a stream and sends control input.
    Viewer,
}

impl Role {
    /// Returns the wire name of the role (`"host"` / `"viewer"`).
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Host => "host",
            Role::Viewer => "viewer",
        }
    }

    /// Returns the role on the other side of a session.
    pub fn opposite(self) -> Role {
        match self {
            Role::Host => Role::Viewer,
            Role::Viewer => Role::Host,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "host" => Ok(Role::Host),
            "viewer" => Ok(Role::Viewer),
            other => Err(format!("unknown role '{other}'")),
        }
    }
}

/// A thread-safe, monotonically increasing source of [`EndpointId`]s.
///
/// The first id handed out is `1`; `0` is never produced so that browser code
/// can treat a zero/absent id as "not yet registered".
///
/// # Examples
///
/// ```rust
/// use screenlink_core::domain::endpoint::{EndpointId, EndpointIdAllocator};
///
/// let ids = EndpointIdAllocator::new();
/// assert_eq!(ids.next(), EndpointId(1));
/// assert_eq!(ids.next(), EndpointId(2));
/// ```
pub struct EndpointIdAllocator {
    next: AtomicU64,
}

impl EndpointIdAllocator {
    /// Creates an allocator whose first id is `1`.
    pub fn new() -> Self {
        Self {
            next: AtomicU64::new(1),
        }
    }

    /// Returns a fresh id.
    ///
    /// `Relaxed` is enough: ids only need to be unique, they do not publish
    /// any other memory.
    pub fn next(&self) -> EndpointId {
        EndpointId(self.next.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns the id the next call to [`next`](Self::next) will produce.
    pub fn peek(&self) -> EndpointId {
        EndpointId(self.next.load(Ordering::Relaxed))
    }
}

impl Default for EndpointIdAllocator {
    fn default() -> Self {
        Self::new()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
