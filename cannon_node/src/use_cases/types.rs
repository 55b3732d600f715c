// Use-case level inputs/outputs for the session task.

use crate::domain::{Direction, Peer, PeerMessage, PixelPoint, ShotId};
use std::net::SocketAddr;

/// A discovery record after resolution, before self-filtering and deduplication.
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceRecord {
    pub name: String,
    pub instance_id: Option<String>,
    pub host: String,
    pub port: u16,
}

/// Everything the session task reacts to. Network and host code only ever send these; they
/// never touch session state directly.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// Host asked for a launch; `None` uses the configured direction.
    Launch {
        origin: PixelPoint,
        direction: Option<Direction>,
    },
    DirectionChanged(Direction),
    ServiceResolved(ServiceRecord),
    MessageReceived { conn_id: u64, message: PeerMessage },
    /// Broadcast a legacy point effect to every peer.
    SendPointImpact(PixelPoint),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnDirection {
    Inbound,
    Outbound,
}

/// Status notifications for the host (log panes, indicators). Never required for correctness.
#[derive(Debug, Clone, PartialEq)]
pub enum StatusEvent {
    Listening {
        addr: SocketAddr,
    },
    Advertising {
        name: String,
    },
    DiscoveryFailed {
        error: String,
    },
    PeerDiscovered {
        peer: Peer,
    },
    Connected {
        conn_id: u64,
        addr: SocketAddr,
        direction: ConnDirection,
    },
    DialFailed {
        address: String,
        error: String,
    },
    Disconnected {
        conn_id: u64,
        addr: SocketAddr,
    },
    ShotLaunched {
        shot_id: ShotId,
        delay_ms: u64,
    },
    ShotRejected {
        reason: String,
    },
    ShotScheduled {
        shot_id: ShotId,
        delay_ms: u64,
        lands: bool,
    },
    ShotDiscarded {
        reason: String,
    },
}
