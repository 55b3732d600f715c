// Peer-to-peer messages as the use cases see them, independent of the wire encoding.

use super::frame::PixelPoint;
use super::peer::InstanceId;
use super::trajectory::TrajectoryParams;

/// A shot handed to neighbouring screens, with the routing metadata used to drop echoes and
/// duplicates.
#[derive(Debug, Clone, PartialEq)]
pub struct TrajectoryAnnouncement {
    pub params: TrajectoryParams,
    pub sender_id: Option<InstanceId>,
    pub shot_seq: Option<u64>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PeerMessage {
    Trajectory(TrajectoryAnnouncement),
    /// Non-physical point effect at a pixel position (legacy `fire` action).
    PointImpact(PixelPoint),
}
