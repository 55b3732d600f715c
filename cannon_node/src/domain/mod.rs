// Domain layer: normalized screen geometry, trajectory records and the pure kinematics.

pub mod errors;
pub mod frame;
pub mod kinematics;
pub mod message;
pub mod peer;
pub mod ports;
pub mod state;
pub mod trajectory;
pub mod tuning;

pub use errors::TrajectoryError;
pub use frame::{PixelPoint, ScreenFrame};
pub use message::{PeerMessage, TrajectoryAnnouncement};
pub use peer::{InstanceId, Peer};
pub use state::{ProjectileState, ShotEnding, ShotId, ShotOutcome, ShotPhase};
pub use trajectory::{Direction, ProjectileColor, ProjectileKind, TrajectoryParams};
