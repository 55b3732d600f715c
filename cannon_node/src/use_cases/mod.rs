// Use cases layer: discovery bookkeeping, shot planning and animation for one screen.

pub mod animator;
pub mod directory;
pub mod session;
pub mod synchronizer;
pub mod types;

#[cfg(test)]
mod test_support;

pub use animator::AnimationRegistry;
pub use directory::{Observation, PeerDirectory};
pub use session::{Session, session_task};
pub use synchronizer::{
    DiscardReason, LaunchPlan, RemotePlan, ShotPlan, TrajectorySynchronizer, plan_receipt,
};
pub use types::{ConnDirection, ServiceRecord, SessionEvent, StatusEvent};
