// Per-shot animation state and the terminal outcomes a shot can reach.

use super::frame::ScreenFrame;
use super::trajectory::{ProjectileKind, TrajectoryParams};
use tokio::time::Instant;

/// Process-local identifier handed to the render callback.
pub type ShotId = u64;

/// How an animating shot ends once its terminal time is reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShotEnding {
    /// Leaves the screen (or stops at its terminal time) with no effect.
    Silent,
    /// Plays the impact effect at its final position.
    Impact(ProjectileKind),
}

/// Terminal states. Only `Landed` produces a visible effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShotOutcome {
    ExitedSilently,
    Landed,
    Discarded,
}

/// Non-terminal states a shot passes through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShotPhase {
    Scheduled,
    Animating,
}

/// One active shot. Owned by the animation registry that created it; nothing else mutates it.
#[derive(Debug, Clone)]
pub struct ProjectileState {
    pub id: ShotId,
    pub params: TrajectoryParams,
    pub frame: ScreenFrame,
    pub started_at: Instant,
    /// Seconds after `started_at` at which the shot ends.
    pub terminal_t: f64,
    pub ending: ShotEnding,
    /// Seconds elapsed as of the last tick.
    pub t: f64,
}
