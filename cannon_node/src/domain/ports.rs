// Ports the use cases depend on; adapters and the host provide the implementations.

use crate::domain::frame::PixelPoint;
use crate::domain::message::PeerMessage;
use crate::domain::peer::Peer;
use crate::domain::state::{ShotId, ShotOutcome};
use crate::domain::trajectory::ProjectileKind;

/// Drawing surface owned by the host process.
pub trait Overlay: Send {
    /// Draw shot `shot_id` at `at` for the current tick.
    fn render(&mut self, shot_id: ShotId, at: PixelPoint);

    /// Play the impact effect for a shot that landed on this screen.
    fn impact(&mut self, at: PixelPoint, kind: ProjectileKind);

    /// Called exactly once when a shot stops animating, whatever the outcome.
    fn shot_finished(&mut self, _shot_id: ShotId, _outcome: ShotOutcome) {}

    /// Point effect requested by a peer's legacy `fire` message.
    fn point_impact(&mut self, at: PixelPoint) {
        self.impact(at, ProjectileKind::Default);
    }
}

/// Randomness for per-shot variation. Injected so planning can be made deterministic.
pub trait ShotRng: Send {
    /// Uniform sample in `[low, high)`; returns `low` when the range is empty.
    fn uniform(&mut self, low: f64, high: f64) -> f64;
}

/// Outbound side of the peer mesh. Delivery is best-effort and never reports failure.
pub trait PeerLink: Send + Sync {
    fn publish(&self, message: PeerMessage);

    /// Open a connection to a newly found peer (at most once per address).
    fn connect(&self, peer: &Peer);
}
