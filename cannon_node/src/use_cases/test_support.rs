use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use crate::domain::ports::{Overlay, PeerLink, ShotRng};
use crate::domain::{Peer, PeerMessage, PixelPoint, ProjectileKind, ShotId, ShotOutcome};

// Rng that returns scripted fractions of each requested range, then the midpoint.
pub(crate) struct ScriptedRng {
    fractions: VecDeque<f64>,
}

impl ScriptedRng {
    pub(crate) fn new(fractions: &[f64]) -> Self {
        Self {
            fractions: fractions.iter().copied().collect(),
        }
    }

    pub(crate) fn midpoints() -> Self {
        Self::new(&[])
    }
}

impl ShotRng for ScriptedRng {
    fn uniform(&mut self, low: f64, high: f64) -> f64 {
        let fraction = self.fractions.pop_front().unwrap_or(0.5);
        if high <= low {
            return low;
        }
        low + (high - low) * fraction
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum OverlayCall {
    Render(ShotId, PixelPoint),
    Impact(PixelPoint, ProjectileKind),
    Finished(ShotId, ShotOutcome),
}

// Overlay that records every callback so tests can inspect them afterwards.
#[derive(Clone, Default)]
pub(crate) struct RecordingOverlay {
    calls: Arc<Mutex<Vec<OverlayCall>>>,
}

impl RecordingOverlay {
    pub(crate) fn calls(&self) -> Vec<OverlayCall> {
        self.calls.lock().expect("overlay mutex poisoned").clone()
    }

    pub(crate) fn renders_for(&self, shot_id: ShotId) -> usize {
        self.calls()
            .iter()
            .filter(|call| matches!(call, OverlayCall::Render(id, _) if *id == shot_id))
            .count()
    }

    pub(crate) fn impacts(&self) -> Vec<(PixelPoint, ProjectileKind)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                OverlayCall::Impact(at, kind) => Some((at, kind)),
                _ => None,
            })
            .collect()
    }

    pub(crate) fn finished(&self) -> Vec<(ShotId, ShotOutcome)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                OverlayCall::Finished(id, outcome) => Some((id, outcome)),
                _ => None,
            })
            .collect()
    }
}

impl Overlay for RecordingOverlay {
    fn render(&mut self, shot_id: ShotId, at: PixelPoint) {
        let mut guard = self.calls.lock().expect("overlay mutex poisoned");
        guard.push(OverlayCall::Render(shot_id, at));
    }

    fn impact(&mut self, at: PixelPoint, kind: ProjectileKind) {
        let mut guard = self.calls.lock().expect("overlay mutex poisoned");
        guard.push(OverlayCall::Impact(at, kind));
    }

    fn shot_finished(&mut self, shot_id: ShotId, outcome: ShotOutcome) {
        let mut guard = self.calls.lock().expect("overlay mutex poisoned");
        guard.push(OverlayCall::Finished(shot_id, outcome));
    }
}

// Link that records published messages and dialed peers.
#[derive(Clone, Default)]
pub(crate) struct RecordingLink {
    published: Arc<Mutex<Vec<PeerMessage>>>,
    dialed: Arc<Mutex<Vec<Peer>>>,
}

impl RecordingLink {
    pub(crate) fn published(&self) -> Vec<PeerMessage> {
        self.published.lock().expect("link mutex poisoned").clone()
    }

    pub(crate) fn dialed(&self) -> Vec<Peer> {
        self.dialed.lock().expect("link mutex poisoned").clone()
    }
}

impl PeerLink for RecordingLink {
    fn publish(&self, message: PeerMessage) {
        let mut guard = self.published.lock().expect("link mutex poisoned");
        guard.push(message);
    }

    fn connect(&self, peer: &Peer) {
        let mut guard = self.dialed.lock().expect("link mutex poisoned");
        guard.push(peer.clone());
    }
}
