// Projectile animator: delayed starts, per-tick rendering and terminal handling.

use crate::domain::kinematics;
use crate::domain::ports::Overlay;
use crate::domain::{ProjectileState, ScreenFrame, ShotEnding, ShotId, ShotOutcome, ShotPhase};
use crate::use_cases::synchronizer::ShotPlan;
use std::collections::VecDeque;
use tokio::time::Instant;

#[derive(Debug)]
struct PendingShot {
    id: ShotId,
    start_at: Instant,
    plan: ShotPlan,
}

/// Owns every scheduled and animating shot on this screen.
///
/// Shots are independent: each follows its own clock from its scheduled start, so a late tick
/// never shifts a trajectory, it only skips frames.
#[derive(Debug)]
pub struct AnimationRegistry {
    frame: ScreenFrame,
    max_active: usize,
    next_id: ShotId,
    pending: Vec<PendingShot>,
    active: VecDeque<ProjectileState>,
}

impl AnimationRegistry {
    pub fn new(frame: ScreenFrame, max_active: usize) -> Self {
        Self {
            frame,
            max_active: max_active.max(1),
            next_id: 1,
            pending: Vec::new(),
            active: VecDeque::new(),
        }
    }

    /// Queues a shot to start `plan.delay` after `now`.
    pub fn schedule(&mut self, plan: ShotPlan, now: Instant) -> ShotId {
        let id = self.next_id;
        self.next_id += 1;
        self.pending.push(PendingShot {
            id,
            start_at: now + plan.delay,
            plan,
        });
        id
    }

    pub fn phase(&self, id: ShotId) -> Option<ShotPhase> {
        if self.active.iter().any(|shot| shot.id == id) {
            Some(ShotPhase::Animating)
        } else if self.pending.iter().any(|shot| shot.id == id) {
            Some(ShotPhase::Scheduled)
        } else {
            None
        }
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    /// Advances every shot to `now`.
    ///
    /// Each animating shot is rendered once. A shot reaching its terminal time is rendered at
    /// its final position, gets its impact effect if it lands, and is then reported finished.
    pub fn tick(&mut self, now: Instant, overlay: &mut dyn Overlay) -> Vec<(ShotId, ShotOutcome)> {
        let mut finished = Vec::new();
        self.promote_due(now, overlay, &mut finished);

        let frame = self.frame;
        let mut still_active = VecDeque::with_capacity(self.active.len());
        for mut shot in self.active.drain(..) {
            let elapsed = now.saturating_duration_since(shot.started_at).as_secs_f64();
            shot.t = elapsed.min(shot.terminal_t);

            let (nx, ny) = kinematics::position_at(&shot.params, shot.t);
            let at = frame.denormalize(nx, ny);
            overlay.render(shot.id, at);

            if elapsed < shot.terminal_t {
                still_active.push_back(shot);
                continue;
            }

            let outcome = match shot.ending {
                ShotEnding::Impact(kind) => {
                    overlay.impact(at, kind);
                    ShotOutcome::Landed
                }
                ShotEnding::Silent => ShotOutcome::ExitedSilently,
            };
            overlay.shot_finished(shot.id, outcome);
            finished.push((shot.id, outcome));
        }
        self.active = still_active;

        finished
    }

    /// Drops every shot without effects, reporting each as discarded.
    pub fn discard_all(&mut self, overlay: &mut dyn Overlay) -> Vec<(ShotId, ShotOutcome)> {
        let ids: Vec<ShotId> = self
            .active
            .drain(..)
            .map(|shot| shot.id)
            .chain(self.pending.drain(..).map(|shot| shot.id))
            .collect();

        ids.into_iter()
            .map(|id| {
                overlay.shot_finished(id, ShotOutcome::Discarded);
                (id, ShotOutcome::Discarded)
            })
            .collect()
    }

    fn promote_due(
        &mut self,
        now: Instant,
        overlay: &mut dyn Overlay,
        finished: &mut Vec<(ShotId, ShotOutcome)>,
    ) {
        let mut due: Vec<PendingShot> = Vec::new();
        let mut index = 0;
        while index < self.pending.len() {
            if self.pending[index].start_at <= now {
                due.push(self.pending.swap_remove(index));
            } else {
                index += 1;
            }
        }
        due.sort_by_key(|shot| (shot.start_at, shot.id));

        for shot in due {
            if self.active.len() >= self.max_active {
                if let Some(oldest) = self.active.pop_front() {
                    tracing::debug!(shot_id = oldest.id, "evicting oldest shot");
                    overlay.shot_finished(oldest.id, ShotOutcome::ExitedSilently);
                    finished.push((oldest.id, ShotOutcome::ExitedSilently));
                }
            }

            self.active.push_back(ProjectileState {
                id: shot.id,
                params: shot.plan.params,
                frame: self.frame,
                started_at: shot.start_at,
                terminal_t: shot.plan.terminal_t,
                ending: shot.plan.ending,
                t: 0.0,
            });
        }
    }
}
