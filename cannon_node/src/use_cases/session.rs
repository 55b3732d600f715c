// Session task: the single owner of directory, synchronizer and animation state.

use crate::domain::ports::{Overlay, PeerLink, ShotRng};
use crate::domain::{InstanceId, PeerMessage, ShotEnding, TrajectoryAnnouncement};
use crate::use_cases::animator::AnimationRegistry;
use crate::use_cases::directory::{Observation, PeerDirectory};
use crate::use_cases::synchronizer::{RemotePlan, TrajectorySynchronizer, plan_receipt};
use crate::use_cases::types::{SessionEvent, StatusEvent};
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Notify, broadcast, mpsc};
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

const RECENT_SHOT_CAPACITY: usize = 256;

/// Bounded memory of announcements already handled. Mutually dialed peers deliver every
/// broadcast twice; the second copy must not animate again.
#[derive(Debug, Default)]
struct RecentShots {
    order: VecDeque<(String, u64)>,
    seen: HashSet<(String, u64)>,
}

impl RecentShots {
    /// Returns false if the shot was already seen.
    fn insert(&mut self, sender: &InstanceId, seq: u64) -> bool {
        let key = (sender.as_str().to_string(), seq);
        if !self.seen.insert(key.clone()) {
            return false;
        }
        self.order.push_back(key);
        if self.order.len() > RECENT_SHOT_CAPACITY {
            if let Some(oldest) = self.order.pop_front() {
                self.seen.remove(&oldest);
            }
        }
        true
    }
}

pub struct Session<R> {
    directory: PeerDirectory,
    synchronizer: TrajectorySynchronizer<R>,
    animations: AnimationRegistry,
    link: Arc<dyn PeerLink>,
    overlay: Box<dyn Overlay>,
    status_tx: broadcast::Sender<StatusEvent>,
    next_seq: u64,
    recent: RecentShots,
}

impl<R> Session<R>
where
    R: ShotRng,
{
    pub fn new(
        local_id: InstanceId,
        synchronizer: TrajectorySynchronizer<R>,
        max_active_shots: usize,
        link: Arc<dyn PeerLink>,
        overlay: Box<dyn Overlay>,
        status_tx: broadcast::Sender<StatusEvent>,
    ) -> Self {
        let frame = synchronizer.frame();
        Self {
            directory: PeerDirectory::new(local_id),
            synchronizer,
            animations: AnimationRegistry::new(frame, max_active_shots),
            link,
            overlay,
            status_tx,
            next_seq: 1,
            recent: RecentShots::default(),
        }
    }

    pub fn animations(&self) -> &AnimationRegistry {
        &self.animations
    }

    pub fn directory(&self) -> &PeerDirectory {
        &self.directory
    }

    pub fn handle(&mut self, event: SessionEvent, now: Instant) {
        match event {
            SessionEvent::Launch { origin, direction } => {
                let direction = direction.unwrap_or_else(|| self.synchronizer.direction());
                let plan = match self.synchronizer.plan_launch(origin, direction) {
                    Ok(plan) => plan,
                    Err(e) => {
                        warn!(error = %e, x = origin.x, y = origin.y, "launch rejected");
                        self.status(StatusEvent::ShotRejected {
                            reason: e.to_string(),
                        });
                        return;
                    }
                };

                let shot_id = self.animations.schedule(plan.local_shot, now);
                let shot_seq = self.next_seq;
                self.next_seq += 1;
                let delay_ms = plan.params.delay_ms;

                info!(
                    shot_id,
                    shot_seq,
                    delay_ms,
                    direction = %direction,
                    kind = %plan.params.kind,
                    "shot launched"
                );
                self.link
                    .publish(PeerMessage::Trajectory(TrajectoryAnnouncement {
                        params: plan.params,
                        sender_id: Some(self.directory.local_id().clone()),
                        shot_seq: Some(shot_seq),
                    }));
                self.status(StatusEvent::ShotLaunched { shot_id, delay_ms });
            }
            SessionEvent::DirectionChanged(direction) => {
                info!(%direction, "launch direction changed");
                self.synchronizer.set_direction(direction);
            }
            SessionEvent::ServiceResolved(record) => match self.directory.observe(&record) {
                Observation::NewPeer(peer) => {
                    info!(%peer, name = %record.name, "peer discovered");
                    self.link.connect(&peer);
                    self.status(StatusEvent::PeerDiscovered { peer });
                }
                Observation::SelfAnnouncement => {
                    debug!(name = %record.name, "ignoring own announcement");
                }
                Observation::AlreadyKnown => {
                    debug!(name = %record.name, "peer already known");
                }
            },
            SessionEvent::MessageReceived { conn_id, message } => match message {
                PeerMessage::Trajectory(announcement) => {
                    self.receive_trajectory(conn_id, announcement, now);
                }
                PeerMessage::PointImpact(at) => {
                    debug!(conn_id, x = at.x, y = at.y, "point impact received");
                    self.overlay.point_impact(at);
                }
            },
            SessionEvent::SendPointImpact(at) => {
                self.link.publish(PeerMessage::PointImpact(at));
            }
        }
    }

    /// Advances every shot; called once per tick.
    pub fn tick(&mut self, now: Instant) {
        for (shot_id, outcome) in self.animations.tick(now, self.overlay.as_mut()) {
            debug!(shot_id, ?outcome, "shot finished");
        }
    }

    /// Ends every shot without effects.
    pub fn shutdown(&mut self) {
        let discarded = self.animations.discard_all(self.overlay.as_mut());
        if !discarded.is_empty() {
            info!(count = discarded.len(), "discarded in-flight shots");
        }
    }

    fn receive_trajectory(
        &mut self,
        conn_id: u64,
        announcement: TrajectoryAnnouncement,
        now: Instant,
    ) {
        if let Some(sender) = &announcement.sender_id {
            if sender == self.directory.local_id() {
                debug!(conn_id, "dropping own echo");
                return;
            }
            if let Some(seq) = announcement.shot_seq {
                if !self.recent.insert(sender, seq) {
                    debug!(conn_id, %sender, seq, "dropping duplicate shot");
                    return;
                }
            }
        }

        let delay_ms = announcement.params.delay_ms;
        match plan_receipt(&announcement.params) {
            RemotePlan::Scheduled(plan) => {
                let lands = matches!(plan.ending, ShotEnding::Impact(_));
                let shot_id = self.animations.schedule(plan, now);
                info!(conn_id, shot_id, delay_ms, lands, "remote shot scheduled");
                self.status(StatusEvent::ShotScheduled {
                    shot_id,
                    delay_ms,
                    lands,
                });
            }
            RemotePlan::Discarded(reason) => {
                info!(conn_id, %reason, "remote shot discarded");
                self.status(StatusEvent::ShotDiscarded {
                    reason: reason.to_string(),
                });
            }
        }
    }

    fn status(&self, event: StatusEvent) {
        // No subscribers is fine.
        let _ = self.status_tx.send(event);
    }
}

pub async fn session_task<R>(
    mut session: Session<R>,
    mut events_rx: mpsc::Receiver<SessionEvent>,
    tick_interval: Duration,
    shutdown: Arc<Notify>,
) where
    R: ShotRng + 'static,
{
    // Drive the fixed-step animation loop at the configured tick rate.
    let mut interval = tokio::time::interval(tick_interval);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = shutdown.notified() => {
                break;
            }
            _ = interval.tick() => {}
        }

        let now = Instant::now();
        let mut closed = false;
        loop {
            match events_rx.try_recv() {
                Ok(event) => session.handle(event, now),
                Err(mpsc::error::TryRecvError::Empty) => break,
                Err(mpsc::error::TryRecvError::Disconnected) => {
                    closed = true;
                    break;
                }
            }
        }

        session.tick(now);

        if closed {
            debug!("event channel closed");
            break;
        }
    }

    session.shutdown();
    info!("session stopped");
}
