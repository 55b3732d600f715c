// Trajectory synchronizer: plans the local half of a launch and the remote continuation of a
// received shot. Pure planning; the session task does the I/O and owns the animation.

use crate::domain::kinematics::{self, ExitState};
use crate::domain::ports::ShotRng;
use crate::domain::tuning::CannonTuning;
use crate::domain::{
    Direction, PixelPoint, ProjectileColor, ProjectileKind, ScreenFrame, ShotEnding,
    TrajectoryError, TrajectoryParams,
};
use std::fmt;
use std::time::Duration;

/// Longest wait accepted before a received shot enters this screen. A sender's delay is the
/// flight time to its own edge, which stays well under this for any sane tuning.
pub const MAX_RECEIPT_DELAY: Duration = Duration::from_secs(30);

/// What the animator needs to run one shot.
#[derive(Debug, Clone, PartialEq)]
pub struct ShotPlan {
    /// Trajectory in this screen's coordinates, starting at t = 0.
    pub params: TrajectoryParams,
    pub terminal_t: f64,
    pub ending: ShotEnding,
    /// Wait before the shot becomes active.
    pub delay: Duration,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LaunchPlan {
    /// Parameters to announce to peers.
    pub params: TrajectoryParams,
    /// State at the local exit boundary.
    pub exit: ExitState,
    /// Local animation up to the exit boundary. Never impacts.
    pub local_shot: ShotPlan,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DiscardReason {
    Invalid(TrajectoryError),
    /// The sender's exit boundary cannot be reached, so the shot never leaves its screen.
    NeverLeavesSender,
    /// The landing height has no real solution from the exit state.
    LandingUnreachable,
    /// The shot lands before it crosses into this screen.
    LandsBeforeVisible,
    /// The announced delay exceeds [`MAX_RECEIPT_DELAY`].
    DelayTooLong,
}

impl fmt::Display for DiscardReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiscardReason::Invalid(e) => write!(f, "invalid trajectory: {e}"),
            DiscardReason::NeverLeavesSender => f.write_str("shot never leaves the sender"),
            DiscardReason::LandingUnreachable => f.write_str("landing height is unreachable"),
            DiscardReason::LandsBeforeVisible => f.write_str("shot lands before it is visible"),
            DiscardReason::DelayTooLong => f.write_str("announced delay is too long"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RemotePlan {
    Scheduled(ShotPlan),
    Discarded(DiscardReason),
}

pub struct TrajectorySynchronizer<R> {
    tuning: CannonTuning,
    frame: ScreenFrame,
    direction: Direction,
    color: ProjectileColor,
    rng: R,
}

impl<R> TrajectorySynchronizer<R>
where
    R: ShotRng,
{
    pub fn new(
        tuning: CannonTuning,
        frame: ScreenFrame,
        direction: Direction,
        color: ProjectileColor,
        rng: R,
    ) -> Self {
        Self {
            tuning,
            frame,
            direction,
            color,
            rng,
        }
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn set_direction(&mut self, direction: Direction) {
        self.direction = direction;
    }

    pub fn frame(&self) -> ScreenFrame {
        self.frame
    }

    /// Plans a launch from a pixel origin.
    ///
    /// Samples, in order: projectile kind (when enabled), gravity, peak height, speed and the
    /// receiver's landing height.
    pub fn plan_launch(
        &mut self,
        origin: PixelPoint,
        direction: Direction,
    ) -> Result<LaunchPlan, TrajectoryError> {
        let (sx, sy) = self.frame.normalize(origin);

        let kind = if self.tuning.kinds_enabled {
            let roll = self.rng.uniform(0.0, 1.0);
            self.tuning.kinds.pick(roll)
        } else {
            ProjectileKind::Default
        };

        let g = self.sample(self.tuning.gravity.min, self.tuning.gravity.max);
        let peak = self.sample(self.tuning.peak_height.min, self.tuning.peak_height.max);
        let speed = self.sample(self.tuning.speed.min, self.tuning.speed.max)
            * self.tuning.kinds.spec(kind).speed_multiplier;

        let mut params = TrajectoryParams {
            sx,
            sy,
            vx: direction.sign() * speed,
            // Upward launch reaching `peak` above the origin.
            vy: -(2.0 * g * peak.max(0.0)).sqrt(),
            g,
            direction,
            delay_ms: 0,
            landing_y: None,
            color: self.color,
            kind,
        };
        params.validate()?;

        let exit = kinematics::exit_state(&params, direction.exit_x())
            .ok_or(TrajectoryError::ExitUnreachable)?;
        params.delay_ms = (exit.t * 1000.0).round() as u64;

        let y_min = kinematics::min_reachable_y(exit.y, exit.vy, g);
        let low = self
            .tuning
            .landing_min
            .max(y_min + self.tuning.landing_clearance);
        let mut high = self.tuning.landing_max;
        if high <= low {
            high = low + self.tuning.landing_widen;
        }
        params.landing_y = Some(self.sample(low, high));

        let local_shot = ShotPlan {
            params: params.clone(),
            terminal_t: exit.t,
            ending: ShotEnding::Silent,
            delay: Duration::ZERO,
        };

        Ok(LaunchPlan {
            params,
            exit,
            local_shot,
        })
    }

    fn sample(&mut self, low: f64, high: f64) -> f64 {
        self.rng.uniform(low, high)
    }
}

/// Reconstructs a received shot on this screen.
///
/// The exit state is recomputed from the announced parameters rather than trusted from the
/// wire, so both ends agree on it exactly.
pub fn plan_receipt(params: &TrajectoryParams) -> RemotePlan {
    if let Err(e) = params.validate() {
        return RemotePlan::Discarded(DiscardReason::Invalid(e));
    }
    let delay = Duration::from_millis(params.delay_ms);
    if delay > MAX_RECEIPT_DELAY {
        return RemotePlan::Discarded(DiscardReason::DelayTooLong);
    }

    let direction = params.direction;
    let Some(exit) = kinematics::exit_state(params, direction.exit_x()) else {
        return RemotePlan::Discarded(DiscardReason::NeverLeavesSender);
    };

    let remote = params.continued_from(direction.entry_x(), exit.y, exit.vy);
    // Both are reachable: `remote` starts outside the screen moving inward.
    let t_visible = kinematics::time_to_reach_x(&remote, direction.visible_edge_x()).unwrap_or(0.0);
    let t_reexit = kinematics::time_to_reach_x(&remote, direction.exit_x()).unwrap_or(0.0);

    let (terminal_t, ending) = match params.landing_y {
        None => (t_reexit, ShotEnding::Silent),
        Some(landing_y) => {
            let Some(t_land) = kinematics::time_to_reach_y(exit.y, exit.vy, params.g, landing_y)
            else {
                return RemotePlan::Discarded(DiscardReason::LandingUnreachable);
            };
            if t_land < t_visible {
                return RemotePlan::Discarded(DiscardReason::LandsBeforeVisible);
            }

            if t_land <= t_reexit {
                let (x, y) = kinematics::position_at(&remote, t_land);
                let ending = if ScreenFrame::contains_normalized(x, y) {
                    ShotEnding::Impact(params.kind)
                } else {
                    ShotEnding::Silent
                };
                (t_land, ending)
            } else {
                (t_reexit, ShotEnding::Silent)
            }
        }
    };

    RemotePlan::Scheduled(ShotPlan {
        params: remote,
        terminal_t,
        ending,
        delay,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::tuning::Range;
    use crate::use_cases::test_support::ScriptedRng;

    const TOL: f64 = 1e-9;

    fn reference(landing_y: Option<f64>) -> TrajectoryParams {
        TrajectoryParams {
            sx: 0.5,
            sy: 0.5,
            vx: 1.0,
            vy: -1.0,
            g: 2.0,
            direction: Direction::LeftToRight,
            delay_ms: 550,
            landing_y,
            color: ProjectileColor::default(),
            kind: ProjectileKind::Missile,
        }
    }

    fn scheduled(plan: RemotePlan) -> ShotPlan {
        match plan {
            RemotePlan::Scheduled(shot) => shot,
            RemotePlan::Discarded(reason) => panic!("expected scheduled shot, got {reason}"),
        }
    }

    fn synchronizer(tuning: CannonTuning, fractions: &[f64]) -> TrajectorySynchronizer<ScriptedRng> {
        TrajectorySynchronizer::new(
            tuning,
            ScreenFrame::sized(1920.0, 1080.0),
            Direction::LeftToRight,
            ProjectileColor::default(),
            ScriptedRng::new(fractions),
        )
    }

    fn plain_tuning() -> CannonTuning {
        CannonTuning {
            kinds_enabled: false,
            ..CannonTuning::default()
        }
    }

    #[test]
    fn when_reference_shot_is_received_then_it_continues_from_the_opposite_edge_and_lands() {
        let shot = scheduled(plan_receipt(&reference(Some(0.6))));

        assert!((shot.params.sx + 0.05).abs() < TOL);
        assert!((shot.params.sy - 0.2525).abs() < TOL);
        assert!((shot.params.vy - 0.1).abs() < TOL);
        assert_eq!(shot.params.g, 2.0);
        assert_eq!(shot.delay, Duration::from_millis(550));

        // t^2 + 0.1 t - 0.3475 = 0, larger root.
        let expected_t = (-0.1 + (0.01f64 + 1.39).sqrt()) / 2.0;
        assert!((shot.terminal_t - expected_t).abs() < TOL);
        assert_eq!(shot.ending, ShotEnding::Impact(ProjectileKind::Missile));

        let (x, y) = kinematics::position_at(&shot.params, shot.terminal_t);
        assert!(ScreenFrame::contains_normalized(x, y));
        assert!((y - 0.6).abs() < TOL);
    }

    #[test]
    fn when_shot_flies_right_to_left_then_it_enters_from_the_right_edge() {
        let mut params = reference(Some(0.6));
        params.vx = -1.0;
        params.direction = Direction::RightToLeft;

        let shot = scheduled(plan_receipt(&params));

        assert!((shot.params.sx - 1.05).abs() < TOL);
        assert!((shot.params.sy - 0.2525).abs() < TOL);
        let (x, _) = kinematics::position_at(&shot.params, shot.terminal_t);
        assert!(x > 0.0 && x < 1.0);
        assert!(matches!(shot.ending, ShotEnding::Impact(_)));
    }

    #[test]
    fn when_landing_happens_before_the_shot_is_visible_then_it_is_discarded() {
        let params = TrajectoryParams {
            sx: 0.95,
            sy: 0.2,
            vx: 0.1,
            vy: -0.6,
            g: 1.0,
            direction: Direction::LeftToRight,
            delay_ms: 1000,
            landing_y: Some(0.2),
            color: ProjectileColor::default(),
            kind: ProjectileKind::Default,
        };

        assert_eq!(
            plan_receipt(&params),
            RemotePlan::Discarded(DiscardReason::LandsBeforeVisible)
        );
    }

    #[test]
    fn when_announced_delay_is_absurd_then_the_shot_is_not_parked() {
        let mut params = reference(Some(0.6));
        params.delay_ms = u64::MAX;
        assert_eq!(
            plan_receipt(&params),
            RemotePlan::Discarded(DiscardReason::DelayTooLong)
        );

        params.delay_ms = MAX_RECEIPT_DELAY.as_millis() as u64;
        let shot = scheduled(plan_receipt(&params));
        assert_eq!(shot.delay, MAX_RECEIPT_DELAY);
    }

    #[test]
    fn when_landing_height_is_above_the_apex_then_it_is_discarded() {
        assert_eq!(
            plan_receipt(&reference(Some(0.1))),
            RemotePlan::Discarded(DiscardReason::LandingUnreachable)
        );
    }

    #[test]
    fn when_no_landing_height_is_sent_then_the_shot_transits_silently() {
        let shot = scheduled(plan_receipt(&reference(None)));

        assert!((shot.terminal_t - 1.1).abs() < TOL);
        assert_eq!(shot.ending, ShotEnding::Silent);
    }

    #[test]
    fn when_shot_re_exits_before_landing_then_it_leaves_without_impact() {
        let mut params = reference(Some(0.95));
        params.vx = 3.0;

        let shot = scheduled(plan_receipt(&params));

        assert!((shot.terminal_t - 1.1 / 3.0).abs() < TOL);
        assert_eq!(shot.ending, ShotEnding::Silent);
    }

    #[test]
    fn when_landing_point_is_below_the_frame_then_there_is_no_impact() {
        let shot = scheduled(plan_receipt(&reference(Some(1.2))));

        assert!(shot.terminal_t < 1.1);
        assert_eq!(shot.ending, ShotEnding::Silent);
    }

    #[test]
    fn when_vx_contradicts_direction_then_receipt_is_discarded() {
        let mut params = reference(Some(0.6));
        params.vx = -1.0;

        assert_eq!(
            plan_receipt(&params),
            RemotePlan::Discarded(DiscardReason::Invalid(TrajectoryError::VelocityMismatch))
        );
    }

    #[test]
    fn when_launching_then_delay_matches_time_to_local_exit() {
        let mut sync = synchronizer(plain_tuning(), &[]);

        let plan = sync
            .plan_launch(PixelPoint::new(960.0, 540.0), Direction::LeftToRight)
            .expect("launch plan");

        assert_eq!(plan.params.sx, 0.5);
        assert_eq!(plan.params.sy, 0.5);
        assert!((plan.params.g - 2.55).abs() < TOL);
        assert!((plan.params.vx - 0.9).abs() < TOL);
        assert!((plan.params.vy + (2.0f64 * 2.55 * 0.5).sqrt()).abs() < TOL);
        assert!((plan.exit.t - 0.55 / 0.9).abs() < TOL);
        assert_eq!(plan.params.delay_ms, (plan.exit.t * 1000.0).round() as u64);
        assert_eq!(plan.params.kind, ProjectileKind::Default);

        assert_eq!(plan.local_shot.ending, ShotEnding::Silent);
        assert_eq!(plan.local_shot.delay, Duration::ZERO);
        assert_eq!(plan.local_shot.terminal_t, plan.exit.t);
    }

    #[test]
    fn when_launching_right_to_left_then_velocity_points_left() {
        let mut sync = synchronizer(plain_tuning(), &[]);

        let plan = sync
            .plan_launch(PixelPoint::new(960.0, 540.0), Direction::RightToLeft)
            .expect("launch plan");

        assert!(plan.params.vx < 0.0);
        assert_eq!(plan.params.direction, Direction::RightToLeft);
        assert!((plan.exit.t - 0.55 / 0.9).abs() < TOL);
    }

    #[test]
    fn sender_and_receiver_agree_on_the_exit_state() {
        let mut sync = synchronizer(plain_tuning(), &[0.1, 0.9, 0.3, 0.7]);
        let plan = sync
            .plan_launch(PixelPoint::new(300.0, 900.0), Direction::LeftToRight)
            .expect("launch plan");

        let shot = scheduled(plan_receipt(&plan.params));

        assert_eq!(shot.params.sy, plan.exit.y);
        assert_eq!(shot.params.vy, plan.exit.vy);
        assert_eq!(shot.delay, Duration::from_millis(plan.params.delay_ms));
    }

    #[test]
    fn landing_height_is_never_above_the_reachable_apex() {
        let origins = [
            PixelPoint::new(0.0, 0.0),
            PixelPoint::new(960.0, 540.0),
            PixelPoint::new(1900.0, 1000.0),
            PixelPoint::new(100.0, 1080.0),
        ];
        let fractions = [0.0, 0.25, 0.5, 0.75, 0.999];

        for origin in origins {
            for &f in &fractions {
                let mut sync = synchronizer(plain_tuning(), &[f, 1.0 - f, f, f]);
                let plan = sync
                    .plan_launch(origin, Direction::LeftToRight)
                    .expect("launch plan");

                let y_min =
                    kinematics::min_reachable_y(plan.exit.y, plan.exit.vy, plan.params.g);
                let landing_y = plan.params.landing_y.expect("landing height");
                assert!(landing_y >= y_min + 0.02 - TOL, "landing {landing_y} y_min {y_min}");
                assert!(landing_y >= 0.05);
            }
        }
    }

    #[test]
    fn when_landing_band_collapses_then_upper_bound_is_widened() {
        let tuning = CannonTuning {
            peak_height: Range::new(0.0, 0.0),
            ..plain_tuning()
        };
        let mut sync = synchronizer(tuning, &[0.5, 0.5, 0.5, 1.0]);

        let plan = sync
            .plan_launch(PixelPoint::new(1800.0, 1000.0), Direction::LeftToRight)
            .expect("launch plan");

        // Dropped from low on the screen with no upward speed: exits below the landing band.
        let low = plan.exit.y + 0.02;
        assert!(low > 0.90);
        let landing_y = plan.params.landing_y.expect("landing height");
        assert!((landing_y - (low + 0.05)).abs() < TOL);
    }

    #[test]
    fn when_kinds_are_enabled_then_speed_uses_the_kind_multiplier() {
        // First roll picks the kind: 0.75 lands in the missile band.
        let mut sync = synchronizer(CannonTuning::default(), &[0.75]);

        let plan = sync
            .plan_launch(PixelPoint::new(960.0, 540.0), Direction::LeftToRight)
            .expect("launch plan");

        assert_eq!(plan.params.kind, ProjectileKind::Missile);
        assert!((plan.params.vx - 0.9 * 1.8).abs() < TOL);
    }

    #[test]
    fn direction_can_be_changed() {
        let mut sync = synchronizer(plain_tuning(), &[]);
        sync.set_direction(Direction::RightToLeft);
        assert_eq!(sync.direction(), Direction::RightToLeft);
    }
}
