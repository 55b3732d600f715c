// Closed-form parabolic motion over normalized screen coordinates.
//
// Everything here is a direct algebraic evaluation so two processes given the same inputs
// compute bit-identical results.

use super::trajectory::{EPSILON, TrajectoryParams};

/// Vertical state of a shot at the moment it crosses an exit boundary.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExitState {
    /// Seconds from the shot origin.
    pub t: f64,
    pub y: f64,
    pub vy: f64,
}

pub fn position_at(params: &TrajectoryParams, t: f64) -> (f64, f64) {
    let x = params.sx + params.vx * t;
    let y = params.sy + params.vy * t + 0.5 * params.g * t * t;
    (x, y)
}

pub fn velocity_y_at(params: &TrajectoryParams, t: f64) -> f64 {
    params.vy + params.g * t
}

/// Time at which the shot reaches `x_target`, or `None` if it never does.
pub fn time_to_reach_x(params: &TrajectoryParams, x_target: f64) -> Option<f64> {
    if params.vx.abs() < EPSILON {
        return None;
    }
    let t = (x_target - params.sx) / params.vx;
    (t >= 0.0).then_some(t)
}

/// Time at which a body at `y0` moving with `vy0` under `g` reaches `y_target`.
///
/// Picks the larger root, i.e. the descending crossing after any apex, clamped to zero.
/// With `g ~ 0` the motion is linear. `None` means the height is never reached.
pub fn time_to_reach_y(y0: f64, vy0: f64, g: f64, y_target: f64) -> Option<f64> {
    if g.abs() < EPSILON {
        if vy0.abs() < EPSILON {
            return None;
        }
        let t = (y_target - y0) / vy0;
        return (t >= 0.0).then_some(t);
    }

    let a = 0.5 * g;
    let b = vy0;
    let c = y0 - y_target;
    let discriminant = b * b - 4.0 * a * c;
    if discriminant < 0.0 {
        return None;
    }

    let root = discriminant.sqrt();
    let t1 = (-b + root) / (2.0 * a);
    let t2 = (-b - root) / (2.0 * a);
    Some(t1.max(t2).max(0.0))
}

/// `(t, y, vy)` when the shot crosses `exit_x`. Sender and receiver both call this on the same
/// parameters; the result is the shared source of truth for the hand-off.
pub fn exit_state(params: &TrajectoryParams, exit_x: f64) -> Option<ExitState> {
    let t = time_to_reach_x(params, exit_x)?;
    let (_, y) = position_at(params, t);
    Some(ExitState {
        t,
        y,
        vy: velocity_y_at(params, t),
    })
}

/// Smallest y (highest point on screen) the body reaches from this state going forward.
pub fn min_reachable_y(y: f64, vy: f64, g: f64) -> f64 {
    if vy < 0.0 && g > EPSILON {
        y - vy * vy / (2.0 * g)
    } else {
        y
    }
}
