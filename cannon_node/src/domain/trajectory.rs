// Immutable per-shot records: direction, projectile kind, color and the trajectory itself.

use super::errors::TrajectoryError;
use std::fmt;
use std::str::FromStr;

/// Below this magnitude a velocity or acceleration is treated as zero.
pub const EPSILON: f64 = 1e-9;

/// Horizontal overshoot past the screen edge before a projectile counts as gone.
pub const EDGE_MARGIN: f64 = 0.05;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    LeftToRight,
    RightToLeft,
}

impl Direction {
    /// +1 for left-to-right, -1 for right-to-left.
    pub fn sign(self) -> f64 {
        match self {
            Direction::LeftToRight => 1.0,
            Direction::RightToLeft => -1.0,
        }
    }

    /// Normalized x at which a shot leaves the screen it is flying across.
    pub fn exit_x(self) -> f64 {
        match self {
            Direction::LeftToRight => 1.0 + EDGE_MARGIN,
            Direction::RightToLeft => -EDGE_MARGIN,
        }
    }

    /// Normalized x at which a shot coming from a neighbouring screen starts.
    pub fn entry_x(self) -> f64 {
        match self {
            Direction::LeftToRight => -EDGE_MARGIN,
            Direction::RightToLeft => 1.0 + EDGE_MARGIN,
        }
    }

    /// Normalized x at which an entering shot first becomes visible.
    pub fn visible_edge_x(self) -> f64 {
        match self {
            Direction::LeftToRight => 0.0,
            Direction::RightToLeft => 1.0,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Direction::LeftToRight => "left_to_right",
            Direction::RightToLeft => "right_to_left",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "left_to_right" | "ltr" => Ok(Direction::LeftToRight),
            "right_to_left" | "rtl" => Ok(Direction::RightToLeft),
            other => Err(format!("unknown direction {other:?}")),
        }
    }
}

/// Cosmetic projectile variants. The kind only changes launch speed and the impact effect the
/// host plays; it never changes how receivers reconstruct the trajectory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ProjectileKind {
    #[default]
    Default,
    Plane,
    Missile,
    Flashbang,
}

impl ProjectileKind {
    pub const ALL: [ProjectileKind; 4] = [
        ProjectileKind::Flashbang,
        ProjectileKind::Plane,
        ProjectileKind::Missile,
        ProjectileKind::Default,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ProjectileKind::Default => "default",
            ProjectileKind::Plane => "plane",
            ProjectileKind::Missile => "missile",
            ProjectileKind::Flashbang => "flashbang",
        }
    }

    /// Lenient parse for wire values; anything unknown is a plain projectile.
    pub fn from_wire(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "plane" => ProjectileKind::Plane,
            "missile" => ProjectileKind::Missile,
            "flashbang" => ProjectileKind::Flashbang,
            _ => ProjectileKind::Default,
        }
    }
}

impl fmt::Display for ProjectileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `#RRGGBB` projectile tint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProjectileColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl ProjectileColor {
    pub const GREY: ProjectileColor = ProjectileColor {
        r: 0x6e,
        g: 0x6e,
        b: 0x6e,
    };

    pub fn parse(value: &str) -> Option<Self> {
        let hex = value.trim().strip_prefix('#')?;
        if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }
        let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
        Some(Self {
            r: channel(0)?,
            g: channel(2)?,
            b: channel(4)?,
        })
    }
}

impl Default for ProjectileColor {
    fn default() -> Self {
        Self::GREY
    }
}

impl fmt::Display for ProjectileColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

/// One shot, in coordinates normalized to the sender's screen.
///
/// `g` is positive downward (screen y grows downward), so an upward launch has `vy < 0`.
#[derive(Debug, Clone, PartialEq)]
pub struct TrajectoryParams {
    pub sx: f64,
    pub sy: f64,
    pub vx: f64,
    pub vy: f64,
    pub g: f64,
    pub direction: Direction,
    /// How long a receiving peer waits before its own animation starts.
    pub delay_ms: u64,
    /// Landing height picked by the sender for the receiving screen.
    pub landing_y: Option<f64>,
    pub color: ProjectileColor,
    pub kind: ProjectileKind,
}

impl TrajectoryParams {
    /// Rejects non-finite values and a horizontal velocity that is ~0 or points the wrong way.
    pub fn validate(&self) -> Result<(), TrajectoryError> {
        let fields = [
            ("sx", self.sx),
            ("sy", self.sy),
            ("vx", self.vx),
            ("vy", self.vy),
            ("g", self.g),
        ];
        for (name, value) in fields {
            if !value.is_finite() {
                return Err(TrajectoryError::NonFinite(name));
            }
        }
        if let Some(landing_y) = self.landing_y {
            if !landing_y.is_finite() {
                return Err(TrajectoryError::NonFinite("landing_y"));
            }
        }

        if self.vx.abs() < EPSILON || self.vx.signum() != self.direction.sign() {
            return Err(TrajectoryError::VelocityMismatch);
        }
        Ok(())
    }

    /// Same shot continued from a different origin and vertical velocity.
    pub fn continued_from(&self, sx: f64, sy: f64, vy: f64) -> Self {
        Self {
            sx,
            sy,
            vy,
            ..self.clone()
        }
    }
}
