// Shot tuning for the cannon.
//
// Ranges are sampled per shot so trajectories look organic. Every field can be overridden
// from a TOML file; missing fields keep their defaults.
use crate::domain::trajectory::ProjectileKind;
use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct Range {
    pub min: f64,
    pub max: f64,
}

impl Range {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct KindSpec {
    /// Probability (0..=1) of this kind being picked for a launch.
    pub spawn_chance: f64,

    /// Multiplier applied to the sampled horizontal speed.
    pub speed_multiplier: f64,
}

impl Default for KindSpec {
    fn default() -> Self {
        Self {
            spawn_chance: 0.0,
            speed_multiplier: 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct KindTuning {
    pub default: KindSpec,
    pub plane: KindSpec,
    pub missile: KindSpec,
    pub flashbang: KindSpec,
}

impl Default for KindTuning {
    fn default() -> Self {
        Self {
            default: KindSpec {
                spawn_chance: 0.10,
                speed_multiplier: 1.0,
            },
            plane: KindSpec {
                spawn_chance: 0.30,
                speed_multiplier: 1.4,
            },
            missile: KindSpec {
                spawn_chance: 0.20,
                speed_multiplier: 1.8,
            },
            flashbang: KindSpec {
                spawn_chance: 0.40,
                speed_multiplier: 1.0,
            },
        }
    }
}

impl KindTuning {
    pub fn spec(&self, kind: ProjectileKind) -> KindSpec {
        match kind {
            ProjectileKind::Default => self.default,
            ProjectileKind::Plane => self.plane,
            ProjectileKind::Missile => self.missile,
            ProjectileKind::Flashbang => self.flashbang,
        }
    }

    /// Maps a uniform roll in [0, 1) onto a kind by cumulative spawn chance.
    pub fn pick(&self, roll: f64) -> ProjectileKind {
        let mut cumulative = 0.0;
        for kind in ProjectileKind::ALL {
            cumulative += self.spec(kind).spawn_chance;
            if roll < cumulative {
                return kind;
            }
        }
        ProjectileKind::Default
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct CannonTuning {
    /// Downward acceleration in normalized units per second squared.
    pub gravity: Range,

    /// Apex height above the launch point, as a fraction of screen height.
    pub peak_height: Range,

    /// Horizontal speed in screen widths per second (before the kind multiplier).
    pub speed: Range,

    /// Band the sender picks the receiver's landing height from.
    pub landing_min: f64,
    pub landing_max: f64,

    /// Landing height must sit at least this far below the reachable apex.
    pub landing_clearance: f64,

    /// Upper-bound widening when the landing band collapses.
    pub landing_widen: f64,

    /// When false every launch is a plain projectile.
    pub kinds_enabled: bool,
    pub kinds: KindTuning,
}

impl Default for CannonTuning {
    fn default() -> Self {
        Self {
            gravity: Range::new(1.9, 3.2),
            peak_height: Range::new(0.38, 0.62),
            speed: Range::new(0.65, 1.15),
            landing_min: 0.05,
            landing_max: 0.90,
            landing_clearance: 0.02,
            landing_widen: 0.05,
            kinds_enabled: true,
            kinds: KindTuning::default(),
        }
    }
}

impl CannonTuning {
    pub fn from_toml(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }
}
