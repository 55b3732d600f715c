use crate::domain::tuning::CannonTuning;
use crate::domain::{Direction, ProjectileColor, ScreenFrame};
use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;
use std::{env, fmt, fs, time::Duration};

// Runtime/node constants (not shot tuning).

pub const DEFAULT_PORT: u16 = 50505;
pub const DEFAULT_SERVICE_TYPE: &str = "_catclick._tcp.local.";

pub const EVENT_CHANNEL_CAPACITY: usize = 1024;
pub const STATUS_BROADCAST_CAPACITY: usize = 128;
pub const WRITE_QUEUE_CAPACITY: usize = 64;

pub const TICK_INTERVAL: Duration = Duration::from_millis(16);
// Bounds rendering cost only; has no effect on what peers see.
pub const MAX_ACTIVE_SHOTS: usize = 24;

#[derive(Debug)]
pub enum ConfigError {
    ReadTuning { path: PathBuf, error: std::io::Error },
    ParseTuning { path: PathBuf, error: toml::de::Error },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::ReadTuning { path, error } => {
                write!(f, "failed to read tuning file {}: {error}", path.display())
            }
            ConfigError::ParseTuning { path, error } => {
                write!(f, "invalid tuning file {}: {error}", path.display())
            }
        }
    }
}

impl std::error::Error for ConfigError {}

pub fn listen_host() -> IpAddr {
    env::var("CANNON_HOST")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED))
}

pub fn listen_port() -> u16 {
    env::var("CANNON_PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(DEFAULT_PORT)
}

pub fn service_type() -> String {
    env::var("CANNON_SERVICE_TYPE")
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_SERVICE_TYPE.to_string())
}

pub fn discovery_enabled() -> bool {
    match env::var("CANNON_DISCOVERY") {
        Ok(value) => !matches!(
            value.trim().to_ascii_lowercase().as_str(),
            "off" | "false" | "0" | "no"
        ),
        Err(_) => true,
    }
}

pub fn launch_direction() -> Direction {
    match env::var("CANNON_DIRECTION") {
        Ok(value) => value.parse().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "invalid CANNON_DIRECTION; using left_to_right");
            Direction::LeftToRight
        }),
        Err(_) => Direction::LeftToRight,
    }
}

pub fn projectile_color() -> ProjectileColor {
    match env::var("CANNON_COLOR") {
        Ok(value) => ProjectileColor::parse(&value).unwrap_or_else(|| {
            tracing::warn!(value = %value, "invalid CANNON_COLOR; using default");
            ProjectileColor::default()
        }),
        Err(_) => ProjectileColor::default(),
    }
}

pub fn screen_frame() -> ScreenFrame {
    let dimension = |key: &str, default: f64| {
        env::var(key)
            .ok()
            .and_then(|v| v.parse::<f64>().ok())
            .filter(|v| v.is_finite() && *v > 0.0)
            .unwrap_or(default)
    };
    ScreenFrame::sized(
        dimension("SCREEN_WIDTH", 1920.0),
        dimension("SCREEN_HEIGHT", 1080.0),
    )
}

pub fn dial_timeout() -> Duration {
    let millis = env::var("CANNON_DIAL_TIMEOUT_MS")
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .unwrap_or(2000);
    Duration::from_millis(millis)
}

pub fn tuning_file() -> Option<PathBuf> {
    env::var("CANNON_TUNING_FILE")
        .ok()
        .filter(|v| !v.trim().is_empty())
        .map(PathBuf::from)
}

/// Built-in tuning, overridden field by field from `CANNON_TUNING_FILE` when set.
pub fn load_tuning() -> Result<CannonTuning, ConfigError> {
    match tuning_file() {
        Some(path) => load_tuning_file(path),
        None => Ok(CannonTuning::default()),
    }
}

pub fn load_tuning_file(path: PathBuf) -> Result<CannonTuning, ConfigError> {
    let text = match fs::read_to_string(&path) {
        Ok(text) => text,
        Err(error) => return Err(ConfigError::ReadTuning { path, error }),
    };
    CannonTuning::from_toml(&text).map_err(|error| ConfigError::ParseTuning { path, error })
}
