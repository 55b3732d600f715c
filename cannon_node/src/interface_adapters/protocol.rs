// Wire protocol DTOs and conversions for peer-to-peer messages.
// One JSON object per line, tagged by `action`.

use crate::domain::{
    Direction, InstanceId, PeerMessage, PixelPoint, ProjectileColor, ProjectileKind,
    TrajectoryAnnouncement, TrajectoryParams,
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Every message shape a peer may send. Unknown fields are ignored on receipt.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum WireMessage {
    // Physical shot handed to the neighbouring screens.
    Cannon(CannonDto),
    // Legacy point effect at a pixel position.
    Fire(FireDto),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DirectionDto {
    LeftToRight,
    RightToLeft,
}

impl From<Direction> for DirectionDto {
    fn from(direction: Direction) -> Self {
        match direction {
            Direction::LeftToRight => DirectionDto::LeftToRight,
            Direction::RightToLeft => DirectionDto::RightToLeft,
        }
    }
}

impl From<DirectionDto> for Direction {
    fn from(direction: DirectionDto) -> Self {
        match direction {
            DirectionDto::LeftToRight => Direction::LeftToRight,
            DirectionDto::RightToLeft => Direction::RightToLeft,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CannonDto {
    pub sx: f64,
    pub sy: f64,
    pub vx: f64,
    pub vy: f64,
    pub g: f64,
    pub direction: DirectionDto,
    #[serde(default)]
    pub delay_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub land_ny: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub projectile_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub projectile_type: Option<String>,
    // Routing metadata for echo and duplicate suppression.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shot_seq: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FireDto {
    pub x: i64,
    pub y: i64,
}

impl From<&TrajectoryAnnouncement> for CannonDto {
    fn from(announcement: &TrajectoryAnnouncement) -> Self {
        let params = &announcement.params;
        Self {
            sx: params.sx,
            sy: params.sy,
            vx: params.vx,
            vy: params.vy,
            g: params.g,
            direction: params.direction.into(),
            delay_ms: params.delay_ms,
            land_ny: params.landing_y,
            projectile_color: Some(params.color.to_string()),
            projectile_type: Some(params.kind.as_str().to_string()),
            sender_id: announcement
                .sender_id
                .as_ref()
                .map(|id| id.as_str().to_string()),
            shot_seq: announcement.shot_seq,
        }
    }
}

impl From<CannonDto> for TrajectoryAnnouncement {
    fn from(dto: CannonDto) -> Self {
        // A bad color is cosmetic; fall back to the default tint rather than dropping the shot.
        let color = dto
            .projectile_color
            .as_deref()
            .and_then(ProjectileColor::parse)
            .unwrap_or_default();
        let kind = dto
            .projectile_type
            .as_deref()
            .map(ProjectileKind::from_wire)
            .unwrap_or_default();

        Self {
            params: TrajectoryParams {
                sx: dto.sx,
                sy: dto.sy,
                vx: dto.vx,
                vy: dto.vy,
                g: dto.g,
                direction: dto.direction.into(),
                delay_ms: dto.delay_ms,
                landing_y: dto.land_ny,
                color,
                kind,
            },
            sender_id: dto.sender_id.map(InstanceId::from),
            shot_seq: dto.shot_seq,
        }
    }
}

impl From<&PeerMessage> for WireMessage {
    fn from(message: &PeerMessage) -> Self {
        match message {
            PeerMessage::Trajectory(announcement) => WireMessage::Cannon(announcement.into()),
            PeerMessage::PointImpact(at) => WireMessage::Fire(FireDto {
                x: at.x.round() as i64,
                y: at.y.round() as i64,
            }),
        }
    }
}

impl From<WireMessage> for PeerMessage {
    fn from(message: WireMessage) -> Self {
        match message {
            WireMessage::Cannon(dto) => PeerMessage::Trajectory(dto.into()),
            WireMessage::Fire(dto) => {
                PeerMessage::PointImpact(PixelPoint::new(dto.x as f64, dto.y as f64))
            }
        }
    }
}

#[derive(Debug)]
pub enum ProtocolError {
    /// Line is not a JSON object, has no known `action`, or misses required fields.
    Malformed(serde_json::Error),
    Encode(serde_json::Error),
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProtocolError::Malformed(e) => write!(f, "malformed message: {e}"),
            ProtocolError::Encode(e) => write!(f, "failed to encode message: {e}"),
        }
    }
}

impl std::error::Error for ProtocolError {}

/// Serializes a message as a single newline-terminated line.
pub fn encode_line(message: &PeerMessage) -> Result<String, ProtocolError> {
    let mut line =
        serde_json::to_string(&WireMessage::from(message)).map_err(ProtocolError::Encode)?;
    line.push('\n');
    Ok(line)
}

/// Parses one line (without its terminator).
pub fn decode_line(line: &str) -> Result<PeerMessage, ProtocolError> {
    serde_json::from_str::<WireMessage>(line)
        .map(PeerMessage::from)
        .map_err(ProtocolError::Malformed)
}
