// Domain-level errors for trajectory construction and planning.
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum TrajectoryError {
    /// A parameter was NaN or infinite.
    NonFinite(&'static str),
    /// Horizontal velocity is ~0 or points against the stated direction.
    VelocityMismatch,
    /// The exit boundary can never be reached from the origin.
    ExitUnreachable,
}

impl fmt::Display for TrajectoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrajectoryError::NonFinite(field) => write!(f, "{field} is not a finite number"),
            TrajectoryError::VelocityMismatch => {
                write!(f, "horizontal velocity does not match the shooting direction")
            }
            TrajectoryError::ExitUnreachable => write!(f, "exit boundary is unreachable"),
        }
    }
}

impl std::error::Error for TrajectoryError {}
