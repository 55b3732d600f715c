// Shot tuning constants, kept separate from runtime/server configuration.

pub mod cannon;

pub use cannon::{CannonTuning, KindTuning, Range};
