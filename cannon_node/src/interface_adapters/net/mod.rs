// Network adapter modules: line framing and the peer connection mesh.

pub mod channel;
pub mod framing;

pub use channel::{BroadcastReport, ChannelSettings, MessageChannel};
pub use framing::{Frame, LineBuffer, MAX_LINE_BYTES};
