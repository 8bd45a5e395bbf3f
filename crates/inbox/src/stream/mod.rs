//! Streaming acquisition over a WebSocket.

pub mod protocol;
pub mod strategy;
pub mod transport;

pub use protocol::{InboundFrame, OutboundFrame, decode_frame};
pub use strategy::{ConnectionState, StreamEvent, StreamUpdate, StreamingStrategy};
pub use transport::{FrameChannel, FrameTransport, WebSocketTransport};
