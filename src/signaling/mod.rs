//! Signaling channel: one bidirectional socket carrying JSON control
//! messages and, for non-WebRTC transports, binary media payloads.

pub mod channel;
pub mod error;
pub mod message;

pub use channel::{MessageSender, SocketConnector, SocketHandle, SocketState, WsConnector};
pub use error::SignalError;
pub use message::SignalMessage;
