pub mod codec;
pub mod config;
pub mod session;
pub mod signaling;
pub mod sink;
pub mod transport;

pub use codec::CodecSet;
pub use config::{resolve_source_url, ConfigError, StreamConfig};
pub use session::{Session, SessionEvent, SessionHandle, VisibilityController};
pub use signaling::{SignalMessage, SocketState, WsConnector};
pub use sink::{HeadlessSink, MediaSink, SegmentSource, SinkError, StreamHandle};
pub use transport::{TransportKind, TransportNegotiator};
