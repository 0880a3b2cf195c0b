use bytes::Bytes;

use crate::signaling::SignalMessage;

/// Sender half of the session event queue. Everything external (socket
/// pump, timers, webrtc callbacks, the sink adapter, the host) feeds the
/// state machine through this.
pub type EventSender = tokio::sync::mpsc::UnboundedSender<SessionEvent>;

/// External events driving the session state machine. Each one runs to
/// completion before the next is processed.
#[derive(Debug)]
pub enum SessionEvent {
    /// Socket finished its opening handshake.
    SocketOpen,
    /// Socket closed or failed to open; enters the reconnect path.
    SocketClosed,
    /// Parsed JSON control message.
    Control(SignalMessage),
    /// Binary payload for the transport owning the binary path.
    Binary(Bytes),
    /// Visible surface went away.
    Suspend,
    /// Visible surface came back.
    Resume,
    /// Disconnect grace timer expired un-cancelled.
    DisconnectElapsed,
    /// Reconnect spacing timer fired.
    ReconnectElapsed,
    /// Segment sink finished an append.
    SegmentAppended,
    /// First decodable frame on the staged WebRTC sink.
    FirstFrame { has_video: bool, has_audio: bool },
    /// Peer connection reported failed/disconnected.
    PeerFailed,
    /// Permanent detachment: release everything and stop.
    Shutdown,
}
