use bytes::Bytes;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use url::Url;

use crate::session::{EventSender, SessionEvent};
use crate::signaling::{SignalError, SignalMessage};

/// Connection state shared by the socket and the peer connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SocketState {
    Closed,
    Connecting,
    Open,
}

/// Cloneable handle for sending control messages out of the session.
///
/// Sending is fire-and-forget: once the socket is gone the message is
/// silently dropped, matching the "send is a no-op without a socket"
/// contract of the protocol.
#[derive(Debug, Clone)]
pub struct MessageSender {
    tx: mpsc::UnboundedSender<SignalMessage>,
}

impl MessageSender {
    /// Create a sender together with the receiving end consumed by the
    /// socket's writer loop (or by a test double).
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<SignalMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    pub fn send(&self, msg: SignalMessage) {
        log::trace!("signal out: {}", msg.kind());
        if self.tx.send(msg).is_err() {
            log::trace!("signal dropped: socket gone");
        }
    }
}

/// Owned handle to one live socket. Dropping the handle aborts the pump
/// task and releases the connection.
#[derive(Debug)]
pub struct SocketHandle {
    sender: MessageSender,
    task: JoinHandle<()>,
}

impl SocketHandle {
    pub fn new(sender: MessageSender, task: JoinHandle<()>) -> Self {
        Self { sender, task }
    }

    pub fn sender(&self) -> MessageSender {
        self.sender.clone()
    }
}

impl Drop for SocketHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Seam between the session and the concrete socket implementation.
///
/// `open` must return immediately: the handshake runs in the background
/// and reports through the event queue (`SocketOpen` on success, a
/// `SocketClosed` routed into the reconnect path on failure). Only
/// construction itself may fail synchronously.
pub trait SocketConnector: Send + Sync {
    fn open(&self, url: &Url, events: EventSender) -> Result<SocketHandle, SignalError>;
}

/// Production connector over tokio-tungstenite.
#[derive(Debug, Default)]
pub struct WsConnector;

impl WsConnector {
    pub fn new() -> Self {
        Self
    }
}

impl SocketConnector for WsConnector {
    fn open(&self, url: &Url, events: EventSender) -> Result<SocketHandle, SignalError> {
        match url.scheme() {
            "ws" | "wss" => {}
            other => return Err(SignalError::UnsupportedScheme(other.to_string())),
        }

        let (sender, outbound) = MessageSender::channel();
        let task = tokio::spawn(run_socket(url.clone(), outbound, events));
        Ok(SocketHandle::new(sender, task))
    }
}

/// Pump loop: completes the handshake, then shovels outbound control
/// messages onto the wire and inbound frames into the session queue.
async fn run_socket(
    url: Url,
    mut outbound: mpsc::UnboundedReceiver<SignalMessage>,
    events: EventSender,
) {
    let stream = match connect_async(url.as_str()).await {
        Ok((stream, _response)) => stream,
        Err(e) => {
            log::warn!("socket open failed for {}: {}", url, e);
            let _ = events.send(SessionEvent::SocketClosed);
            return;
        }
    };

    if events.send(SessionEvent::SocketOpen).is_err() {
        return;
    }

    let (mut ws_sink, mut ws_stream) = stream.split();

    loop {
        tokio::select! {
            msg = outbound.recv() => match msg {
                Some(msg) => {
                    let text = match serde_json::to_string(&msg) {
                        Ok(text) => text,
                        Err(e) => {
                            log::warn!("failed to encode {}: {}", msg.kind(), e);
                            continue;
                        }
                    };
                    if ws_sink.send(Message::Text(text)).await.is_err() {
                        break;
                    }
                }
                None => break,
            },
            frame = ws_stream.next() => match frame {
                Some(Ok(Message::Text(text))) => match serde_json::from_str::<SignalMessage>(&text) {
                    Ok(msg) => {
                        let _ = events.send(SessionEvent::Control(msg));
                    }
                    Err(_) => log::debug!("ignoring unrecognized control message: {}", text),
                },
                Some(Ok(Message::Binary(data))) => {
                    let _ = events.send(SessionEvent::Binary(Bytes::from(data)));
                }
                Some(Ok(Message::Ping(_) | Message::Pong(_) | Message::Frame(_))) => {}
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
            },
        }
    }

    let _ = events.send(SessionEvent::SocketClosed);
}
