use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::time::Instant;
use url::Url;
use uuid::Uuid;

use crate::codec::CodecSet;
use crate::config::StreamConfig;
use crate::session::{EventSender, SessionEvent, TimerHandle};
use crate::signaling::{SocketConnector, SocketHandle, SocketState};
use crate::sink::{MediaSink, SinkError};
use crate::transport::negotiator::{promotion, RoundContext, TransportNegotiator};
use crate::transport::TransportKind;

/// Cloneable handle the host (and the visibility controller) uses to
/// drive a running session.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    events: EventSender,
}

impl SessionHandle {
    pub fn new(events: EventSender) -> Self {
        Self { events }
    }

    pub fn suspend(&self) {
        let _ = self.events.send(SessionEvent::Suspend);
    }

    pub fn resume(&self) {
        let _ = self.events.send(SessionEvent::Resume);
    }

    /// Permanent detachment: release the socket, the peer connection and
    /// every timer, then stop the event loop.
    pub fn shutdown(&self) {
        let _ = self.events.send(SessionEvent::Shutdown);
    }

    /// Raw queue access for sink adapters and test harnesses.
    pub fn events(&self) -> EventSender {
        self.events.clone()
    }
}

enum Flow {
    Continue,
    Stop,
}

/// One rendered widget's connection lifecycle.
///
/// Owns at most one socket and at most one peer connection at any
/// instant, plus one disconnect timer and one reconnect timer. Every
/// state transition is driven by a [`SessionEvent`] and runs to
/// completion before the next event is processed.
pub struct Session {
    id: Uuid,
    config: StreamConfig,
    url: Url,
    sink: Arc<dyn MediaSink>,
    connector: Arc<dyn SocketConnector>,
    events_tx: EventSender,
    events_rx: mpsc::UnboundedReceiver<SessionEvent>,
    socket_state: SocketState,
    peer_state: SocketState,
    socket: Option<SocketHandle>,
    connect_ts: Option<Instant>,
    disconnect_timer: TimerHandle,
    reconnect_timer: TimerHandle,
    negotiator: TransportNegotiator,
    initialized: bool,
}

impl Session {
    pub fn new(
        config: StreamConfig,
        url: Url,
        sink: Arc<dyn MediaSink>,
        connector: Arc<dyn SocketConnector>,
    ) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let requested = TransportKind::parse_mode(&config.mode);
        Self {
            id: Uuid::new_v4(),
            config,
            url,
            sink,
            connector,
            events_tx,
            events_rx,
            socket_state: SocketState::Closed,
            peer_state: SocketState::Closed,
            socket: None,
            connect_ts: None,
            disconnect_timer: TimerHandle::idle(),
            reconnect_timer: TimerHandle::idle(),
            negotiator: TransportNegotiator::new(requested),
            initialized: false,
        }
    }

    pub fn handle(&self) -> SessionHandle {
        SessionHandle::new(self.events_tx.clone())
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn socket_state(&self) -> SocketState {
        self.socket_state
    }

    pub fn peer_state(&self) -> SocketState {
        self.peer_state
    }

    pub fn disconnect_pending(&self) -> bool {
        self.disconnect_timer.is_armed()
    }

    pub fn reconnect_pending(&self) -> bool {
        self.reconnect_timer.is_armed()
    }

    /// Run until the host requests shutdown.
    pub async fn run(mut self) {
        log::info!("[{}] session started for {}", self.id, self.url);
        while let Some(event) = self.events_rx.recv().await {
            if matches!(self.handle_event(event).await, Flow::Stop) {
                break;
            }
        }
        self.shutdown().await;
        log::info!("[{}] session ended", self.id);
    }

    /// Process everything currently queued and return, `false` once a
    /// shutdown was seen. Lets embedders and tests drive the loop
    /// manually instead of handing it a task.
    pub async fn drain(&mut self) -> bool {
        loop {
            match self.events_rx.try_recv() {
                Ok(event) => {
                    if matches!(self.handle_event(event).await, Flow::Stop) {
                        self.shutdown().await;
                        return false;
                    }
                }
                Err(_) => return true,
            }
        }
    }

    async fn handle_event(&mut self, event: SessionEvent) -> Flow {
        match event {
            SessionEvent::Resume => self.on_resume().await,
            SessionEvent::Suspend => self.on_suspend(),
            SessionEvent::SocketOpen => self.on_socket_open().await,
            SessionEvent::SocketClosed => self.on_socket_closed(),
            SessionEvent::Control(msg) => {
                let outcome = self.negotiator.on_control(&msg).await;
                if outcome.webrtc_aborted {
                    self.peer_state = SocketState::Closed;
                }
            }
            SessionEvent::Binary(data) => self.negotiator.on_binary(data),
            SessionEvent::SegmentAppended => self.negotiator.on_segment_appended(),
            SessionEvent::FirstFrame {
                has_video,
                has_audio,
            } => self.on_first_frame(has_video, has_audio).await,
            SessionEvent::PeerFailed => self.on_peer_failed().await,
            SessionEvent::DisconnectElapsed => self.on_disconnect_elapsed().await,
            SessionEvent::ReconnectElapsed => self.connect().await,
            SessionEvent::Shutdown => return Flow::Stop,
        }
        Flow::Continue
    }

    /// Open the signaling socket unless one (or a live peer connection)
    /// already exists. Construction failure routes into the disconnect
    /// path instead of surfacing.
    async fn connect(&mut self) {
        if self.socket.is_some() || self.negotiator.peer_connection_alive() {
            return;
        }
        self.socket_state = SocketState::Connecting;
        self.connect_ts = Some(Instant::now());
        match self.connector.open(&self.url, self.events_tx.clone()) {
            Ok(handle) => self.socket = Some(handle),
            Err(e) => {
                log::warn!("[{}] socket construction failed: {}", self.id, e);
                self.shutdown_link().await;
            }
        }
    }

    async fn on_socket_open(&mut self) {
        self.socket_state = SocketState::Open;
        let sender = match &self.socket {
            Some(socket) => socket.sender(),
            None => return,
        };
        let started = self
            .negotiator
            .start_round(RoundContext {
                sender,
                events: self.events_tx.clone(),
                sink: self.sink.clone(),
                codecs: CodecSet::new(self.config.codecs.clone()),
                ice_servers: self.config.ice_servers.clone(),
            })
            .await;
        if started.webrtc {
            self.peer_state = SocketState::Connecting;
        }
        log::debug!("[{}] attempts started: {:?}", self.id, started.attempted);
    }

    /// Unexpected socket loss: re-enter CONNECTING and space the next
    /// attempt at least `reconnect_interval` from the previous connect.
    fn on_socket_closed(&mut self) {
        if self.socket_state == SocketState::Closed {
            return;
        }
        self.socket_state = SocketState::Connecting;
        self.socket = None;
        let elapsed = self
            .connect_ts
            .map(|ts| ts.elapsed())
            .unwrap_or_default();
        let delay = self.config.reconnect_interval.saturating_sub(elapsed);
        log::debug!("[{}] socket closed; reconnect in {:?}", self.id, delay);
        self.reconnect_timer
            .arm(delay, self.events_tx.clone(), SessionEvent::ReconnectElapsed);
    }

    /// Debounced suspension: nothing closes until the grace timer expires
    /// un-cancelled. A timer already armed keeps its original deadline.
    fn on_suspend(&mut self) {
        if self.disconnect_timer.is_armed() {
            return;
        }
        if self.socket_state == SocketState::Closed && self.peer_state == SocketState::Closed {
            return;
        }
        log::debug!("[{}] suspended; grace {:?}", self.id, self.config.disconnect_grace);
        self.disconnect_timer.arm(
            self.config.disconnect_grace,
            self.events_tx.clone(),
            SessionEvent::DisconnectElapsed,
        );
    }

    async fn on_resume(&mut self) {
        self.disconnect_timer.cancel();
        if self.initialized {
            self.sink.seek_to_live_edge();
            self.play().await;
        } else {
            self.initialized = true;
        }
        self.connect().await;
    }

    async fn on_disconnect_elapsed(&mut self) {
        log::debug!("[{}] disconnect grace expired", self.id);
        self.reconnect_timer.cancel();
        self.shutdown_link().await;
    }

    /// Promotion tie-break, run once WebRTC's staged sink produced its
    /// first decodable frame.
    async fn on_first_frame(&mut self, has_video: bool, has_audio: bool) {
        if !self.negotiator.peer_connection_alive() {
            return;
        }
        let segment_codecs = self.negotiator.segment_codecs().to_string();
        if promotion::prefers_webrtc(has_video, has_audio, &segment_codecs) {
            let stream = self.negotiator.promote_webrtc().await;
            self.sink.attach_stream(stream);
            self.play().await;
            self.peer_state = SocketState::Open;
            // No further signaling needed once media flows peer-to-peer.
            self.socket_state = SocketState::Closed;
            self.socket = None;
            log::info!("[{}] webrtc promoted", self.id);
        } else {
            self.negotiator.teardown_webrtc().await;
            self.peer_state = SocketState::Closed;
            log::info!(
                "[{}] segment path retained ({})",
                self.id,
                segment_codecs
            );
        }
    }

    /// Peer connection died: tear it down and renegotiate from scratch.
    /// While the socket is still open the connect call is a no-op and the
    /// remaining attempts continue undisturbed.
    async fn on_peer_failed(&mut self) {
        log::warn!("[{}] peer connection failed", self.id);
        self.negotiator.teardown_webrtc().await;
        self.peer_state = SocketState::Closed;
        self.connect().await;
    }

    /// Close socket and peer connection, clearing references immediately
    /// so re-entrant teardown is a safe no-op.
    async fn shutdown_link(&mut self) {
        self.socket_state = SocketState::Closed;
        self.socket = None;
        self.peer_state = SocketState::Closed;
        self.negotiator.teardown_all().await;
    }

    async fn shutdown(&mut self) {
        self.disconnect_timer.cancel();
        self.reconnect_timer.cancel();
        self.shutdown_link().await;
    }

    /// Playback with autoplay-policy recovery: a rejected play is retried
    /// muted once; anything else is logged and dropped.
    async fn play(&self) {
        match self.sink.play().await {
            Ok(()) => {}
            Err(SinkError::AutoplayRejected) => {
                self.sink.set_muted(true);
                if let Err(e) = self.sink.play().await {
                    log::debug!("[{}] muted playback retry failed: {}", self.id, e);
                }
            }
            Err(e) => log::debug!("[{}] playback failed: {}", self.id, e),
        }
    }
}
