// Shared test doubles: a scriptable socket connector and a recording sink.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::mpsc;
use url::Url;

use streamview::session::{EventSender, SessionEvent};
use streamview::signaling::{MessageSender, SignalError, SignalMessage, SocketConnector, SocketHandle};
use streamview::sink::{MediaSink, SegmentSource, SinkError, StreamHandle};

/// Connector that hands out inert sockets and records what the session
/// sends through them.
pub struct FakeConnector {
    /// Emit `SocketOpen` as soon as `open` is called.
    pub auto_open: bool,
    /// Refuse construction entirely.
    pub fail: AtomicBool,
    pub opens: AtomicU32,
    pub outboxes: Mutex<Vec<mpsc::UnboundedReceiver<SignalMessage>>>,
}

impl FakeConnector {
    pub fn new(auto_open: bool) -> Arc<Self> {
        Arc::new(Self {
            auto_open,
            fail: AtomicBool::new(false),
            opens: AtomicU32::new(0),
            outboxes: Mutex::new(Vec::new()),
        })
    }

    pub fn open_count(&self) -> u32 {
        self.opens.load(Ordering::SeqCst)
    }

    /// Drain every control message the session has sent on socket `n`.
    pub fn sent_on(&self, n: usize) -> Vec<SignalMessage> {
        let mut outboxes = self.outboxes.lock().unwrap();
        let mut sent = Vec::new();
        if let Some(rx) = outboxes.get_mut(n) {
            while let Ok(msg) = rx.try_recv() {
                sent.push(msg);
            }
        }
        sent
    }
}

impl SocketConnector for FakeConnector {
    fn open(&self, _url: &Url, events: EventSender) -> Result<SocketHandle, SignalError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(SignalError::Construction("refused by test".into()));
        }
        self.opens.fetch_add(1, Ordering::SeqCst);
        let (sender, rx) = MessageSender::channel();
        self.outboxes.lock().unwrap().push(rx);
        if self.auto_open {
            let _ = events.send(SessionEvent::SocketOpen);
        }
        let task = tokio::spawn(std::future::pending::<()>());
        Ok(SocketHandle::new(sender, task))
    }
}

/// Sink that records everything it is handed; segment appends are
/// acknowledged immediately.
pub struct RecordingSink {
    pub peer_supported: bool,
    pub segment_supported: bool,
    pub attached: Mutex<Vec<StreamHandle>>,
    pub fragments: Mutex<Vec<Bytes>>,
    pub stills: Mutex<Vec<Bytes>>,
    pub appended: Arc<Mutex<Vec<Bytes>>>,
    pub seeks: AtomicU32,
    pub plays: AtomicU32,
}

impl RecordingSink {
    pub fn new() -> Arc<Self> {
        Self::with_support(true, true)
    }

    pub fn with_support(peer_supported: bool, segment_supported: bool) -> Arc<Self> {
        Arc::new(Self {
            peer_supported,
            segment_supported,
            attached: Mutex::new(Vec::new()),
            fragments: Mutex::new(Vec::new()),
            stills: Mutex::new(Vec::new()),
            appended: Arc::new(Mutex::new(Vec::new())),
            seeks: AtomicU32::new(0),
            plays: AtomicU32::new(0),
        })
    }

    pub fn seek_count(&self) -> u32 {
        self.seeks.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MediaSink for RecordingSink {
    fn supports_peer_connection(&self) -> bool {
        self.peer_supported
    }

    fn supports_segment_source(&self) -> bool {
        self.segment_supported
    }

    fn can_decode(&self, _codec: &str) -> bool {
        true
    }

    fn supports_segments(&self, codec: &str) -> bool {
        // Decodable but not segment-capable: opus stays out of the
        // segment advertisement, like a real media pipeline.
        codec != "opus"
    }

    fn open_segment_source(
        &self,
        events: EventSender,
    ) -> Result<Arc<dyn SegmentSource>, SinkError> {
        Ok(Arc::new(RecordingSegmentSource {
            appended: self.appended.clone(),
            events,
        }))
    }

    fn attach_stream(&self, stream: StreamHandle) {
        self.attached.lock().unwrap().push(stream);
    }

    fn render_fragment(&self, fragment: Bytes) {
        self.fragments.lock().unwrap().push(fragment);
    }

    fn set_static_image(&self, image: Bytes) {
        self.stills.lock().unwrap().push(image);
    }

    fn seek_to_live_edge(&self) {
        self.seeks.fetch_add(1, Ordering::SeqCst);
    }

    fn set_muted(&self, _muted: bool) {}

    async fn play(&self) -> Result<(), SinkError> {
        self.plays.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

struct RecordingSegmentSource {
    appended: Arc<Mutex<Vec<Bytes>>>,
    events: EventSender,
}

impl SegmentSource for RecordingSegmentSource {
    fn open_buffer(&self, _codec: &str) -> Result<(), SinkError> {
        Ok(())
    }

    fn append(&self, segment: Bytes) -> Result<(), SinkError> {
        self.appended.lock().unwrap().push(segment);
        let _ = self.events.send(SessionEvent::SegmentAppended);
        Ok(())
    }

    fn buffered(&self) -> Option<(f64, f64)> {
        None
    }

    fn remove(&self, _start: f64, _end: f64) -> Result<(), SinkError> {
        Ok(())
    }

    fn set_live_seekable_range(&self, _start: f64, _end: f64) {}
}

/// Let spawned timer and callback tasks run between drains.
pub async fn settle() {
    for _ in 0..16 {
        tokio::task::yield_now().await;
    }
}

pub fn test_url() -> Url {
    Url::parse("ws://relay.test:1984/api/ws?src=camera").unwrap()
}
