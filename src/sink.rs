//! Media sink adapter seam.
//!
//! The core never touches rendering primitives. Binding a promoted WebRTC
//! stream, painting a snapshot or managing a segment buffer all happen
//! behind [`MediaSink`] and [`SegmentSource`], so the client state machine
//! stays headless and testable.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;
use webrtc::track::track_remote::TrackRemote;

use crate::session::{EventSender, SessionEvent};

/// Sink adapter errors
#[derive(Debug, Error)]
pub enum SinkError {
    /// Playback was refused by an autoplay policy; the session retries
    /// muted once before giving up.
    #[error("playback rejected by autoplay policy")]
    AutoplayRejected,

    #[error("segment source unavailable: {0}")]
    SegmentSourceUnavailable(String),

    #[error("segment buffer rejected codec {codec:?}: {reason}")]
    BufferRejected { codec: String, reason: String },

    #[error("segment append failed: {0}")]
    AppendFailed(String),

    #[error("buffered-range removal failed: {0}")]
    RemoveFailed(String),

    #[error("playback failed: {0}")]
    PlaybackFailed(String),
}

/// Handle to a negotiated remote stream, handed to the sink when the
/// WebRTC attempt wins promotion.
#[derive(Clone, Default)]
pub struct StreamHandle {
    pub stream_id: String,
    pub video_track: Option<Arc<TrackRemote>>,
    pub audio_track: Option<Arc<TrackRemote>>,
}

impl std::fmt::Debug for StreamHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamHandle")
            .field("stream_id", &self.stream_id)
            .field("video", &self.video_track.is_some())
            .field("audio", &self.audio_track.is_some())
            .finish()
    }
}

/// Visible media surface implemented by the presentation layer.
#[async_trait]
pub trait MediaSink: Send + Sync {
    /// Feature detection: can this environment run a peer connection?
    fn supports_peer_connection(&self) -> bool;

    /// Feature detection: can this environment buffer media segments?
    fn supports_segment_source(&self) -> bool;

    /// Decode-support test for one codec identifier.
    fn can_decode(&self, codec: &str) -> bool;

    /// Segment-support test for one codec identifier.
    fn supports_segments(&self, codec: &str) -> bool;

    /// Create a segment source bound to the sink. The returned source must
    /// report append completions by emitting
    /// [`SessionEvent::SegmentAppended`] on `events`. Resolves once the
    /// underlying source reports open.
    fn open_segment_source(
        &self,
        events: EventSender,
    ) -> Result<Arc<dyn SegmentSource>, SinkError>;

    /// Bind a promoted WebRTC stream to the visible surface.
    fn attach_stream(&self, stream: StreamHandle);

    /// Play one self-contained fragment off-screen and snapshot the
    /// decoded frame onto the visible surface.
    fn render_fragment(&self, fragment: Bytes);

    /// Show one complete still image on the visible surface.
    fn set_static_image(&self, image: Bytes);

    /// Seek the visible surface to the end of its seekable range.
    fn seek_to_live_edge(&self);

    fn set_muted(&self, muted: bool);

    /// Start or resume playback.
    async fn play(&self) -> Result<(), SinkError>;
}

/// Segment buffer bound to the sink, segment ("chunked") mode.
///
/// `append` starts an asynchronous submission; exactly one
/// [`SessionEvent::SegmentAppended`] follows each successful call. Two
/// overlapping appends are illegal; the MSE attempt serializes them.
pub trait SegmentSource: Send + Sync {
    /// Open a buffer of the negotiated codec type.
    fn open_buffer(&self, codec: &str) -> Result<(), SinkError>;

    /// Submit one segment. Completion arrives as an event, not inline.
    fn append(&self, segment: Bytes) -> Result<(), SinkError>;

    /// Currently buffered time range (start, end) in seconds, if any.
    fn buffered(&self) -> Option<(f64, f64)>;

    /// Evict `[start, end)` from the buffered range.
    fn remove(&self, start: f64, end: f64) -> Result<(), SinkError>;

    /// Shrink the live seekable window to `[start, end]`.
    fn set_live_seekable_range(&self, start: f64, end: f64);
}

/// Sink that renders nothing. Used by the viewer binary and smoke tests:
/// claims support for every codec, counts what it is handed and logs at
/// debug level.
#[derive(Debug, Default)]
pub struct HeadlessSink {
    fragments: AtomicU64,
    stills: AtomicU64,
    streams: AtomicU64,
}

impl HeadlessSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fragments_rendered(&self) -> u64 {
        self.fragments.load(Ordering::Relaxed)
    }

    pub fn stills_shown(&self) -> u64 {
        self.stills.load(Ordering::Relaxed)
    }

    pub fn streams_attached(&self) -> u64 {
        self.streams.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl MediaSink for HeadlessSink {
    fn supports_peer_connection(&self) -> bool {
        true
    }

    fn supports_segment_source(&self) -> bool {
        true
    }

    fn can_decode(&self, _codec: &str) -> bool {
        true
    }

    fn supports_segments(&self, _codec: &str) -> bool {
        true
    }

    fn open_segment_source(
        &self,
        events: EventSender,
    ) -> Result<Arc<dyn SegmentSource>, SinkError> {
        Ok(Arc::new(HeadlessSegmentSource { events }))
    }

    fn attach_stream(&self, stream: StreamHandle) {
        log::debug!("headless sink: stream attached: {:?}", stream);
        self.streams.fetch_add(1, Ordering::Relaxed);
    }

    fn render_fragment(&self, fragment: Bytes) {
        log::trace!("headless sink: fragment of {} bytes", fragment.len());
        self.fragments.fetch_add(1, Ordering::Relaxed);
    }

    fn set_static_image(&self, image: Bytes) {
        log::trace!("headless sink: still of {} bytes", image.len());
        self.stills.fetch_add(1, Ordering::Relaxed);
    }

    fn seek_to_live_edge(&self) {
        log::debug!("headless sink: seek to live edge");
    }

    fn set_muted(&self, muted: bool) {
        log::debug!("headless sink: muted={}", muted);
    }

    async fn play(&self) -> Result<(), SinkError> {
        Ok(())
    }
}

/// Segment source that discards bytes and acknowledges appends
/// immediately.
struct HeadlessSegmentSource {
    events: EventSender,
}

impl SegmentSource for HeadlessSegmentSource {
    fn open_buffer(&self, codec: &str) -> Result<(), SinkError> {
        log::debug!("headless segment source: buffer opened for {:?}", codec);
        Ok(())
    }

    fn append(&self, segment: Bytes) -> Result<(), SinkError> {
        log::trace!("headless segment source: append {} bytes", segment.len());
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
