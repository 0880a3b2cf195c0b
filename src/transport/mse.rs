use std::sync::Arc;

use bytes::{Bytes, BytesMut};

use crate::signaling::SignalMessage;
use crate::sink::SegmentSource;
use crate::transport::negotiator::RoundContext;
use crate::transport::TransportError;

/// Nominal scratch capacity for segments arriving mid-append.
pub const SCRATCH_CAPACITY: usize = 2 * 1024 * 1024;

/// Rolling live window kept in the segment buffer, seconds.
pub const LIVE_WINDOW_SECS: f64 = 15.0;

/// Scratch buffer serializing segment appends.
///
/// Two overlapping appends are illegal, so bytes arriving while one is
/// outstanding accumulate here and flush as a single submission. The
/// capacity is nominal: an oversized burst grows the buffer instead of
/// dropping bytes.
#[derive(Debug)]
pub struct PendingSegmentQueue {
    buf: BytesMut,
    capacity: usize,
}

impl PendingSegmentQueue {
    pub fn new(capacity: usize) -> Self {
        Self {
            buf: BytesMut::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, data: &[u8]) {
        if self.buf.len() + data.len() > self.capacity {
            log::trace!(
                "segment queue spilling past nominal capacity: {} + {} bytes",
                self.buf.len(),
                data.len()
            );
        }
        self.buf.extend_from_slice(data);
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Drain everything queued as one contiguous submission.
    pub fn take(&mut self) -> Bytes {
        let chunk = self.buf.split().freeze();
        self.buf.reserve(self.capacity);
        chunk
    }
}

/// Segment-buffer playback attempt.
///
/// Owns the pending queue and the live-window-trimming policy. Nothing in
/// here is fatal: append and housekeeping errors are swallowed, and only
/// the negotiator can declare the attempt dead.
pub struct MseAttempt {
    source: Arc<dyn SegmentSource>,
    queue: PendingSegmentQueue,
    appending: bool,
    negotiated: String,
}

impl MseAttempt {
    /// Open a segment source on the staged sink and advertise the
    /// segment-supported codec list.
    pub fn start(ctx: &RoundContext) -> Result<Self, TransportError> {
        let source = ctx
            .sink
            .open_segment_source(ctx.events.clone())
            .map_err(|e| TransportError::SegmentSource(e.to_string()))?;
        let advertised = ctx.codecs.advertise(|codec| ctx.sink.supports_segments(codec));
        ctx.sender.send(SignalMessage::Mse(advertised));
        Ok(Self::with_source(source))
    }

    fn with_source(source: Arc<dyn SegmentSource>) -> Self {
        Self {
            source,
            queue: PendingSegmentQueue::new(SCRATCH_CAPACITY),
            appending: false,
            negotiated: String::new(),
        }
    }

    /// The relay's codec reply opens the segment-mode buffer.
    pub fn on_control(&mut self, msg: &SignalMessage) {
        if let SignalMessage::Mse(codecs) = msg {
            self.negotiated = codecs.clone();
            if let Err(e) = self.source.open_buffer(codecs) {
                log::warn!("segment buffer open failed: {}", e);
            }
        }
    }

    /// Negotiated codec string, used by the promotion tie-break.
    pub fn negotiated_codecs(&self) -> &str {
        &self.negotiated
    }

    /// One binary segment. Queued when an append is outstanding or bytes
    /// are already waiting; submitted directly otherwise.
    pub fn on_binary(&mut self, data: Bytes) {
        if self.appending || !self.queue.is_empty() {
            self.queue.push(&data);
        } else {
            self.appending = self.source.append(data).is_ok();
        }
    }

    /// Append completed: flush queued bytes as one submission, or run the
    /// live-window housekeeping pass.
    pub fn on_append_complete(&mut self) {
        self.appending = false;
        if !self.queue.is_empty() {
            let chunk = self.queue.take();
            self.appending = self.source.append(chunk).is_ok();
            return;
        }
        self.trim_live_window();
    }

    /// Evict everything older than the rolling window and shrink the live
    /// seekable range to match. A failed housekeeping pass must never
    /// abort playback, so errors are discarded.
    fn trim_live_window(&self) {
        let Some((start, end)) = self.source.buffered() else {
            return;
        };
        let cut = end - LIVE_WINDOW_SECS;
        if cut > start {
            if let Err(e) = self.source.remove(start, cut) {
                log::trace!("live window eviction failed: {}", e);
                return;
            }
            self.source.set_live_seekable_range(cut, cut + LIVE_WINDOW_SECS);
        }
    }
}
