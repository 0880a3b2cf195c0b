use std::collections::HashMap;
use std::sync::Arc;

use bytes::Bytes;

use crate::codec::CodecSet;
use crate::session::EventSender;
use crate::signaling::{MessageSender, SignalMessage};
use crate::sink::{MediaSink, StreamHandle};
use crate::transport::{
    MjpegAttempt, Mp4Attempt, MseAttempt, TransportAttempt, TransportKind, WebRtcAttempt,
};

/// Promotion tie-break: a pure function of (hasVideoTrack, hasAudioTrack,
/// negotiated segment codec string). Identical inputs always yield the
/// identical decision.
///
/// The weights encode: prefer the transport offering both audio and
/// video; among video-only outcomes, prefer higher-fidelity codecs
/// already flowing through the segment path.
pub mod promotion {
    pub const WEBRTC_VIDEO: u32 = 544;
    pub const WEBRTC_AUDIO: u32 = 258;
    pub const SEGMENT_HEVC: u32 = 560;
    pub const SEGMENT_AVC: u32 = 528;
    pub const SEGMENT_AAC: u32 = 257;

    pub fn webrtc_score(has_video: bool, has_audio: bool) -> u32 {
        let mut score = 0;
        if has_video {
            score += WEBRTC_VIDEO;
        }
        if has_audio {
            score += WEBRTC_AUDIO;
        }
        score
    }

    pub fn segment_score(codecs: &str) -> u32 {
        let mut score = 0;
        if codecs.contains("hvc1.") {
            score += SEGMENT_HEVC;
        }
        if codecs.contains("avc1.") {
            score += SEGMENT_AVC;
        }
        if codecs.contains("mp4a.") {
            score += SEGMENT_AAC;
        }
        score
    }

    pub fn prefers_webrtc(has_video: bool, has_audio: bool, segment_codecs: &str) -> bool {
        webrtc_score(has_video, has_audio) >= segment_score(segment_codecs)
    }
}

/// Everything an attempt needs to start: the outbound message handle, the
/// session event queue, the sink adapter and the negotiable capabilities.
#[derive(Clone)]
pub struct RoundContext {
    pub sender: MessageSender,
    pub events: EventSender,
    pub sink: Arc<dyn MediaSink>,
    pub codecs: CodecSet,
    pub ice_servers: Vec<String>,
}

/// What a negotiation round actually launched.
#[derive(Debug, Default)]
pub struct RoundStart {
    /// A peer connection was created.
    pub webrtc: bool,
    /// Attempts started, in launch order.
    pub attempted: Vec<TransportKind>,
}

/// Session-relevant outcome of a control dispatch.
#[derive(Debug, Default)]
pub struct ControlOutcome {
    /// The WebRTC attempt aborted itself (offer rejected).
    pub webrtc_aborted: bool,
}

/// Chooses and races transports per the configured priority list and
/// arbitrates promotion.
pub struct TransportNegotiator {
    requested: Vec<TransportKind>,
    attempts: HashMap<TransportKind, TransportAttempt>,
    /// Which attempt currently consumes binary frames.
    binary_owner: Option<TransportKind>,
    /// First-attempted transport whose failure activates the mjpeg
    /// fallback.
    fallback_watch: Option<TransportKind>,
    /// Context retained for late fallback activation.
    ctx: Option<RoundContext>,
    dropped_binary: u64,
}

impl TransportNegotiator {
    pub fn new(requested: Vec<TransportKind>) -> Self {
        Self {
            requested,
            attempts: HashMap::new(),
            binary_owner: None,
            fallback_watch: None,
            ctx: None,
            dropped_binary: 0,
        }
    }

    pub fn requested(&self) -> &[TransportKind] {
        &self.requested
    }

    pub fn active_kinds(&self) -> Vec<TransportKind> {
        self.attempts.keys().copied().collect()
    }

    pub fn binary_owner(&self) -> Option<TransportKind> {
        self.binary_owner
    }

    pub fn fallback_armed(&self) -> bool {
        self.fallback_watch.is_some()
    }

    /// Launch a negotiation round:
    /// 1. at most one of {mse, mp4} as the segment path,
    /// 2. webrtc concurrently (never gated by the segment choice),
    /// 3. mjpeg immediately only when nothing else started, otherwise as
    ///    a pure fallback watching for an error on the first attempt.
    ///
    /// Any previous round's routing is cleared first, so dispatch order
    /// stays deterministic across reconnects.
    pub async fn start_round(&mut self, ctx: RoundContext) -> RoundStart {
        self.teardown_all().await;

        let segment_supported = ctx.sink.supports_segment_source();
        let peer_supported = ctx.sink.supports_peer_connection();
        let mut started = RoundStart::default();

        if self.requested.contains(&TransportKind::Mse) && segment_supported {
            match MseAttempt::start(&ctx) {
                Ok(attempt) => {
                    self.attempts
                        .insert(TransportKind::Mse, TransportAttempt::Mse(attempt));
                    self.binary_owner = Some(TransportKind::Mse);
                    started.attempted.push(TransportKind::Mse);
                }
                Err(e) => log::warn!("mse attempt failed to start: {}", e),
            }
        } else if self.requested.contains(&TransportKind::Mp4) {
            let attempt = Mp4Attempt::start(&ctx);
            self.attempts
                .insert(TransportKind::Mp4, TransportAttempt::Mp4(attempt));
            self.binary_owner = Some(TransportKind::Mp4);
            started.attempted.push(TransportKind::Mp4);
        }

        if self.requested.contains(&TransportKind::Webrtc) && peer_supported {
            match WebRtcAttempt::start(&ctx).await {
                Ok(attempt) => {
                    self.attempts
                        .insert(TransportKind::Webrtc, TransportAttempt::Webrtc(attempt));
                    started.webrtc = true;
                    started.attempted.push(TransportKind::Webrtc);
                }
                Err(e) => log::warn!("webrtc attempt failed to start: {}", e),
            }
        }

        if self.requested.contains(&TransportKind::Mjpeg) {
            if started.attempted.is_empty() {
                let attempt = MjpegAttempt::start(&ctx);
                self.attempts
                    .insert(TransportKind::Mjpeg, TransportAttempt::Mjpeg(attempt));
                self.binary_owner = Some(TransportKind::Mjpeg);
                started.attempted.push(TransportKind::Mjpeg);
            } else {
                self.fallback_watch = Some(started.attempted[0]);
            }
        }

        self.ctx = Some(ctx);
        started
    }

    /// Fan a control message out to every live attempt, then apply the
    /// negotiator-level rules (webrtc abort, mjpeg fallback activation).
    pub async fn on_control(&mut self, msg: &SignalMessage) -> ControlOutcome {
        let mut outcome = ControlOutcome::default();

        let mut abort_webrtc = false;
        for attempt in self.attempts.values_mut() {
            let disposition = attempt.on_control(msg).await;
            if disposition.abort && attempt.kind() == TransportKind::Webrtc {
                abort_webrtc = true;
            }
        }
        if abort_webrtc {
            self.teardown_webrtc().await;
            outcome.webrtc_aborted = true;
        }

        if let (Some(first), SignalMessage::Error(text)) = (self.fallback_watch, msg) {
            if text.starts_with(first.as_str()) {
                log::info!("activating mjpeg fallback after error on {}", first);
                self.fallback_watch = None;
                if let Some(ctx) = self.ctx.clone() {
                    let attempt = MjpegAttempt::start(&ctx);
                    self.attempts
                        .insert(TransportKind::Mjpeg, TransportAttempt::Mjpeg(attempt));
                    self.binary_owner = Some(TransportKind::Mjpeg);
                }
            }
        }

        outcome
    }

    /// Binary frames are implicitly attributed to the transport that
    /// currently owns the binary path; without an owner they are dropped.
    pub fn on_binary(&mut self, data: Bytes) {
        match self
            .binary_owner
            .and_then(|kind| self.attempts.get_mut(&kind))
        {
            Some(attempt) => attempt.on_binary(data),
            None => {
                self.dropped_binary += 1;
                log::trace!(
                    "binary frame dropped, no owner ({} so far)",
                    self.dropped_binary
                );
            }
        }
    }

    pub fn on_segment_appended(&mut self) {
        if let Some(TransportAttempt::Mse(attempt)) = self.attempts.get_mut(&TransportKind::Mse) {
            attempt.on_append_complete();
        }
    }

    pub fn peer_connection_alive(&self) -> bool {
        self.attempts.contains_key(&TransportKind::Webrtc)
    }

    /// Negotiated segment codec string; empty until the segment path's
    /// reply arrives (and always empty on the mp4 path).
    pub fn segment_codecs(&self) -> &str {
        match self.attempts.get(&TransportKind::Mse) {
            Some(TransportAttempt::Mse(attempt)) => attempt.negotiated_codecs(),
            _ => "",
        }
    }

    /// WebRTC won the tie-break: tear down everything else and hand the
    /// staged stream over for binding to the visible sink.
    pub async fn promote_webrtc(&mut self) -> StreamHandle {
        let losers: Vec<TransportKind> = self
            .attempts
            .keys()
            .copied()
            .filter(|kind| *kind != TransportKind::Webrtc)
            .collect();
        for kind in losers {
            if let Some(mut attempt) = self.attempts.remove(&kind) {
                attempt.teardown().await;
            }
        }
        self.binary_owner = None;
        self.fallback_watch = None;

        match self.attempts.get(&TransportKind::Webrtc) {
            Some(TransportAttempt::Webrtc(attempt)) => attempt.staged_stream().await,
            _ => StreamHandle::default(),
        }
    }

    /// WebRTC lost (or died): close the peer connection and drop the
    /// attempt; the segment path, if any, remains active.
    pub async fn teardown_webrtc(&mut self) {
        if let Some(mut attempt) = self.attempts.remove(&TransportKind::Webrtc) {
            attempt.teardown().await;
        }
    }

    /// Tear down every attempt and clear all routing.
    pub async fn teardown_all(&mut self) {
        for (_, mut attempt) in self.attempts.drain() {
            attempt.teardown().await;
        }
        self.binary_owner = None;
        self.fallback_watch = None;
        self.ctx = None;
    }
}

#[cfg(test)]
mod tests {
    use super::promotion::*;

    #[test]
    fn test_scores_are_deterministic() {
        for _ in 0..3 {
            assert_eq!(webrtc_score(true, true), 802);
            assert_eq!(webrtc_score(true, false), 544);
            assert_eq!(webrtc_score(false, true), 258);
            assert_eq!(webrtc_score(false, false), 0);
        }
    }

    #[test]
    fn test_segment_scores() {
        assert_eq!(segment_score(""), 0);
        assert_eq!(segment_score("avc1.640029,mp4a.40.2"), 785);
        assert_eq!(segment_score("hvc1.1.6.L153.B0"), 560);
        assert_eq!(segment_score("hvc1.1.6.L153.B0,mp4a.40.2"), 817);
    }

    #[test]
    fn test_full_webrtc_beats_avc_aac_segment() {
        // 802 vs 785: audio+video over the peer connection wins.
        assert!(prefers_webrtc(true, true, "avc1.640029,mp4a.40.2"));
    }

    #[test]
    fn test_video_only_webrtc_loses_to_segment_with_audio() {
        // 544 vs 785: keep the richer segment path.
        assert!(!prefers_webrtc(true, false, "avc1.640029,mp4a.40.2"));
    }

    #[test]
    fn test_webrtc_wins_against_empty_segment_codecs() {
        // No segment reply yet (or mp4 path): any staged media wins.
        assert!(prefers_webrtc(false, false, ""));
        assert!(prefers_webrtc(true, false, ""));
    }

    #[test]
    fn test_hevc_segment_beats_video_only_webrtc() {
        // 544 vs 560: HEVC already flowing through the buffer wins.
        assert!(!prefers_webrtc(true, false, "hvc1.1.6.L153.B0"));
    }
}
