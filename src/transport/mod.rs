//! Delivery transports and their arbitration.
//!
//! Each transport is a case in a closed variant with a common capability
//! surface (start / control handler / binary sink / teardown); the
//! negotiator owns the active instances in a map keyed by transport name
//! and resolves the WebRTC-vs-segment race with the promotion tie-break.

use std::str::FromStr;

use bytes::Bytes;

use crate::signaling::SignalMessage;

pub mod error;
pub mod fallback;
pub mod mse;
pub mod negotiator;
pub mod webrtc;

pub use error::TransportError;
pub use fallback::{MjpegAttempt, Mp4Attempt};
pub use mse::{MseAttempt, PendingSegmentQueue};
pub use negotiator::{ControlOutcome, RoundContext, RoundStart, TransportNegotiator};
pub use webrtc::WebRtcAttempt;

/// Named transport variants, in the order they appear in mode strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportKind {
    Webrtc,
    Mse,
    Mp4,
    Mjpeg,
}

impl TransportKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransportKind::Webrtc => "webrtc",
            TransportKind::Mse => "mse",
            TransportKind::Mp4 => "mp4",
            TransportKind::Mjpeg => "mjpeg",
        }
    }

    /// Parse a comma-joined transport priority string, preserving order.
    /// Unknown tokens are logged and skipped.
    pub fn parse_mode(mode: &str) -> Vec<TransportKind> {
        mode.split(',')
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .filter_map(|token| match token.parse() {
                Ok(kind) => Some(kind),
                Err(_) => {
                    log::warn!("unknown transport in mode string: {:?}", token);
                    None
                }
            })
            .collect()
    }
}

impl std::fmt::Display for TransportKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransportKind {
    type Err = TransportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "webrtc" => Ok(TransportKind::Webrtc),
            "mse" => Ok(TransportKind::Mse),
            "mp4" => Ok(TransportKind::Mp4),
            "mjpeg" => Ok(TransportKind::Mjpeg),
            other => Err(TransportError::UnknownTransport(other.to_string())),
        }
    }
}

/// Disposition returned by an attempt's control handler.
#[derive(Debug, Default)]
pub struct ControlDisposition {
    /// The attempt asked to be torn down (e.g. its offer was rejected).
    pub abort: bool,
}

/// One in-flight transport attempt. Many may race; at most one is ever
/// bound to the rendered sink.
pub enum TransportAttempt {
    Webrtc(WebRtcAttempt),
    Mse(MseAttempt),
    Mp4(Mp4Attempt),
    Mjpeg(MjpegAttempt),
}

impl TransportAttempt {
    pub fn kind(&self) -> TransportKind {
        match self {
            TransportAttempt::Webrtc(_) => TransportKind::Webrtc,
            TransportAttempt::Mse(_) => TransportKind::Mse,
            TransportAttempt::Mp4(_) => TransportKind::Mp4,
            TransportAttempt::Mjpeg(_) => TransportKind::Mjpeg,
        }
    }

    /// Control messages fan out to every live attempt; each reacts only
    /// to the types it understands.
    pub async fn on_control(&mut self, msg: &SignalMessage) -> ControlDisposition {
        match self {
            TransportAttempt::Webrtc(attempt) => attempt.on_control(msg).await,
            TransportAttempt::Mse(attempt) => {
                attempt.on_control(msg);
                ControlDisposition::default()
            }
            TransportAttempt::Mp4(_) | TransportAttempt::Mjpeg(_) => ControlDisposition::default(),
        }
    }

    /// Binary payloads go only to the attempt owning the binary path.
    pub fn on_binary(&mut self, data: Bytes) {
        match self {
            TransportAttempt::Mse(attempt) => attempt.on_binary(data),
            TransportAttempt::Mp4(attempt) => attempt.on_binary(data),
            TransportAttempt::Mjpeg(attempt) => attempt.on_binary(data),
            TransportAttempt::Webrtc(_) => {
                log::trace!("binary frame ignored by webrtc attempt");
            }
        }
    }

    pub async fn teardown(&mut self) {
        if let TransportAttempt::Webrtc(attempt) = self {
            attempt.teardown().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_mode_preserves_order() {
        assert_eq!(
            TransportKind::parse_mode("webrtc,mse,mp4,mjpeg"),
            vec![
                TransportKind::Webrtc,
                TransportKind::Mse,
                TransportKind::Mp4,
                TransportKind::Mjpeg
            ]
        );
        assert_eq!(
            TransportKind::parse_mode("mse, webrtc"),
            vec![TransportKind::Mse, TransportKind::Webrtc]
        );
    }

    #[test]
    fn test_parse_mode_skips_unknown_tokens() {
        assert_eq!(
            TransportKind::parse_mode("hls,webrtc,"),
            vec![TransportKind::Webrtc]
        );
        assert!(TransportKind::parse_mode("").is_empty());
    }
}
