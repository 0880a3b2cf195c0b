use thiserror::Error;

/// Transport attempt errors.
///
/// These never leave the negotiation layer: a failed attempt is logged
/// and skipped, and the surviving attempts (or the reconnect path) carry
/// the session.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("unknown transport: {0}")]
    UnknownTransport(String),

    #[error("WebRTC error: {0}")]
    WebRtc(String),

    #[error("segment source unavailable: {0}")]
    SegmentSource(String),
}
