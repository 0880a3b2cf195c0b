use thiserror::Error;

/// Signaling channel errors.
///
/// None of these propagate out of a running session: construction
/// failures route into the disconnect/reconnect path, everything else is
/// logged and absorbed.
#[derive(Debug, Error)]
pub enum SignalError {
    #[error("unsupported socket scheme: {0}")]
    UnsupportedScheme(String),

    #[error("socket construction failed: {0}")]
    Construction(String),

    #[error("WebSocket error: {0}")]
    WebSocket(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}
