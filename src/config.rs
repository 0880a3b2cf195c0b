use std::time::Duration;

use thiserror::Error;
use url::Url;

/// Codec identifiers advertised by default, in preference order.
///
/// High-profile AVC levels first, then HEVC, then AAC variants and Opus.
pub const DEFAULT_CODECS: [&str; 7] = [
    "avc1.640029",
    "avc1.64002A",
    "avc1.640033",
    "hvc1.1.6.L153.B0",
    "mp4a.40.2",
    "mp4a.40.5",
    "opus",
];

/// Public STUN server used when the host supplies no ICE configuration.
pub const DEFAULT_STUN_SERVER: &str = "stun:stun.l.google.com:19302";

/// Grace period between losing visibility and actually tearing the
/// session down.
pub const DEFAULT_DISCONNECT_GRACE: Duration = Duration::from_secs(5);

/// Minimum spacing between consecutive connect attempts.
pub const DEFAULT_RECONNECT_INTERVAL: Duration = Duration::from_secs(1);

/// Configuration surface consumed from the host layer
#[derive(Debug, Clone)]
pub struct StreamConfig {
    /// Comma-joined transport priority list (subset of webrtc/mse/mp4/mjpeg)
    pub mode: String,
    /// Bypass all visibility-driven suspension and keep streaming
    pub background: bool,
    /// React to page visibility changes
    pub visibility_check: bool,
    /// Intersection ratio below which the widget counts as off-screen
    /// (0 disables viewport-based suspension)
    pub visibility_threshold: f32,
    /// How long a suspend must stay un-cancelled before teardown
    pub disconnect_grace: Duration,
    /// Minimum interval between connect attempts
    pub reconnect_interval: Duration,
    /// Ordered codec identifiers the client can decode
    pub codecs: Vec<String>,
    /// ICE server URLs for the peer connection (STUN-only by default)
    pub ice_servers: Vec<String>,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            mode: "webrtc,mse,mp4,mjpeg".to_string(),
            background: false,
            visibility_check: true,
            visibility_threshold: 0.0,
            disconnect_grace: DEFAULT_DISCONNECT_GRACE,
            reconnect_interval: DEFAULT_RECONNECT_INTERVAL,
            codecs: DEFAULT_CODECS.iter().map(|c| c.to_string()).collect(),
            ice_servers: vec![DEFAULT_STUN_SERVER.to_string()],
        }
    }
}

impl StreamConfig {
    /// Profile for unattended displays: never suspend on visibility loss
    /// and back off harder between reconnects.
    pub fn unattended() -> Self {
        Self {
            background: true,
            visibility_check: false,
            reconnect_interval: Duration::from_secs(10),
            ..Self::default()
        }
    }
}

/// Configuration errors surfaced at the crate boundary
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid source locator {locator:?}: {reason}")]
    InvalidSource { locator: String, reason: String },

    #[error("path-relative source {locator:?} requires a base origin")]
    MissingBase { locator: String },

    #[error("unsupported source scheme: {scheme}")]
    UnsupportedScheme { scheme: String },
}

/// Resolve a source locator to a socket-scheme URL.
///
/// `http(s)` locators get their scheme substituted (`http`→`ws`,
/// `https`→`wss`); path-relative locators are joined against the base
/// origin; `ws(s)` locators pass through untouched.
pub fn resolve_source_url(src: &str, base: Option<&Url>) -> Result<Url, ConfigError> {
    let resolved = if src.starts_with("http") {
        format!("ws{}", &src[4..])
    } else if src.starts_with('/') {
        let base = base.ok_or_else(|| ConfigError::MissingBase {
            locator: src.to_string(),
        })?;
        let origin = base.origin().ascii_serialization();
        let origin = if origin.starts_with("http") {
            format!("ws{}", &origin[4..])
        } else {
            origin
        };
        format!("{}{}", origin, src)
    } else {
        src.to_string()
    };

    let url = Url::parse(&resolved).map_err(|e| ConfigError::InvalidSource {
        locator: src.to_string(),
        reason: e.to_string(),
    })?;

    match url.scheme() {
        "ws" | "wss" => Ok(url),
        other => Err(ConfigError::UnsupportedScheme {
            scheme: other.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = StreamConfig::default();
        assert_eq!(config.mode, "webrtc,mse,mp4,mjpeg");
        assert!(!config.background);
        assert!(config.visibility_check);
        assert_eq!(config.disconnect_grace, Duration::from_secs(5));
        assert_eq!(config.reconnect_interval, Duration::from_secs(1));
        assert_eq!(config.codecs.len(), 7);
    }

    #[test]
    fn test_unattended_profile() {
        let config = StreamConfig::unattended();
        assert!(config.background);
        assert!(!config.visibility_check);
        assert_eq!(config.reconnect_interval, Duration::from_secs(10));
    }

    #[test]
    fn test_resolve_http_sources() {
        let url = resolve_source_url("http://cam.local:1984/api/ws?src=door", None).unwrap();
        assert_eq!(url.as_str(), "ws://cam.local:1984/api/ws?src=door");

        let url = resolve_source_url("https://cam.local/api/ws?src=door", None).unwrap();
        assert_eq!(url.scheme(), "wss");
    }

    #[test]
    fn test_resolve_path_relative_source() {
        let base = Url::parse("https://panel.local:8443/ui/").unwrap();
        let url = resolve_source_url("/api/ws?src=door", Some(&base)).unwrap();
        assert_eq!(url.as_str(), "wss://panel.local:8443/api/ws?src=door");

        assert!(matches!(
            resolve_source_url("/api/ws", None),
            Err(ConfigError::MissingBase { .. })
        ));
    }

    #[test]
    fn test_resolve_socket_source_passthrough() {
        let url = resolve_source_url("ws://cam.local:1984/api/ws?src=door", None).unwrap();
        assert_eq!(url.scheme(), "ws");
    }

    #[test]
    fn test_resolve_rejects_other_schemes() {
        assert!(matches!(
            resolve_source_url("rtsp://cam.local/stream", None),
            Err(ConfigError::UnsupportedScheme { .. })
        ));
        assert!(resolve_source_url("not a url", None).is_err());
    }
}
