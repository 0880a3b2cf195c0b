use serde::{Deserialize, Serialize};

/// JSON control envelope exchanged over the signaling channel.
///
/// One type per message; binary frames share the connection but carry no
/// envelope, belonging to whichever transport currently owns the binary
/// path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum SignalMessage {
    /// Local SDP offer, client → relay.
    #[serde(rename = "webrtc/offer")]
    WebrtcOffer(String),

    /// Remote SDP answer, relay → client.
    #[serde(rename = "webrtc/answer")]
    WebrtcAnswer(String),

    /// ICE candidate in either direction; the empty string marks
    /// end-of-candidates.
    #[serde(rename = "webrtc/candidate")]
    WebrtcCandidate(String),

    /// Segment-path capability advertisement (client → relay) or the
    /// negotiated codec string (relay → client).
    #[serde(rename = "mse")]
    Mse(String),

    /// Progressive-fragment capability advertisement.
    #[serde(rename = "mp4")]
    Mp4(String),

    /// Snapshot mode activation; no payload.
    #[serde(rename = "mjpeg")]
    Mjpeg,

    /// Human-readable failure text; inspected for transport-name
    /// substrings to drive fallback and abort logic.
    #[serde(rename = "error")]
    Error(String),
}

impl SignalMessage {
    /// Short tag for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            SignalMessage::WebrtcOffer(_) => "webrtc/offer",
            SignalMessage::WebrtcAnswer(_) => "webrtc/answer",
            SignalMessage::WebrtcCandidate(_) => "webrtc/candidate",
            SignalMessage::Mse(_) => "mse",
            SignalMessage::Mp4(_) => "mp4",
            SignalMessage::Mjpeg => "mjpeg",
            SignalMessage::Error(_) => "error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_round_trip() {
        let msg = SignalMessage::WebrtcCandidate("candidate:1 1 udp 2 1.2.3.4 5 typ host".into());
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("\"type\":\"webrtc/candidate\""));
        assert_eq!(serde_json::from_str::<SignalMessage>(&json).unwrap(), msg);
    }

    #[test]
    fn test_mjpeg_has_no_value() {
        let json = serde_json::to_string(&SignalMessage::Mjpeg).unwrap();
        assert_eq!(json, "{\"type\":\"mjpeg\"}");
        assert_eq!(
            serde_json::from_str::<SignalMessage>("{\"type\":\"mjpeg\"}").unwrap(),
            SignalMessage::Mjpeg
        );
    }

    #[test]
    fn test_end_of_candidates_marker() {
        let json = serde_json::to_string(&SignalMessage::WebrtcCandidate(String::new())).unwrap();
        assert_eq!(json, "{\"type\":\"webrtc/candidate\",\"value\":\"\"}");
    }

    #[test]
    fn test_unknown_types_fail_to_parse() {
        // The channel drops these instead of failing the dispatcher; the
        // relay's host layer also emits e.g. "stream" and "hls" messages.
        assert!(serde_json::from_str::<SignalMessage>("{\"type\":\"hls\",\"value\":\"x\"}").is_err());
        assert!(serde_json::from_str::<SignalMessage>("{\"type\":\"stream\"}").is_err());
    }

    #[test]
    fn test_error_payload() {
        let msg: SignalMessage =
            serde_json::from_str("{\"type\":\"error\",\"value\":\"streams: unknown source\"}")
                .unwrap();
        assert_eq!(msg, SignalMessage::Error("streams: unknown source".into()));
    }
}
