use std::sync::Arc;

use tokio::sync::Mutex;
use webrtc::api::interceptor_registry::register_default_interceptors;
use webrtc::api::media_engine::MediaEngine;
use webrtc::api::APIBuilder;
use webrtc::ice_transport::ice_candidate::RTCIceCandidateInit;
use webrtc::ice_transport::ice_server::RTCIceServer;
use webrtc::interceptor::registry::Registry;
use webrtc::peer_connection::configuration::RTCConfiguration;
use webrtc::peer_connection::peer_connection_state::RTCPeerConnectionState;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;
use webrtc::peer_connection::RTCPeerConnection;
use webrtc::rtp_transceiver::rtp_codec::RTPCodecType;
use webrtc::rtp_transceiver::rtp_transceiver_direction::RTCRtpTransceiverDirection;
use webrtc::rtp_transceiver::RTCRtpTransceiverInit;
use webrtc::track::track_remote::TrackRemote;

use crate::session::SessionEvent;
use crate::signaling::SignalMessage;
use crate::sink::StreamHandle;
use crate::transport::negotiator::RoundContext;
use crate::transport::{ControlDisposition, TransportError};

/// Media-line id the relay answers with; remote candidates bind to it.
const MEDIA_LINE_ID: &str = "0";

/// Remote media staged off-screen until the tie-break commits to it.
#[derive(Default)]
struct StagedStream {
    stream_id: Option<String>,
    video: Option<Arc<TrackRemote>>,
    audio: Option<Arc<TrackRemote>>,
    first_frame_sent: bool,
}

/// Receive-only WebRTC negotiation attempt.
///
/// Drives offer/answer/ICE over the signaling channel and stages inbound
/// media away from the visible sink so quality can be evaluated before
/// commitment.
pub struct WebRtcAttempt {
    pc: Option<Arc<RTCPeerConnection>>,
    staged: Arc<Mutex<StagedStream>>,
}

impl WebRtcAttempt {
    /// Create the peer connection (STUN-only ICE, unified-plan, two
    /// receive-only transceivers), wire its callbacks into the session
    /// queue and send the local offer.
    pub async fn start(ctx: &RoundContext) -> Result<Self, TransportError> {
        let mut media_engine = MediaEngine::default();
        media_engine
            .register_default_codecs()
            .map_err(|e| TransportError::WebRtc(format!("codec registration failed: {}", e)))?;

        let mut registry = Registry::new();
        registry = register_default_interceptors(registry, &mut media_engine)
            .map_err(|e| TransportError::WebRtc(format!("interceptor registration failed: {}", e)))?;

        let api = APIBuilder::new()
            .with_media_engine(media_engine)
            .with_interceptor_registry(registry)
            .build();

        let rtc_config = RTCConfiguration {
            ice_servers: ctx
                .ice_servers
                .iter()
                .map(|url| RTCIceServer {
                    urls: vec![url.clone()],
                    ..Default::default()
                })
                .collect(),
            ..Default::default()
        };

        let pc = Arc::new(
            api.new_peer_connection(rtc_config)
                .await
                .map_err(|e| TransportError::WebRtc(format!("peer connection failed: {}", e)))?,
        );

        let staged = Arc::new(Mutex::new(StagedStream::default()));

        // Every local candidate goes to the relay; the empty string marks
        // end-of-candidates.
        let sender = ctx.sender.clone();
        pc.on_ice_candidate(Box::new(move |candidate| {
            let sender = sender.clone();
            Box::pin(async move {
                let value = match candidate {
                    Some(candidate) => match candidate.to_json() {
                        Ok(init) => init.candidate,
                        Err(e) => {
                            log::debug!("unserializable local candidate: {}", e);
                            return;
                        }
                    },
                    None => String::new(),
                };
                sender.send(SignalMessage::WebrtcCandidate(value));
            })
        }));

        // Stage the first stream whose id is not a synthetic placeholder
        // (placeholder ids carry a reserved leading brace). The first RTP
        // packet read from any staged track is the first-decodable-frame
        // signal feeding the promotion tie-break.
        let staged_for_tracks = staged.clone();
        let events = ctx.events.clone();
        pc.on_track(Box::new(move |track, _receiver, _transceiver| {
            let staged = staged_for_tracks.clone();
            let events = events.clone();
            Box::pin(async move {
                let stream_id = track.stream_id();
                if stream_id.starts_with('{') {
                    log::debug!("ignoring placeholder stream {:?}", stream_id);
                    return;
                }
                {
                    let mut state = staged.lock().await;
                    match &state.stream_id {
                        None => state.stream_id = Some(stream_id.clone()),
                        Some(bound) if *bound != stream_id => {
                            log::debug!("ignoring track from secondary stream {:?}", stream_id);
                            return;
                        }
                        Some(_) => {}
                    }
                    match track.kind() {
                        RTPCodecType::Video => state.video = Some(track.clone()),
                        RTPCodecType::Audio => state.audio = Some(track.clone()),
                        _ => {}
                    }
                }
                tokio::spawn(async move {
                    if track.read_rtp().await.is_ok() {
                        let mut state = staged.lock().await;
                        if !state.first_frame_sent {
                            state.first_frame_sent = true;
                            let _ = events.send(SessionEvent::FirstFrame {
                                has_video: state.video.is_some(),
                                has_audio: state.audio.is_some(),
                            });
                        }
                    }
                });
            })
        }));

        // failed/disconnected means a fresh top-level reconnect; there is
        // no incremental ICE-restart path.
        let events = ctx.events.clone();
        pc.on_peer_connection_state_change(Box::new(move |state| {
            let events = events.clone();
            Box::pin(async move {
                log::debug!("peer connection state: {:?}", state);
                if matches!(
                    state,
                    RTCPeerConnectionState::Failed | RTCPeerConnectionState::Disconnected
                ) {
                    let _ = events.send(SessionEvent::PeerFailed);
                }
            })
        }));

        // The client never publishes media.
        for kind in [RTPCodecType::Video, RTPCodecType::Audio] {
            pc.add_transceiver_from_kind(
                kind,
                Some(RTCRtpTransceiverInit {
                    direction: RTCRtpTransceiverDirection::Recvonly,
                    send_encodings: vec![],
                }),
            )
            .await
            .map_err(|e| TransportError::WebRtc(format!("transceiver failed: {}", e)))?;
        }

        let offer = pc
            .create_offer(None)
            .await
            .map_err(|e| TransportError::WebRtc(format!("offer failed: {}", e)))?;
        pc.set_local_description(offer.clone())
            .await
            .map_err(|e| TransportError::WebRtc(format!("local description failed: {}", e)))?;
        ctx.sender.send(SignalMessage::WebrtcOffer(offer.sdp));

        Ok(Self {
            pc: Some(pc),
            staged,
        })
    }

    /// Apply answer/candidate messages; SDP and ICE rejections are logged
    /// and swallowed, negotiation continues. A relay error referencing
    /// the offer aborts the attempt.
    pub async fn on_control(&mut self, msg: &SignalMessage) -> ControlDisposition {
        let Some(pc) = &self.pc else {
            return ControlDisposition::default();
        };
        match msg {
            SignalMessage::WebrtcAnswer(sdp) => match RTCSessionDescription::answer(sdp.clone()) {
                Ok(answer) => {
                    if let Err(e) = pc.set_remote_description(answer).await {
                        log::debug!("remote description rejected: {}", e);
                    }
                }
                Err(e) => log::debug!("invalid answer sdp: {}", e),
            },
            SignalMessage::WebrtcCandidate(value) => {
                let init = RTCIceCandidateInit {
                    candidate: value.clone(),
                    sdp_mid: Some(MEDIA_LINE_ID.to_string()),
                    ..Default::default()
                };
                if let Err(e) = pc.add_ice_candidate(init).await {
                    log::debug!("remote candidate rejected: {}", e);
                }
            }
            SignalMessage::Error(text) if text.contains("webrtc/offer") => {
                log::warn!("offer rejected by relay: {}", text);
                return ControlDisposition { abort: true };
            }
            _ => {}
        }
        ControlDisposition::default()
    }

    /// Staged stream handle for binding to the visible sink on promotion.
    pub async fn staged_stream(&self) -> StreamHandle {
        let state = self.staged.lock().await;
        StreamHandle {
            stream_id: state.stream_id.clone().unwrap_or_default(),
            video_track: state.video.clone(),
            audio_track: state.audio.clone(),
        }
    }

    /// Close and null the peer connection; safe to call repeatedly.
    pub async fn teardown(&mut self) {
        if let Some(pc) = self.pc.take() {
            if let Err(e) = pc.close().await {
                log::debug!("peer connection close: {}", e);
            }
        }
    }

    pub fn is_alive(&self) -> bool {
        self.pc.is_some()
    }
}
