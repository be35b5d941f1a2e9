use crate::transport::{
    LinkTag, PeerSession, RemoteTrack, SessionFactory, SessionState, TransportConfig,
    TransportEvent,
};
use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use meshcall_core::{IceServerConfig, SdpKind, SessionDescription};
use serde_json::Value;
use std::sync::{Arc, PoisonError, RwLock};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, info, warn};
use webrtc::api::APIBuilder;
use webrtc::api::interceptor_registry::register_default_interceptors;
use webrtc::api::media_engine::MediaEngine;
use webrtc::ice_transport::ice_candidate::{RTCIceCandidate, RTCIceCandidateInit};
use webrtc::interceptor::registry::Registry;
use webrtc::peer_connection::RTCPeerConnection;
use webrtc::peer_connection::configuration::RTCConfiguration;
use webrtc::peer_connection::peer_connection_state::RTCPeerConnectionState;
use webrtc::peer_connection::sdp::sdp_type::RTCSdpType;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;
use webrtc::rtp_transceiver::RTCRtpTransceiverInit;
use webrtc::rtp_transceiver::rtp_codec::RTPCodecType;
use webrtc::rtp_transceiver::rtp_transceiver_direction::RTCRtpTransceiverDirection;
use webrtc::track::track_local::TrackLocal;

pub type LocalTrack = Arc<dyn TrackLocal + Send + Sync>;

/// Builds webrtc-rs peer connections. Local tracks are attached to every
/// session that is allowed to send; otherwise receive-only transceivers are
/// added so the remote still offers its media.
pub struct WebRtcSessionFactory {
    config: RwLock<TransportConfig>,
    local_tracks: Vec<LocalTrack>,
}

impl WebRtcSessionFactory {
    pub fn new(config: TransportConfig) -> Self {
        Self {
            config: RwLock::new(config),
            local_tracks: Vec::new(),
        }
    }

    pub fn with_local_tracks(mut self, tracks: Vec<LocalTrack>) -> Self {
        self.local_tracks = tracks;
        self
    }

    fn current_config(&self) -> TransportConfig {
        self.config
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Default for WebRtcSessionFactory {
    fn default() -> Self {
        Self::new(TransportConfig::default())
    }
}

#[async_trait]
impl SessionFactory for WebRtcSessionFactory {
    type Session = WebRtcSession;

    async fn create_session(
        &self,
        tag: LinkTag,
        send_media: bool,
        events: mpsc::Sender<TransportEvent>,
    ) -> Result<WebRtcSession> {
        let config = self.current_config();

        let mut m = MediaEngine::default();
        m.register_default_codecs()?;
        let registry = register_default_interceptors(Registry::new(), &mut m)?;

        let api = APIBuilder::new()
            .with_media_engine(m)
            .with_interceptor_registry(registry)
            .build();

        let rtc_config = RTCConfiguration {
            ice_servers: config.rtc_ice_servers(),
            ..Default::default()
        };

        let peer_connection = Arc::new(api.new_peer_connection(rtc_config).await?);

        if send_media && !self.local_tracks.is_empty() {
            for track in &self.local_tracks {
                peer_connection
                    .add_track(Arc::clone(track))
                    .await
                    .context("Failed to attach local track")?;
            }
        } else {
            for kind in [RTPCodecType::Audio, RTPCodecType::Video] {
                peer_connection
                    .add_transceiver_from_kind(
                        kind,
                        Some(RTCRtpTransceiverInit {
                            direction: RTCRtpTransceiverDirection::Recvonly,
                            send_encodings: Vec::new(),
                        }),
                    )
                    .await?;
            }
        }

        let state_tx = events.clone();
        peer_connection.on_peer_connection_state_change(Box::new(
            move |s: RTCPeerConnectionState| {
                let tx = state_tx.clone();

                Box::pin(async move {
                    info!("Peer connection to {} is now {:?}", tag.remote, s);
                    let state = match s {
                        RTCPeerConnectionState::New | RTCPeerConnectionState::Connecting => {
                            SessionState::Connecting
                        }
                        RTCPeerConnectionState::Connected => SessionState::Connected,
                        RTCPeerConnectionState::Disconnected => SessionState::Disconnected,
                        RTCPeerConnectionState::Failed => SessionState::Failed,
                        RTCPeerConnectionState::Closed => SessionState::Closed,
                        RTCPeerConnectionState::Unspecified => return,
                    };
                    forward(&tx, TransportEvent::StateChanged(tag, state));
                })
            },
        ));

        let ice_tx = events.clone();
        peer_connection.on_ice_candidate(Box::new(move |c: Option<RTCIceCandidate>| {
            let tx = ice_tx.clone();

            Box::pin(async move {
                // Gathering finished; nothing to forward.
                let Some(candidate) = c else { return };
                let init = match candidate.to_json() {
                    Ok(init) => init,
                    Err(e) => {
                        warn!("Failed to serialize local candidate: {}", e);
                        return;
                    }
                };
                let Ok(json) = serde_json::to_value(&init) else {
                    return;
                };
                forward(&tx, TransportEvent::CandidateGenerated(tag, json));
            })
        }));

        let track_tx = events;
        peer_connection.on_track(Box::new(move |track, _receiver, _transceiver| {
            let tx = track_tx.clone();

            Box::pin(async move {
                let remote_track = RemoteTrack::new(
                    track.id(),
                    track.stream_id(),
                    track.kind().to_string(),
                    track,
                );
                debug!("Remote {} track from {}", remote_track.kind, tag.remote);
                forward(&tx, TransportEvent::TrackArrived(tag, remote_track));
            })
        }));

        Ok(WebRtcSession {
            tag,
            peer_connection,
        })
    }

    fn set_ice_servers(&self, servers: Vec<IceServerConfig>) {
        let mut config = self.config.write().unwrap_or_else(PoisonError::into_inner);
        config.ice_servers = servers;
    }
}

pub struct WebRtcSession {
    tag: LinkTag,
    peer_connection: Arc<RTCPeerConnection>,
}

impl WebRtcSession {
    pub fn tag(&self) -> LinkTag {
        self.tag
    }

    pub fn peer_connection(&self) -> &Arc<RTCPeerConnection> {
        &self.peer_connection
    }
}

/// Hands an event to the coordinator without waiting. webrtc-rs runs these
/// callbacks on tasks that `close()` may be waiting on.
fn forward(tx: &mpsc::Sender<TransportEvent>, event: TransportEvent) {
    match tx.try_send(event) {
        Ok(()) => {}
        Err(TrySendError::Full(event)) => {
            warn!("Transport queue full, dropping event for {}", event.tag().remote);
        }
        Err(TrySendError::Closed(_)) => {
            debug!("Mesh coordinator gone, dropping transport event");
        }
    }
}

fn to_rtc(desc: SessionDescription) -> Result<RTCSessionDescription> {
    let rtc = match desc.kind {
        SdpKind::Offer => RTCSessionDescription::offer(desc.sdp)?,
        SdpKind::Answer => RTCSessionDescription::answer(desc.sdp)?,
        SdpKind::Pranswer => RTCSessionDescription::pranswer(desc.sdp)?,
        SdpKind::Rollback => bail!("rollback descriptions are not supported"),
    };
    Ok(rtc)
}

fn from_rtc(desc: RTCSessionDescription) -> Result<SessionDescription> {
    let kind = match desc.sdp_type {
        RTCSdpType::Offer => SdpKind::Offer,
        RTCSdpType::Answer => SdpKind::Answer,
        RTCSdpType::Pranswer => SdpKind::Pranswer,
        RTCSdpType::Rollback => SdpKind::Rollback,
        RTCSdpType::Unspecified => bail!("session description has no type"),
    };
    Ok(SessionDescription {
        kind,
        sdp: desc.sdp,
    })
}

#[async_trait]
impl PeerSession for WebRtcSession {
    async fn create_offer(&self) -> Result<SessionDescription> {
        let offer = self.peer_connection.create_offer(None).await?;
        from_rtc(offer)
    }

    async fn create_answer(&self) -> Result<SessionDescription> {
        let answer = self.peer_connection.create_answer(None).await?;
        from_rtc(answer)
    }

    async fn set_local_description(&self, desc: SessionDescription) -> Result<()> {
        self.peer_connection
            .set_local_description(to_rtc(desc)?)
            .await?;
        Ok(())
    }

    async fn set_remote_description(&self, desc: SessionDescription) -> Result<()> {
        self.peer_connection
            .set_remote_description(to_rtc(desc)?)
            .await?;
        Ok(())
    }

    async fn add_ice_candidate(&self, candidate: Value) -> Result<()> {
        let candidate: RTCIceCandidateInit =
            serde_json::from_value(candidate).context("Failed to parse ICE candidate JSON")?;
        self.peer_connection.add_ice_candidate(candidate).await?;
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.peer_connection.close().await?;
        Ok(())
    }
}
