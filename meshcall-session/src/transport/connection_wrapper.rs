use crate::media::{LocalTrack, MediaKind};
use crate::transport::peer_transport::{PeerTransport, TransportFactory};
use crate::transport::transport_config::TransportConfig;
use crate::transport::transport_event::{RemoteTrack, TransportEvent};
use anyhow::{Result, bail};
use async_trait::async_trait;
use meshcall_core::{IceCandidate, PartnerId, SdpKind, SessionDescription};
use std::default::Default;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use webrtc::api::APIBuilder;
use webrtc::api::interceptor_registry::register_default_interceptors;
use webrtc::api::media_engine::MediaEngine;
use webrtc::ice_transport::ice_candidate::{RTCIceCandidate, RTCIceCandidateInit};
use webrtc::ice_transport::ice_server::RTCIceServer;
use webrtc::interceptor::registry::Registry;
use webrtc::peer_connection::RTCPeerConnection;
use webrtc::peer_connection::configuration::RTCConfiguration;
use webrtc::peer_connection::peer_connection_state::RTCPeerConnectionState;
use webrtc::peer_connection::sdp::sdp_type::RTCSdpType;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;
use webrtc::rtp_transceiver::RTCRtpTransceiver;
use webrtc::rtp_transceiver::rtp_receiver::RTCRtpReceiver;
use webrtc::track::track_remote::TrackRemote;

/// `PeerTransport` over a real `RTCPeerConnection`.
pub struct ConnectionWrapper {
    pub partner: PartnerId,
    pub peer_connection: Arc<RTCPeerConnection>,
}

impl ConnectionWrapper {
    pub async fn new(
        partner: PartnerId,
        config: TransportConfig,
        event_tx: mpsc::UnboundedSender<TransportEvent>,
    ) -> Result<Self> {
        let mut m = MediaEngine::default();
        m.register_default_codecs()?;
        let registry = register_default_interceptors(Registry::new(), &mut m)?;

        let api = APIBuilder::new()
            .with_media_engine(m)
            .with_interceptor_registry(registry)
            .build();

        let rtc_config = RTCConfiguration {
            ice_servers: config
                .ice_servers
                .into_iter()
                .map(|server| RTCIceServer {
                    urls: server.urls,
                    username: server.username.unwrap_or_default(),
                    credential: server.credential.unwrap_or_default(),
                    ..Default::default()
                })
                .collect(),
            ..Default::default()
        };

        let peer_connection = Arc::new(api.new_peer_connection(rtc_config).await?);

        let state_tx = event_tx.clone();
        peer_connection.on_peer_connection_state_change(Box::new(
            move |s: RTCPeerConnectionState| {
                let tx = state_tx.clone();

                Box::pin(async move {
                    info!("Peer connection state changed for partner {}: {:?}", partner, s);
                    if s == RTCPeerConnectionState::Failed {
                        let _ = tx.send(TransportEvent::Failed(format!(
                            "peer connection state {s:?}"
                        )));
                    }
                })
            },
        ));

        let ice_tx = event_tx.clone();
        peer_connection.on_ice_candidate(Box::new(move |c: Option<RTCIceCandidate>| {
            let tx = ice_tx.clone();

            Box::pin(async move {
                let Some(candidate) = c else { return };
                let Ok(init) = candidate.to_json() else {
                    return;
                };
                let _ = tx.send(TransportEvent::CandidateGenerated(from_rtc_candidate(init)));
            })
        }));

        let track_tx = event_tx;
        peer_connection.on_track(Box::new(
            move |track: Arc<TrackRemote>,
                  _receiver: Arc<RTCRtpReceiver>,
                  _transceiver: Arc<RTCRtpTransceiver>| {
                let tx = track_tx.clone();

                Box::pin(async move {
                    let Some(kind) = MediaKind::from_codec_type(track.kind()) else {
                        return;
                    };
                    debug!("Remote {} track '{}' from partner {}", kind, track.id(), partner);
                    let _ = tx.send(TransportEvent::RemoteTrack(RemoteTrack {
                        kind,
                        track_id: track.id(),
                        stream_id: track.stream_id(),
                        track: Some(track),
                    }));
                })
            },
        ));

        Ok(Self {
            partner,
            peer_connection,
        })
    }
}

#[async_trait]
impl PeerTransport for ConnectionWrapper {
    async fn create_offer(&self) -> Result<SessionDescription> {
        let offer = self.peer_connection.create_offer(None).await?;
        from_rtc_description(offer)
    }

    async fn create_answer(&self) -> Result<SessionDescription> {
        let answer = self.peer_connection.create_answer(None).await?;
        from_rtc_description(answer)
    }

    async fn set_local_description(&self, desc: SessionDescription) -> Result<()> {
        self.peer_connection
            .set_local_description(to_rtc_description(desc)?)
            .await?;
        Ok(())
    }

    async fn set_remote_description(&self, desc: SessionDescription) -> Result<()> {
        self.peer_connection
            .set_remote_description(to_rtc_description(desc)?)
            .await?;
        Ok(())
    }

    async fn add_ice_candidate(&self, candidate: IceCandidate) -> Result<()> {
        self.peer_connection
            .add_ice_candidate(to_rtc_candidate(candidate))
            .await?;
        Ok(())
    }

    async fn replace_track(&self, kind: MediaKind, track: LocalTrack) -> Result<bool> {
        for sender in self.peer_connection.get_senders().await {
            let Some(current) = sender.track().await else {
                continue;
            };
            if MediaKind::from_codec_type(current.kind()) == Some(kind) {
                sender.replace_track(Some(track)).await?;
                return Ok(true);
            }
        }
        Ok(false)
    }

    async fn add_track(&self, track: LocalTrack) -> Result<()> {
        let sender = self.peer_connection.add_track(track).await?;

        // RTCP has to be drained or the interceptors stall.
        tokio::spawn(async move {
            let mut buf = vec![0u8; 1500];
            while sender.read(&mut buf).await.is_ok() {}
        });
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.peer_connection.close().await?;
        Ok(())
    }
}

/// Opens a fresh `ConnectionWrapper` per partner.
#[derive(Clone, Default)]
pub struct WebRtcTransportFactory {
    config: TransportConfig,
}

impl WebRtcTransportFactory {
    pub fn new(config: TransportConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl TransportFactory for WebRtcTransportFactory {
    async fn open(
        &self,
        partner: PartnerId,
        events: mpsc::UnboundedSender<TransportEvent>,
    ) -> Result<Box<dyn PeerTransport>> {
        let wrapper = ConnectionWrapper::new(partner, self.config.clone(), events).await?;
        Ok(Box::new(wrapper))
    }
}

fn to_rtc_description(desc: SessionDescription) -> Result<RTCSessionDescription> {
    let rtc = match desc.kind {
        SdpKind::Offer => RTCSessionDescription::offer(desc.sdp)?,
        SdpKind::Answer => RTCSessionDescription::answer(desc.sdp)?,
    };
    Ok(rtc)
}

fn from_rtc_description(desc: RTCSessionDescription) -> Result<SessionDescription> {
    match desc.sdp_type {
        RTCSdpType::Offer => Ok(SessionDescription::offer(desc.sdp)),
        RTCSdpType::Answer => Ok(SessionDescription::answer(desc.sdp)),
        other => {
            warn!("Unexpected local description type {}", other);
            bail!("unsupported session description type {other}")
        }
    }
}

fn to_rtc_candidate(candidate: IceCandidate) -> RTCIceCandidateInit {
    RTCIceCandidateInit {
        candidate: candidate.candidate,
        sdp_mid: candidate.sdp_mid,
        sdp_mline_index: candidate.sdp_mline_index,
        username_fragment: candidate.username_fragment,
    }
}

fn from_rtc_candidate(init: RTCIceCandidateInit) -> IceCandidate {
    IceCandidate {
        candidate: init.candidate,
        sdp_mid: init.sdp_mid,
        sdp_mline_index: init.sdp_mline_index,
        username_fragment: init.username_fragment,
    }
}
