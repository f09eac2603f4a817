use crate::config::CallConfig;
use crate::error::LinkError;
use crate::link::{LinkEvent, LinkEventKind, LinkRole, LinkSpec, PeerConnector, PeerLink};
use crate::media::LocalMedia;
use anyhow::Result;
use async_trait::async_trait;
use ghostcall_core::{LinkId, ParticipantId, SignalPayload};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
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
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;

/// Формат payload, совместимый с simple-peer: offer/answer или trickle-кандидат.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum RtcSignal {
    Offer { sdp: String },
    Answer { sdp: String },
    Candidate { candidate: RTCIceCandidateInit },
}

impl RtcSignal {
    fn into_payload(self) -> Result<SignalPayload, LinkError> {
        Ok(SignalPayload::new(serde_json::to_value(self)?))
    }
}

/// Исходящие ICE-кандидаты придерживаются, пока не отправлен offer/answer:
/// удалённая сторона применяет payload строго по порядку.
#[derive(Default)]
struct CandidateGate {
    open: bool,
    held: Vec<SignalPayload>,
}

struct Outbound {
    remote: ParticipantId,
    link_id: LinkId,
    events: mpsc::UnboundedSender<LinkEvent>,
    gate: Mutex<CandidateGate>,
}

impl Outbound {
    fn send(&self, payload: SignalPayload) -> bool {
        self.events
            .send(LinkEvent::new(
                self.remote.clone(),
                self.link_id,
                LinkEventKind::SignalGenerated(payload),
            ))
            .is_ok()
    }

    fn candidate(&self, payload: SignalPayload) {
        let Ok(mut gate) = self.gate.lock() else {
            return;
        };
        if gate.open {
            self.send(payload);
        } else {
            gate.held.push(payload);
        }
    }

    /// Sends the local description, then everything held behind it.
    fn description(&self, payload: SignalPayload) -> Result<(), LinkError> {
        let Ok(mut gate) = self.gate.lock() else {
            return Err(LinkError::Destroyed);
        };
        if !self.send(payload) {
            return Err(LinkError::Destroyed);
        }
        gate.open = true;
        for held in gate.held.drain(..) {
            self.send(held);
        }
        Ok(())
    }
}

/// Соединение на базе `webrtc`: одна `RTCPeerConnection` на удалённого участника.
pub struct RtcPeerLink {
    remote: ParticipantId,
    link_id: LinkId,
    peer_connection: Arc<RTCPeerConnection>,
    outbound: Arc<Outbound>,
    /// Кандидаты, пришедшие раньше remote description.
    early_candidates: Vec<RTCIceCandidateInit>,
    has_remote_description: bool,
    destroyed: AtomicBool,
}

impl RtcPeerLink {
    pub async fn new(
        spec: LinkSpec,
        config: &CallConfig,
        media: &Arc<dyn LocalMedia>,
        events: mpsc::UnboundedSender<LinkEvent>,
    ) -> Result<Self> {
        let mut m = MediaEngine::default();
        m.register_default_codecs()?;
        let registry = register_default_interceptors(Registry::new(), &mut m)?;

        let api = APIBuilder::new()
            .with_media_engine(m)
            .with_interceptor_registry(registry)
            .build();

        let ice_servers = if config.ice_servers.is_empty() {
            vec![]
        } else {
            vec![RTCIceServer {
                urls: config.ice_servers.clone(),
                ..Default::default()
            }]
        };

        let rtc_config = RTCConfiguration {
            ice_servers,
            ..Default::default()
        };

        let peer_connection = Arc::new(api.new_peer_connection(rtc_config).await?);

        if let Some(track) = media.track() {
            let rtp_sender = peer_connection.add_track(track).await?;
            // RTCP нужно вычитывать, иначе интерцепторы не работают.
            tokio::spawn(async move {
                let mut rtcp_buf = vec![0u8; 1500];
                while rtp_sender.read(&mut rtcp_buf).await.is_ok() {}
            });
        }

        let state_tx = events.clone();
        let uid_state = spec.remote.clone();
        let link_id = spec.link_id;
        peer_connection.on_peer_connection_state_change(Box::new(
            move |s: RTCPeerConnectionState| {
                let tx = state_tx.clone();
                let uid = uid_state.clone();

                Box::pin(async move {
                    info!("Peer connection state for {}: {:?}", uid, s);
                    let kind = match s {
                        RTCPeerConnectionState::Connected => LinkEventKind::Connected,
                        RTCPeerConnectionState::Failed => {
                            LinkEventKind::Failed("ICE negotiation failed".to_owned())
                        }
                        RTCPeerConnectionState::Disconnected | RTCPeerConnectionState::Closed => {
                            LinkEventKind::Disconnected
                        }
                        _ => return,
                    };
                    let _ = tx.send(LinkEvent::new(uid, link_id, kind));
                })
            },
        ));

        let outbound = Arc::new(Outbound {
            remote: spec.remote.clone(),
            link_id,
            events,
            gate: Mutex::new(CandidateGate::default()),
        });

        let ice_out = outbound.clone();
        peer_connection.on_ice_candidate(Box::new(move |c: Option<RTCIceCandidate>| {
            let out = ice_out.clone();

            Box::pin(async move {
                let Some(candidate) = c else { return };
                let Ok(init) = candidate.to_json() else {
                    return;
                };
                let Ok(payload) = (RtcSignal::Candidate { candidate: init }).into_payload() else {
                    return;
                };
                out.candidate(payload);
            })
        }));

        let link = Self {
            remote: spec.remote,
            link_id,
            peer_connection,
            outbound,
            early_candidates: Vec::new(),
            has_remote_description: false,
            destroyed: AtomicBool::new(false),
        };

        if spec.role == LinkRole::Initiator {
            link.send_offer().await?;
        }

        Ok(link)
    }

    async fn send_offer(&self) -> Result<(), LinkError> {
        let offer = self.peer_connection.create_offer(None).await?;
        self.peer_connection
            .set_local_description(offer.clone())
            .await?;
        debug!("Offer created for {}", self.remote);
        self.outbound
            .description(RtcSignal::Offer { sdp: offer.sdp }.into_payload()?)
    }

    async fn answer(&mut self, sdp: String) -> Result<(), LinkError> {
        let desc = RTCSessionDescription::offer(sdp)?;
        self.set_remote(desc).await?;

        let answer = self.peer_connection.create_answer(None).await?;
        self.peer_connection
            .set_local_description(answer.clone())
            .await?;
        debug!("Answer created for {}", self.remote);
        self.outbound
            .description(RtcSignal::Answer { sdp: answer.sdp }.into_payload()?)
    }

    async fn set_remote(&mut self, desc: RTCSessionDescription) -> Result<(), LinkError> {
        self.peer_connection.set_remote_description(desc).await?;
        self.has_remote_description = true;

        for candidate in std::mem::take(&mut self.early_candidates) {
            if let Err(e) = self.peer_connection.add_ice_candidate(candidate).await {
                warn!("Dropping early ICE candidate from {}: {}", self.remote, e);
            }
        }
        Ok(())
    }
}

#[async_trait]
impl PeerLink for RtcPeerLink {
    fn link_id(&self) -> LinkId {
        self.link_id
    }

    async fn signal(&mut self, payload: &SignalPayload) -> Result<(), LinkError> {
        if self.destroyed.load(Ordering::Acquire) {
            return Err(LinkError::Destroyed);
        }

        match serde_json::from_value::<RtcSignal>(payload.0.clone())? {
            RtcSignal::Offer { sdp } => self.answer(sdp).await,
            RtcSignal::Answer { sdp } => {
                let desc = RTCSessionDescription::answer(sdp)?;
                self.set_remote(desc).await
            }
            RtcSignal::Candidate { candidate } => {
                if !self.has_remote_description {
                    self.early_candidates.push(candidate);
                    return Ok(());
                }
                self.peer_connection.add_ice_candidate(candidate).await?;
                Ok(())
            }
        }
    }

    async fn destroy(&mut self) {
        if self.destroyed.swap(true, Ordering::AcqRel) {
            return;
        }
        if let Err(e) = self.peer_connection.close().await {
            warn!("Failed to close peer connection for {}: {}", self.remote, e);
        }
    }
}

/// `PeerConnector`, создающий `RtcPeerLink` с настройками из `CallConfig`.
#[derive(Clone, Default)]
pub struct RtcConnector {
    config: CallConfig,
}

impl RtcConnector {
    pub fn new(config: CallConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl PeerConnector for RtcConnector {
    async fn connect(
        &self,
        spec: LinkSpec,
        media: &Arc<dyn LocalMedia>,
        events: mpsc::UnboundedSender<LinkEvent>,
    ) -> Result<Box<dyn PeerLink>> {
        let link = RtcPeerLink::new(spec, &self.config, media, events).await?;
        Ok(Box::new(link))
    }
}
