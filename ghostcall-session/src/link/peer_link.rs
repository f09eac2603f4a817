use crate::error::LinkError;
use crate::link::LinkEvent;
use crate::media::LocalMedia;
use anyhow::Result;
use async_trait::async_trait;
use ghostcall_core::{LinkId, ParticipantId, SignalPayload};
use std::sync::Arc;
use tokio::sync::mpsc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkRole {
    /// Мы узнали о новом участнике и первыми отправляем offer.
    Initiator,
    /// Первый payload пришёл от удалённой стороны.
    Responder,
}

#[derive(Debug, Clone)]
pub struct LinkSpec {
    pub remote: ParticipantId,
    pub link_id: LinkId,
    pub role: LinkRole,
}

impl LinkSpec {
    pub fn new(remote: ParticipantId, role: LinkRole) -> Self {
        Self {
            remote,
            link_id: LinkId::new(),
            role,
        }
    }
}

/// Одно соединение точка-точка с удалённым участником.
///
/// Исходящие payload и смены состояния приходят менеджеру через канал
/// `LinkEvent`, переданный в `PeerConnector::connect`.
#[async_trait]
pub trait PeerLink: Send + Sync {
    fn link_id(&self) -> LinkId;

    /// Apply a payload from the remote side. Payloads must be fed in the
    /// order they were generated.
    async fn signal(&mut self, payload: &SignalPayload) -> Result<(), LinkError>;

    /// Release every transport and media resource. Safe to call repeatedly.
    async fn destroy(&mut self);
}

/// Фабрика соединений. Менеджер зависит только от этого трейта.
#[async_trait]
pub trait PeerConnector: Send + Sync {
    async fn connect(
        &self,
        spec: LinkSpec,
        media: &Arc<dyn LocalMedia>,
        events: mpsc::UnboundedSender<LinkEvent>,
    ) -> Result<Box<dyn PeerLink>>;
}
