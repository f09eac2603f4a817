use crate::model::participant::ParticipantId;
use serde::{Deserialize, Serialize};

pub const UNKNOWN_USERNAME: &str = "Unknown";

/// Состояние соединения с удалённым участником.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    Connecting,
    Connected,
    Disconnected,
    Left,
}

impl ConnectionState {
    /// `Disconnected` and `Left` are final for a given link instance.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Disconnected | Self::Left)
    }

    pub fn can_transition_to(self, next: ConnectionState) -> bool {
        match (self, next) {
            (_, Self::Left) => self != Self::Left,
            (Self::Connecting, Self::Connected) => true,
            (Self::Connecting | Self::Connected, Self::Disconnected) => true,
            _ => false,
        }
    }
}

/// Один активный звонок в комнате.
///
/// Пока сессия не пуста, хост всегда входит в число участников.
/// Участники хранятся в порядке присоединения: при уходе хоста
/// временным преемником становится самый ранний из оставшихся,
/// пока сервер не пришлёт `callHostChanged`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallSession {
    host_id: ParticipantId,
    participant_ids: Vec<ParticipantId>,
}

impl CallSession {
    pub fn started(host_id: ParticipantId) -> Self {
        Self {
            participant_ids: vec![host_id.clone()],
            host_id,
        }
    }

    /// Full-state resync. The host is added to the member list if the
    /// snapshot forgot it.
    pub fn from_snapshot(host_id: ParticipantId, participants: Vec<ParticipantId>) -> Self {
        let mut session = Self {
            host_id: host_id.clone(),
            participant_ids: Vec::with_capacity(participants.len() + 1),
        };
        for id in participants {
            session.join(id);
        }
        session.join(host_id);
        session
    }

    pub fn host_id(&self) -> &ParticipantId {
        &self.host_id
    }

    pub fn participants(&self) -> &[ParticipantId] {
        &self.participant_ids
    }

    pub fn contains(&self, id: &ParticipantId) -> bool {
        self.participant_ids.contains(id)
    }

    pub fn len(&self) -> usize {
        self.participant_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.participant_ids.is_empty()
    }

    /// Returns `false` if the participant was already a member.
    pub fn join(&mut self, id: ParticipantId) -> bool {
        if self.contains(&id) {
            return false;
        }
        self.participant_ids.push(id);
        true
    }

    /// Removes a participant. If it was the host and others remain, the
    /// earliest remaining joiner is promoted and returned.
    pub fn leave(&mut self, id: &ParticipantId) -> Option<ParticipantId> {
        let before = self.participant_ids.len();
        self.participant_ids.retain(|p| p != id);
        if self.participant_ids.len() == before || &self.host_id != id {
            return None;
        }

        let successor = self.participant_ids.first()?.clone();
        self.host_id = successor.clone();
        Some(successor)
    }

    pub fn set_host(&mut self, host_id: ParticipantId) {
        self.join(host_id.clone());
        self.host_id = host_id;
    }

    /// Everyone except `local`, in join order.
    pub fn remotes<'a>(
        &'a self,
        local: &'a ParticipantId,
    ) -> impl Iterator<Item = &'a ParticipantId> + 'a {
        self.participant_ids.iter().filter(move |p| *p != local)
    }
}

/// Плитка участника для слоя отображения. Только производное состояние.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantTile {
    pub id: ParticipantId,
    pub username: String,
    pub is_self: bool,
    pub connection_state: ConnectionState,
    pub is_speaking: bool,
}
