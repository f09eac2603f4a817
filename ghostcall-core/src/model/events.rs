use crate::model::participant::{ParticipantId, RoomUser};
use crate::model::room::RoomId;
use crate::model::signal::SignalPayload;
use serde::{Deserialize, Serialize};

/// События, которые сигнальный сервер рассылает участникам звонка.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(
    tag = "event",
    content = "data",
    rename_all = "camelCase",
    rename_all_fields = "camelCase"
)]
pub enum ServerEvent {
    CallStarted {
        host_id: ParticipantId,
    },
    CallEnded,
    /// Полное состояние звонка (ресинхронизация после переподключения).
    CallActive {
        host_id: ParticipantId,
        participants: Vec<ParticipantId>,
    },
    CallParticipantJoined {
        user_id: ParticipantId,
        username: String,
    },
    CallParticipantLeft {
        user_id: ParticipantId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        username: Option<String>,
    },
    CallHostChanged {
        new_host_id: ParticipantId,
    },
    CallSignal {
        from: ParticipantId,
        signal: SignalPayload,
    },
    SpeakingStatus {
        user_id: ParticipantId,
        is_speaking: bool,
    },
    RoomUsers {
        users: Vec<RoomUser>,
    },
}

/// События, которые клиент отправляет сигнальному серверу.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(
    tag = "event",
    content = "data",
    rename_all = "camelCase",
    rename_all_fields = "camelCase"
)]
pub enum ClientEvent {
    StartCall {
        room_id: RoomId,
    },
    JoinCall {
        room_id: RoomId,
    },
    LeaveCall {
        room_id: RoomId,
    },
    CallSignal {
        room_id: RoomId,
        signal: SignalPayload,
        to: ParticipantId,
    },
    SpeakingStatus {
        room_id: RoomId,
        is_speaking: bool,
    },
}
