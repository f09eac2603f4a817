use ghostcall_core::{ParticipantId, RoomUser, ServerEvent, SignalPayload};

/// Команды, поступающие в менеджер звонка: действия пользователя и
/// события сигнального сервера.
#[derive(Debug, Clone)]
pub enum SessionCommand {
    /// Начать звонок: получить микрофон и отправить `startCall`.
    Start,

    /// Присоединиться к идущему звонку.
    Join,

    /// Покинуть звонок.
    Leave,

    SetMuted(bool),

    CallStarted {
        host_id: ParticipantId,
    },

    CallEnded,

    /// Полное состояние звонка от сервера.
    CallActive {
        host_id: ParticipantId,
        participants: Vec<ParticipantId>,
    },

    ParticipantJoined {
        participant_id: ParticipantId,
        username: String,
    },

    ParticipantLeft {
        participant_id: ParticipantId,
        username: Option<String>,
    },

    HostChanged {
        new_host_id: ParticipantId,
    },

    /// Сигнальный payload от удалённого участника.
    Signal {
        from: ParticipantId,
        payload: SignalPayload,
    },

    SpeakingStatus {
        participant_id: ParticipantId,
        is_speaking: bool,
    },

    Roster(Vec<RoomUser>),
}

impl From<ServerEvent> for SessionCommand {
    fn from(event: ServerEvent) -> Self {
        match event {
            ServerEvent::CallStarted { host_id } => Self::CallStarted { host_id },
            ServerEvent::CallEnded => Self::CallEnded,
            ServerEvent::CallActive {
                host_id,
                participants,
            } => Self::CallActive {
                host_id,
                participants,
            },
            ServerEvent::CallParticipantJoined { user_id, username } => Self::ParticipantJoined {
                participant_id: user_id,
                username,
            },
            ServerEvent::CallParticipantLeft { user_id, username } => Self::ParticipantLeft {
                participant_id: user_id,
                username,
            },
            ServerEvent::CallHostChanged { new_host_id } => Self::HostChanged { new_host_id },
            ServerEvent::CallSignal { from, signal } => Self::Signal {
                from,
                payload: signal,
            },
            ServerEvent::SpeakingStatus {
                user_id,
                is_speaking,
            } => Self::SpeakingStatus {
                participant_id: user_id,
                is_speaking,
            },
            ServerEvent::RoomUsers { users } => Self::Roster(users),
        }
    }
}
