use ghostcall_core::ParticipantId;

/// Статусы для слоя отображения. Ни один из них не прерывает сессию.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallNotice {
    /// Нет доступа к микрофону, в звонок не вошли.
    MediaUnavailable(String),
    Joined,
    Left,
    CallEnded,
    HostChanged(ParticipantId),
    ParticipantLeft {
        participant_id: ParticipantId,
        username: Option<String>,
    },
    ParticipantDisconnected(ParticipantId),
}
