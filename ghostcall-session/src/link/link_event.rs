use ghostcall_core::{LinkId, ParticipantId, SignalPayload};

/// События, которые соединение генерирует для менеджера звонка.
#[derive(Debug, Clone)]
pub struct LinkEvent {
    pub remote: ParticipantId,
    pub link_id: LinkId,
    pub kind: LinkEventKind,
}

#[derive(Debug, Clone)]
pub enum LinkEventKind {
    /// Соединение сгенерировало payload, его нужно переслать удалённой стороне.
    SignalGenerated(SignalPayload),

    /// Медиасоединение установлено.
    Connected,

    /// Соединение разорвано или закрыто.
    Disconnected,

    /// Фатальная ошибка внутри соединения.
    Failed(String),
}

impl LinkEvent {
    pub fn new(remote: ParticipantId, link_id: LinkId, kind: LinkEventKind) -> Self {
        Self {
            remote,
            link_id,
            kind,
        }
    }
}
