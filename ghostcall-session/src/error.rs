use ghostcall_core::ParticipantId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CallError {
    #[error("microphone unavailable: {0}")]
    MediaUnavailable(String),

    #[error("call session task is gone")]
    SessionClosed,

    #[error("failed to create link to {remote}: {source}")]
    LinkSetup {
        remote: ParticipantId,
        #[source]
        source: anyhow::Error,
    },
}

/// Ошибки применения сигнального payload к соединению.
#[derive(Debug, Error)]
pub enum LinkError {
    #[error("negotiation failed: {0}")]
    Negotiation(String),

    #[error("malformed signal payload: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("link already destroyed")]
    Destroyed,
}

impl From<webrtc::Error> for LinkError {
    fn from(e: webrtc::Error) -> Self {
        Self::Negotiation(e.to_string())
    }
}
