use async_trait::async_trait;
use ghostcall_core::{ClientEvent, ParticipantId, SignalPayload};
use ghostcall_session::SignalingOutput;
use std::sync::Arc;
use tokio::sync::{Mutex, mpsc};

/// Mock SignalingOutput that captures all outgoing client events.
#[derive(Clone)]
pub struct MockSignalingOutput {
    /// Channel to send captured events.
    tx: mpsc::UnboundedSender<ClientEvent>,
    /// All captured events (for verification).
    events: Arc<Mutex<Vec<ClientEvent>>>,
}

impl MockSignalingOutput {
    /// Create a new MockSignalingOutput and its receiver channel.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ClientEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let signaling = Self {
            tx,
            events: Arc::new(Mutex::new(Vec::new())),
        };
        (signaling, rx)
    }

    /// Create a MockSignalingOutput without a receiver (events are only stored).
    pub fn new_stored_only() -> Self {
        let (tx, _rx) = mpsc::unbounded_channel();
        Self {
            tx,
            events: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// All captured events in emission order.
    pub async fn events(&self) -> Vec<ClientEvent> {
        self.events.lock().await.clone()
    }

    /// Signals relayed to a specific participant.
    pub async fn signals_to(&self, participant: &ParticipantId) -> Vec<SignalPayload> {
        self.events
            .lock()
            .await
            .iter()
            .filter_map(|e| match e {
                ClientEvent::CallSignal { signal, to, .. } if to == participant => {
                    Some(signal.clone())
                }
                _ => None,
            })
            .collect()
    }

    /// Speaking edges in emission order.
    pub async fn speaking_events(&self) -> Vec<bool> {
        self.events
            .lock()
            .await
            .iter()
            .filter_map(|e| match e {
                ClientEvent::SpeakingStatus { is_speaking, .. } => Some(*is_speaking),
                _ => None,
            })
            .collect()
    }

    pub async fn count_matching(&self, predicate: impl Fn(&ClientEvent) -> bool) -> usize {
        self.events.lock().await.iter().filter(|e| predicate(e)).count()
    }
}

impl Default for MockSignalingOutput {
    fn default() -> Self {
        Self::new_stored_only()
    }
}

#[async_trait]
impl SignalingOutput for MockSignalingOutput {
    async fn emit(&self, event: ClientEvent) {
        tracing::debug!("[MockSignaling] emit {:?}", event);

        self.events.lock().await.push(event.clone());
        let _ = self.tx.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ghostcall_core::RoomId;
    use serde_json::json;

    #[tokio::test]
    async fn test_mock_signaling_captures_signal() {
        let (signaling, mut rx) = MockSignalingOutput::new();
        let peer = ParticipantId::from("peer");
        let signal = SignalPayload::new(json!({ "type": "offer" }));

        signaling
            .emit(ClientEvent::CallSignal {
                room_id: RoomId::from("room"),
                signal: signal.clone(),
                to: peer.clone(),
            })
            .await;

        let msg = rx.recv().await.unwrap();
        assert!(matches!(msg, ClientEvent::CallSignal { .. }));
        assert_eq!(signaling.signals_to(&peer).await, vec![signal]);
    }

    #[tokio::test]
    async fn test_mock_signaling_captures_speaking() {
        let signaling = MockSignalingOutput::new_stored_only();

        signaling
            .emit(ClientEvent::SpeakingStatus {
                room_id: RoomId::from("room"),
                is_speaking: true,
            })
            .await;

        assert_eq!(signaling.speaking_events().await, vec![true]);
    }
}
