use crate::signaling::SignalingOutput;
use anyhow::{Context, Result};
use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use ghostcall_core::{ClientEvent, ServerEvent};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::protocol::Message;
use tracing::{debug, error, info, warn};

/// WebSocket-клиент сигнального сервера. События кодируются в JSON.
#[derive(Clone)]
pub struct SignalingClient {
    outbound: mpsc::UnboundedSender<Message>,
}

impl SignalingClient {
    /// Connects and spawns the socket tasks. Decoded server events arrive on
    /// the returned receiver; it closes when the socket does.
    pub async fn connect(
        url: &str,
    ) -> Result<(Self, mpsc::UnboundedReceiver<ServerEvent>, JoinHandle<()>)> {
        let (socket, _) = connect_async(url)
            .await
            .with_context(|| format!("Failed to connect to signaling server {}", url))?;
        info!("Connected to signaling server {}", url);

        let (mut sender, mut receiver) = socket.split();
        let (outbound, mut outbound_rx) = mpsc::unbounded_channel::<Message>();
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        let mut send_task = tokio::spawn(async move {
            while let Some(msg) = outbound_rx.recv().await {
                if sender.send(msg).await.is_err() {
                    break;
                }
            }
        });

        let ping_tx = outbound.clone();
        let mut recv_task = tokio::spawn(async move {
            while let Some(Ok(msg)) = receiver.next().await {
                match msg {
                    Message::Text(text) => match decode_server_event(&text) {
                        Some(event) => {
                            if events_tx.send(event).is_err() {
                                break;
                            }
                        }
                        None => continue,
                    },
                    Message::Ping(data) => {
                        let _ = ping_tx.send(Message::Pong(data));
                    }
                    Message::Close(_) => break,
                    _ => {}
                }
            }
        });

        let driver = tokio::spawn(async move {
            tokio::select! {
                _ = (&mut send_task) => recv_task.abort(),
                _ = (&mut recv_task) => send_task.abort(),
            };
            info!("Signaling connection closed");
        });

        Ok((Self { outbound }, events_rx, driver))
    }

    pub fn is_open(&self) -> bool {
        !self.outbound.is_closed()
    }
}

#[async_trait]
impl SignalingOutput for SignalingClient {
    async fn emit(&self, event: ClientEvent) {
        match encode_client_event(&event) {
            Ok(json) => {
                if let Err(e) = self.outbound.send(Message::Text(json.into())) {
                    error!("Failed to queue signaling message: {}", e);
                }
            }
            Err(e) => error!("Failed to serialize client event: {}", e),
        }
    }
}

pub fn encode_client_event(event: &ClientEvent) -> serde_json::Result<String> {
    serde_json::to_string(event)
}

/// Unknown or malformed frames are logged and skipped.
pub fn decode_server_event(text: &str) -> Option<ServerEvent> {
    match serde_json::from_str::<ServerEvent>(text) {
        Ok(event) => {
            debug!("Server event: {:?}", event);
            Some(event)
        }
        Err(e) => {
            warn!("Invalid server event: {}", e);
            None
        }
    }
}
