use crate::config::CallConfig;
use crate::error::CallError;
use crate::session::{CallManager, CallNotice, CallPorts, CallView, LocalParticipant, SessionCommand};
use ghostcall_core::ServerEvent;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Handle to a call session running on its own task. Dropping every clone
/// of the command sender shuts the session down (leaving the call).
pub struct CallHandle {
    commands: mpsc::Sender<SessionCommand>,
    view: CallView,
    task: JoinHandle<()>,
}

impl CallHandle {
    pub fn spawn(
        local: LocalParticipant,
        config: CallConfig,
        ports: CallPorts,
    ) -> (Self, mpsc::UnboundedReceiver<CallNotice>) {
        info!("Spawning call session for room {}", local.room_id);
        let (commands, command_rx) = mpsc::channel(100);
        let (manager, notices) = CallManager::new(local, config, ports, command_rx);
        let view = manager.view();
        let task = tokio::spawn(manager.run());

        (
            Self {
                commands,
                view,
                task,
            },
            notices,
        )
    }

    pub fn view(&self) -> &CallView {
        &self.view
    }

    pub fn sender(&self) -> mpsc::Sender<SessionCommand> {
        self.commands.clone()
    }

    pub async fn send(&self, cmd: SessionCommand) -> Result<(), CallError> {
        self.commands
            .send(cmd)
            .await
            .map_err(|_| CallError::SessionClosed)
    }

    pub async fn start(&self) -> Result<(), CallError> {
        self.send(SessionCommand::Start).await
    }

    pub async fn join(&self) -> Result<(), CallError> {
        self.send(SessionCommand::Join).await
    }

    pub async fn leave(&self) -> Result<(), CallError> {
        self.send(SessionCommand::Leave).await
    }

    pub async fn set_muted(&self, muted: bool) -> Result<(), CallError> {
        self.send(SessionCommand::SetMuted(muted)).await
    }

    pub async fn forward(&self, event: ServerEvent) -> Result<(), CallError> {
        self.send(SessionCommand::from(event)).await
    }

    /// Pumps server events (e.g. from `SignalingClient`) into the session
    /// until either side goes away.
    pub fn attach(&self, mut events: mpsc::UnboundedReceiver<ServerEvent>) -> JoinHandle<()> {
        let commands = self.commands.clone();
        tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                if commands.send(SessionCommand::from(event)).await.is_err() {
                    warn!("Call session is gone, dropping server events");
                    break;
                }
            }
        })
    }

    /// Leaves the call if needed and waits for the session task to finish.
    pub async fn shutdown(self) {
        let Self { commands, task, .. } = self;
        drop(commands);
        if let Err(e) = task.await {
            warn!("Call session task ended abnormally: {}", e);
        }
    }
}
