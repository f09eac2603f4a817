
use std::sync::Arc;

use ghostcall_core::{ParticipantId, RoomId};
use ghostcall_session::{
    CallConfig, CallHandle, CallManager, CallNotice, CallPorts, LocalParticipant, SessionCommand,
};
use tokio::sync::mpsc;
use tracing::Level;

use crate::utils::{MockConnector, MockMediaSource, MockSignalingOutput};

pub const ROOM: &str = "haunted-room";

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(Level::DEBUG)
        .with_test_writer()
        .try_init();
}

pub fn pid(id: &str) -> ParticipantId {
    ParticipantId::from(id)
}

pub struct Harness {
    pub manager: CallManager,
    pub notices: mpsc::UnboundedReceiver<CallNotice>,
    pub signaling: MockSignalingOutput,
    pub connector: MockConnector,
    pub media: MockMediaSource,
    _commands: mpsc::Sender<SessionCommand>,
}

impl Harness {
    pub async fn apply(&mut self, cmd: SessionCommand) {
        self.manager.apply(cmd).await;
        self.manager.settle().await;
    }

    pub async fn joined(&mut self, id: &str) {
        self.apply(SessionCommand::ParticipantJoined {
            participant_id: pid(id),
            username: id.to_uppercase(),
        })
        .await;
    }

    pub async fn left(&mut self, id: &str) {
        self.apply(SessionCommand::ParticipantLeft {
            participant_id: pid(id),
            username: None,
        })
        .await;
    }

    pub async fn signal(&mut self, from: &str, payload: serde_json::Value) {
        self.apply(SessionCommand::Signal {
            from: pid(from),
            payload: payload.into(),
        })
        .await;
    }

    /// Local participant joins (or starts) a call and the server confirms it.
    pub async fn enter(&mut self, host: &str) {
        let local = self.manager.local_id().clone();
        let starting = local == pid(host);

        self.apply(if starting {
            SessionCommand::Start
        } else {
            SessionCommand::Join
        })
        .await;

        self.apply(SessionCommand::CallStarted { host_id: pid(host) })
            .await;
        if !starting {
            self.apply(SessionCommand::ParticipantJoined {
                participant_id: local,
                username: "ME".to_owned(),
            })
            .await;
        }
    }

    pub fn drain_notices(&mut self) -> Vec<CallNotice> {
        let mut notices = Vec::new();
        while let Ok(notice) = self.notices.try_recv() {
            notices.push(notice);
        }
        notices
    }

    /// Remotes that should have a link: the membership minus ourselves.
    pub fn expected_links(&self) -> Vec<ParticipantId> {
        let local = self.manager.local_id();
        let mut ids: Vec<ParticipantId> = self
            .manager
            .call()
            .map(|call| call.remotes(local).cloned().collect())
            .unwrap_or_default();
        ids.sort();
        ids
    }
}

pub fn create_harness(local: &str) -> Harness {
    create_harness_with(local, CallConfig::default())
}

fn mock_ports() -> (CallPorts, MockSignalingOutput, MockConnector, MockMediaSource) {
    let signaling = MockSignalingOutput::new_stored_only();
    let connector = MockConnector::new();
    let media = MockMediaSource::new();

    let ports = CallPorts {
        connector: Arc::new(connector.clone()),
        media_source: Arc::new(media.clone()),
        signaling: Arc::new(signaling.clone()),
    };
    (ports, signaling, connector, media)
}

fn local_participant(local: &str) -> LocalParticipant {
    LocalParticipant {
        id: pid(local),
        username: "ME".to_owned(),
        room_id: RoomId::from(ROOM),
    }
}

pub fn create_harness_with(local: &str, config: CallConfig) -> Harness {
    init_tracing();

    let (commands, command_rx) = mpsc::channel::<SessionCommand>(100);
    let (ports, signaling, connector, media) = mock_ports();
    let (manager, notices) =
        CallManager::new(local_participant(local), config, ports, command_rx);

    Harness {
        manager,
        notices,
        signaling,
        connector,
        media,
        _commands: commands,
    }
}

/// A session running on its own task, driven only through `CallHandle`.
pub struct Spawned {
    pub handle: CallHandle,
    pub notices: mpsc::UnboundedReceiver<CallNotice>,
    pub signaling: MockSignalingOutput,
    pub media: MockMediaSource,
}

pub fn spawn_session(local: &str) -> Spawned {
    init_tracing();

    let (ports, signaling, _connector, media) = mock_ports();
    let (handle, notices) =
        CallHandle::spawn(local_participant(local), CallConfig::default(), ports);

    Spawned {
        handle,
        notices,
        signaling,
        media,
    }
}
