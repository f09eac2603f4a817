use crate::config::CallConfig;
use crate::error::CallError;
use crate::link::{LinkEvent, LinkEventKind, LinkRole, LinkSpec, PeerConnector};
use crate::media::{LocalMedia, MediaSource};
use crate::session::call_notice::CallNotice;
use crate::session::call_view::CallView;
use crate::session::link_entry::{Delivery, LinkEntry};
use crate::session::session_command::SessionCommand;
use crate::session::timers::{SessionTimers, sleep_until_deadline, tick};
use crate::signaling::SignalingOutput;
use crate::speaking::SpeakingDetector;
use ghostcall_core::{
    CallSession, ClientEvent, ConnectionState, ParticipantId, ParticipantTile, RoomId, RoomUser,
    SignalPayload, UNKNOWN_USERNAME,
};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

/// Кто мы в комнате.
#[derive(Debug, Clone)]
pub struct LocalParticipant {
    pub id: ParticipantId,
    pub username: String,
    pub room_id: RoomId,
}

/// Внешние зависимости менеджера звонка.
#[derive(Clone)]
pub struct CallPorts {
    pub connector: Arc<dyn PeerConnector>,
    pub media_source: Arc<dyn MediaSource>,
    pub signaling: Arc<dyn SignalingOutput>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Intent {
    Start,
    Join,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    Acquiring(Intent),
    Active,
}

type MediaResult = (u64, Result<Arc<dyn LocalMedia>, CallError>);

pub struct CallManager {
    local: LocalParticipant,
    config: CallConfig,
    ports: CallPorts,
    phase: Phase,
    call: Option<CallSession>,
    links: HashMap<ParticipantId, LinkEntry>,
    /// Remotes whose tile reconciliation has dropped while the server still
    /// lists them.
    stale: HashSet<ParticipantId>,
    /// Speaking status received before the remote's link existed.
    early_speaking: HashMap<ParticipantId, bool>,
    usernames: HashMap<ParticipantId, String>,
    media: Option<Arc<dyn LocalMedia>>,
    acquisition: u64,
    detector: SpeakingDetector,
    muted: bool,
    levels: Vec<u8>,
    timers: SessionTimers,
    command_rx: mpsc::Receiver<SessionCommand>,
    link_tx: mpsc::UnboundedSender<LinkEvent>,
    link_rx: mpsc::UnboundedReceiver<LinkEvent>,
    media_tx: mpsc::UnboundedSender<MediaResult>,
    media_rx: mpsc::UnboundedReceiver<MediaResult>,
    notices: mpsc::UnboundedSender<CallNotice>,
    view: CallView,
}

impl CallManager {
    pub fn new(
        local: LocalParticipant,
        config: CallConfig,
        ports: CallPorts,
        command_rx: mpsc::Receiver<SessionCommand>,
    ) -> (Self, mpsc::UnboundedReceiver<CallNotice>) {
        let (link_tx, link_rx) = mpsc::unbounded_channel();
        let (media_tx, media_rx) = mpsc::unbounded_channel();
        let (notices, notices_rx) = mpsc::unbounded_channel();

        let mut usernames = HashMap::new();
        usernames.insert(local.id.clone(), local.username.clone());

        let manager = Self {
            detector: SpeakingDetector::new(config.speaking_threshold),
            local,
            config,
            ports,
            phase: Phase::Idle,
            call: None,
            links: HashMap::new(),
            stale: HashSet::new(),
            early_speaking: HashMap::new(),
            usernames,
            media: None,
            acquisition: 0,
            muted: false,
            levels: Vec::new(),
            timers: SessionTimers::default(),
            command_rx,
            link_tx,
            link_rx,
            media_tx,
            media_rx,
            notices,
            view: CallView::new(),
        };
        (manager, notices_rx)
    }

    pub fn view(&self) -> CallView {
        self.view.clone()
    }

    pub fn local_id(&self) -> &ParticipantId {
        &self.local.id
    }

    pub fn call(&self) -> Option<&CallSession> {
        self.call.as_ref()
    }

    pub fn is_active(&self) -> bool {
        self.phase == Phase::Active
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }

    pub fn media(&self) -> Option<&Arc<dyn LocalMedia>> {
        self.media.as_ref()
    }

    pub fn timers_running(&self) -> bool {
        self.timers.is_running()
    }

    /// Remotes with a live adapter, sorted.
    pub fn live_links(&self) -> Vec<ParticipantId> {
        let mut ids: Vec<ParticipantId> = self
            .links
            .iter()
            .filter(|(_, entry)| entry.is_live())
            .map(|(id, _)| id.clone())
            .collect();
        ids.sort();
        ids
    }

    pub fn link_state(&self, remote: &ParticipantId) -> Option<ConnectionState> {
        self.links.get(remote).map(|entry| entry.state)
    }

    pub async fn run(mut self) {
        info!("Call session loop started for {}", self.local.id);

        loop {
            let retry_deadline = self.next_retry_deadline();

            tokio::select! {
                cmd = self.command_rx.recv() => {
                    match cmd {
                        Some(c) => self.apply(c).await,
                        None => {
                            info!("Command channel closed. Shutting down call session.");
                            break;
                        }
                    }
                }

                Some(evt) = self.link_rx.recv() => self.handle_link_event(evt).await,

                Some((generation, res)) = self.media_rx.recv() => {
                    self.on_media_acquired(generation, res).await;
                }

                _ = tick(&mut self.timers.speaking) => self.sample_speaking().await,

                _ = tick(&mut self.timers.reconcile) => self.reconcile().await,

                _ = sleep_until_deadline(retry_deadline) => self.retry_due().await,
            }
        }

        self.leave_call().await;
        info!("Call session loop finished");
    }

    /// Processes what is already in flight: waits for a pending media
    /// request, then drains queued adapter events.
    pub async fn settle(&mut self) {
        while matches!(self.phase, Phase::Acquiring(_)) {
            match self.media_rx.recv().await {
                Some((generation, res)) => self.on_media_acquired(generation, res).await,
                None => break,
            }
        }
        while let Ok(evt) = self.link_rx.try_recv() {
            self.handle_link_event(evt).await;
        }
    }

    pub async fn apply(&mut self, cmd: SessionCommand) {
        match cmd {
            SessionCommand::Start => self.enter_call(Intent::Start),
            SessionCommand::Join => self.enter_call(Intent::Join),
            SessionCommand::Leave => self.leave_call().await,
            SessionCommand::SetMuted(muted) => self.set_muted(muted).await,
            SessionCommand::CallStarted { host_id } => self.on_call_started(host_id).await,
            SessionCommand::CallEnded => self.on_call_ended().await,
            SessionCommand::CallActive {
                host_id,
                participants,
            } => self.on_call_active(host_id, participants).await,
            SessionCommand::ParticipantJoined {
                participant_id,
                username,
            } => self.on_participant_joined(participant_id, username).await,
            SessionCommand::ParticipantLeft {
                participant_id,
                username,
            } => self.on_participant_left(participant_id, username).await,
            SessionCommand::HostChanged { new_host_id } => self.on_host_changed(new_host_id),
            SessionCommand::Signal { from, payload } => self.on_signal(from, payload).await,
            SessionCommand::SpeakingStatus {
                participant_id,
                is_speaking,
            } => self.on_remote_speaking(participant_id, is_speaking),
            SessionCommand::Roster(users) => self.on_roster(users),
        }

        self.refresh_view();
    }

    fn enter_call(&mut self, intent: Intent) {
        if self.phase != Phase::Idle {
            debug!("Ignoring {:?}: call already entered", intent);
            return;
        }

        self.acquisition += 1;
        self.phase = Phase::Acquiring(intent);

        let generation = self.acquisition;
        let source = self.ports.media_source.clone();
        let tx = self.media_tx.clone();
        tokio::spawn(async move {
            let res = source.acquire().await;
            let _ = tx.send((generation, res));
        });
    }

    async fn on_media_acquired(
        &mut self,
        generation: u64,
        res: Result<Arc<dyn LocalMedia>, CallError>,
    ) {
        let intent = match self.phase {
            Phase::Acquiring(intent) if generation == self.acquisition => intent,
            _ => {
                if let Ok(media) = res {
                    debug!("Releasing media from an abandoned request");
                    media.stop();
                }
                return;
            }
        };

        let media = match res {
            Ok(media) => media,
            Err(e) => {
                warn!("Could not acquire local media: {}", e);
                self.phase = Phase::Idle;
                self.notify(CallNotice::MediaUnavailable(e.to_string()));
                self.refresh_view();
                return;
            }
        };

        self.muted = false;
        self.detector.reset();
        media.set_enabled(true);
        self.media = Some(media);
        self.phase = Phase::Active;
        self.timers
            .start(self.config.speaking_interval, self.config.reconcile_interval);

        let room_id = self.local.room_id.clone();
        let event = match intent {
            Intent::Start => ClientEvent::StartCall { room_id },
            Intent::Join => ClientEvent::JoinCall { room_id },
        };
        self.ports.signaling.emit(event).await;

        info!("Entered call in room {}", self.local.room_id);
        self.notify(CallNotice::Joined);
        self.refresh_view();
    }

    async fn leave_call(&mut self) {
        match self.phase {
            Phase::Idle => return,
            Phase::Acquiring(_) => {
                self.acquisition += 1;
                self.phase = Phase::Idle;
                return;
            }
            Phase::Active => {}
        }

        self.ports
            .signaling
            .emit(ClientEvent::LeaveCall {
                room_id: self.local.room_id.clone(),
            })
            .await;

        self.teardown().await;
        if let Some(call) = self.call.as_mut() {
            call.leave(&self.local.id);
            if call.is_empty() {
                self.call = None;
            }
        }

        info!("Left call in room {}", self.local.room_id);
        self.notify(CallNotice::Left);
    }

    /// Releases everything this side holds for the call: timers, links and
    /// the capture device. Runs to completion within the calling handler.
    async fn teardown(&mut self) {
        self.timers.cancel();
        if matches!(self.phase, Phase::Acquiring(_)) {
            self.acquisition += 1;
        }
        self.phase = Phase::Idle;

        for (remote, mut entry) in self.links.drain() {
            debug!("Destroying {:?} link to {}", entry.role, remote);
            entry.release(ConnectionState::Left).await;
        }
        self.stale.clear();
        self.early_speaking.clear();

        if let Some(media) = self.media.take() {
            media.stop();
        }
        self.detector.reset();
        self.muted = false;
    }

    async fn on_call_started(&mut self, host_id: ParticipantId) {
        if let Some(call) = &self.call
            && call.host_id() == &host_id
        {
            debug!("Duplicate callStarted for host {}", host_id);
            return;
        }
        info!("Call started by {}", host_id);
        self.replace_call(CallSession::started(host_id)).await;
    }

    async fn on_call_ended(&mut self) {
        info!("Call ended in room {}", self.local.room_id);
        self.teardown().await;
        self.call = None;
        self.notify(CallNotice::CallEnded);
    }

    async fn on_call_active(&mut self, host_id: ParticipantId, participants: Vec<ParticipantId>) {
        self.replace_call(CallSession::from_snapshot(host_id, participants))
            .await;
    }

    /// Installs a new membership and evicts links to remotes it no longer lists.
    async fn replace_call(&mut self, call: CallSession) {
        let gone: Vec<ParticipantId> = self
            .links
            .iter()
            .filter(|(remote, entry)| entry.is_live() && !call.contains(remote))
            .map(|(remote, _)| remote.clone())
            .collect();
        for remote in gone {
            info!("{} is no longer in the call, dropping link", remote);
            if let Some(entry) = self.links.get_mut(&remote) {
                entry.release(ConnectionState::Left).await;
            }
        }

        self.stale.retain(|id| call.contains(id));
        self.call = Some(call);
    }

    async fn on_participant_joined(&mut self, participant_id: ParticipantId, username: String) {
        self.usernames.insert(participant_id.clone(), username);
        self.stale.remove(&participant_id);

        let Some(call) = self.call.as_mut() else {
            debug!("Join of {} before any call was announced", participant_id);
            return;
        };
        if !call.join(participant_id.clone()) {
            debug!("Duplicate join for {}", participant_id);
        }

        if participant_id == self.local.id || self.phase != Phase::Active {
            return;
        }
        if self.has_live_link(&participant_id) {
            return;
        }

        info!("Initiating link to {}", participant_id);
        self.create_link(participant_id, LinkRole::Initiator).await;
    }

    async fn on_participant_left(&mut self, participant_id: ParticipantId, username: Option<String>) {
        if participant_id == self.local.id {
            if self.phase == Phase::Active {
                warn!("Server removed us from the call");
                self.teardown().await;
                self.notify(CallNotice::Left);
            }
        } else if let Some(entry) = self.links.get_mut(&participant_id) {
            entry.release(ConnectionState::Left).await;
        }

        if let Some(call) = self.call.as_mut() {
            if let Some(successor) = call.leave(&participant_id) {
                debug!("Host left, {} holds the call until the server decides", successor);
            }
            if call.is_empty() {
                self.call = None;
            }
        }
        self.stale.remove(&participant_id);
        self.early_speaking.remove(&participant_id);

        self.notify(CallNotice::ParticipantLeft {
            participant_id,
            username,
        });
    }

    fn on_host_changed(&mut self, new_host_id: ParticipantId) {
        let Some(call) = self.call.as_mut() else {
            debug!("Host change to {} without a call", new_host_id);
            return;
        };
        call.set_host(new_host_id.clone());
        info!("Call host is now {}", new_host_id);
        self.notify(CallNotice::HostChanged(new_host_id));
    }

    async fn on_signal(&mut self, from: ParticipantId, payload: SignalPayload) {
        if from == self.local.id {
            return;
        }
        if self.phase != Phase::Active {
            debug!("Dropping signal from {}: not in a call", from);
            return;
        }

        if !self.has_live_link(&from) {
            info!("First signal from {}, answering", from);
            if !self.create_link(from.clone(), LinkRole::Responder).await {
                return;
            }
        }

        let Some(entry) = self.links.get_mut(&from) else {
            return;
        };
        if !entry.enqueue(payload) {
            debug!("Duplicate signal from {} absorbed", from);
            return;
        }
        if entry.is_retrying() {
            return;
        }
        self.deliver(&from).await;
    }

    fn on_remote_speaking(&mut self, participant_id: ParticipantId, is_speaking: bool) {
        match self.links.get_mut(&participant_id) {
            Some(entry) if entry.is_live() => entry.is_speaking = is_speaking,
            _ if self.phase == Phase::Active && participant_id != self.local.id => {
                debug!("Holding speaking status of {} until its link exists", participant_id);
                self.early_speaking.insert(participant_id.clone(), is_speaking);
            }
            _ => debug!("Speaking status for {} outside a call", participant_id),
        }
    }

    fn on_roster(&mut self, users: Vec<RoomUser>) {
        for user in users {
            self.usernames.insert(user.id, user.username);
        }
        self.usernames
            .insert(self.local.id.clone(), self.local.username.clone());
    }

    async fn set_muted(&mut self, muted: bool) {
        let Some(media) = self.media.as_ref() else {
            debug!("Mute toggled outside of a call");
            return;
        };

        media.set_enabled(!muted);
        self.muted = muted;

        if let Some(speaking) = self.detector.set_muted(muted) {
            self.emit_speaking(speaking).await;
        }
    }

    pub async fn sample_speaking(&mut self) {
        let Some(media) = self.media.as_ref() else {
            return;
        };
        media.frequency_data(&mut self.levels);

        if let Some(speaking) = self.detector.sample(&self.levels) {
            self.emit_speaking(speaking).await;
            self.refresh_view();
        }
    }

    async fn emit_speaking(&self, is_speaking: bool) {
        self.ports
            .signaling
            .emit(ClientEvent::SpeakingStatus {
                room_id: self.local.room_id.clone(),
                is_speaking,
            })
            .await;
    }

    /// Periodic fallback: drops tiles of departed peers and of peers stuck in
    /// `disconnected` past the grace period. Server events stay
    /// authoritative; this never adds members.
    pub async fn reconcile(&mut self) {
        let now = Instant::now();
        let grace = self.config.disconnect_grace;

        let expired: Vec<ParticipantId> = self
            .links
            .iter()
            .filter(|(_, entry)| match entry.state {
                ConnectionState::Left => true,
                ConnectionState::Disconnected => entry
                    .disconnected_at
                    .is_none_or(|since| now.saturating_duration_since(since) >= grace),
                _ => false,
            })
            .map(|(remote, _)| remote.clone())
            .collect();

        for remote in expired {
            if let Some(mut entry) = self.links.remove(&remote) {
                if entry.state == ConnectionState::Disconnected {
                    info!("Dropping {} after {:?} disconnected", remote, grace);
                    if self.call.as_ref().is_some_and(|call| call.contains(&remote)) {
                        self.stale.insert(remote.clone());
                    }
                }
                entry.release(entry.state).await;
            }
        }

        self.refresh_view();
    }

    /// Retries deliveries whose backoff has elapsed.
    pub async fn retry_due(&mut self) {
        let now = Instant::now();
        let due: Vec<ParticipantId> = self
            .links
            .iter()
            .filter(|(_, entry)| entry.retry_at.is_some_and(|at| at <= now))
            .map(|(remote, _)| remote.clone())
            .collect();

        for remote in due {
            if let Some(entry) = self.links.get_mut(&remote) {
                entry.retry_at = None;
            }
            self.deliver(&remote).await;
        }

        self.refresh_view();
    }

    pub fn next_retry_deadline(&self) -> Option<Instant> {
        self.links.values().filter_map(|entry| entry.retry_at).min()
    }

    pub(crate) async fn handle_link_event(&mut self, event: LinkEvent) {
        let LinkEvent {
            remote,
            link_id,
            kind,
        } = event;

        let current = self
            .links
            .get(&remote)
            .is_some_and(|entry| entry.is_live() && entry.link_id == link_id);
        if !current {
            debug!("Ignoring event from stale link {} to {}", link_id, remote);
            return;
        }

        match kind {
            LinkEventKind::SignalGenerated(signal) => {
                self.ports
                    .signaling
                    .emit(ClientEvent::CallSignal {
                        room_id: self.local.room_id.clone(),
                        signal,
                        to: remote,
                    })
                    .await;
            }
            LinkEventKind::Connected => {
                if let Some(entry) = self.links.get_mut(&remote)
                    && entry.state.can_transition_to(ConnectionState::Connected)
                {
                    info!("Connected to {}", remote);
                    entry.state = ConnectionState::Connected;
                }
            }
            LinkEventKind::Disconnected => {
                info!("Link to {} closed", remote);
                self.fail_link(&remote).await;
            }
            LinkEventKind::Failed(reason) => {
                warn!("Link to {} failed: {}", remote, reason);
                self.fail_link(&remote).await;
            }
        }

        self.refresh_view();
    }

    async fn deliver(&mut self, remote: &ParticipantId) {
        let Some(entry) = self.links.get_mut(remote) else {
            return;
        };

        match entry.apply_pending(&self.config).await {
            Delivery::Drained => {}
            Delivery::RetryScheduled {
                attempt,
                delay,
                error,
            } => {
                warn!(
                    "Signal for {} failed (attempt {}): {}. Retrying in {:?}",
                    remote, attempt, error, delay
                );
            }
            Delivery::Exhausted(error) => {
                error!("Giving up on signaling {}: {}", remote, error);
                self.fail_link(remote).await;
            }
        }
    }

    async fn fail_link(&mut self, remote: &ParticipantId) {
        let Some(entry) = self.links.get_mut(remote) else {
            return;
        };
        if !entry.is_live() {
            return;
        }
        entry.release(ConnectionState::Disconnected).await;
        self.notify(CallNotice::ParticipantDisconnected(remote.clone()));
    }

    async fn create_link(&mut self, remote: ParticipantId, role: LinkRole) -> bool {
        let Some(media) = self.media.clone() else {
            return false;
        };

        if let Some(mut old) = self.links.remove(&remote) {
            old.release(ConnectionState::Left).await;
        }
        self.stale.remove(&remote);

        let spec = LinkSpec::new(remote.clone(), role);
        let link_id = spec.link_id;

        match self
            .ports
            .connector
            .connect(spec, &media, self.link_tx.clone())
            .await
        {
            Ok(link) => {
                let mut entry = LinkEntry::live(link, role);
                if let Some(is_speaking) = self.early_speaking.remove(&remote) {
                    entry.is_speaking = is_speaking;
                }
                self.links.insert(remote, entry);
                true
            }
            Err(e) => {
                let e = CallError::LinkSetup {
                    remote: remote.clone(),
                    source: e,
                };
                error!("{}", e);
                self.links.insert(remote.clone(), LinkEntry::failed(link_id, role));
                self.notify(CallNotice::ParticipantDisconnected(remote));
                false
            }
        }
    }

    fn has_live_link(&self, remote: &ParticipantId) -> bool {
        self.links.get(remote).is_some_and(|entry| entry.is_live())
    }

    fn notify(&self, notice: CallNotice) {
        let _ = self.notices.send(notice);
    }

    fn username(&self, id: &ParticipantId) -> String {
        self.usernames
            .get(id)
            .cloned()
            .unwrap_or_else(|| UNKNOWN_USERNAME.to_owned())
    }

    fn remote_tile(&self, remote: &ParticipantId) -> ParticipantTile {
        let (connection_state, is_speaking) = match self.links.get(remote) {
            Some(entry) => (entry.state, entry.is_speaking),
            None => (
                ConnectionState::Connecting,
                self.early_speaking.get(remote).copied().unwrap_or(false),
            ),
        };
        ParticipantTile {
            id: remote.clone(),
            username: self.username(remote),
            is_self: false,
            connection_state,
            is_speaking,
        }
    }

    /// Rebuilds the tile projection from membership and link state.
    fn refresh_view(&self) {
        if self.phase != Phase::Active {
            let host = self.call.as_ref().map(|call| call.host_id().clone());
            self.view.publish(Vec::new(), host, false);
            return;
        }

        let mut tiles = vec![ParticipantTile {
            id: self.local.id.clone(),
            username: self.local.username.clone(),
            is_self: true,
            connection_state: ConnectionState::Connected,
            is_speaking: self.detector.is_speaking(),
        }];

        if let Some(call) = &self.call {
            for remote in call.remotes(&self.local.id) {
                if !self.stale.contains(remote) {
                    tiles.push(self.remote_tile(remote));
                }
            }
        }

        let mut extra: Vec<&ParticipantId> = self
            .links
            .keys()
            .filter(|remote| !tiles.iter().any(|tile| &tile.id == *remote))
            .filter(|remote| !self.stale.contains(*remote))
            .collect();
        extra.sort();
        for remote in extra {
            tiles.push(self.remote_tile(remote));
        }

        let host = self.call.as_ref().map(|call| call.host_id().clone());
        self.view.publish(tiles, host, true);
    }
}
