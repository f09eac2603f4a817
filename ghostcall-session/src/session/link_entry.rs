use crate::config::CallConfig;
use crate::error::LinkError;
use crate::link::{LinkRole, PeerLink};
use ghostcall_core::{ConnectionState, LinkId, SignalPayload};
use std::collections::VecDeque;
use std::time::Duration;
use tokio::time::Instant;

const SEEN_PAYLOADS: usize = 32;

pub(crate) enum Delivery {
    Drained,
    RetryScheduled {
        attempt: u32,
        delay: Duration,
        error: LinkError,
    },
    Exhausted(LinkError),
}

/// Manager-side record of one remote participant's link.
pub(crate) struct LinkEntry {
    link: Option<Box<dyn PeerLink>>,
    pub(crate) link_id: LinkId,
    pub(crate) role: LinkRole,
    pub(crate) state: ConnectionState,
    pub(crate) is_speaking: bool,
    pending: VecDeque<SignalPayload>,
    seen: VecDeque<SignalPayload>,
    failures: u32,
    pub(crate) retry_at: Option<Instant>,
    pub(crate) disconnected_at: Option<Instant>,
}

impl LinkEntry {
    pub(crate) fn live(link: Box<dyn PeerLink>, role: LinkRole) -> Self {
        Self {
            link_id: link.link_id(),
            link: Some(link),
            role,
            state: ConnectionState::Connecting,
            is_speaking: false,
            pending: VecDeque::new(),
            seen: VecDeque::new(),
            failures: 0,
            retry_at: None,
            disconnected_at: None,
        }
    }

    /// Entry for a link whose adapter could not even be created.
    pub(crate) fn failed(link_id: LinkId, role: LinkRole) -> Self {
        Self {
            link: None,
            link_id,
            role,
            state: ConnectionState::Disconnected,
            is_speaking: false,
            pending: VecDeque::new(),
            seen: VecDeque::new(),
            failures: 0,
            retry_at: None,
            disconnected_at: Some(Instant::now()),
        }
    }

    pub(crate) fn is_live(&self) -> bool {
        self.link.is_some()
    }

    pub(crate) fn is_retrying(&self) -> bool {
        self.retry_at.is_some()
    }

    /// Redelivered payloads (already applied or still queued) are absorbed.
    pub(crate) fn enqueue(&mut self, payload: SignalPayload) -> bool {
        if self.pending.contains(&payload) || self.seen.contains(&payload) {
            return false;
        }
        self.pending.push_back(payload);
        true
    }

    /// Applies queued payloads in delivery order, stopping at the first
    /// failure. Later payloads stay queued behind the failing one.
    pub(crate) async fn apply_pending(&mut self, config: &CallConfig) -> Delivery {
        while let Some(payload) = self.pending.front().cloned() {
            let Some(link) = self.link.as_mut() else {
                self.pending.clear();
                return Delivery::Drained;
            };

            match link.signal(&payload).await {
                Ok(()) => {
                    self.pending.pop_front();
                    self.remember(payload);
                    self.failures = 0;
                }
                Err(error) => {
                    self.failures += 1;
                    if self.failures > config.max_signal_retries {
                        return Delivery::Exhausted(error);
                    }
                    let delay = config.backoff_for(self.failures);
                    self.retry_at = Some(Instant::now() + delay);
                    return Delivery::RetryScheduled {
                        attempt: self.failures,
                        delay,
                        error,
                    };
                }
            }
        }
        Delivery::Drained
    }

    /// Destroys the adapter and moves to a terminal state.
    pub(crate) async fn release(&mut self, state: ConnectionState) {
        if let Some(mut link) = self.link.take() {
            link.destroy().await;
        }
        self.pending.clear();
        self.retry_at = None;
        self.is_speaking = false;
        if state == ConnectionState::Disconnected && self.disconnected_at.is_none() {
            self.disconnected_at = Some(Instant::now());
        }
        self.state = state;
    }

    fn remember(&mut self, payload: SignalPayload) {
        if self.seen.len() == SEEN_PAYLOADS {
            self.seen.pop_front();
        }
        self.seen.push_back(payload);
    }
}
