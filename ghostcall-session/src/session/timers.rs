use std::time::Duration;
use tokio::time::{Instant, Interval, MissedTickBehavior, interval_at, sleep_until};

/// Periodic tasks of an active call. Dropping the intervals is the
/// cancellation, so `cancel` takes effect within the calling handler.
#[derive(Default)]
pub(crate) struct SessionTimers {
    pub(crate) speaking: Option<Interval>,
    pub(crate) reconcile: Option<Interval>,
}

impl SessionTimers {
    pub(crate) fn start(&mut self, speaking_every: Duration, reconcile_every: Duration) {
        self.speaking = Some(periodic(speaking_every));
        self.reconcile = Some(periodic(reconcile_every));
    }

    pub(crate) fn cancel(&mut self) {
        self.speaking = None;
        self.reconcile = None;
    }

    pub(crate) fn is_running(&self) -> bool {
        self.speaking.is_some() || self.reconcile.is_some()
    }
}

fn periodic(period: Duration) -> Interval {
    let mut interval = interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    interval
}

pub(crate) async fn tick(interval: &mut Option<Interval>) {
    match interval {
        Some(i) => {
            i.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}

pub(crate) async fn sleep_until_deadline(deadline: Option<Instant>) {
    match deadline {
        Some(d) => sleep_until(d).await,
        None => std::future::pending::<()>().await,
    }
}
