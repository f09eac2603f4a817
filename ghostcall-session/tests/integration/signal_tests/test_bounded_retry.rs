use ghostcall_core::{ConnectionState, SignalPayload};
use ghostcall_session::{CallConfig, CallNotice};
use serde_json::json;

use crate::integration::{create_harness, pid};

#[tokio::test(start_paused = true)]
async fn test_bounded_retry_ends_disconnected() {
    let mut h = create_harness("b");
    let config = CallConfig::default();
    h.enter("a").await;
    h.connector.fail_first_signals(4);

    h.signal("a", json!({ "type": "offer" })).await;
    let link = h.connector.link(&pid("a"));
    assert_eq!(link.attempts(), 1);
    assert!(h.manager.next_retry_deadline().is_some());

    for retry in 1..=3 {
        assert_eq!(
            h.manager.link_state(&pid("a")),
            Some(ConnectionState::Connecting)
        );
        tokio::time::advance(config.backoff_for(retry)).await;
        h.manager.retry_due().await;
    }

    assert_eq!(link.attempts(), 4);
    assert_eq!(
        h.manager.link_state(&pid("a")),
        Some(ConnectionState::Disconnected)
    );
    assert!(h.manager.live_links().is_empty());
    assert!(link.is_destroyed());
    assert!(h.manager.next_retry_deadline().is_none());
    assert!(
        h.drain_notices()
            .contains(&CallNotice::ParticipantDisconnected(pid("a")))
    );
}

#[tokio::test(start_paused = true)]
async fn test_retry_waits_for_backoff() {
    let mut h = create_harness("b");
    h.enter("a").await;
    h.connector.fail_first_signals(1);

    h.signal("a", json!({ "type": "offer" })).await;
    let link = h.connector.link(&pid("a"));

    h.manager.retry_due().await;
    assert_eq!(link.attempts(), 1);

    tokio::time::advance(CallConfig::default().retry_backoff).await;
    h.manager.retry_due().await;
    assert_eq!(link.attempts(), 2);
    assert_eq!(link.applied().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_retry_recovers_and_keeps_order() {
    let mut h = create_harness("b");
    let config = CallConfig::default();
    h.enter("a").await;
    h.connector.fail_first_signals(2);

    let offer = json!({ "type": "offer" });
    let candidate = json!({ "type": "candidate", "n": 1 });
    h.signal("a", offer.clone()).await;
    h.signal("a", candidate.clone()).await;

    let link = h.connector.link(&pid("a"));
    assert_eq!(link.attempts(), 1, "queued payload must wait behind the retry");

    tokio::time::advance(config.backoff_for(1)).await;
    h.manager.retry_due().await;
    assert!(link.applied().is_empty());

    tokio::time::advance(config.backoff_for(2)).await;
    h.manager.retry_due().await;

    assert_eq!(
        link.applied(),
        vec![SignalPayload::new(offer), SignalPayload::new(candidate)]
    );
    assert_eq!(h.manager.live_links(), vec![pid("a")]);
    assert!(h.manager.next_retry_deadline().is_none());
}
