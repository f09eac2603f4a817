use ghostcall_session::{CallNotice, SessionCommand};
use serde_json::json;

use crate::integration::create_harness;

#[tokio::test]
async fn test_media_denied_never_enters_call() {
    let mut h = create_harness("a");
    h.media.deny(true);

    h.apply(SessionCommand::Start).await;

    assert!(!h.manager.is_active());
    assert!(!h.manager.timers_running());
    assert!(h.manager.media().is_none());
    assert!(h.signaling.events().await.is_empty());
    assert!(!h.manager.view().in_call());
    assert!(matches!(
        h.drain_notices().as_slice(),
        [CallNotice::MediaUnavailable(_)]
    ));

    h.signal("b", json!({ "type": "offer" })).await;
    assert_eq!(h.connector.created(), 0);
}

#[tokio::test]
async fn test_retry_after_denial() {
    let mut h = create_harness("a");
    h.media.deny(true);
    h.apply(SessionCommand::Join).await;

    h.media.deny(false);
    h.apply(SessionCommand::Join).await;

    assert!(h.manager.is_active());
    assert_eq!(h.media.acquired().len(), 1);
    assert!(h.drain_notices().contains(&CallNotice::Joined));
}
