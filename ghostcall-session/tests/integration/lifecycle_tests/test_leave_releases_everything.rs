use ghostcall_core::ClientEvent;
use ghostcall_session::{CallNotice, SessionCommand};

use crate::integration::create_harness;

#[tokio::test]
async fn test_leave_releases_everything() {
    for size in 0..5 {
        let mut h = create_harness("a");
        h.enter("a").await;
        for n in 0..size {
            h.joined(&format!("r{}", n)).await;
        }
        assert_eq!(h.manager.live_links().len(), size);

        h.apply(SessionCommand::Leave).await;

        assert!(h.manager.live_links().is_empty(), "size {}", size);
        assert!(!h.manager.is_active());
        assert!(!h.manager.timers_running());
        assert!(h.manager.media().is_none());
        assert!(h.media.current().is_stopped());
        assert!(h.connector.all().iter().all(|link| link.is_destroyed()));
        assert!(!h.manager.view().in_call());
        assert!(h.manager.view().is_empty());
        assert_eq!(
            h.signaling
                .count_matching(|e| matches!(e, ClientEvent::LeaveCall { .. }))
                .await,
            1
        );
        assert!(h.drain_notices().contains(&CallNotice::Left));
    }
}

#[tokio::test]
async fn test_leave_keeps_remaining_members() {
    let mut h = create_harness("a");
    h.enter("a").await;
    h.joined("b").await;

    h.apply(SessionCommand::Leave).await;

    let call = h.manager.call().expect("b is still in the call");
    assert!(!call.contains(h.manager.local_id()));
    assert!(call.contains(&crate::integration::pid("b")));
}

#[tokio::test]
async fn test_leave_twice_is_harmless() {
    let mut h = create_harness("a");
    h.enter("a").await;

    h.apply(SessionCommand::Leave).await;
    h.apply(SessionCommand::Leave).await;

    assert_eq!(h.media.current().stop_calls(), 1);
    assert_eq!(
        h.signaling
            .count_matching(|e| matches!(e, ClientEvent::LeaveCall { .. }))
            .await,
        1
    );
}
