use ghostcall_core::ClientEvent;
use ghostcall_session::SessionCommand;

use crate::integration::{create_harness, pid};

#[tokio::test]
async fn test_two_person_call() {
    let mut h = create_harness("a");
    h.enter("a").await;
    h.joined("b").await;

    assert_eq!(h.manager.live_links(), vec![pid("b")]);

    h.left("b").await;

    assert!(h.manager.live_links().is_empty());
    let call = h.manager.call().expect("call should still exist");
    assert_eq!(call.participants(), &[pid("a")]);
    assert_eq!(call.host_id(), &pid("a"));

    h.apply(SessionCommand::Leave).await;

    assert!(h.manager.call().is_none());
    assert!(h.media.current().stop_calls() > 0);
    assert_eq!(
        h.signaling
            .count_matching(|e| matches!(e, ClientEvent::LeaveCall { .. }))
            .await,
        1
    );
}

#[tokio::test]
async fn test_starter_is_sole_initial_member() {
    let mut h = create_harness("a");
    h.enter("a").await;

    let events = h.signaling.events().await;
    assert!(matches!(events.first(), Some(ClientEvent::StartCall { .. })));

    let call = h.manager.call().unwrap();
    assert_eq!(call.participants(), &[pid("a")]);
    assert_eq!(h.manager.view().host(), Some(pid("a")));
}
