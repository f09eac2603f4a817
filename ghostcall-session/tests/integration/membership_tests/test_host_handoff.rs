use ghostcall_session::{CallNotice, SessionCommand};
use serde_json::json;

use crate::integration::{create_harness, pid};

#[tokio::test]
async fn test_host_handoff() {
    let mut h = create_harness("b");
    h.enter("a").await;
    h.apply(SessionCommand::CallActive {
        host_id: pid("a"),
        participants: vec![pid("a"), pid("b"), pid("c")],
    })
    .await;
    h.signal("a", json!({ "type": "offer", "n": 1 })).await;
    h.signal("c", json!({ "type": "offer", "n": 2 })).await;
    assert_eq!(h.manager.live_links(), vec![pid("a"), pid("c")]);

    h.left("a").await;

    let call = h.manager.call().unwrap();
    assert_eq!(call.host_id(), &pid("b"));
    assert!(call.contains(call.host_id()));

    h.apply(SessionCommand::HostChanged {
        new_host_id: pid("c"),
    })
    .await;

    assert_eq!(h.manager.call().unwrap().host_id(), &pid("c"));
    assert_eq!(h.manager.view().host(), Some(pid("c")));
    assert_eq!(h.manager.live_links(), vec![pid("c")]);
    assert_eq!(h.connector.created(), 2);
    assert!(
        h.drain_notices()
            .contains(&CallNotice::HostChanged(pid("c")))
    );
}
