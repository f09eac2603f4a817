use ghostcall_core::{ClientEvent, ServerEvent};
use std::time::Duration;
use tokio::time::sleep;

use crate::integration::{pid, spawn_session};

#[tokio::test(start_paused = true)]
async fn test_speaking_sampled_on_timer_until_leave() {
    let s = spawn_session("a");

    s.handle.start().await.unwrap();
    s.handle
        .forward(ServerEvent::CallStarted { host_id: pid("a") })
        .await
        .unwrap();
    sleep(Duration::from_millis(10)).await;

    assert!(s.handle.view().in_call());
    let media = s.media.current();
    media.set_level(90);

    sleep(Duration::from_millis(250)).await;
    assert_eq!(s.signaling.speaking_events().await, vec![true]);
    assert!(s.handle.view().tile(&pid("a")).unwrap().is_speaking);

    s.handle.leave().await.unwrap();
    sleep(Duration::from_millis(10)).await;

    assert!(media.is_stopped());
    assert!(!s.handle.view().in_call());

    media.set_level(0);
    sleep(Duration::from_secs(2)).await;
    assert_eq!(s.signaling.speaking_events().await, vec![true]);
    assert_eq!(
        s.signaling
            .count_matching(|e| matches!(e, ClientEvent::LeaveCall { .. }))
            .await,
        1
    );

    s.handle.shutdown().await;
}
