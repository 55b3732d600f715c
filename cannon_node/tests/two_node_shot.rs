mod support;

use cannon_node::domain::{PixelPoint, ShotOutcome};
use cannon_node::use_cases::StatusEvent;

#[tokio::test]
async fn when_a_shot_leaves_one_screen_then_it_lands_on_the_neighbour() {
    let (sender, sender_overlay) = support::start_node().await;
    let (receiver, receiver_overlay) = support::start_node().await;
    let mut sender_status = sender.subscribe_status();
    let mut receiver_status = receiver.subscribe_status();

    sender
        .add_peer("127.0.0.1", receiver.local_addr().port())
        .await
        .expect("sender accepts peer");
    support::wait_for_status(&mut sender_status, |event| {
        matches!(event, StatusEvent::Connected { .. })
    })
    .await;
    support::wait_for_status(&mut receiver_status, |event| {
        matches!(event, StatusEvent::Connected { .. })
    })
    .await;

    sender
        .launch(PixelPoint::new(960.0, 540.0))
        .await
        .expect("sender accepts launch");

    let launched = support::wait_for_status(&mut sender_status, |event| {
        matches!(event, StatusEvent::ShotLaunched { .. })
    })
    .await;
    let scheduled = support::wait_for_status(&mut receiver_status, |event| {
        matches!(event, StatusEvent::ShotScheduled { .. })
    })
    .await;
    let StatusEvent::ShotLaunched {
        delay_ms: sent_delay,
        ..
    } = launched
    else {
        unreachable!();
    };
    let StatusEvent::ShotScheduled {
        delay_ms, lands, ..
    } = scheduled
    else {
        unreachable!();
    };
    // 0.55 screen widths to the exit boundary at one width per second.
    assert_eq!(sent_delay, 550);
    assert_eq!(delay_ms, 550);
    assert!(lands);

    support::eventually(|| receiver_overlay.with_log(|log| !log.finished.is_empty())).await;

    receiver_overlay.with_log(|log| {
        assert_eq!(log.finished.len(), 1);
        assert_eq!(log.finished[0].1, ShotOutcome::Landed);
        assert_eq!(log.impacts.len(), 1);
        let (at, _) = log.impacts[0];
        assert!((0.0..=1920.0).contains(&at.x));
        assert!((648.0 - 1e-6..=702.0 + 1e-6).contains(&at.y));
        assert!(!log.renders.is_empty());
    });

    // The sender animates its half and exits without an impact of its own.
    support::eventually(|| sender_overlay.with_log(|log| !log.finished.is_empty())).await;
    sender_overlay.with_log(|log| {
        assert_eq!(log.finished[0].1, ShotOutcome::ExitedSilently);
        assert!(log.impacts.is_empty());
    });

    sender.shutdown().await;
    receiver.shutdown().await;
}

#[tokio::test]
async fn when_the_same_peer_is_added_twice_then_it_is_dialed_once() {
    let (node, _overlay) = support::start_node().await;
    let (other, _other_overlay) = support::start_node().await;
    let mut status_rx = other.subscribe_status();

    let port = other.local_addr().port();
    node.add_peer("127.0.0.1", port).await.expect("accepts peer");
    node.add_peer("127.0.0.1", port).await.expect("accepts peer");

    support::wait_for_status(&mut status_rx, |event| {
        matches!(event, StatusEvent::Connected { .. })
    })
    .await;
    tokio::time::sleep(std::time::Duration::from_millis(200)).await;

    assert_eq!(other.connection_count(), 1);
    assert_eq!(node.connection_count(), 1);

    node.shutdown().await;
    other.shutdown().await;
}
