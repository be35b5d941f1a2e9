use meshcall_client::{ConnectionStatus, LinkState, MeshEvent, SessionState};
use tokio::time::{Duration, sleep};

use crate::integration::{create_test_service, init_tracing};
use crate::utils::{Participant, SILENCE_WINDOW_MS};

#[tokio::test]
async fn test_transient_disconnect_keeps_link() {
    init_tracing();

    let service = create_test_service();
    let mut a = Participant::spawn(&service);
    let b = Participant::spawn(&service);

    a.join("r1").await.expect("a joins");
    b.join("r1").await.expect("b joins");
    a.wait_until(|s| s.established() == 1)
        .await
        .expect("a establishes");

    let b_id = b.id;
    let session = a.factory.latest_for(&b_id).expect("a's session");

    session.report(SessionState::Disconnected);
    a.next_event(|e| {
        matches!(e, MeshEvent::PeerStatus { peer, status: ConnectionStatus::Connecting } if *peer == b_id)
    })
    .await
    .expect("b reported as reconnecting");

    sleep(Duration::from_millis(SILENCE_WINDOW_MS)).await;
    let snapshot = a.handle.snapshot().await.expect("snapshot");
    let link = snapshot.link(&b_id).expect("link survives a disconnect");
    assert_eq!(link.state, LinkState::Established);
    assert!(!session.is_closed());
    assert_eq!(a.factory.sessions_for(&b_id).len(), 1);

    session.report(SessionState::Connected);
    a.next_event(|e| {
        matches!(e, MeshEvent::PeerStatus { peer, status: ConnectionStatus::Connected } if *peer == b_id)
    })
    .await
    .expect("b reported as connected again");
}

#[tokio::test]
async fn test_failed_transport_tears_down_link() {
    init_tracing();

    let service = create_test_service();
    let mut a = Participant::spawn(&service);
    let b = Participant::spawn(&service);

    a.join("r1").await.expect("a joins");
    b.join("r1").await.expect("b joins");
    a.wait_until(|s| s.established() == 1)
        .await
        .expect("a establishes");

    let b_id = b.id;
    let session = a.factory.latest_for(&b_id).expect("a's session");

    session.report(SessionState::Disconnected);
    session.report(SessionState::Failed);

    a.next_event(|e| {
        matches!(e, MeshEvent::PeerStatus { peer, status: ConnectionStatus::Error } if *peer == b_id)
    })
    .await
    .expect("b reported as failed");

    a.wait_until(|s| s.link(&b_id).is_none())
        .await
        .expect("link to b torn down");
    assert!(session.is_closed());
}
