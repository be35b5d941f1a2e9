use meshcall_client::{ConnectionStatus, MeshError, MeshEvent};

use crate::integration::{create_test_service, init_tracing};
use crate::utils::Participant;

#[tokio::test]
async fn test_signaling_loss() {
    init_tracing();

    let service = create_test_service();
    let x = Participant::spawn(&service);
    let mut y = Participant::spawn(&service);

    x.join("r1").await.expect("x joins");
    y.join("r1").await.expect("y joins");
    y.wait_until(|s| s.established() == 1)
        .await
        .expect("y establishes");

    y.drop_connection();

    y.next_event(|e| *e == MeshEvent::Status(ConnectionStatus::Error))
        .await
        .expect("y reports the lost connection");

    let handle = y.handle.clone();
    let media = y.media.clone().expect("y has prepared media");
    let sessions = y.factory.all_sessions();
    y.finished().await.expect("coordinator exits");

    assert!(matches!(handle.snapshot().await, Err(MeshError::Stopped)));
    assert!(!media.is_active());
    assert!(sessions.iter().all(|s| s.is_closed()));

    x.wait_until(|s| s.links.is_empty())
        .await
        .expect("x drops its link to y");
}
