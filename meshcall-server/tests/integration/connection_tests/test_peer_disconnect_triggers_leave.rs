use meshcall_core::RoomKey;

use crate::integration::{create_test_service, init_tracing};
use crate::utils::{TestClient, assert_no_signal};

#[tokio::test]
async fn test_peer_disconnect_triggers_leave() {
    init_tracing();

    let service = create_test_service();

    let mut a = TestClient::connect(&service).await.expect("connect a");
    let mut b = TestClient::connect(&service).await.expect("connect b");
    let mut c = TestClient::connect(&service).await.expect("connect c");

    a.join("r1").await.expect("a joins");
    b.join("r1").await.expect("b joins");
    c.join("r1").await.expect("c joins");

    b.disconnect();

    assert_eq!(a.next_departure().await.expect("a sees departure"), b.id);
    assert_eq!(c.next_departure().await.expect("c sees departure"), b.id);

    // second disconnect is a no-op
    b.disconnect();
    assert_no_signal(&mut a.rx).await;

    let members = service.members_of(&RoomKey::new("r1").unwrap());
    assert_eq!(members.len(), 2);
    assert!(!members.contains(&b.id));
    assert!(!service.registry().is_live(&b.id));
}

#[tokio::test]
async fn test_explicit_leave_notifies_remaining_members() {
    init_tracing();

    let service = create_test_service();

    let mut a = TestClient::connect(&service).await.expect("connect a");
    let mut b = TestClient::connect(&service).await.expect("connect b");
    a.join("r1").await.expect("a joins");
    b.join("r1").await.expect("b joins");

    b.leave();
    b.leave();

    assert_eq!(a.next_departure().await.expect("departure"), b.id);
    assert_no_signal(&mut a.rx).await;
    assert!(service.registry().is_live(&b.id), "leaving a room keeps the connection");
    assert_eq!(service.directory().room_of(&b.id), None);
}
