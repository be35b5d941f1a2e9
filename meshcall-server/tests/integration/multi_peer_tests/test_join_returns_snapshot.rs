use crate::integration::{create_test_service, init_tracing};
use crate::utils::{TestClient, assert_no_signal};

#[tokio::test]
async fn test_join_returns_snapshot() {
    init_tracing();

    let service = create_test_service();

    let mut x = TestClient::connect(&service).await.expect("connect x");
    let mut y = TestClient::connect(&service).await.expect("connect y");

    let members = x.join("r1").await.expect("x joins");
    assert!(members.is_empty(), "first joiner sees an empty room");

    let members = y.join("r1").await.expect("y joins");
    assert_eq!(members, vec![x.id]);

    // existing members are not told about newcomers; the newcomer initiates
    assert_no_signal(&mut x.rx).await;
}

#[tokio::test]
async fn test_rejoin_same_room_is_idempotent() {
    init_tracing();

    let service = create_test_service();

    let mut x = TestClient::connect(&service).await.expect("connect x");
    let mut y = TestClient::connect(&service).await.expect("connect y");
    x.join("r1").await.expect("x joins");
    y.join("r1").await.expect("y joins");

    let again = y.join("r1").await.expect("y joins again");
    assert_eq!(again, vec![x.id]);
    assert_eq!(
        service
            .members_of(&meshcall_core::RoomKey::new("r1").unwrap())
            .len(),
        2
    );
    assert_no_signal(&mut x.rx).await;
}
