use meshcall_core::RoomKey;

use crate::integration::{create_test_service, init_tracing};
use crate::utils::TestClient;

#[tokio::test]
async fn test_switching_rooms_leaves_the_old_one() {
    init_tracing();

    let service = create_test_service();

    let mut a = TestClient::connect(&service).await.expect("connect a");
    let mut b = TestClient::connect(&service).await.expect("connect b");
    let mut c = TestClient::connect(&service).await.expect("connect c");
    a.join("r1").await.expect("a joins r1");
    b.join("r1").await.expect("b joins r1");
    c.join("r2").await.expect("c joins r2");

    let members = b.join("r2").await.expect("b moves to r2");
    assert_eq!(members, vec![c.id]);

    assert_eq!(a.next_departure().await.expect("a sees b leave"), b.id);
    assert_eq!(service.members_of(&RoomKey::new("r1").unwrap()), vec![a.id]);

    let mut r2 = vec![b.id, c.id];
    r2.sort();
    assert_eq!(service.members_of(&RoomKey::new("r2").unwrap()), r2);
}
