use std::collections::HashSet;

use crate::integration::{create_test_service, init_tracing};
use crate::utils::TestClient;

#[tokio::test]
async fn test_three_peers_join() {
    init_tracing();

    let service = create_test_service();

    let mut a = TestClient::connect(&service).await.expect("connect a");
    let mut b = TestClient::connect(&service).await.expect("connect b");
    let mut c = TestClient::connect(&service).await.expect("connect c");

    let seen_by_a: HashSet<_> = a.join("r1").await.expect("a joins").into_iter().collect();
    let seen_by_b: HashSet<_> = b.join("r1").await.expect("b joins").into_iter().collect();
    let seen_by_c: HashSet<_> = c.join("r1").await.expect("c joins").into_iter().collect();

    assert!(seen_by_a.is_empty());
    assert_eq!(seen_by_b, HashSet::from([a.id]));
    assert_eq!(seen_by_c, HashSet::from([a.id, b.id]));

    // every pair appears in exactly one snapshot, so exactly one side initiates
    let snapshots = [(a.id, &seen_by_a), (b.id, &seen_by_b), (c.id, &seen_by_c)];
    for (i, (left, left_seen)) in snapshots.iter().enumerate() {
        for (right, right_seen) in snapshots.iter().skip(i + 1) {
            let left_initiates = left_seen.contains(right);
            let right_initiates = right_seen.contains(left);
            assert!(
                left_initiates ^ right_initiates,
                "pair {} / {} must have exactly one initiator",
                left,
                right
            );
        }
    }
}
