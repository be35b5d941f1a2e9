use meshcall_core::{SessionDescription, SignalKind};

use crate::integration::{create_test_service, init_tracing};
use crate::utils::{Participant, RawPeer, SILENCE_WINDOW_MS};

#[tokio::test]
async fn test_other_room_offer_ignored() {
    init_tracing();

    let service = create_test_service();
    let p = Participant::spawn(&service);
    let mut r = RawPeer::connect(&service);

    p.join("r1").await.expect("p joins");
    r.join("r2").await.expect("r joins");

    r.send(
        SignalKind::Offer,
        p.id,
        SessionDescription::offer("v=0 stray offer").to_payload(),
    );
    r.assert_no_envelope(SignalKind::Answer).await;

    let snapshot = p.handle.snapshot().await.expect("snapshot");
    assert!(snapshot.links.is_empty());
    assert!(p.factory.sessions_for(&r.id).is_empty());

    service.disconnect(r.id);
    tokio::time::sleep(std::time::Duration::from_millis(SILENCE_WINDOW_MS)).await;

    let snapshot = p.handle.snapshot().await.expect("snapshot");
    assert!(snapshot.links.is_empty());
}

#[tokio::test]
async fn test_offer_before_join_ignored() {
    init_tracing();

    let service = create_test_service();
    let p = Participant::spawn(&service);
    let mut r = RawPeer::connect(&service);

    p.wait_until(|s| s.local_id.is_some())
        .await
        .expect("welcome processed");

    // both room-less, so the server relays it
    r.send(
        SignalKind::Offer,
        p.id,
        SessionDescription::offer("v=0 early offer").to_payload(),
    );
    r.assert_no_envelope(SignalKind::Answer).await;

    let snapshot = p.handle.snapshot().await.expect("snapshot");
    assert!(snapshot.links.is_empty());
    assert!(p.factory.all_sessions().is_empty());
}
