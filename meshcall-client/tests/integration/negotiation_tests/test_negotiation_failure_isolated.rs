use meshcall_client::{ConnectionStatus, MeshEvent};
use meshcall_core::{SessionDescription, SignalKind};

use crate::integration::{create_test_service, init_tracing};
use crate::utils::{Participant, REJECT_MARKER, RawPeer};

#[tokio::test]
async fn test_negotiation_failure_isolated() {
    init_tracing();

    let service = create_test_service();
    let mut p = Participant::spawn(&service);
    let q = Participant::spawn(&service);
    let mut r = RawPeer::connect(&service);

    p.join("r1").await.expect("p joins");
    q.join("r1").await.expect("q joins");
    p.wait_until(|s| s.established() == 1)
        .await
        .expect("p and q connect");
    r.join("r1").await.expect("r joins");

    r.send(
        SignalKind::Offer,
        p.id,
        SessionDescription::offer(format!("v=0 {}", REJECT_MARKER)).to_payload(),
    );

    let r_id = r.id;
    let event = p
        .next_event(|e| matches!(e, MeshEvent::PeerStatus { peer, .. } if *peer == r_id))
        .await
        .expect("per-peer status");
    assert_eq!(
        event,
        MeshEvent::PeerStatus {
            peer: r_id,
            status: ConnectionStatus::Error
        }
    );

    r.assert_no_envelope(SignalKind::Answer).await;

    let snapshot = p.handle.snapshot().await.expect("snapshot");
    assert!(snapshot.link(&r.id).is_none());
    assert_eq!(snapshot.established(), 1);
    assert!(snapshot.link(&q.id).is_some());
    assert_eq!(snapshot.status, ConnectionStatus::Connected);
}
