use meshcall_client::LinkState;
use meshcall_core::{SessionDescription, SignalKind};

use crate::integration::{create_test_service, init_tracing};
use crate::utils::{Participant, RawPeer};

#[tokio::test]
async fn test_glare_lower_id_keeps_offer() {
    init_tracing();

    let service = create_test_service();
    let p = Participant::spawn(&service);
    let mut r = RawPeer::connect(&service);
    while r.id < p.id {
        r = RawPeer::connect(&service);
    }

    r.join("r1").await.expect("r joins");
    p.join("r1").await.expect("p joins");
    r.next_envelope(SignalKind::Offer).await.expect("p offers");

    // r offers too, crossing p's offer
    r.send(
        SignalKind::Offer,
        p.id,
        SessionDescription::offer("v=0 crossing offer").to_payload(),
    );

    r.assert_no_envelope(SignalKind::Answer).await;

    let snapshot = p.handle.snapshot().await.expect("snapshot");
    let link = snapshot.link(&r.id).expect("link to r");
    assert!(link.initiated);
    assert_eq!(link.state, LinkState::OfferSent);

    let sessions = p.factory.sessions_for(&r.id);
    assert_eq!(sessions.len(), 1);
    assert!(!sessions[0].is_closed());
    assert!(sessions[0].remote_description().is_none());

    // r concedes and answers p's offer
    r.send(
        SignalKind::Answer,
        p.id,
        SessionDescription::answer("v=0 conceding answer").to_payload(),
    );
    p.wait_until(|s| s.established() == 1)
        .await
        .expect("p establishes on its own offer");
}
