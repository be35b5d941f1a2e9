
use tracing::Level;

use meshcall_server::SignalingService;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(Level::DEBUG)
        .with_test_writer()
        .try_init();
}

pub fn create_test_service() -> SignalingService {
    SignalingService::new(meshcall_core::utils::default_ice_servers())
}
