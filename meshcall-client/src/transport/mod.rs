mod peer_session;
mod transport_config;
mod transport_event;
mod webrtc_session;

pub use peer_session::*;
pub use transport_config::*;
pub use transport_event::*;
pub use webrtc_session::*;
