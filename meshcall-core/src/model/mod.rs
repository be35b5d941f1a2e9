mod connection;
mod room;
mod session;
mod signaling;

pub use connection::ConnectionId;
pub use room::RoomKey;
pub use session::{SdpKind, SessionDescription};
pub use signaling::{ClientSignal, IceServerConfig, ServerSignal, SignalEnvelope, SignalKind};
