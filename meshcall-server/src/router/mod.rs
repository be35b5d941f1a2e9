mod delivery;
mod message_router;

pub use delivery::*;
pub use message_router::*;
