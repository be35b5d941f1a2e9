mod coordinator;
mod mesh_command;
mod mesh_event;
mod peer_link;

pub use coordinator::*;
pub use mesh_command::*;
pub use mesh_event::*;
pub use peer_link::*;
