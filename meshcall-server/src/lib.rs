mod app;
mod config;
mod registry;
mod room;
mod router;
mod signaling;

pub use app::*;
pub use config::*;
pub use registry::*;
pub use room::*;
pub use router::*;
pub use signaling::*;
