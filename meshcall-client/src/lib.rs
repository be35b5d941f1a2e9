mod error;
mod media;
mod mesh;
mod signaling;
mod transport;

pub use error::*;
pub use media::*;
pub use mesh::*;
pub use signaling::*;
pub use transport::*;
