pub mod config;
pub mod error;
pub mod link;
pub mod media;
pub mod session;
pub mod signaling;
pub mod speaking;

pub use config::*;
pub use error::*;
pub use link::*;
pub use media::*;
pub use session::*;
pub use signaling::*;
pub use speaking::*;
