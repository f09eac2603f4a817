mod link_event;
mod peer_link;
mod rtc_link;

pub use link_event::*;
pub use peer_link::*;
pub use rtc_link::*;
