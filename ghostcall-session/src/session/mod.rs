mod call_handle;
mod call_manager;
mod call_notice;
mod call_view;
mod link_entry;
mod session_command;
mod timers;

pub use call_handle::*;
pub use call_manager::*;
pub use call_notice::*;
pub use call_view::*;
pub use session_command::*;
