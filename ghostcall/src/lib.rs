pub use ghostcall_core::{ParticipantId, RoomId};

pub mod model {
    pub use ghostcall_core::model::*;
}

#[cfg(feature = "session")]
pub mod session {
    pub use ghostcall_session::*;
}
