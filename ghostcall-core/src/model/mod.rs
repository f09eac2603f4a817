mod call;
mod events;
mod link;
mod participant;
mod room;
mod signal;

pub use call::{CallSession, ConnectionState, ParticipantTile, UNKNOWN_USERNAME};
pub use events::{ClientEvent, ServerEvent};
pub use link::LinkId;
pub use participant::{ParticipantId, RoomUser};
pub use room::RoomId;
pub use signal::SignalPayload;
