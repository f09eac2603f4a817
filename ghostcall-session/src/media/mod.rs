mod local_media;
mod track_media;

pub use local_media::*;
pub use track_media::*;
