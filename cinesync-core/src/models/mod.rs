pub mod id;
pub mod library;
pub mod message;
pub mod playback;

pub use id::ConnectionId;
pub use library::{ReadinessState, VideoEntry};
pub use message::{ClientMessage, PlaybackCommand, ServerEvent};
pub use playback::{PlaybackAction, PlaybackState, PlaybackStatus};
