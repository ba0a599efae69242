pub mod auth;
pub mod library;
pub mod playback;

pub use auth::{is_privileged, OwnerAuth};
pub use library::LibraryService;
pub use playback::PlaybackService;
