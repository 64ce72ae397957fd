//! Domain types shared by every Videoflix component.

pub mod quality;
pub mod user;
pub mod video;

pub use quality::QualityTier;
pub use user::User;
pub use video::{ProcessingState, Video, VideoId};
