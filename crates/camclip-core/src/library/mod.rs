mod duration;
mod snapshot;
mod video_library;

pub use duration::format_duration;
pub use snapshot::{AppSnapshot, VideoSummary, selectors};
pub use video_library::VideoLibrary;
