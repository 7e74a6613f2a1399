mod record;
mod schema;
mod video_store;

pub use record::SavedVideo;
pub use video_store::VideoStore;
