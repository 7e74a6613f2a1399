mod cache;
mod registry;

pub use cache::PlaybackCache;
pub use registry::{Blob, BlobRegistry, Locator};
