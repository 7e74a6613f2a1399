use crate::{library::format_duration, quality::QualityTier};

use std::fmt;

/// One completed recording as persisted in the [`crate::VideoStore`].
///
/// Immutable once stored. `id` is the creation time in epoch milliseconds
/// rendered as a string.
#[derive(Clone, PartialEq, Eq)]
pub struct SavedVideo {
    /// Unique opaque identifier.
    pub id: String,
    /// Encoded WebM bytes. Never empty for a stored record.
    pub blob_data: Vec<u8>,
    /// Creation time, epoch milliseconds.
    pub timestamp: i64,
    /// Recorded length in whole seconds.
    pub duration: u32,
    /// Tier active while the clip was recorded.
    pub quality: QualityTier,
}

impl SavedVideo {
    /// Duration rendered for display ("0s", "7s", "1:05").
    pub fn duration_label(&self) -> String {
        format_duration(self.duration)
    }

    /// Size of the encoded payload in bytes.
    pub fn size_bytes(&self) -> usize {
        self.blob_data.len()
    }
}

// Payloads run to megabytes; print the size instead.
impl fmt::Debug for SavedVideo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SavedVideo")
            .field("id", &self.id)
            .field("blob_bytes", &self.blob_data.len())
            .field("timestamp", &self.timestamp)
            .field("duration", &self.duration)
            .field("quality", &self.quality)
            .finish()
    }
}
