use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Clip database location.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// SQLite file holding recorded clips (None = `videos.sqlite3` in the data dir).
    #[serde(default)]
    pub database_path: Option<PathBuf>,
}
