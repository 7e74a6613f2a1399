use crate::config::default_probe_url;

use camclip_core::QualityTier;
use serde::{Deserialize, Serialize};

/// Bandwidth probe and manual quality configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualityConfig {
    /// Reference payload downloaded to measure throughput.
    #[serde(default = "default_probe_url")]
    pub probe_url: String,

    /// Manually selected tier (None = follow the measured bandwidth).
    #[serde(default)]
    pub pinned: Option<QualityTier>,
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self {
            probe_url: default_probe_url(),
            pinned: None,
        }
    }
}
