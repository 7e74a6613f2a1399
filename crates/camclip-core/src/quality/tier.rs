use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Target frame size for a capture session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

/// Discrete recording quality level.
///
/// Ordered `Low < Medium < High`. Each tier maps to a fixed target
/// resolution and an encoder bitrate band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QualityTier {
    /// 360p.
    Low,
    /// 720p.
    Medium,
    /// 1080p.
    High,
}

impl QualityTier {
    /// All tiers in ascending order.
    pub const ALL: [QualityTier; 3] = [QualityTier::Low, QualityTier::Medium, QualityTier::High];

    /// Ideal capture resolution for this tier.
    pub fn resolution(self) -> Resolution {
        match self {
            QualityTier::Low => Resolution {
                width: 640,
                height: 360,
            },
            QualityTier::Medium => Resolution {
                width: 1280,
                height: 720,
            },
            QualityTier::High => Resolution {
                width: 1920,
                height: 1080,
            },
        }
    }

    /// Target video bitrate in bits per second.
    pub fn bitrate_bps(self) -> u32 {
        match self {
            QualityTier::Low => 1_000_000,
            QualityTier::Medium => 2_500_000,
            QualityTier::High => 5_000_000,
        }
    }

    /// Stable lowercase name, used for persistence and configuration.
    pub fn as_str(self) -> &'static str {
        match self {
            QualityTier::Low => "low",
            QualityTier::Medium => "medium",
            QualityTier::High => "high",
        }
    }

    /// Human-readable label for menus and listings.
    pub fn label(self) -> &'static str {
        match self {
            QualityTier::Low => "360p (Low Quality)",
            QualityTier::Medium => "720p (Medium Quality)",
            QualityTier::High => "1080p (High Quality)",
        }
    }
}

impl fmt::Display for QualityTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a string names no known tier.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown quality tier: {0:?}")]
pub struct UnknownQualityTier(pub String);

impl FromStr for QualityTier {
    type Err = UnknownQualityTier;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(QualityTier::Low),
            "medium" => Ok(QualityTier::Medium),
            "high" => Ok(QualityTier::High),
            _ => Err(UnknownQualityTier(s.to_string())),
        }
    }
}
