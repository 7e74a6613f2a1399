pub(crate) mod advisor;
mod tier;

pub use advisor::{
    AdvisorSettings, BandwidthProbe, BandwidthSample, DEFAULT_QUALITY, HIGH_THRESHOLD,
    LOW_THRESHOLD, MEASUREMENT_TIMEOUT, QualityAdvisor, SAMPLE_SIZE, TIMEOUT_FALLBACK_MBPS,
    fallback_quality, recommended_quality,
};
pub use tier::{QualityTier, Resolution, UnknownQualityTier};
