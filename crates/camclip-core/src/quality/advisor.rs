use crate::{QualityError, quality::QualityTier};

use std::{panic::Location, time::Duration};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use error_location::ErrorLocation;
use reqwest::{Client, Response, StatusCode, header::RANGE};
use tracing::{debug, info, instrument, warn};

/// Bytes downloaded for one measurement (2 MiB).
pub const SAMPLE_SIZE: u64 = 2 * 1024 * 1024;

/// Hard upper bound on one measurement, pre-check included.
pub const MEASUREMENT_TIMEOUT: Duration = Duration::from_secs(10);

/// Below this many Mbps the recommendation is [`QualityTier::Low`].
pub const LOW_THRESHOLD: f64 = 2.0;

/// At or above this many Mbps the recommendation is [`QualityTier::High`].
pub const HIGH_THRESHOLD: f64 = 5.0;

/// Throughput assumed when a measurement times out: just under the
/// LOW/MEDIUM boundary.
pub const TIMEOUT_FALLBACK_MBPS: f64 = LOW_THRESHOLD - 0.1;

/// Tier used whenever no measurement is available.
pub const DEFAULT_QUALITY: QualityTier = QualityTier::Medium;

/// One measured throughput value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BandwidthSample {
    /// Measured throughput in megabits per second.
    pub mbps: f64,
    /// When the measurement completed.
    pub measured_at: DateTime<Utc>,
}

impl BandwidthSample {
    /// Sample stamped with the current time.
    pub fn now(mbps: f64) -> Self {
        Self {
            mbps,
            measured_at: Utc::now(),
        }
    }
}

/// Map a throughput to a quality tier.
///
/// `mbps < 2` is Low, `2 <= mbps < 5` is Medium and `mbps >= 5` is High.
/// Exactly 5 resolves to High. NaN and non-positive inputs resolve to Low.
pub fn recommended_quality(mbps: f64) -> QualityTier {
    if mbps.is_nan() || mbps < LOW_THRESHOLD {
        QualityTier::Low
    } else if mbps < HIGH_THRESHOLD {
        QualityTier::Medium
    } else {
        QualityTier::High
    }
}

/// Tier to use when a measurement failed.
pub fn fallback_quality(error: &QualityError) -> QualityTier {
    match error {
        QualityError::MeasurementTimeout { .. } => recommended_quality(TIMEOUT_FALLBACK_MBPS),
        QualityError::MeasurementUnavailable { .. } | QualityError::MeasurementError { .. } => {
            DEFAULT_QUALITY
        }
    }
}

/// Source of bandwidth measurements for the recorder.
#[async_trait]
pub trait BandwidthProbe: Send + Sync {
    /// Measure achievable download throughput.
    async fn measure(&self) -> Result<BandwidthSample, QualityError>;
}

/// Settings for [`QualityAdvisor`].
#[derive(Debug, Clone)]
pub struct AdvisorSettings {
    /// URL of the static reference payload.
    pub probe_url: String,
    /// Bytes counted towards one measurement.
    pub sample_size: u64,
    /// Upper bound for the whole measurement.
    pub timeout: Duration,
}

impl AdvisorSettings {
    /// Default settings for the given reference payload.
    pub fn new(probe_url: impl Into<String>) -> Self {
        Self {
            probe_url: probe_url.into(),
            sample_size: SAMPLE_SIZE,
            timeout: MEASUREMENT_TIMEOUT,
        }
    }
}

/// Measures download throughput against a reference payload over HTTP.
pub struct QualityAdvisor {
    client: Client,
    settings: AdvisorSettings,
}

impl QualityAdvisor {
    /// Create an advisor for the given settings.
    pub fn new(settings: AdvisorSettings) -> Self {
        Self {
            client: Client::new(),
            settings,
        }
    }

    /// Download a bounded sample of the reference payload and return Mbps.
    ///
    /// The reachability check, the download and any full-payload fallback
    /// all race a single timeout. Bytes beyond the sample size never count
    /// towards the result.
    ///
    /// # Errors
    ///
    /// `MeasurementTimeout` when the timeout elapses, `MeasurementUnavailable`
    /// when the payload is unreachable or answers with a non-success status,
    /// `MeasurementError` for any other transport failure.
    #[instrument(skip(self), fields(url = %self.settings.probe_url))]
    pub async fn measure_bandwidth(&self) -> Result<f64, QualityError> {
        let started = tokio::time::Instant::now();

        let bytes = match tokio::time::timeout(self.settings.timeout, self.download_sample()).await
        {
            Ok(result) => result?,
            Err(_) => {
                warn!("Bandwidth measurement timed out");
                return Err(QualityError::MeasurementTimeout {
                    location: ErrorLocation::from(Location::caller()),
                });
            }
        };

        let seconds = started.elapsed().as_secs_f64().max(f64::EPSILON);
        let mbps = throughput_mbps(bytes, seconds);

        if mbps <= 0.0 {
            return Err(QualityError::MeasurementError {
                reason: "invalid connection speed value".to_string(),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        info!(mbps, bytes, seconds, "Measured bandwidth");

        Ok(mbps)
    }

    /// Tier for a measured throughput.
    pub fn recommended_quality(&self, mbps: f64) -> QualityTier {
        recommended_quality(mbps)
    }

    async fn download_sample(&self) -> Result<u64, QualityError> {
        let url = self.settings.probe_url.as_str();
        let limit = self.settings.sample_size;

        let head = self.client.head(url).send().await.map_err(transport_error)?;
        if !head.status().is_success() {
            return Err(QualityError::MeasurementUnavailable {
                reason: format!("HEAD returned {}", head.status()),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        let ranged = self
            .client
            .get(url)
            .header(RANGE, format!("bytes=0-{}", limit.saturating_sub(1)))
            .send()
            .await
            .map_err(transport_error)?;

        let response = match ranged.status() {
            StatusCode::PARTIAL_CONTENT => ranged,
            status if status.is_success() => {
                debug!(status = %status, "Range ignored, counting only the sample prefix");
                ranged
            }
            status => {
                warn!(
                    status = %status,
                    "Server does not support range requests, falling back to full download"
                );
                let full = self.client.get(url).send().await.map_err(transport_error)?;
                if !full.status().is_success() {
                    return Err(QualityError::MeasurementUnavailable {
                        reason: format!("GET returned {}", full.status()),
                        location: ErrorLocation::from(Location::caller()),
                    });
                }
                full
            }
        };

        read_bounded(response, limit).await
    }
}

#[async_trait]
impl BandwidthProbe for QualityAdvisor {
    async fn measure(&self) -> Result<BandwidthSample, QualityError> {
        self.measure_bandwidth().await.map(BandwidthSample::now)
    }
}

/// `bits / seconds / 1_000_000`.
pub(crate) fn throughput_mbps(bytes: u64, seconds: f64) -> f64 {
    (bytes as f64 * 8.0) / seconds / 1_000_000.0
}

/// Read at most `limit` bytes of the body, returning the count.
pub(crate) async fn read_bounded(mut response: Response, limit: u64) -> Result<u64, QualityError> {
    let mut received: u64 = 0;

    while let Some(chunk) = response.chunk().await.map_err(transport_error)? {
        received += chunk.len() as u64;
        if received >= limit {
            break;
        }
    }

    Ok(received.min(limit))
}

#[track_caller]
fn transport_error(e: reqwest::Error) -> QualityError {
    let location = ErrorLocation::from(Location::caller());

    if e.is_timeout() {
        QualityError::MeasurementTimeout { location }
    } else if e.is_connect() || e.is_status() {
        QualityError::MeasurementUnavailable {
            reason: e.to_string(),
            location,
        }
    } else {
        QualityError::MeasurementError {
            reason: e.to_string(),
            location,
        }
    }
}
