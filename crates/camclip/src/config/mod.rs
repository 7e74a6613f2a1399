mod capture_config;
#[allow(clippy::module_inception)]
mod config;
mod quality_config;
mod server_config;
mod storage_config;

pub(crate) use {
    capture_config::CaptureConfig, config::Config, quality_config::QualityConfig,
    server_config::ServerConfig, storage_config::StorageConfig,
};

use camclip_core::MAX_RECORDING_TIME;

pub(crate) const DEFAULT_PORT: u16 = 7878;
pub(crate) const DEFAULT_PROBE_URL: &str = "https://speed.cloudflare.com/__down?bytes=2097152";

pub(crate) fn default_port() -> u16 {
    DEFAULT_PORT
}

pub(crate) fn default_max_recording_secs() -> u32 {
    MAX_RECORDING_TIME
}

pub(crate) fn default_probe_url() -> String {
    DEFAULT_PROBE_URL.to_string()
}
