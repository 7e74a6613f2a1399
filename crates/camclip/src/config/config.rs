//! Configuration management for camclip.
//!
//! Handles loading and saving TOML configuration files with cross-platform
//! paths, per-section defaults, and atomic write operations.

use crate::{
    AppError, AppResult,
    config::{CaptureConfig, QualityConfig, ServerConfig, StorageConfig},
};

use std::{
    fs,
    io::Write,
    net::{Ipv4Addr, SocketAddr},
    panic::Location,
    path::{Path, PathBuf},
};

use camclip_core::{AdvisorSettings, RecorderSettings};
use directories::ProjectDirs;
use error_location::ErrorLocation;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

const DATABASE_FILE: &str = "videos.sqlite3";

/// Main configuration struct.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Camera and clip length settings.
    #[serde(default)]
    pub capture: CaptureConfig,
    /// Bandwidth probe and manual quality.
    #[serde(default)]
    pub quality: QualityConfig,
    /// Clip database location.
    #[serde(default)]
    pub storage: StorageConfig,
    /// Local playback server.
    #[serde(default)]
    pub server: ServerConfig,
}

impl Config {
    /// Load configuration from disk, creating default if not found.
    #[track_caller]
    #[instrument]
    pub fn load() -> AppResult<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            info!("No config found, creating default");
            let config = Config::default();
            config.save_to(&config_path)?;
            Ok(config)
        }
    }

    /// Parse the configuration stored at `path`.
    ///
    /// Missing sections and fields fall back to their defaults.
    #[track_caller]
    #[instrument]
    pub fn load_from(path: &Path) -> AppResult<Self> {
        let contents = fs::read_to_string(path).map_err(|e| AppError::ConfigError {
            reason: format!("Failed to read config: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })?;

        let config: Config = toml::from_str(&contents).map_err(|e| AppError::ConfigError {
            reason: format!("Failed to parse config: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })?;

        info!(config_path = ?path, "Configuration loaded");

        Ok(config)
    }

    /// Save configuration to its default location.
    #[track_caller]
    #[instrument(skip(self))]
    pub fn save(&self) -> AppResult<()> {
        let config_path = Self::config_path()?;
        self.save_to(&config_path)
    }

    /// Save configuration to `path` using atomic write pattern.
    ///
    /// Writes to a temporary file first, then renames to prevent corruption
    /// if the process crashes during the write.
    #[track_caller]
    #[instrument(skip(self))]
    pub fn save_to(&self, path: &Path) -> AppResult<()> {
        let contents = toml::to_string_pretty(self).map_err(|e| AppError::ConfigError {
            reason: format!("Failed to serialize config: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })?;

        let temp_path = path.with_extension("toml.tmp");

        let mut temp_file = fs::File::create(&temp_path).map_err(|e| AppError::ConfigError {
            reason: format!("Failed to create temp config file: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })?;

        temp_file
            .write_all(contents.as_bytes())
            .map_err(|e| AppError::ConfigError {
                reason: format!("Failed to write temp config file: {}", e),
                location: ErrorLocation::from(Location::caller()),
            })?;

        temp_file.sync_all().map_err(|e| AppError::ConfigError {
            reason: format!("Failed to sync temp config file: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })?;

        fs::rename(&temp_path, path).map_err(|e| AppError::ConfigError {
            reason: format!("Failed to rename temp config to final: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })?;

        info!(config_path = ?path, "Configuration saved (atomic write)");

        Ok(())
    }

    /// Address the playback server binds.
    pub fn server_addr(&self) -> SocketAddr {
        SocketAddr::from((Ipv4Addr::LOCALHOST, self.server.port))
    }

    /// Base URL under which playback locators are minted.
    pub fn blob_base_url(&self) -> String {
        format!("http://127.0.0.1:{}/blob", self.server.port)
    }

    /// Clip database path, defaulting into the platform data directory.
    #[track_caller]
    pub fn database_path(&self) -> AppResult<PathBuf> {
        if let Some(path) = &self.storage.database_path {
            return Ok(path.clone());
        }

        Ok(Self::project_dirs()?.data_dir().join(DATABASE_FILE))
    }

    /// Recorder tunables derived from the `[capture]` section.
    pub fn recorder_settings(&self) -> RecorderSettings {
        RecorderSettings {
            max_duration_secs: self.capture.max_recording_secs,
            preferred_device: self.capture.preferred_device.clone(),
            ..RecorderSettings::default()
        }
    }

    /// Bandwidth probe settings derived from the `[quality]` section.
    pub fn advisor_settings(&self) -> AdvisorSettings {
        AdvisorSettings::new(self.quality.probe_url.clone())
    }

    #[track_caller]
    fn config_path() -> AppResult<PathBuf> {
        let proj_dirs = Self::project_dirs()?;
        let config_dir = proj_dirs.config_dir();

        if !config_dir.exists() {
            fs::create_dir_all(config_dir)?;
            debug!(config_dir = ?config_dir, "Created config directory");
        }

        Ok(config_dir.join("config.toml"))
    }

    #[track_caller]
    fn project_dirs() -> AppResult<ProjectDirs> {
        ProjectDirs::from("com", "camclip", "CamClip").ok_or_else(|| AppError::ConfigError {
            reason: "Failed to get project directories".to_string(),
            location: ErrorLocation::from(Location::caller()),
        })
    }
}
