//! Configuration module for the asset sync tool

use serde::Deserialize;
use config::{Config, ConfigBuilder, ConfigError, Environment, File, builder::DefaultState};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors raised while loading or validating settings
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Missing required configuration value: {0}")]
    Missing(&'static str),

    #[error("Invalid storage URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Failed to load configuration: {0}")]
    Load(#[from] ConfigError),
}

/// Main application settings
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub storage: StorageSettings,
    pub media: MediaSettings,
    pub sync: SyncSettings,
}

/// Object storage endpoint and credentials
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    /// Storage API base, e.g. `https://<project>.supabase.co/storage/v1`
    pub url: String,
    /// Bearer token sent with every upload
    pub token: String,
    pub audio_bucket: String,
    pub image_bucket: String,
}

/// Public media repository the audio clips are mirrored from
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MediaSettings {
    pub host: String,
    pub collection: String,
    /// Some media hosts reject default client identifiers
    pub user_agent: String,
    pub timeout_secs: u64,
    /// Bodies at or below this size are treated as error pages
    pub min_body_bytes: usize,
}

/// Batch behaviour
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SyncSettings {
    pub scratch_dir: PathBuf,
    /// Root that relative image paths are resolved against
    pub image_root: PathBuf,
    pub audio_delay_ms: u64,
    pub image_delay_ms: u64,
}

impl Default for StorageSettings {
    fn default() -> Self {
        StorageSettings {
            url: String::new(),
            token: String::new(),
            audio_bucket: "phonetics-audio".to_string(),
            image_bucket: "phonetics-images".to_string(),
        }
    }
}

impl Default for MediaSettings {
    fn default() -> Self {
        MediaSettings {
            host: "https://upload.wikimedia.org".to_string(),
            collection: "wikipedia/commons".to_string(),
            user_agent: "Mozilla/5.0".to_string(),
            timeout_secs: 30,
            min_body_bytes: 1000,
        }
    }
}

impl Default for SyncSettings {
    fn default() -> Self {
        SyncSettings {
            scratch_dir: PathBuf::from("temp/audio"),
            image_root: PathBuf::from("."),
            audio_delay_ms: 500,
            image_delay_ms: 0,
        }
    }
}

impl Settings {
    /// Load configuration from files and environment variables
    ///
    /// Configuration priority (highest to lowest):
    /// 1. Environment variables (PHONETIC_SYNC__STORAGE__URL, etc.)
    /// 2. config/local.toml (gitignored)
    /// 3. config/default.toml
    ///
    /// `SUPABASE_URL` and `SUPABASE_ANON_KEY` fill in the storage credentials
    /// when the prefixed variables are not set.
    pub fn load() -> Result<Self, SettingsError> {
        let config_dir = std::env::var("CONFIG_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("config"));

        let mut settings: Settings = file_sources(&config_dir)
            .add_source(
                Environment::with_prefix("PHONETIC_SYNC")
                    .separator("__")
                    .try_parsing(true)
            )
            .build()?
            .try_deserialize()?;

        settings.apply_legacy_env(|name| std::env::var(name).ok());
        Ok(settings)
    }

    /// Fill empty storage credentials from the unprefixed variable names
    pub fn apply_legacy_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if self.storage.url.is_empty() {
            if let Some(url) = lookup("SUPABASE_URL") {
                self.storage.url = url;
            }
        }
        if self.storage.token.is_empty() {
            if let Some(token) = lookup("SUPABASE_ANON_KEY") {
                self.storage.token = token;
            }
        }
    }

    /// Startup guard: both storage values must be present before any work runs.
    ///
    /// A bare project URL is expanded to its storage API base.
    pub fn validate(mut self) -> Result<Self, SettingsError> {
        if self.storage.url.trim().is_empty() {
            return Err(SettingsError::Missing("SUPABASE_URL"));
        }
        if self.storage.token.trim().is_empty() {
            return Err(SettingsError::Missing("SUPABASE_ANON_KEY"));
        }

        self.storage.url = normalize_storage_url(self.storage.url.trim())?;
        Ok(self)
    }
}

fn file_sources(config_dir: &Path) -> ConfigBuilder<DefaultState> {
    Config::builder()
        .add_source(File::from(config_dir.join("default.toml")).required(false))
        .add_source(File::from(config_dir.join("local.toml")).required(false))
}

fn normalize_storage_url(raw: &str) -> Result<String, SettingsError> {
    let parsed = url::Url::parse(raw).map_err(|e| SettingsError::InvalidUrl {
        url: raw.to_string(),
        reason: e.to_string(),
    })?;

    let base = raw.trim_end_matches('/');
    if parsed.path().trim_matches('/').is_empty() {
        Ok(format!("{}/storage/v1", base))
    } else {
        Ok(base.to_string())
    }
}
