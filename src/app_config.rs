//! Module for application configuration settings.
//!
//! User configurations may be specified in a configuration file.

use std::path::{Path, PathBuf};
use std::time::Duration;

use secrecy::{ExposeSecret as _, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::onboarding::{self, OnboardingError};

const APP_DIR: &str = "docsort";

fn docsort_data_dir() -> Option<PathBuf> {
    if let Some(path) = dirs::data_dir() {
        return Some(path.join(APP_DIR));
    }

    dirs::home_dir().map(|home| home.join(".local").join("share").join(APP_DIR))
}

fn home_or_tmp() -> PathBuf {
    dirs::home_dir().unwrap_or_else(std::env::temp_dir)
}

fn default_api_url() -> String {
    "https://www.googleapis.com/drive/v3/".to_owned()
}

fn default_upload_url() -> String {
    "https://www.googleapis.com/upload/drive/v3/".to_owned()
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_cache_path() -> PathBuf {
    docsort_data_dir().map_or_else(
        || PathBuf::from("/tmp/docsort/folder-cache.json"),
        |dir| dir.join("folder-cache.json"),
    )
}

fn default_persist() -> bool {
    true
}

fn default_probe_concurrency() -> usize {
    docsort::resolve::DEFAULT_PROBE_CONCURRENCY
}

fn default_root_folder() -> String {
    "IZVODI".to_owned()
}

fn default_downloads_dir() -> PathBuf {
    dirs::download_dir().unwrap_or_else(|| home_or_tmp().join("Downloads"))
}

fn default_archive_dir() -> PathBuf {
    dirs::document_dir()
        .unwrap_or_else(|| home_or_tmp().join("Documents"))
        .join("IZVODI")
}

fn default_file_pattern() -> String {
    crate::mover::DEFAULT_PATTERN.to_owned()
}

fn default_suffix() -> String {
    crate::mover::DEFAULT_SUFFIX.to_owned()
}

fn serialize_secret<S>(_secret: &SecretString, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_str("****")
}

/// Remote drive configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct DriveConfig {
    /// OAuth access token sent as a bearer token.
    #[serde(serialize_with = "serialize_secret")]
    pub access_token: SecretString,

    /// Base URL of the metadata API.
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Base URL of the upload API.
    #[serde(default = "default_upload_url")]
    pub upload_url: String,

    /// Per-request timeout, in seconds.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl DriveConfig {
    /// The request timeout as a [`Duration`].
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for DriveConfig {
    fn default() -> Self {
        Self {
            access_token: SecretString::from(String::new()),
            api_url: default_api_url(),
            upload_url: default_upload_url(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "kebab-case")]
struct DangerousDriveConfig<'a> {
    pub access_token: &'a str,
    pub api_url: &'a str,
    pub upload_url: &'a str,
    pub request_timeout_secs: u64,
}

impl<'a> From<&'a DriveConfig> for DangerousDriveConfig<'a> {
    fn from(drive: &'a DriveConfig) -> Self {
        Self {
            access_token: drive.access_token.expose_secret(),
            api_url: &drive.api_url,
            upload_url: &drive.upload_url,
            request_timeout_secs: drive.request_timeout_secs,
        }
    }
}

/// The folder cache configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CacheConfig {
    /// The path to the JSON cache file.
    #[serde(default = "default_cache_path")]
    pub path: PathBuf,

    /// Whether the cache survives restarts. When off, the cache lives in memory only.
    #[serde(default = "default_persist")]
    pub persist: bool,

    /// How many cached ids are checked against the remote at once during reconciliation.
    #[serde(default = "default_probe_concurrency")]
    pub probe_concurrency: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            path: default_cache_path(),
            persist: default_persist(),
            probe_concurrency: default_probe_concurrency(),
        }
    }
}

/// Where statements are picked up from and where they end up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct OrganiserConfig {
    /// Top-level remote folder every statement is filed under.
    #[serde(default = "default_root_folder")]
    pub root_folder: String,

    /// Directory scanned for new statements.
    #[serde(default = "default_downloads_dir")]
    pub downloads_dir: PathBuf,

    /// Local directory statements are moved into once uploaded.
    #[serde(default = "default_archive_dir")]
    pub archive_dir: PathBuf,

    /// Regular expression a file name must match to be picked up.
    #[serde(default = "default_file_pattern")]
    pub file_pattern: String,

    /// Appended to every renamed statement.
    #[serde(default = "default_suffix")]
    pub suffix: String,
}

impl Default for OrganiserConfig {
    fn default() -> Self {
        Self {
            root_folder: default_root_folder(),
            downloads_dir: default_downloads_dir(),
            archive_dir: default_archive_dir(),
            file_pattern: default_file_pattern(),
            suffix: default_suffix(),
        }
    }
}

/// Application configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    #[serde(default)]
    pub drive: DriveConfig,

    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default)]
    pub organiser: OrganiserConfig,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "kebab-case")]
struct DangerousConfig<'a> {
    pub drive: DangerousDriveConfig<'a>,
    pub cache: &'a CacheConfig,
    pub organiser: &'a OrganiserConfig,
}

impl<'a> From<&'a Config> for DangerousConfig<'a> {
    fn from(config: &'a Config) -> Self {
        Self {
            drive: DangerousDriveConfig::from(&config.drive),
            cache: &config.cache,
            organiser: &config.organiser,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration validation errors: {0:?}")]
    ValidationErrors(Vec<String>),

    #[error("Failed to onboard: {0}")]
    OnboardingError(OnboardingError),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] toml::ser::Error),

    #[error("Deserialization error: {0}")]
    DeserializationError(#[from] toml::de::Error),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Config parent directory does not exist.")]
    NoParentDir,

    #[error("No suitable configuration path found.")]
    NoSuitableConfigPath,
}

impl Config {
    /// Validate the correctness of the configuration.
    ///
    /// Returns:
    /// - `Ok(())` if the configuration is valid.
    /// - `Err(Vec<String>)` containing a list of validation error messages if the configuration
    ///   is invalid.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.drive.access_token.expose_secret().trim().is_empty() {
            errors.push("drive.access-token is empty.".to_owned());
        }

        for (field, url) in [
            ("drive.api-url", &self.drive.api_url),
            ("drive.upload-url", &self.drive.upload_url),
        ] {
            if !(url.starts_with("https://") || url.starts_with("http://")) {
                errors.push(format!("{field} '{url}' is not an http(s) URL."));
            }
        }

        if self.drive.request_timeout_secs == 0 {
            errors.push("drive.request-timeout-secs must be greater than zero.".to_owned());
        }

        if self.cache.persist && self.cache.path.parent().is_none() {
            errors.push(format!(
                "Cache path '{}' has no parent directory.",
                self.cache.path.display()
            ));
        }

        if self.cache.probe_concurrency == 0 {
            errors.push("cache.probe-concurrency must be greater than zero.".to_owned());
        }

        if docsort::resolve::split_segments(&self.organiser.root_folder).len() != 1 {
            errors.push(format!(
                "organiser.root-folder '{}' must be a single folder name.",
                self.organiser.root_folder
            ));
        }

        if let Err(e) = regex::Regex::new(&self.organiser.file_pattern) {
            errors.push(format!("organiser.file-pattern is not a valid regex: {e}"));
        }

        if self.organiser.downloads_dir == self.organiser.archive_dir {
            errors.push("organiser.downloads-dir and organiser.archive-dir must differ.".to_owned());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Returns config file paths in descending priority order.
    /// On macOS, skips `dirs::config_dir()` (resolves to ~/Library/Application Support/).
    fn config_search_paths() -> Vec<PathBuf> {
        let mut paths = Vec::new();

        #[cfg(not(target_os = "macos"))]
        if let Some(xdg) = dirs::config_dir() {
            paths.push(xdg.join(APP_DIR).join("config.toml"));
        }

        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".config").join(APP_DIR).join("config.toml"));
        }

        paths.push(PathBuf::from("/etc/docsort/config.toml"));

        paths
    }

    fn find_config_file() -> Option<PathBuf> {
        Self::config_search_paths().into_iter().find(|p| p.exists())
    }

    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        debug!(path = ?path, "Loading configuration file.");
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Loads configuration from the first found config file, or the external path if given.
    pub fn load(external_config_path: Option<&Path>) -> Option<Result<Self, ConfigError>> {
        if let Some(path) = external_config_path {
            return Some(Self::load_from_file(path));
        }

        Self::find_config_file().map(|path| Self::load_from_file(&path))
    }

    /// Loads config or runs the onboarding wizard if none exists.
    /// Errors if a config file exists but is malformed.
    pub fn load_or_create(external_config_path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(res) = Self::load(external_config_path) {
            let config = res?;
            if let Err(validation_errors) = config.validate() {
                return Err(ConfigError::ValidationErrors(validation_errors));
            }
            debug!("Loaded configuration successfully.");
            return Ok(config);
        }

        let creation_path = match external_config_path {
            Some(path) => path.to_path_buf(),
            None => Self::config_search_paths()
                .into_iter()
                .next()
                .ok_or(ConfigError::NoSuitableConfigPath)?,
        };

        let config = onboarding::run_wizard().map_err(ConfigError::OnboardingError)?;
        config.dangerously_write_to_disk(&creation_path)?;
        info!(path = ?creation_path.display(), "Created configuration file.");
        Ok(config)
    }

    fn dangerously_write_to_disk(&self, path: &Path) -> Result<(), ConfigError> {
        let dangerous_config = DangerousConfig::from(self);
        let toml_str = toml::to_string_pretty(&dangerous_config)?;
        std::fs::create_dir_all(path.parent().ok_or(ConfigError::NoParentDir)?)?;
        std::fs::write(path, toml_str)?;
        Ok(())
    }
}
