//! Configuration management
//!
//! This module handles loading, saving, and migrating the stash configuration file.
//! The configuration file is stored in TOML format at ~/.config/stash/config.toml,
//! or under `$STASH_CONFIG_DIR` when that is set.
//!
//! Changes to schema_version require migration support.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::resolver::{DEFAULT_BUCKET_SUFFIX, DEFAULT_SHARED_BUCKET, ResolverConfig};
use crate::service::ServiceOptions;
use crate::types::{BucketStrategy, DuplicateFileStrategy};

/// Current configuration schema version
pub const SCHEMA_VERSION: u32 = 1;

/// Environment variable overriding the configuration directory
pub const CONFIG_DIR_ENV: &str = "STASH_CONFIG_DIR";

/// Default region for S3 requests and bucket creation
const DEFAULT_REGION: &str = "us-east-1";

/// Default upload size limit in megabytes
const DEFAULT_MAX_FILE_SIZE_MB: u64 = 10;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Schema version for migration support
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,

    /// Storage backend and naming settings
    #[serde(default)]
    pub storage: StorageConfig,
}

/// Storage backend and naming settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Custom S3 endpoint (MinIO, RustFS, ...); AWS when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,

    /// AWS region
    #[serde(default = "default_region")]
    pub region: String,

    /// Access key; the default credential chain is used when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_key: Option<String>,

    /// Secret key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_key: Option<String>,

    /// Use path-style addressing (`endpoint/bucket/key`)
    #[serde(default)]
    pub path_style: bool,

    /// Bucket strategy code: "shared-prefix", "per-client" or "per-client-env"
    #[serde(default = "default_bucket_strategy")]
    pub bucket_strategy: String,

    /// Bucket used by the shared strategy
    #[serde(default = "default_shared_bucket")]
    pub shared_bucket: String,

    /// Suffix for per-client bucket names
    #[serde(default = "default_bucket_suffix")]
    pub bucket_suffix: String,

    /// Duplicate-file strategy code: "overwrite", "uuid", "timestamp", "version" or "reject"
    #[serde(default = "default_duplicate_file_strategy")]
    pub duplicate_file_strategy: String,

    /// Create buckets on first upload
    #[serde(default = "default_true")]
    pub auto_create_buckets: bool,

    /// Upload size limit in megabytes; 0 disables the limit
    #[serde(default = "default_max_file_size_mb")]
    pub max_file_size_mb: u64,

    /// Retry configuration
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry: Option<RetryConfig>,

    /// Timeout configuration
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<TimeoutConfig>,
}

/// Retry configuration for S3 requests
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of attempts, including the first
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Initial backoff duration in milliseconds
    #[serde(default = "default_initial_backoff")]
    pub initial_backoff_ms: u64,

    /// Maximum backoff duration in milliseconds
    #[serde(default = "default_max_backoff")]
    pub max_backoff_ms: u64,
}

/// Timeout configuration for S3 requests
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeoutConfig {
    /// Connection timeout in milliseconds
    #[serde(default = "default_connect_timeout")]
    pub connect_ms: u64,

    /// Read timeout in milliseconds
    #[serde(default = "default_read_timeout")]
    pub read_ms: u64,
}

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

fn default_region() -> String {
    DEFAULT_REGION.to_string()
}

fn default_bucket_strategy() -> String {
    BucketStrategy::SharedWithPrefix.code().to_string()
}

fn default_shared_bucket() -> String {
    DEFAULT_SHARED_BUCKET.to_string()
}

fn default_bucket_suffix() -> String {
    DEFAULT_BUCKET_SUFFIX.to_string()
}

fn default_duplicate_file_strategy() -> String {
    DuplicateFileStrategy::UuidSuffix.code().to_string()
}

fn default_true() -> bool {
    true
}

fn default_max_file_size_mb() -> u64 {
    DEFAULT_MAX_FILE_SIZE_MB
}

fn default_max_attempts() -> u32 {
    3
}

fn default_initial_backoff() -> u64 {
    100
}

fn default_max_backoff() -> u64 {
    10000
}

fn default_connect_timeout() -> u64 {
    5000
}

fn default_read_timeout() -> u64 {
    30000
}

impl Default for Config {
    fn default() -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            storage: StorageConfig::default(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            region: default_region(),
            access_key: None,
            secret_key: None,
            path_style: false,
            bucket_strategy: default_bucket_strategy(),
            shared_bucket: default_shared_bucket(),
            bucket_suffix: default_bucket_suffix(),
            duplicate_file_strategy: default_duplicate_file_strategy(),
            auto_create_buckets: true,
            max_file_size_mb: default_max_file_size_mb(),
            retry: None,
            timeout: None,
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_backoff_ms: default_initial_backoff(),
            max_backoff_ms: default_max_backoff(),
        }
    }
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_ms: default_connect_timeout(),
            read_ms: default_read_timeout(),
        }
    }
}

impl StorageConfig {
    /// Validate connection settings
    pub fn validate(&self) -> Result<()> {
        if let Some(endpoint) = &self.endpoint {
            let url = url::Url::parse(endpoint)?;
            if !matches!(url.scheme(), "http" | "https") {
                return Err(Error::Config(format!(
                    "endpoint scheme must be http or https, got {:?}",
                    url.scheme()
                )));
            }
        }

        if self.region.trim().is_empty() {
            return Err(Error::Config("region cannot be empty".into()));
        }

        if self.access_key.is_some() != self.secret_key.is_some() {
            return Err(Error::Config(
                "access_key and secret_key must be set together".into(),
            ));
        }

        if let Some(retry) = &self.retry
            && retry.max_attempts == 0
        {
            return Err(Error::Config("retry.max_attempts must be at least 1".into()));
        }

        Ok(())
    }

    /// Upload size limit in bytes, `None` when unlimited
    pub fn max_file_size_bytes(&self) -> Option<u64> {
        match self.max_file_size_mb {
            0 => None,
            mb => Some(mb.saturating_mul(1024 * 1024)),
        }
    }
}

impl Config {
    /// Parse the naming settings, failing on unknown strategy codes
    pub fn resolver_config(&self) -> Result<ResolverConfig> {
        let config = ResolverConfig {
            bucket_strategy: self.storage.bucket_strategy.parse()?,
            shared_bucket: self.storage.shared_bucket.clone(),
            bucket_suffix: self.storage.bucket_suffix.clone(),
            duplicate_strategy: self.storage.duplicate_file_strategy.parse()?,
        };
        config.validate()?;
        Ok(config)
    }

    /// Upload behaviour derived from the storage settings
    pub fn service_options(&self) -> ServiceOptions {
        ServiceOptions {
            auto_create_buckets: self.storage.auto_create_buckets,
            max_file_size: self.storage.max_file_size_bytes(),
        }
    }
}

/// Configuration manager handles loading and saving config
#[derive(Debug)]
pub struct ConfigManager {
    config_path: PathBuf,
}

impl ConfigManager {
    /// Create a new ConfigManager with the default config path
    ///
    /// `$STASH_CONFIG_DIR` takes precedence over the platform config directory.
    pub fn new() -> Result<Self> {
        let config_dir = match std::env::var_os(CONFIG_DIR_ENV) {
            Some(dir) if !dir.is_empty() => PathBuf::from(dir),
            _ => dirs::config_dir()
                .ok_or_else(|| Error::Config("Could not determine config directory".into()))?
                .join("stash"),
        };
        Ok(Self::in_dir(&config_dir))
    }

    /// Create a ConfigManager for `config.toml` inside a directory
    pub fn in_dir(dir: &Path) -> Self {
        Self::with_path(dir.join("config.toml"))
    }

    /// Create a ConfigManager with a custom path (useful for testing)
    pub fn with_path(path: PathBuf) -> Self {
        Self { config_path: path }
    }

    /// Get the configuration file path
    pub fn config_path(&self) -> &PathBuf {
        &self.config_path
    }

    /// Load configuration from disk
    ///
    /// If the configuration file doesn't exist, returns a default configuration.
    /// If the schema version doesn't match, attempts migration.
    pub fn load(&self) -> Result<Config> {
        if !self.config_path.exists() {
            tracing::debug!(path = %self.config_path.display(), "No config file, using defaults");
            return Ok(Config::default());
        }

        let content = std::fs::read_to_string(&self.config_path)?;
        let mut config: Config = toml::from_str(&content)?;

        if config.schema_version < SCHEMA_VERSION {
            config = self.migrate(config)?;
        } else if config.schema_version > SCHEMA_VERSION {
            return Err(Error::Config(format!(
                "Configuration file version {} is newer than supported version {}. Please upgrade stash.",
                config.schema_version, SCHEMA_VERSION
            )));
        }

        config.storage.validate()?;
        Ok(config)
    }

    /// Save configuration to disk
    ///
    /// Creates parent directories if they don't exist.
    /// Sets file permissions to 600 (owner read/write only).
    pub fn save(&self, config: &Config) -> Result<()> {
        if let Some(parent) = self.config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(config)?;
        std::fs::write(&self.config_path, content)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let permissions = std::fs::Permissions::from_mode(0o600);
            std::fs::set_permissions(&self.config_path, permissions)?;
        }

        Ok(())
    }

    /// Migrate configuration from older schema version
    fn migrate(&self, mut config: Config) -> Result<Config> {
        // Version 0 files predate the field; their layout is identical to v1.
        tracing::info!(
            from = config.schema_version,
            to = SCHEMA_VERSION,
            "Migrating configuration"
        );
        config.schema_version = SCHEMA_VERSION;
        Ok(config)
    }
}
