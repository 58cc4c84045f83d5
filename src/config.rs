use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

/// Application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub server: ServerSettings,
    pub appwrite: AppwriteSettings,
    pub collection: CollectionSettings,
    #[serde(default)]
    pub matching: MatchingSettings,
    #[serde(default)]
    pub proximity: ProximitySettings,
    #[serde(default)]
    pub occupancy: OccupancySettings,
    #[serde(default)]
    pub commit: CommitSettings,
    #[serde(default)]
    pub sync: SyncSettings,
    #[serde(default)]
    pub cache: CacheSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub workers: Option<usize>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppwriteSettings {
    pub endpoint: String,
    pub api_key: String,
    pub project_id: String,
    pub database_id: String,
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CollectionSettings {
    pub requests: String,
    pub donations: String,
    pub asks: String,
    pub shelters: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MatchingSettings {
    #[serde(default = "default_filter_policy")]
    pub filter_policy: String,
    #[serde(default = "default_score_policy")]
    pub score_policy: String,
    #[serde(default = "default_select_policy")]
    pub select_policy: String,
}

impl Default for MatchingSettings {
    fn default() -> Self {
        Self {
            filter_policy: default_filter_policy(),
            score_policy: default_score_policy(),
            select_policy: default_select_policy(),
        }
    }
}

fn default_filter_policy() -> String { "category-match".to_string() }
fn default_score_policy() -> String { "uniform".to_string() }
fn default_select_policy() -> String { "highest-score".to_string() }

#[derive(Debug, Clone, Deserialize)]
pub struct ProximitySettings {
    #[serde(default = "default_distance_decimals")]
    pub distance_decimals: u32,
    #[serde(default = "default_radius_km")]
    pub default_radius_km: f64,
}

impl Default for ProximitySettings {
    fn default() -> Self {
        Self {
            distance_decimals: default_distance_decimals(),
            default_radius_km: default_radius_km(),
        }
    }
}

fn default_distance_decimals() -> u32 { 1 }
fn default_radius_km() -> f64 { 25.0 }

#[derive(Debug, Clone, Deserialize)]
pub struct OccupancySettings {
    #[serde(default = "default_limited_threshold")]
    pub limited_threshold: f64,
}

impl Default for OccupancySettings {
    fn default() -> Self {
        Self {
            limited_threshold: default_limited_threshold(),
        }
    }
}

fn default_limited_threshold() -> f64 { 0.8 }

#[derive(Debug, Clone, Deserialize)]
pub struct CommitSettings {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_backoff_base_ms")]
    pub backoff_base_ms: u64,
}

impl Default for CommitSettings {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            backoff_base_ms: default_backoff_base_ms(),
        }
    }
}

fn default_max_attempts() -> u32 { 3 }
fn default_backoff_base_ms() -> u64 { 50 }

#[derive(Debug, Clone, Deserialize)]
pub struct SyncSettings {
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

fn default_poll_interval_ms() -> u64 { 2000 }

#[derive(Debug, Clone, Deserialize)]
pub struct CacheSettings {
    #[serde(default = "default_cache_entries")]
    pub max_entries: u64,
    #[serde(default = "default_cache_ttl_secs")]
    pub ttl_secs: u64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            max_entries: default_cache_entries(),
            ttl_secs: default_cache_ttl_secs(),
        }
    }
}

fn default_cache_entries() -> u64 { 1000 }
fn default_cache_ttl_secs() -> u64 { 60 }

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_log_level() -> String { "info".to_string() }
fn default_log_format() -> String { "json".to_string() }

impl Settings {
    /// Load configuration from file and environment variables
    ///
    /// Configuration is loaded in the following order (later overrides earlier):
    /// 1. Default values in the struct
    /// 2. Configuration file (config/default.toml)
    /// 3. Local overrides (config/local.toml)
    /// 4. Environment variables (prefixed with RELIEF_)
    pub fn load() -> Result<Self, ConfigError> {
        let settings: Settings = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            // e.g., RELIEF__SERVER__PORT -> server.port
            .add_source(
                Environment::with_prefix("RELIEF")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        settings.validate()?;
        Ok(settings)
    }

    /// Reject values the service cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sync.poll_interval_ms == 0 {
            return Err(ConfigError::Message("sync.poll_interval_ms must be greater than 0".into()));
        }
        if self.commit.max_attempts == 0 {
            return Err(ConfigError::Message("commit.max_attempts must be at least 1".into()));
        }
        let threshold = self.occupancy.limited_threshold;
        if !(threshold > 0.0 && threshold <= 1.0) {
            return Err(ConfigError::Message(format!(
                "occupancy.limited_threshold must be in (0, 1], got {}",
                threshold
            )));
        }
        Ok(())
    }
}
