use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::cache::memory::DEFAULT_MAX_ENTRIES;

/// Smallest per-thread memory budget tantivy accepts for an index writer.
pub const MIN_WRITER_MEMORY_BYTES: usize = 15_000_000;

/// One week.
pub const MAX_CACHE_TTL_SECONDS: u64 = 7 * 24 * 60 * 60;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub general: GeneralConfig,

    pub server: ServerConfig,

    pub cache: CacheConfig,

    pub search_index: SearchIndexConfig,

    pub sync: SyncConfig,

    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Primary store connection string.
    pub database_path: String,

    pub log_level: String,

    /// Number of tokio worker threads (default: 2)
    /// Set to 0 to use the number of CPU cores
    pub worker_threads: usize,

    pub max_db_connections: u32,

    pub min_db_connections: u32,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            database_path: "sqlite:data/agrigrant.db".to_string(),
            log_level: "info".to_string(),
            worker_threads: 2,
            max_db_connections: 5,
            min_db_connections: 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub enabled: bool,

    pub port: u16,

    pub cors_allowed_origins: Vec<String>,

    /// Deadline for each dependency check behind `/health`.
    pub health_timeout_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            port: 5000,
            cors_allowed_origins: vec![
                "http://localhost:3000".to_string(),
                "http://127.0.0.1:3000".to_string(),
            ],
            health_timeout_ms: 2000,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheBackend {
    Memory,
    Database,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub backend: CacheBackend,

    /// Connection string for the `database` backend. Kept apart from the
    /// primary store so cache load never competes with it.
    pub database_url: String,

    /// TTL for farmer and grant listings.
    pub search_ttl_seconds: u64,

    /// TTL for autocomplete and suggestion lookups.
    pub suggestion_ttl_seconds: u64,

    /// Key bound for the `memory` backend.
    pub max_entries: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend: CacheBackend::Memory,
            database_url: "sqlite:data/agrigrant-cache.db".to_string(),
            search_ttl_seconds: 300,
            suggestion_ttl_seconds: 600,
            max_entries: DEFAULT_MAX_ENTRIES,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchIndexConfig {
    pub enabled: bool,

    /// Index directory. Unset keeps the index in memory, rebuilt by resync.
    pub path: Option<PathBuf>,

    pub writer_memory_bytes: usize,

    /// Maximum autocomplete options per request.
    pub completion_limit: u64,
}

impl Default for SearchIndexConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: Some(PathBuf::from("data/search-index")),
            writer_memory_bytes: 50_000_000,
            completion_limit: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    pub enabled: bool,

    pub interval_minutes: u32,

    /// Takes precedence over `interval_minutes` when set.
    pub cron_expression: Option<String>,

    pub run_on_startup: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_minutes: 15,
            cron_expression: None,
            run_on_startup: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    pub metrics_enabled: bool,

    pub loki_enabled: bool,

    pub loki_url: String,

    pub loki_labels: std::collections::HashMap<String, String>,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        let mut labels = std::collections::HashMap::new();
        labels.insert("app".to_string(), "agrigrant".to_string());

        Self {
            metrics_enabled: true,
            loki_enabled: false,
            loki_url: "http://localhost:3100".to_string(),
            loki_labels: labels,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let paths = Self::config_paths();

        for path in &paths {
            if path.exists() {
                info!("Loading config from: {}", path.display());
                return Self::load_from_path(path);
            }
        }

        info!("No config file found, using defaults");
        Ok(Self::default())
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;

        info!("Config saved to: {}", path.display());
        Ok(())
    }

    fn config_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from("config.toml")];

        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("agrigrant").join("config.toml"));
        }

        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".agrigrant").join("config.toml"));
        }

        paths
    }

    fn default_config_path() -> PathBuf {
        PathBuf::from("config.toml")
    }

    pub fn create_default_if_missing() -> Result<bool> {
        let path = Self::default_config_path();

        if path.exists() {
            Ok(false)
        } else {
            Self::default().save_to_path(&path)?;
            info!("Created default config file: {}", path.display());
            Ok(true)
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.general.database_path.trim().is_empty() {
            anyhow::bail!("general.database_path cannot be empty");
        }

        if self.cache.search_ttl_seconds == 0 || self.cache.suggestion_ttl_seconds == 0 {
            anyhow::bail!("Cache TTLs must be greater than zero");
        }

        if self.cache.search_ttl_seconds > MAX_CACHE_TTL_SECONDS
            || self.cache.suggestion_ttl_seconds > MAX_CACHE_TTL_SECONDS
        {
            anyhow::bail!("Cache TTLs must be at most {MAX_CACHE_TTL_SECONDS} seconds");
        }

        if self.cache.max_entries == 0 {
            anyhow::bail!("cache.max_entries must be greater than zero");
        }

        if self.cache.backend == CacheBackend::Database
            && self.cache.database_url.trim().is_empty()
        {
            anyhow::bail!("cache.database_url cannot be empty for the database backend");
        }

        if self.search_index.enabled {
            if self.search_index.writer_memory_bytes < MIN_WRITER_MEMORY_BYTES {
                anyhow::bail!(
                    "search_index.writer_memory_bytes must be at least {MIN_WRITER_MEMORY_BYTES}"
                );
            }
            if self.search_index.completion_limit == 0 {
                anyhow::bail!("search_index.completion_limit must be greater than zero");
            }
        }

        if self.sync.enabled
            && self.sync.interval_minutes == 0
            && self.sync.cron_expression.is_none()
        {
            anyhow::bail!("Sync scheduler needs either interval_minutes > 0 or a cron_expression");
        }

        if self.server.health_timeout_ms == 0 {
            anyhow::bail!("server.health_timeout_ms must be greater than zero");
        }

        Ok(())
    }
}
