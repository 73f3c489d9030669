//! Application configuration.
//!
//! Configuration is loaded from a TOML file at:
//! 1. `$MOMOCHECK_CONFIG` (environment variable)
//! 2. `~/.config/momocheck/config.toml` (Linux/macOS)
//!    `%APPDATA%\momocheck\config.toml` (Windows)
//! 3. Built-in defaults

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::search::SearchWindow;
use crate::store::{file::FileCache, memory::MemoryCache, TransactionCache};

/// Sender address of MoMo payment notifications.
pub const MOMO_SENDER: &str = "no-reply@momo.vn";

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General behavior settings.
    pub general: GeneralConfig,
    /// Search window defaults.
    pub search: SearchConfig,
    /// Transaction cache settings.
    pub cache: CacheConfig,
}

/// General behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Override cache directory for transactions and logs.
    pub cache_dir: Option<PathBuf>,
    /// Log level: "error", "warn", "info", "debug", "trace".
    pub log_level: String,
}

/// Search window defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Only messages from this address are considered notifications.
    pub sender: String,
    /// Message ids requested per listing page.
    pub page_size: u32,
    /// Maximum number of listing pages walked by one search.
    pub max_pages: u32,
}

/// Which [`TransactionCache`] implementation to build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    /// One JSON file per message id under hashed bucket directories.
    File,
    /// Process-local map; nothing survives the run.
    Memory,
}

/// Transaction cache settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Backend selection.
    pub backend: CacheBackend,
    /// Entries kept in memory after a `preload` hint (file backend only).
    pub preload_capacity: usize,
}

// ── Default implementations ─────────────────────────────────────

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            cache_dir: None,
            log_level: "warn".to_string(),
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            sender: MOMO_SENDER.to_string(),
            page_size: 100,
            max_pages: 2,
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend: CacheBackend::File,
            preload_capacity: 500,
        }
    }
}

impl SearchConfig {
    /// Build the search window described by this section.
    pub fn window(&self) -> SearchWindow {
        SearchWindow {
            sender: Some(self.sender.clone()),
            page_size: self.page_size,
            max_pages: self.max_pages,
        }
    }
}

// ── Load / save ─────────────────────────────────────────────────

/// Load configuration, searching standard locations.
///
/// Returns the default configuration if no file is found or on parse error.
pub fn load_config() -> Config {
    if let Some(path) = config_file_path() {
        if path.exists() {
            match std::fs::read_to_string(&path) {
                Ok(contents) => match toml::from_str::<Config>(&contents) {
                    Ok(cfg) => {
                        tracing::info!(path = %path.display(), "Loaded config");
                        return cfg;
                    }
                    Err(e) => {
                        tracing::warn!(
                            path = %path.display(),
                            error = %e,
                            "Failed to parse config, using defaults"
                        );
                    }
                },
                Err(e) => {
                    tracing::warn!(
                        path = %path.display(),
                        error = %e,
                        "Failed to read config file, using defaults"
                    );
                }
            }
        }
    }
    Config::default()
}

/// Save configuration to the standard location.
pub fn save_config(config: &Config) -> anyhow::Result<()> {
    let path = config_file_path()
        .ok_or_else(|| anyhow::anyhow!("Could not determine config file path"))?;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let contents = toml::to_string_pretty(config)?;
    std::fs::write(&path, contents)?;
    tracing::info!(path = %path.display(), "Saved config");
    Ok(())
}

/// Determine the config file path (checking env var first, then standard dirs).
pub fn config_file_path() -> Option<PathBuf> {
    if let Ok(env_path) = std::env::var("MOMOCHECK_CONFIG") {
        return Some(PathBuf::from(env_path));
    }

    dirs::config_dir().map(|d| d.join("momocheck").join("config.toml"))
}

/// Return the base cache directory (logs live here, transactions below it).
pub fn cache_dir(config: &Config) -> PathBuf {
    if let Some(ref dir) = config.general.cache_dir {
        return dir.clone();
    }
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("momocheck")
}

/// Directory holding the file-backed transaction cache.
pub fn transactions_dir(config: &Config) -> PathBuf {
    cache_dir(config).join("transactions")
}

/// Return the log file path.
pub fn log_file_path(config: &Config) -> PathBuf {
    cache_dir(config).join("momocheck.log")
}

/// Build the configured cache backend.
pub fn open_cache(config: &Config) -> Box<dyn TransactionCache> {
    match config.cache.backend {
        CacheBackend::File => Box::new(
            FileCache::new(transactions_dir(config))
                .with_preload_capacity(config.cache.preload_capacity),
        ),
        CacheBackend::Memory => Box::new(MemoryCache::new()),
    }
}
