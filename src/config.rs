//! Configuration module for the document synchronization engine.
//!
//! This module provides a layered configuration system that supports:
//! - Default values
//! - TOML configuration file
//! - Environment variable overrides
//!
//! # Environment Variables
//!
//! Environment variables must be prefixed with `DOCSYNC_` and use double
//! underscores to separate nested levels:
//! - `DOCSYNC_WATCHER__DEBOUNCE_MS=100` sets `watcher.debounce_ms`
//! - `DOCSYNC_RENDER__IDLE_MS=200` sets `render.idle_ms`
//! - `DOCSYNC_SAVE__SUPPRESSION_MS=500` sets `save.suppression_ms`

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Settings {
    /// Version of the configuration schema
    #[serde(default = "default_version")]
    pub version: u32,

    /// Filesystem watcher settings
    #[serde(default)]
    pub watcher: WatcherConfig,

    /// Save coordinator settings
    #[serde(default)]
    pub save: SaveConfig,

    /// Change reconciliation settings
    #[serde(default)]
    pub reconcile: ReconcileConfig,

    /// Downstream render notification settings
    #[serde(default)]
    pub render: RenderConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct WatcherConfig {
    /// How long a burst of raw filesystem events must be quiet before a
    /// single changed signal is delivered. One atomic editor save produces
    /// several raw events; this window coalesces them.
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// Capacity of the raw event channel between the OS notification
    /// thread and the debounce task.
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SaveConfig {
    /// Suppression window after a successful save. Sized to cover the
    /// watcher debounce latency plus a safety margin so the echo of our
    /// own write is ignored.
    #[serde(default = "default_suppression_ms")]
    pub suppression_ms: u64,

    /// Shorter suppression window armed after a failed save, so a
    /// partially completed write cannot trigger a spurious reload cycle.
    #[serde(default = "default_failed_suppression_ms")]
    pub failed_suppression_ms: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ReconcileConfig {
    /// How many times a failed read is retried before giving up.
    /// External writers briefly hold the file unreadable mid-write.
    #[serde(default = "default_max_read_retries")]
    pub max_read_retries: u32,

    /// Backoff between read retries, in milliseconds.
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct RenderConfig {
    /// Trailing-edge idle period after the last version increment before
    /// subscribers are notified. Bursts of rapid edits coalesce into one
    /// notification carrying only the latest content.
    #[serde(default = "default_render_idle_ms")]
    pub idle_ms: u64,

    /// Capacity of the broadcast channels carrying change and warning
    /// events to subscribers.
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    /// Default log level: error, warn, info, debug, trace
    #[serde(default = "default_log_level")]
    pub default: String,

    /// Per-module level overrides, e.g. `watcher = "debug"`
    #[serde(default)]
    pub modules: HashMap<String, String>,
}

// Default value functions
fn default_version() -> u32 {
    1
}
fn default_debounce_ms() -> u64 {
    50
}
fn default_channel_capacity() -> usize {
    64
}
fn default_suppression_ms() -> u64 {
    300
}
fn default_failed_suppression_ms() -> u64 {
    100
}
fn default_max_read_retries() -> u32 {
    3
}
fn default_retry_backoff_ms() -> u64 {
    20
}
fn default_render_idle_ms() -> u64 {
    150
}
fn default_event_capacity() -> usize {
    64
}
fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: default_version(),
            watcher: WatcherConfig::default(),
            save: SaveConfig::default(),
            reconcile: ReconcileConfig::default(),
            render: RenderConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
            channel_capacity: default_channel_capacity(),
        }
    }
}

impl Default for SaveConfig {
    fn default() -> Self {
        Self {
            suppression_ms: default_suppression_ms(),
            failed_suppression_ms: default_failed_suppression_ms(),
        }
    }
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            max_read_retries: default_max_read_retries(),
            retry_backoff_ms: default_retry_backoff_ms(),
        }
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            idle_ms: default_render_idle_ms(),
            event_capacity: default_event_capacity(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            default: default_log_level(),
            modules: HashMap::new(),
        }
    }
}

impl Settings {
    /// Load configuration from all sources
    pub fn load() -> Result<Self, Box<figment::Error>> {
        let config_path =
            Self::find_workspace_config().unwrap_or_else(|| PathBuf::from(".docsync/settings.toml"));

        Figment::new()
            // Start with defaults
            .merge(Serialized::defaults(Settings::default()))
            // Layer in config file if it exists
            .merge(Toml::file(config_path))
            // Layer in environment variables with DOCSYNC_ prefix.
            // Double underscore separates nested levels; single underscores
            // remain as-is within field names.
            .merge(Env::prefixed("DOCSYNC_").map(|key| {
                key.as_str().to_lowercase().replace("__", ".").into()
            }))
            .extract()
            .map_err(Box::new)
    }

    /// Find the workspace config by looking for a .docsync directory,
    /// searching from the current directory up to root.
    fn find_workspace_config() -> Option<PathBuf> {
        let current = std::env::current_dir().ok()?;

        for ancestor in current.ancestors() {
            let config_dir = ancestor.join(".docsync");
            if config_dir.exists() && config_dir.is_dir() {
                return Some(config_dir.join("settings.toml"));
            }
        }

        None
    }

    /// Load configuration from a specific file
    pub fn load_from(path: impl AsRef<std::path::Path>) -> Result<Self, Box<figment::Error>> {
        Figment::new()
            .merge(Serialized::defaults(Settings::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed("DOCSYNC_").map(|key| {
                key.as_str().to_lowercase().replace("__", ".").into()
            }))
            .extract()
            .map_err(Box::new)
    }

    /// Save current configuration to file
    pub fn save(&self, path: impl AsRef<std::path::Path>) -> Result<(), Box<dyn std::error::Error>> {
        let parent = path.as_ref().parent().ok_or("Invalid path")?;
        std::fs::create_dir_all(parent)?;

        let toml_string = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_string)?;

        Ok(())
    }

    /// Create a default settings file
    pub fn init_config_file(force: bool) -> Result<PathBuf, Box<dyn std::error::Error>> {
        let config_path = PathBuf::from(".docsync/settings.toml");

        if !force && config_path.exists() {
            return Err("Configuration file already exists. Use --force to overwrite".into());
        }

        let settings = Settings::default();
        settings.save(&config_path)?;

        if force {
            println!("Overwrote configuration at: {}", config_path.display());
        } else {
            println!("Created default configuration at: {}", config_path.display());
        }

        Ok(config_path)
    }
}
