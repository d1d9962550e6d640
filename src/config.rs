//! Configuration for watch sessions.
//!
//! Layered settings: defaults, then an optional TOML file, then environment
//! variable overrides.
//!
//! # Environment Variables
//!
//! Variables are prefixed with `VIGIL_` and use double underscores to
//! separate nesting levels:
//! - `VIGIL_WATCHER__CHANNEL_CAPACITY=256` sets `watcher.channel_capacity`
//! - `VIGIL_WATCHER__RECURSIVE=false` sets `watcher.recursive`
//! - `VIGIL_LOGGING__DEFAULT=debug` sets `logging.default`

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Settings {
    /// Version of the configuration schema.
    #[serde(default = "default_version")]
    pub version: u32,

    /// Watcher behavior.
    #[serde(default)]
    pub watcher: WatcherConfig,

    /// Logging levels.
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct WatcherConfig {
    /// Capacity of each watch's event channel. Events beyond it apply
    /// backpressure on the OS notification thread.
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,

    /// Watch directories recursively.
    #[serde(default = "default_true")]
    pub recursive: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    /// Default log level (error, warn, info, debug, trace).
    #[serde(default = "default_log_level")]
    pub default: String,

    /// Per-module level overrides, e.g. `registry = "debug"`.
    #[serde(default)]
    pub modules: HashMap<String, String>,
}

fn default_version() -> u32 {
    1
}
fn default_channel_capacity() -> usize {
    100
}
fn default_true() -> bool {
    true
}
fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: default_version(),
            watcher: WatcherConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            channel_capacity: default_channel_capacity(),
            recursive: default_true(),
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
    /// Load settings: defaults, merged with `config_path` when given, then
    /// `VIGIL_`-prefixed environment variables on top.
    pub fn load(config_path: Option<&Path>) -> Result<Self, figment::Error> {
        let mut figment = Figment::from(Serialized::defaults(Settings::default()));
        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }
        figment.merge(Env::prefixed("VIGIL_").split("__")).extract()
    }
}
