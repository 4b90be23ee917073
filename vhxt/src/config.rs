//! Configuration module for the vhxt CLI.
//!
//! Settings are read from `vhxt.toml`. Every field has a default, so a
//! partial file only overrides what it names.

use dirs::{config_dir, home_dir};
use num_cpus::get as get_num_cpus;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use vhx_rt::VhConfig;

use crate::error::{Result, VhxtError};

/// Default configuration file name.
pub const CONFIG_FILE_NAME: &str = "vhxt.toml";

/// Fallback thread count for `stress` when the CPU count does not fit.
const DEFAULT_THREAD_COUNT: u32 = 4;

/// Application configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    /// Global verbose setting.
    #[serde(default)]
    pub verbose: bool,

    /// Settings handed to the runtime.
    #[serde(default)]
    pub runtime: RuntimeConfig,

    /// Stress-specific configuration.
    #[serde(default)]
    pub stress: StressConfig,

    /// Leak-specific configuration.
    #[serde(default)]
    pub leak: LeakConfig,
}

/// Runtime tuning, mirrored onto [`VhConfig`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RuntimeConfig {
    /// Slots per dispatch site (power of two).
    #[serde(default = "default_site_capacity")]
    pub site_cache_capacity: usize,

    /// Attempts of a retrying weak compare-and-set.
    #[serde(default = "default_weak_cas_attempts")]
    pub weak_cas_max_attempts: u32,

    /// Reclamation attempts made by the leak probe.
    #[serde(default = "default_reclaim_attempts")]
    pub reclaim_attempts: u32,

    /// Pause between reclamation attempts, in milliseconds.
    #[serde(default = "default_reclaim_interval_ms")]
    pub reclaim_interval_ms: u64,
}

/// Stress-specific configuration options.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StressConfig {
    /// Number of worker threads.
    #[serde(default = "default_threads")]
    pub threads: u32,

    /// Accesses made by each thread.
    #[serde(default = "default_iterations")]
    pub iterations: u32,
}

/// Leak-specific configuration options.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LeakConfig {
    /// Loaders defined and dropped per run.
    #[serde(default = "default_rounds")]
    pub rounds: u32,
}

fn default_site_capacity() -> usize {
    vhx_rt::config::DEFAULT_SITE_CAPACITY
}

fn default_weak_cas_attempts() -> u32 {
    VhConfig::default().weak_cas_max_attempts
}

fn default_reclaim_attempts() -> u32 {
    VhConfig::default().reclaim_attempts
}

fn default_reclaim_interval_ms() -> u64 {
    VhConfig::default().reclaim_interval_ms
}

fn default_threads() -> u32 {
    get_num_cpus().try_into().unwrap_or(DEFAULT_THREAD_COUNT)
}

fn default_iterations() -> u32 {
    10_000
}

fn default_rounds() -> u32 {
    8
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            site_cache_capacity: default_site_capacity(),
            weak_cas_max_attempts: default_weak_cas_attempts(),
            reclaim_attempts: default_reclaim_attempts(),
            reclaim_interval_ms: default_reclaim_interval_ms(),
        }
    }
}

impl Default for StressConfig {
    fn default() -> Self {
        Self {
            threads: default_threads(),
            iterations: default_iterations(),
        }
    }
}

impl Default for LeakConfig {
    fn default() -> Self {
        Self {
            rounds: default_rounds(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            verbose: false,
            runtime: RuntimeConfig::default(),
            stress: StressConfig::default(),
            leak: LeakConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from the default location.
    ///
    /// Searches the current directory, then `~/.config/vhxt`, then the
    /// system configuration directory. Returns the defaults if no file
    /// is found.
    pub fn load() -> Result<Self> {
        match Self::find_config_file() {
            Some(path) => Self::load_from_path(&path),
            None => Ok(Self::default()),
        }
    }

    /// Load configuration from a specific path.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(VhxtError::Config(format!(
                "Configuration file not found: {}",
                path.display()
            )));
        }

        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content)
            .map_err(|e| VhxtError::Config(format!("Failed to parse configuration: {}", e)))
    }

    /// Save configuration to a specific path.
    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self).map_err(|e| {
            VhxtError::Config(format!("Failed to serialize configuration: {}", e))
        })?;

        std::fs::write(path, content)?;
        Ok(())
    }

    /// Build the runtime configuration.
    ///
    /// The result is validated, so a bad site capacity in the file is
    /// reported here rather than when the first site is created.
    pub fn vh_config(&self, verbose: bool) -> Result<VhConfig> {
        let config = VhConfig {
            site_cache_capacity: self.runtime.site_cache_capacity,
            weak_cas_max_attempts: self.runtime.weak_cas_max_attempts,
            reclaim_attempts: self.runtime.reclaim_attempts,
            reclaim_interval_ms: self.runtime.reclaim_interval_ms,
            verbose: verbose || self.verbose,
            ..VhConfig::default()
        };
        config
            .validate()
            .map_err(|e| VhxtError::Config(e.to_string()))?;
        Ok(config)
    }

    fn check_current_dir_config() -> Option<PathBuf> {
        let path = PathBuf::from(CONFIG_FILE_NAME);
        path.exists().then_some(path)
    }

    fn check_home_config() -> Option<PathBuf> {
        home_dir()
            .map(|dir| dir.join(".config").join("vhxt").join(CONFIG_FILE_NAME))
            .filter(|path| path.exists())
    }

    fn check_system_config() -> Option<PathBuf> {
        config_dir()
            .map(|dir| dir.join("vhxt").join(CONFIG_FILE_NAME))
            .filter(|path| path.exists())
    }

    fn find_config_file() -> Option<PathBuf> {
        Self::check_current_dir_config()
            .or_else(Self::check_home_config)
            .or_else(Self::check_system_config)
    }
}
