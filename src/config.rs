//! Layered application configuration.
//!
//! Settings are merged from, lowest to highest priority:
//!
//! 1. Built-in defaults
//! 2. A TOML file (`--config`, or `config.toml` in the platform config dir)
//! 3. `STAGEDUPE_*` environment variables
//! 4. Command-line flags (applied by the caller)
//!
//! ```toml
//! io_threads = 4
//! follow_symlinks = false
//! exclude_checkpoint = true
//! checkpoint = "/var/lib/stagedupe/scan.json"
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use directories::ProjectDirs;
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

/// Environment variable prefix.
pub const ENV_PREFIX: &str = "STAGEDUPE_";

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Hashing workers; 1 hashes sequentially.
    pub io_threads: usize,
    /// Follow symbolic links while walking.
    pub follow_symlinks: bool,
    /// Leave the checkpoint file out of the scan when it lives under the root.
    pub exclude_checkpoint: bool,
    /// Default checkpoint destination.
    pub checkpoint: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            io_threads: 1,
            follow_symlinks: false,
            exclude_checkpoint: false,
            checkpoint: None,
        }
    }
}

impl Config {
    /// Default config file location, if the platform has one.
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("com", "stagedupe", "stagedupe")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// The provider stack for `file` (or the default location).
    ///
    /// A missing file contributes nothing.
    #[must_use]
    pub fn figment(file: Option<&Path>) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Config::default()));

        if let Some(path) = file.map(Path::to_path_buf).or_else(Self::default_path) {
            log::debug!("Config file: {}", path.display());
            figment = figment.merge(Toml::file(path));
        }

        figment.merge(Env::prefixed(ENV_PREFIX))
    }

    /// Load the merged configuration.
    ///
    /// # Errors
    ///
    /// Fails if an explicitly named file does not exist, or if any layer holds
    /// a value of the wrong type.
    pub fn load(file: Option<&Path>) -> Result<Self> {
        if let Some(path) = file {
            if !path.is_file() {
                anyhow::bail!("Config file not found: {}", path.display());
            }
        }

        let config: Self = Self::figment(file)
            .extract()
            .context("Invalid configuration")?;
        log::debug!("Effective config: {:?}", config);
        Ok(config)
    }

    /// Render as TOML.
    ///
    /// # Errors
    ///
    /// Only fails if serialization itself fails.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize configuration")
    }
}
