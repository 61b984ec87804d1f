//! Layered application configuration.
//!
//! Values are merged with figment, later layers winning:
//!
//! 1. Built-in defaults
//! 2. TOML file (`<config dir>/wechat-dedup/config.toml`, or `--config PATH`)
//! 3. Environment variables prefixed `WECHAT_DEDUP_`
//! 4. Command-line flags
//!
//! ```toml
//! roots = ["/Users/me/Documents/WeChat Files"]
//! extensions = ["pdf", "doc", "docx"]
//! min_size = 1024
//! quarantine_dir = "/Users/me/WeChat-Duplicates"
//! exclude = ["*.tmp"]
//! io_threads = 4
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use directories::ProjectDirs;
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

use crate::duplicates::DEFAULT_IO_THREADS;
use crate::locate;
use crate::pipeline::PipelineConfig;
use crate::scanner::{normalize_extensions, DEFAULT_EXTENSIONS};

/// Prefix of configuration environment variables.
pub const ENV_PREFIX: &str = "WECHAT_DEDUP_";

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directories to scan; empty means the platform's WeChat folders.
    pub roots: Vec<PathBuf>,
    /// Extensions to consider.
    pub extensions: Vec<String>,
    /// Smallest candidate size in bytes.
    pub min_size: u64,
    /// Quarantine directory.
    pub quarantine_dir: PathBuf,
    /// Gitignore-style exclude patterns.
    pub exclude: Vec<String>,
    /// Hashing threads.
    pub io_threads: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            roots: Vec::new(),
            extensions: DEFAULT_EXTENSIONS.iter().map(|e| (*e).to_string()).collect(),
            min_size: 1,
            quarantine_dir: locate::default_quarantine_dir(),
            exclude: Vec::new(),
            io_threads: DEFAULT_IO_THREADS,
        }
    }
}

/// Command-line values; `None` leaves the lower layers in charge.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConfigOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub roots: Option<Vec<PathBuf>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extensions: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_size: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quarantine_dir: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exclude: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub io_threads: Option<usize>,
}

impl Config {
    /// Default platform-specific configuration path.
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "wechat-dedup").map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// The layered figment without command-line values.
    ///
    /// A missing default file is skipped; an explicit `path` must exist.
    pub fn figment(path: Option<&Path>) -> Result<Figment> {
        let mut figment = Figment::from(Serialized::defaults(Config::default()));

        match path {
            Some(path) => {
                if !path.is_file() {
                    anyhow::bail!("Configuration file not found: {}", path.display());
                }
                figment = figment.merge(Toml::file(path));
            }
            None => {
                if let Some(default) = Self::default_path() {
                    figment = figment.merge(Toml::file(default));
                }
            }
        }

        Ok(figment.merge(Env::prefixed(ENV_PREFIX)))
    }

    /// Load every layer, apply `overrides`, and validate.
    ///
    /// # Errors
    ///
    /// Returns an error if a layer cannot be parsed or the result is invalid.
    pub fn load(path: Option<&Path>, overrides: &ConfigOverrides) -> Result<Self> {
        let config: Config = Self::figment(path)?
            .merge(Serialized::defaults(overrides))
            .extract()
            .context("Invalid configuration")?;
        config.validated()
    }

    /// Check ranges and normalize extensions.
    ///
    /// # Errors
    ///
    /// Returns an error if `io_threads` is zero or no extension is left.
    pub fn validated(mut self) -> Result<Self> {
        if self.io_threads == 0 {
            anyhow::bail!("io_threads must be at least 1");
        }

        let extensions = normalize_extensions(&self.extensions);
        if extensions.is_empty() {
            anyhow::bail!("At least one file extension is required");
        }
        self.extensions = extensions.into_iter().collect();
        Ok(self)
    }

    /// Roots to scan: the configured ones, or the platform defaults.
    #[must_use]
    pub fn effective_roots(&self) -> Vec<PathBuf> {
        if self.roots.is_empty() {
            locate::default_roots()
        } else {
            self.roots.clone()
        }
    }

    /// Immutable settings for one pipeline run.
    #[must_use]
    pub fn to_pipeline_config(&self) -> PipelineConfig {
        PipelineConfig::new(self.effective_roots(), self.quarantine_dir.clone())
            .with_extensions(&self.extensions)
            .with_min_size(self.min_size)
            .with_exclude(self.exclude.clone())
            .with_io_threads(self.io_threads)
    }
}
