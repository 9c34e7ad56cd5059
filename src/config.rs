//! Engine configuration management.
//!
//! Configuration is layered with figment, lowest precedence first:
//!
//! 1. Built-in defaults ([`EngineConfig::default`])
//! 2. The first config file found: an explicit `--config` path, else
//!    `./.deduprc.toml`, else `config.toml` in the platform config directory
//! 3. `DEDUP_*` environment variables (nested keys use `__`, e.g.
//!    `DEDUP_PREPROCESSING__BLUR=false`)
//! 4. Command-line flags, applied by the caller after loading
//!
//! The resulting [`EngineConfig`] is passed explicitly into every component;
//! nothing reads configuration from global state.

use std::fs;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

use crate::duplicates::{ClusterStrategy, GroupingOptions, KeepPolicy};
use crate::scanner::perceptual::{adaptive_threshold, FINGERPRINT_BITS};
use crate::scanner::{HashAlgorithm, PerceptualAlgorithm, PerceptualHasher, Preprocessing, Strictness};

/// File name looked up in the working directory.
pub const LOCAL_CONFIG_FILE: &str = ".deduprc.toml";

/// Prefix for environment variable overrides.
pub const ENV_PREFIX: &str = "DEDUP_";

/// Errors that can occur while loading or saving configuration.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// A layer could not be parsed or had the wrong shape.
    #[error("Invalid configuration: {0}")]
    Invalid(#[from] Box<figment::Error>),

    /// The configuration could not be rendered as TOML.
    #[error("Failed to serialize configuration: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// The platform configuration directory could not be determined.
    #[error("Failed to determine the configuration directory")]
    NoConfigDir,

    /// The config file could not be written.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Path of the config file
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

/// Settings for one engine run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Content digest algorithm
    pub hash_algorithm: HashAlgorithm,
    /// Cluster images by perceptual similarity
    pub perceptual: bool,
    /// Fingerprint algorithm for perceptual mode
    pub perceptual_algorithm: PerceptualAlgorithm,
    /// Explicit Hamming distance threshold; derived from the algorithm when unset
    pub similarity_threshold: Option<u32>,
    /// Scales the derived threshold
    pub strictness: Strictness,
    /// Perceptual clustering strategy
    pub cluster_strategy: ClusterStrategy,
    /// Worker threads; all available cores when unset
    pub workers: Option<usize>,
    /// Which member of each group to keep
    pub keep: KeepPolicy,
    /// Image preprocessing before fingerprinting
    pub preprocessing: Preprocessing,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            hash_algorithm: HashAlgorithm::Sha256,
            perceptual: false,
            perceptual_algorithm: PerceptualAlgorithm::Dhash,
            similarity_threshold: None,
            strictness: Strictness::Normal,
            cluster_strategy: ClusterStrategy::Seed,
            workers: None,
            keep: KeepPolicy::Oldest,
            preprocessing: Preprocessing::default(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from every layer.
    ///
    /// When `explicit` is given only that file is read; otherwise the local
    /// and platform config files are tried in order.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if any layer fails to parse.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let file = match explicit {
            Some(path) => Some(path.to_path_buf()),
            None => Self::discover(),
        };
        Self::figment(file.as_deref())
            .extract()
            .map_err(|e| ConfigError::Invalid(Box::new(e)))
    }

    /// Load configuration from one TOML file plus the environment.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if the file or environment fails to parse.
    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        Self::load(Some(path))
    }

    fn figment(file: Option<&Path>) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));
        if let Some(path) = file {
            log::debug!("Loading configuration from {}", path.display());
            figment = figment.merge(Toml::file(path));
        }
        figment.merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    fn discover() -> Option<PathBuf> {
        let local = PathBuf::from(LOCAL_CONFIG_FILE);
        if local.is_file() {
            return Some(local);
        }
        Self::config_path().ok().filter(|p| p.is_file())
    }

    /// Default platform-specific configuration path.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::NoConfigDir` when no home directory is known.
    pub fn config_path() -> Result<PathBuf, ConfigError> {
        let dirs = ProjectDirs::from("", "", "file-deduplicator").ok_or(ConfigError::NoConfigDir)?;
        Ok(dirs.config_dir().join("config.toml"))
    }

    /// Render the configuration as TOML.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Serialize` if rendering fails.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Write the configuration as TOML, creating parent directories.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` on serialization or I/O failure.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let io_err = |source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        fs::write(path, self.to_toml()?).map_err(io_err)
    }

    /// Hamming threshold for perceptual matching, within `0..=64`.
    ///
    /// An explicit threshold wins; otherwise the algorithm default is scaled
    /// by the strictness.
    #[must_use]
    pub fn effective_threshold(&self) -> u32 {
        let threshold = self
            .similarity_threshold
            .unwrap_or_else(|| adaptive_threshold(self.perceptual_algorithm, self.strictness));
        threshold.min(FINGERPRINT_BITS as u32)
    }

    /// Number of worker threads, at least one.
    #[must_use]
    pub fn effective_workers(&self) -> usize {
        self.workers
            .unwrap_or_else(|| std::thread::available_parallelism().map_or(1, |n| n.get()))
            .max(1)
    }

    /// Options for the grouping engine.
    #[must_use]
    pub fn grouping_options(&self) -> GroupingOptions {
        GroupingOptions {
            perceptual: self.perceptual,
            threshold: self.effective_threshold(),
            strategy: self.cluster_strategy,
        }
    }

    /// Fingerprinter configured with this algorithm and preprocessing.
    #[must_use]
    pub fn perceptual_hasher(&self) -> PerceptualHasher {
        PerceptualHasher::new(self.perceptual_algorithm).with_preprocessing(self.preprocessing)
    }
}
