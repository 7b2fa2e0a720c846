//! Configuration file support.
//!
//! Two configuration file locations are read:
//! - Global: `~/.clhep-recipe/config.toml` - User-wide defaults
//! - Project: `.clhep-recipe/config.toml` - Directory-specific overrides
//!
//! Project config takes precedence over global config.

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};

use crate::core::platform::BuildType;

/// Name of the per-user and per-directory configuration directory.
pub const CONFIG_DIR_NAME: &str = ".clhep-recipe";

/// Recipe tool configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Build settings
    pub build: BuildConfig,

    /// Network settings
    pub net: NetConfig,

    /// Filesystem locations
    pub paths: PathsConfig,
}

/// Build-related configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    /// CMake generator (e.g., "Ninja")
    pub generator: Option<String>,

    /// Default number of parallel jobs (None = let CMake decide)
    pub jobs: Option<usize>,

    /// Default build type (Release, Debug, ...)
    pub build_type: Option<String>,
}

/// Network-related configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NetConfig {
    /// Offline mode (only use cached source archives)
    #[serde(default)]
    pub offline: bool,
}

/// Filesystem locations.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Where downloaded source archives are kept
    pub cache_dir: Option<PathBuf>,
}

impl Config {
    /// Load configuration from a file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;

        toml::from_str(&contents)
            .with_context(|| format!("failed to parse config file: {}", path.display()))
    }

    /// Load configuration with fallback to defaults if file doesn't exist.
    pub fn load_or_default(path: &Path) -> Self {
        if path.exists() {
            Self::load(path).unwrap_or_else(|e| {
                tracing::warn!("Failed to load config from {}: {}", path.display(), e);
                Self::default()
            })
        } else {
            Self::default()
        }
    }

    /// Merge another config into this one (other takes precedence).
    pub fn merge(&mut self, other: Config) {
        if other.build.generator.is_some() {
            self.build.generator = other.build.generator;
        }
        if other.build.jobs.is_some() {
            self.build.jobs = other.build.jobs;
        }
        if other.build.build_type.is_some() {
            self.build.build_type = other.build.build_type;
        }

        if other.net.offline {
            self.net.offline = true;
        }

        if other.paths.cache_dir.is_some() {
            self.paths.cache_dir = other.paths.cache_dir;
        }
    }

    /// Parse the build type from the config string.
    pub fn build_type(&self) -> Result<Option<BuildType>> {
        let Some(value) = &self.build.build_type else {
            return Ok(None);
        };
        value
            .parse()
            .map(Some)
            .map_err(|e| anyhow!("invalid `build.build_type` in config: {}", e))
    }

    /// Download cache directory, falling back to the global config dir.
    pub fn cache_dir(&self) -> Option<PathBuf> {
        self.paths
            .cache_dir
            .clone()
            .or_else(|| global_config_dir().map(|d| d.join("downloads")))
    }
}

/// Load merged configuration from global and project locations.
///
/// Order of precedence (highest to lowest):
/// 1. Project config (.clhep-recipe/config.toml)
/// 2. Global config (~/.clhep-recipe/config.toml)
/// 3. Defaults
pub fn load_config(global_path: &Path, project_path: &Path) -> Config {
    let mut config = Config::default();

    if global_path.exists() {
        let global = Config::load_or_default(global_path);
        config.merge(global);
    }

    if project_path.exists() {
        let project = Config::load_or_default(project_path);
        config.merge(project);
    }

    config
}

/// Load the configuration that applies to `project_root`.
pub fn load_default_config(project_root: &Path) -> Config {
    let project = project_config_path(project_root);
    match global_config_path() {
        Some(global) => load_config(&global, &project),
        None => load_config(Path::new(""), &project),
    }
}

/// Get the global config directory (~/.clhep-recipe).
pub fn global_config_dir() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|b| b.home_dir().join(CONFIG_DIR_NAME))
}

/// Get the global config path (~/.clhep-recipe/config.toml).
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("config.toml"))
}

/// Get the project config path (.clhep-recipe/config.toml).
pub fn project_config_path(project_root: &Path) -> PathBuf {
    project_root.join(CONFIG_DIR_NAME).join("config.toml")
}
