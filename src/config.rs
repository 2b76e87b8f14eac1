//! Configuration management for jigen
//!
//! Supports loading configuration from:
//! - Default values
//! - Config file (jigen.toml)
//! - Environment variables (JIGEN__*)
//!
//! ## Example config file (jigen.toml):
//! ```toml
//! [data]
//! dir = "./docs"
//! images_file = "images.json"
//! groups_file = "groups.json"
//! charinfo_file = "charinfo.json"
//! image_dir = "img"
//!
//! [cache]
//! enabled = true
//! quota_bytes = 5242880
//!
//! [output]
//! format = "pretty"
//! ```

use config_crate::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::graph::LoadConfig;

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JigenConfig {
    /// Dataset locations
    #[serde(default)]
    pub data: DataConfig,

    /// Artifact cache settings
    #[serde(default)]
    pub cache: CacheConfig,

    /// Output settings
    #[serde(default)]
    pub output: OutputConfig,
}

/// Dataset configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    /// Directory holding the JSON datasets
    #[serde(default = "default_data_dir")]
    pub dir: PathBuf,

    #[serde(default = "default_images_file")]
    pub images_file: String,

    #[serde(default = "default_groups_file")]
    pub groups_file: String,

    /// Descriptive dataset; a missing file means no descriptions
    #[serde(default = "default_charinfo_file")]
    pub charinfo_file: String,

    /// Image directory (relative to `dir`) whose listing feeds the cache key
    #[serde(default)]
    pub image_dir: Option<PathBuf>,
}

/// Cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Cache directory; defaults to the platform cache dir
    #[serde(default)]
    pub dir: Option<PathBuf>,

    /// Total bytes the store may hold
    #[serde(default = "default_quota_bytes")]
    pub quota_bytes: u64,
}

/// Output configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default)]
    pub format: OutputFormat,
}

/// Output format for JSON
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Pretty,
    Compact,
}

// Default value functions
fn default_data_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_images_file() -> String {
    "images.json".to_string()
}

fn default_groups_file() -> String {
    "groups.json".to_string()
}

fn default_charinfo_file() -> String {
    "charinfo.json".to_string()
}

fn default_true() -> bool {
    true
}

fn default_quota_bytes() -> u64 {
    5 * 1024 * 1024
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            dir: default_data_dir(),
            images_file: default_images_file(),
            groups_file: default_groups_file(),
            charinfo_file: default_charinfo_file(),
            image_dir: None,
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            dir: None,
            quota_bytes: default_quota_bytes(),
        }
    }
}

fn project_dirs() -> Option<directories::ProjectDirs> {
    directories::ProjectDirs::from("dev", "jigen", "jigen")
}

impl JigenConfig {
    /// Load configuration from default locations
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(None)
    }

    /// Load configuration, layering an explicit file over the defaults
    pub fn load_from(config_path: Option<&str>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();

        let config_locations = ["jigen.toml", ".jigen.toml", "config/jigen.toml"];

        for location in config_locations {
            builder = builder.add_source(File::with_name(location).required(false));
        }

        // Load from XDG config directory
        if let Some(dirs) = project_dirs() {
            let xdg_config = dirs.config_dir().join("jigen.toml");
            if xdg_config.exists() {
                builder = builder.add_source(File::from(xdg_config).required(false));
            }
        }

        if let Some(path) = config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        // Environment variables (JIGEN__CACHE__ENABLED=false)
        builder = builder.add_source(
            Environment::with_prefix("JIGEN")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        config.try_deserialize()
    }

    /// Save configuration to a file
    pub fn save(&self, path: impl AsRef<Path>) -> std::io::Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, content)
    }

    /// Dataset directory (resolves relative paths)
    pub fn data_dir(&self) -> PathBuf {
        if self.data.dir.is_absolute() {
            self.data.dir.clone()
        } else {
            std::env::current_dir()
                .unwrap_or_default()
                .join(&self.data.dir)
        }
    }

    /// Cache directory, falling back to the platform cache dir
    pub fn cache_dir(&self) -> PathBuf {
        self.cache.dir.clone().unwrap_or_else(|| {
            project_dirs()
                .map(|dirs| dirs.cache_dir().to_path_buf())
                .unwrap_or_else(|| self.data_dir().join(".jigen-cache"))
        })
    }

    /// Loader settings derived from the `[data]` section
    pub fn load_config(&self) -> LoadConfig {
        let dir = self.data_dir();
        LoadConfig {
            images_path: dir.join(&self.data.images_file),
            groups_path: dir.join(&self.data.groups_file),
            charinfo_path: dir.join(&self.data.charinfo_file),
            image_dir: self.data.image_dir.as_ref().map(|d| dir.join(d)),
        }
    }
}
