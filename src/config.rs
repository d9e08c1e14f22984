//! Settings of one deployment: where the data lives and which template cells to fill.
//! Loaded from ~/.config/pickup-sheet/config.toml unless a path is given.

use crate::spreadsheet::Column;
use crate::template::TemplateLayout;
use serde::Deserialize;
use serde::Serialize;
use std::fs;
use std::path::Path;
use std::path::PathBuf;
use thiserror::Error;
use tracing::debug;

pub const CONFIG_FILE_NAME: &str = "config.toml";
pub const APPLICATION_DIR: &str = "pickup-sheet";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config file '{}' not found", .0.display())]
    NotFound(PathBuf),

    #[error("Read config file '{}' failed: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Parse config file '{}' failed: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Serialize config failed: {0}")]
    Serialize(#[from] toml::ser::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Base for relative data source and template paths
    pub assets_dir: PathBuf,
    pub data_source: PathBuf,
    pub template: PathBuf,
    /// Where generated documents are written
    pub output_dir: PathBuf,
    pub lookup: LookupConfig,
    pub layout: TemplateLayout,
}

/// Which sheet and column of the data source are searched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LookupConfig {
    pub sheet: String,
    pub key_column: Column,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            assets_dir: PathBuf::from("assets"),
            data_source: PathBuf::from("customers.xlsx"),
            template: PathBuf::from("template.xlsx"),
            output_dir: std::env::temp_dir(),
            lookup: LookupConfig::default(),
            layout: TemplateLayout::default(),
        }
    }
}

impl Default for LookupConfig {
    fn default() -> Self {
        Self {
            sheet: "Sheet2".to_owned(),
            key_column: Column(1),
        }
    }
}

impl Config {
    /// Per-user config file location, if the platform has a config directory
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APPLICATION_DIR).join(CONFIG_FILE_NAME))
    }

    /// Loads an explicit config file, which must exist, or else the per-user
    /// file when present, or else the defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            if !path.exists() {
                return Err(ConfigError::NotFound(path.to_owned()));
            }
            return Self::from_file(path);
        }

        match Self::default_path() {
            Some(path) if path.is_file() => Self::from_file(&path),
            _ => {
                debug!("no config file, using defaults");
                Ok(Self::default())
            }
        }
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        debug!(path = %path.display(), "loading config");
        let contents = fs::read_to_string(path).map_err(|source| match source.kind() {
            std::io::ErrorKind::NotFound => ConfigError::NotFound(path.to_owned()),
            _ => ConfigError::Read { path: path.to_owned(), source },
        })?;
        toml::from_str(&contents).map_err(|source| ConfigError::Parse { path: path.to_owned(), source })
    }

    /// Renders the effective configuration as TOML
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn data_source_path(&self) -> PathBuf {
        self.assets_dir.join(&self.data_source)
    }

    pub fn template_path(&self) -> PathBuf {
        self.assets_dir.join(&self.template)
    }
}
