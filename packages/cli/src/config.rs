//! Optional TOML configuration file.
//!
//! ```toml
//! output_dir = "out"
//! epsg = 6677
//!
//! [columns]
//! region = "大字名"
//! parcel_number = "地番"
//!
//! [style]
//! line_color = "ff0000ff"
//! ```
//!
//! Every key is optional. Command-line flags take precedence.

use std::path::{Path, PathBuf};

use koji_map_kml::KmlStyle;
use koji_map_parcel_models::ColumnNames;
use serde::Deserialize;

/// Config file read when `--config` is not given, if it exists.
pub const DEFAULT_CONFIG_PATH: &str = "koji_map.toml";

/// Errors that can occur while reading the config file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("Cannot read config {path}: {source}")]
    Io {
        /// File that failed.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// The file is not valid config TOML.
    #[error("Invalid config {path}: {source}")]
    Toml {
        /// File that failed.
        path: PathBuf,
        /// Parser error.
        source: toml::de::Error,
    },
}

/// Contents of the config file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    /// Source column labels.
    pub columns: ColumnNames,
    /// KML presentation.
    pub style: KmlStyle,
    /// Where outputs are written.
    pub output_dir: Option<PathBuf>,
    /// CRS of datasets that do not declare one.
    pub epsg: Option<u32>,
}

impl FileConfig {
    /// Reads `path`, or [`DEFAULT_CONFIG_PATH`] when `None` and that file
    /// exists, or returns defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the chosen file cannot be read or parsed.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => {
                let default = PathBuf::from(DEFAULT_CONFIG_PATH);
                if !default.is_file() {
                    log::debug!("No {DEFAULT_CONFIG_PATH} found, using defaults");
                    return Ok(Self::default());
                }
                default
            }
        };

        let text = std::fs::read_to_string(&path).map_err(|source| ConfigError::Io {
            path: path.clone(),
            source,
        })?;
        let config = Self::parse(&text).map_err(|source| ConfigError::Toml {
            path: path.clone(),
            source,
        })?;
        log::info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Parses config TOML.
    ///
    /// # Errors
    ///
    /// Returns the TOML error for malformed input or unknown keys.
    pub fn parse(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }
}
