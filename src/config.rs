//! Configuration management for the generator
//!
//! Supports loading configuration from:
//! - Default values
//! - Config file (cuegen.toml)
//! - Environment variables (CUEGEN__*)
//!
//! ## Example config file (cuegen.toml):
//! ```toml
//! [generator]
//! annotation_key = "cue"
//! json_key = "json"
//! indent = "\t"
//!
//! [output]
//! file_name = "encore.gen.cue"
//! dir = "./services"
//! ```

use config_crate::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::Result;

/// Main configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CuegenConfig {
    /// Translation settings
    #[serde(default)]
    pub generator: GeneratorConfig,

    /// Where generated documents go
    #[serde(default)]
    pub output: OutputConfig,
}

/// Settings that affect the generated document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratorConfig {
    /// Struct tag key carrying CUE refinements and the `opt` flag
    #[serde(default = "default_annotation_key")]
    pub annotation_key: String,

    /// Struct tag key carrying the serialized field name and `omitempty`
    #[serde(default = "default_json_key")]
    pub json_key: String,

    /// Indentation unit used by the printer
    #[serde(default = "default_indent")]
    pub indent: String,
}

/// Output settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputConfig {
    /// File name written inside each service directory
    #[serde(default = "default_file_name")]
    pub file_name: String,

    /// Root directory containing one directory per service
    #[serde(default = "default_output_dir")]
    pub dir: PathBuf,
}

// Default value functions
fn default_annotation_key() -> String {
    "cue".to_string()
}

fn default_json_key() -> String {
    "json".to_string()
}

fn default_indent() -> String {
    "\t".to_string()
}

fn default_file_name() -> String {
    "encore.gen.cue".to_string()
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(".")
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            annotation_key: default_annotation_key(),
            json_key: default_json_key(),
            indent: default_indent(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            file_name: default_file_name(),
            dir: default_output_dir(),
        }
    }
}

impl CuegenConfig {
    /// Load configuration from default locations
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration, layering an explicit file over the defaults
    pub fn load_from(config_path: Option<&str>) -> Result<Self> {
        let mut builder = Config::builder();

        let config_locations = ["cuegen.toml", ".cuegen.toml", "config/cuegen.toml"];

        for location in config_locations {
            builder = builder.add_source(File::with_name(location).required(false));
        }

        // Load from XDG config directory
        if let Some(config_dir) = directories::ProjectDirs::from("dev", "encore", "cuegen") {
            let xdg_config = config_dir.config_dir().join("cuegen.toml");
            if xdg_config.exists() {
                builder = builder.add_source(File::from(xdg_config).required(false));
            }
        }

        if let Some(path) = config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        // Environment variables (CUEGEN__GENERATOR__ANNOTATION_KEY=...)
        builder = builder.add_source(Environment::with_prefix("CUEGEN").separator("__"));

        let config = builder.build()?;
        Ok(config.try_deserialize()?)
    }

    /// Render the effective configuration as TOML
    pub fn to_toml(&self) -> std::result::Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}
