//! Project configuration read from `apidoc.yaml`.
//!
//! Every key is optional; command line flags override whatever is set here.

use crate::error::Result;
use log::debug;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// File looked up in the project root when no config file is given.
pub const DEFAULT_CONFIG_FILE: &str = "apidoc.yaml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocConfig {
    /// Sections left out of the documentation
    #[serde(default)]
    pub exclude_sections: Vec<String>,
    /// Route tables, relative to the project root
    #[serde(default)]
    pub routes: Vec<PathBuf>,
    /// Read routes from `#[get("/..")]` style attributes
    #[serde(default = "default_true")]
    pub attribute_routes: bool,
    /// Directory of `<TypeName>.json` sample documents
    #[serde(default)]
    pub samples_dir: Option<PathBuf>,
    #[serde(default = "default_naming_strategy")]
    pub naming_strategy: String,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub swagger: SwaggerConfig,
}

impl Default for DocConfig {
    fn default() -> Self {
        Self {
            exclude_sections: Vec::new(),
            routes: Vec::new(),
            attribute_routes: true,
            samples_dir: None,
            naming_strategy: default_naming_strategy(),
            cache: CacheConfig::default(),
            swagger: SwaggerConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default)]
    pub enabled: bool,
    /// Base path of the cache artifacts; the view name is appended
    #[serde(default)]
    pub file: Option<PathBuf>,
    /// Check source modification times on every read
    #[serde(default)]
    pub debug: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwaggerConfig {
    #[serde(default = "default_api_version")]
    pub api_version: String,
    #[serde(default = "default_swagger_version")]
    pub swagger_version: String,
    #[serde(default = "default_base_path")]
    pub base_path: String,
    #[serde(default)]
    pub info: SwaggerInfo,
    #[serde(default)]
    pub authentication: Option<AuthenticationConfig>,
}

impl Default for SwaggerConfig {
    fn default() -> Self {
        Self {
            api_version: default_api_version(),
            swagger_version: default_swagger_version(),
            base_path: default_base_path(),
            info: SwaggerInfo::default(),
            authentication: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwaggerInfo {
    #[serde(default = "default_title")]
    pub title: String,
    #[serde(default)]
    pub description: String,
}

impl Default for SwaggerInfo {
    fn default() -> Self {
        Self {
            title: default_title(),
            description: String::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Delivery {
    Header,
    Query,
    Http,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthenticationConfig {
    pub delivery: Delivery,
    #[serde(default)]
    pub name: Option<String>,
}

fn default_true() -> bool {
    true
}

fn default_naming_strategy() -> String {
    "dot_notation".to_string()
}

fn default_api_version() -> String {
    "0.1".to_string()
}

fn default_swagger_version() -> String {
    "1.2".to_string()
}

fn default_base_path() -> String {
    "/api".to_string()
}

fn default_title() -> String {
    "API documentation".to_string()
}

impl DocConfig {
    /// Reads a config file.
    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Loading config from {}", path.display());
        let content = fs::read_to_string(path)?;
        let config: DocConfig = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Loads `explicit` if given, else `apidoc.yaml` from the project root when present,
    /// else the defaults.
    pub fn load(project_root: &Path, explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }

        let candidate = project_root.join(DEFAULT_CONFIG_FILE);
        if candidate.is_file() {
            Self::from_file(&candidate)
        } else {
            debug!("No {} found, using defaults", DEFAULT_CONFIG_FILE);
            Ok(Self::default())
        }
    }
}
