//! Encoding of rendered documentation as JSON or YAML, and writing it out.

use crate::error::{Error, Result};
use log::debug;
use serde::Serialize;
use std::fs;
use std::path::Path;

/// Text encodings for structured output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    Json,
    Yaml,
}

/// Serializes `value` as pretty-printed JSON.
///
/// # Errors
///
/// Returns [`Error::SerializationError`] if the value cannot be represented as JSON.
pub fn serialize_json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    debug!("Serializing to JSON");
    serde_json::to_string_pretty(value)
        .map_err(|e| Error::SerializationError(format!("Failed to serialize to JSON: {}", e)))
}

/// Serializes `value` as YAML.
pub fn serialize_yaml<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    debug!("Serializing to YAML");
    serde_yaml::to_string(value)
        .map_err(|e| Error::SerializationError(format!("Failed to serialize to YAML: {}", e)))
}

pub fn serialize<T: Serialize + ?Sized>(value: &T, encoding: Encoding) -> Result<String> {
    match encoding {
        Encoding::Json => serialize_json(value),
        Encoding::Yaml => serialize_yaml(value),
    }
}

/// Writes `content` to `path`, creating parent directories and replacing an existing file.
pub fn write_to_file(content: &str, path: &Path) -> Result<()> {
    debug!("Writing content to file: {}", path.display());

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, content)?;

    debug!("Successfully wrote {} bytes to {}", content.len(), path.display());
    Ok(())
}
