//! Link set configuration via a `[linkset]` TOML table
//!
//! Collections read their defaults from the same `strata.toml` the database
//! uses. Missing keys fall back to defaults; a missing table means all defaults.

use serde::{Deserialize, Serialize};
use std::path::Path;
use strata_core::{StrataError, StrataResult};

/// Per-set behavior switches
///
/// # Example
///
/// ```toml
/// [linkset]
/// # Resolve links to records while iterating (default: true)
/// auto_convert_to_record = true
/// # Emit change events to the owner (default: true)
/// track_changes = true
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkSetConfig {
    /// Resolve link-only entries while iterating
    #[serde(default = "default_true")]
    pub auto_convert_to_record: bool,
    /// Emit ADD/REMOVE events to the owner; dirty marking is unaffected
    #[serde(default = "default_true")]
    pub track_changes: bool,
}

fn default_true() -> bool {
    true
}

impl Default for LinkSetConfig {
    fn default() -> Self {
        Self {
            auto_convert_to_record: true,
            track_changes: true,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    linkset: LinkSetConfig,
}

impl LinkSetConfig {
    /// Parse the `[linkset]` table of a TOML document
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` if the document is not valid TOML or the table
    /// has wrongly typed values.
    pub fn from_toml_str(content: &str) -> StrataResult<Self> {
        let file: ConfigFile = toml::from_str(content).map_err(|e| {
            StrataError::invalid_input(format!("Failed to parse linkset config: {}", e))
        })?;
        Ok(file.linkset)
    }

    /// Read and parse config from a file path
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> StrataResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            StrataError::internal(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        Self::from_toml_str(&content)
    }
}
