//! Reader configuration types
//!
//! This module defines the few knobs the database loader needs. The file
//! layout itself is fixed; only naming details and the duplicate key policy
//! can be tuned.

use serde::{Deserialize, Serialize};

/// Configuration for loading a UDS database
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReaderConfig {
    /// Extension of the database containers
    #[serde(default = "default_file_extension")]
    pub file_extension: String,

    /// File name of the chassis table, relative to the database directory
    #[serde(default = "default_chassis_file")]
    pub chassis_file: String,

    /// Text map key of the "unknown" label used by enumerations and multiplexers
    #[serde(default = "default_unknown_text_key")]
    pub unknown_text_key: u32,

    /// Fail the load on duplicate text/unit keys instead of overwriting
    #[serde(default)]
    pub reject_duplicate_keys: bool,
}

fn default_file_extension() -> String {
    ".uds".to_string()
}

fn default_chassis_file() -> String {
    "Chassis.ldat".to_string()
}

fn default_unknown_text_key() -> u32 {
    3455
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            file_extension: default_file_extension(),
            chassis_file: default_chassis_file(),
            unknown_text_key: default_unknown_text_key(),
            reject_duplicate_keys: false,
        }
    }
}

impl ReaderConfig {
    /// Create a new reader configuration with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method: set the container file extension (with or without leading dot)
    pub fn with_file_extension(mut self, extension: impl Into<String>) -> Self {
        let extension = extension.into();
        self.file_extension = if extension.starts_with('.') {
            extension
        } else {
            format!(".{}", extension)
        };
        self
    }

    /// Builder method: set the chassis table file name
    pub fn with_chassis_file(mut self, file_name: impl Into<String>) -> Self {
        self.chassis_file = file_name.into();
        self
    }

    /// Builder method: set the text key of the "unknown" label
    pub fn with_unknown_text_key(mut self, key: u32) -> Self {
        self.unknown_text_key = key;
        self
    }

    /// Builder method: reject duplicate text/unit keys
    pub fn with_reject_duplicate_keys(mut self, enabled: bool) -> Self {
        self.reject_duplicate_keys = enabled;
        self
    }

    /// Extension without the leading dot, as expected by `Path::with_extension`
    pub fn extension(&self) -> &str {
        self.file_extension.trim_start_matches('.')
    }
}
