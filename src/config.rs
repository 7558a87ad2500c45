//! Diagnostic configuration
//!
//! Holds the defaults applied when a diagnostic record is built without an
//! explicit status. One value is created at start-up and handed to a
//! [`DiagnosticFactory`](crate::diagnostic::DiagnosticFactory); nothing here is
//! global or mutated after construction.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

pub const DEFAULT_STATUS: u16 = 500;
pub const DEFAULT_DISPLAY: &str = "An internal error occurred.";

/// Defaults for diagnostic record construction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiagnosticConfig {
    /// Status assigned to records built without one
    pub default_status: u16,
    /// Caller-safe text attached to every record
    pub display: String,
}

impl DiagnosticConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the fallback status
    pub fn with_default_status(mut self, status: u16) -> Self {
        self.default_status = status;
        self
    }

    /// Set the display text
    pub fn with_display(mut self, display: impl Into<String>) -> Self {
        self.display = display.into();
        self
    }

    /// Parse and validate a TOML document
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a TOML file on disk
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        debug!("Loading diagnostic config from {}", path.display());
        let source = std::fs::read_to_string(path)?;
        Self::from_toml_str(&source)
    }

    pub fn validate(&self) -> Result<()> {
        if !(100..=599).contains(&self.default_status) {
            return Err(Error::Config(format!(
                "default_status must be between 100 and 599, got {}",
                self.default_status
            )));
        }
        if self.display.trim().is_empty() {
            return Err(Error::Config("display must not be empty".to_string()));
        }
        Ok(())
    }
}

impl Default for DiagnosticConfig {
    fn default() -> Self {
        Self {
            default_status: DEFAULT_STATUS,
            display: DEFAULT_DISPLAY.to_string(),
        }
    }
}
