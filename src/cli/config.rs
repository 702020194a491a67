//! Config CLI command.

use crate::config::DycleeConfig;
use crate::{Error, Result};

/// Config command handler.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConfigCommand;

impl ConfigCommand {
    /// Creates a new config command.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Renders the effective configuration as TOML.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OperationFailed`] if serialization fails.
    pub fn show(&self, config: &DycleeConfig) -> Result<String> {
        toml::to_string_pretty(&config.to_config_file()).map_err(|e| Error::OperationFailed {
            operation: "serialize_config".to_string(),
            cause: e.to_string(),
        })
    }
}
