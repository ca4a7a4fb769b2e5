//! Engine configuration
//!
//! Every field has a default, so a TOML file only lists what it changes:
//!
//! ```toml
//! event_channel_capacity = 512
//! default_title = "Draft"
//! ```

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Unsent frames a session's event stream holds before emitters wait
    pub event_channel_capacity: usize,
    /// Queued commands per session actor
    pub command_channel_capacity: usize,
    /// Title of artifacts opened without one
    pub default_title: String,
    /// Largest document a version may hold, in characters
    pub max_content_chars: usize,
}

impl EngineConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With event stream capacity
    #[inline]
    #[must_use]
    pub fn with_event_capacity(mut self, capacity: usize) -> Self {
        self.event_channel_capacity = capacity;
        self
    }

    /// With command queue capacity
    #[inline]
    #[must_use]
    pub fn with_command_capacity(mut self, capacity: usize) -> Self {
        self.command_channel_capacity = capacity;
        self
    }

    /// With default artifact title
    #[inline]
    #[must_use]
    pub fn with_default_title(mut self, title: impl Into<String>) -> Self {
        self.default_title = title.into();
        self
    }

    /// With document size limit
    #[inline]
    #[must_use]
    pub fn with_max_content_chars(mut self, limit: usize) -> Self {
        self.max_content_chars = limit;
        self
    }

    /// Parse and validate TOML
    ///
    /// # Errors
    /// - `ConfigError::Parse` for malformed TOML
    /// - `ConfigError::Invalid` for out-of-range values
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file
    ///
    /// # Errors
    /// `ConfigError::Io` if the file cannot be read, otherwise as
    /// [`from_toml_str`](Self::from_toml_str)
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ConfigError::Io {
                path: path.to_path_buf(),
                source,
            })?;
        let config = Self::from_toml_str(&text)?;
        tracing::debug!(path = %path.display(), ?config, "loaded configuration");
        Ok(config)
    }

    /// Check value ranges
    ///
    /// # Errors
    /// `ConfigError::Invalid` naming the first bad field
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.event_channel_capacity == 0 {
            return Err(ConfigError::Invalid(
                "event_channel_capacity must be positive".into(),
            ));
        }
        if self.command_channel_capacity == 0 {
            return Err(ConfigError::Invalid(
                "command_channel_capacity must be positive".into(),
            ));
        }
        if self.max_content_chars == 0 {
            return Err(ConfigError::Invalid(
                "max_content_chars must be positive".into(),
            ));
        }
        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            event_channel_capacity: 256,
            command_channel_capacity: 64,
            default_title: "Untitled".into(),
            max_content_chars: 1_000_000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = EngineConfig::from_toml_str("default_title = \"Draft\"").unwrap();
        assert_eq!(config.default_title, "Draft");
        assert_eq!(config.event_channel_capacity, 256);
        assert_eq!(config.max_content_chars, 1_000_000);
    }

    #[test]
    fn zero_capacity_is_rejected() {
        let err = EngineConfig::from_toml_str("event_channel_capacity = 0").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(msg) if msg.contains("event_channel")));
    }

    #[test]
    fn malformed_toml_is_a_parse_error() {
        assert!(matches!(
            EngineConfig::from_toml_str("event_channel_capacity = \"many\""),
            Err(ConfigError::Parse(_))
        ));
    }

    #[tokio::test]
    async fn load_reads_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "command_channel_capacity = 8").unwrap();
        let config = EngineConfig::load(file.path()).await.unwrap();
        assert_eq!(config, EngineConfig::new().with_command_capacity(8));
    }

    #[tokio::test]
    async fn missing_file_is_io_error() {
        let err = EngineConfig::load("/nonexistent/canvas.toml").await.unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
