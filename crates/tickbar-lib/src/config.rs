//! Engine configuration file.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tickbar_dispatch::DispatchConfig;
use tickbar_feed::IngestConfig;

/// Errors loading an [`EngineConfig`].
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("Failed to read config {path}: {source}")]
    Io {
        /// Path of the config file.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The contents are not a valid configuration.
    #[error("Invalid config: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Settings for one engine run, usually read from a JSON file.
///
/// Every field is optional; missing ones take their defaults.
///
/// ```json
/// {
///   "ingest": { "timeframe": "m5", "price_step": "0.01", "invalid_tick_policy": "skip" },
///   "dispatch": { "flush_interval_ms": 250 }
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Ingestion settings.
    pub ingest: IngestConfig,
    /// Dispatcher settings.
    pub dispatch: DispatchConfig,
}

impl EngineConfig {
    /// Parses a configuration from JSON text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] on malformed JSON or unknown sections.
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Reads a configuration file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::io::Write;
    use tickbar_feed::InvalidTickPolicy;
    use tickbar_types::Timeframe;

    #[test]
    fn test_empty_config_is_default() {
        assert_eq!(EngineConfig::from_json("{}").unwrap(), EngineConfig::default());
    }

    #[test]
    fn test_partial_sections() {
        let config = EngineConfig::from_json(
            r#"{"ingest": {"timeframe": "h1", "price_step": "0.01"}, "dispatch": {"flush_interval_ms": 250}}"#,
        )
        .unwrap();
        assert_eq!(config.ingest.timeframe, Timeframe::Hour1);
        assert_eq!(config.ingest.price_step, Some(dec!(0.01)));
        assert_eq!(config.ingest.invalid_tick_policy, InvalidTickPolicy::Abort);
        assert_eq!(config.dispatch.flush_interval_ms.get(), 250);
    }

    #[test]
    fn test_zero_flush_interval_rejected() {
        assert!(matches!(
            EngineConfig::from_json(r#"{"dispatch": {"flush_interval_ms": 0}}"#),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_unknown_section_rejected() {
        assert!(matches!(
            EngineConfig::from_json(r#"{"render": {}}"#),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_load_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"ingest": {{"max_days": 2}}}}"#).unwrap();
        let config = EngineConfig::load(file.path()).unwrap();
        assert_eq!(config.ingest.max_days, Some(2));

        let err = EngineConfig::load("/nonexistent/tickbar.json").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
