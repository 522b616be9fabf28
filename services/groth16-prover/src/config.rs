//! Service configuration.
//!
//! Read once at startup, typically from a JSON file:
//!
//! ```json
//! {
//!   "point_encoding": "compressed",
//!   "validate_points": true,
//!   "hints": ["uints.to_bytes", "uints.and"]
//! }
//! ```
//!
//! Every field is optional. Leaving out `hints` enables the full standard
//! hint set.

use std::{fs, path::Path};

use serde::Deserialize;
use thiserror::Error;

/// Errors raised while reading the configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
    /// The configuration is not valid JSON for [`ProverConfig`].
    #[error("invalid config: {0}")]
    Json(#[from] serde_json::Error),
    /// A hint name is not part of the standard hint set.
    #[error("unknown hint `{0}`")]
    UnknownHint(String),
}

/// Encoding of curve points inside proving keys.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PointEncoding {
    /// Points carry only `x` and a sign flag.
    #[default]
    Compressed,
    /// Points carry both coordinates.
    Uncompressed,
}

/// Configuration for [`Groth16ProverService`](crate::Groth16ProverService).
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProverConfig {
    /// How curve points are encoded in proving keys.
    pub point_encoding: PointEncoding,
    /// Whether to check that deserialized points are on the curve and in the
    /// prime-order subgroup. Disabling it speeds up loading large keys from a
    /// trusted source.
    pub validate_points: bool,
    /// Names of the hints available to circuits. `None` enables all standard
    /// hints.
    pub hints: Option<Vec<String>>,
}

impl Default for ProverConfig {
    fn default() -> Self {
        Self {
            point_encoding: PointEncoding::default(),
            validate_points: true,
            hints: None,
        }
    }
}

impl ProverConfig {
    /// Parses a configuration from JSON text.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reads and parses a JSON configuration file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let data = fs::read_to_string(path)?;
        Self::from_json(&data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        assert_eq!(ProverConfig::from_json("{}").unwrap(), ProverConfig::default());
    }

    #[test]
    fn test_full_config() {
        let config = ProverConfig::from_json(
            r#"{
                "point_encoding": "uncompressed",
                "validate_points": false,
                "hints": ["uints.and"]
            }"#,
        )
        .unwrap();

        assert_eq!(config.point_encoding, PointEncoding::Uncompressed);
        assert!(!config.validate_points);
        assert_eq!(config.hints, Some(vec!["uints.and".to_string()]));
    }

    #[test]
    fn test_unknown_field_rejected() {
        let err = ProverConfig::from_json(r#"{"port": 4005}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Json(_)));
    }

    #[test]
    fn test_missing_file() {
        let err = ProverConfig::from_path("/nonexistent/prover.json").unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
