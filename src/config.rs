// Output format, axis letters, lash configuration
use std::path::Path;

use serde::{Deserialize, Serialize};

// Decimal places for every coordinate the compensator writes
pub const OUTPUT_PRECISION: usize = 2;

// Axes that can be compensated, in output order
pub const AXIS_LETTERS: [char; 4] = ['X', 'Y', 'Z', 'A'];

/// Error types for loading lash configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config file {path}: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Backlash magnitude per axis, in program units (mm/inch for X/Y/Z, degrees for A)
///
/// Loaded from JSON such as `{"x": 0.1, "z": 0.05}`; missing axes default to 0.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LashConfig {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub a: f64,
}

impl LashConfig {
    pub fn new(x: f64, y: f64, z: f64, a: f64) -> Self {
        Self { x, y, z, a }
    }

    pub fn from_json_str(path: &str, json: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(json).map_err(|source| ConfigError::Json {
            path: path.to_string(),
            source,
        })
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let display = path.display().to_string();
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: display.clone(),
            source,
        })?;
        Self::from_json_str(&display, &json)
    }

    /// Replace values with any that were given explicitly (e.g. on the command line)
    pub fn with_overrides(
        self,
        x: Option<f64>,
        y: Option<f64>,
        z: Option<f64>,
        a: Option<f64>,
    ) -> Self {
        Self {
            x: x.unwrap_or(self.x),
            y: y.unwrap_or(self.y),
            z: z.unwrap_or(self.z),
            a: a.unwrap_or(self.a),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_axes_default_to_zero() {
        let cfg = LashConfig::from_json_str("lash.json", r#"{"x": 0.1, "z": 0.05}"#).unwrap();
        assert_eq!(cfg, LashConfig::new(0.1, 0.0, 0.05, 0.0));
    }

    #[test]
    fn test_unknown_axis_rejected() {
        let err = LashConfig::from_json_str("lash.json", r#"{"b": 0.1}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Json { .. }));
        assert!(err.to_string().contains("lash.json"));
    }

    #[test]
    fn test_overrides_win() {
        let cfg = LashConfig::new(0.1, 0.2, 0.3, 0.4).with_overrides(None, Some(0.0), None, Some(1.5));
        assert_eq!(cfg, LashConfig::new(0.1, 0.0, 0.3, 1.5));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = LashConfig::from_file(Path::new("/nonexistent/lash.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
