//! # Configuration Loading
//!
//! The server reads a single TOML file at startup and keeps the parsed
//! [`AppConfig`] for the whole lifetime of the process. Nothing in it is
//! mutated afterwards; request-level overrides are merged separately by
//! [`EffectiveSettings`](super::settings::EffectiveSettings).
//!
//! ## Example
//!
//! ```toml
//! [server]
//! host = "0.0.0.0"
//! port = 8000
//!
//! [yolo]
//! model_path = "models/yolo11n.onnx"
//! confidence_threshold = 0.5
//! active_classes = ["person", "car"]
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Path used when no `--config` argument is given.
pub const DEFAULT_CONFIG_PATH: &str = "config/server.toml";

/// Reasons a configuration file can be rejected at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration file not found at path: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Failed to read configuration file {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Validation(String),
}

/// Complete server configuration loaded from TOML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Where the HTTP/WebSocket listener binds
    pub server: ServerConfig,
    /// Model location and default detection settings
    pub yolo: YoloConfig,
}

/// Listener address.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    /// `host:port` string suitable for `TcpListener::bind`.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Which execution provider the ONNX session should use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DevicePreference {
    /// CUDA when the runtime reports it available, CPU otherwise.
    #[default]
    Auto,
    Cpu,
    Cuda,
}

impl fmt::Display for DevicePreference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DevicePreference::Auto => write!(f, "auto"),
            DevicePreference::Cpu => write!(f, "cpu"),
            DevicePreference::Cuda => write!(f, "cuda"),
        }
    }
}

/// Model and detection defaults.
///
/// `confidence_threshold` and `active_classes` are the defaults every request
/// falls back to. The remaining fields tune the engine and are optional.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct YoloConfig {
    /// Path to the ONNX export of the model
    pub model_path: String,
    /// Minimum confidence for a detection to be reported (0.0 - 1.0)
    pub confidence_threshold: f32,
    /// Class names that may appear in responses
    pub active_classes: Vec<String>,
    /// IoU above which overlapping boxes of the same class are suppressed
    #[serde(default = "default_iou_threshold")]
    pub iou_threshold: f32,
    /// Square model input size in pixels
    #[serde(default = "default_input_size")]
    pub input_size: u32,
    /// Upper bound on detections kept per image after NMS
    #[serde(default = "default_max_detections")]
    pub max_detections: usize,
    #[serde(default)]
    pub device: DevicePreference,
    /// Threads used by the runtime for a single forward pass
    #[serde(default = "default_intra_threads")]
    pub intra_threads: usize,
}

fn default_iou_threshold() -> f32 {
    0.7
}

fn default_input_size() -> u32 {
    640
}

fn default_max_detections() -> usize {
    300
}

fn default_intra_threads() -> usize {
    4
}

impl AppConfig {
    /// Check value ranges that the TOML types alone cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.host.trim().is_empty() {
            return Err(ConfigError::Validation("server.host must not be empty".into()));
        }
        if self.server.port == 0 {
            return Err(ConfigError::Validation("server.port must not be 0".into()));
        }

        let yolo = &self.yolo;
        if yolo.model_path.trim().is_empty() {
            return Err(ConfigError::Validation("yolo.model_path must not be empty".into()));
        }
        check_unit_range("yolo.confidence_threshold", yolo.confidence_threshold)?;
        check_unit_range("yolo.iou_threshold", yolo.iou_threshold)?;
        if yolo.input_size == 0 || yolo.input_size % 32 != 0 {
            return Err(ConfigError::Validation(format!(
                "yolo.input_size must be a positive multiple of 32, got {}",
                yolo.input_size
            )));
        }
        if yolo.max_detections == 0 {
            return Err(ConfigError::Validation("yolo.max_detections must be greater than 0".into()));
        }
        if yolo.intra_threads == 0 {
            return Err(ConfigError::Validation("yolo.intra_threads must be greater than 0".into()));
        }

        Ok(())
    }
}

/// Reject values outside `[0, 1]` (NaN included).
pub(crate) fn check_unit_range(field: &str, value: f32) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::Validation(format!(
            "{} must be within [0, 1], got {}",
            field, value
        )))
    }
}

/// Load and validate the application configuration.
///
/// # Returns
/// - `Ok(AppConfig)`: parsed and validated configuration
/// - `Err(ConfigError::NotFound)`: `path` does not exist
/// - `Err(ConfigError::Parse)`: malformed TOML or a required key is absent
/// - `Err(ConfigError::Validation)`: a value is out of its allowed range
///
/// # Example
/// ```ignore
/// let config = load_config("config/server.toml")?;
/// ```
pub fn load_config(path: impl AsRef<Path>) -> Result<AppConfig, ConfigError> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(ConfigError::NotFound(path.to_path_buf()));
    }

    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let config: AppConfig = toml::from_str(&content)?;
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const VALID: &str = r#"
[server]
host = "127.0.0.1"
port = 8000

[yolo]
model_path = "models/yolo11n.onnx"
confidence_threshold = 0.5
active_classes = ["person", "car"]
"#;

    fn write_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_valid_config_with_defaults() {
        let file = write_config(VALID);
        let config = load_config(file.path()).unwrap();

        assert_eq!(config.server.bind_address(), "127.0.0.1:8000");
        assert_eq!(config.yolo.model_path, "models/yolo11n.onnx");
        assert_eq!(config.yolo.confidence_threshold, 0.5);
        assert_eq!(config.yolo.active_classes, vec!["person", "car"]);
        assert_eq!(config.yolo.iou_threshold, 0.7);
        assert_eq!(config.yolo.input_size, 640);
        assert_eq!(config.yolo.max_detections, 300);
        assert_eq!(config.yolo.device, DevicePreference::Auto);
    }

    #[test]
    fn test_missing_file() {
        let err = load_config("does/not/exist.toml").unwrap_err();
        assert!(matches!(err, ConfigError::NotFound(_)));
        assert!(err.to_string().contains("does/not/exist.toml"));
    }

    #[test]
    fn test_missing_required_field() {
        let file = write_config(&VALID.replace("model_path = \"models/yolo11n.onnx\"\n", ""));
        let err = load_config(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_confidence_out_of_range() {
        let file = write_config(&VALID.replace("confidence_threshold = 0.5", "confidence_threshold = 1.5"));
        let err = load_config(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
        assert!(err.to_string().contains("yolo.confidence_threshold"));
    }

    #[test]
    fn test_negative_confidence_rejected() {
        let file = write_config(&VALID.replace("confidence_threshold = 0.5", "confidence_threshold = -0.1"));
        assert!(matches!(load_config(file.path()), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_input_size_must_be_multiple_of_32() {
        let file = write_config(&format!("{}input_size = 500\n", VALID));
        assert!(matches!(load_config(file.path()), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_device_preference_parsed() {
        let file = write_config(&format!("{}device = \"cpu\"\n", VALID));
        let config = load_config(file.path()).unwrap();
        assert_eq!(config.yolo.device, DevicePreference::Cpu);
    }

    #[test]
    fn test_device_preference_displays_config_spelling() {
        for raw in ["auto", "cpu", "cuda"] {
            let file = write_config(&format!("{}device = \"{}\"\n", VALID, raw));
            let config = load_config(file.path()).unwrap();
            assert_eq!(config.yolo.device.to_string(), raw);
        }
    }
}
