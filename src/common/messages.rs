//! # Message Protocol
//!
//! JSON messages exchanged over the `/ws/detect` WebSocket.
//!
//! Inbound:
//! ```json
//! { "image": "<base64>", "hash": "<sha256-hex>",
//!   "settings": { "confidence_threshold": 0.4, "active_classes": ["person"] } }
//! ```
//!
//! Outbound is either a success carrying detections and the settings that were
//! applied, or an error carrying a human-readable message.

use serde::{Deserialize, Serialize};

use super::settings::EffectiveSettings;

pub const MISSING_FIELDS: &str = "Message must contain 'image' and 'hash' keys.";
pub const HASH_MISMATCH: &str = "Image integrity compromised (hash mismatch).";
pub const DECODE_FAILED: &str = "Could not decode Base64 image.";
pub const INTERNAL_ERROR: &str = "An internal server error occurred.";

/// A single image submitted for detection.
///
/// Every field is optional at the wire level so that a message lacking
/// `image` or `hash` can still be answered with a structured error.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DetectionRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settings: Option<RequestSettings>,
}

impl DetectionRequest {
    /// The `(image, hash)` pair, or `None` when either is absent or empty.
    pub fn payload(&self) -> Option<(&str, &str)> {
        let image = self.image.as_deref().filter(|s| !s.is_empty())?;
        let hash = self.hash.as_deref().filter(|s| !s.is_empty())?;
        Some((image, hash))
    }
}

/// Per-request overrides; each field falls back to the configured default.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RequestSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence_threshold: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_classes: Option<Vec<String>>,
}

/// One detected object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub label: String,
    /// Rounded to 4 decimal places
    pub confidence: f32,
    /// `[x1, y1, x2, y2]` in source-image pixels
    #[serde(rename = "box")]
    pub bbox: [i32; 4],
}

/// Reply sent for every inbound message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum DetectionResponse {
    Success {
        detections: Vec<Detection>,
        settings_used: EffectiveSettings,
    },
    Error {
        message: String,
    },
}

impl DetectionResponse {
    pub fn error(message: impl Into<String>) -> Self {
        DetectionResponse::Error {
            message: message.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, DetectionResponse::Success { .. })
    }

    /// Serialize to the JSON text sent over the socket.
    pub fn to_json(&self) -> anyhow::Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(text: &str) -> anyhow::Result<Self> {
        Ok(serde_json::from_str(text)?)
    }
}
