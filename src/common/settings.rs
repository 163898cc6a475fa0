//! Effective detection settings for a single request.

use serde::{Deserialize, Serialize};

use super::config::{check_unit_range, ConfigError, YoloConfig};
use super::messages::RequestSettings;

/// The threshold and class filter actually applied to one image.
///
/// Echoed back to the client as `settings_used`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EffectiveSettings {
    pub confidence_threshold: f32,
    pub active_classes: Vec<String>,
}

impl EffectiveSettings {
    /// Merge request overrides over the configured defaults.
    ///
    /// A field present in `overrides` always wins; an absent field falls back
    /// to `defaults`. An override threshold outside `[0, 1]` is rejected.
    pub fn resolve(
        defaults: &YoloConfig,
        overrides: Option<&RequestSettings>,
    ) -> Result<Self, ConfigError> {
        let confidence_threshold = overrides
            .and_then(|o| o.confidence_threshold)
            .unwrap_or(defaults.confidence_threshold);
        check_unit_range("confidence_threshold", confidence_threshold)?;

        let active_classes = overrides
            .and_then(|o| o.active_classes.clone())
            .unwrap_or_else(|| defaults.active_classes.clone());

        Ok(Self {
            confidence_threshold,
            active_classes,
        })
    }

    pub fn is_active(&self, label: &str) -> bool {
        self.active_classes.iter().any(|c| c == label)
    }
}
