//! # Detection Adapter
//!
//! Sits between the session loop and the model. The engine does the heavy
//! lifting (forward pass, suppression); this layer only turns raw boxes into
//! response [`Detection`]s:
//!
//! 1. class index → name through the engine's label table
//! 2. drop every name outside the request's active classes
//! 3. round confidence to 4 decimals, truncate coordinates to integers

use anyhow::Result;
use image::RgbImage;
use std::sync::Arc;

use crate::common::messages::Detection;
use crate::common::settings::EffectiveSettings;
use crate::processing::engine::{ExecutionDevice, InferenceEngine, RawDetection};

/// Shared, read-only handle on the loaded model.
///
/// Built once at startup and passed to every session through the router
/// state.
pub struct Detector {
    engine: Arc<dyn InferenceEngine>,
}

impl Detector {
    pub fn new(engine: Arc<dyn InferenceEngine>) -> Self {
        Self { engine }
    }

    pub fn device(&self) -> ExecutionDevice {
        self.engine.device()
    }

    pub fn class_names(&self) -> &[String] {
        self.engine.class_names()
    }

    /// Run the model on `image` and keep only active classes.
    ///
    /// Blocking; see [`Detector::detect_async`] for use from the runtime.
    pub fn detect(&self, image: &RgbImage, settings: &EffectiveSettings) -> Result<Vec<Detection>> {
        let raw = self.engine.predict(image, settings.confidence_threshold)?;
        Ok(to_detections(raw, self.engine.class_names(), settings))
    }

    /// [`Detector::detect`] on the blocking thread pool, so other connections
    /// keep making progress while the forward pass runs.
    pub async fn detect_async(
        self: &Arc<Self>,
        image: RgbImage,
        settings: EffectiveSettings,
    ) -> Result<Vec<Detection>> {
        let detector = Arc::clone(self);
        tokio::task::spawn_blocking(move || detector.detect(&image, &settings))
            .await
            .map_err(|e| anyhow::anyhow!("Inference task panicked: {}", e))?
    }
}

/// Label, filter and round raw model boxes.
///
/// Boxes whose class index is outside the label table are dropped.
pub fn to_detections(
    raw: Vec<RawDetection>,
    class_names: &[String],
    settings: &EffectiveSettings,
) -> Vec<Detection> {
    raw.into_iter()
        .filter_map(|det| {
            let label = class_names.get(det.class_id)?;
            if !settings.is_active(label) {
                return None;
            }
            Some(Detection {
                label: label.clone(),
                confidence: round_confidence(det.confidence),
                bbox: [det.x1 as i32, det.y1 as i32, det.x2 as i32, det.y2 as i32],
            })
        })
        .collect()
}

fn round_confidence(confidence: f32) -> f32 {
    ((confidence * 10_000.0).round() / 10_000.0).clamp(0.0, 1.0)
}
