//! The seam between the detection adapter and the model runtime.

use image::RgbImage;
use std::fmt;

/// A box as produced by the model, before class filtering and rounding.
///
/// Coordinates are in source-image pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawDetection {
    pub class_id: usize,
    pub confidence: f32,
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

impl RawDetection {
    pub fn area(&self) -> f32 {
        (self.x2 - self.x1).max(0.0) * (self.y2 - self.y1).max(0.0)
    }

    /// Intersection over union with another box.
    pub fn iou(&self, other: &RawDetection) -> f32 {
        let ix1 = self.x1.max(other.x1);
        let iy1 = self.y1.max(other.y1);
        let ix2 = self.x2.min(other.x2);
        let iy2 = self.y2.min(other.y2);
        let inter = (ix2 - ix1).max(0.0) * (iy2 - iy1).max(0.0);
        if inter == 0.0 {
            return 0.0;
        }
        inter / (self.area() + other.area() - inter)
    }
}

/// Where the forward pass runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionDevice {
    Cpu,
    Cuda,
}

impl fmt::Display for ExecutionDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionDevice::Cpu => write!(f, "cpu"),
            ExecutionDevice::Cuda => write!(f, "cuda"),
        }
    }
}

/// A loaded object-detection model.
///
/// Implementations are created once at startup and shared read-only by every
/// connection, so `predict` takes `&self` and must be callable concurrently.
pub trait InferenceEngine: Send + Sync {
    /// Run the model and return every box scoring above `confidence_threshold`,
    /// after the model's own suppression step.
    fn predict(&self, image: &RgbImage, confidence_threshold: f32) -> anyhow::Result<Vec<RawDetection>>;

    /// Label table indexed by `RawDetection::class_id`.
    fn class_names(&self) -> &[String];

    fn device(&self) -> ExecutionDevice;
}
