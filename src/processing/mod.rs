//! # Image Processing and Inference
//!
//! Everything that touches pixels or tensors: payload integrity, base64 image
//! decoding, and the YOLO model behind the [`InferenceEngine`] trait.

pub mod decode;
pub mod engine;
pub mod integrity;
pub mod labels;
pub mod yolo;

pub use decode::base64_to_image;
pub use engine::{ExecutionDevice, InferenceEngine, RawDetection};
pub use integrity::{compute_image_hash, verify_image_hash};
pub use yolo::OnnxYoloEngine;
