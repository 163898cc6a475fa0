//! # YOLO Engine on ONNX Runtime
//!
//! Runs an Ultralytics YOLO detection model exported to ONNX.
//!
//! ## Pipeline
//! 1. Letterbox the RGB image to `input_size x input_size` (aspect ratio kept,
//!    grey padding) and build an NCHW `f32` tensor in `[0, 1]`
//! 2. Forward pass through the `ort` session
//! 3. Decode the `[1, 4 + nc, N]` output (`[1, N, 4 + nc]` is accepted too):
//!    each column is `cx, cy, w, h` followed by one score per class
//! 4. Class-wise non-max suppression, capped at `max_detections`
//! 5. Undo the letterbox and clip boxes to the source image

use anyhow::{bail, Context, Result};
use image::{
    imageops::{self, FilterType},
    Rgb, RgbImage,
};
use log::{info, warn};
use ndarray::{s, Array4, ArrayViewD, Axis, Ix2};
use ort::execution_providers::{CPUExecutionProvider, CUDAExecutionProvider, ExecutionProvider};
use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::value::Tensor;
use std::path::Path;

use super::engine::{ExecutionDevice, InferenceEngine, RawDetection};
use super::labels::{coco_class_names, parse_names_metadata};
use crate::common::config::{DevicePreference, YoloConfig};

/// Padding colour used by Ultralytics' letterbox.
const PAD_VALUE: u8 = 114;

/// Candidates entering NMS are capped to bound CPU time on low thresholds.
const MAX_NMS_CANDIDATES: usize = 30_000;

/// Geometry of a letterbox resize, used to map boxes back to the source image.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Letterbox {
    pub scale: f32,
    pub pad_x: u32,
    pub pad_y: u32,
    pub resized_width: u32,
    pub resized_height: u32,
    pub source_width: u32,
    pub source_height: u32,
}

impl Letterbox {
    pub fn new(source_width: u32, source_height: u32, size: u32) -> Self {
        let scale = (size as f32 / source_width as f32).min(size as f32 / source_height as f32);
        let resized_width = ((source_width as f32 * scale).round() as u32).clamp(1, size);
        let resized_height = ((source_height as f32 * scale).round() as u32).clamp(1, size);

        Self {
            scale,
            pad_x: (size - resized_width) / 2,
            pad_y: (size - resized_height) / 2,
            resized_width,
            resized_height,
            source_width,
            source_height,
        }
    }

    /// Map a box from model-input coordinates to source-image coordinates.
    pub fn restore(&self, det: RawDetection) -> RawDetection {
        let max_x = self.source_width as f32;
        let max_y = self.source_height as f32;
        let x = |v: f32| ((v - self.pad_x as f32) / self.scale).clamp(0.0, max_x);
        let y = |v: f32| ((v - self.pad_y as f32) / self.scale).clamp(0.0, max_y);

        RawDetection {
            x1: x(det.x1),
            y1: y(det.y1),
            x2: x(det.x2),
            y2: y(det.y2),
            ..det
        }
    }
}

/// Letterbox `image` and convert it into a `[1, 3, size, size]` tensor.
pub fn letterbox_tensor(image: &RgbImage, size: u32) -> (Array4<f32>, Letterbox) {
    let letterbox = Letterbox::new(image.width(), image.height(), size);
    let resized = imageops::resize(
        image,
        letterbox.resized_width,
        letterbox.resized_height,
        FilterType::Triangle,
    );

    let mut canvas = RgbImage::from_pixel(size, size, Rgb([PAD_VALUE; 3]));
    imageops::replace(&mut canvas, &resized, letterbox.pad_x as i64, letterbox.pad_y as i64);

    let side = size as usize;
    let mut input = Array4::<f32>::zeros((1, 3, side, side));
    for (x, y, pixel) in canvas.enumerate_pixels() {
        let (x, y) = (x as usize, y as usize);
        input[[0, 0, y, x]] = pixel[0] as f32 / 255.0;
        input[[0, 1, y, x]] = pixel[1] as f32 / 255.0;
        input[[0, 2, y, x]] = pixel[2] as f32 / 255.0;
    }

    (input, letterbox)
}

/// Decode raw model output into candidate boxes (model-input coordinates).
///
/// Keeps a column when its best class score is strictly above
/// `confidence_threshold`.
pub fn decode_predictions(
    output: &ArrayViewD<'_, f32>,
    confidence_threshold: f32,
) -> Result<Vec<RawDetection>> {
    if output.ndim() != 3 {
        bail!("unexpected model output rank {} (shape {:?})", output.ndim(), output.shape());
    }

    let view = output
        .index_axis(Axis(0), 0)
        .into_dimensionality::<Ix2>()
        .context("model output is not two-dimensional per batch")?;
    // [N, 4 + nc] layouts have more rows than columns
    let view = if view.nrows() > view.ncols() {
        view.reversed_axes()
    } else {
        view
    };

    if view.nrows() < 5 {
        bail!("model output has {} features, expected at least 5", view.nrows());
    }

    let mut candidates = Vec::new();
    for column in view.axis_iter(Axis(1)) {
        let (class_id, confidence) = column
            .slice(s![4..])
            .iter()
            .enumerate()
            .fold((0usize, f32::MIN), |best, (c, &score)| {
                if score > best.1 {
                    (c, score)
                } else {
                    best
                }
            });

        if confidence <= confidence_threshold {
            continue;
        }

        let (cx, cy, w, h) = (column[0], column[1], column[2], column[3]);
        candidates.push(RawDetection {
            class_id,
            confidence,
            x1: cx - w / 2.0,
            y1: cy - h / 2.0,
            x2: cx + w / 2.0,
            y2: cy + h / 2.0,
        });
    }

    Ok(candidates)
}

/// Greedy per-class NMS, highest confidence first.
pub fn non_max_suppression(
    mut candidates: Vec<RawDetection>,
    iou_threshold: f32,
    max_detections: usize,
) -> Vec<RawDetection> {
    candidates.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
    candidates.truncate(MAX_NMS_CANDIDATES);

    let mut kept: Vec<RawDetection> = Vec::new();
    for det in candidates {
        if kept.len() >= max_detections {
            break;
        }
        let suppressed = kept
            .iter()
            .any(|k| k.class_id == det.class_id && k.iou(&det) > iou_threshold);
        if !suppressed {
            kept.push(det);
        }
    }
    kept
}

/// A YOLO model loaded into an ONNX Runtime session.
pub struct OnnxYoloEngine {
    session: Session,
    class_names: Vec<String>,
    device: ExecutionDevice,
    input_size: u32,
    iou_threshold: f32,
    max_detections: usize,
}

impl OnnxYoloEngine {
    /// Build the session on the configured device and read the label table.
    pub fn load(config: &YoloConfig) -> Result<Self> {
        let path = Path::new(&config.model_path);
        if !path.exists() {
            bail!("model file not found: {}", config.model_path);
        }

        let cuda = CUDAExecutionProvider::default();
        let device = match config.device {
            DevicePreference::Cpu => ExecutionDevice::Cpu,
            DevicePreference::Cuda => ExecutionDevice::Cuda,
            DevicePreference::Auto => {
                if cuda.is_available().unwrap_or(false) {
                    ExecutionDevice::Cuda
                } else {
                    ExecutionDevice::Cpu
                }
            }
        };

        let builder = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(config.intra_threads)?;
        let builder = match device {
            ExecutionDevice::Cuda => {
                builder.with_execution_providers([cuda.build().error_on_failure()])?
            }
            ExecutionDevice::Cpu => {
                builder.with_execution_providers([CPUExecutionProvider::default().build()])?
            }
        };
        let session = builder
            .commit_from_file(path)
            .with_context(|| format!("failed to load model {}", config.model_path))?;
        info!(
            "YOLO model is using device: {} (requested '{}')",
            device, config.device
        );

        let class_names = match read_class_names(&session) {
            Some(names) => names,
            None => {
                warn!("Model has no 'names' metadata, falling back to COCO labels");
                coco_class_names()
            }
        };
        info!("Model successfully loaded with {} classes.", class_names.len());

        Ok(Self {
            session,
            class_names,
            device,
            input_size: config.input_size,
            iou_threshold: config.iou_threshold,
            max_detections: config.max_detections,
        })
    }
}

fn read_class_names(session: &Session) -> Option<Vec<String>> {
    let metadata = session.metadata().ok()?;
    let raw = metadata.custom("names").ok()??;
    parse_names_metadata(&raw)
}

impl InferenceEngine for OnnxYoloEngine {
    fn predict(&self, image: &RgbImage, confidence_threshold: f32) -> Result<Vec<RawDetection>> {
        if image.width() == 0 || image.height() == 0 {
            bail!("image has zero size ({}x{})", image.width(), image.height());
        }

        let (input, letterbox) = letterbox_tensor(image, self.input_size);
        let tensor = Tensor::from_array(input)?;

        let outputs = self.session.run(ort::inputs![tensor]?)?;
        let (_, output) = outputs.iter().next().context("model produced no outputs")?;
        let output = output.try_extract_tensor::<f32>()?;

        let candidates = decode_predictions(&output, confidence_threshold)?;
        let kept = non_max_suppression(candidates, self.iou_threshold, self.max_detections);
        Ok(kept.into_iter().map(|det| letterbox.restore(det)).collect())
    }

    fn class_names(&self) -> &[String] {
        &self.class_names
    }

    fn device(&self) -> ExecutionDevice {
        self.device
    }
}
