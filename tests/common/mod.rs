#![allow(dead_code)]

use async_trait::async_trait;
use image::{ImageFormat, Rgb, RgbImage};
use std::collections::VecDeque;
use std::io::Cursor;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use yolo_inference_server::common::config::{AppConfig, DevicePreference, ServerConfig, YoloConfig};
use yolo_inference_server::common::messages::{DetectionRequest, DetectionResponse, RequestSettings};
use yolo_inference_server::processing::decode::encode_image_bytes;
use yolo_inference_server::processing::engine::{ExecutionDevice, InferenceEngine, RawDetection};
use yolo_inference_server::processing::compute_image_hash;
use yolo_inference_server::server::session::{SessionError, Transport};
use yolo_inference_server::server::{AppState, Detector};

/// Stands in for a model that always sees one person (0.9) and one car (0.8).
pub struct ScriptedEngine {
    predictions: Vec<RawDetection>,
    names: Vec<String>,
    failure: Option<String>,
    calls: AtomicUsize,
}

impl ScriptedEngine {
    pub fn person_and_car() -> Self {
        Self::with_predictions(vec![
            RawDetection { class_id: 0, confidence: 0.9, x1: 12.4, y1: 8.9, x2: 40.2, y2: 47.7 },
            RawDetection { class_id: 2, confidence: 0.8, x1: 30.0, y1: 20.5, x2: 63.9, y2: 45.1 },
        ])
    }

    pub fn with_predictions(predictions: Vec<RawDetection>) -> Self {
        Self {
            predictions,
            names: vec!["person".into(), "bicycle".into(), "car".into()],
            failure: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            failure: Some(message.to_string()),
            ..Self::person_and_car()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl InferenceEngine for ScriptedEngine {
    fn predict(&self, _image: &RgbImage, confidence_threshold: f32) -> anyhow::Result<Vec<RawDetection>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(message) = &self.failure {
            anyhow::bail!("{}", message);
        }
        Ok(self
            .predictions
            .iter()
            .filter(|d| d.confidence > confidence_threshold)
            .copied()
            .collect())
    }

    fn class_names(&self) -> &[String] {
        &self.names
    }

    fn device(&self) -> ExecutionDevice {
        ExecutionDevice::Cpu
    }
}

pub fn test_config() -> AppConfig {
    AppConfig {
        server: ServerConfig {
            host: "127.0.0.1".into(),
            port: 8000,
        },
        yolo: YoloConfig {
            model_path: "unused.onnx".into(),
            confidence_threshold: 0.5,
            active_classes: vec!["person".into()],
            iou_threshold: 0.7,
            input_size: 640,
            max_detections: 300,
            device: DevicePreference::Cpu,
            intra_threads: 1,
        },
    }
}

pub fn state_with(engine: Arc<ScriptedEngine>) -> AppState {
    AppState::new(test_config(), Detector::new(engine as Arc<dyn InferenceEngine>))
}

pub fn peer() -> SocketAddr {
    "127.0.0.1:50000".parse().unwrap()
}

/// Base64 of a small PNG.
pub fn encoded_test_image() -> String {
    let img = RgbImage::from_pixel(64, 48, Rgb([120, 80, 40]));
    let mut bytes = Vec::new();
    img.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png).unwrap();
    encode_image_bytes(&bytes)
}

pub fn valid_request(settings: Option<RequestSettings>) -> String {
    let image = encoded_test_image();
    let hash = compute_image_hash(&image);
    serde_json::to_string(&DetectionRequest {
        image: Some(image),
        hash: Some(hash),
        settings,
    })
    .unwrap()
}

pub fn labels(response: &DetectionResponse) -> Vec<String> {
    match response {
        DetectionResponse::Success { detections, .. } => {
            detections.iter().map(|d| d.label.clone()).collect()
        }
        DetectionResponse::Error { message } => panic!("expected success, got error: {}", message),
    }
}

pub fn error_message(response: &DetectionResponse) -> &str {
    match response {
        DetectionResponse::Error { message } => message,
        DetectionResponse::Success { .. } => panic!("expected error, got success"),
    }
}

pub enum Inbound {
    Text(String),
    /// The peer drops the TCP connection without a close frame.
    Reset,
}

fn connection_reset() -> SessionError {
    SessionError::Disconnected(axum::Error::new(std::io::Error::new(
        std::io::ErrorKind::ConnectionReset,
        "connection reset",
    )))
}

/// Replays a fixed list of inbound frames and records what the session sends.
pub struct ScriptedTransport {
    inbound: VecDeque<Inbound>,
    sent: Arc<Mutex<Vec<String>>>,
    peer_gone: bool,
}

impl ScriptedTransport {
    pub fn new(inbound: Vec<Inbound>) -> (Self, Arc<Mutex<Vec<String>>>) {
        let sent = Arc::new(Mutex::new(Vec::new()));
        let transport = Self {
            inbound: inbound.into(),
            sent: Arc::clone(&sent),
            peer_gone: false,
        };
        (transport, sent)
    }

    pub fn texts(frames: Vec<String>) -> (Self, Arc<Mutex<Vec<String>>>) {
        Self::new(frames.into_iter().map(Inbound::Text).collect())
    }

    /// Every send fails, as when the peer leaves while a reply is being built.
    pub fn hung_up(frames: Vec<String>) -> (Self, Arc<Mutex<Vec<String>>>) {
        let (mut transport, sent) = Self::texts(frames);
        transport.peer_gone = true;
        (transport, sent)
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn recv_text(&mut self) -> Result<Option<String>, SessionError> {
        match self.inbound.pop_front() {
            Some(Inbound::Text(text)) => Ok(Some(text)),
            Some(Inbound::Reset) => Err(connection_reset()),
            None => Ok(None),
        }
    }

    async fn send_text(&mut self, text: String) -> Result<(), SessionError> {
        if self.peer_gone {
            return Err(connection_reset());
        }
        self.sent.lock().unwrap().push(text);
        Ok(())
    }
}

pub fn sent_responses(sent: &Arc<Mutex<Vec<String>>>) -> Vec<DetectionResponse> {
    sent.lock()
        .unwrap()
        .iter()
        .map(|text| DetectionResponse::from_json(text).unwrap())
        .collect()
}
