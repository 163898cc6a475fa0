pub mod common;
pub mod processing;
pub mod server;
pub mod utils;

pub use common::config::{load_config, AppConfig};
pub use common::messages::{Detection, DetectionRequest, DetectionResponse};
pub use server::{AppState, Detector};
