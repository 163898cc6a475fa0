//! # Server Binary Entry Point
//!
//! ## Usage
//!
//! ```bash
//! cargo run --release --bin server -- --config config/server.toml
//! ```
//!
//! The server will:
//! 1. Load configuration from the TOML file (exit 1 if missing or invalid)
//! 2. Load the ONNX model once on the configured device
//! 3. Serve `GET /` and the `/ws/detect` WebSocket until Ctrl-C
//! 4. Release the model on shutdown

use anyhow::Context;
use clap::Parser;
use log::{error, info};
use std::sync::Arc;

use yolo_inference_server::common::config::{load_config, DEFAULT_CONFIG_PATH};
use yolo_inference_server::processing::OnnxYoloEngine;
use yolo_inference_server::server::{serve, AppState, Detector};
use yolo_inference_server::utils::init_logger;

/// Command-line arguments for the server binary
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the server configuration file (TOML format)
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    config: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logger();

    let args = Args::parse();

    let config = match load_config(&args.config) {
        Ok(config) => config,
        Err(e) => {
            error!(
                "CRITICAL ERROR: Unable to load configuration. Check '{}'. Error: {}",
                args.config, e
            );
            std::process::exit(1);
        }
    };

    info!("🚀 Server is starting...");

    let engine = OnnxYoloEngine::load(&config.yolo).context("failed to initialise YOLO model")?;
    info!("Active classes for detection: {:?}", config.yolo.active_classes);
    let detector = Detector::new(Arc::new(engine));
    info!(
        "YOLO model is ready on {} with {} classes.",
        detector.device(),
        detector.class_names().len()
    );

    let addr = config.server.bind_address();
    let state = AppState::new(config, detector);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!("🌐 YOLO inference server running on http://{}", addr);
    info!("📡 Detection endpoint: ws://{}/ws/detect", addr);

    serve(listener, state.clone(), shutdown_signal()).await?;

    info!("Shutting down, releasing model.");
    drop(state);

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
