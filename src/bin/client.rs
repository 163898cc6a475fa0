//! # Client Binary Entry Point
//!
//! Sends one image to a running server and prints the response.
//!
//! ## Usage
//!
//! ```bash
//! cargo run --bin client -- --image test_image.jpg
//! cargo run --bin client -- --image street.jpg --confidence 0.3 --classes person,car
//! ```

use anyhow::{bail, Context};
use clap::Parser;
use futures_util::{SinkExt, StreamExt};
use log::info;
use std::time::Instant;
use tokio_tungstenite::{connect_async, tungstenite::Message};

use yolo_inference_server::common::messages::{DetectionRequest, DetectionResponse, RequestSettings};
use yolo_inference_server::processing::compute_image_hash;
use yolo_inference_server::processing::decode::encode_image_bytes;
use yolo_inference_server::utils::init_logger;

/// Command-line arguments for the client binary
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// WebSocket URL of the detection endpoint
    #[arg(long, default_value = "ws://127.0.0.1:8000/ws/detect")]
    url: String,

    /// Image file to send
    #[arg(long, default_value = "test_image.jpg")]
    image: String,

    /// Override the server's default confidence threshold
    #[arg(long)]
    confidence: Option<f32>,

    /// Override the server's active classes (comma separated)
    #[arg(long, value_delimiter = ',')]
    classes: Option<Vec<String>>,
}

/// Load the image, encode it in base64 and hash the encoded text.
fn prepare_request(args: &Args) -> anyhow::Result<DetectionRequest> {
    let bytes = std::fs::read(&args.image)
        .with_context(|| format!("Error: Image at path '{}' not found.", args.image))?;
    let image = encode_image_bytes(&bytes);
    let hash = compute_image_hash(&image);

    let settings = if args.confidence.is_some() || args.classes.is_some() {
        Some(RequestSettings {
            confidence_threshold: args.confidence,
            active_classes: args.classes.clone(),
        })
    } else {
        None
    };

    Ok(DetectionRequest {
        image: Some(image),
        hash: Some(hash),
        settings,
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logger();

    let args = Args::parse();
    let request = prepare_request(&args)?;

    info!("Connecting to server: {}", args.url);
    let (mut ws, _) = connect_async(args.url.as_str())
        .await
        .context("Connection refused. Is the server running?")?;
    info!("Connection successful. Sending '{}' for processing...", args.image);

    let start = Instant::now();
    ws.send(Message::Text(serde_json::to_string(&request)?)).await?;

    let reply = loop {
        match ws.next().await {
            Some(Ok(Message::Text(text))) => break text,
            Some(Ok(_)) => continue,
            Some(Err(e)) => return Err(e.into()),
            None => bail!("Connection closed before a response arrived"),
        }
    };
    let elapsed = start.elapsed();

    let response = DetectionResponse::from_json(&reply)?;
    println!("\n--- Response from server ---");
    println!("{}", serde_json::to_string_pretty(&response)?);
    println!("----------------------------");
    println!(
        "Total time (send + process + receive): {:.4} seconds",
        elapsed.as_secs_f64()
    );

    let _ = ws.close(None).await;
    Ok(())
}
