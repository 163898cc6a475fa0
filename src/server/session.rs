//! # Detection Session
//!
//! One session runs per WebSocket connection and handles its messages
//! strictly in arrival order.
//!
//! ## Message Flow
//!
//! ```text
//! Client -> Server  { image, hash, settings? }
//!   parse -> resolve settings -> verify hash -> decode -> detect
//! Server -> Client  { status: "success", detections, settings_used }
//!                 | { status: "error", message }
//! ```
//!
//! Problems with a single message (missing fields, hash mismatch, undecodable
//! image, inference failure) are answered with an error response and the
//! session keeps going. A peer that leaves, with or without a close
//! handshake, ends the session quietly. A frame that is not JSON (or not
//! UTF-8) ends the session after a best-effort
//! `An internal server error occurred.` reply.

use async_trait::async_trait;
use axum::extract::ws::{Message, WebSocket};
use log::{error, info, warn};
use std::net::SocketAddr;
use thiserror::Error;

use crate::common::config::ConfigError;
use crate::common::messages::*;
use crate::common::settings::EffectiveSettings;
use crate::processing::{base64_to_image, verify_image_hash};
use crate::server::state::AppState;

/// Failures that end a session.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The peer went away without a close handshake.
    #[error("connection lost: {0}")]
    Disconnected(#[from] axum::Error),

    #[error("invalid JSON frame: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("binary frame is not valid UTF-8")]
    InvalidUtf8,
}

/// A bidirectional text channel with one peer.
#[async_trait]
pub trait Transport: Send {
    /// Next inbound text payload; `Ok(None)` once the peer has closed.
    async fn recv_text(&mut self) -> Result<Option<String>, SessionError>;

    async fn send_text(&mut self, text: String) -> Result<(), SessionError>;
}

#[async_trait]
impl Transport for WebSocket {
    async fn recv_text(&mut self) -> Result<Option<String>, SessionError> {
        loop {
            match self.recv().await {
                None | Some(Ok(Message::Close(_))) => return Ok(None),
                // a reset without a close handshake lands here too
                Some(Err(e)) => return Err(e.into()),
                Some(Ok(Message::Text(text))) => return Ok(Some(text)),
                Some(Ok(Message::Binary(bytes))) => {
                    return String::from_utf8(bytes)
                        .map(Some)
                        .map_err(|_| SessionError::InvalidUtf8);
                }
                // axum answers pings itself
                Some(Ok(Message::Ping(_))) | Some(Ok(Message::Pong(_))) => continue,
            }
        }
    }

    async fn send_text(&mut self, text: String) -> Result<(), SessionError> {
        Ok(self.send(Message::Text(text)).await?)
    }
}

/// Drive one connection until the peer leaves or the loop fails.
pub async fn run_session<T: Transport>(mut transport: T, peer: SocketAddr, state: AppState) {
    info!("🔌 Client {} connected.", peer);

    match serve_messages(&mut transport, peer, &state).await {
        Ok(()) => info!("Client {} disconnected.", peer),
        Err(SessionError::Disconnected(e)) => {
            info!("Client {} disconnected ({}).", peer, e);
        }
        Err(e) => {
            error!("Unexpected error in WebSocket connection with {}: {}", peer, e);
            // The channel may already be unusable
            let _ = send_response(&mut transport, &DetectionResponse::error(INTERNAL_ERROR)).await;
        }
    }
}

async fn serve_messages<T: Transport>(
    transport: &mut T,
    peer: SocketAddr,
    state: &AppState,
) -> Result<(), SessionError> {
    while let Some(text) = transport.recv_text().await? {
        let response = process_message(&text, peer, state).await?;
        send_response(transport, &response).await?;
    }
    Ok(())
}

async fn send_response<T: Transport>(
    transport: &mut T,
    response: &DetectionResponse,
) -> Result<(), SessionError> {
    let text = serde_json::to_string(response)?;
    transport.send_text(text).await
}

/// Handle one inbound frame and build its reply.
///
/// Only a frame that is not JSON at all returns `Err`; every other problem is
/// reported to the peer as an error response.
pub async fn process_message(
    text: &str,
    peer: SocketAddr,
    state: &AppState,
) -> Result<DetectionResponse, SessionError> {
    let value: serde_json::Value = serde_json::from_str(text)?;
    let request: DetectionRequest = match serde_json::from_value(value) {
        Ok(request) => request,
        Err(e) => {
            warn!("Malformed request from {}: {}", peer, e);
            return Ok(DetectionResponse::error(format!("Malformed request: {}", e)));
        }
    };

    let Some((image_b64, provided_hash)) = request.payload() else {
        return Ok(DetectionResponse::error(MISSING_FIELDS));
    };

    let settings = match EffectiveSettings::resolve(&state.config.yolo, request.settings.as_ref()) {
        Ok(settings) => settings,
        Err(ConfigError::Validation(reason)) => {
            return Ok(DetectionResponse::error(format!("Invalid settings: {}", reason)));
        }
        Err(e) => return Ok(DetectionResponse::error(e.to_string())),
    };

    if !verify_image_hash(image_b64, provided_hash) {
        warn!("Hash verification failed for client {}", peer);
        return Ok(DetectionResponse::error(HASH_MISMATCH));
    }

    let Some(image) = base64_to_image(image_b64) else {
        error!("Failed to decode Base64 image.");
        return Ok(DetectionResponse::error(DECODE_FAILED));
    };

    match state.detector.detect_async(image, settings.clone()).await {
        Ok(detections) => {
            info!(
                "Successfully processed image, found {} active objects.",
                detections.len()
            );
            Ok(DetectionResponse::Success {
                detections,
                settings_used: settings,
            })
        }
        Err(e) => {
            error!("Error during inference: {:#}", e);
            Ok(DetectionResponse::error(format!(
                "Server error during detection: {}",
                e
            )))
        }
    }
}
