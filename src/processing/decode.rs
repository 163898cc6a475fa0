//! Base64 → RGB image decoding.

use base64::{engine::general_purpose, Engine as _};
use image::RgbImage;
use log::debug;

/// Decode a base64 string into a 3-channel RGB image.
///
/// ASCII whitespace anywhere in the payload is ignored, so MIME-style
/// line-wrapped base64 decodes the same as a single line.
///
/// Returns `None` on any failure (malformed base64, unknown container,
/// truncated image data). Callers treat `None` as an ordinary outcome.
///
/// # Example
/// ```ignore
/// let encoded = general_purpose::STANDARD.encode(std::fs::read("photo.jpg")?);
/// let image = base64_to_image(&encoded).expect("valid jpeg");
/// ```
pub fn base64_to_image(encoded: &str) -> Option<RgbImage> {
    let compact: Vec<u8> = encoded
        .bytes()
        .filter(|b| !b.is_ascii_whitespace())
        .collect();

    let bytes = match general_purpose::STANDARD.decode(&compact) {
        Ok(bytes) => bytes,
        Err(e) => {
            debug!("Invalid base64 payload: {}", e);
            return None;
        }
    };

    match image::load_from_memory(&bytes) {
        Ok(img) => Some(img.to_rgb8()),
        Err(e) => {
            debug!("Payload is not a decodable image: {}", e);
            None
        }
    }
}

/// Encode raw image file bytes the way clients are expected to.
pub fn encode_image_bytes(bytes: &[u8]) -> String {
    general_purpose::STANDARD.encode(bytes)
}
