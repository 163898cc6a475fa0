//! # Server Components
//!
//! - [`detector`]: turns raw model output into filtered, rounded detections
//! - [`session`]: the per-connection message loop
//! - [`routes`]: axum router (status endpoint and WebSocket upgrade)
//! - [`state`]: shared state injected into handlers

pub mod detector;
pub mod routes;
pub mod session;
pub mod state;

pub use detector::Detector;
pub use routes::{router, serve};
pub use session::{run_session, Transport};
pub use state::AppState;
