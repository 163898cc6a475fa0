//! # Common Components
//!
//! Data structures shared by the server and the test client.
//!
//! ## Modules
//!
//! - [`config`]: TOML configuration loading and validation
//! - [`messages`]: WebSocket request/response definitions
//! - [`settings`]: merging per-request overrides with configured defaults

pub mod config;
pub mod messages;
pub mod settings;
