//! Pacing and polling configuration
//!
//! The sync never retries failed writes. The only timing knobs are the fixed
//! delay after each row and the bounded upload-status poll.

pub mod config;

pub use config::{ResilienceConfig, UploadPollConfig};
