//! Notion REST API Module
//!
//! Thin, status-preserving access to the handful of Notion endpoints the sync
//! needs: database retrieval and query, page create/update, and file uploads.
//! Every call hands back the raw status and body so callers decide whether a
//! bad status is fatal or only worth a warning.

pub mod client;
pub mod constants;
pub mod metadata;
pub mod operations;
pub mod resilience;

#[cfg(test)]
pub mod testing;

pub use client::{NotionClient, NotionTransport};
pub use metadata::{DatabaseSchema, PropertyType, fetch_schema};
pub use operations::NotionRequest;
pub use resilience::{ResilienceConfig, UploadPollConfig};
