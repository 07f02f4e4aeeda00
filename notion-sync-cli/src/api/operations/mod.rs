//! Notion request/response types
//!
//! Requests are plain values that can be built, inspected and logged before
//! a transport executes them.

pub mod request;
pub mod response;

pub use request::NotionRequest;
pub use response::ApiResponse;
