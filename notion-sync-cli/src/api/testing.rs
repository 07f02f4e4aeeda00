//! In-memory transport for tests

use anyhow::Result;
use async_trait::async_trait;
use serde_json::{Value, json};
use std::sync::Mutex;

use super::operations::ApiResponse;
use super::{NotionRequest, NotionTransport};

type Handler = Box<dyn Fn(&NotionRequest) -> Result<ApiResponse> + Send + Sync>;

/// Records every request and answers through a closure
pub struct RecordingTransport {
    requests: Mutex<Vec<NotionRequest>>,
    handler: Handler,
}

impl RecordingTransport {
    pub fn new(handler: impl Fn(&NotionRequest) -> Result<ApiResponse> + Send + Sync + 'static) -> Self {
        Self {
            requests: Mutex::new(Vec::new()),
            handler: Box::new(handler),
        }
    }

    /// Every request seen so far, in order
    pub fn requests(&self) -> Vec<NotionRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Requests of one operation type
    pub fn requests_of(&self, operation_type: &str) -> Vec<NotionRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.operation_type() == operation_type)
            .collect()
    }
}

#[async_trait]
impl NotionTransport for RecordingTransport {
    async fn execute(&self, request: &NotionRequest) -> Result<ApiResponse> {
        self.requests.lock().unwrap().push(request.clone());
        (self.handler)(request)
    }
}

/// Database body with the properties used across the sync tests
pub fn sample_database() -> Value {
    json!({
        "object": "database",
        "properties": {
            "Name": {"type": "title"},
            "STR": {"type": "number"},
            "APV": {"type": "number"},
            "AVD": {"type": "number"},
            "Publish Date": {"type": "date"},
            "Video ID": {"type": "rich_text"},
            "Thumbnail": {"type": "files"}
        }
    })
}

pub fn ok(body: Value) -> Result<ApiResponse> {
    Ok(ApiResponse::new(200, body))
}

pub fn status(code: u16, body: Value) -> Result<ApiResponse> {
    Ok(ApiResponse::new(code, body))
}
