//! Raw API responses with explicit status inspection

use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Status and decoded body of a Notion response.
///
/// Transports return this for every status code; only transport-level
/// failures (DNS, TLS, timeouts) become errors before reaching the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse {
    /// HTTP status code
    pub status: u16,
    /// JSON body, or the raw text as a JSON string if it was not JSON
    pub body: Value,
}

impl ApiResponse {
    pub fn new(status: u16, body: Value) -> Self {
        Self { status, body }
    }

    /// Build from the raw response text
    pub fn from_text(status: u16, text: &str) -> Self {
        let body = serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()));
        Self::new(status, body)
    }

    /// 2xx
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Turn a non-success status into an error labelled with `label`
    pub fn require_success(self, label: &str) -> Result<Value> {
        if self.is_success() {
            Ok(self.body)
        } else {
            Err(anyhow!("{} failed ({}): {}", label, self.status, self.body_text()))
        }
    }

    /// Read a top-level string field such as `id` or `status`
    pub fn str_field(&self, field: &str) -> Option<&str> {
        self.body.get(field).and_then(Value::as_str)
    }

    /// Body rendered for log lines
    pub fn body_text(&self) -> String {
        match &self.body {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}
