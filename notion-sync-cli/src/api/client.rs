//! HTTP client for the Notion REST API

use anyhow::{Context, Result};
use async_trait::async_trait;
use log::debug;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use reqwest::Method;
use std::time::{Duration, Instant};

use super::constants::{REQUEST_TIMEOUT_SECS, VERSION_HEADER};
use super::operations::{ApiResponse, NotionRequest};

/// Executes Notion requests.
///
/// Implementations must return `Ok` for every HTTP status and reserve `Err`
/// for failures that produced no response at all.
#[async_trait]
pub trait NotionTransport: Send + Sync {
    async fn execute(&self, request: &NotionRequest) -> Result<ApiResponse>;
}

/// reqwest-backed Notion client
#[derive(Debug, Clone)]
pub struct NotionClient {
    http: reqwest::Client,
    base_url: String,
}

impl NotionClient {
    /// Create a client authenticated with an integration token
    pub fn new(token: &str, api_version: &str, base_url: &str) -> Result<Self> {
        let mut headers = HeaderMap::new();
        let mut auth = HeaderValue::from_str(&format!("Bearer {}", token))
            .context("Notion token contains characters not allowed in a header")?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);
        headers.insert(
            VERSION_HEADER,
            HeaderValue::from_str(api_version)
                .with_context(|| format!("Invalid Notion API version: {}", api_version))?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, request: &NotionRequest) -> String {
        format!("{}{}", self.base_url, request.path())
    }
}

#[async_trait]
impl NotionTransport for NotionClient {
    async fn execute(&self, request: &NotionRequest) -> Result<ApiResponse> {
        let method = Method::from_bytes(request.http_method().as_bytes())
            .with_context(|| format!("Invalid HTTP method: {}", request.http_method()))?;
        let url = self.url(request);
        let start = Instant::now();

        let mut builder = self.http.request(method, &url);
        if let Some(body) = request.body() {
            builder = builder.json(body);
        }

        let response = builder
            .send()
            .await
            .with_context(|| format!("{} {} failed to send", request.http_method(), url))?;

        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .with_context(|| format!("Failed to read response body from {}", url))?;

        debug!(
            "{} {} {} -> {} in {:?}",
            request.operation_type(),
            request.http_method(),
            request.path(),
            status,
            start.elapsed()
        );

        Ok(ApiResponse::from_text(status, &text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_joins_base_and_path() {
        let client = NotionClient::new("secret_abc", "2022-06-28", "https://api.notion.com/v1/").unwrap();
        let request = NotionRequest::retrieve_database("db1");
        assert_eq!(client.url(&request), "https://api.notion.com/v1/databases/db1");
    }

    #[test]
    fn test_rejects_token_with_newline() {
        assert!(NotionClient::new("bad\ntoken", "2022-06-28", "https://api.notion.com/v1").is_err());
    }
}
