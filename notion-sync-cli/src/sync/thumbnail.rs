//! Thumbnail import into Notion-managed file storage
//!
//! Two phases: register the external URL, then poll the upload until Notion
//! reports it as `uploaded`. Every failure ends the import with a warning and
//! `None`; nothing here fails a row.

use log::{debug, warn};

use crate::api::{NotionRequest, NotionTransport, UploadPollConfig};

/// Upload states that end polling without a usable file
const ABORT_STATES: &[&str] = &["failed", "expired"];
const READY_STATE: &str = "uploaded";

/// Import `url` as `filename`; returns the upload id once it is ready
pub async fn import_thumbnail(
    transport: &dyn NotionTransport,
    url: &str,
    filename: &str,
    poll: &UploadPollConfig,
) -> Option<String> {
    let upload_id = start_import(transport, url, filename).await?;
    debug!("Registered upload {} for {}", upload_id, url);

    if wait_until_uploaded(transport, &upload_id, poll).await {
        Some(upload_id)
    } else {
        None
    }
}

async fn start_import(transport: &dyn NotionTransport, url: &str, filename: &str) -> Option<String> {
    let response = match NotionRequest::start_external_upload(url, filename)
        .execute(transport)
        .await
    {
        Ok(response) => response,
        Err(e) => {
            warn!("File import request failed for {}: {:#}", url, e);
            return None;
        }
    };

    if !response.is_success() {
        warn!(
            "File import not accepted for {} ({}): {}",
            url,
            response.status,
            response.body_text()
        );
        return None;
    }

    match response.str_field("id") {
        Some(id) if !id.is_empty() => Some(id.to_string()),
        _ => {
            warn!("File import response for {} has no upload id", url);
            None
        }
    }
}

async fn wait_until_uploaded(
    transport: &dyn NotionTransport,
    upload_id: &str,
    poll: &UploadPollConfig,
) -> bool {
    let attempts = poll.max_attempts.max(1);

    for attempt in 1..=attempts {
        let response = match NotionRequest::retrieve_file_upload(upload_id)
            .execute(transport)
            .await
        {
            Ok(response) => response,
            Err(e) => {
                warn!("Polling upload {} failed: {:#}", upload_id, e);
                return false;
            }
        };

        if !response.is_success() {
            warn!(
                "Polling upload {} returned {}: {}",
                upload_id,
                response.status,
                response.body_text()
            );
            return false;
        }

        let state = response.str_field("status").unwrap_or("");
        if state == READY_STATE {
            return true;
        }
        if ABORT_STATES.contains(&state) {
            warn!("Upload {} ended as '{}'", upload_id, state);
            return false;
        }
        debug!(
            "Upload {} is '{}' (attempt {}/{})",
            upload_id, state, attempt, attempts
        );

        if attempt < attempts && !poll.delay.is_zero() {
            tokio::time::sleep(poll.delay).await;
        }
    }

    warn!(
        "Upload {} was not ready after {} attempts",
        upload_id, attempts
    );
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::testing::{RecordingTransport, ok, status};
    use anyhow::anyhow;
    use serde_json::json;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    fn poll(max_attempts: u32) -> UploadPollConfig {
        UploadPollConfig {
            max_attempts,
            delay: Duration::ZERO,
        }
    }

    #[tokio::test]
    async fn test_import_ready_after_pending() {
        let polls = AtomicU32::new(0);
        let transport = RecordingTransport::new(move |req| match req {
            NotionRequest::CreateFileUpload { .. } => ok(json!({"id": "up1", "status": "pending"})),
            NotionRequest::RetrieveFileUpload { .. } => {
                if polls.fetch_add(1, Ordering::SeqCst) < 2 {
                    ok(json!({"id": "up1", "status": "pending"}))
                } else {
                    ok(json!({"id": "up1", "status": "uploaded"}))
                }
            }
            _ => Err(anyhow!("unexpected request")),
        });

        let id = import_thumbnail(&transport, "https://x.com/a.png", "thumb-a.png", &poll(6)).await;

        assert_eq!(id.as_deref(), Some("up1"));
        assert_eq!(transport.requests_of("retrieve_file_upload").len(), 3);
        let register = &transport.requests_of("create_file_upload")[0];
        assert_eq!(
            register.body().unwrap(),
            &json!({"mode": "external_url", "external_url": "https://x.com/a.png", "filename": "thumb-a.png"})
        );
    }

    #[tokio::test]
    async fn test_import_aborts_when_registration_rejected() {
        let transport = RecordingTransport::new(|_| status(400, json!({"message": "not supported"})));

        let id = import_thumbnail(&transport, "https://x.com/a.png", "a.png", &poll(6)).await;

        assert_eq!(id, None);
        assert_eq!(transport.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_import_aborts_without_upload_id() {
        let transport = RecordingTransport::new(|_| ok(json!({"object": "file_upload"})));

        assert_eq!(import_thumbnail(&transport, "https://x.com/a.png", "a.png", &poll(6)).await, None);
        assert_eq!(transport.requests_of("retrieve_file_upload").len(), 0);
    }

    #[tokio::test]
    async fn test_import_aborts_on_failed_state() {
        let transport = RecordingTransport::new(|req| match req {
            NotionRequest::CreateFileUpload { .. } => ok(json!({"id": "up1"})),
            _ => ok(json!({"status": "failed"})),
        });

        assert_eq!(import_thumbnail(&transport, "https://x.com/a.png", "a.png", &poll(6)).await, None);
        assert_eq!(transport.requests_of("retrieve_file_upload").len(), 1);
    }

    #[tokio::test]
    async fn test_import_aborts_on_poll_error_status() {
        let transport = RecordingTransport::new(|req| match req {
            NotionRequest::CreateFileUpload { .. } => ok(json!({"id": "up1"})),
            _ => status(500, json!("boom")),
        });

        assert_eq!(import_thumbnail(&transport, "https://x.com/a.png", "a.png", &poll(6)).await, None);
        assert_eq!(transport.requests_of("retrieve_file_upload").len(), 1);
    }

    #[tokio::test]
    async fn test_import_times_out_after_max_attempts() {
        let transport = RecordingTransport::new(|req| match req {
            NotionRequest::CreateFileUpload { .. } => ok(json!({"id": "up1"})),
            _ => ok(json!({"status": "pending"})),
        });

        assert_eq!(import_thumbnail(&transport, "https://x.com/a.png", "a.png", &poll(4)).await, None);
        assert_eq!(transport.requests_of("retrieve_file_upload").len(), 4);
    }

    #[tokio::test]
    async fn test_import_swallows_transport_errors() {
        let transport = RecordingTransport::new(|_| Err(anyhow!("connection reset")));

        assert_eq!(import_thumbnail(&transport, "https://x.com/a.png", "a.png", &poll(6)).await, None);
    }
}
