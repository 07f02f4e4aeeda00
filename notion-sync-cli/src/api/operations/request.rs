//! Core request types for the Notion endpoints used by the sync

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use crate::api::constants::EXTERNAL_URL_UPLOAD_MODE;

use super::ApiResponse;

/// A single call against the Notion REST API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum NotionRequest {
    /// Fetch a database definition (its property schema)
    /// GET /databases/{id}
    RetrieveDatabase {
        /// Database id, with or without dashes
        database_id: String,
    },
    /// Query database pages with a filter
    /// POST /databases/{id}/query
    QueryDatabase {
        database_id: String,
        /// Filter/sort/page_size payload
        body: Value,
    },
    /// Create a page inside a database
    /// POST /pages
    CreatePage {
        /// Parent + properties payload
        body: Value,
    },
    /// Partially update a page (properties and/or cover)
    /// PATCH /pages/{id}
    UpdatePage {
        page_id: String,
        body: Value,
    },
    /// Register a file upload
    /// POST /file_uploads
    CreateFileUpload {
        body: Value,
    },
    /// Read the status of a file upload
    /// GET /file_uploads/{id}
    RetrieveFileUpload {
        upload_id: String,
    },
}

impl NotionRequest {
    /// Retrieve a database and its property schema
    pub fn retrieve_database(database_id: impl Into<String>) -> Self {
        Self::RetrieveDatabase {
            database_id: database_id.into(),
        }
    }

    /// Look up at most one page whose title property equals `key` exactly
    pub fn find_by_title(
        database_id: impl Into<String>,
        title_property: &str,
        key: &str,
    ) -> Self {
        Self::QueryDatabase {
            database_id: database_id.into(),
            body: json!({
                "filter": {
                    "property": title_property,
                    "title": { "equals": key }
                },
                "page_size": 1
            }),
        }
    }

    /// Create a page carrying only properties.
    ///
    /// The cover is never part of this payload; it is always set by a
    /// separate [`NotionRequest::set_external_cover`] patch afterwards.
    pub fn create_page(database_id: &str, properties: Map<String, Value>) -> Self {
        Self::CreatePage {
            body: json!({
                "parent": { "database_id": database_id },
                "properties": Value::Object(properties),
            }),
        }
    }

    /// Patch the given properties of an existing page
    pub fn update_properties(page_id: impl Into<String>, properties: Map<String, Value>) -> Self {
        Self::UpdatePage {
            page_id: page_id.into(),
            body: json!({ "properties": Value::Object(properties) }),
        }
    }

    /// Patch a page cover to an external image URL
    pub fn set_external_cover(page_id: impl Into<String>, url: &str) -> Self {
        Self::UpdatePage {
            page_id: page_id.into(),
            body: json!({
                "cover": { "type": "external", "external": { "url": url } }
            }),
        }
    }

    /// Use a finished upload as the page cover, and optionally as the value of
    /// a files property
    pub fn attach_upload(
        page_id: impl Into<String>,
        upload_id: &str,
        filename: &str,
        files_property: Option<&str>,
    ) -> Self {
        let mut properties = Map::new();
        if let Some(property) = files_property {
            properties.insert(
                property.to_string(),
                json!({
                    "type": "files",
                    "files": [{
                        "type": "file_upload",
                        "name": filename,
                        "file_upload": { "id": upload_id }
                    }]
                }),
            );
        }

        Self::UpdatePage {
            page_id: page_id.into(),
            body: json!({
                "cover": { "type": "file_upload", "file_upload": { "id": upload_id } },
                "properties": Value::Object(properties),
            }),
        }
    }

    /// Ask Notion to import a file from a public URL
    pub fn start_external_upload(url: &str, filename: &str) -> Self {
        Self::CreateFileUpload {
            body: json!({
                "mode": EXTERNAL_URL_UPLOAD_MODE,
                "external_url": url,
                "filename": filename,
            }),
        }
    }

    /// Poll a file upload
    pub fn retrieve_file_upload(upload_id: impl Into<String>) -> Self {
        Self::RetrieveFileUpload {
            upload_id: upload_id.into(),
        }
    }

    /// Get the HTTP method for this request
    pub fn http_method(&self) -> &'static str {
        match self {
            Self::RetrieveDatabase { .. } => "GET",
            Self::QueryDatabase { .. } => "POST",
            Self::CreatePage { .. } => "POST",
            Self::UpdatePage { .. } => "PATCH",
            Self::CreateFileUpload { .. } => "POST",
            Self::RetrieveFileUpload { .. } => "GET",
        }
    }

    /// Path relative to the API root, ids percent-encoded
    pub fn path(&self) -> String {
        match self {
            Self::RetrieveDatabase { database_id } => {
                format!("/databases/{}", urlencoding::encode(database_id))
            }
            Self::QueryDatabase { database_id, .. } => {
                format!("/databases/{}/query", urlencoding::encode(database_id))
            }
            Self::CreatePage { .. } => "/pages".to_string(),
            Self::UpdatePage { page_id, .. } => {
                format!("/pages/{}", urlencoding::encode(page_id))
            }
            Self::CreateFileUpload { .. } => "/file_uploads".to_string(),
            Self::RetrieveFileUpload { upload_id } => {
                format!("/file_uploads/{}", urlencoding::encode(upload_id))
            }
        }
    }

    /// JSON body, if the request carries one
    pub fn body(&self) -> Option<&Value> {
        match self {
            Self::QueryDatabase { body, .. }
            | Self::CreatePage { body }
            | Self::UpdatePage { body, .. }
            | Self::CreateFileUpload { body } => Some(body),
            Self::RetrieveDatabase { .. } | Self::RetrieveFileUpload { .. } => None,
        }
    }

    /// Get the request type as a string
    pub fn operation_type(&self) -> &'static str {
        match self {
            Self::RetrieveDatabase { .. } => "retrieve_database",
            Self::QueryDatabase { .. } => "query_database",
            Self::CreatePage { .. } => "create_page",
            Self::UpdatePage { .. } => "update_page",
            Self::CreateFileUpload { .. } => "create_file_upload",
            Self::RetrieveFileUpload { .. } => "retrieve_file_upload",
        }
    }

    /// Execute this request through a transport
    pub async fn execute(
        &self,
        transport: &dyn crate::api::NotionTransport,
    ) -> anyhow::Result<ApiResponse> {
        transport.execute(self).await
    }
}
