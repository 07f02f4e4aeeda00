//! Notion API constants

/// Default REST endpoint root
pub const DEFAULT_BASE_URL: &str = "https://api.notion.com/v1";

/// API version sent in the `Notion-Version` header
pub const DEFAULT_API_VERSION: &str = "2022-06-28";

/// Header carrying the API version
pub const VERSION_HEADER: &str = "Notion-Version";

/// Request timeout applied to every call
pub const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Mode used when asking Notion to fetch a file from a public URL
pub const EXTERNAL_URL_UPLOAD_MODE: &str = "external_url";
