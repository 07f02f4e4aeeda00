//! Configuration
//!
//! A TOML file (default `~/.config/notion-sync/config.toml`) describes the
//! target database, the sheet's special columns and the column → property
//! mapping. `NOTION_TOKEN` and `NOTION_DATABASE_ID` from the environment (or a
//! `.env` file) take precedence over the file.
//!
//! The loaded [`Config`] is validated once and turned into an immutable
//! [`SyncConfig`] that the orchestrator receives by reference.

pub mod columns;

pub use columns::{ColumnMapping, ColumnRule};

use anyhow::{Context, Result, bail};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::api::constants::{DEFAULT_API_VERSION, DEFAULT_BASE_URL};
use crate::api::ResilienceConfig;

pub const TOKEN_ENV: &str = "NOTION_TOKEN";
pub const DATABASE_ENV: &str = "NOTION_DATABASE_ID";

static DATABASE_ID: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)([0-9a-f]{32})$").unwrap());

/// On-disk configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub notion: NotionSection,
    pub sheet: SheetSection,
    pub sync: SyncSection,
    pub columns: Vec<ColumnMapping>,
}

/// `[notion]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotionSection {
    /// Integration token; prefer `NOTION_TOKEN` over storing it here
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    /// Database id, dashed id, or database URL
    pub database_id: String,
    pub api_version: String,
    pub base_url: String,
}

/// `[sheet]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SheetSection {
    pub unique_key_column: String,
    pub page_id_column: String,
    pub error_column: String,
    /// Add the error column when it is missing instead of only using it when present
    pub provision_error_column: bool,
    /// Column holding image URLs or `=IMAGE()` formulas
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_column: Option<String>,
    /// Column holding a video id used to derive a thumbnail URL
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_id_column: Option<String>,
    /// Thumbnail URL with `{id}` standing for the video id
    pub thumbnail_template: String,
}

/// `[sync]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncSection {
    pub row_delay_ms: u64,
    /// Import the cover image into Notion-managed storage as well
    pub import_thumbnails: bool,
    pub upload_poll_attempts: u32,
    pub upload_poll_delay_ms: u64,
}

impl Default for NotionSection {
    fn default() -> Self {
        Self {
            token: None,
            database_id: String::new(),
            api_version: DEFAULT_API_VERSION.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }
}

impl Default for SheetSection {
    fn default() -> Self {
        Self {
            unique_key_column: "Title".to_string(),
            page_id_column: "Notion Page ID".to_string(),
            error_column: "Sync Error".to_string(),
            provision_error_column: false,
            image_column: Some("Thumbnail".to_string()),
            video_id_column: Some("Video ID".to_string()),
            thumbnail_template: "https://i.ytimg.com/vi/{id}/hqdefault.jpg".to_string(),
        }
    }
}

impl Default for SyncSection {
    fn default() -> Self {
        Self {
            row_delay_ms: 350,
            import_thumbnails: true,
            upload_poll_attempts: 6,
            upload_poll_delay_ms: 900,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            notion: NotionSection::default(),
            sheet: SheetSection::default(),
            sync: SyncSection::default(),
            columns: columns::default_columns(),
        }
    }
}

/// Credentials and endpoint for the Notion client
#[derive(Debug, Clone, PartialEq)]
pub struct NotionCredentials {
    pub token: String,
    pub api_version: String,
    pub base_url: String,
}

/// Immutable settings for one sync run
#[derive(Debug, Clone, PartialEq)]
pub struct SyncConfig {
    pub database_id: String,
    pub unique_key_column: String,
    pub page_id_column: String,
    pub error_column: String,
    pub provision_error_column: bool,
    pub image_column: Option<String>,
    pub video_id_column: Option<String>,
    pub thumbnail_template: String,
    pub import_thumbnails: bool,
    pub columns: Vec<ColumnMapping>,
    /// Build and report payloads without writing to Notion or the sheet
    pub dry_run: bool,
}

/// Command-line overrides applied on top of the file
#[derive(Debug, Clone, Default)]
pub struct RunOverrides {
    pub database_id: Option<String>,
    pub dry_run: bool,
    pub no_file_import: bool,
}

impl Config {
    /// Default config location
    pub fn default_path() -> Result<PathBuf> {
        let dir = dirs::config_dir().context("Could not determine the config directory")?;
        Ok(dir.join("notion-sync").join("config.toml"))
    }

    /// Load from `path`, or from the default location when it exists, then
    /// apply environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => {
                let default = Self::default_path()?;
                if default.exists() {
                    Self::from_file(&default)?
                } else {
                    log::debug!("No config at {}, using defaults", default.display());
                    Self::default()
                }
            }
        };

        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Self = toml::from_str(&text)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        log::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Write the default configuration; refuses to overwrite unless `force`
    pub fn write_default(path: &Path, force: bool) -> Result<()> {
        if path.exists() && !force {
            bail!(
                "Config file already exists: {} (use --force to overwrite)",
                path.display()
            );
        }
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let text = toml::to_string_pretty(&Self::default()).context("Failed to render config")?;
        fs::write(path, text).with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(())
    }

    /// Override token and database id from environment variables
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(token) = lookup(TOKEN_ENV).filter(|t| !t.trim().is_empty()) {
            self.notion.token = Some(token.trim().to_string());
        }
        if let Some(id) = lookup(DATABASE_ENV).filter(|t| !t.trim().is_empty()) {
            self.notion.database_id = id.trim().to_string();
        }
    }

    pub fn credentials(&self) -> Result<NotionCredentials> {
        let token = self
            .notion
            .token
            .clone()
            .filter(|t| !t.is_empty())
            .with_context(|| format!("No Notion token configured (set {})", TOKEN_ENV))?;

        Ok(NotionCredentials {
            token,
            api_version: self.notion.api_version.clone(),
            base_url: self.notion.base_url.clone(),
        })
    }

    /// Database id, optionally overridden, normalized from URL/dashed forms
    pub fn database_id(&self, override_id: Option<&str>) -> Result<String> {
        let raw = override_id.unwrap_or(&self.notion.database_id).trim();
        if raw.is_empty() {
            bail!(
                "No Notion database configured (set {} or notion.database_id)",
                DATABASE_ENV
            );
        }
        Ok(normalize_database_id(raw))
    }

    /// Validate and freeze the settings for one run
    pub fn to_sync_config(&self, overrides: &RunOverrides) -> Result<SyncConfig> {
        let database_id = self.database_id(overrides.database_id.as_deref())?;

        if self.sheet.unique_key_column.trim().is_empty() {
            bail!("sheet.unique_key_column must not be empty");
        }
        if self.sheet.page_id_column.trim().is_empty() {
            bail!("sheet.page_id_column must not be empty");
        }
        if self.columns.is_empty() {
            bail!("No [[columns]] mappings configured");
        }
        for mapping in &self.columns {
            if mapping.header.trim().is_empty() || mapping.property.trim().is_empty() {
                bail!("Column mappings need both a header and a property");
            }
        }

        let non_empty = |s: &Option<String>| s.clone().filter(|v| !v.trim().is_empty());

        Ok(SyncConfig {
            database_id,
            unique_key_column: self.sheet.unique_key_column.trim().to_string(),
            page_id_column: self.sheet.page_id_column.trim().to_string(),
            error_column: self.sheet.error_column.trim().to_string(),
            provision_error_column: self.sheet.provision_error_column,
            image_column: non_empty(&self.sheet.image_column),
            video_id_column: non_empty(&self.sheet.video_id_column),
            thumbnail_template: self.sheet.thumbnail_template.clone(),
            import_thumbnails: self.sync.import_thumbnails && !overrides.no_file_import,
            columns: self.columns.clone(),
            dry_run: overrides.dry_run,
        })
    }

    pub fn resilience(&self) -> ResilienceConfig {
        ResilienceConfig::builder()
            .row_delay(Duration::from_millis(self.sync.row_delay_ms))
            .upload_poll_attempts(self.sync.upload_poll_attempts)
            .upload_poll_delay(Duration::from_millis(self.sync.upload_poll_delay_ms))
            .build()
    }
}

/// Accept a bare id, a dashed id, or a database URL and return the 32-char id
pub fn normalize_database_id(raw: &str) -> String {
    let raw = raw.trim();
    let last_segment = raw
        .split('?')
        .next()
        .unwrap_or(raw)
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or(raw);
    let compact = last_segment.replace('-', "");

    match DATABASE_ID.captures(&compact).and_then(|c| c.get(1)) {
        Some(id) => id.as_str().to_lowercase(),
        None => raw.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config_roundtrips_through_toml() {
        let text = toml::to_string_pretty(&Config::default()).unwrap();
        let parsed: Config = toml::from_str(&text).unwrap();
        assert_eq!(parsed, Config::default());
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: Config = toml::from_str(
            r#"
            [notion]
            database_id = "abc"

            [sync]
            row_delay_ms = 0
            "#,
        )
        .unwrap();

        assert_eq!(config.notion.database_id, "abc");
        assert_eq!(config.notion.api_version, DEFAULT_API_VERSION);
        assert_eq!(config.sync.row_delay_ms, 0);
        assert_eq!(config.sync.upload_poll_attempts, 6);
        assert_eq!(config.sheet.page_id_column, "Notion Page ID");
        assert!(!config.columns.is_empty());
    }

    #[test]
    fn test_apply_env_overrides_file() {
        let mut config = Config::default();
        config.notion.database_id = "from-file".into();
        let env: HashMap<&str, &str> =
            HashMap::from([(TOKEN_ENV, " secret_x "), (DATABASE_ENV, "from-env")]);

        config.apply_env(|k| env.get(k).map(|v| v.to_string()));

        assert_eq!(config.notion.token.as_deref(), Some("secret_x"));
        assert_eq!(config.notion.database_id, "from-env");
    }

    #[test]
    fn test_credentials_require_token() {
        let config = Config::default();
        assert!(config.credentials().is_err());
    }

    #[test]
    fn test_normalize_database_id() {
        let id = "0123456789abcdef0123456789abcdef";
        assert_eq!(normalize_database_id(id), id);
        assert_eq!(
            normalize_database_id("01234567-89ab-cdef-0123-456789abcdef"),
            id
        );
        assert_eq!(
            normalize_database_id(&format!("https://www.notion.so/team/Videos-{}?v=123", id)),
            id
        );
        assert_eq!(normalize_database_id("not-an-id"), "not-an-id");
    }

    #[test]
    fn test_to_sync_config_applies_overrides() {
        let mut config = Config::default();
        config.notion.database_id = "db".into();
        config.sheet.video_id_column = Some("  ".into());

        let sync = config
            .to_sync_config(&RunOverrides {
                database_id: Some("other".into()),
                dry_run: true,
                no_file_import: true,
            })
            .unwrap();

        assert_eq!(sync.database_id, "other");
        assert!(sync.dry_run);
        assert!(!sync.import_thumbnails);
        assert_eq!(sync.video_id_column, None);
        assert_eq!(sync.image_column.as_deref(), Some("Thumbnail"));
    }

    #[test]
    fn test_to_sync_config_requires_database() {
        let config = Config::default();
        let err = config.to_sync_config(&RunOverrides::default()).unwrap_err();
        assert!(err.to_string().contains("No Notion database configured"));
    }

    #[test]
    fn test_write_default_refuses_overwrite() {
        let path = std::env::temp_dir().join(format!("notion-sync-config-{}.toml", std::process::id()));
        Config::write_default(&path, true).unwrap();
        assert!(Config::write_default(&path, false).is_err());
        assert_eq!(Config::from_file(&path).unwrap(), Config::default());
        fs::remove_file(path).ok();
    }

    #[test]
    fn test_resilience_from_sync_section() {
        let mut config = Config::default();
        config.sync.row_delay_ms = 10;
        config.sync.upload_poll_attempts = 2;
        let resilience = config.resilience();
        assert_eq!(resilience.pacing.row_delay, Duration::from_millis(10));
        assert_eq!(resilience.upload_poll.max_attempts, 2);
    }
}
