//! Upsert orchestration
//!
//! Rows are processed strictly one after another. For each row the core path
//! (identity lookup, create or update) decides success or failure; the cover
//! patch and the thumbnail import that follow are best-effort and only ever
//! log.
//!
//! A page is always created with properties alone. Its cover is set by a
//! second request once the page exists.

use anyhow::{Context, Result, bail};
use log::{debug, info, warn};
use serde_json::{Map, Value};

use crate::api::{
    DatabaseSchema, NotionRequest, NotionTransport, ResilienceConfig, fetch_schema,
};
use crate::config::{ColumnRule, SyncConfig};
use crate::sheet::{Sheet, SheetStore};

use super::images::{extension_from_url, is_valid_image_url, sanitize_filename, thumbnail_url};
use super::normalize::{NormalizedValue, normalize};
use super::properties::{ResolvedColumn, UnresolvedColumn, build_properties, resolve_columns};
use super::report::{RowOutcome, RowStatus, SyncReport};
use super::thumbnail::import_thumbnail;

const DEFAULT_THUMBNAIL_EXTENSION: &str = "jpg";

/// Column positions and property targets fixed for a whole run
#[derive(Debug, Clone)]
struct SheetLayout {
    key: usize,
    page_id: Option<usize>,
    error: Option<usize>,
    image: Option<usize>,
    video_id: Option<usize>,
    /// Files property fed by the image column, if the schema has one
    image_files_property: Option<String>,
    title_property: String,
    columns: Vec<ResolvedColumn>,
}

/// Drives one sync run against a database
pub struct SyncRunner<'a> {
    transport: &'a dyn NotionTransport,
    config: &'a SyncConfig,
    resilience: &'a ResilienceConfig,
}

impl<'a> SyncRunner<'a> {
    pub fn new(
        transport: &'a dyn NotionTransport,
        config: &'a SyncConfig,
        resilience: &'a ResilienceConfig,
    ) -> Self {
        Self {
            transport,
            config,
            resilience,
        }
    }

    /// Fetch the schema, then sync every row of the store
    pub async fn run(&self, store: &mut dyn SheetStore) -> Result<SyncReport> {
        let schema = fetch_schema(self.transport, &self.config.database_id).await?;
        self.run_with_schema(store, &schema).await
    }

    pub async fn run_with_schema(
        &self,
        store: &mut dyn SheetStore,
        schema: &DatabaseSchema,
    ) -> Result<SyncReport> {
        let (layout, unresolved) = self.prepare(store, schema)?;
        for column in &unresolved {
            warn!("Ignoring mapping: {}", column);
        }

        let row_count = store.sheet().row_count();
        info!(
            "Syncing {} rows of '{}' into database {}",
            row_count,
            store.sheet().name,
            self.config.database_id
        );

        let mut report = SyncReport {
            unresolved,
            dry_run: self.config.dry_run,
            ..Default::default()
        };
        for row in 0..row_count {
            let outcome = self.sync_row(store, row, &layout).await;
            let skipped = outcome.status == RowStatus::Skipped;
            report.outcomes.push(outcome);

            if !skipped && !self.config.dry_run {
                if let Some(delay) = self.resilience.pacing.delay() {
                    tokio::time::sleep(delay).await;
                }
            }
        }

        info!("Sync finished: {}", report.summary());
        Ok(report)
    }

    /// Locate special columns, adding the ones that must exist
    fn prepare(
        &self,
        store: &mut dyn SheetStore,
        schema: &DatabaseSchema,
    ) -> Result<(SheetLayout, Vec<UnresolvedColumn>)> {
        let config = self.config;

        let Some(key) = store.sheet().column_index(&config.unique_key_column) else {
            bail!(
                "Unique key column '{}' not found in sheet '{}'",
                config.unique_key_column,
                store.sheet().name
            );
        };

        let page_id = if config.dry_run {
            store.sheet().column_index(&config.page_id_column)
        } else {
            Some(
                store
                    .ensure_column(&config.page_id_column)
                    .with_context(|| format!("Failed to add column '{}'", config.page_id_column))?,
            )
        };

        let error = if config.error_column.is_empty() {
            None
        } else if config.provision_error_column && !config.dry_run {
            Some(
                store
                    .ensure_column(&config.error_column)
                    .with_context(|| format!("Failed to add column '{}'", config.error_column))?,
            )
        } else {
            store.sheet().column_index(&config.error_column)
        };

        let sheet = store.sheet();
        let image = config.image_column.as_deref().and_then(|h| sheet.column_index(h));
        let video_id = config
            .video_id_column
            .as_deref()
            .and_then(|h| sheet.column_index(h));

        let image_files_property = config.image_column.as_deref().and_then(|header| {
            config
                .columns
                .iter()
                .find(|m| m.header.trim() == header.trim())
                .map(|m| m.target_property(&schema.title_property).to_string())
                .filter(|property| schema.is_files_property(property))
        });

        let (columns, unresolved) = resolve_columns(sheet, &config.columns, schema);

        let layout = SheetLayout {
            key,
            page_id,
            error,
            image,
            video_id,
            image_files_property,
            title_property: schema.title_property.clone(),
            columns,
        };
        Ok((layout, unresolved))
    }

    async fn sync_row(
        &self,
        store: &mut dyn SheetStore,
        row: usize,
        layout: &SheetLayout,
    ) -> RowOutcome {
        let row_number = Sheet::display_row(row);
        let sheet = store.sheet();
        let key = sheet.cell_text(row, layout.key).trim().to_string();

        if key.is_empty() {
            debug!("Row {}: empty key, skipped", row_number);
            return RowOutcome {
                row_number,
                key,
                status: RowStatus::Skipped,
            };
        }

        let cover = self.cover_candidate(sheet, row, layout);
        let properties = build_properties(sheet, row, &layout.columns);

        if self.config.dry_run {
            info!("Row {} ({}): would send {} properties", row_number, key, properties.len());
            return RowOutcome {
                row_number,
                key,
                status: RowStatus::Planned { properties, cover },
            };
        }

        let stored_id = layout
            .page_id
            .map(|col| sheet.cell_text(row, col).trim().to_string())
            .filter(|id| !id.is_empty());
        let stale_error = layout
            .error
            .filter(|col| !sheet.cell_text(row, *col).trim().is_empty());

        let status = match self.upsert(store, row, &key, stored_id, properties, layout).await {
            Ok(status) => status,
            Err(e) => {
                let error = format!("{:#}", e);
                warn!("Row {} ({}) failed: {}", row_number, key, error);
                if let Some(col) = layout.error {
                    if let Err(write_err) = store.write_cell(row, col, &error) {
                        warn!("Could not record error for row {}: {:#}", row_number, write_err);
                    }
                }
                return RowOutcome {
                    row_number,
                    key,
                    status: RowStatus::Failed { error },
                };
            }
        };

        if let Some(col) = stale_error {
            if let Err(e) = store.write_cell(row, col, "") {
                warn!("Could not clear error for row {}: {:#}", row_number, e);
            }
        }

        if let (Some(page_id), Some(cover)) = (status.page_id(), cover.as_deref()) {
            self.patch_external_cover(page_id, cover).await;
            if self.config.import_thumbnails {
                self.import_cover(page_id, &key, cover, layout).await;
            }
        }

        info!("Row {} ({}): {:?}", row_number, key, status);
        RowOutcome {
            row_number,
            key,
            status,
        }
    }

    /// First image URL of the row, else the thumbnail of its video id
    fn cover_candidate(&self, sheet: &Sheet, row: usize, layout: &SheetLayout) -> Option<String> {
        if let Some(cell) = layout.image.and_then(|col| sheet.cell(row, col)) {
            if let NormalizedValue::Images(urls) = normalize(ColumnRule::Image, cell) {
                if let Some(url) = urls.into_iter().next() {
                    return Some(url);
                }
            }
        }

        let video_id = sheet.cell_text(row, layout.video_id?);
        thumbnail_url(&self.config.thumbnail_template, video_id).filter(|url| is_valid_image_url(url))
    }

    /// Core path: resolve identity, then create or update
    async fn upsert(
        &self,
        store: &mut dyn SheetStore,
        row: usize,
        key: &str,
        stored_id: Option<String>,
        properties: Map<String, Value>,
        layout: &SheetLayout,
    ) -> Result<RowStatus> {
        let existing = match stored_id {
            Some(id) => Some(id),
            None => self.find_page(&layout.title_property, key).await?,
        };

        if let Some(page_id) = existing {
            NotionRequest::update_properties(page_id.clone(), properties)
                .execute(self.transport)
                .await
                .context("Update request failed")?
                .require_success("Update")?;
            return Ok(RowStatus::Updated { page_id });
        }

        let body = NotionRequest::create_page(&self.config.database_id, properties)
            .execute(self.transport)
            .await
            .context("Create request failed")?
            .require_success("Create")?;
        let page_id = body
            .get("id")
            .and_then(Value::as_str)
            .filter(|id| !id.is_empty())
            .context("Create response has no page id")?
            .to_string();

        let col = layout
            .page_id
            .context("No page id column to record the new page")?;
        store
            .write_cell(row, col, &page_id)
            .with_context(|| format!("Created page {} but could not store its id", page_id))?;

        Ok(RowStatus::Created { page_id })
    }

    /// Id of the page whose title equals `key`, if any
    async fn find_page(&self, title_property: &str, key: &str) -> Result<Option<String>> {
        let body = NotionRequest::find_by_title(&self.config.database_id, title_property, key)
            .execute(self.transport)
            .await
            .context("Query request failed")?
            .require_success("Query")?;

        Ok(body
            .get("results")
            .and_then(Value::as_array)
            .and_then(|results| results.first())
            .and_then(|page| page.get("id"))
            .and_then(Value::as_str)
            .map(str::to_string))
    }

    async fn patch_external_cover(&self, page_id: &str, url: &str) {
        match NotionRequest::set_external_cover(page_id, url)
            .execute(self.transport)
            .await
        {
            Ok(response) if response.is_success() => debug!("Cover set on {}", page_id),
            Ok(response) => warn!(
                "Cover patch for {} failed ({}): {}",
                page_id,
                response.status,
                response.body_text()
            ),
            Err(e) => warn!("Cover patch for {} failed: {:#}", page_id, e),
        }
    }

    /// Import the cover into Notion storage and attach it as cover and file
    async fn import_cover(&self, page_id: &str, key: &str, url: &str, layout: &SheetLayout) {
        let extension = extension_from_url(url, DEFAULT_THUMBNAIL_EXTENSION);
        let filename = sanitize_filename(&format!("thumb-{}", key), &extension);

        let Some(upload_id) =
            import_thumbnail(self.transport, url, &filename, &self.resilience.upload_poll).await
        else {
            return;
        };

        let request = NotionRequest::attach_upload(
            page_id,
            &upload_id,
            &filename,
            layout.image_files_property.as_deref(),
        );
        match request.execute(self.transport).await {
            Ok(response) if response.is_success() => {
                debug!("Attached upload {} to {}", upload_id, page_id)
            }
            Ok(response) => warn!(
                "Attaching upload {} to {} failed ({}): {}",
                upload_id,
                page_id,
                response.status,
                response.body_text()
            ),
            Err(e) => warn!("Attaching upload {} to {} failed: {:#}", upload_id, page_id, e),
        }
    }
}
