//! Database schema retrieval

pub mod models;

pub use models::{DatabaseSchema, PropertyType};

use anyhow::{Context, Result, anyhow};
use log::info;
use serde_json::Value;

use crate::api::{NotionRequest, NotionTransport};

/// Fetch the property schema of a database.
///
/// A non-success status aborts the run; there is no retry.
pub async fn fetch_schema(
    transport: &dyn NotionTransport,
    database_id: &str,
) -> Result<DatabaseSchema> {
    let body = NotionRequest::retrieve_database(database_id)
        .execute(transport)
        .await
        .context("Schema fetch failed")?
        .require_success("Schema fetch")?;

    let schema = parse_database(&body)?;
    info!(
        "Fetched schema for database {}: {} properties, title property '{}'",
        database_id,
        schema.properties.len(),
        schema.title_property
    );
    Ok(schema)
}

/// Parse the `properties` object of a database response
pub fn parse_database(body: &Value) -> Result<DatabaseSchema> {
    let properties = body
        .get("properties")
        .and_then(Value::as_object)
        .context("Database response has no properties object")?;

    let parsed = properties.iter().map(|(name, def)| {
        let type_name = def.get("type").and_then(Value::as_str).unwrap_or_default();
        (name.clone(), PropertyType::from_type_name(type_name))
    });

    DatabaseSchema::from_properties(parsed)
        .ok_or_else(|| anyhow!("Database has no title property"))
}
