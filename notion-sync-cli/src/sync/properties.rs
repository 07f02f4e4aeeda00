//! Property mapping: normalized values → Notion property payloads
//!
//! Dispatch is a closed match over [`PropertyType`]. Types the sync has no
//! native payload for fall back to rich text through an explicit arm.

use serde_json::{Map, Value, json};

use crate::api::{DatabaseSchema, PropertyType};
use crate::config::{ColumnMapping, ColumnRule};
use crate::sheet::Sheet;

use super::images::file_name_from_url;
use super::normalize::{NormalizedValue, normalize};

/// A mapped column matched against both the sheet and the schema
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedColumn {
    pub column: usize,
    pub property: String,
    pub property_type: PropertyType,
    pub rule: ColumnRule,
}

/// Mapped columns that could not be used, reported once per run
#[derive(Debug, Clone, PartialEq)]
pub enum UnresolvedColumn {
    /// The header is not in the sheet
    MissingHeader { header: String },
    /// The property is not in the database
    MissingProperty { header: String, property: String },
}

impl std::fmt::Display for UnresolvedColumn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UnresolvedColumn::MissingHeader { header } => {
                write!(f, "column '{}' is not in the sheet", header)
            }
            UnresolvedColumn::MissingProperty { header, property } => write!(
                f,
                "column '{}' maps to '{}', which is not a database property",
                header, property
            ),
        }
    }
}

/// Match column mappings to sheet columns and schema properties
pub fn resolve_columns(
    sheet: &Sheet,
    mappings: &[ColumnMapping],
    schema: &DatabaseSchema,
) -> (Vec<ResolvedColumn>, Vec<UnresolvedColumn>) {
    let mut resolved = Vec::new();
    let mut unresolved = Vec::new();

    for mapping in mappings {
        let Some(column) = sheet.column_index(&mapping.header) else {
            unresolved.push(UnresolvedColumn::MissingHeader {
                header: mapping.header.clone(),
            });
            continue;
        };

        let property = mapping.target_property(&schema.title_property);
        let Some(property_type) = schema.property_type(property) else {
            unresolved.push(UnresolvedColumn::MissingProperty {
                header: mapping.header.clone(),
                property: property.to_string(),
            });
            continue;
        };

        resolved.push(ResolvedColumn {
            column,
            property: property.to_string(),
            property_type: property_type.clone(),
            rule: mapping.rule,
        });
    }

    (resolved, unresolved)
}

/// Normalize and map every resolved column of one row
pub fn build_properties(sheet: &Sheet, row: usize, columns: &[ResolvedColumn]) -> Map<String, Value> {
    let mut properties = Map::new();
    for column in columns {
        let cell = sheet.cell(row, column.column).cloned().unwrap_or_default();
        let value = normalize(column.rule, &cell);
        properties.insert(
            column.property.clone(),
            property_payload(&value, &column.property_type),
        );
    }
    properties
}

/// A single rich-text run
fn text_run(content: &str) -> Value {
    json!([{ "text": { "content": content } }])
}

/// Payload for one property of the given type
pub fn property_payload(value: &NormalizedValue, property_type: &PropertyType) -> Value {
    if let PropertyType::Files = property_type {
        let files: Vec<Value> = match value {
            NormalizedValue::Images(urls) => urls
                .iter()
                .map(|url| {
                    json!({
                        "type": "external",
                        "name": file_name_from_url(url),
                        "external": { "url": url }
                    })
                })
                .collect(),
            _ => Vec::new(),
        };
        return json!({ "files": files });
    }

    let Some(text) = value.as_text() else {
        return clear_payload(property_type);
    };

    match property_type {
        PropertyType::Title => json!({ "title": text_run(&text) }),
        PropertyType::RichText => json!({ "rich_text": text_run(&text) }),
        PropertyType::Number => json!({ "number": value.as_number() }),
        PropertyType::Url => json!({ "url": text }),
        PropertyType::Select => json!({ "select": { "name": text } }),
        PropertyType::MultiSelect => json!({ "multi_select": multi_select_options(&text) }),
        PropertyType::Checkbox => json!({ "checkbox": is_checked(&text) }),
        PropertyType::Date => json!({ "date": { "start": text } }),
        PropertyType::Files => json!({ "files": [] }),
        PropertyType::Other(type_name) => {
            log::debug!("Writing unsupported property type '{}' as rich text", type_name);
            json!({ "rich_text": text_run(&text) })
        }
    }
}

/// Payload that clears a property on update
pub fn clear_payload(property_type: &PropertyType) -> Value {
    match property_type {
        PropertyType::Title => json!({ "title": [] }),
        PropertyType::RichText => json!({ "rich_text": [] }),
        PropertyType::Number => json!({ "number": null }),
        PropertyType::Url => json!({ "url": null }),
        PropertyType::Select => json!({ "select": null }),
        PropertyType::MultiSelect => json!({ "multi_select": [] }),
        PropertyType::Checkbox => json!({ "checkbox": false }),
        PropertyType::Date => json!({ "date": null }),
        PropertyType::Files => json!({ "files": [] }),
        PropertyType::Other(_) => json!({ "rich_text": [] }),
    }
}

fn is_checked(text: &str) -> bool {
    matches!(text.trim().to_lowercase().as_str(), "true" | "yes")
}

/// Distinct, non-empty comma-separated option names
fn multi_select_options(text: &str) -> Vec<Value> {
    let mut names: Vec<&str> = Vec::new();
    for name in text.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        if !names.contains(&name) {
            names.push(name);
        }
    }
    names.into_iter().map(|name| json!({ "name": name })).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::columns::default_columns;
    use crate::sheet::Cell;

    fn text(s: &str) -> NormalizedValue {
        NormalizedValue::Text(s.to_string())
    }

    #[test]
    fn test_files_payload() {
        let value = NormalizedValue::Images(vec![
            "https://x.com/a.png".into(),
            "https://i.ytimg.com/vi/abc/".into(),
        ]);
        let payload = property_payload(&value, &PropertyType::Files);
        assert_eq!(
            payload,
            json!({"files": [
                {"type": "external", "name": "a.png", "external": {"url": "https://x.com/a.png"}},
                {"type": "external", "name": "image", "external": {"url": "https://i.ytimg.com/vi/abc/"}}
            ]})
        );
    }

    #[test]
    fn test_absent_files_is_empty_list() {
        assert_eq!(
            property_payload(&NormalizedValue::Absent, &PropertyType::Files),
            json!({"files": []})
        );
        assert_eq!(property_payload(&text("x"), &PropertyType::Files), json!({"files": []}));
    }

    #[test]
    fn test_absent_clears_each_type() {
        let absent = NormalizedValue::Absent;
        assert_eq!(property_payload(&absent, &PropertyType::Title), json!({"title": []}));
        assert_eq!(property_payload(&absent, &PropertyType::Number), json!({"number": null}));
        assert_eq!(property_payload(&absent, &PropertyType::Date), json!({"date": null}));
        assert_eq!(property_payload(&absent, &PropertyType::Select), json!({"select": null}));
        assert_eq!(property_payload(&absent, &PropertyType::Checkbox), json!({"checkbox": false}));
        assert_eq!(
            property_payload(&absent, &PropertyType::Other("status".into())),
            json!({"rich_text": []})
        );
    }

    #[test]
    fn test_text_types() {
        assert_eq!(
            property_payload(&text("Episode 1"), &PropertyType::Title),
            json!({"title": [{"text": {"content": "Episode 1"}}]})
        );
        assert_eq!(
            property_payload(&text("abc"), &PropertyType::RichText),
            json!({"rich_text": [{"text": {"content": "abc"}}]})
        );
        assert_eq!(
            property_payload(&text("https://x.com"), &PropertyType::Url),
            json!({"url": "https://x.com"})
        );
        assert_eq!(
            property_payload(&text("Live"), &PropertyType::Select),
            json!({"select": {"name": "Live"}})
        );
    }

    #[test]
    fn test_number_coercion() {
        assert_eq!(
            property_payload(&NormalizedValue::Number(0.445), &PropertyType::Number),
            json!({"number": 0.445})
        );
        assert_eq!(
            property_payload(&NormalizedValue::Seconds(3723), &PropertyType::Number),
            json!({"number": 3723.0})
        );
        assert_eq!(property_payload(&text("abc"), &PropertyType::Number), json!({"number": null}));
    }

    #[test]
    fn test_checkbox() {
        for truthy in ["true", "TRUE", "yes", " Yes "] {
            assert_eq!(property_payload(&text(truthy), &PropertyType::Checkbox), json!({"checkbox": true}));
        }
        for falsy in ["false", "no", "1", "x"] {
            assert_eq!(property_payload(&text(falsy), &PropertyType::Checkbox), json!({"checkbox": false}));
        }
    }

    #[test]
    fn test_multi_select_splits_and_dedupes() {
        assert_eq!(
            property_payload(&text("a, b,, a ,c"), &PropertyType::MultiSelect),
            json!({"multi_select": [{"name": "a"}, {"name": "b"}, {"name": "c"}]})
        );
    }

    #[test]
    fn test_date_payload() {
        let date = NormalizedValue::Date(chrono::NaiveDate::from_ymd_opt(2024, 3, 5).unwrap());
        assert_eq!(
            property_payload(&date, &PropertyType::Date),
            json!({"date": {"start": "2024-03-05"}})
        );
    }

    #[test]
    fn test_unrecognized_type_falls_back_to_rich_text() {
        assert_eq!(
            property_payload(&text("Done"), &PropertyType::Other("status".into())),
            json!({"rich_text": [{"text": {"content": "Done"}}]})
        );
    }

    #[test]
    fn test_resolve_and_build_properties() {
        let schema = DatabaseSchema::from_properties([
            ("Name", PropertyType::Title),
            ("STR", PropertyType::Number),
            ("AVD", PropertyType::Number),
            ("Thumbnail", PropertyType::Files),
        ])
        .unwrap();
        let sheet = Sheet::new(
            "s",
            vec!["Title".into(), "STR".into(), "AVD".into(), "Thumbnail".into(), "APV".into()],
            vec![vec![
                Cell::text("Episode 1"),
                Cell::text("44.5%"),
                Cell::text("1:02:03"),
                Cell::formula(r#"=IMAGE("https://x.com/a.png")"#),
                Cell::text("12"),
            ]],
        );

        let (columns, unresolved) = resolve_columns(&sheet, &default_columns(), &schema);

        assert_eq!(columns.len(), 4);
        assert!(unresolved.contains(&UnresolvedColumn::MissingProperty {
            header: "APV".into(),
            property: "APV".into()
        }));
        assert!(unresolved.contains(&UnresolvedColumn::MissingHeader {
            header: "Publish Date".into()
        }));

        let properties = build_properties(&sheet, 0, &columns);
        assert_eq!(properties["Name"], json!({"title": [{"text": {"content": "Episode 1"}}]}));
        assert_eq!(properties["STR"], json!({"number": 0.445}));
        assert_eq!(properties["AVD"], json!({"number": 3723.0}));
        assert_eq!(properties["Thumbnail"]["files"][0]["external"]["url"], "https://x.com/a.png");
        assert!(!properties.contains_key("APV"));
    }
}
