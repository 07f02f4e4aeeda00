//! Notion database metadata models

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Property types declared by a Notion database
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PropertyType {
    Title,
    RichText,
    Number,
    Url,
    Select,
    MultiSelect,
    Checkbox,
    Date,
    Files,
    /// Any type the sync does not write natively (status, people, relation, ...)
    Other(String),
}

impl PropertyType {
    /// Parse the `type` string of a property definition
    pub fn from_type_name(name: &str) -> Self {
        match name {
            "title" => Self::Title,
            "rich_text" => Self::RichText,
            "number" => Self::Number,
            "url" => Self::Url,
            "select" => Self::Select,
            "multi_select" => Self::MultiSelect,
            "checkbox" => Self::Checkbox,
            "date" => Self::Date,
            "files" => Self::Files,
            other => Self::Other(other.to_string()),
        }
    }

    /// Notion's name for this type
    pub fn type_name(&self) -> &str {
        match self {
            Self::Title => "title",
            Self::RichText => "rich_text",
            Self::Number => "number",
            Self::Url => "url",
            Self::Select => "select",
            Self::MultiSelect => "multi_select",
            Self::Checkbox => "checkbox",
            Self::Date => "date",
            Self::Files => "files",
            Self::Other(name) => name,
        }
    }
}

impl std::fmt::Display for PropertyType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.type_name())
    }
}

/// Property names and types of one database, fetched once per run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseSchema {
    /// Name of the single title-typed property
    pub title_property: String,
    pub properties: BTreeMap<String, PropertyType>,
}

impl DatabaseSchema {
    /// Build a schema from `(name, type)` pairs; `None` without a title property
    pub fn from_properties<I, S>(properties: I) -> Option<Self>
    where
        I: IntoIterator<Item = (S, PropertyType)>,
        S: Into<String>,
    {
        let properties: BTreeMap<String, PropertyType> = properties
            .into_iter()
            .map(|(name, ty)| (name.into(), ty))
            .collect();
        let title_property = properties
            .iter()
            .find(|(_, ty)| **ty == PropertyType::Title)
            .map(|(name, _)| name.clone())?;

        Some(Self {
            title_property,
            properties,
        })
    }

    /// Declared type of a property
    pub fn property_type(&self, name: &str) -> Option<&PropertyType> {
        self.properties.get(name)
    }

    /// Whether `name` exists and is a files property
    pub fn is_files_property(&self, name: &str) -> bool {
        matches!(self.properties.get(name), Some(PropertyType::Files))
    }
}
