//! Column → property mapping

use serde::{Deserialize, Serialize};

/// Property name standing for the database's title property, whatever it is called
pub const TITLE_PROPERTY: &str = "__TITLE__";

/// How a column's raw cell text is interpreted before mapping
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnRule {
    /// Pass the text through unchanged
    #[default]
    Text,
    /// `44.5`, `44.5%` or `0.445` → fraction in [0, 1]
    Percent,
    /// `H:MM:SS`, `MM:SS` or seconds → whole seconds
    Duration,
    /// Any recognised date → `YYYY-MM-DD`
    Date,
    /// Comma-separated image URLs and/or an `=IMAGE()` formula
    Image,
}

impl ColumnRule {
    pub fn label(&self) -> &'static str {
        match self {
            ColumnRule::Text => "text",
            ColumnRule::Percent => "percent",
            ColumnRule::Duration => "duration",
            ColumnRule::Date => "date",
            ColumnRule::Image => "image",
        }
    }
}

/// One sheet column synced into one Notion property
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnMapping {
    /// Sheet header
    pub header: String,
    /// Notion property name, or `__TITLE__`
    pub property: String,
    #[serde(default)]
    pub rule: ColumnRule,
}

impl ColumnMapping {
    pub fn new(header: impl Into<String>, property: impl Into<String>, rule: ColumnRule) -> Self {
        Self {
            header: header.into(),
            property: property.into(),
            rule,
        }
    }

    /// Property name with the title placeholder resolved
    pub fn target_property<'a>(&'a self, title_property: &'a str) -> &'a str {
        if self.property == TITLE_PROPERTY {
            title_property
        } else {
            &self.property
        }
    }
}

/// Mapping used when the config file has no `[[columns]]`
pub fn default_columns() -> Vec<ColumnMapping> {
    vec![
        ColumnMapping::new("Title", TITLE_PROPERTY, ColumnRule::Text),
        ColumnMapping::new("STR", "STR", ColumnRule::Percent),
        ColumnMapping::new("APV", "APV", ColumnRule::Percent),
        ColumnMapping::new("AVD", "AVD", ColumnRule::Duration),
        ColumnMapping::new("Publish Date", "Publish Date", ColumnRule::Date),
        ColumnMapping::new("Video ID", "Video ID", ColumnRule::Text),
        ColumnMapping::new("Thumbnail", "Thumbnail", ColumnRule::Image),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_property_resolves_title() {
        let mapping = ColumnMapping::new("Title", TITLE_PROPERTY, ColumnRule::Text);
        assert_eq!(mapping.target_property("Name"), "Name");

        let mapping = ColumnMapping::new("STR", "Click rate", ColumnRule::Percent);
        assert_eq!(mapping.target_property("Name"), "Click rate");
    }

    #[test]
    fn test_rule_defaults_to_text() {
        let mapping: ColumnMapping = toml::from_str("header = \"A\"\nproperty = \"B\"").unwrap();
        assert_eq!(mapping.rule, ColumnRule::Text);

        let mapping: ColumnMapping =
            toml::from_str("header = \"A\"\nproperty = \"B\"\nrule = \"duration\"").unwrap();
        assert_eq!(mapping.rule, ColumnRule::Duration);
    }
}
