//! Row normalization: raw cell text (and formula) → typed value

use chrono::{DateTime, NaiveDate, NaiveDateTime};

use crate::config::ColumnRule;
use crate::sheet::Cell;

use super::images::{is_image_formula, is_valid_image_url, parse_image_formula};

/// Date-only layouts tried in order
const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%m/%d/%Y",
    "%d.%m.%Y",
    "%b %d, %Y",
    "%B %d, %Y",
    "%d %b %Y",
    "%d %B %Y",
];

/// Date-time layouts whose date part is kept
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

/// A cell value after column rules have been applied
#[derive(Debug, Clone, PartialEq)]
pub enum NormalizedValue {
    /// Nothing usable; clears the target property
    Absent,
    Number(f64),
    /// Whole seconds
    Seconds(i64),
    Date(NaiveDate),
    /// Validated image URLs, formula URL first
    Images(Vec<String>),
    Text(String),
}

impl NormalizedValue {
    /// Text form used for text-like properties
    pub fn as_text(&self) -> Option<String> {
        match self {
            NormalizedValue::Absent => None,
            NormalizedValue::Number(n) => Some(n.to_string()),
            NormalizedValue::Seconds(s) => Some(s.to_string()),
            NormalizedValue::Date(d) => Some(d.format("%Y-%m-%d").to_string()),
            NormalizedValue::Images(urls) => Some(urls.join(",")),
            NormalizedValue::Text(s) => Some(s.clone()),
        }
    }

    /// Numeric form used for number properties
    pub fn as_number(&self) -> Option<f64> {
        match self {
            NormalizedValue::Number(n) => Some(*n),
            NormalizedValue::Seconds(s) => Some(*s as f64),
            NormalizedValue::Text(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
            _ => None,
        }
    }
}

/// Apply a column rule to a cell
pub fn normalize(rule: ColumnRule, cell: &Cell) -> NormalizedValue {
    let raw = cell.value.trim();

    if rule == ColumnRule::Image {
        let urls = image_urls(raw, cell.formula.as_deref());
        return if urls.is_empty() {
            NormalizedValue::Absent
        } else {
            NormalizedValue::Images(urls)
        };
    }

    if raw.is_empty() {
        return NormalizedValue::Absent;
    }

    let value = match rule {
        ColumnRule::Percent => parse_percent(raw).map(NormalizedValue::Number),
        ColumnRule::Duration => parse_duration(raw).map(NormalizedValue::Seconds),
        ColumnRule::Date => parse_date(raw).map(NormalizedValue::Date),
        ColumnRule::Text | ColumnRule::Image => Some(NormalizedValue::Text(raw.to_string())),
    };
    value.unwrap_or(NormalizedValue::Absent)
}

/// `44.5%`, `44.5` and `0.445` all become 0.445; values above 1 are percentages
pub fn parse_percent(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .chars()
        .filter(|c| *c != '%' && *c != ',' && !c.is_whitespace())
        .collect();
    let value = cleaned.parse::<f64>().ok().filter(|n| n.is_finite())?;
    Some(if value > 1.0 { value / 100.0 } else { value })
}

/// `H:MM:SS`, `MM:SS` or a plain number of seconds
pub fn parse_duration(raw: &str) -> Option<i64> {
    let raw = raw.trim();

    if raw.contains(':') {
        let parts: Option<Vec<f64>> = raw
            .split(':')
            .map(|p| p.trim().parse::<f64>().ok().filter(|n| n.is_finite()))
            .collect();
        let seconds = match parts?.as_slice() {
            [h, m, s] => h * 3600.0 + m * 60.0 + s,
            [m, s] => m * 60.0 + s,
            _ => return None,
        };
        return Some(seconds.round() as i64);
    }

    raw.parse::<f64>()
        .ok()
        .filter(|n| n.is_finite())
        .map(|n| n.round() as i64)
}

/// Calendar date of the text as written, in any supported layout
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();

    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(raw, format) {
            return Some(date);
        }
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_local().date());
    }

    for format in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(dt.date());
        }
    }

    None
}

/// Comma-separated URLs of a cell, preceded by the `=IMAGE()` URL if any,
/// keeping only valid image URLs
pub fn image_urls(raw: &str, formula: Option<&str>) -> Vec<String> {
    let mut candidates: Vec<String> = raw
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();

    if let Some(url) = formula
        .filter(|f| is_image_formula(f))
        .and_then(parse_image_formula)
    {
        candidates.insert(0, url);
    }

    let mut urls: Vec<String> = Vec::with_capacity(candidates.len());
    for url in candidates {
        if is_valid_image_url(&url) && !urls.contains(&url) {
            urls.push(url);
        }
    }
    urls
}
