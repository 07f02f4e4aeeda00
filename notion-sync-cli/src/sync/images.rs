//! Image URL helpers: validity, `=IMAGE()` formulas, thumbnails and filenames

use once_cell::sync::Lazy;
use regex::Regex;

static HTTP_SCHEME: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^https?://").unwrap());
static IMAGE_EXTENSION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\.(png|jpe?g|gif|webp)$").unwrap());
static THUMBNAIL_HOST: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\.ytimg\.com").unwrap());
// Excel stores IMAGE with the `_xlfn.` future-function prefix
static IMAGE_CALL: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^=(?:_xlfn\.)?IMAGE\(").unwrap());
static IMAGE_FORMULA: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)^=(?:_xlfn\.)?IMAGE\(\s*"([^"]+)""#).unwrap());
static UNSAFE_FILENAME_CHARS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^A-Za-z0-9_.-]+").unwrap());

const MAX_FILENAME_LEN: usize = 100;

/// Placeholder in the thumbnail template replaced by the video id
pub const VIDEO_ID_PLACEHOLDER: &str = "{id}";

/// Strip the query string
fn without_query(url: &str) -> &str {
    url.split('?').next().unwrap_or(url)
}

/// An `http(s)` URL that either ends in a known image extension or points at
/// a known thumbnail host
pub fn is_valid_image_url(url: &str) -> bool {
    let url = url.trim();
    if url.is_empty() || !HTTP_SCHEME.is_match(url) {
        return false;
    }
    IMAGE_EXTENSION.is_match(without_query(url)) || THUMBNAIL_HOST.is_match(url)
}

/// Whether a formula is an image-embedding formula
pub fn is_image_formula(formula: &str) -> bool {
    IMAGE_CALL.is_match(formula.trim())
}

/// Extract the URL argument of `=IMAGE("url", ...)`
pub fn parse_image_formula(formula: &str) -> Option<String> {
    IMAGE_FORMULA
        .captures(formula.trim())
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Fill the thumbnail template with a video id; `None` for an empty id
pub fn thumbnail_url(template: &str, video_id: &str) -> Option<String> {
    let video_id = video_id.trim();
    if video_id.is_empty() {
        return None;
    }
    Some(template.replace(VIDEO_ID_PLACEHOLDER, video_id))
}

/// Display name of an external file: last path segment, or `image`
pub fn file_name_from_url(url: &str) -> String {
    without_query(url)
        .rsplit('/')
        .next()
        .filter(|s| !s.is_empty())
        .unwrap_or("image")
        .to_string()
}

/// Lowercased image extension of a URL (`jpg` becomes `jpeg`), or `default`
pub fn extension_from_url(url: &str, default: &str) -> String {
    match IMAGE_EXTENSION.captures(without_query(url)).and_then(|c| c.get(1)) {
        Some(ext) => ext.as_str().to_lowercase().replace("jpg", "jpeg"),
        None => default.to_string(),
    }
}

/// Replace unsafe runs with `_`, cap the length and ensure the extension
pub fn sanitize_filename(name: &str, extension: &str) -> String {
    let name = if name.is_empty() { "thumb" } else { name };
    let base: String = UNSAFE_FILENAME_CHARS
        .replace_all(name, "_")
        .chars()
        .take(MAX_FILENAME_LEN)
        .collect();
    let suffix = format!(".{}", extension);
    if base.ends_with(&suffix) {
        base
    } else {
        format!("{}{}", base, suffix)
    }
}
