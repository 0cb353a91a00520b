use scraper::{Html, Selector};
use sadbot_core::truncate_at_boundary;

/// Markup considered when looking for a title, in bytes.
pub const MAX_TITLE_SCAN_BYTES: usize = 50_000;

/// Pulls the first `<title>` out of a document.
///
/// Entities are decoded by the parser, surrounding whitespace is trimmed and
/// inner runs of whitespace collapse to one space. Empty titles and titles
/// that contain replacement characters (undecodable input) are `None`.
/// Markup past `max_bytes` is never looked at.
pub fn extract_title(markup: &str, max_bytes: usize) -> Option<String> {
    let markup = truncate_at_boundary(markup, max_bytes);
    let doc = Html::parse_document(markup);
    let selector = Selector::parse("title").ok()?;
    let raw: String = doc.select(&selector).next()?.text().collect();

    let title = raw.trim();
    if title.is_empty() || title.contains('\u{FFFD}') {
        return None;
    }
    Some(title.split_whitespace().collect::<Vec<_>>().join(" "))
}
