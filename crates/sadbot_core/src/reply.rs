/// Longest prefix of `text` that is at most `max_bytes` long and ends on a
/// character boundary.
pub fn truncate_at_boundary(text: &str, max_bytes: usize) -> &str {
    if text.len() <= max_bytes {
        return text;
    }
    let mut end = max_bytes;
    while end > 0 && !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

/// Formats a link preview as `<title> (<host> / <nick>)`, shortening only the
/// title so the whole line fits in `split_len` bytes.
///
/// Returns `None` when the suffix leaves no room for any of the title.
pub fn format_preview(
    title: &str,
    host: &str,
    requester: Option<&str>,
    split_len: usize,
) -> Option<String> {
    let suffix = match requester {
        Some(nick) => format!(" ({host} / {nick})"),
        None => format!(" ({host})"),
    };
    let budget = split_len.checked_sub(suffix.len())?;
    let title = truncate_at_boundary(title, budget).trim_end();
    if title.is_empty() {
        return None;
    }
    Some(format!("{title}{suffix}"))
}

/// Breaks an outgoing message into transport lines of at most `split_len`
/// bytes, preferring to break on spaces.
pub fn split_for_transport(text: &str, split_len: usize) -> Vec<&str> {
    let mut lines = Vec::new();
    let mut rest = text;
    while rest.len() > split_len {
        let window = truncate_at_boundary(rest, split_len);
        if window.is_empty() {
            // a single character wider than the limit
            let width = rest.chars().next().map_or(rest.len(), char::len_utf8);
            lines.push(&rest[..width]);
            rest = &rest[width..];
            continue;
        }
        match window.rfind(' ') {
            Some(idx) if idx > 0 => {
                lines.push(&window[..idx]);
                rest = &rest[idx + 1..];
            }
            _ => {
                lines.push(window);
                rest = &rest[window.len()..];
            }
        }
    }
    if !rest.is_empty() {
        lines.push(rest);
    }
    lines
}
