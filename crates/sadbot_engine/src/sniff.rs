/// Bytes of body inspected when the server did not declare a media type.
pub const SNIFF_LEN: usize = 512;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    Html,
    Other,
}

/// Decides whether a response is worth parsing for a title.
///
/// A declared media type is trusted as-is; otherwise the body prefix is
/// sniffed. Either way the verdict is "contains `text/html`".
pub fn classify(declared: Option<&str>, prefix: &[u8]) -> ContentKind {
    let media_type = match declared.map(str::trim) {
        Some(declared) if !declared.is_empty() => declared,
        _ => sniff_media_type(prefix),
    };
    if media_type.to_ascii_lowercase().contains("text/html") {
        ContentKind::Html
    } else {
        ContentKind::Other
    }
}

// Tags that mark a document as HTML when they open it (after whitespace) and
// are followed by a space or `>`.
const HTML_SIGNATURES: &[&[u8]] = &[
    b"<!DOCTYPE HTML",
    b"<HTML",
    b"<HEAD",
    b"<SCRIPT",
    b"<IFRAME",
    b"<H1",
    b"<DIV",
    b"<FONT",
    b"<TABLE",
    b"<A",
    b"<STYLE",
    b"<TITLE",
    b"<B",
    b"<BODY",
    b"<BR",
    b"<P",
    b"<!--",
];

const EXACT_SIGNATURES: &[(&[u8], &str)] = &[
    (b"%PDF-", "application/pdf"),
    (b"%!PS-Adobe-", "application/postscript"),
    (b"\xFE\xFF", "text/plain; charset=utf-16be"),
    (b"\xFF\xFE", "text/plain; charset=utf-16le"),
    (b"\xEF\xBB\xBF", "text/plain; charset=utf-8"),
    (b"\x00\x00\x01\x00", "image/x-icon"),
    (b"\x00\x00\x02\x00", "image/x-icon"),
    (b"BM", "image/bmp"),
    (b"GIF87a", "image/gif"),
    (b"GIF89a", "image/gif"),
    (b"\x89PNG\x0D\x0A\x1A\x0A", "image/png"),
    (b"\xFF\xD8\xFF", "image/jpeg"),
    (b"OggS\x00", "application/ogg"),
    (b"ID3", "audio/mpeg"),
    (b"wOFF", "font/woff"),
    (b"wOF2", "font/woff2"),
    (b"\x1F\x8B\x08", "application/x-gzip"),
    (b"PK\x03\x04", "application/zip"),
    (b"Rar!\x1A\x07\x00", "application/x-rar-compressed"),
    (b"Rar!\x1A\x07\x01\x00", "application/x-rar-compressed"),
    (b"\x00asm", "application/wasm"),
];

/// Best-guess media type for a body prefix, following the signature table
/// browsers use. Never fails; unknown binary data is `application/octet-stream`.
pub fn sniff_media_type(prefix: &[u8]) -> &'static str {
    let data = &prefix[..prefix.len().min(SNIFF_LEN)];
    let first_non_ws = data
        .iter()
        .position(|b| !matches!(b, b'\t' | b'\n' | b'\x0C' | b'\r' | b' '))
        .unwrap_or(data.len());
    let trimmed = &data[first_non_ws..];

    if HTML_SIGNATURES.iter().any(|sig| html_signature_matches(trimmed, sig)) {
        return "text/html; charset=utf-8";
    }
    if trimmed.starts_with(b"<?xml") {
        return "text/xml; charset=utf-8";
    }
    if let Some((_, media_type)) = EXACT_SIGNATURES
        .iter()
        .find(|(sig, _)| data.starts_with(sig))
    {
        return *media_type;
    }
    if data.len() >= 14 && &data[..4] == b"RIFF" && &data[8..14] == b"WEBPVP" {
        return "image/webp";
    }
    if data.iter().any(|&b| is_binary_byte(b)) {
        "application/octet-stream"
    } else {
        "text/plain; charset=utf-8"
    }
}

fn html_signature_matches(data: &[u8], sig: &[u8]) -> bool {
    if data.len() < sig.len() + 1 {
        return false;
    }
    let head_matches = data
        .iter()
        .zip(sig)
        .all(|(have, want)| have.to_ascii_uppercase() == *want);
    head_matches && matches!(data[sig.len()], b' ' | b'>')
}

fn is_binary_byte(b: u8) -> bool {
    matches!(b, 0x00..=0x08 | 0x0B | 0x0E..=0x1A | 0x1C..=0x1F)
}
