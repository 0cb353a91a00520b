use std::fmt;

/// Body of a fetched page, capped, with any sniffed prefix already included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedPage {
    pub final_url: String,
    /// Content-Type exactly as the server declared it.
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct FetchError {
    pub kind: FailureKind,
    pub message: String,
}

impl FetchError {
    pub(crate) fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    InvalidUrl,
    HttpStatus(u16),
    Timeout,
    RedirectLimitExceeded,
    UnsupportedContentType { content_type: String },
    /// An API answered with a body that does not parse.
    MalformedBody,
    Network,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::InvalidUrl => write!(f, "invalid url"),
            FailureKind::HttpStatus(code) => write!(f, "http status {code}"),
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::RedirectLimitExceeded => write!(f, "redirect limit exceeded"),
            FailureKind::UnsupportedContentType { content_type } => {
                write!(f, "unsupported content type {content_type}")
            }
            FailureKind::MalformedBody => write!(f, "malformed response body"),
            FailureKind::Network => write!(f, "network error"),
        }
    }
}

/// Why a candidate produced no preview even though nothing went wrong.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    InvalidUrl(String),
    NotHtml(String),
    NoTitle,
    /// Host and nick alone overflow the split length.
    NoRoom,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::InvalidUrl(message) => write!(f, "invalid url: {message}"),
            SkipReason::NotHtml(content_type) => write!(f, "not html ({content_type})"),
            SkipReason::NoTitle => write!(f, "no usable title"),
            SkipReason::NoRoom => write!(f, "reply suffix exceeds split length"),
        }
    }
}

/// Outcome of one preview attempt. Never leaves the previewer except in logs
/// and tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchResult {
    /// Extracted title and the reply line built from it.
    Ok { title: String, reply: String },
    Skipped(SkipReason),
    Failed(FetchError),
}
