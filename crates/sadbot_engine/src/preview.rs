use std::sync::Arc;

use sadbot_core::format_preview;
use sadbot_logging::bot_info;
use url::Url;

use crate::decode::decode_html;
use crate::fetch::Fetcher;
use crate::sink::ReplySink;
use crate::title::{extract_title, MAX_TITLE_SCAN_BYTES};
use crate::{FailureKind, FetchResult, SkipReason};

/// Fetches a harvested link and announces its title.
///
/// Every failure ends the attempt silently: it is logged, nothing is sent,
/// and nothing is retried.
#[derive(Clone)]
pub struct PagePreviewer {
    fetcher: Arc<dyn Fetcher>,
    split_len: usize,
}

impl PagePreviewer {
    pub fn new(fetcher: Arc<dyn Fetcher>, split_len: usize) -> Self {
        Self { fetcher, split_len }
    }

    pub async fn preview(
        &self,
        candidate: &str,
        target: &str,
        requester: Option<&str>,
        replies: &dyn ReplySink,
    ) -> FetchResult {
        let result = self.resolve(candidate, requester).await;
        match &result {
            FetchResult::Ok { reply, .. } => {
                bot_info!("{target}: {reply}");
                replies.send(target, reply);
            }
            FetchResult::Skipped(reason) => {
                bot_info!("No preview for {candidate} in {target}: {reason}");
            }
            FetchResult::Failed(err) => {
                bot_info!("Fetching {candidate} for {target} failed: {err}");
            }
        }
        result
    }

    async fn resolve(&self, candidate: &str, requester: Option<&str>) -> FetchResult {
        let url = match parse_candidate(candidate) {
            Ok(url) => url,
            Err(message) => return FetchResult::Skipped(SkipReason::InvalidUrl(message)),
        };
        bot_info!("Fetching title for {url}");

        let page = match self.fetcher.fetch(&url).await {
            Ok(page) => page,
            Err(err) => {
                return match err.kind {
                    FailureKind::UnsupportedContentType { content_type } => {
                        FetchResult::Skipped(SkipReason::NotHtml(content_type))
                    }
                    FailureKind::InvalidUrl => {
                        FetchResult::Skipped(SkipReason::InvalidUrl(err.message))
                    }
                    _ => FetchResult::Failed(err),
                };
            }
        };

        let decoded = decode_html(&page.bytes, page.content_type.as_deref(), host_tld(&url));
        let Some(title) = extract_title(&decoded.html, MAX_TITLE_SCAN_BYTES) else {
            return FetchResult::Skipped(SkipReason::NoTitle);
        };

        match format_preview(&title, &display_host(&url), requester, self.split_len) {
            Some(reply) => FetchResult::Ok { title, reply },
            None => FetchResult::Skipped(SkipReason::NoRoom),
        }
    }
}

/// Parses a harvested candidate, assuming `http://` when it names no scheme.
pub fn parse_candidate(candidate: &str) -> Result<Url, String> {
    let candidate = candidate.trim();
    let owned;
    let absolute = if has_scheme(candidate) {
        candidate
    } else {
        owned = format!("http://{candidate}");
        owned.as_str()
    };
    let url = Url::parse(absolute).map_err(|err| err.to_string())?;
    if url.host_str().is_none() {
        return Err("url has no host".to_string());
    }
    Ok(url)
}

fn has_scheme(candidate: &str) -> bool {
    let Some((scheme, _)) = candidate.split_once("://") else {
        return false;
    };
    let mut chars = scheme.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

/// Host as typed by the user, with the port when one was given.
fn display_host(url: &Url) -> String {
    let host = url.host_str().unwrap_or_default();
    match url.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    }
}

fn host_tld(url: &Url) -> Option<&str> {
    url.host_str()
        .and_then(|host| host.rsplit('.').next())
        .filter(|tld| !tld.is_empty() && tld.bytes().all(|b| b.is_ascii_lowercase()))
}
