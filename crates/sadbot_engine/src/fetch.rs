use std::io;
use std::pin::Pin;
use std::time::Duration;

use bytes::Bytes;
use futures_util::{Stream, TryStreamExt};
use reqwest::header::CONTENT_TYPE;
use sadbot_logging::{bot_debug, bot_info};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio_util::io::StreamReader;
use url::Url;

use crate::sniff::{classify, sniff_media_type, ContentKind, SNIFF_LEN};
use crate::title::MAX_TITLE_SCAN_BYTES;
use crate::{FailureKind, FetchError, FetchedPage};

#[derive(Debug, Clone)]
pub struct FetchSettings {
    pub connect_timeout: Duration,
    /// Deadline for the whole request, body included.
    pub request_timeout: Duration,
    pub redirect_limit: usize,
    /// Body bytes read after any sniffed prefix; the rest is never downloaded.
    pub max_body_bytes: u64,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(5),
            request_timeout: Duration::from_secs(10),
            redirect_limit: 10,
            max_body_bytes: MAX_TITLE_SCAN_BYTES as u64,
        }
    }
}

#[async_trait::async_trait]
pub trait Fetcher: Send + Sync {
    /// GETs `url` and returns the start of its body, provided it is HTML.
    async fn fetch(&self, url: &Url) -> Result<FetchedPage, FetchError>;
}

#[derive(Debug, Clone)]
pub struct ReqwestFetcher {
    client: reqwest::Client,
    settings: FetchSettings,
}

impl ReqwestFetcher {
    pub fn new(settings: FetchSettings) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .redirect(reqwest::redirect::Policy::limited(settings.redirect_limit))
            .build()
            .map_err(|err| FetchError::new(FailureKind::Network, err.to_string()))?;
        Ok(Self { client, settings })
    }

    async fn fetch_capped(&self, url: &Url) -> Result<FetchedPage, FetchError> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::new(
                FailureKind::HttpStatus(status.as_u16()),
                status.to_string(),
            ));
        }

        let final_url = response.url().to_string();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(|value| value.to_string());

        if let Some(declared) = content_type.as_deref() {
            if classify(Some(declared), &[]) == ContentKind::Other {
                return Err(unsupported(declared));
            }
        }

        let mut body = body_reader(response);
        let bytes = read_page(
            &mut body,
            content_type.is_none(),
            self.settings.max_body_bytes,
        )
        .await?;

        bot_debug!(
            "Fetched {} bytes from {final_url} (content-type {:?})",
            bytes.len(),
            content_type
        );

        Ok(FetchedPage {
            final_url,
            content_type,
            bytes,
        })
    }
}

#[async_trait::async_trait]
impl Fetcher for ReqwestFetcher {
    async fn fetch(&self, url: &Url) -> Result<FetchedPage, FetchError> {
        if !matches!(url.scheme(), "http" | "https") {
            return Err(FetchError::new(
                FailureKind::InvalidUrl,
                format!("unsupported scheme {}", url.scheme()),
            ));
        }
        // The client timeout covers most stalls; this also bounds slow body reads.
        match tokio::time::timeout(self.settings.request_timeout, self.fetch_capped(url)).await {
            Ok(result) => result,
            Err(_) => Err(FetchError::new(
                FailureKind::Timeout,
                "request deadline exceeded",
            )),
        }
    }
}

/// Cap on API response bodies (weather, Q&A).
pub(crate) const MAX_API_BODY_BYTES: u64 = 64 * 1024;

/// Client for small API calls, bounded by `timeout` end to end.
pub(crate) fn api_client(timeout: Duration) -> Result<reqwest::Client, FetchError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|err| FetchError::new(FailureKind::Network, err.to_string()))
}

/// GETs an API endpoint and returns its body, capped at
/// [`MAX_API_BODY_BYTES`]. Non-2xx statuses are errors.
pub(crate) async fn get_api_body(client: &reqwest::Client, url: Url) -> Result<Vec<u8>, FetchError> {
    let response = client.get(url).send().await.map_err(map_reqwest_error)?;
    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::new(
            FailureKind::HttpStatus(status.as_u16()),
            status.to_string(),
        ));
    }
    read_capped(&mut body_reader(response), MAX_API_BODY_BYTES).await
}

type BodyStream = Pin<Box<dyn Stream<Item = io::Result<Bytes>> + Send>>;

/// Response body as an `AsyncRead`, so reads can be bounded with `take`.
pub(crate) type BodyReader = StreamReader<BodyStream, Bytes>;

pub(crate) fn body_reader(response: reqwest::Response) -> BodyReader {
    let stream: BodyStream = Box::pin(response.bytes_stream().map_err(io::Error::other));
    StreamReader::new(stream)
}

/// Reads at most `limit` bytes; anything past that is never downloaded.
pub(crate) async fn read_capped<R>(body: &mut R, limit: u64) -> Result<Vec<u8>, FetchError>
where
    R: AsyncRead + Unpin,
{
    let mut bytes = Vec::new();
    body.take(limit)
        .read_to_end(&mut bytes)
        .await
        .map_err(map_io_error)?;
    Ok(bytes)
}

/// Reads the page body. Without a declared type the first `SNIFF_LEN` bytes
/// decide whether to go on; they stay at the front of the returned bytes. A
/// failed prefix read is logged and the body is treated as html.
async fn read_page<R>(body: &mut R, sniff: bool, max_body_bytes: u64) -> Result<Vec<u8>, FetchError>
where
    R: AsyncRead + Unpin,
{
    let mut bytes = Vec::new();
    if sniff {
        match (&mut *body)
            .take(SNIFF_LEN as u64)
            .read_to_end(&mut bytes)
            .await
        {
            Ok(_) => {
                if classify(None, &bytes) == ContentKind::Other {
                    return Err(unsupported(sniff_media_type(&bytes)));
                }
            }
            Err(err) => {
                bot_info!("Could not read sniff prefix, assuming html: {err}");
            }
        }
    }
    bytes.extend(read_capped(body, max_body_bytes).await?);
    Ok(bytes)
}

fn unsupported(content_type: &str) -> FetchError {
    FetchError::new(
        FailureKind::UnsupportedContentType {
            content_type: content_type.to_string(),
        },
        "content is not text/html",
    )
}

fn map_reqwest_error(err: reqwest::Error) -> FetchError {
    if err.is_timeout() {
        return FetchError::new(FailureKind::Timeout, err.to_string());
    }
    if err.is_redirect() {
        return FetchError::new(FailureKind::RedirectLimitExceeded, err.to_string());
    }
    if err.is_builder() {
        return FetchError::new(FailureKind::InvalidUrl, err.to_string());
    }
    FetchError::new(FailureKind::Network, err.to_string())
}

fn map_io_error(err: io::Error) -> FetchError {
    let timed_out = err.kind() == io::ErrorKind::TimedOut
        || err
            .get_ref()
            .and_then(|inner| inner.downcast_ref::<reqwest::Error>())
            .is_some_and(reqwest::Error::is_timeout);
    let kind = if timed_out {
        FailureKind::Timeout
    } else {
        FailureKind::Network
    };
    FetchError::new(kind, err.to_string())
}
