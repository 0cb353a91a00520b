//! Sadbot engine: network I/O and task fan-out for classified lines.
mod decode;
mod engine;
mod fetch;
mod preview;
mod services;
mod sink;
mod sniff;
mod title;
mod types;
mod weather;
mod wolfram;

pub use decode::{decode_html, DecodedHtml};
pub use engine::{Collaborators, Dispatcher};
pub use fetch::{FetchSettings, Fetcher, ReqwestFetcher};
pub use preview::{parse_candidate, PagePreviewer};
pub use services::BotServices;
pub use sink::{AuditSink, BuiltinServices, LocationStore, ReplySink};
pub use sniff::{classify, sniff_media_type, ContentKind, SNIFF_LEN};
pub use title::{extract_title, MAX_TITLE_SCAN_BYTES};
pub use types::{FailureKind, FetchError, FetchResult, FetchedPage, SkipReason};
pub use weather::{
    compass_direction, Observation, WeatherClient, WeatherService, OPENWEATHERMAP_URL,
};
pub use wolfram::{Pod, QueryResult, WolframClient, WOLFRAM_ALPHA_URL};
