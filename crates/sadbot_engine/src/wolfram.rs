use std::time::Duration;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use sadbot_logging::{bot_debug, bot_info};
use url::Url;

use crate::fetch::{api_client, get_api_body};
use crate::sink::ReplySink;
use crate::{FailureKind, FetchError};

pub const WOLFRAM_ALPHA_URL: &str = "http://api.wolframalpha.com/v2/query";

const INTERPRETATION_POD: &str = "Input interpretation";
const MAX_ANSWER_LINES: usize = 3;
const NO_IDEA: &str = "I have no idea.";

/// The parts of a Wolfram|Alpha `queryresult` document the bot reads.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryResult {
    pub success: bool,
    pub pods: Vec<Pod>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Pod {
    pub title: String,
    /// Plaintext of the first subpod.
    pub text: String,
    pub primary: bool,
}

impl QueryResult {
    pub fn parse(xml: &str) -> Result<Self, quick_xml::Error> {
        let mut reader = Reader::from_str(xml);
        reader.config_mut().trim_text(true);

        let mut result = QueryResult::default();
        let mut pod: Option<Pod> = None;
        let mut in_plaintext = false;
        let mut text_taken = false;

        loop {
            match reader.read_event()? {
                Event::Eof => break,
                Event::Start(e) => match e.name().as_ref() {
                    b"queryresult" => result.success = is_true(&e, b"success"),
                    b"pod" => {
                        pod = Some(pod_from(&e));
                        text_taken = false;
                    }
                    b"plaintext" => in_plaintext = pod.is_some() && !text_taken,
                    _ => {}
                },
                Event::Empty(e) => match e.name().as_ref() {
                    b"queryresult" => result.success = is_true(&e, b"success"),
                    b"pod" => result.pods.push(pod_from(&e)),
                    _ => {}
                },
                Event::Text(t) => {
                    if let (true, Some(pod)) = (in_plaintext, pod.as_mut()) {
                        pod.text.push_str(&t.unescape()?);
                    }
                }
                Event::End(e) => match e.name().as_ref() {
                    b"plaintext" if in_plaintext => {
                        in_plaintext = false;
                        text_taken = true;
                    }
                    b"pod" => result.pods.extend(pod.take()),
                    _ => {}
                },
                _ => {}
            }
        }
        Ok(result)
    }

    /// Reply lines for `requester`'s `query`: the input interpretation when
    /// one came before it, then up to three lines of the first primary pod,
    /// then who asked what.
    pub fn answer(&self, requester: &str, query: &str) -> Vec<String> {
        if !self.success {
            return vec![NO_IDEA.to_string()];
        }
        let mut interpretation = None;
        for pod in &self.pods {
            if pod.title == INTERPRETATION_POD {
                interpretation = Some(format!("{}: {}", pod.title, pod.text));
            }
            if !pod.primary {
                continue;
            }
            let body = format!("{}: {}", pod.title, pod.text);
            let response: Vec<&str> = body.split('\n').take(MAX_ANSWER_LINES).collect();
            let asked = format!("(In reponse to: <{requester}> {query})");

            let mut lines: Vec<String> = interpretation.into_iter().collect();
            if let [only] = response.as_slice() {
                lines.push(format!("{only} {asked}"));
            } else {
                lines.extend(response.iter().map(|line| line.to_string()));
                lines.push(asked);
            }
            return lines;
        }
        vec![NO_IDEA.to_string()]
    }
}

fn pod_from(e: &BytesStart<'_>) -> Pod {
    Pod {
        title: attribute(e, b"title").unwrap_or_default(),
        text: String::new(),
        primary: is_true(e, b"primary"),
    }
}

fn is_true(e: &BytesStart<'_>, name: &[u8]) -> bool {
    attribute(e, name).is_some_and(|value| value == "true")
}

fn attribute(e: &BytesStart<'_>, name: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|attr| attr.key.as_ref() == name)
        .and_then(|attr| attr.unescape_value().ok())
        .map(|value| value.into_owned())
}

/// The `!ask` built-in, backed by the Wolfram|Alpha query API.
#[derive(Debug, Clone)]
pub struct WolframClient {
    client: reqwest::Client,
    endpoint: Url,
    app_id: String,
}

impl WolframClient {
    pub fn new(
        app_id: impl Into<String>,
        endpoint: Url,
        timeout: Duration,
    ) -> Result<Self, FetchError> {
        Ok(Self {
            client: api_client(timeout)?,
            endpoint,
            app_id: app_id.into(),
        })
    }

    pub async fn query(&self, input: &str) -> Result<QueryResult, FetchError> {
        bot_info!("Searching wolfram alpha for {input}");
        let mut url = self.endpoint.clone();
        url.query_pairs_mut()
            .append_pair("input", input)
            .append_pair("appid", &self.app_id);

        let body = get_api_body(&self.client, url).await?;
        let xml = String::from_utf8_lossy(&body);
        let result = QueryResult::parse(&xml)
            .map_err(|err| FetchError::new(FailureKind::MalformedBody, err.to_string()))?;
        bot_debug!("{result:?}");
        Ok(result)
    }

    /// Answers `query` in `target`. Transport and parse failures are logged
    /// and send nothing.
    pub async fn handle(&self, target: &str, requester: &str, query: &str, replies: &dyn ReplySink) {
        match self.query(query).await {
            Ok(result) => {
                for line in result.answer(requester, query) {
                    replies.send(target, &line);
                }
            }
            Err(err) => bot_info!("Wolfram query {query:?} from {requester} failed: {err}"),
        }
    }
}
