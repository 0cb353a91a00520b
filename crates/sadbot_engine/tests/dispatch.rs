mod common;

use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use common::{wait_until, RecordingAudit, RecordingReplies};
use pretty_assertions::assert_eq;
use sadbot_core::{BotConfig, IncomingLine, LineKind, Planner};
use sadbot_engine::{
    BotServices, Collaborators, Dispatcher, FailureKind, FetchError, FetchedPage, Fetcher,
};
use url::Url;

const CONFIG: &str = r##"{
    "Nick": "sadbot",
    "Channels": ["#x"],
    "Commands": [
        {"Channel": "default", "Commands": [{"Name": "!ping", "Text": "pong"}]}
    ]
}"##;

/// Serves a fixed page for every URL and remembers what was asked for.
#[derive(Default)]
struct FakeFetcher {
    requested: Mutex<Vec<String>>,
}

impl FakeFetcher {
    fn requested(&self) -> Vec<String> {
        self.requested.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Fetcher for FakeFetcher {
    async fn fetch(&self, url: &Url) -> Result<FetchedPage, FetchError> {
        self.requested.lock().unwrap().push(url.to_string());
        if url.path() == "/broken" {
            return Err(FetchError {
                kind: FailureKind::HttpStatus(502),
                message: "bad gateway".into(),
            });
        }
        Ok(FetchedPage {
            final_url: url.to_string(),
            content_type: Some("text/html".into()),
            bytes: format!("<title>Page {}</title>", url.path()).into_bytes(),
        })
    }
}

struct Harness {
    dispatcher: Dispatcher,
    replies: RecordingReplies,
    audit: RecordingAudit,
    fetcher: Arc<FakeFetcher>,
}

fn harness(audit: RecordingAudit) -> Harness {
    harness_with(CONFIG, audit)
}

fn harness_with(config: &str, audit: RecordingAudit) -> Harness {
    sadbot_logging::initialize_for_tests();
    let config = BotConfig::from_json(config).unwrap();
    let replies = RecordingReplies::default();
    let fetcher = Arc::new(FakeFetcher::default());
    let dispatcher = Dispatcher::new(
        tokio::runtime::Handle::current(),
        Planner::from_config(&config),
        config.split_len,
        Collaborators {
            replies: Arc::new(replies.clone()),
            audit: Arc::new(audit.clone()),
            services: Arc::new(BotServices::default()),
            fetcher: fetcher.clone(),
        },
    );
    Harness {
        dispatcher,
        replies,
        audit,
        fetcher,
    }
}

fn line(nick: &str, target: &str, text: &str) -> IncomingLine {
    IncomingLine {
        nick: nick.into(),
        ident: format!("~{nick}"),
        host: "home.example".into(),
        source: format!("{nick}!~{nick}@home.example"),
        kind: LineKind::Privmsg,
        target: target.into(),
        text: text.into(),
        time: Utc::now(),
    }
}

fn sorted(mut lines: Vec<(String, String)>) -> Vec<(String, String)> {
    lines.sort();
    lines
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn configured_command_is_answered_and_audited() {
    let harness = harness(RecordingAudit::default());
    harness.dispatcher.dispatch(line("alice", "#x", "!ping bob"));

    let sent = harness.replies.wait_for(1).await;
    assert_eq!(sent, vec![("#x".to_string(), "bob: pong".to_string())]);

    let records = harness.audit.records.clone();
    wait_until(|| !records.lock().unwrap().is_empty()).await;
    let records = records.lock().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].text, "!ping bob");
    assert_eq!(records[0].channel, "#x");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn long_command_replies_are_split_before_sending() {
    let config = CONFIG.replace(r#""Nick": "sadbot","#, r#""Nick": "sadbot", "SplitLen": 64,"#);
    let harness = harness_with(&config, RecordingAudit::default());
    let long_nick = "x".repeat(200);
    harness
        .dispatcher
        .dispatch(line("alice", "#x", &format!("!ping {long_nick}")));

    harness.replies.wait_for(4).await;
    tokio::time::sleep(Duration::from_millis(50)).await;
    let sent = harness.replies.sent();
    assert!(sent.iter().all(|(_, text)| text.len() <= 64), "{sent:?}");
    let x64 = "x".repeat(64);
    assert_eq!(
        sent,
        vec![
            ("#x".to_string(), x64.clone()),
            ("#x".to_string(), x64.clone()),
            ("#x".to_string(), x64),
            ("#x".to_string(), "xxxxxxxx: pong".to_string()),
        ]
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn only_three_links_are_fetched() {
    let harness = harness(RecordingAudit::default());
    harness.dispatcher.dispatch(line(
        "alice",
        "#x",
        "http://a.example/1 http://a.example/2 http://a.example/3 http://a.example/4 http://a.example/5",
    ));

    let sent = sorted(harness.replies.wait_for(3).await);
    // Give a stray fourth preview the chance to show up before counting.
    tokio::time::sleep(Duration::from_millis(100)).await;

    let mut requested = harness.fetcher.requested();
    requested.sort();
    assert_eq!(
        requested,
        vec![
            "http://a.example/1".to_string(),
            "http://a.example/2".to_string(),
            "http://a.example/3".to_string(),
        ]
    );
    assert_eq!(
        sent,
        vec![
            ("#x".to_string(), "Page /1 (a.example / alice)".to_string()),
            ("#x".to_string(), "Page /2 (a.example / alice)".to_string()),
            ("#x".to_string(), "Page /3 (a.example / alice)".to_string()),
        ]
    );
    assert_eq!(harness.replies.sent().len(), 3);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn failing_audit_does_not_block_replies() {
    let harness = harness(RecordingAudit::failing());
    harness
        .dispatcher
        .dispatch(line("alice", "#x", "!ping and http://a.example/page"));

    let sent = sorted(harness.replies.wait_for(2).await);
    assert_eq!(
        sent,
        vec![
            ("#x".to_string(), "Page /page (a.example / alice)".to_string()),
            ("#x".to_string(), "and: pong".to_string()),
        ]
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn one_failed_fetch_leaves_the_others_alone() {
    let harness = harness(RecordingAudit::default());
    harness.dispatcher.dispatch(line(
        "alice",
        "#x",
        "http://a.example/broken http://b.example/fine",
    ));

    let sent = harness.replies.wait_for(1).await;
    assert_eq!(
        sent,
        vec![("#x".to_string(), "Page /fine (b.example / alice)".to_string())]
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn private_messages_are_answered_privately() {
    let harness = harness(RecordingAudit::default());
    harness.dispatcher.dispatch(line("carol", "SadBot", "!ping"));

    let sent = harness.replies.wait_for(1).await;
    assert_eq!(sent, vec![("carol".to_string(), "pong".to_string())]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn empty_ask_gets_usage_hint() {
    let harness = harness(RecordingAudit::default());
    harness.dispatcher.dispatch(line("alice", "#x", "!ask"));

    let sent = harness.replies.wait_for(1).await;
    assert_eq!(
        sent,
        vec![("#x".to_string(), "Example: !ask pi".to_string())]
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn plain_chatter_sends_nothing() {
    let harness = harness(RecordingAudit::default());
    harness.dispatcher.dispatch(line("alice", "#x", "nothing to see"));

    let records = harness.audit.records.clone();
    wait_until(|| !records.lock().unwrap().is_empty()).await;
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(harness.replies.sent().is_empty());
    assert!(harness.fetcher.requested().is_empty());
}
