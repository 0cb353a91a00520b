mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{BrokenLocations, MemoryLocations, RecordingReplies};
use pretty_assertions::assert_eq;
use sadbot_engine::{LocationStore, WeatherClient, WeatherService};
use url::Url;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const OSLO: &str = r#"{
    "weather": [{"description": "clear sky"}],
    "main": {"temp": 273.15, "humidity": 40},
    "wind": {"speed": 5.0, "deg": 90},
    "name": "Oslo"
}"#;

const OSLO_REPLY: &str =
    "Clear Sky. 32.0 °F / 0.0 °C. Humidity 40%. Wind from the E at 11.2 m/h / 18.0 km/h. (Oslo)";

async fn owm() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/data/2.5/weather"))
        .and(query_param("q", "Oslo"))
        .and(query_param("APPID", "key"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(OSLO, "application/json"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/data/2.5/weather"))
        .and(query_param("q", "Atlantis"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    server
}

fn service(server: &MockServer, locations: Arc<dyn LocationStore>) -> WeatherService {
    sadbot_logging::initialize_for_tests();
    let endpoint = Url::parse(&format!("{}/data/2.5/weather", server.uri())).unwrap();
    let client = WeatherClient::new("key", endpoint, Duration::from_secs(5)).unwrap();
    WeatherService::new(client, locations)
}

#[tokio::test]
async fn explicit_place_is_reported() {
    let server = owm().await;
    let replies = RecordingReplies::default();

    service(&server, Arc::new(MemoryLocations::default()))
        .handle("#x", "alice", "Oslo", &replies)
        .await;

    assert_eq!(
        replies.sent(),
        vec![("#x".to_string(), format!("alice: {OSLO_REPLY}"))]
    );
}

#[tokio::test]
async fn set_then_stored_lookup() {
    let server = owm().await;
    let replies = RecordingReplies::default();
    let locations = Arc::new(MemoryLocations::default());
    let weather = service(&server, locations.clone());

    weather.handle("#x", "alice", "set Oslo", &replies).await;
    weather.handle("#x", "alice", "", &replies).await;
    weather.handle("#x", "bob", "@alice", &replies).await;

    assert_eq!(
        locations.location("alice").await.unwrap(),
        Some("Oslo".to_string())
    );
    assert_eq!(
        replies.sent(),
        vec![
            (
                "#x".to_string(),
                "alice: Your location has been updated to Oslo.".to_string()
            ),
            ("#x".to_string(), format!("alice: {OSLO_REPLY}")),
            ("#x".to_string(), format!("bob: {OSLO_REPLY}")),
        ]
    );
}

#[tokio::test]
async fn cleared_location_needs_setting_again() {
    let server = owm().await;
    let replies = RecordingReplies::default();
    let locations = Arc::new(MemoryLocations::default());
    locations.set_location("alice", "Oslo").await.unwrap();
    let weather = service(&server, locations);

    weather.handle("#x", "alice", "clear", &replies).await;
    weather.handle("#x", "alice", "", &replies).await;

    assert_eq!(
        replies.sent(),
        vec![
            (
                "#x".to_string(),
                "alice: Your location has been cleared in the database.".to_string()
            ),
            (
                "#x".to_string(),
                "alice: You need to specify a location at least once. (!w set San Francisco, CA)"
                    .to_string()
            ),
        ]
    );
}

#[tokio::test]
async fn unknown_nick_and_unknown_place() {
    let server = owm().await;
    let replies = RecordingReplies::default();
    let weather = service(&server, Arc::new(MemoryLocations::default()));

    weather.handle("#x", "alice", "@ghost", &replies).await;
    weather.handle("#x", "alice", "Atlantis", &replies).await;

    assert_eq!(
        replies.sent(),
        vec![
            (
                "#x".to_string(),
                "alice: ghost hasn't ever set a location.".to_string()
            ),
            (
                "#x".to_string(),
                "alice: I can't seem to find anything for Atlantis".to_string()
            ),
        ]
    );
}

#[tokio::test]
async fn help_lists_subcommands() {
    let server = owm().await;
    let replies = RecordingReplies::default();

    service(&server, Arc::new(MemoryLocations::default()))
        .handle("#x", "alice", "help", &replies)
        .await;

    let sent = replies.sent();
    assert_eq!(sent.len(), 1);
    assert!(sent[0].1.starts_with("alice: Check the weather!"));
}

#[tokio::test]
async fn database_errors_send_nothing() {
    let server = owm().await;
    let replies = RecordingReplies::default();
    let weather = service(&server, Arc::new(BrokenLocations));

    weather.handle("#x", "alice", "", &replies).await;
    weather.handle("#x", "alice", "@bob", &replies).await;

    assert!(replies.sent().is_empty());
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn oversized_and_malformed_bodies_find_nothing() {
    let server = owm().await;
    // Valid JSON, but only the first 64 KiB of it is ever read.
    let huge = format!(
        r#"{{"weather": [], "main": {{"temp": 280.0, "humidity": 1}}, "wind": {{"speed": 0.0, "deg": 0}}, "name": "{}"}}"#,
        "a".repeat(100 * 1024)
    );
    Mock::given(method("GET"))
        .and(path("/data/2.5/weather"))
        .and(query_param("q", "Bigville"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(huge, "application/json"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/data/2.5/weather"))
        .and(query_param("q", "Garbage"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("<html>oops</html>", "text/html"))
        .mount(&server)
        .await;
    let replies = RecordingReplies::default();
    let weather = service(&server, Arc::new(MemoryLocations::default()));

    weather.handle("#x", "alice", "Bigville", &replies).await;
    weather.handle("#x", "alice", "Garbage", &replies).await;

    assert_eq!(
        replies.sent(),
        vec![
            (
                "#x".to_string(),
                "alice: I can't seem to find anything for Bigville".to_string()
            ),
            (
                "#x".to_string(),
                "alice: I can't seem to find anything for Garbage".to_string()
            ),
        ]
    );
}
