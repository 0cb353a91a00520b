use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use chrono::Utc;
use sadbot_core::{BotConfig, Planner};
use sadbot_engine::{
    BotServices, Collaborators, Dispatcher, FetchSettings, LocationStore, ReqwestFetcher,
    WeatherClient, WeatherService, WolframClient, OPENWEATHERMAP_URL, WOLFRAM_ALPHA_URL,
};
use sadbot_logging::{bot_debug, bot_info};
use tokio::io::{AsyncBufReadExt, BufReader};
use url::Url;

use super::config::{load_config, log_summary};
use super::logging::{self, LogDestination};
use super::store::{SqliteStore, DEFAULT_DATABASE_URL};
use super::transport::{parse_line, LineWriter, ServerLine};

const SERVICE_TIMEOUT: Duration = Duration::from_secs(10);

pub async fn run_app(config_path: &str) -> anyhow::Result<()> {
    let config = load_config(Path::new(config_path))?;
    match &config.log_file {
        Some(path) => logging::initialize(LogDestination::Both(Path::new(path))),
        None => logging::initialize(LogDestination::Terminal),
    }
    log_summary(&config);

    let database_url = if config.database_url.is_empty() {
        DEFAULT_DATABASE_URL
    } else {
        config.database_url.as_str()
    };
    let store = Arc::new(
        SqliteStore::connect(database_url, config.max_db_connections)
            .await
            .with_context(|| format!("opening database {database_url}"))?,
    );
    bot_info!(
        "Connected to {database_url} with up to {} connections",
        config.max_db_connections
    );

    let (output, _writer) = LineWriter::spawn(tokio::io::stdout());
    let dispatcher = Dispatcher::new(
        tokio::runtime::Handle::current(),
        Planner::from_config(&config),
        config.split_len,
        Collaborators {
            replies: Arc::new(output.clone()),
            audit: store.clone(),
            services: Arc::new(BotServices::new(
                weather_service(&config, store)?,
                wolfram_client(&config)?,
            )),
            fetcher: Arc::new(ReqwestFetcher::new(FetchSettings::default())?),
        },
    );

    register(&output, &config);
    read_loop(&dispatcher, &output, &config).await
}

fn weather_service(
    config: &BotConfig,
    locations: Arc<dyn LocationStore>,
) -> anyhow::Result<Option<WeatherService>> {
    let Some(api_key) = &config.weather_api_key else {
        bot_info!("No OpenWeatherMapAPIKey configured, !w is disabled");
        return Ok(None);
    };
    let client = WeatherClient::new(api_key, Url::parse(OPENWEATHERMAP_URL)?, SERVICE_TIMEOUT)?;
    Ok(Some(WeatherService::new(client, locations)))
}

fn wolfram_client(config: &BotConfig) -> anyhow::Result<Option<WolframClient>> {
    let Some(app_id) = &config.wolfram_api_key else {
        bot_info!("No WolframAPIKey configured, !ask is disabled");
        return Ok(None);
    };
    let client = WolframClient::new(app_id, Url::parse(WOLFRAM_ALPHA_URL)?, SERVICE_TIMEOUT)?;
    Ok(Some(client))
}

fn register(output: &LineWriter, config: &BotConfig) {
    let ident = if config.ident.is_empty() {
        &config.nick
    } else {
        &config.ident
    };
    output.raw(&format!("NICK {}", config.nick));
    output.raw(&format!("USER {ident} 0 * :{}", config.full_name));
}

/// Reads server lines until stdin closes.
async fn read_loop(
    dispatcher: &Dispatcher,
    output: &LineWriter,
    config: &BotConfig,
) -> anyhow::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(raw) = lines.next_line().await.context("reading stdin")? {
        match parse_line(&raw, Utc::now()) {
            Ok(ServerLine::Ping(token)) => output.raw(&format!("PONG :{token}")),
            Ok(ServerLine::Welcome) => {
                for channel in &config.channels {
                    bot_info!("Joining {channel}");
                    output.raw(&format!("JOIN {channel}"));
                }
            }
            Ok(ServerLine::Message(line)) => dispatcher.dispatch(line),
            Ok(ServerLine::Other) => {}
            Err(err) => bot_debug!("Skipping line {raw:?}: {err}"),
        }
    }
    bot_info!("Input closed, shutting down");
    Ok(())
}
