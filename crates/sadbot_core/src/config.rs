use std::sync::Arc;

use regex::Regex;
use serde::Deserialize;
use thiserror::Error;

/// Scope name that makes a configured command available in every channel.
pub const DEFAULT_SCOPE: &str = "default";
/// Nick allowed to run the privileged commands when the config names nobody.
pub const DEFAULT_ADMIN: &str = "sadbox";
/// Longest outgoing line the transport accepts, in bytes.
pub const DEFAULT_SPLIT_LEN: usize = 450;
const MIN_SPLIT_LEN: usize = 32;
const DEFAULT_MAX_DB_CONNECTIONS: u32 = 8;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("malformed config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("config is missing a nick")]
    MissingNick,
    #[error("split length {0} is too small (minimum {MIN_SPLIT_LEN})")]
    SplitLenTooSmall(usize),
    #[error("bad word {word:?} has an invalid pattern: {source}")]
    BadWordPattern {
        word: String,
        #[source]
        source: regex::Error,
    },
}

/// One row of the configured command tier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandTableEntry {
    /// Channel name, or [`DEFAULT_SCOPE`].
    pub scope: String,
    pub name: String,
    pub response: String,
}

impl CommandTableEntry {
    pub fn applies_to(&self, channel: &str) -> bool {
        self.scope == channel || self.scope == DEFAULT_SCOPE
    }
}

/// Operator-defined commands in file order. Read-only after startup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandTable {
    entries: Vec<CommandTableEntry>,
}

impl CommandTable {
    pub fn new(entries: Vec<CommandTableEntry>) -> Self {
        Self { entries }
    }

    /// First entry in table order whose scope covers `channel` and whose name
    /// is `name`. Nothing after it is looked at, whatever its scope.
    pub fn lookup(&self, channel: &str, name: &str) -> Option<&CommandTableEntry> {
        self.entries
            .iter()
            .filter(|entry| entry.applies_to(channel))
            .find(|entry| entry.name == name)
    }

    pub fn entries(&self) -> &[CommandTableEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Word -> pattern table, compiled once at load.
#[derive(Debug, Clone, Default)]
pub struct BadWordTable {
    words: Vec<(String, Regex)>,
}

impl BadWordTable {
    pub fn get(&self, word: &str) -> Option<&Regex> {
        self.words
            .iter()
            .find(|(name, _)| name == word)
            .map(|(_, pattern)| pattern)
    }

    pub fn words(&self) -> impl Iterator<Item = &str> {
        self.words.iter().map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

/// Immutable process-wide configuration, built before the event loop starts.
#[derive(Debug, Clone)]
pub struct BotConfig {
    pub channels: Vec<String>,
    pub database_url: String,
    pub nick: String,
    pub ident: String,
    pub full_name: String,
    pub admin: String,
    pub split_len: usize,
    pub weather_api_key: Option<String>,
    pub wolfram_api_key: Option<String>,
    pub max_db_connections: u32,
    pub log_file: Option<String>,
    pub commands: Arc<CommandTable>,
    pub bad_words: Arc<BadWordTable>,
}

// Field names match the JSON files the bot has always read.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawConfig {
    #[serde(default)]
    channels: Vec<String>,
    #[serde(rename = "DBConn", default)]
    db_conn: String,
    #[serde(default)]
    nick: String,
    #[serde(default)]
    ident: String,
    #[serde(default)]
    full_name: String,
    #[serde(default)]
    admin: Option<String>,
    #[serde(default)]
    split_len: Option<usize>,
    #[serde(rename = "OpenWeatherMapAPIKey", default)]
    open_weather_map_api_key: Option<String>,
    #[serde(rename = "WolframAPIKey", default)]
    wolfram_api_key: Option<String>,
    #[serde(default)]
    max_db_connections: Option<u32>,
    #[serde(default)]
    log_file: Option<String>,
    #[serde(default)]
    commands: Vec<RawChannelCommands>,
    #[serde(default)]
    bad_words: Vec<RawBadWord>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawChannelCommands {
    channel: String,
    #[serde(default)]
    commands: Vec<RawCommand>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawCommand {
    name: String,
    text: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawBadWord {
    word: String,
    query: String,
}

impl BotConfig {
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let raw: RawConfig = serde_json::from_str(text)?;

        let nick = raw.nick.trim().to_string();
        if nick.is_empty() {
            return Err(ConfigError::MissingNick);
        }
        let split_len = raw.split_len.unwrap_or(DEFAULT_SPLIT_LEN);
        if split_len < MIN_SPLIT_LEN {
            return Err(ConfigError::SplitLenTooSmall(split_len));
        }

        let entries = raw
            .commands
            .into_iter()
            .flat_map(|group| {
                let scope = group.channel;
                group.commands.into_iter().map(move |cmd| CommandTableEntry {
                    scope: scope.clone(),
                    name: cmd.name,
                    response: cmd.text,
                })
            })
            .collect();

        let words = raw
            .bad_words
            .into_iter()
            .map(|bad| match Regex::new(&bad.query) {
                Ok(pattern) => Ok((bad.word, pattern)),
                Err(source) => Err(ConfigError::BadWordPattern {
                    word: bad.word,
                    source,
                }),
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            channels: raw.channels,
            database_url: raw.db_conn,
            nick,
            ident: raw.ident,
            full_name: raw.full_name,
            admin: raw
                .admin
                .filter(|admin| !admin.is_empty())
                .unwrap_or_else(|| DEFAULT_ADMIN.to_string()),
            split_len,
            weather_api_key: raw.open_weather_map_api_key.filter(|key| !key.is_empty()),
            wolfram_api_key: raw.wolfram_api_key.filter(|key| !key.is_empty()),
            max_db_connections: raw
                .max_db_connections
                .unwrap_or(DEFAULT_MAX_DB_CONNECTIONS)
                .max(1),
            log_file: raw.log_file,
            commands: Arc::new(CommandTable::new(entries)),
            bad_words: Arc::new(BadWordTable { words }),
        })
    }
}
