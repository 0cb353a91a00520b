use std::fs;
use std::path::Path;

use anyhow::Context;
use sadbot_core::BotConfig;
use sadbot_logging::bot_info;

pub const DEFAULT_CONFIG_PATH: &str = "config.json";

pub(crate) fn load_config(path: &Path) -> anyhow::Result<BotConfig> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("reading config file {}", path.display()))?;
    BotConfig::from_json(&text).with_context(|| format!("parsing config file {}", path.display()))
}

/// Logs who the bot is and every command it will answer.
pub(crate) fn log_summary(config: &BotConfig) {
    bot_info!(
        "Nick: {} Ident: {} FullName: {} Admin: {}",
        config.nick,
        config.ident,
        config.full_name,
        config.admin
    );
    bot_info!("Channels: {}", config.channels.join(", "));
    for entry in config.commands.entries() {
        bot_info!("{} -> {}: {}", entry.scope, entry.name, entry.response);
    }
    bot_info!("Found {} commands", config.commands.len());
    if !config.bad_words.is_empty() {
        bot_info!(
            "Tracking {} bad words: {}",
            config.bad_words.len(),
            config.bad_words.words().collect::<Vec<_>>().join(", ")
        );
    }
}
