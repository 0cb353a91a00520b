use sadbot_core::BuiltinCommand;
use sadbot_logging::bot_info;

use crate::sink::{BuiltinServices, ReplySink};
use crate::weather::WeatherService;
use crate::wolfram::WolframClient;

const ASK_USAGE: &str = "Example: !ask pi";

/// Built-ins the bot ships with. Commands whose backend is not configured are
/// logged and dropped.
#[derive(Default)]
pub struct BotServices {
    weather: Option<WeatherService>,
    ask: Option<WolframClient>,
}

impl BotServices {
    pub fn new(weather: Option<WeatherService>, ask: Option<WolframClient>) -> Self {
        Self { weather, ask }
    }
}

#[async_trait::async_trait]
impl BuiltinServices for BotServices {
    async fn run(
        &self,
        target: &str,
        requester: &str,
        command: &BuiltinCommand,
        replies: &dyn ReplySink,
    ) {
        match command {
            BuiltinCommand::Weather { args } => match &self.weather {
                Some(weather) => weather.handle(target, requester, args, replies).await,
                None => bot_info!("Ignoring !w from {requester}: no weather API key configured"),
            },
            BuiltinCommand::Ask { query } if query.is_empty() => replies.send(target, ASK_USAGE),
            BuiltinCommand::Ask { query } => match &self.ask {
                Some(wolfram) => wolfram.handle(target, requester, query, replies).await,
                None => bot_info!("Ignoring !ask from {requester}: no Wolfram API key configured"),
            },
            other => bot_info!(
                "No backend for built-in {} (requested by {requester} in {target})",
                other.name()
            ),
        }
    }
}
