use std::sync::Arc;

use sadbot_logging::bot_debug;

use crate::{CommandTable, Effect, IncomingLine};

const AUDIO_URL: &str = "https://sadbox.org/static/stuff/audiophile.html";
const CST_SLOGAN: &str = "\u{3}9,13#CSTMASTERRACE";

/// Built-in handlers that need more than a fixed string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuiltinCommand {
    Dance,
    Chatter,
    Haata,
    Search { query: String },
    Ask { query: String },
    /// Everything after `!w`, trimmed.
    Weather { args: String },
    Meebcast { command: Option<String> },
}

impl BuiltinCommand {
    pub fn name(&self) -> &'static str {
        match self {
            BuiltinCommand::Dance => "dance",
            BuiltinCommand::Chatter => "chatter",
            BuiltinCommand::Haata => "haata",
            BuiltinCommand::Search { .. } => "search",
            BuiltinCommand::Ask { .. } => "ask",
            BuiltinCommand::Weather { .. } => "weather",
            BuiltinCommand::Meebcast { .. } => "meebcast",
        }
    }
}

/// Splits a line into its first word and the rest.
struct Words<'a> {
    command: &'a str,
    addressee: Option<&'a str>,
    tail: &'a str,
}

impl<'a> Words<'a> {
    fn parse(text: &'a str) -> Self {
        let mut parts = text.split(' ');
        let command = parts.next().unwrap_or_default().trim();
        let addressee = parts.next().map(str::trim).filter(|word| !word.is_empty());
        let tail = text
            .trim_start()
            .strip_prefix(command)
            .unwrap_or_default()
            .trim();
        Self {
            command,
            addressee,
            tail,
        }
    }
}

/// Evaluates the privileged, public and configured tiers for one line.
///
/// Tiers fire independently of one another; inside the configured tier the
/// first matching table row wins.
#[derive(Debug, Clone)]
pub struct CommandRouter {
    admin: String,
    table: Arc<CommandTable>,
}

impl CommandRouter {
    pub fn new(admin: impl Into<String>, table: Arc<CommandTable>) -> Self {
        Self {
            admin: admin.into(),
            table,
        }
    }

    pub fn route(&self, line: &IncomingLine, target: &str) -> Vec<Effect> {
        let words = Words::parse(&line.text);
        let mut effects = Vec::new();

        if line.nick == self.admin {
            effects.extend(self.privileged(&words, line, target));
        }
        effects.extend(public(&words, line, target));
        effects.extend(self.configured(&words, target));

        if !effects.is_empty() {
            bot_debug!(
                "command {} from {} in {} -> {} effect(s)",
                words.command,
                line.nick,
                target,
                effects.len()
            );
        }
        effects
    }

    fn privileged(&self, words: &Words<'_>, line: &IncomingLine, target: &str) -> Option<Effect> {
        let reply = |text: &str| Effect::Reply {
            target: target.to_string(),
            text: text.to_string(),
        };
        match words.command {
            "!dance" => Some(builtin(line, target, BuiltinCommand::Dance)),
            "!audio" => Some(reply(AUDIO_URL)),
            "!cst" => Some(reply(CST_SLOGAN)),
            "!chatter" => Some(builtin(line, target, BuiltinCommand::Chatter)),
            _ => None,
        }
    }

    fn configured(&self, words: &Words<'_>, target: &str) -> Option<Effect> {
        let entry = self.table.lookup(target, words.command)?;
        let text = match words.addressee {
            Some(who) => format!("{who}: {}", entry.response),
            None => entry.response.clone(),
        };
        Some(Effect::Reply {
            target: target.to_string(),
            text,
        })
    }
}

fn public(words: &Words<'_>, line: &IncomingLine, target: &str) -> Option<Effect> {
    let command = match words.command {
        "!haata" => BuiltinCommand::Haata,
        "!search" => BuiltinCommand::Search {
            query: words.tail.to_string(),
        },
        "!ask" => BuiltinCommand::Ask {
            query: words.tail.to_string(),
        },
        "!w" => BuiltinCommand::Weather {
            args: words.tail.to_string(),
        },
        "!meebcast" => BuiltinCommand::Meebcast {
            command: words.addressee.map(str::to_string),
        },
        _ => return None,
    };
    Some(builtin(line, target, command))
}

fn builtin(line: &IncomingLine, target: &str, command: BuiltinCommand) -> Effect {
    Effect::Builtin {
        target: target.to_string(),
        requester: line.nick.clone(),
        command,
    }
}
