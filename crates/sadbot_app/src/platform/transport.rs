//! Raw IRC protocol lines on stdin and stdout.

use chrono::{DateTime, Utc};
use sadbot_core::{IncomingLine, LineKind};
use sadbot_engine::ReplySink;
use sadbot_logging::bot_warn;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

const CTCP_DELIM: char = '\u{1}';

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub(crate) enum LineParseError {
    #[error("empty line")]
    Empty,
    #[error("{command} without a nick!ident@host prefix")]
    MissingSource { command: String },
    #[error("malformed source prefix {0:?}")]
    BadSource(String),
    #[error("{command} is missing parameters")]
    MissingParams { command: String },
}

/// What the bot cares about in one server line.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum ServerLine {
    Ping(String),
    /// RPL_WELCOME: registration finished, channels can be joined.
    Welcome,
    Message(IncomingLine),
    /// Anything the bot does not react to.
    Other,
}

struct Source<'a> {
    raw: &'a str,
    nick: &'a str,
    ident: &'a str,
    host: &'a str,
}

fn parse_source(raw: &str) -> Result<Source<'_>, LineParseError> {
    let (nick, rest) = raw
        .split_once('!')
        .ok_or_else(|| LineParseError::BadSource(raw.to_string()))?;
    let (ident, host) = rest
        .split_once('@')
        .ok_or_else(|| LineParseError::BadSource(raw.to_string()))?;
    if nick.is_empty() {
        return Err(LineParseError::BadSource(raw.to_string()));
    }
    Ok(Source {
        raw,
        nick,
        ident,
        host,
    })
}

/// Parses `[:prefix] COMMAND params [:trailing]`.
pub(crate) fn parse_line(raw: &str, time: DateTime<Utc>) -> Result<ServerLine, LineParseError> {
    let line = raw.trim_end_matches(['\r', '\n']);
    if line.trim().is_empty() {
        return Err(LineParseError::Empty);
    }

    let (prefix, rest) = match line.strip_prefix(':') {
        Some(tagged) => match tagged.split_once(' ') {
            Some((prefix, rest)) => (Some(prefix), rest),
            None => (Some(tagged), ""),
        },
        None => (None, line),
    };
    let (head, trailing) = match rest.split_once(" :") {
        Some((head, trailing)) => (head, Some(trailing)),
        None => (rest, None),
    };
    let mut words = head.split_whitespace();
    let command = words.next().unwrap_or_default();
    let params: Vec<&str> = words.chain(trailing).collect();

    match command.to_ascii_uppercase().as_str() {
        "PING" => Ok(ServerLine::Ping(params.first().copied().unwrap_or_default().to_string())),
        "001" => Ok(ServerLine::Welcome),
        "PRIVMSG" => {
            let source = match prefix {
                Some(prefix) => parse_source(prefix)?,
                None => {
                    return Err(LineParseError::MissingSource {
                        command: command.to_string(),
                    })
                }
            };
            let &[target, text] = params.as_slice() else {
                return Err(LineParseError::MissingParams {
                    command: command.to_string(),
                });
            };
            Ok(message(source, target, text, time))
        }
        _ => Ok(ServerLine::Other),
    }
}

fn message(source: Source<'_>, target: &str, text: &str, time: DateTime<Utc>) -> ServerLine {
    let (kind, text) = match ctcp_body(text) {
        Some(body) => match body.strip_prefix("ACTION") {
            Some(action) => (LineKind::Action, action.trim_start()),
            // VERSION, PING and friends
            None => return ServerLine::Other,
        },
        None => (LineKind::Privmsg, text),
    };
    ServerLine::Message(IncomingLine {
        nick: source.nick.to_string(),
        ident: source.ident.to_string(),
        host: source.host.to_string(),
        source: source.raw.to_string(),
        kind,
        target: target.to_string(),
        text: text.to_string(),
        time,
    })
}

fn ctcp_body(text: &str) -> Option<&str> {
    let body = text.strip_prefix(CTCP_DELIM)?;
    Some(body.strip_suffix(CTCP_DELIM).unwrap_or(body))
}

/// Queues raw protocol lines for a single writer task.
#[derive(Clone)]
pub(crate) struct LineWriter {
    queue: mpsc::UnboundedSender<String>,
}

impl LineWriter {
    /// Spawns the task that writes queued lines to `out` in order. The task
    /// hands `out` back once every `LineWriter` clone is dropped.
    pub(crate) fn spawn<W>(out: W) -> (Self, JoinHandle<W>)
    where
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let (queue, lines) = mpsc::unbounded_channel();
        (Self { queue }, tokio::spawn(write_lines(lines, out)))
    }

    pub(crate) fn raw(&self, line: &str) {
        if self.queue.send(format!("{line}\r\n")).is_err() {
            bot_warn!("Output closed, dropping {line:?}");
        }
    }
}

async fn write_lines<W: AsyncWrite + Unpin>(
    mut lines: mpsc::UnboundedReceiver<String>,
    mut out: W,
) -> W {
    while let Some(line) = lines.recv().await {
        let written = match out.write_all(line.as_bytes()).await {
            Ok(()) => out.flush().await,
            Err(err) => Err(err),
        };
        if let Err(err) = written {
            bot_warn!("Failed to write {:?}: {err}", line.trim_end());
            break;
        }
    }
    out
}

impl ReplySink for LineWriter {
    fn send(&self, target: &str, text: &str) {
        self.raw(&format!("PRIVMSG {target} :{text}"));
    }
}
