use chrono::{DateTime, Utc};

use crate::{BuiltinCommand, IncomingLine};

/// Work produced by classifying one incoming line. Each effect is executed as
/// its own task; none depends on another.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Send fixed text.
    Reply { target: String, text: String },
    /// Run a built-in handler that may talk to outside services.
    Builtin {
        target: String,
        requester: String,
        command: BuiltinCommand,
    },
    /// Fetch a page title for a harvested link.
    Preview {
        target: String,
        url: String,
        requester: String,
    },
    /// Persist the line in the audit log.
    Audit(AuditRecord),
}

/// Row written to the audit log for every line seen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditRecord {
    pub nick: String,
    pub ident: String,
    pub host: String,
    pub source: String,
    pub command: String,
    pub channel: String,
    pub text: String,
    pub time: DateTime<Utc>,
}

impl AuditRecord {
    pub fn from_line(line: &IncomingLine, channel: &str) -> Self {
        Self {
            nick: line.nick.clone(),
            ident: line.ident.clone(),
            host: line.host.clone(),
            source: line.source.clone(),
            command: line.kind.as_str().to_string(),
            channel: channel.to_string(),
            text: line.text.clone(),
            time: line.time,
        }
    }
}
