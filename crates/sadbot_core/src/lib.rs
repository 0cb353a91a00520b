//! Sadbot core: pure message classification, with no network or storage access.
mod command;
mod config;
mod effect;
mod line;
mod links;
mod planner;
mod reply;

pub use command::{BuiltinCommand, CommandRouter};
pub use config::{
    BadWordTable, BotConfig, CommandTable, CommandTableEntry, ConfigError, DEFAULT_ADMIN,
    DEFAULT_SCOPE, DEFAULT_SPLIT_LEN,
};
pub use effect::{AuditRecord, Effect};
pub use line::{IncomingLine, LineKind};
pub use links::{harvest, LinkSet, MAX_LINKS_PER_MESSAGE};
pub use planner::Planner;
pub use reply::{format_preview, split_for_transport, truncate_at_boundary};
