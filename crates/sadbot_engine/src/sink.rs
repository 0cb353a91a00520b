use sadbot_core::{AuditRecord, BuiltinCommand};

/// Outgoing side of the chat transport.
///
/// Implementations queue the line and return immediately. The `Dispatcher`
/// only hands over text already cut to the configured split length.
pub trait ReplySink: Send + Sync {
    fn send(&self, target: &str, text: &str);
}

/// Persistent audit log. Failures are logged by the caller and never retried.
#[async_trait::async_trait]
pub trait AuditSink: Send + Sync {
    async fn record(&self, record: &AuditRecord) -> anyhow::Result<()>;
}

/// Per-nick weather locations.
#[async_trait::async_trait]
pub trait LocationStore: Send + Sync {
    /// Stored location, or `None` if the nick never set one (or cleared it).
    async fn location(&self, nick: &str) -> anyhow::Result<Option<String>>;
    /// Stores `location`; an empty string clears it.
    async fn set_location(&self, nick: &str, location: &str) -> anyhow::Result<()>;
}

/// Handlers for built-in commands that need outside services.
#[async_trait::async_trait]
pub trait BuiltinServices: Send + Sync {
    async fn run(
        &self,
        target: &str,
        requester: &str,
        command: &BuiltinCommand,
        replies: &dyn ReplySink,
    );
}
