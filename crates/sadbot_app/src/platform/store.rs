use std::str::FromStr;

use async_trait::async_trait;
use sadbot_core::AuditRecord;
use sadbot_engine::{AuditSink, LocationStore};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};

pub(crate) const DEFAULT_DATABASE_URL: &str = "sqlite://sadbot.db";

/// SQLite-backed message log and weather location table.
#[derive(Clone)]
pub(crate) struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub(crate) async fn connect(url: &str, max_connections: u32) -> anyhow::Result<Self> {
        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await?;
        Self::init(&pool).await?;
        Ok(Self { pool })
    }

    /// Creates both tables when they do not exist yet.
    pub(crate) async fn init(pool: &SqlitePool) -> anyhow::Result<()> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS messages (
                id      INTEGER PRIMARY KEY AUTOINCREMENT,
                nick    TEXT    NOT NULL,
                ident   TEXT    NOT NULL,
                host    TEXT    NOT NULL,
                src     TEXT    NOT NULL,
                cmd     TEXT    NOT NULL,
                channel TEXT    NOT NULL,
                message TEXT    NOT NULL,
                time    INTEGER NOT NULL
            )",
        )
        .execute(pool)
        .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS weather_location (
                nick     TEXT PRIMARY KEY,
                location TEXT NOT NULL
            )",
        )
        .execute(pool)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl AuditSink for SqliteStore {
    async fn record(&self, record: &AuditRecord) -> anyhow::Result<()> {
        sqlx::query(
            "INSERT INTO messages (nick, ident, host, src, cmd, channel, message, time)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&record.nick)
        .bind(&record.ident)
        .bind(&record.host)
        .bind(&record.source)
        .bind(&record.command)
        .bind(&record.channel)
        .bind(&record.text)
        .bind(record.time.timestamp())
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl LocationStore for SqliteStore {
    async fn location(&self, nick: &str) -> anyhow::Result<Option<String>> {
        let row = sqlx::query_as::<_, (String,)>(
            "SELECT location FROM weather_location WHERE nick = ?",
        )
        .bind(nick)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|(location,)| location))
    }

    async fn set_location(&self, nick: &str, location: &str) -> anyhow::Result<()> {
        sqlx::query(
            "INSERT INTO weather_location (nick, location) VALUES (?, ?)
             ON CONFLICT(nick) DO UPDATE SET location = excluded.location",
        )
        .bind(nick)
        .bind(location)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
