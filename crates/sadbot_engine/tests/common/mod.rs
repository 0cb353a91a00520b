#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use sadbot_core::AuditRecord;
use sadbot_engine::{AuditSink, LocationStore, ReplySink};

#[derive(Default, Clone)]
pub struct RecordingReplies {
    sent: Arc<Mutex<Vec<(String, String)>>>,
}

impl RecordingReplies {
    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().unwrap().clone()
    }

    /// Polls until at least `count` lines were sent or the deadline passes.
    pub async fn wait_for(&self, count: usize) -> Vec<(String, String)> {
        wait_until(|| self.sent.lock().unwrap().len() >= count).await;
        self.sent()
    }
}

impl ReplySink for RecordingReplies {
    fn send(&self, target: &str, text: &str) {
        self.sent
            .lock()
            .unwrap()
            .push((target.to_string(), text.to_string()));
    }
}

#[derive(Default, Clone)]
pub struct RecordingAudit {
    pub records: Arc<Mutex<Vec<AuditRecord>>>,
    pub fail: bool,
}

impl RecordingAudit {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }
}

#[async_trait::async_trait]
impl AuditSink for RecordingAudit {
    async fn record(&self, record: &AuditRecord) -> anyhow::Result<()> {
        self.records.lock().unwrap().push(record.clone());
        if self.fail {
            anyhow::bail!("database is on fire");
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryLocations {
    places: Mutex<HashMap<String, String>>,
}

#[async_trait::async_trait]
impl LocationStore for MemoryLocations {
    async fn location(&self, nick: &str) -> anyhow::Result<Option<String>> {
        Ok(self.places.lock().unwrap().get(nick).cloned())
    }

    async fn set_location(&self, nick: &str, location: &str) -> anyhow::Result<()> {
        self.places
            .lock()
            .unwrap()
            .insert(nick.to_string(), location.to_string());
        Ok(())
    }
}

/// A location table whose reads always fail.
#[derive(Default)]
pub struct BrokenLocations;

#[async_trait::async_trait]
impl LocationStore for BrokenLocations {
    async fn location(&self, _nick: &str) -> anyhow::Result<Option<String>> {
        anyhow::bail!("database is locked")
    }

    async fn set_location(&self, _nick: &str, _location: &str) -> anyhow::Result<()> {
        Ok(())
    }
}

pub async fn wait_until(mut done: impl FnMut() -> bool) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while !done() && tokio::time::Instant::now() < deadline {
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
