//! Audit fan-out for ingested metrics
//!
//! Every accepted batch can be reported to registered subscribers: a file
//! subscriber appending JSON events, and a URL subscriber POSTing them to a
//! remote endpoint through the push retry policy. Individual subscriber
//! failures are logged and never fail the surrounding request.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::config::Config;
use crate::retry::RetryPolicy;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    pub ts: i64,
    pub metrics: Vec<String>,
    pub ip: String,
}

#[async_trait]
pub trait Subscriber: Send + Sync {
    async fn notify(&self, event: &AuditEvent) -> anyhow::Result<()>;
    fn name(&self) -> &'static str;
}

/// Appends one JSON event per line to a local file.
pub struct FileSubscriber {
    path: PathBuf,
}

impl FileSubscriber {
    pub fn new(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref().to_path_buf();

        // Pre-create the file so notify only ever appends.
        OpenOptions::new().create(true).append(true).open(&path)?;

        Ok(Self { path })
    }
}

#[async_trait]
impl Subscriber for FileSubscriber {
    async fn notify(&self, event: &AuditEvent) -> anyhow::Result<()> {
        let mut data = serde_json::to_vec(event)?;
        data.push(b'\n');

        let mut file = OpenOptions::new().append(true).open(&self.path)?;
        file.write_all(&data)?;

        info!("audit event written to {}", self.path.display());
        Ok(())
    }

    fn name(&self) -> &'static str {
        "file"
    }
}

/// POSTs each event to a remote endpoint, retrying per the push policy.
pub struct UrlSubscriber {
    url: String,
    client: Client,
    policy: RetryPolicy<anyhow::Error>,
}

impl UrlSubscriber {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            client: Client::new(),
            policy: RetryPolicy::for_push(),
        }
    }
}

#[async_trait]
impl Subscriber for UrlSubscriber {
    async fn notify(&self, event: &AuditEvent) -> anyhow::Result<()> {
        self.policy
            .run(|| async {
                let response = self
                    .client
                    .post(&self.url)
                    .json(event)
                    .send()
                    .await
                    .map_err(|e| anyhow::anyhow!("failed sending audit to {}: {e}", self.url))?;

                if !response.status().is_success() {
                    anyhow::bail!("audit server returned status {}", response.status());
                }
                Ok(())
            })
            .await
            .map_err(|e| anyhow::anyhow!("{e}"))
    }

    fn name(&self) -> &'static str {
        "url"
    }
}

/// Registry of audit subscribers.
#[derive(Default)]
pub struct AuditLog {
    subscribers: Vec<Box<dyn Subscriber>>,
}

impl AuditLog {
    pub fn register(&mut self, subscriber: Box<dyn Subscriber>) {
        self.subscribers.push(subscriber);
    }

    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }

    /// Fan an event out to every subscriber, logging and continuing on
    /// failure.
    pub async fn notify(&self, metrics: Vec<String>, ip: &str) {
        let event = AuditEvent {
            ts: Utc::now().timestamp(),
            metrics,
            ip: ip.to_string(),
        };

        for subscriber in &self.subscribers {
            if let Err(e) = subscriber.notify(&event).await {
                error!("audit subscriber '{}' failed: {e}", subscriber.name());
            }
        }
    }
}

/// Build the audit log from configuration; `None` when no subscriber is
/// configured.
pub fn build_audit_log(config: &Config) -> Option<AuditLog> {
    let mut log = AuditLog::default();

    if let Some(path) = config.audit_file.as_deref().filter(|s| !s.is_empty()) {
        match FileSubscriber::new(path) {
            Ok(subscriber) => log.register(Box::new(subscriber)),
            Err(e) => error!("unable to open audit file {path}: {e}"),
        }
    }

    if let Some(url) = config.audit_url.as_deref().filter(|s| !s.is_empty()) {
        log.register(Box::new(UrlSubscriber::new(url)));
    }

    if log.is_empty() { None } else { Some(log) }
}
