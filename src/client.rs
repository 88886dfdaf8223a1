//! HTTP client for pushing metric batches to the hub
//!
//! Pushes go through the push retry policy: any failure (connection error
//! or non-2xx status) is worth retrying until the attempt budget runs out.

use reqwest::Client;
use tracing::{debug, error};

use crate::MetricPoint;
use crate::retry::RetryPolicy;

pub struct PushClient {
    base_url: String,
    client: Client,
    policy: RetryPolicy<anyhow::Error>,
}

impl PushClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_policy(base_url, RetryPolicy::for_push())
    }

    pub fn with_policy(base_url: impl Into<String>, policy: RetryPolicy<anyhow::Error>) -> Self {
        let mut base_url = base_url.into();
        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            base_url = format!("http://{base_url}");
        }

        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: Client::new(),
            policy,
        }
    }

    /// POST a batch of points to the hub's `/updates` endpoint.
    pub async fn push_batch(&self, points: &[MetricPoint]) -> anyhow::Result<()> {
        if points.is_empty() {
            return Ok(());
        }

        let url = format!("{}/updates", self.base_url);

        self.policy
            .run(|| async {
                let response = self
                    .client
                    .post(&url)
                    .json(points)
                    .send()
                    .await
                    .map_err(|e| anyhow::anyhow!("failed sending metrics to {url}: {e}"))?;

                if !response.status().is_success() {
                    let status = response.status();
                    let body = response.text().await.unwrap_or_default();
                    error!("server returned non-OK status {status}: {body}");
                    anyhow::bail!("server returned status: {status}");
                }

                debug!("successfully pushed {} points to {url}", points.len());
                Ok(())
            })
            .await
            .map_err(|e| anyhow::anyhow!("{e}"))
    }
}
