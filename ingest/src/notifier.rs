//! Best-effort forwarding to a downstream automation webhook (Clay).
//!
//! Failures here are non-fatal to the pipeline: the record-store write has
//! already landed, so the caller captures the failure as replayable state
//! instead of escalating.

use crate::errors::{IngestError, Result};
use serde_json::Value;
use std::time::Duration;

pub struct Notifier {
    http: reqwest::Client,
    attempts: u32,
    delay: Duration,
}

impl Notifier {
    pub fn new(attempts: u32, delay: Duration) -> reqwest::Result<Self> {
        Ok(Self {
            http: reqwest::Client::builder().build()?,
            attempts: attempts.max(1),
            delay,
        })
    }

    /// POSTs the payload, retrying up to the configured attempt count with a
    /// fixed delay between attempts.
    pub async fn send(&self, target_url: &str, payload: &Value) -> Result<()> {
        let mut last_error = String::new();
        for attempt in 0..self.attempts {
            if attempt > 0 {
                tokio::time::sleep(self.delay).await;
            }
            match self.http.post(target_url).json(payload).send().await {
                Ok(response) if response.status().is_success() => return Ok(()),
                Ok(response) => {
                    let status = response.status();
                    let body = response.text().await.unwrap_or_default();
                    last_error = format!("notify endpoint returned {status}: {body}");
                }
                Err(error) => last_error = error.to_string(),
            }
            tracing::warn!(attempt, target_url, error = %last_error, "notify attempt failed");
        }
        Err(IngestError::Notify(last_error))
    }
}
