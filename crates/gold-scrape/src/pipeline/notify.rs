//! Price summary delivery.

use std::io::Write;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::{ScrapeError, ScrapeResult};
use crate::pipeline::credentials::SessionCredentials;
use crate::types::GoldPriceRecord;

/// Subject line of every summary.
pub const SUBJECT: &str = "Gold Data";

/// A plain-text price summary.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notification {
    pub subject: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl Notification {
    /// Summary of the primary record. Always names both today's prices.
    pub fn for_record(record: &GoldPriceRecord) -> Self {
        Self {
            subject: SUBJECT.to_string(),
            message: format!(
                "Gold data for today: {} - {}",
                record.buy_price, record.sell_price
            ),
            timestamp: Utc::now(),
        }
    }
}

/// Delivery channel for the summary.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(
        &self,
        credentials: &SessionCredentials,
        notification: &Notification,
    ) -> ScrapeResult<()>;
}

/// Writes the summary to a stream (stdout, stderr or a file).
pub struct StreamNotifier {
    out: Mutex<Box<dyn Write + Send>>,
}

impl StreamNotifier {
    pub fn stdout() -> Self {
        Self::new(Box::new(std::io::stdout()))
    }

    pub fn stderr() -> Self {
        Self::new(Box::new(std::io::stderr()))
    }

    pub fn new(out: Box<dyn Write + Send>) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }
}

#[async_trait]
impl Notifier for StreamNotifier {
    async fn notify(
        &self,
        _credentials: &SessionCredentials,
        notification: &Notification,
    ) -> ScrapeResult<()> {
        let mut out = self
            .out
            .lock()
            .map_err(|_| ScrapeError::Notify("output stream poisoned".into()))?;
        writeln!(out, "{}: {}", notification.subject, notification.message)
            .and_then(|_| out.flush())
            .map_err(|e| ScrapeError::Notify(e.to_string()))
    }
}

/// POSTs the summary as JSON, authenticated with the session token.
pub struct WebhookNotifier {
    client: reqwest::Client,
    url: String,
}

impl WebhookNotifier {
    pub fn new(url: impl Into<String>, timeout: Duration) -> ScrapeResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ScrapeError::Notify(e.to_string()))?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn notify(
        &self,
        credentials: &SessionCredentials,
        notification: &Notification,
    ) -> ScrapeResult<()> {
        let resp = self
            .client
            .post(&self.url)
            .bearer_auth(credentials.session_token())
            .json(notification)
            .send()
            .await
            .map_err(|e| ScrapeError::Notify(format!("POST {}: {e}", self.url)))?;

        if !resp.status().is_success() {
            return Err(ScrapeError::Notify(format!(
                "POST {} returned {}",
                self.url,
                resp.status().as_u16()
            )));
        }
        Ok(())
    }
}
