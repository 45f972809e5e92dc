//! Typed events from every pipeline stage.
//!
//! Components never log directly. They hand a [`ScrapeEvent`] to the
//! [`ScrapeObserver`] they were constructed with; [`TracingObserver`] turns
//! events into `tracing` records and [`MemoryObserver`] keeps them for
//! inspection (tests, `--json` output).

use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};

/// Which step of the run an event belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Fetch,
    Table,
    Chart,
    Credentials,
    Notify,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Stage::Fetch => "fetch",
            Stage::Table => "table",
            Stage::Chart => "chart",
            Stage::Credentials => "credentials",
            Stage::Notify => "notify",
        };
        f.write_str(s)
    }
}

/// Every event the pipeline emits.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ScrapeEvent {
    // ── Fetch ─────────────────────────────
    FetchStarted {
        url: String,
        user_agent: String,
    },
    /// One attempt failed; another will follow after `retry_in_ms`.
    FetchRetrying {
        url: String,
        attempt: u32,
        error: String,
        retry_in_ms: u64,
    },
    FetchSucceeded {
        url: String,
        status: u16,
        attempts: u32,
        body_len: usize,
    },
    FetchFailed {
        url: String,
        attempts: u32,
        error: String,
    },

    // ── Extraction ────────────────────────
    /// The published record, logged as today's gold prices.
    TableParsed {
        index: String,
        buy_price: u64,
        sell_price: u64,
        yesterday_buy_price: u64,
        yesterday_sell_price: u64,
    },
    ChartParsed {
        points: usize,
    },
    /// Extraction failed. `body_len` sizes the input without echoing it.
    ExtractionFailed {
        stage: Stage,
        url: String,
        error: String,
        body_len: usize,
        fatal: bool,
    },

    // ── Delivery ──────────────────────────
    NotificationSent {
        subject: String,
    },
    DeliveryFailed {
        stage: Stage,
        error: String,
    },
}

/// How loudly an event should be reported.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Debug,
    Info,
    Warn,
    Error,
}

impl ScrapeEvent {
    pub fn severity(&self) -> Severity {
        match self {
            ScrapeEvent::FetchStarted { .. } => Severity::Debug,
            ScrapeEvent::FetchRetrying { .. } => Severity::Warn,
            ScrapeEvent::FetchSucceeded { .. }
            | ScrapeEvent::TableParsed { .. }
            | ScrapeEvent::ChartParsed { .. }
            | ScrapeEvent::NotificationSent { .. } => Severity::Info,
            ScrapeEvent::ExtractionFailed { fatal: false, .. } => Severity::Warn,
            ScrapeEvent::FetchFailed { .. }
            | ScrapeEvent::ExtractionFailed { .. }
            | ScrapeEvent::DeliveryFailed { .. } => Severity::Error,
        }
    }
}

/// Receives pipeline events. Injected into each component.
pub trait ScrapeObserver: Send + Sync {
    fn on_event(&self, event: &ScrapeEvent);
}

/// Forwards events to the `tracing` subscriber installed by the binary.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl ScrapeObserver for TracingObserver {
    fn on_event(&self, event: &ScrapeEvent) {
        match event {
            ScrapeEvent::FetchStarted { url, user_agent } => {
                tracing::debug!(%url, %user_agent, "fetching page");
            }
            ScrapeEvent::FetchRetrying {
                url,
                attempt,
                error,
                retry_in_ms,
            } => {
                tracing::warn!(%url, attempt, retry_in_ms, "fetch attempt failed: {error}");
            }
            ScrapeEvent::FetchSucceeded {
                url,
                status,
                attempts,
                body_len,
            } => {
                tracing::info!(%url, status, attempts, body_len, "fetched page");
            }
            ScrapeEvent::FetchFailed {
                url,
                attempts,
                error,
            } => {
                tracing::error!(%url, attempts, "error fetching HTML data: {error}");
            }
            ScrapeEvent::TableParsed {
                index,
                buy_price,
                sell_price,
                yesterday_buy_price,
                yesterday_sell_price,
            } => {
                tracing::info!(
                    %index,
                    buy_price,
                    sell_price,
                    yesterday_buy_price,
                    yesterday_sell_price,
                    "gold prices"
                );
            }
            ScrapeEvent::ChartParsed { points } => {
                tracing::info!(points, "chart series parsed");
            }
            ScrapeEvent::ExtractionFailed {
                stage,
                url,
                error,
                body_len,
                ..
            } => match event.severity() {
                Severity::Error => {
                    tracing::error!(%stage, %url, body_len, "extraction failed: {error}");
                }
                _ => {
                    tracing::warn!(%stage, %url, body_len, "extraction skipped: {error}");
                }
            },
            ScrapeEvent::NotificationSent { subject } => {
                tracing::info!(%subject, "notification sent");
            }
            ScrapeEvent::DeliveryFailed { stage, error } => {
                tracing::error!(%stage, "delivery failed: {error}");
            }
        }
    }
}

/// Collects events in memory.
#[derive(Debug, Default)]
pub struct MemoryObserver {
    events: Mutex<Vec<ScrapeEvent>>,
}

impl MemoryObserver {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Snapshot of everything observed so far.
    pub fn events(&self) -> Vec<ScrapeEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }
}

impl ScrapeObserver for MemoryObserver {
    fn on_event(&self, event: &ScrapeEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }
}

/// Fans one event out to several observers.
pub struct Fanout(pub Vec<Arc<dyn ScrapeObserver>>);

impl ScrapeObserver for Fanout {
    fn on_event(&self, event: &ScrapeEvent) {
        for observer in &self.0 {
            observer.on_event(event);
        }
    }
}
