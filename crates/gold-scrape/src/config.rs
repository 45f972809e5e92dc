//! Configuration loading and resolution.
//!
//! Every knob has a documented default; the binary overrides them in the
//! order CLI flag > environment variable > default.

use std::collections::BTreeSet;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ScrapeError, ScrapeResult};

/// Page scraped when no URL is given.
pub const DEFAULT_URL: &str = "https://www.24h.com.vn/gia-vang-hom-nay-c425.html";

/// Per-attempt request timeout (10 s).
pub const DEFAULT_TIMEOUT_MS: u64 = 10_000;

/// Statuses worth another attempt.
pub const DEFAULT_RETRYABLE_STATUSES: [u16; 5] = [429, 500, 502, 503, 504];

pub const ENV_URL: &str = "GOLD_SCRAPE_URL";
pub const ENV_PROXY: &str = "GOLD_SCRAPE_PROXY";
pub const ENV_TIMEOUT_SECS: &str = "GOLD_SCRAPE_TIMEOUT_SECS";

/// Top-level configuration for one scrape run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapeConfig {
    /// Source page.
    pub url: String,
    pub fetch: FetchConfig,
    pub layout: PageLayout,
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_URL.to_string(),
            fetch: FetchConfig::default(),
            layout: PageLayout::default(),
        }
    }
}

impl ScrapeConfig {
    /// Defaults overlaid with `GOLD_SCRAPE_*` environment variables.
    pub fn from_env() -> ScrapeResult<Self> {
        let mut cfg = Self::default();
        if let Ok(url) = std::env::var(ENV_URL) {
            cfg.url = url;
        }
        if let Ok(proxy) = std::env::var(ENV_PROXY) {
            if !proxy.trim().is_empty() {
                cfg.fetch.proxy = Some(proxy);
            }
        }
        if let Ok(secs) = std::env::var(ENV_TIMEOUT_SECS) {
            let secs: u64 = secs.trim().parse().map_err(|_| {
                ScrapeError::Config(format!("{ENV_TIMEOUT_SECS} must be whole seconds, got '{secs}'"))
            })?;
            cfg.fetch.set_timeout_secs(secs)?;
        }
        Ok(cfg)
    }

    /// Reject values that would make a run hang or never try.
    pub fn validate(&self) -> ScrapeResult<()> {
        url::Url::parse(&self.url)
            .map_err(|e| ScrapeError::Config(format!("invalid url '{}': {e}", self.url)))?;
        if let Some(proxy) = &self.fetch.proxy {
            url::Url::parse(proxy)
                .map_err(|e| ScrapeError::Config(format!("invalid proxy '{proxy}': {e}")))?;
        }
        if self.fetch.timeout_ms == 0 {
            return Err(ScrapeError::Config("timeout must be non-zero".into()));
        }
        self.fetch.retry.validate()
    }
}

/// HTTP client settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Upper bound for a single attempt, in milliseconds.
    pub timeout_ms: u64,
    /// Optional proxy URL applied to all schemes.
    pub proxy: Option<String>,
    /// Pick a browser user agent at random per session.
    pub random_user_agent: bool,
    pub retry: RetryPolicy,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_TIMEOUT_MS,
            proxy: None,
            random_user_agent: true,
            retry: RetryPolicy::default(),
        }
    }
}

impl FetchConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Set the per-attempt timeout from whole seconds.
    pub fn set_timeout_secs(&mut self, secs: u64) -> ScrapeResult<()> {
        self.timeout_ms = secs
            .checked_mul(1000)
            .ok_or_else(|| ScrapeError::Config(format!("timeout of {secs}s is too large")))?;
        Ok(())
    }
}

/// Bounded exponential backoff.
///
/// The delay before retry `n` (1-based) is `backoff_unit_ms * backoff_base^(n-1)`,
/// capped at `max_backoff_ms`. With the defaults the sleeps are 1, 2, 4 and 8
/// seconds across five attempts.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts including the first request.
    pub max_attempts: u32,
    pub backoff_base: f64,
    pub backoff_unit_ms: u64,
    pub max_backoff_ms: u64,
    pub retryable_statuses: BTreeSet<u16>,
    /// Use a numeric `Retry-After` header instead of the computed delay.
    pub respect_retry_after: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            backoff_base: 2.0,
            backoff_unit_ms: 1_000,
            max_backoff_ms: 120_000,
            retryable_statuses: DEFAULT_RETRYABLE_STATUSES.into_iter().collect(),
            respect_retry_after: true,
        }
    }
}

impl RetryPolicy {
    pub fn validate(&self) -> ScrapeResult<()> {
        if self.max_attempts == 0 {
            return Err(ScrapeError::Config("max_attempts must be at least 1".into()));
        }
        if !self.backoff_base.is_finite() || self.backoff_base < 1.0 {
            return Err(ScrapeError::Config(format!(
                "backoff_base must be >= 1, got {}",
                self.backoff_base
            )));
        }
        Ok(())
    }

    pub fn is_retryable_status(&self, status: u16) -> bool {
        self.retryable_statuses.contains(&status)
    }

    /// Sleep before the `retry`-th retry (1-based).
    pub fn backoff_delay(&self, retry: u32) -> Duration {
        let exp = retry.saturating_sub(1).min(32) as i32;
        let ms = self.backoff_unit_ms as f64 * self.backoff_base.powi(exp);
        let capped = ms.min(self.max_backoff_ms as f64).max(0.0);
        Duration::from_millis(capped as u64)
    }

    /// Server-requested delay, capped like the computed one.
    pub fn retry_after_delay(&self, seconds: u64) -> Duration {
        Duration::from_millis(seconds.saturating_mul(1000).min(self.max_backoff_ms))
    }
}

/// CSS selectors pinning the two page regions we read.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageLayout {
    pub table_selector: String,
    pub chart_script_selector: String,
}

impl Default for PageLayout {
    fn default() -> Self {
        Self {
            table_selector: "table[class='gia-vang-search-data-table']".to_string(),
            chart_script_selector:
                "div[class='cate-24h-gold-pri-chart'] > script[type='text/javascript']"
                    .to_string(),
        }
    }
}
