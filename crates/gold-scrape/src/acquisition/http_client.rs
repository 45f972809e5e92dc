//! Async HTTP fetcher wrapping reqwest.
//!
//! Not a browser. One GET with a per-attempt timeout, a randomized
//! user agent per session, an optional proxy, and bounded exponential backoff
//! on transport failures and on the statuses listed in [`RetryPolicy`].
//! Failures come back as [`FetchError`] values, never as panics.

use std::sync::Arc;
use std::time::Duration;

use crate::acquisition::user_agent;
use crate::config::{FetchConfig, RetryPolicy};
use crate::error::FetchError;
use crate::events::{ScrapeEvent, ScrapeObserver};

/// A successfully fetched page.
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// Requested URL.
    pub url: String,
    /// Final URL after redirects.
    pub final_url: String,
    pub status: u16,
    pub body: String,
    /// Requests issued, including the successful one.
    pub attempts: u32,
}

/// Outcome of a whole fetch, retries included.
pub type FetchResult = Result<FetchedPage, FetchError>;

/// Outcome of a single request.
enum Attempt {
    Done(FetchedPage),
    Retry {
        error: FetchError,
        /// Seconds from a `Retry-After` header, if any.
        retry_after: Option<u64>,
    },
    Fail(FetchError),
}

/// One fetch session: a client with a fixed identity plus the retry policy.
#[derive(Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    user_agent: &'static str,
    config: FetchConfig,
    observer: Arc<dyn ScrapeObserver>,
}

impl HttpFetcher {
    /// Build a session. The user agent is chosen here and kept for every request.
    pub fn new(config: FetchConfig, observer: Arc<dyn ScrapeObserver>) -> Result<Self, FetchError> {
        let user_agent = user_agent::pick(config.random_user_agent);

        let mut builder = reqwest::Client::builder()
            .timeout(config.timeout())
            .connect_timeout(config.timeout())
            .redirect(reqwest::redirect::Policy::limited(5))
            .user_agent(user_agent);

        if let Some(proxy) = &config.proxy {
            let proxy = reqwest::Proxy::all(proxy)
                .map_err(|e| FetchError::Client(format!("invalid proxy '{proxy}': {e}")))?;
            builder = builder.proxy(proxy);
        }

        let client = builder
            .build()
            .map_err(|e| FetchError::Client(error_chain(&e)))?;

        Ok(Self {
            client,
            user_agent,
            config,
            observer,
        })
    }

    /// Identity presented by this session.
    pub fn user_agent(&self) -> &str {
        self.user_agent
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.config.retry
    }

    /// GET `url`, retrying transient failures per the policy.
    pub async fn fetch(&self, url: &str) -> FetchResult {
        let policy = &self.config.retry;
        self.observer.on_event(&ScrapeEvent::FetchStarted {
            url: url.to_string(),
            user_agent: self.user_agent.to_string(),
        });

        let mut attempt = 0u32;
        loop {
            attempt += 1;
            let (error, retry_after) = match self.attempt(url, attempt).await {
                Attempt::Done(page) => {
                    self.observer.on_event(&ScrapeEvent::FetchSucceeded {
                        url: url.to_string(),
                        status: page.status,
                        attempts: page.attempts,
                        body_len: page.body.len(),
                    });
                    return Ok(page);
                }
                Attempt::Fail(error) => return Err(self.give_up(url, error)),
                Attempt::Retry { error, retry_after } => (error, retry_after),
            };

            if attempt >= policy.max_attempts {
                return Err(self.give_up(url, error));
            }

            let delay = self.delay_before_retry(attempt, retry_after);
            self.observer.on_event(&ScrapeEvent::FetchRetrying {
                url: url.to_string(),
                attempt,
                error: error.to_string(),
                retry_in_ms: delay.as_millis() as u64,
            });
            tokio::time::sleep(delay).await;
        }
    }

    async fn attempt(&self, url: &str, attempt: u32) -> Attempt {
        let resp = match self
            .client
            .get(url)
            .timeout(self.config.timeout())
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => {
                let error = FetchError::Transport {
                    url: url.to_string(),
                    attempts: attempt,
                    message: error_chain(&e),
                };
                // Redirect loops and malformed URLs will not heal on retry.
                if e.is_redirect() || e.is_builder() {
                    return Attempt::Fail(error);
                }
                return Attempt::Retry {
                    error,
                    retry_after: None,
                };
            }
        };

        let status = resp.status().as_u16();
        if resp.status().is_client_error() || resp.status().is_server_error() {
            let error = FetchError::Status {
                url: url.to_string(),
                status,
                attempts: attempt,
            };
            if !self.config.retry.is_retryable_status(status) {
                return Attempt::Fail(error);
            }
            let retry_after = resp
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.trim().parse::<u64>().ok());
            return Attempt::Retry { error, retry_after };
        }

        let final_url = resp.url().to_string();
        match resp.text().await {
            Ok(body) => Attempt::Done(FetchedPage {
                url: url.to_string(),
                final_url,
                status,
                body,
                attempts: attempt,
            }),
            Err(e) => Attempt::Retry {
                error: FetchError::Transport {
                    url: url.to_string(),
                    attempts: attempt,
                    message: error_chain(&e),
                },
                retry_after: None,
            },
        }
    }

    fn delay_before_retry(&self, retry: u32, retry_after: Option<u64>) -> Duration {
        let policy = &self.config.retry;
        match retry_after {
            Some(secs) if policy.respect_retry_after => policy.retry_after_delay(secs),
            _ => policy.backoff_delay(retry),
        }
    }

    fn give_up(&self, url: &str, error: FetchError) -> FetchError {
        self.observer.on_event(&ScrapeEvent::FetchFailed {
            url: url.to_string(),
            attempts: error.attempts(),
            error: error.to_string(),
        });
        error
    }
}

/// Flatten an error and its sources into one line.
fn error_chain(err: &(dyn std::error::Error + 'static)) -> String {
    let mut msg = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !msg.contains(&text) {
            msg.push_str(": ");
            msg.push_str(&text);
        }
        source = cause.source();
    }
    msg
}
