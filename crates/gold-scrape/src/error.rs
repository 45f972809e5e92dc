//! Error taxonomy for the fetch-and-extract pipeline.

/// Why a page fetch gave up.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// Connect failure, timeout, or broken body on every attempt.
    #[error("transport error fetching {url} after {attempts} attempt(s): {message}")]
    Transport {
        url: String,
        attempts: u32,
        message: String,
    },

    /// Terminal HTTP status, or a retryable one that never cleared.
    #[error("HTTP {status} fetching {url} after {attempts} attempt(s)")]
    Status {
        url: String,
        status: u16,
        attempts: u32,
    },

    /// The HTTP client could not be built (bad proxy URL, TLS backend).
    #[error("HTTP client error: {0}")]
    Client(String),
}

impl FetchError {
    /// Number of requests issued before giving up.
    pub fn attempts(&self) -> u32 {
        match self {
            FetchError::Transport { attempts, .. } | FetchError::Status { attempts, .. } => {
                *attempts
            }
            FetchError::Client(_) => 0,
        }
    }
}

/// All errors that can end or degrade a scrape run.
#[derive(thiserror::Error, Debug)]
pub enum ScrapeError {
    #[error("fetch failed: {0}")]
    FetchFailed(#[from] FetchError),

    /// An expected markup element is absent; the page layout has changed.
    #[error("structure not found: {element}")]
    StructureNotFound { element: String },

    #[error("table row {row} malformed: {reason}")]
    RowMalformed { row: usize, reason: String },

    #[error("chart payload malformed: {reason}")]
    ChartMalformed { reason: String },

    #[error("credentials unavailable: {0}")]
    Credentials(String),

    #[error("notification failed: {0}")]
    Notify(String),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl ScrapeError {
    /// Short machine-readable tag used in events and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            ScrapeError::FetchFailed(_) => "fetch_failed",
            ScrapeError::StructureNotFound { .. } => "structure_not_found",
            ScrapeError::RowMalformed { .. } => "row_malformed",
            ScrapeError::ChartMalformed { .. } => "chart_malformed",
            ScrapeError::Credentials(_) => "credentials",
            ScrapeError::Notify(_) => "notify",
            ScrapeError::Config(_) => "config",
        }
    }

    pub(crate) fn structure(element: impl Into<String>) -> Self {
        ScrapeError::StructureNotFound {
            element: element.into(),
        }
    }

    pub(crate) fn row(row: usize, reason: impl Into<String>) -> Self {
        ScrapeError::RowMalformed {
            row,
            reason: reason.into(),
        }
    }

    pub(crate) fn chart(reason: impl Into<String>) -> Self {
        ScrapeError::ChartMalformed {
            reason: reason.into(),
        }
    }
}

pub type ScrapeResult<T> = Result<T, ScrapeError>;
