//! gold-scrape: daily gold price scraper.
//!
//! Fetches the price page with a retrying HTTP client, decodes the price
//! table and the inline chart script, and hands a one-line summary to a
//! notifier. See [`pipeline::PipelineCoordinator`] for the run sequence.

pub mod acquisition;
pub mod config;
pub mod error;
pub mod events;
pub mod extraction;
pub mod pipeline;
pub mod types;

pub use acquisition::{FetchResult, FetchedPage, HttpFetcher};
pub use config::{FetchConfig, PageLayout, RetryPolicy, ScrapeConfig};
pub use error::{FetchError, ScrapeError, ScrapeResult};
pub use events::{MemoryObserver, ScrapeEvent, ScrapeObserver, TracingObserver};
pub use pipeline::{PipelineCoordinator, RunReport};
pub use types::*;
