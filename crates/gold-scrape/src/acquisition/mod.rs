//! Page acquisition over plain HTTP.
//!
//! One [`http_client::HttpFetcher`] per run; it owns the client identity and
//! the retry policy for that session.

pub mod http_client;
pub mod user_agent;

pub use http_client::{FetchResult, FetchedPage, HttpFetcher};
