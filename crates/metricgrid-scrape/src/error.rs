//! Error types for scraping.

use std::time::Duration;

use thiserror::Error;

/// Why fetching one endpoint failed.
///
/// Never escapes the orchestrator: it is rendered into the endpoint's
/// `ScrapeReport` so sibling endpoints are unaffected.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("invalid endpoint url: {0}")]
    InvalidUrl(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("unexpected status {0}")]
    Status(u16),

    #[error("timed out after {0:?}")]
    Timeout(Duration),
}

/// Errors surfaced by a whole scrape pass.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ScrapeError {
    /// The pass was cancelled; no partial results are returned.
    #[error("scrape cancelled")]
    Cancelled,
}
