//! metricgrid-scrape — concurrent scraping of registered endpoints.
//!
//! The transport is injected through the [`Fetcher`] trait; this crate
//! never opens a connection itself.
//!
//! # Architecture
//!
//! ```text
//! Scraper::scrape_all(registrations, cancel)
//!   ├── one scrape_one() future per registration, polled concurrently
//!   │     ├── Fetcher::fetch(url) under a per-endpoint timeout
//!   │     ├── non-2xx / transport error / timeout → ScrapeReport::failure
//!   │     └── 2xx body → exposition::parse → ScrapeReport::success
//!   └── join all, or abandon everything on cancellation
//! ```
//!
//! There is no retry; the caller's refresh loop decides when to scrape
//! again.

pub mod error;
pub mod fetch;
pub mod orchestrator;

pub use error::{FetchError, ScrapeError};
pub use fetch::{BoxFuture, FetchResponse, Fetcher};
pub use orchestrator::{DEFAULT_SCRAPE_TIMEOUT, ScrapeOptions, Scraper, scrape_one};
