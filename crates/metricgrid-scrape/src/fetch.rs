//! The fetch capability supplied by the hosting application.

use std::future::Future;
use std::pin::Pin;

use crate::error::FetchError;

/// Boxed, sendable future returned by [`Fetcher::fetch`].
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Status and body of a completed request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchResponse {
    pub status: u16,
    pub body: String,
}

impl FetchResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// HTTP-like GET capability.
///
/// Implementations return any completed response, whatever its status;
/// the orchestrator decides what counts as a failed scrape. Dropping the
/// returned future must abandon the request.
pub trait Fetcher: Send + Sync {
    fn fetch<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<FetchResponse, FetchError>>;
}
