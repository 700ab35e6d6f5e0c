//! Plain HTTP/1 fetcher built on hyper client connections.

use bytes::Bytes;
use http_body_util::{BodyExt, Empty};
use hyper_util::rt::TokioIo;
use tracing::debug;

use metricgrid_scrape::{BoxFuture, FetchError, FetchResponse, Fetcher};

const USER_AGENT: &str = concat!("metricgrid/", env!("CARGO_PKG_VERSION"));

/// GETs `http://` URLs over a fresh connection per request.
///
/// Timeouts are left to the scrape orchestrator; dropping the future closes
/// the connection.
#[derive(Debug, Clone, Default)]
pub struct HttpFetcher;

impl HttpFetcher {
    pub fn new() -> Self {
        Self
    }

    async fn get(&self, url: &str) -> Result<FetchResponse, FetchError> {
        let target = Target::parse(url)?;

        let stream = tokio::net::TcpStream::connect((target.host.as_str(), target.port))
            .await
            .map_err(|e| FetchError::Transport(format!("connect to {}: {e}", target.authority)))?;

        let io = TokioIo::new(stream);
        let (mut sender, conn) = hyper::client::conn::http1::handshake(io)
            .await
            .map_err(|e| FetchError::Transport(format!("handshake: {e}")))?;

        // Drive the connection in the background.
        let authority = target.authority.clone();
        tokio::spawn(async move {
            if let Err(e) = conn.await {
                debug!(error = %e, %authority, "scrape connection closed with error");
            }
        });

        let req = http::Request::builder()
            .method("GET")
            .uri(target.path_and_query.as_str())
            .header("host", target.authority.as_str())
            .header("user-agent", USER_AGENT)
            .header("accept", "text/plain")
            .body(Empty::<Bytes>::new())
            .map_err(|e| FetchError::InvalidUrl(format!("{url}: {e}")))?;

        let resp = sender
            .send_request(req)
            .await
            .map_err(|e| FetchError::Transport(format!("request: {e}")))?;

        let status = resp.status().as_u16();
        let body = resp
            .into_body()
            .collect()
            .await
            .map_err(|e| FetchError::Transport(format!("reading body: {e}")))?
            .to_bytes();

        Ok(FetchResponse::new(status, String::from_utf8_lossy(&body)))
    }
}

impl Fetcher for HttpFetcher {
    fn fetch<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<FetchResponse, FetchError>> {
        Box::pin(self.get(url))
    }
}

/// Connection details extracted from an endpoint URL.
#[derive(Debug, PartialEq, Eq)]
struct Target {
    host: String,
    port: u16,
    authority: String,
    path_and_query: String,
}

impl Target {
    fn parse(url: &str) -> Result<Self, FetchError> {
        let invalid = |reason: &str| FetchError::InvalidUrl(format!("{url}: {reason}"));

        let uri: http::Uri = url.parse().map_err(|e: http::uri::InvalidUri| invalid(&e.to_string()))?;
        match uri.scheme_str() {
            Some("http") => {}
            Some(other) => return Err(invalid(&format!("unsupported scheme {other}"))),
            None => return Err(invalid("missing scheme")),
        }

        let authority = uri.authority().ok_or_else(|| invalid("missing host"))?;
        let host = authority
            .host()
            .trim_start_matches('[')
            .trim_end_matches(']')
            .to_string();
        if host.is_empty() {
            return Err(invalid("missing host"));
        }

        Ok(Self {
            host,
            port: authority.port_u16().unwrap_or(80),
            authority: authority.as_str().to_string(),
            path_and_query: uri
                .path_and_query()
                .map(|p| p.as_str())
                .filter(|p| !p.is_empty())
                .unwrap_or("/")
                .to_string(),
        })
    }
}
