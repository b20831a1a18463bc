//! Push publisher.
//!
//! POSTs the serialized snapshot to a collector once per second. Delivery is
//! at most once: failures are logged at debug level and dropped, and the next
//! tick simply sends a fresh snapshot.

use crate::bridge::Serializer;
use crate::registry::Registry;
use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::header::{HeaderValue, CONTENT_TYPE};
use hyper::{Method, Request, StatusCode, Uri};
use hyper_rustls::{HttpsConnector, HttpsConnectorBuilder};
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::{interval_at, timeout, Instant, MissedTickBehavior};
use tracing::{debug, info};

/// Time between pushes.
pub const PUSH_INTERVAL: Duration = Duration::from_secs(1);

/// Default bound on a single push, including draining the response.
pub const DEFAULT_PUSH_TIMEOUT: Duration = Duration::from_secs(5);

/// Why a single push did not complete.
#[derive(Debug, thiserror::Error)]
pub enum PushError {
    #[error("failed to encode snapshot: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("request failed: {0}")]
    Transport(#[from] hyper_util::client::legacy::Error),

    #[error("request timed out after {0:?}")]
    Timeout(Duration),
}

/// Parse a push URL. Empty means push is disabled.
///
/// Collectors are reached over `http` or `https`.
pub fn parse_push_url(url: &str) -> Result<Option<Uri>, String> {
    if url.is_empty() {
        return Ok(None);
    }

    let uri = url.parse::<Uri>().map_err(|e| e.to_string())?;
    match uri.scheme_str() {
        Some("http" | "https") => {}
        Some(other) => {
            return Err(format!(
                "unsupported scheme '{}', expected http or https",
                other
            ))
        }
        None => return Err("missing scheme, expected http:// or https://".to_string()),
    }
    if uri.authority().is_none() {
        return Err("missing host".to_string());
    }

    Ok(Some(uri))
}

/// Periodically POSTs the snapshot to a collector.
pub struct PushPublisher {
    url: Uri,
    registry: Registry,
    serializer: Serializer,
    client: Client<HttpsConnector<HttpConnector>, Full<Bytes>>,
    request_timeout: Duration,
}

impl PushPublisher {
    pub fn new(
        url: Uri,
        registry: Registry,
        serializer: Serializer,
        request_timeout: Duration,
    ) -> Self {
        let connector = HttpsConnectorBuilder::new()
            .with_webpki_roots()
            .https_or_http()
            .enable_http1()
            .build();
        let client = Client::builder(TokioExecutor::new()).build(connector);
        Self {
            url,
            registry,
            serializer,
            client,
            request_timeout,
        }
    }

    /// Serialize and POST one snapshot. The response status is returned but
    /// is never treated as a failure.
    pub async fn push_once(&self) -> Result<StatusCode, PushError> {
        let body = self.serializer.to_json(&self.registry)?;

        let mut request = Request::new(Full::new(Bytes::from(body)));
        *request.method_mut() = Method::POST;
        *request.uri_mut() = self.url.clone();
        request
            .headers_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let response = timeout(self.request_timeout, self.client.request(request))
            .await
            .map_err(|_| PushError::Timeout(self.request_timeout))??;

        let status = response.status();
        // Drain so the connection can be reused; the body itself is ignored.
        let _ = timeout(self.request_timeout, response.into_body().collect()).await;

        Ok(status)
    }

    /// Push once per [`PUSH_INTERVAL`] until shutdown.
    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        info!(url = %self.url, "push publisher starting");

        let mut ticker = interval_at(Instant::now() + PUSH_INTERVAL, PUSH_INTERVAL);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    match self.push_once().await {
                        Ok(status) => debug!(status = %status, "pushed metrics"),
                        Err(e) => debug!(error = %e, "metrics push dropped"),
                    }
                }

                _ = shutdown.recv() => {
                    info!("push publisher shutting down");
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    #[test]
    fn test_parse_push_url() {
        assert_eq!(parse_push_url("").unwrap(), None);

        let uri = parse_push_url("http://collector.local:8080/ingest").unwrap().unwrap();
        assert_eq!(uri.host(), Some("collector.local"));
        assert_eq!(uri.port_u16(), Some(8080));
        assert_eq!(uri.path(), "/ingest");
    }

    #[test]
    fn test_parse_push_url_https() {
        let uri = parse_push_url("https://collector.example/ingest").unwrap().unwrap();
        assert_eq!(uri.scheme_str(), Some("https"));
        assert_eq!(uri.host(), Some("collector.example"));
    }

    #[test]
    fn test_parse_push_url_rejects() {
        assert!(parse_push_url("ftp://collector.local/").unwrap_err().contains("unsupported scheme"));
        assert!(parse_push_url("/just/a/path").unwrap_err().contains("missing scheme"));
        assert!(parse_push_url("http://bad host/").is_err());
    }

    #[tokio::test]
    async fn test_https_publisher_builds() {
        let publisher = PushPublisher::new(
            parse_push_url("https://collector.example/ingest").unwrap().unwrap(),
            Registry::new(),
            Serializer::new("app", "host-1"),
            DEFAULT_PUSH_TIMEOUT,
        );
        assert_eq!(publisher.url.scheme_str(), Some("https"));
    }

    #[tokio::test]
    async fn test_push_once_ignores_error_status() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut buf = vec![0u8; 8192];
            let _ = stream.read(&mut buf).await;
            let _ = stream
                .write_all(b"HTTP/1.1 503 Service Unavailable\r\nContent-Length: 4\r\nConnection: close\r\n\r\nbusy")
                .await;
        });

        let publisher = PushPublisher::new(
            format!("http://{}/ingest", addr).parse().unwrap(),
            Registry::new(),
            Serializer::new("app", "host-1"),
            DEFAULT_PUSH_TIMEOUT,
        );

        let status = publisher.push_once().await.unwrap();
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_push_once_connection_refused() {
        // bind then drop to get a port nobody listens on
        let addr = TcpListener::bind("127.0.0.1:0").await.unwrap().local_addr().unwrap();

        let publisher = PushPublisher::new(
            format!("http://{}/", addr).parse().unwrap(),
            Registry::new(),
            Serializer::new("app", "host-1"),
            DEFAULT_PUSH_TIMEOUT,
        );

        assert!(matches!(publisher.push_once().await, Err(PushError::Transport(_))));
    }
}
