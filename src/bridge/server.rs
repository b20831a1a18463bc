//! Pull endpoint.
//!
//! Serves the current snapshot as JSON over HTTP/1.

use crate::bridge::Serializer;
use crate::registry::Registry;
use bytes::Bytes;
use http_body_util::Full;
use hyper::header::{HeaderValue, CONTENT_TYPE};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tracing::{debug, error, info};

/// Answers pull requests with the serialized snapshot.
///
/// Cheap to clone; mount it in any hyper service via [`PullHandler::respond`].
#[derive(Debug, Clone)]
pub struct PullHandler {
    registry: Registry,
    serializer: Arc<Serializer>,
}

impl PullHandler {
    pub fn new(registry: Registry, serializer: Serializer) -> Self {
        Self {
            registry,
            serializer: Arc::new(serializer),
        }
    }

    /// Build the snapshot response: `200` with a JSON array, or `500` if
    /// encoding fails.
    pub fn respond(&self) -> Response<Full<Bytes>> {
        match self.serializer.to_json(&self.registry) {
            Ok(body) => response(StatusCode::OK, "application/json", Bytes::from(body)),
            Err(e) => {
                error!(error = %e, "failed to encode metrics snapshot");
                response(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "text/plain",
                    Bytes::from_static(b"Failed to encode metrics\n"),
                )
            }
        }
    }
}

/// HTTP server exposing a [`PullHandler`].
pub struct PullServer {
    listener: TcpListener,
    path: String,
    handler: PullHandler,
}

impl PullServer {
    /// Bind the listening socket. Port 0 picks a free port.
    pub async fn bind(
        address: SocketAddr,
        path: impl Into<String>,
        handler: PullHandler,
    ) -> std::io::Result<Self> {
        let listener = TcpListener::bind(address).await?;
        Ok(Self {
            listener,
            path: path.into(),
            handler,
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accept connections until shutdown.
    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        match self.listener.local_addr() {
            Ok(address) => info!(address = %address, path = %self.path, "pull server started"),
            Err(e) => info!(error = %e, path = %self.path, "pull server started"),
        }

        let handler = self.handler;
        let path = Arc::new(self.path);

        loop {
            tokio::select! {
                accept_result = self.listener.accept() => {
                    match accept_result {
                        Ok((stream, _addr)) => {
                            let handler = handler.clone();
                            let path = Arc::clone(&path);

                            tokio::spawn(async move {
                                let io = TokioIo::new(stream);
                                let service = service_fn(move |req| {
                                    let handler = handler.clone();
                                    let path = Arc::clone(&path);
                                    async move { handle_request(req, &handler, &path).await }
                                });

                                if let Err(e) = http1::Builder::new()
                                    .serve_connection(io, service)
                                    .await
                                {
                                    debug!(error = %e, "pull connection error");
                                }
                            });
                        }
                        Err(e) => {
                            error!(error = %e, "failed to accept pull connection");
                        }
                    }
                }

                _ = shutdown.recv() => {
                    info!("pull server shutting down");
                    break;
                }
            }
        }
    }
}

/// Route one request. Any method is accepted on the snapshot path.
async fn handle_request<B>(
    req: Request<B>,
    handler: &PullHandler,
    metrics_path: &str,
) -> Result<Response<Full<Bytes>>, Infallible> {
    let path = req.uri().path();
    debug!(path = %path, method = %req.method(), "pull request");

    let resp = if path == metrics_path {
        handler.respond()
    } else if path == "/health" || path == "/healthz" {
        response(StatusCode::OK, "text/plain", Bytes::from_static(b"OK\n"))
    } else {
        response(
            StatusCode::NOT_FOUND,
            "text/plain",
            Bytes::from_static(b"Not found\n"),
        )
    };

    Ok(resp)
}

fn response(status: StatusCode, content_type: &'static str, body: Bytes) -> Response<Full<Bytes>> {
    let mut resp = Response::new(Full::new(body));
    *resp.status_mut() = status;
    resp.headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
    resp
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;
    use hyper::Method;

    fn handler() -> PullHandler {
        let registry = Registry::new();
        registry.get_or_register_gauge("g").unwrap().update(42);
        PullHandler::new(registry, Serializer::new("app", "host-1"))
    }

    fn request(method: Method, path: &str) -> Request<()> {
        let mut req = Request::new(());
        *req.method_mut() = method;
        *req.uri_mut() = path.parse().unwrap();
        req
    }

    async fn body_of(resp: Response<Full<Bytes>>) -> Bytes {
        resp.into_body().collect().await.unwrap().to_bytes()
    }

    #[tokio::test]
    async fn test_snapshot_path() {
        let resp = handle_request(request(Method::GET, "/metrics"), &handler(), "/metrics")
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers()[CONTENT_TYPE], "application/json");

        let body: serde_json::Value = serde_json::from_slice(&body_of(resp).await).unwrap();
        let records = body.as_array().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0]["metric"], "app.g");
        assert_eq!(records[0]["value"], 42);
        assert_eq!(records[0]["hostname"], "host-1");
    }

    #[tokio::test]
    async fn test_any_method_accepted() {
        let resp = handle_request(request(Method::POST, "/metrics"), &handler(), "/metrics")
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_health_and_not_found() {
        let resp = handle_request(request(Method::GET, "/healthz"), &handler(), "/metrics")
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_of(resp).await, "OK\n");

        let resp = handle_request(request(Method::GET, "/nope"), &handler(), "/metrics")
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_server_bind_ephemeral_port() {
        let server = PullServer::bind("127.0.0.1:0".parse().unwrap(), "/metrics", handler())
            .await
            .unwrap();
        assert_ne!(server.local_addr().unwrap().port(), 0);
    }
}
