//! SBI HTTP/2 Server
//!
//! Cleartext HTTP/2 server feeding every inbound request to an
//! [`SbiRequestHandler`] and writing back the returned [`SbiResponse`].

use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::Arc;

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::server::conn::http2;
use hyper::service::Service;
use hyper::{Request, Response};
use hyper_util::rt::TokioIo;
use tokio::net::TcpListener;
use tokio::sync::{oneshot, Mutex};

use crate::error::{SbiError, SbiResult};
use crate::message::{ProblemDetails, SbiHeader, SbiHttpMessage, SbiRequest, SbiResponse};

/// Server configuration
#[derive(Debug, Clone)]
pub struct SbiServerConfig {
    /// Bind address
    pub addr: SocketAddr,
}

impl Default for SbiServerConfig {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(([127, 0, 0, 1], 7777)),
        }
    }
}

impl SbiServerConfig {
    /// Create a new server configuration
    pub fn new(addr: SocketAddr) -> Self {
        Self { addr }
    }

    /// Create configuration with host and port
    pub fn with_host_port(host: impl AsRef<str>, port: u16) -> SbiResult<Self> {
        let host = host.as_ref();
        let addr: SocketAddr = if host.contains(':') {
            format!("[{host}]:{port}")
        } else {
            format!("{host}:{port}")
        }
        .parse()
        .map_err(|e| SbiError::InvalidUri(format!("Invalid address: {e}")))?;
        Ok(Self::new(addr))
    }
}

/// Request handler trait
pub trait SbiRequestHandler: Send + Sync + 'static {
    /// Handle an incoming SBI request
    fn handle(&self, request: SbiRequest) -> Pin<Box<dyn Future<Output = SbiResponse> + Send>>;
}

impl<F, Fut> SbiRequestHandler for F
where
    F: Fn(SbiRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = SbiResponse> + Send + 'static,
{
    fn handle(&self, request: SbiRequest) -> Pin<Box<dyn Future<Output = SbiResponse> + Send>> {
        Box::pin(self(request))
    }
}

/// Hyper service wrapper
struct SbiService<H: SbiRequestHandler> {
    handler: Arc<H>,
}

impl<H: SbiRequestHandler> Clone for SbiService<H> {
    fn clone(&self) -> Self {
        Self {
            handler: self.handler.clone(),
        }
    }
}

impl<H: SbiRequestHandler> Service<Request<Incoming>> for SbiService<H> {
    type Response = Response<Full<Bytes>>;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn call(&self, req: Request<Incoming>) -> Self::Future {
        let handler = self.handler.clone();

        Box::pin(async move {
            let sbi_request = convert_request(req).await;
            let sbi_response = handler.handle(sbi_request).await;
            Ok(convert_response(sbi_response))
        })
    }
}

/// Convert hyper request to SbiRequest
async fn convert_request(req: Request<Incoming>) -> SbiRequest {
    let method = req.method().to_string();
    let uri = req.uri().to_string();

    let mut http = SbiHttpMessage::new();
    for (key, value) in req.headers() {
        if let Ok(v) = value.to_str() {
            http.set_header(key.to_string(), v.to_string());
        }
    }

    if let Some(query) = req.uri().query() {
        for pair in query.split('&') {
            if let Some((key, value)) = pair.split_once('=') {
                http.set_param(key.to_string(), value.to_string());
            }
        }
    }

    match req.into_body().collect().await {
        Ok(body) => {
            let bytes = body.to_bytes();
            if !bytes.is_empty() {
                http.set_content(String::from_utf8_lossy(&bytes).to_string());
            }
        }
        Err(e) => log::warn!("Failed to read request body: {e}"),
    }

    SbiRequest {
        header: SbiHeader::with_method_uri(method, uri),
        http,
    }
}

/// Convert SbiResponse to hyper response
fn convert_response(sbi_response: SbiResponse) -> Response<Full<Bytes>> {
    let mut builder = Response::builder().status(sbi_response.status);

    for (key, value) in &sbi_response.http.headers {
        builder = builder.header(key.as_str(), value.as_str());
    }

    let body = sbi_response
        .http
        .content
        .map(|c| Full::new(Bytes::from(c)))
        .unwrap_or_else(|| Full::new(Bytes::new()));

    builder.body(body).unwrap_or_else(|e| {
        log::error!("Cannot build HTTP response: {e}");
        let mut response = Response::new(Full::new(Bytes::from("Internal Server Error")));
        *response.status_mut() = hyper::StatusCode::INTERNAL_SERVER_ERROR;
        response
    })
}

/// Server state
enum ServerState {
    Stopped,
    Running(oneshot::Sender<()>),
}

/// SBI Server - HTTP/2 server for SBI communication
pub struct SbiServer {
    /// Server configuration
    config: SbiServerConfig,
    /// Server state
    state: Arc<Mutex<ServerState>>,
}

impl SbiServer {
    /// Create a new SBI server
    pub fn new(config: SbiServerConfig) -> Self {
        Self {
            config,
            state: Arc::new(Mutex::new(ServerState::Stopped)),
        }
    }

    /// Get the server configuration
    pub fn config(&self) -> &SbiServerConfig {
        &self.config
    }

    /// Start the server with a request handler; returns the bound address
    pub async fn start<H: SbiRequestHandler>(&self, handler: H) -> SbiResult<SocketAddr> {
        let mut state = self.state.lock().await;

        if matches!(*state, ServerState::Running(_)) {
            return Err(SbiError::Server("Server already running".to_string()));
        }

        let listener = TcpListener::bind(self.config.addr)
            .await
            .map_err(|e| SbiError::Server(format!("Failed to bind: {e}")))?;
        let local_addr = listener
            .local_addr()
            .map_err(|e| SbiError::Server(e.to_string()))?;

        let (shutdown_tx, mut shutdown_rx) = oneshot::channel();
        *state = ServerState::Running(shutdown_tx);
        drop(state);

        let handler = Arc::new(handler);

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    result = listener.accept() => {
                        match result {
                            Ok((stream, peer)) => {
                                let io = TokioIo::new(stream);
                                let service = SbiService {
                                    handler: handler.clone(),
                                };

                                tokio::spawn(async move {
                                    if let Err(e) = http2::Builder::new(
                                        hyper_util::rt::TokioExecutor::new()
                                    )
                                    .serve_connection(io, service)
                                    .await
                                    {
                                        log::debug!("HTTP/2 connection from {peer} ended: {e}");
                                    }
                                });
                            }
                            Err(e) => {
                                log::error!("Accept error: {e}");
                            }
                        }
                    }
                    _ = &mut shutdown_rx => {
                        break;
                    }
                }
            }
        });

        Ok(local_addr)
    }

    /// Stop the server
    pub async fn stop(&self) -> SbiResult<()> {
        let mut state = self.state.lock().await;

        if let ServerState::Running(shutdown_tx) = std::mem::replace(&mut *state, ServerState::Stopped) {
            let _ = shutdown_tx.send(());
        }

        Ok(())
    }

    /// Check if the server is running
    pub async fn is_running(&self) -> bool {
        let state = self.state.lock().await;
        matches!(*state, ServerState::Running(_))
    }
}

/// Build an error response carrying a ProblemDetails body
pub fn send_error(status: u16, title: &str, detail: &str, cause: Option<&str>) -> SbiResponse {
    let problem = ProblemDetails::with_status(status as i32)
        .with_title(title)
        .with_detail(detail);

    let problem = if let Some(c) = cause {
        problem.with_cause(c)
    } else {
        problem
    };

    send_problem(&problem)
}

/// Build a response from an existing ProblemDetails, using its own status
pub fn send_problem(problem: &ProblemDetails) -> SbiResponse {
    let status = problem.status_code();
    SbiResponse::with_status(status)
        .with_json_body(problem)
        .map(|r| r.with_header("Content-Type", "application/problem+json"))
        .unwrap_or_else(|_| SbiResponse::with_status(status))
}

/// Send a 405 Method Not Allowed error response
pub fn send_method_not_allowed(method: &str, resource: &str) -> SbiResponse {
    send_error(
        405,
        "Method Not Allowed",
        &format!("Method {method} not allowed for resource {resource}"),
        Some("METHOD_NOT_ALLOWED"),
    )
}

/// Send a 500 Internal Server Error response
pub fn send_internal_error(detail: &str) -> SbiResponse {
    send_error(500, "Internal Server Error", detail, Some("SYSTEM_FAILURE"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::SbiClient;

    #[test]
    fn test_server_config() {
        let config = SbiServerConfig::with_host_port("0.0.0.0", 8080).unwrap();
        assert_eq!(config.addr.port(), 8080);
        assert!(SbiServerConfig::with_host_port("not an ip", 1).is_err());
        let config = SbiServerConfig::with_host_port("::1", 7777).unwrap();
        assert!(config.addr.is_ipv6());
    }

    #[test]
    fn test_send_error() {
        let response = send_error(404, "Not Found", "Resource not found", Some("USER_NOT_FOUND"));
        assert_eq!(response.status, 404);
        let problem: ProblemDetails = response.json_body().unwrap();
        assert_eq!(problem.cause.as_deref(), Some("USER_NOT_FOUND"));
    }

    #[test]
    fn test_send_problem_uses_own_status() {
        let problem = ProblemDetails::with_status(403).with_cause("UNSPECIFIED");
        let response = send_problem(&problem);
        assert_eq!(response.status, 403);
        assert_eq!(
            response.http.get_header("content-type"),
            Some(&"application/problem+json".to_string())
        );
    }

    #[tokio::test]
    async fn test_server_client_roundtrip() {
        let server = SbiServer::new(SbiServerConfig::new(SocketAddr::from(([127, 0, 0, 1], 0))));
        let addr = server
            .start(|request: SbiRequest| async move {
                let echoed = request.header.service_name.unwrap_or_default();
                SbiResponse::ok().with_body(echoed, "text/plain")
            })
            .await
            .unwrap();
        assert!(server.is_running().await);

        let client = SbiClient::with_host_port("127.0.0.1", addr.port());
        let request = SbiRequest::post("/nudm-ee/v1/anyUE/ee-subscriptions")
            .with_json_body(&serde_json::json!({}))
            .unwrap();
        let response = client.send_request(request).await.unwrap();
        assert_eq!(response.status, 200);
        assert_eq!(response.http.content.as_deref(), Some("nudm-ee"));

        client.close().await;
        server.stop().await.unwrap();
        assert!(!server.is_running().await);
    }
}
