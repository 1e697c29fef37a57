//! SBI HTTP/2 Client
//!
//! HTTP/2 (prior knowledge, cleartext) client used for outbound SBI calls:
//! NRF token requests and notifications posted to consumer callback URIs.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::client::conn::http2::SendRequest;
use hyper::{Method, Request, Uri};
use hyper_util::rt::TokioIo;
use tokio::net::TcpStream;
use tokio::sync::Mutex;

use crate::error::{SbiError, SbiResult};
use crate::message::{SbiRequest, SbiResponse};
use crate::types::UriScheme;

/// Default connection timeout in seconds
const DEFAULT_CONNECT_TIMEOUT: u64 = 5;
/// Default request timeout in seconds
const DEFAULT_REQUEST_TIMEOUT: u64 = 30;

/// SBI Client configuration
#[derive(Debug, Clone)]
pub struct SbiClientConfig {
    /// URI scheme (http or https)
    pub scheme: UriScheme,
    /// Target host (FQDN or IP)
    pub host: String,
    /// Target port
    pub port: u16,
    /// Connection timeout
    pub connect_timeout: Duration,
    /// Request timeout
    pub request_timeout: Duration,
}

impl Default for SbiClientConfig {
    fn default() -> Self {
        Self {
            scheme: UriScheme::Http,
            host: "localhost".to_string(),
            port: 80,
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT),
        }
    }
}

impl SbiClientConfig {
    /// Create a new client configuration
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Default::default()
        }
    }

    /// Derive the configuration from an absolute URI such as a callback reference
    pub fn from_uri(uri: &str) -> SbiResult<Self> {
        let parsed: Uri = uri
            .parse()
            .map_err(|e| SbiError::InvalidUri(format!("{uri}: {e}")))?;

        let scheme = match parsed.scheme_str() {
            Some("http") => UriScheme::Http,
            Some("https") => UriScheme::Https,
            Some(other) => return Err(SbiError::UnsupportedScheme(other.to_string())),
            None => return Err(SbiError::InvalidUri(format!("{uri}: missing scheme"))),
        };
        let host = parsed
            .host()
            .ok_or_else(|| SbiError::InvalidUri(format!("{uri}: missing host")))?
            .trim_start_matches('[')
            .trim_end_matches(']')
            .to_string();
        let port = parsed.port_u16().unwrap_or_else(|| scheme.default_port());

        Ok(Self {
            scheme,
            host,
            port,
            ..Default::default()
        })
    }

    /// Build the base URI
    pub fn base_uri(&self) -> String {
        if self.host.contains(':') {
            format!("{}://[{}]:{}", self.scheme, self.host, self.port)
        } else {
            format!("{}://{}:{}", self.scheme, self.host, self.port)
        }
    }

    fn socket_addr(&self) -> String {
        if self.host.contains(':') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }
}

/// Connection state for HTTP/2
struct ConnectionState {
    sender: SendRequest<Full<Bytes>>,
}

/// SBI Client - HTTP/2 client for SBI communication
pub struct SbiClient {
    /// Client configuration
    config: SbiClientConfig,
    /// Connection state (lazily initialized)
    connection: Arc<Mutex<Option<ConnectionState>>>,
}

impl SbiClient {
    /// Create a new SBI client
    pub fn new(config: SbiClientConfig) -> Self {
        Self {
            config,
            connection: Arc::new(Mutex::new(None)),
        }
    }

    /// Create a client with host and port
    pub fn with_host_port(host: impl Into<String>, port: u16) -> Self {
        Self::new(SbiClientConfig::new(host, port))
    }

    /// Create a client addressing the authority of an absolute URI
    pub fn from_uri(uri: &str) -> SbiResult<Self> {
        Ok(Self::new(SbiClientConfig::from_uri(uri)?))
    }

    /// Get the client configuration
    pub fn config(&self) -> &SbiClientConfig {
        &self.config
    }

    /// Connect to the server
    async fn connect(&self) -> SbiResult<SendRequest<Full<Bytes>>> {
        if self.config.scheme == UriScheme::Https {
            return Err(SbiError::UnsupportedScheme("https".to_string()));
        }

        let addr = self.config.socket_addr();
        let stream = tokio::time::timeout(self.config.connect_timeout, TcpStream::connect(&addr))
            .await
            .map_err(|_| SbiError::Timeout)?
            .map_err(|e| SbiError::Connection(e.to_string()))?;

        let io = TokioIo::new(stream);
        let (sender, conn) =
            hyper::client::conn::http2::handshake(hyper_util::rt::TokioExecutor::new(), io)
                .await
                .map_err(|e| SbiError::Connection(e.to_string()))?;

        tokio::spawn(async move {
            if let Err(e) = conn.await {
                log::debug!("HTTP/2 connection closed: {e}");
            }
        });

        Ok(sender)
    }

    /// Get or create a connection
    async fn get_connection(&self) -> SbiResult<SendRequest<Full<Bytes>>> {
        let mut conn_guard = self.connection.lock().await;

        if let Some(ref state) = *conn_guard {
            if state.sender.is_ready() {
                return Ok(state.sender.clone());
            }
        }

        let sender = self.connect().await?;
        *conn_guard = Some(ConnectionState {
            sender: sender.clone(),
        });
        Ok(sender)
    }

    /// Send an SBI request and receive a response
    pub async fn send_request(&self, request: SbiRequest) -> SbiResult<SbiResponse> {
        let mut sender = self.get_connection().await?;

        let uri_str = if request.header.uri.starts_with("http") {
            request.header.uri.clone()
        } else {
            format!("{}{}", self.config.base_uri(), request.header.uri)
        };

        let uri_with_params = if request.http.params.is_empty() {
            uri_str
        } else {
            let params: Vec<String> = request
                .http
                .params
                .iter()
                .map(|(k, v)| format!("{k}={v}"))
                .collect();
            format!("{}?{}", uri_str, params.join("&"))
        };

        let uri: Uri = uri_with_params
            .parse()
            .map_err(|e| SbiError::InvalidUri(format!("{uri_with_params}: {e}")))?;

        let method = match request.header.method.to_uppercase().as_str() {
            "GET" => Method::GET,
            "POST" => Method::POST,
            "PUT" => Method::PUT,
            "DELETE" => Method::DELETE,
            "PATCH" => Method::PATCH,
            other => return Err(SbiError::InvalidMethod(other.to_string())),
        };

        let body = request
            .http
            .content
            .map(|c| Full::new(Bytes::from(c)))
            .unwrap_or_else(|| Full::new(Bytes::new()));

        let mut req_builder = Request::builder().method(method).uri(uri);
        for (key, value) in &request.http.headers {
            req_builder = req_builder.header(key.as_str(), value.as_str());
        }

        let http_request = req_builder
            .body(body)
            .map_err(|e| SbiError::Request(e.to_string()))?;

        let response = tokio::time::timeout(
            self.config.request_timeout,
            sender.send_request(http_request),
        )
        .await
        .map_err(|_| SbiError::Timeout)?
        .map_err(|e| SbiError::Request(e.to_string()))?;

        self.convert_response(response).await
    }

    /// Convert hyper response to SbiResponse
    async fn convert_response(&self, response: hyper::Response<Incoming>) -> SbiResult<SbiResponse> {
        let status = response.status().as_u16();

        let mut headers = HashMap::new();
        for (key, value) in response.headers() {
            if let Ok(v) = value.to_str() {
                headers.insert(key.to_string(), v.to_string());
            }
        }

        let body_bytes = response
            .into_body()
            .collect()
            .await
            .map_err(|e| SbiError::Request(e.to_string()))?
            .to_bytes();

        let content = if body_bytes.is_empty() {
            None
        } else {
            Some(String::from_utf8_lossy(&body_bytes).to_string())
        };

        let mut sbi_response = SbiResponse::with_status(status);
        sbi_response.http.headers = headers;
        sbi_response.http.content = content;

        Ok(sbi_response)
    }

    /// Close the connection
    pub async fn close(&self) {
        let mut conn_guard = self.connection.lock().await;
        *conn_guard = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_config() {
        let config = SbiClientConfig::new("127.0.0.10", 7777);
        assert_eq!(config.scheme, UriScheme::Http);
        assert_eq!(config.connect_timeout, Duration::from_secs(DEFAULT_CONNECT_TIMEOUT));
        assert_eq!(config.base_uri(), "http://127.0.0.10:7777");
    }

    #[test]
    fn test_config_from_callback_uri() {
        let config =
            SbiClientConfig::from_uri("http://127.0.0.5:7777/namf-callback/v1/imsi-001/dereg-notify")
                .unwrap();
        assert_eq!(config.scheme, UriScheme::Http);
        assert_eq!(config.host, "127.0.0.5");
        assert_eq!(config.port, 7777);

        let config = SbiClientConfig::from_uri("http://amf.example.org/cb").unwrap();
        assert_eq!(config.port, 80);

        let config = SbiClientConfig::from_uri("http://[::1]:9000/cb").unwrap();
        assert_eq!(config.host, "::1");
        assert_eq!(config.base_uri(), "http://[::1]:9000");
    }

    #[test]
    fn test_config_from_bad_uri() {
        assert!(matches!(
            SbiClientConfig::from_uri("/relative/only"),
            Err(SbiError::InvalidUri(_))
        ));
        assert!(matches!(
            SbiClientConfig::from_uri("ftp://host/x"),
            Err(SbiError::UnsupportedScheme(_))
        ));
    }

    #[tokio::test]
    async fn test_https_is_rejected_before_connecting() {
        let client = SbiClient::from_uri("https://127.0.0.1:1/cb").unwrap();
        let request = SbiRequest::post("https://127.0.0.1:1/cb")
            .with_json_body(&serde_json::json!({}))
            .unwrap();
        let result = client.send_request(request).await;
        assert!(matches!(result, Err(SbiError::UnsupportedScheme(_))));
    }
}
