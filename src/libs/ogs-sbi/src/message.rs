//! SBI Message Structures
//!
//! Request/response envelopes exchanged over the SBI and the RFC 7807
//! ProblemDetails body used for every error response.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::types::SbiAppError;

/// Maximum number of resource components kept from a request path
pub const MAX_NUM_OF_RESOURCE_COMPONENT: usize = 8;

/// SBI Header - method, URI and the decoded path
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SbiHeader {
    /// HTTP method (GET, POST, PUT, DELETE, PATCH)
    pub method: String,
    /// Full URI
    pub uri: String,
    /// Service name (first path component)
    pub service_name: Option<String>,
    /// API version (second path component)
    pub api_version: Option<String>,
    /// Resource path components
    pub resource: Vec<String>,
}

impl SbiHeader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new header with method and URI, splitting the path into
    /// service name, API version and resource components.
    pub fn with_method_uri(method: impl Into<String>, uri: impl Into<String>) -> Self {
        let mut header = Self {
            method: method.into(),
            uri: uri.into(),
            ..Default::default()
        };
        header.parse_path();
        header
    }

    fn parse_path(&mut self) {
        let path = self.uri.split('?').next().unwrap_or_default().to_string();
        let path = match path.find("://") {
            Some(pos) => {
                let rest = &path[pos + 3..];
                rest.find('/').map(|p| rest[p..].to_string()).unwrap_or_default()
            }
            None => path,
        };

        let mut components = path.split('/').filter(|c| !c.is_empty());
        self.service_name = components.next().map(str::to_string);
        self.api_version = components.next().map(str::to_string);
        self.resource.clear();
        for component in components {
            self.add_resource(component);
        }
    }

    /// Add a resource component
    pub fn add_resource(&mut self, component: impl Into<String>) {
        if self.resource.len() < MAX_NUM_OF_RESOURCE_COMPONENT {
            self.resource.push(component.into());
        }
    }

    /// Resource component at the given position
    pub fn resource_at(&self, index: usize) -> Option<&str> {
        self.resource.get(index).map(String::as_str)
    }
}

/// SBI HTTP Message - params, headers and body
#[derive(Debug, Clone, Default)]
pub struct SbiHttpMessage {
    /// Query parameters
    pub params: HashMap<String, String>,
    /// HTTP headers
    pub headers: HashMap<String, String>,
    /// Body content
    pub content: Option<String>,
}

impl SbiHttpMessage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a query parameter
    pub fn set_param(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.params.insert(key.into(), value.into());
    }

    /// Get a query parameter
    pub fn get_param(&self, key: &str) -> Option<&String> {
        self.params.get(key)
    }

    /// Set a header
    pub fn set_header(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.headers.insert(key.into(), value.into());
    }

    /// Get a header (case-insensitive)
    pub fn get_header(&self, key: &str) -> Option<&String> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v)
    }

    /// Set the body content
    pub fn set_content(&mut self, content: impl Into<String>) {
        self.content = Some(content.into());
    }
}

/// SBI Request
#[derive(Debug, Clone, Default)]
pub struct SbiRequest {
    /// Request header
    pub header: SbiHeader,
    /// HTTP message (params, headers, body)
    pub http: SbiHttpMessage,
}

impl SbiRequest {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_method(method: &str, uri: impl Into<String>) -> Self {
        Self {
            header: SbiHeader::with_method_uri(method, uri),
            http: SbiHttpMessage::new(),
        }
    }

    /// Create a GET request
    pub fn get(uri: impl Into<String>) -> Self {
        Self::with_method("GET", uri)
    }

    /// Create a POST request
    pub fn post(uri: impl Into<String>) -> Self {
        Self::with_method("POST", uri)
    }

    /// Create a PUT request
    pub fn put(uri: impl Into<String>) -> Self {
        Self::with_method("PUT", uri)
    }

    /// Create a DELETE request
    pub fn delete(uri: impl Into<String>) -> Self {
        Self::with_method("DELETE", uri)
    }

    /// Create a PATCH request
    pub fn patch(uri: impl Into<String>) -> Self {
        Self::with_method("PATCH", uri)
    }

    /// Set JSON body content
    pub fn with_json_body<T: Serialize>(mut self, body: &T) -> Result<Self, serde_json::Error> {
        let json = serde_json::to_string(body)?;
        self.http.set_content(json);
        self.http.set_header("Content-Type", "application/json");
        Ok(self)
    }

    /// Set raw body content
    pub fn with_body(mut self, content: impl Into<String>, content_type: impl Into<String>) -> Self {
        self.http.set_content(content);
        self.http.set_header("Content-Type", content_type);
        self
    }

    /// Add a query parameter
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.http.set_param(key, value);
        self
    }

    /// Add a header
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.http.set_header(key, value);
        self
    }
}

/// SBI Response
#[derive(Debug, Clone, Default)]
pub struct SbiResponse {
    /// HTTP message (headers, body)
    pub http: SbiHttpMessage,
    /// HTTP status code
    pub status: u16,
}

impl SbiResponse {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a response with status code
    pub fn with_status(status: u16) -> Self {
        Self {
            status,
            ..Default::default()
        }
    }

    /// Create a successful response (200 OK)
    pub fn ok() -> Self {
        Self::with_status(200)
    }

    /// Create a created response (201 Created)
    pub fn created() -> Self {
        Self::with_status(201)
    }

    /// Create a no content response (204 No Content)
    pub fn no_content() -> Self {
        Self::with_status(204)
    }

    /// Set JSON body content
    pub fn with_json_body<T: Serialize>(mut self, body: &T) -> Result<Self, serde_json::Error> {
        let json = serde_json::to_string(body)?;
        self.http.set_content(json);
        self.http.set_header("Content-Type", "application/json");
        Ok(self)
    }

    /// Set raw body content
    pub fn with_body(mut self, content: impl Into<String>, content_type: impl Into<String>) -> Self {
        self.http.set_content(content);
        self.http.set_header("Content-Type", content_type);
        self
    }

    /// Add a header
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.http.set_header(key, value);
        self
    }

    /// Check if response is successful (2xx)
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Parse JSON body
    pub fn json_body<T: for<'de> Deserialize<'de>>(&self) -> Result<T, serde_json::Error> {
        let content = self.http.content.as_deref().unwrap_or("{}");
        serde_json::from_str(content)
    }
}

/// Problem Details - RFC 7807 compliant error response
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProblemDetails {
    /// A URI reference that identifies the problem type
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub problem_type: Option<String>,
    /// A short, human-readable summary of the problem type
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// The HTTP status code
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<i32>,
    /// A human-readable explanation specific to this occurrence
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    /// A URI reference that identifies the specific occurrence
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instance: Option<String>,
    /// Application-specific error cause
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cause: Option<String>,
    /// Invalid parameters
    #[serde(rename = "invalidParams", skip_serializing_if = "Option::is_none")]
    pub invalid_params: Option<Vec<InvalidParam>>,
}

impl ProblemDetails {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_status(status: i32) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn with_cause(mut self, cause: impl Into<String>) -> Self {
        self.cause = Some(cause.into());
        self
    }

    pub fn with_app_error(self, cause: SbiAppError) -> Self {
        self.with_cause(cause.to_str())
    }

    pub fn with_invalid_param(mut self, param: impl Into<String>, reason: impl Into<String>) -> Self {
        self.invalid_params.get_or_insert_with(Vec::new).push(InvalidParam {
            param: param.into(),
            reason: Some(reason.into()),
        });
        self
    }

    /// HTTP status to answer with; 500 when the problem carries none
    pub fn status_code(&self) -> u16 {
        self.status
            .and_then(|s| u16::try_from(s).ok())
            .unwrap_or(500)
    }
}

/// Invalid Parameter for ProblemDetails
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InvalidParam {
    /// Parameter name
    pub param: String,
    /// Reason why the parameter is invalid
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}
