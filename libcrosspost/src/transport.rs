//! HTTP transport abstraction
//!
//! Provider clients build [`HttpRequest`] values and hand them to an
//! [`HttpTransport`]. Production code uses [`ReqwestTransport`]; tests use
//! [`crate::mock::MockTransport`], which records every request so "no network
//! call was made" is observable.

use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Canonical summary for connection failures (DNS, refused, TLS)
pub const CONNECT_FAILED: &str = "Failed to fetch";
/// Canonical summary for any other failure before a full response arrived
pub const REQUEST_FAILED: &str = "Network request failed";
/// Canonical summary for transport timeouts
pub const TIMED_OUT: &str = "Request timed out";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Method::Get => write!(f, "GET"),
            Method::Post => write!(f, "POST"),
            Method::Put => write!(f, "PUT"),
            Method::Delete => write!(f, "DELETE"),
        }
    }
}

/// One field of a multipart form
#[derive(Clone)]
pub enum FormPart {
    Text {
        name: String,
        value: String,
    },
    File {
        name: String,
        file_name: String,
        content_type: String,
        data: Arc<[u8]>,
    },
}

#[derive(Clone)]
pub enum RequestBody {
    Empty,
    Json(serde_json::Value),
    Binary {
        content_type: String,
        data: Arc<[u8]>,
    },
    Multipart(Vec<FormPart>),
}

/// A provider-agnostic HTTP request
#[derive(Clone)]
pub struct HttpRequest {
    pub method: Method,
    /// URL without query string
    pub url: String,
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    pub body: RequestBody,
}

impl HttpRequest {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            query: Vec::new(),
            headers: Vec::new(),
            body: RequestBody::Empty,
        }
    }

    pub fn query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((name.into(), value.into()));
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn json(mut self, body: serde_json::Value) -> Self {
        self.body = RequestBody::Json(body);
        self
    }

    pub fn binary(mut self, content_type: impl Into<String>, data: Arc<[u8]>) -> Self {
        self.body = RequestBody::Binary {
            content_type: content_type.into(),
            data,
        };
        self
    }

    pub fn multipart(mut self, parts: Vec<FormPart>) -> Self {
        self.body = RequestBody::Multipart(parts);
        self
    }

    /// First query value with the given name
    pub fn query_value(&self, name: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// First header value with the given name (case-insensitive)
    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// JSON body, if the request carries one
    pub fn json_body(&self) -> Option<&serde_json::Value> {
        match &self.body {
            RequestBody::Json(value) => Some(value),
            _ => None,
        }
    }
}

// Tokens travel in the Authorization header or the access_token parameter;
// neither may show up in logs.
impl fmt::Debug for HttpRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let query: Vec<String> = self
            .query
            .iter()
            .map(|(key, value)| {
                if key.contains("token") {
                    format!("{}=<redacted>", key)
                } else {
                    format!("{}={}", key, value)
                }
            })
            .collect();
        let headers: Vec<&str> = self.headers.iter().map(|(key, _)| key.as_str()).collect();
        let body = match &self.body {
            RequestBody::Empty => "empty".to_string(),
            RequestBody::Json(_) => "json".to_string(),
            RequestBody::Binary { data, .. } => format!("{} bytes", data.len()),
            RequestBody::Multipart(parts) => format!("multipart ({} parts)", parts.len()),
        };
        f.debug_struct("HttpRequest")
            .field("method", &self.method)
            .field("url", &self.url)
            .field("query", &query)
            .field("headers", &headers)
            .field("body", &body)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    /// Header names are lowercase
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: body.into(),
        }
    }

    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.push((name.to_lowercase(), value.into()));
        self
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        let name = name.to_lowercase();
        self.headers
            .iter()
            .find(|(key, _)| *key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Body parsed as JSON; `None` for empty or non-JSON bodies
    pub fn json_value(&self) -> Option<serde_json::Value> {
        if self.body.is_empty() {
            return None;
        }
        serde_json::from_slice(&self.body).ok()
    }
}

/// Failure before an HTTP response was received
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{summary}: {detail}")]
pub struct TransportError {
    /// One of [`CONNECT_FAILED`], [`REQUEST_FAILED`], [`TIMED_OUT`]
    pub summary: String,
    pub detail: String,
}

impl TransportError {
    pub fn new(summary: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            summary: summary.into(),
            detail: detail.into(),
        }
    }

    fn from_reqwest(error: reqwest::Error) -> Self {
        let summary = if error.is_timeout() {
            TIMED_OUT
        } else if error.is_connect() {
            CONNECT_FAILED
        } else {
            REQUEST_FAILED
        };
        Self::new(summary, error.to_string())
    }
}

/// Sends requests; implementations must not interpret status codes
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}

/// HTTP transport backed by reqwest
///
/// No timeout is configured beyond reqwest's defaults.
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(user_agent: &str) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .build()
            .map_err(|e| TransportError::new(REQUEST_FAILED, e.to_string()))?;

        Ok(Self { client })
    }

    fn build_form(parts: Vec<FormPart>) -> Result<reqwest::multipart::Form, TransportError> {
        let mut form = reqwest::multipart::Form::new();
        for part in parts {
            form = match part {
                FormPart::Text { name, value } => form.text(name, value),
                FormPart::File {
                    name,
                    file_name,
                    content_type,
                    data,
                } => {
                    let file = reqwest::multipart::Part::bytes(data.to_vec())
                        .file_name(file_name)
                        .mime_str(&content_type)
                        .map_err(|e| TransportError::new(REQUEST_FAILED, e.to_string()))?;
                    form.part(name, file)
                }
            };
        }
        Ok(form)
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let method = match request.method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Delete => reqwest::Method::DELETE,
        };

        let mut builder = self.client.request(method, &request.url);
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        builder = match request.body {
            RequestBody::Empty => builder,
            RequestBody::Json(value) => builder.json(&value),
            RequestBody::Binary { content_type, data } => builder
                .header(reqwest::header::CONTENT_TYPE, content_type)
                .body(data.to_vec()),
            RequestBody::Multipart(parts) => builder.multipart(Self::build_form(parts)?),
        };

        let response = builder.send().await.map_err(TransportError::from_reqwest)?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|value| (name.as_str().to_lowercase(), value.to_string()))
            })
            .collect();
        let body = response
            .bytes()
            .await
            .map_err(TransportError::from_reqwest)?
            .to_vec();

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_builder_and_lookup() {
        let request = HttpRequest::new(Method::Post, "https://example.test/feed")
            .query("access_token", "secret-token")
            .header("Authorization", "Bearer secret-token")
            .json(serde_json::json!({"message": "hi"}));

        assert_eq!(request.query_value("access_token"), Some("secret-token"));
        assert_eq!(request.header_value("authorization"), Some("Bearer secret-token"));
        assert_eq!(request.json_body().unwrap()["message"], "hi");
        assert!(request.query_value("missing").is_none());
    }

    #[test]
    fn test_request_debug_redacts_tokens() {
        let request = HttpRequest::new(Method::Get, "https://example.test/me")
            .query("access_token", "secret-token")
            .query("fields", "id,name")
            .header("Authorization", "Bearer secret-token");

        let debug = format!("{:?}", request);
        assert!(!debug.contains("secret-token"));
        assert!(debug.contains("access_token=<redacted>"));
        assert!(debug.contains("fields=id,name"));
        assert!(debug.contains("Authorization"));
    }

    #[test]
    fn test_response_helpers() {
        let response = HttpResponse::new(201, "{\"id\":\"123\"}").with_header("X-RestLi-Id", "urn:li:share:1");
        assert!(response.is_success());
        assert_eq!(response.header("x-restli-id"), Some("urn:li:share:1"));
        assert_eq!(response.json_value().unwrap()["id"], "123");

        let empty = HttpResponse::new(204, Vec::new());
        assert!(empty.json_value().is_none());
        assert!(!HttpResponse::new(401, "").is_success());
        assert!(HttpResponse::new(500, "<html>").json_value().is_none());
    }

    #[test]
    fn test_transport_error_display() {
        let error = TransportError::new(CONNECT_FAILED, "dns error");
        assert_eq!(error.to_string(), "Failed to fetch: dns error");
    }

    #[test]
    fn test_reqwest_transport_builds() {
        assert!(ReqwestTransport::new("crosspost-test/0.1").is_ok());
    }
}
