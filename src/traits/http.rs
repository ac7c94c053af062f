//! HTTP client abstraction.
//!
//! Provider adapters and the relay client talk HTTP through this trait
//! so tests can script responses without sockets.

use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use std::collections::HashMap;
use std::pin::Pin;

/// HTTP headers as a key-value map
pub type Headers = HashMap<String, String>;

/// Streaming response body
pub type BytesStream = Pin<Box<dyn Stream<Item = Result<Bytes, HttpError>> + Send>>;

/// Buffered HTTP response
#[derive(Debug, Clone)]
pub struct Response {
    /// HTTP status code
    pub status: u16,
    /// Response headers
    pub headers: Headers,
    /// Response body
    pub body: Bytes,
}

impl Response {
    pub fn new(status: u16, body: Bytes) -> Self {
        Self {
            status,
            headers: HashMap::new(),
            body,
        }
    }

    pub fn with_headers(status: u16, headers: Headers, body: Bytes) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }

    /// 2xx status
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Body as UTF-8 text, lossy
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Parse the body as JSON
    pub fn json<T: serde::de::DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }

    /// Best-effort error text from a failed response: the `error` field
    /// of a JSON body when present, otherwise the raw body, otherwise
    /// the status code.
    pub fn error_message(&self) -> String {
        if let Ok(value) = self.json::<serde_json::Value>() {
            if let Some(message) = value.get("error").and_then(|e| e.as_str()) {
                return message.to_string();
            }
        }
        let text = self.text();
        if text.trim().is_empty() {
            format!("HTTP {}", self.status)
        } else {
            text
        }
    }
}

/// Transport-level failures
#[derive(Debug, Clone, PartialEq)]
pub enum HttpError {
    /// Could not reach the host
    ConnectionFailed(String),
    /// Request took too long
    Timeout(String),
    /// Server answered with an error status
    ServerError { status: u16, message: String },
    /// Reading the body failed mid-stream
    Io(String),
    /// URL could not be parsed
    InvalidUrl(String),
    /// Anything else
    Other(String),
}

impl std::fmt::Display for HttpError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HttpError::ConnectionFailed(msg) => write!(f, "Connection failed: {}", msg),
            HttpError::Timeout(msg) => write!(f, "Request timeout: {}", msg),
            HttpError::ServerError { status, message } => {
                write!(f, "Server error ({}): {}", status, message)
            }
            HttpError::Io(msg) => write!(f, "IO error: {}", msg),
            HttpError::InvalidUrl(msg) => write!(f, "Invalid URL: {}", msg),
            HttpError::Other(msg) => write!(f, "HTTP error: {}", msg),
        }
    }
}

impl std::error::Error for HttpError {}

/// HTTP operations the crate needs: plain GET/POST plus a streaming
/// POST for SSE bodies.
#[async_trait]
pub trait HttpClient: Send + Sync {
    /// Perform a GET request
    async fn get(&self, url: &str, headers: &Headers) -> Result<Response, HttpError>;

    /// Perform a POST request with a string body
    async fn post(&self, url: &str, body: &str, headers: &Headers) -> Result<Response, HttpError>;

    /// POST and hand back the response body incrementally.
    /// A non-2xx status is returned as `HttpError::ServerError` with the
    /// buffered error body in the message.
    async fn post_stream(
        &self,
        url: &str,
        body: &str,
        headers: &Headers,
    ) -> Result<BytesStream, HttpError>;
}
