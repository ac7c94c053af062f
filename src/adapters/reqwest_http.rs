//! Reqwest-based HTTP client adapter.
//!
//! Production [`HttpClient`] over a shared `reqwest::Client`. Streaming
//! POSTs check the status before handing the body over, so a rejected
//! request surfaces as `ServerError` with the buffered error body
//! instead of an SSE stream that immediately ends.

use async_trait::async_trait;
use futures_util::StreamExt;

use crate::traits::{BytesStream, Headers, HttpClient, HttpError, Response};

/// [`HttpClient`] backed by reqwest
#[derive(Debug, Clone, Default)]
pub struct ReqwestHttpClient {
    client: reqwest::Client,
}

impl ReqwestHttpClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap a preconfigured client (timeouts, proxies, TLS)
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    fn map_error(err: reqwest::Error) -> HttpError {
        if err.is_timeout() {
            HttpError::Timeout(err.to_string())
        } else if err.is_connect() {
            HttpError::ConnectionFailed(err.to_string())
        } else if err.is_builder() {
            HttpError::InvalidUrl(err.to_string())
        } else {
            HttpError::Other(err.to_string())
        }
    }

    fn response_headers(headers: &reqwest::header::HeaderMap) -> Headers {
        headers
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.to_string(), v.to_string()))
            })
            .collect()
    }

    fn with_headers(
        mut builder: reqwest::RequestBuilder,
        headers: &Headers,
    ) -> reqwest::RequestBuilder {
        for (name, value) in headers {
            builder = builder.header(name, value);
        }
        builder
    }
}

#[async_trait]
impl HttpClient for ReqwestHttpClient {
    async fn get(&self, url: &str, headers: &Headers) -> Result<Response, HttpError> {
        let builder = Self::with_headers(self.client.get(url), headers);
        let response = builder.send().await.map_err(Self::map_error)?;

        let status = response.status().as_u16();
        let headers = Self::response_headers(response.headers());
        let body = response.bytes().await.map_err(Self::map_error)?;

        Ok(Response::with_headers(status, headers, body))
    }

    async fn post(&self, url: &str, body: &str, headers: &Headers) -> Result<Response, HttpError> {
        let builder = Self::with_headers(self.client.post(url).body(body.to_string()), headers);
        let response = builder.send().await.map_err(Self::map_error)?;

        let status = response.status().as_u16();
        let headers = Self::response_headers(response.headers());
        let body = response.bytes().await.map_err(Self::map_error)?;

        Ok(Response::with_headers(status, headers, body))
    }

    async fn post_stream(
        &self,
        url: &str,
        body: &str,
        headers: &Headers,
    ) -> Result<BytesStream, HttpError> {
        let builder = Self::with_headers(self.client.post(url).body(body.to_string()), headers);
        let response = builder.send().await.map_err(Self::map_error)?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(HttpError::ServerError { status, message });
        }

        let stream = response.bytes_stream().map(|result| {
            result.map_err(|e| {
                if e.is_timeout() {
                    HttpError::Timeout(e.to_string())
                } else {
                    HttpError::Io(e.to_string())
                }
            })
        });

        Ok(Box::pin(stream))
    }
}
