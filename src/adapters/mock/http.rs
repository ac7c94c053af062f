//! Mock HTTP client for tests.
//!
//! Answers requests from configured scripts instead of the network.
//! A URL can carry a single response or a sequence that plays out
//! across repeated requests, which is how research polling scenarios
//! are scripted. Every request is recorded for verification.

use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::traits::{BytesStream, Headers, HttpClient, HttpError, Response};

/// A recorded request, kept for assertions
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub url: String,
    pub headers: Headers,
    /// Body for POST requests
    pub body: Option<String>,
}

/// What a scripted URL answers with
#[derive(Debug, Clone)]
pub enum MockResponse {
    /// A buffered response
    Success(Response),
    /// A transport-level failure
    Error(HttpError),
    /// A streaming body delivered chunk by chunk
    Stream(Vec<Bytes>),
    /// A streaming body that fails mid-flight after its chunks
    StreamThenError(Vec<Bytes>, HttpError),
    /// A streaming request refused at setup
    StreamError(HttpError),
}

/// Responses for one URL, played in order with the last repeating
#[derive(Debug)]
struct ResponseScript {
    responses: Vec<MockResponse>,
    next: usize,
}

impl ResponseScript {
    fn advance(&mut self) -> Option<MockResponse> {
        let response = self.responses.get(self.next).cloned();
        if self.next + 1 < self.responses.len() {
            self.next += 1;
        }
        response
    }
}

/// Scriptable [`HttpClient`] for tests.
///
/// URLs match exactly first, then by prefix, then fall back to the
/// default response. Clones share scripts and the request log.
#[derive(Debug, Clone, Default)]
pub struct MockHttpClient {
    responses: Arc<Mutex<HashMap<String, ResponseScript>>>,
    default_response: Arc<Mutex<Option<MockResponse>>>,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl MockHttpClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer every request to `url` with `response`
    pub fn set_response(&self, url: &str, response: MockResponse) {
        self.set_response_sequence(url, vec![response]);
    }

    /// Answer successive requests to `url` in order; the final entry
    /// repeats once the script runs out
    pub fn set_response_sequence(&self, url: &str, responses: Vec<MockResponse>) {
        let mut scripts = self.responses.lock().unwrap();
        scripts.insert(url.to_string(), ResponseScript { responses, next: 0 });
    }

    /// Fallback for URLs with no script
    pub fn set_default_response(&self, response: MockResponse) {
        *self.default_response.lock().unwrap() = Some(response);
    }

    /// All requests made so far, oldest first
    pub fn get_requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn clear_requests(&self) {
        self.requests.lock().unwrap().clear();
    }

    fn record(&self, method: &str, url: &str, headers: &Headers, body: Option<String>) {
        self.requests.lock().unwrap().push(RecordedRequest {
            method: method.to_string(),
            url: url.to_string(),
            headers: headers.clone(),
            body,
        });
    }

    fn next_response(&self, url: &str) -> Option<MockResponse> {
        let mut scripts = self.responses.lock().unwrap();

        if let Some(script) = scripts.get_mut(url) {
            return script.advance();
        }
        let prefix_key = scripts
            .keys()
            .find(|pattern| url.starts_with(pattern.as_str()))
            .cloned();
        if let Some(key) = prefix_key {
            if let Some(script) = scripts.get_mut(&key) {
                return script.advance();
            }
        }

        self.default_response.lock().unwrap().clone()
    }

    fn unmatched(url: &str) -> HttpError {
        HttpError::Other(format!("No mock response for URL: {}", url))
    }
}

#[async_trait]
impl HttpClient for MockHttpClient {
    async fn get(&self, url: &str, headers: &Headers) -> Result<Response, HttpError> {
        self.record("GET", url, headers, None);

        match self.next_response(url) {
            Some(MockResponse::Success(response)) => Ok(response),
            Some(MockResponse::Error(err)) | Some(MockResponse::StreamError(err)) => Err(err),
            Some(MockResponse::Stream(_)) | Some(MockResponse::StreamThenError(..)) => Err(
                HttpError::Other("Stream response on non-stream request".to_string()),
            ),
            None => Err(Self::unmatched(url)),
        }
    }

    async fn post(&self, url: &str, body: &str, headers: &Headers) -> Result<Response, HttpError> {
        self.record("POST", url, headers, Some(body.to_string()));

        match self.next_response(url) {
            Some(MockResponse::Success(response)) => Ok(response),
            Some(MockResponse::Error(err)) | Some(MockResponse::StreamError(err)) => Err(err),
            Some(MockResponse::Stream(_)) | Some(MockResponse::StreamThenError(..)) => Err(
                HttpError::Other("Stream response on non-stream request".to_string()),
            ),
            None => Err(Self::unmatched(url)),
        }
    }

    async fn post_stream(
        &self,
        url: &str,
        body: &str,
        headers: &Headers,
    ) -> Result<BytesStream, HttpError> {
        self.record("POST", url, headers, Some(body.to_string()));

        match self.next_response(url) {
            Some(MockResponse::Stream(chunks)) => {
                let items: Vec<Result<Bytes, HttpError>> = chunks.into_iter().map(Ok).collect();
                Ok(Box::pin(futures_util::stream::iter(items)))
            }
            Some(MockResponse::StreamThenError(chunks, err)) => {
                let items: Vec<Result<Bytes, HttpError>> = chunks
                    .into_iter()
                    .map(Ok)
                    .chain(std::iter::once(Err(err)))
                    .collect();
                Ok(Box::pin(futures_util::stream::iter(items)))
            }
            Some(MockResponse::StreamError(err)) | Some(MockResponse::Error(err)) => Err(err),
            Some(MockResponse::Success(_)) => Err(HttpError::Other(
                "Non-stream response on stream request".to_string(),
            )),
            None => Err(Self::unmatched(url)),
        }
    }
}
