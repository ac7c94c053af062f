//! Parallel deep research adapter.
//!
//! Research is not a live stream: a task is submitted, then its run is
//! polled until it completes, fails, or the attempt cap is reached.
//! The adapter surfaces that as a chunk stream anyway: an initial
//! pending progress report, one progress chunk per poll, and finally
//! the full output with citations. Individual poll faults are
//! swallowed and retried; only a rejected status check is terminal.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use futures_util::stream;
use serde_json::{json, Value};

use crate::models::{ChatMessage, Citation, Provider};
use crate::providers::{
    ChatProvider, ChunkStream, ProviderError, ProviderOptions, StreamChunk, TaskProgress,
};
use crate::traits::{Headers, HttpClient};

pub const PARALLEL_TASKS_URL: &str = "https://api.parallel.ai/v1/tasks/runs";

/// Processor tier for deep research runs
const RESEARCH_PROCESSOR: &str = "ultra";
const POLL_INTERVAL: Duration = Duration::from_secs(2);
/// 900 polls at 2s spacing bounds a run to 30 minutes
const MAX_POLL_ATTEMPTS: u32 = 900;

/// Adapter for Parallel's asynchronous task-run API
pub struct ParallelResearchProvider {
    http: Arc<dyn HttpClient>,
    base_url: String,
}

impl ParallelResearchProvider {
    pub fn new(http: Arc<dyn HttpClient>) -> Self {
        Self {
            http,
            base_url: PARALLEL_TASKS_URL.to_string(),
        }
    }

    pub fn with_base_url(http: Arc<dyn HttpClient>, base_url: String) -> Self {
        Self { http, base_url }
    }
}

#[async_trait::async_trait]
impl ChatProvider for ParallelResearchProvider {
    fn provider(&self) -> Provider {
        Provider::ParallelResearch
    }

    async fn stream(
        &self,
        messages: &[ChatMessage],
        api_key: &str,
        _options: &ProviderOptions,
    ) -> Result<ChunkStream, ProviderError> {
        let query = ChatMessage::join_as_prompt(messages);
        let body = json!({
            "input": query,
            "processor": RESEARCH_PROCESSOR,
        })
        .to_string();

        let mut headers = Headers::new();
        headers.insert("Content-Type".to_string(), "application/json".to_string());
        headers.insert("Authorization".to_string(), format!("Bearer {}", api_key));

        let response = self
            .http
            .post(&self.base_url, &body, &headers)
            .await
            .map_err(ProviderError::from_setup)?;

        if !response.is_success() {
            return Err(ProviderError::Upstream {
                status: response.status,
                message: response.error_message(),
            });
        }

        let submission: Value =
            response
                .json()
                .map_err(|_| ProviderError::InvalidResponse {
                    message: "Failed to parse task submission response".to_string(),
                })?;
        let task_id = submission
            .get("id")
            .and_then(Value::as_str)
            .or_else(|| submission.get("task_id").and_then(Value::as_str))
            .ok_or_else(|| ProviderError::InvalidResponse {
                message: "No task ID returned from API".to_string(),
            })?
            .to_string();

        tracing::info!(task_id = %task_id, "Research task submitted");

        let state = PollState {
            http: Arc::clone(&self.http),
            status_url: format!("{}/{}", self.base_url, task_id),
            headers,
            task_id,
            attempt: 0,
            queue: VecDeque::new(),
            started: false,
            finished: false,
        };

        Ok(Box::pin(stream::unfold(state, poll_step)))
    }
}

struct PollState {
    http: Arc<dyn HttpClient>,
    status_url: String,
    headers: Headers,
    task_id: String,
    attempt: u32,
    queue: VecDeque<StreamChunk>,
    started: bool,
    finished: bool,
}

impl PollState {
    fn progress_chunk(&self, progress: u8, status: &str) -> StreamChunk {
        StreamChunk::Progress(TaskProgress {
            task_id: self.task_id.clone(),
            progress,
            status: status.to_string(),
        })
    }
}

/// One turn of the poll loop. Chunks queued by a poll drain before the
/// next request goes out; the queue always ends with a terminal chunk
/// once the run resolves.
async fn poll_step(mut state: PollState) -> Option<(StreamChunk, PollState)> {
    loop {
        if let Some(chunk) = state.queue.pop_front() {
            return Some((chunk, state));
        }
        if state.finished {
            return None;
        }
        if !state.started {
            state.started = true;
            let chunk = state.progress_chunk(0, "pending");
            return Some((chunk, state));
        }
        if state.attempt >= MAX_POLL_ATTEMPTS {
            state.finished = true;
            return Some((
                StreamChunk::Error("Research task timed out after 30 minutes".to_string()),
                state,
            ));
        }

        tokio::time::sleep(POLL_INTERVAL).await;
        state.attempt += 1;

        let response = match state.http.get(&state.status_url, &state.headers).await {
            Ok(response) => response,
            Err(e) => {
                tracing::debug!("Research poll failed, retrying: {}", e);
                continue;
            }
        };
        if !response.is_success() {
            state.finished = true;
            return Some((
                StreamChunk::Error(format!("Failed to check task status: {}", response.status)),
                state,
            ));
        }
        let run: Value = match response.json() {
            Ok(run) => run,
            Err(e) => {
                tracing::debug!("Unreadable research poll body, retrying: {}", e);
                continue;
            }
        };

        let status = run
            .get("status")
            .and_then(Value::as_str)
            .unwrap_or("running")
            .to_string();
        let progress = poll_progress(&run, state.attempt);
        let chunk = state.progress_chunk(progress, &status);
        state.queue.push_back(chunk);

        match status.as_str() {
            "completed" => {
                state.queue.push_back(StreamChunk::Text(extract_output(&run)));
                let citations = extract_citations(&run);
                if !citations.is_empty() {
                    state.queue.push_back(StreamChunk::Citations(citations));
                }
                state.queue.push_back(StreamChunk::Done);
                state.finished = true;
            }
            "failed" | "error" => {
                state.queue.push_back(StreamChunk::Error(format!(
                    "Research task failed: {}",
                    failure_reason(&run)
                )));
                state.finished = true;
            }
            _ => {}
        }
    }
}

/// Reported progress, or an attempt-based estimate capped below 100
/// so the bar never completes before the task does
fn poll_progress(run: &Value, attempt: u32) -> u8 {
    let raw = run.get("progress").and_then(Value::as_f64).unwrap_or_else(|| {
        ((attempt as f64 / MAX_POLL_ATTEMPTS as f64) * 100.0).min(99.0)
    });
    raw.round() as u8
}

/// Output lives in different places depending on processor and run
/// age; try each known spot before giving up
fn extract_output(run: &Value) -> String {
    let candidates = [
        run.pointer("/result/output").and_then(Value::as_str),
        run.get("output").and_then(Value::as_str),
        run.get("result").and_then(Value::as_str),
    ];
    for candidate in candidates.into_iter().flatten() {
        if !candidate.is_empty() {
            return candidate.to_string();
        }
    }
    "Research completed but no content returned".to_string()
}

fn extract_citations(run: &Value) -> Vec<Citation> {
    let items = run
        .pointer("/result/citations")
        .and_then(Value::as_array)
        .or_else(|| run.get("citations").and_then(Value::as_array));
    match items {
        Some(items) => items
            .iter()
            .filter_map(|item| serde_json::from_value(item.clone()).ok())
            .collect(),
        None => Vec::new(),
    }
}

fn failure_reason(run: &Value) -> String {
    run.get("error")
        .and_then(Value::as_str)
        .or_else(|| run.get("message").and_then(Value::as_str))
        .unwrap_or("Unknown error")
        .to_string()
}
