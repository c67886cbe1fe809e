// Copyright 2026 The Agrilink Project
// SPDX-License-Identifier: Apache-2.0

// Transport: one request/response exchange per query.
//
// Responsibilities:
// - POST `{ "query": ... }` to the orchestrator's streaming endpoint
// - Reject non-success initial responses
// - Expose the response body as an ordered stream of raw byte chunks
//
// No retries here. Retrying is a caller decision.

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::stream::Stream;
use futures_util::TryStreamExt;
use serde::Serialize;
use std::pin::Pin;
use std::time::Duration;

use crate::config::Config;

// ---------------------------------------------------------------------------
// Transport types
// ---------------------------------------------------------------------------

/// Request body understood by the orchestrator.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryRequest {
    pub query: String,
}

impl QueryRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
        }
    }
}

/// Raw body chunks in arrival order. Ends at end of body or after the
/// first error.
pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<Bytes, ConnectionError>> + Send>>;

/// Failures of the exchange itself, as opposed to errors the
/// orchestrator reports inside the stream.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConnectionError {
    #[error("orchestrator responded with HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("request failed: {0}")]
    Request(String),

    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("stream failed: {0}")]
    Stream(String),

    #[error("stream ended before a terminal event")]
    EndedEarly,
}

/// Longest error body excerpt kept in `ConnectionError::Status`.
const MAX_ERROR_BODY_CHARS: usize = 512;

// ---------------------------------------------------------------------------
// Trait: Transport (dependency injection point)
// ---------------------------------------------------------------------------

/// Opens the streaming exchange for one query.
///
/// Implementations must be Send + Sync so a conversation can hold them
/// behind `Arc`.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn open(&self, request: &QueryRequest) -> Result<ChunkStream, ConnectionError>;
}

// ---------------------------------------------------------------------------
// Reqwest transport
// ---------------------------------------------------------------------------

pub struct ReqwestTransport {
    client: reqwest::Client,
    endpoint: String,
    /// Bound on connect plus response headers. The body has no bound here.
    open_timeout: Duration,
}

impl ReqwestTransport {
    pub fn new(client: reqwest::Client, endpoint: impl Into<String>, open_timeout: Duration) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
            open_timeout,
        }
    }

    /// Build a client whose connect and header wait are bounded by
    /// `connect_timeout_ms`. No overall request timeout is set: the body
    /// is a long-lived stream.
    pub fn from_config(config: &Config) -> Result<Self, ConnectionError> {
        let open_timeout = Duration::from_millis(config.request.connect_timeout_ms);
        let client = reqwest::Client::builder()
            .connect_timeout(open_timeout)
            .build()
            .map_err(|e| ConnectionError::Request(e.to_string()))?;
        Ok(Self::new(client, config.endpoint.clone(), open_timeout))
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn open(&self, request: &QueryRequest) -> Result<ChunkStream, ConnectionError> {
        let send = self
            .client
            .post(&self.endpoint)
            .header(reqwest::header::ACCEPT, "text/event-stream")
            .header(reqwest::header::CACHE_CONTROL, "no-cache")
            .json(request)
            .send();

        let resp = match tokio::time::timeout(self.open_timeout, send).await {
            Ok(Ok(resp)) => resp,
            Ok(Err(e)) if e.is_timeout() => return Err(ConnectionError::Timeout(e.to_string())),
            Ok(Err(e)) => return Err(ConnectionError::Request(e.to_string())),
            Err(_) => {
                tracing::warn!(
                    endpoint = %self.endpoint,
                    timeout_ms = self.open_timeout.as_millis() as u64,
                    "no response headers before timeout"
                );
                return Err(ConnectionError::Timeout(format!(
                    "no response headers within {}ms",
                    self.open_timeout.as_millis()
                )));
            }
        };

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            tracing::warn!(status = status.as_u16(), "orchestrator rejected query");
            return Err(ConnectionError::Status {
                status: status.as_u16(),
                body: truncate_chars(body.trim(), MAX_ERROR_BODY_CHARS),
            });
        }

        tracing::debug!(status = status.as_u16(), endpoint = %self.endpoint, "stream opened");

        let stream = resp
            .bytes_stream()
            .map_err(|e| ConnectionError::Stream(e.to_string()));
        Ok(Box::pin(stream))
    }
}

fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...", &s[..idx]),
        None => s.to_string(),
    }
}
