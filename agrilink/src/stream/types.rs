// Copyright 2026 The Agrilink Project
// SPDX-License-Identifier: Apache-2.0

// Stream types: protocol frames and the internal event union the
// reconciliation engine consumes.

use serde_json::Value;

// ---------------------------------------------------------------------------
// Frame representation
// ---------------------------------------------------------------------------

/// One blank-line-delimited unit of the response stream.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Frame {
    /// The `event:` name, if the frame carried one.
    pub event: Option<String>,
    /// All `data:` lines joined with `\n`.
    pub data: String,
}

impl Frame {
    pub fn new(event: Option<&str>, data: impl Into<String>) -> Self {
        Self {
            event: event.map(str::to_string),
            data: data.into(),
        }
    }

    /// A frame without an `event:` line.
    pub fn untyped(data: impl Into<String>) -> Self {
        Self::new(None, data)
    }
}

// ---------------------------------------------------------------------------
// Internal events
// ---------------------------------------------------------------------------

/// Normalized orchestrator event. Every frame decodes to exactly one.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// The orchestrator accepted the exchange.
    Connected,
    /// Ephemeral progress line. `None` when the frame carried no text.
    Status(Option<String>),
    /// Untyped plain text, subject to the sentinel rules.
    PlainStatus(String),
    /// Classification/summary object (agents run, success/error counts).
    Meta(Value),
    /// One agent's answer.
    AgentResult { agent_name: String, response: Value },
    /// The answer text. Finalizes the session.
    FinalResponse(String),
    /// Orchestrator finished the exchange.
    Complete,
    Error(String),
    ProcessingError(String),
    Timeout,
    /// Non-fatal orchestrator warning; status line only.
    Warning(String),
    /// Liveness ping with nothing to show.
    KeepAlive,
    /// Diagnostic text (stack traces). Never shown.
    Trace(String),
    /// Structured payload with no recognizable shape.
    RawStructured(Value),
}

impl Event {
    /// Stable lowercase name, used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            Event::Connected => "connected",
            Event::Status(_) => "status",
            Event::PlainStatus(_) => "plain_status",
            Event::Meta(_) => "meta",
            Event::AgentResult { .. } => "agent_result",
            Event::FinalResponse(_) => "final_response",
            Event::Complete => "complete",
            Event::Error(_) => "error",
            Event::ProcessingError(_) => "processing_error",
            Event::Timeout => "timeout",
            Event::Warning(_) => "warning",
            Event::KeepAlive => "keep_alive",
            Event::Trace(_) => "trace",
            Event::RawStructured(_) => "raw_structured",
        }
    }
}

// ---------------------------------------------------------------------------
// Event kinds recognized by name
// ---------------------------------------------------------------------------

/// Event names the decoder builds typed events for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Connected,
    Status,
    Meta,
    AgentResult,
    FinalResponse,
    Complete,
    Error,
    ProcessingError,
    Timeout,
    Warning,
    KeepAlive,
    Trace,
}

impl EventKind {
    /// Look up a frame-level or payload-level event name.
    ///
    /// `progress` is the orchestrator's older name for `status`.
    pub fn from_name(name: &str) -> Option<Self> {
        let kind = match name.trim() {
            "connected" => EventKind::Connected,
            "status" | "progress" => EventKind::Status,
            "meta" => EventKind::Meta,
            "agent_result" => EventKind::AgentResult,
            "final_response" => EventKind::FinalResponse,
            "complete" => EventKind::Complete,
            "error" => EventKind::Error,
            "processing_error" => EventKind::ProcessingError,
            "timeout" => EventKind::Timeout,
            "warning" => EventKind::Warning,
            "keep_alive" => EventKind::KeepAlive,
            "trace" => EventKind::Trace,
            _ => return None,
        };
        Some(kind)
    }
}
