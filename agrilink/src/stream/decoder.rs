// Copyright 2026 The Agrilink Project
// SPDX-License-Identifier: Apache-2.0

// Event decoder.
//
// Classifies each frame into one `Event`. Decoding is total: a payload
// that cannot be understood degrades to `PlainStatus` so its text still
// reaches the user.
//
// Fallback order:
// 1. Payload-level `event` field, if it names a known kind
// 2. Frame-level `event:` name, if it names a known kind
// 3. Structured payload without a usable name: shape heuristics
//    (agent + response -> AgentResult, summary keys -> Meta,
//    otherwise RawStructured)
// 4. Anything else: PlainStatus(text), or KeepAlive when blank

use serde_json::{Map, Value};

use super::types::{Event, EventKind, Frame};

/// Keys that identify an agent's name in a structured payload.
const AGENT_KEYS: &[&str] = &["agent", "agentName", "agent_name"];

/// Keys whose presence marks a classification/summary payload.
const META_KEYS: &[&str] = &[
    "intent_classification",
    "classification",
    "summary",
    "agents_run",
    "success_count",
    "error_count",
];

/// Keys checked, in order, for a human-readable message.
const MESSAGE_KEYS: &[&str] = &["message", "status", "text", "detail"];

/// A frame's payload after the structured/unstructured split.
enum Payload<'a> {
    Structured(&'a Map<String, Value>),
    Text(&'a str),
}

/// Stateless frame-to-event decoder.
#[derive(Debug, Default, Clone, Copy)]
pub struct EventDecoder;

impl EventDecoder {
    pub fn new() -> Self {
        Self
    }

    /// Decode one frame. Never fails.
    pub fn decode(&self, frame: &Frame) -> Event {
        let parsed = parse_object(&frame.data);

        let payload_kind = parsed
            .as_ref()
            .and_then(|obj| obj.get("event"))
            .and_then(Value::as_str)
            .and_then(EventKind::from_name);
        let frame_kind = frame.event.as_deref().and_then(EventKind::from_name);

        match (payload_kind.or(frame_kind), parsed.as_ref()) {
            (Some(kind), Some(obj)) => build_typed(kind, Payload::Structured(obj), &frame.data),
            (Some(kind), None) => build_typed(kind, Payload::Text(&frame.data), &frame.data),
            (None, Some(obj)) => classify_by_shape(obj),
            (None, None) => plain(&frame.data),
        }
    }
}

/// Only JSON objects count as structured. Bare JSON scalars such as a
/// number on its own are ordinary text.
fn parse_object(data: &str) -> Option<Map<String, Value>> {
    let trimmed = data.trim();
    if !trimmed.starts_with('{') {
        return None;
    }
    match serde_json::from_str::<Value>(trimmed) {
        Ok(Value::Object(obj)) => Some(obj),
        Ok(_) => None,
        Err(e) => {
            tracing::debug!(error = %e, "payload looks structured but does not parse, treating as text");
            None
        }
    }
}

fn build_typed(kind: EventKind, payload: Payload<'_>, raw: &str) -> Event {
    match kind {
        EventKind::Connected => Event::Connected,
        EventKind::Complete => Event::Complete,
        EventKind::Timeout => Event::Timeout,
        EventKind::KeepAlive => Event::KeepAlive,
        EventKind::Status => Event::Status(message_text(&payload).filter(|t| !t.trim().is_empty())),
        EventKind::Warning => Event::Warning(message_text(&payload).unwrap_or_default()),
        EventKind::Trace => Event::Trace(raw.to_string()),
        EventKind::Error => Event::Error(error_text(&payload, raw)),
        EventKind::ProcessingError => Event::ProcessingError(error_text(&payload, raw)),
        EventKind::FinalResponse => match payload {
            Payload::Structured(obj) => match obj.get("response") {
                Some(response) => Event::FinalResponse(render(response)),
                None => Event::FinalResponse(raw.to_string()),
            },
            Payload::Text(text) => Event::FinalResponse(text.to_string()),
        },
        EventKind::Meta => match payload {
            Payload::Structured(obj) => Event::Meta(Value::Object(obj.clone())),
            Payload::Text(text) => {
                tracing::debug!("meta frame without a structured payload");
                plain(text)
            }
        },
        EventKind::AgentResult => match payload {
            Payload::Structured(obj) => match agent_result(obj) {
                Some(event) => event,
                None => Event::RawStructured(Value::Object(obj.clone())),
            },
            Payload::Text(text) => {
                tracing::debug!("agent_result frame without a structured payload");
                plain(text)
            }
        },
    }
}

fn classify_by_shape(obj: &Map<String, Value>) -> Event {
    if obj.contains_key("response") {
        if let Some(event) = agent_result(obj) {
            return event;
        }
    }
    if META_KEYS.iter().any(|key| obj.contains_key(*key)) {
        return Event::Meta(Value::Object(obj.clone()));
    }
    Event::RawStructured(Value::Object(obj.clone()))
}

fn agent_result(obj: &Map<String, Value>) -> Option<Event> {
    let agent_name = AGENT_KEYS
        .iter()
        .find_map(|key| obj.get(*key).and_then(Value::as_str))?;
    Some(Event::AgentResult {
        agent_name: agent_name.to_string(),
        response: obj.get("response").cloned().unwrap_or(Value::Null),
    })
}

fn plain(text: &str) -> Event {
    if text.trim().is_empty() {
        Event::KeepAlive
    } else {
        Event::PlainStatus(text.to_string())
    }
}

fn message_text(payload: &Payload<'_>) -> Option<String> {
    match payload {
        Payload::Structured(obj) => MESSAGE_KEYS
            .iter()
            .find_map(|key| obj.get(*key).and_then(Value::as_str))
            .map(str::to_string),
        Payload::Text(text) => Some(text.to_string()),
    }
}

fn error_text(payload: &Payload<'_>, raw: &str) -> String {
    let text = match payload {
        Payload::Structured(obj) => obj
            .get("error")
            .and_then(Value::as_str)
            .map(str::to_string)
            .or_else(|| message_text(payload))
            .unwrap_or_else(|| raw.to_string()),
        Payload::Text(text) => text.to_string(),
    };
    if text.trim().is_empty() {
        "unknown error".to_string()
    } else {
        text
    }
}

/// Strings verbatim, anything else as compact JSON.
fn render(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
