// Copyright 2026 The Agrilink Project
// SPDX-License-Identifier: Apache-2.0

// Conversation messages and the per-conversation message store.
//
// User messages are immutable once appended. Assistant messages are
// mutated only through the store's mutators, and only the
// reconciliation engine calls those.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Message types
// ---------------------------------------------------------------------------

/// Opaque message identifier. Assigned at creation, never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(Uuid);

impl MessageId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for MessageId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Who authored a conversational turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// How the user produced the query. Capture devices are external; the
/// modality is recorded for display only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputModality {
    #[default]
    Text,
    Voice,
    Image,
}

/// One specialist agent's answer as reported by the orchestrator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentResult {
    pub agent_name: String,
    /// Usually a string, but the orchestrator forwards structured agent
    /// output (objects) unchanged.
    pub response: serde_json::Value,
}

impl AgentResult {
    pub fn new(agent_name: impl Into<String>, response: serde_json::Value) -> Self {
        Self {
            agent_name: agent_name.into(),
            response,
        }
    }

    /// The response rendered as display text: strings verbatim, anything
    /// else as compact JSON.
    pub fn response_text(&self) -> String {
        match &self.response {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

/// A single conversational turn.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Message {
    pub id: MessageId,
    pub role: Role,
    pub content: String,
    /// Set for user messages; assistant messages carry `None`.
    pub input_modality: Option<InputModality>,
    pub created_at: DateTime<Utc>,
    /// Orchestrator classification/summary data. Replaced on every write.
    pub metadata: Option<serde_json::Value>,
    /// Append-only, in arrival order.
    pub agent_results: Vec<AgentResult>,
}

impl Message {
    /// A user turn. Content is fixed from here on.
    pub fn user(content: impl Into<String>, modality: InputModality) -> Self {
        Self {
            id: MessageId::new(),
            role: Role::User,
            content: content.into(),
            input_modality: Some(modality),
            created_at: Utc::now(),
            metadata: None,
            agent_results: Vec::new(),
        }
    }

    /// An empty assistant turn, filled in by the reconciliation engine.
    pub fn assistant() -> Self {
        Self {
            id: MessageId::new(),
            role: Role::Assistant,
            content: String::new(),
            input_modality: None,
            created_at: Utc::now(),
            metadata: None,
            agent_results: Vec::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// MessageStore
// ---------------------------------------------------------------------------

/// Errors from store mutators.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StoreError {
    #[error("unknown message id {0}")]
    UnknownMessage(MessageId),

    #[error("message {0} is a user message and cannot be modified")]
    ImmutableMessage(MessageId),

    #[error("message id {0} is already present")]
    DuplicateId(MessageId),
}

/// Ordered collection of messages, addressable by id.
#[derive(Debug, Default)]
pub struct MessageStore {
    messages: Vec<Message>,
    index: HashMap<MessageId, usize>,
}

impl MessageStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a message at the end of the conversation.
    pub fn append(&mut self, message: Message) -> Result<MessageId, StoreError> {
        let id = message.id;
        if self.index.contains_key(&id) {
            return Err(StoreError::DuplicateId(id));
        }
        self.index.insert(id, self.messages.len());
        self.messages.push(message);
        Ok(id)
    }

    /// Overwrite an assistant message's content.
    pub fn replace_content(&mut self, id: MessageId, text: String) -> Result<(), StoreError> {
        self.assistant_mut(id)?.content = text;
        Ok(())
    }

    /// Append one agent result to an assistant message.
    pub fn append_agent_result(
        &mut self,
        id: MessageId,
        result: AgentResult,
    ) -> Result<(), StoreError> {
        self.assistant_mut(id)?.agent_results.push(result);
        Ok(())
    }

    /// Replace an assistant message's metadata wholesale.
    pub fn replace_metadata(
        &mut self,
        id: MessageId,
        metadata: serde_json::Value,
    ) -> Result<(), StoreError> {
        self.assistant_mut(id)?.metadata = Some(metadata);
        Ok(())
    }

    pub fn get(&self, id: MessageId) -> Option<&Message> {
        self.index.get(&id).map(|&i| &self.messages[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = &Message> {
        self.messages.iter()
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    fn assistant_mut(&mut self, id: MessageId) -> Result<&mut Message, StoreError> {
        let i = *self.index.get(&id).ok_or(StoreError::UnknownMessage(id))?;
        let message = &mut self.messages[i];
        if message.role != Role::Assistant {
            return Err(StoreError::ImmutableMessage(id));
        }
        Ok(message)
    }
}
