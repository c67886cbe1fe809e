// Copyright 2026 The Agrilink Project
// SPDX-License-Identifier: Apache-2.0

// Reconciliation engine.
//
// Folds the decoded event sequence of one session into a single
// assistant message plus status effects:
// - `transition` is pure: (state, event) -> (state', effects)
// - `ReconciliationEngine` owns the state and is the only writer of the
//   session's assistant message and status tracker
// - FINALIZED and FAILED are terminal. After either, content, agent
//   results and phase never change again
//
// Content policy: before the processing-announcement sentinel each
// progress line replaces the content; after it, plain text accumulates
// into a transcript. Every content write goes through the normalizer.

use serde_json::Value;
use std::fmt;
use std::sync::Arc;

use crate::config::SessionConfig;
use crate::message::{AgentResult, MessageId, MessageStore, StoreError};
use crate::normalize::Normalizer;
use crate::status::{MetaSummary, StatusTracker};
use crate::stream::Event;

// ---------------------------------------------------------------------------
// Session state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Idle,
    Connecting,
    Streaming,
    Finalized,
    Failed,
}

impl Phase {
    pub fn is_terminal(self) -> bool {
        matches!(self, Phase::Finalized | Phase::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Idle => "idle",
            Phase::Connecting => "connecting",
            Phase::Streaming => "streaming",
            Phase::Finalized => "finalized",
            Phase::Failed => "failed",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-session reconciliation state. One per submitted query.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SessionState {
    pub phase: Phase,
    /// Monotonic: false -> true, never reset within a session.
    pub finalized: bool,
    /// Set once the processing-announcement sentinel has been seen.
    pub post_announcement: bool,
    /// Transcript assembled after the announcement.
    pub accumulator: String,
    /// Message of the event that failed the session.
    pub failure_reason: Option<String>,
}

/// State-change notification produced by a transition. Effects are
/// applied to the stores in order and forwarded to observers.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    PhaseChanged { from: Phase, to: Phase },
    /// New assistant content, already normalized.
    ContentReplaced(String),
    AgentResultAppended(AgentResult),
    MetadataReplaced(Value),
    MetricsUpdated(MetaSummary),
    StatusLine(String),
    ConnectionChanged(bool),
    /// Structured payload nothing recognized. Observers only.
    RawStructured(Value),
}

// ---------------------------------------------------------------------------
// Pure transition function
// ---------------------------------------------------------------------------

/// Compute the next state and the effects of one event.
pub fn transition(
    state: &SessionState,
    event: &Event,
    config: &SessionConfig,
    normalizer: &dyn Normalizer,
) -> (SessionState, Vec<Effect>) {
    let mut step = Step {
        next: state.clone(),
        effects: Vec::new(),
        normalizer,
    };

    if state.phase.is_terminal() {
        step.after_terminal(event, config);
    } else {
        step.apply(event, config);
    }

    (step.next, step.effects)
}

struct Step<'a> {
    next: SessionState,
    effects: Vec<Effect>,
    normalizer: &'a dyn Normalizer,
}

impl Step<'_> {
    fn apply(&mut self, event: &Event, config: &SessionConfig) {
        let sentinels = &config.sentinels;
        let messages = &config.messages;

        match event {
            Event::Connected => {
                // A late duplicate must not pull a streaming session back.
                if matches!(self.next.phase, Phase::Idle | Phase::Connecting) {
                    self.enter(Phase::Connecting);
                    self.replace_content(&messages.connecting_placeholder);
                }
                self.effects.push(Effect::StatusLine(messages.connected.clone()));
                self.effects.push(Effect::ConnectionChanged(true));
            }

            Event::Status(text) => {
                self.enter(Phase::Streaming);
                if let Some(text) = text {
                    self.effects.push(Effect::StatusLine(text.clone()));
                    if !self.next.post_announcement {
                        self.replace_content(text);
                    }
                }
            }

            Event::PlainStatus(text) => {
                if text.contains(sentinels.query_complete.as_str()) {
                    self.finalize();
                } else if text.contains(sentinels.processing_announcement.as_str()) {
                    self.enter(Phase::Streaming);
                    self.next.post_announcement = true;
                } else if self.next.post_announcement {
                    self.enter(Phase::Streaming);
                    if !self.next.accumulator.is_empty() {
                        self.next.accumulator.push('\n');
                    }
                    self.next.accumulator.push_str(text);
                    let transcript = self.next.accumulator.clone();
                    self.replace_content(&transcript);
                } else {
                    self.enter(Phase::Streaming);
                    self.replace_content(text);
                }
            }

            Event::Meta(data) => {
                self.enter(Phase::Streaming);
                self.refresh_meta(data);
            }

            Event::AgentResult {
                agent_name,
                response,
            } => {
                self.enter(Phase::Streaming);
                self.replace_content(&messages.agent_working_for(agent_name));
                self.effects.push(Effect::AgentResultAppended(AgentResult::new(
                    agent_name.clone(),
                    response.clone(),
                )));
            }

            Event::FinalResponse(text) => {
                self.replace_content(text);
                self.finalize();
            }

            Event::Complete => {
                self.finalize();
                self.effects.push(Effect::ConnectionChanged(false));
                self.effects.push(Effect::StatusLine(messages.complete.clone()));
            }

            Event::Error(message) | Event::ProcessingError(message) => {
                let text = format!("{}{}", messages.error_prefix, message);
                self.fail(text, message.clone());
            }

            Event::Timeout => {
                self.fail(messages.timeout.clone(), messages.timeout.clone());
            }

            Event::Warning(text) => {
                if !text.trim().is_empty() {
                    self.effects.push(Effect::StatusLine(text.clone()));
                }
            }

            Event::KeepAlive => {}

            Event::Trace(text) => {
                tracing::debug!(trace = %text, "orchestrator trace");
            }

            Event::RawStructured(value) => {
                self.effects.push(Effect::RawStructured(value.clone()));
            }
        }
    }

    /// Terminal guard. Only connection state and metadata still change.
    fn after_terminal(&mut self, event: &Event, config: &SessionConfig) {
        match event {
            Event::Meta(data) => self.refresh_meta(data),
            Event::Complete => {
                self.effects.push(Effect::ConnectionChanged(false));
                if self.next.phase == Phase::Finalized {
                    self.effects
                        .push(Effect::StatusLine(config.messages.complete.clone()));
                }
            }
            Event::Error(_) | Event::ProcessingError(_) | Event::Timeout => {
                tracing::debug!(
                    phase = %self.next.phase,
                    event = event.name(),
                    "failure after terminal phase, marking disconnected only"
                );
                self.effects.push(Effect::ConnectionChanged(false));
            }
            Event::KeepAlive => {}
            other => {
                tracing::debug!(
                    phase = %self.next.phase,
                    event = other.name(),
                    "ignoring event after terminal phase"
                );
            }
        }
    }

    fn enter(&mut self, to: Phase) {
        let from = self.next.phase;
        if from != to {
            self.next.phase = to;
            self.effects.push(Effect::PhaseChanged { from, to });
        }
    }

    fn finalize(&mut self) {
        self.next.finalized = true;
        self.enter(Phase::Finalized);
    }

    fn fail(&mut self, content: String, reason: String) {
        self.replace_content(&content);
        self.effects.push(Effect::StatusLine(content));
        self.next.failure_reason = Some(reason);
        self.enter(Phase::Failed);
        self.effects.push(Effect::ConnectionChanged(false));
    }

    fn replace_content(&mut self, text: &str) {
        self.effects
            .push(Effect::ContentReplaced(self.normalizer.normalize(text)));
    }

    fn refresh_meta(&mut self, data: &Value) {
        self.effects
            .push(Effect::MetricsUpdated(MetaSummary::from_value(data)));
        self.effects.push(Effect::MetadataReplaced(data.clone()));
    }
}

// ---------------------------------------------------------------------------
// ReconciliationEngine
// ---------------------------------------------------------------------------

/// Applies transitions for one session to the shared stores.
pub struct ReconciliationEngine {
    message_id: MessageId,
    state: SessionState,
    config: Arc<SessionConfig>,
    normalizer: Arc<dyn Normalizer>,
}

impl ReconciliationEngine {
    /// `message_id` must name the session's assistant message, already
    /// appended to the store.
    pub fn new(
        message_id: MessageId,
        config: Arc<SessionConfig>,
        normalizer: Arc<dyn Normalizer>,
    ) -> Self {
        Self {
            message_id,
            state: SessionState::default(),
            config,
            normalizer,
        }
    }

    /// Fold one event into the stores. Returns the effects applied.
    pub fn apply(
        &mut self,
        event: &Event,
        store: &mut MessageStore,
        status: &mut StatusTracker,
    ) -> Vec<Effect> {
        let (next, effects) =
            transition(&self.state, event, &self.config, self.normalizer.as_ref());

        for effect in &effects {
            if let Effect::PhaseChanged { from, to } = effect {
                tracing::debug!(message_id = %self.message_id, %from, %to, "phase changed");
            }
            if let Err(e) = self.write(effect, store) {
                tracing::warn!(message_id = %self.message_id, error = %e, "store rejected engine write");
            }
            status.apply(effect);
        }

        self.state = next;
        effects
    }

    fn write(&self, effect: &Effect, store: &mut MessageStore) -> Result<(), StoreError> {
        match effect {
            Effect::ContentReplaced(text) => store.replace_content(self.message_id, text.clone()),
            Effect::AgentResultAppended(result) => {
                store.append_agent_result(self.message_id, result.clone())
            }
            Effect::MetadataReplaced(data) => store.replace_metadata(self.message_id, data.clone()),
            _ => Ok(()),
        }
    }

    pub fn message_id(&self) -> MessageId {
        self.message_id
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn phase(&self) -> Phase {
        self.state.phase
    }
}
