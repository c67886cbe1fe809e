// Copyright 2026 The Agrilink Project
// SPDX-License-Identifier: Apache-2.0

// Conversation driver.
//
// Runs one session per submitted query:
// transport -> frame parser -> decoder -> reconciliation engine.
//
// A conversation processes one session at a time (`submit` takes
// `&mut self`), so events of two sessions never reach the same message.
// Once the session is terminal the stream is still drained, but the
// engine's guard keeps content frozen.

use futures_util::StreamExt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::config::{Config, SessionConfig};
use crate::engine::{Effect, Phase, ReconciliationEngine};
use crate::message::{InputModality, Message, MessageId, MessageStore, StoreError};
use crate::normalize::{BlockSpacingNormalizer, Normalizer};
use crate::status::StatusTracker;
use crate::stream::{frames, Event, EventDecoder};
use crate::transport::{ConnectionError, QueryRequest, Transport};

// ---------------------------------------------------------------------------
// Outcomes and errors
// ---------------------------------------------------------------------------

/// How a session ended. Each variant names the assistant message that
/// holds the visible result.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryOutcome {
    /// The orchestrator finished the exchange.
    Finalized { message_id: MessageId },
    /// The orchestrator reported an error or timed out.
    Failed { message_id: MessageId, reason: String },
    /// The exchange itself failed or ended without a terminal event.
    ConnectionError {
        message_id: MessageId,
        error: ConnectionError,
    },
}

impl QueryOutcome {
    pub fn message_id(&self) -> MessageId {
        match self {
            QueryOutcome::Finalized { message_id }
            | QueryOutcome::Failed { message_id, .. }
            | QueryOutcome::ConnectionError { message_id, .. } => *message_id,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, QueryOutcome::Finalized { .. })
    }
}

/// Errors that prevent a session from starting.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("query is empty")]
    EmptyQuery,

    #[error(transparent)]
    Store(#[from] StoreError),
}

// ---------------------------------------------------------------------------
// Conversation
// ---------------------------------------------------------------------------

pub struct Conversation {
    transport: Arc<dyn Transport>,
    config: Arc<SessionConfig>,
    normalizer: Arc<dyn Normalizer>,
    decoder: EventDecoder,
    /// Synthesizes a `Timeout` event when no frame arrives in time.
    idle_timeout: Option<Duration>,
    store: MessageStore,
    status: StatusTracker,
    observer: Option<mpsc::UnboundedSender<Effect>>,
}

impl Conversation {
    pub fn new(transport: Arc<dyn Transport>, config: SessionConfig) -> Self {
        Self {
            transport,
            config: Arc::new(config),
            normalizer: Arc::new(BlockSpacingNormalizer::new()),
            decoder: EventDecoder::new(),
            idle_timeout: None,
            store: MessageStore::new(),
            status: StatusTracker::new(),
            observer: None,
        }
    }

    /// Session settings and idle timeout from a loaded config.
    pub fn from_config(transport: Arc<dyn Transport>, config: &Config) -> Self {
        let conversation = Self::new(transport, config.session.clone());
        match config.request.idle_timeout_ms {
            Some(ms) => conversation.with_idle_timeout(Duration::from_millis(ms)),
            None => conversation,
        }
    }

    pub fn with_normalizer(mut self, normalizer: Arc<dyn Normalizer>) -> Self {
        self.normalizer = normalizer;
        self
    }

    pub fn with_idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = Some(timeout);
        self
    }

    /// Receive every effect the engine applies, in order.
    pub fn with_observer(mut self, observer: mpsc::UnboundedSender<Effect>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn messages(&self) -> &MessageStore {
        &self.store
    }

    pub fn status(&self) -> &StatusTracker {
        &self.status
    }

    /// Submit one query and run its session to the end.
    ///
    /// Appends the user message and a fresh assistant message, then
    /// folds the response stream into the assistant message. Transport
    /// failures are reported as `QueryOutcome::ConnectionError`, not as
    /// `Err`; the assistant message shows the failure either way.
    pub async fn submit(
        &mut self,
        query: &str,
        modality: InputModality,
    ) -> Result<QueryOutcome, SessionError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(SessionError::EmptyQuery);
        }

        let session_id = Uuid::new_v4();
        self.status.reset();
        self.store.append(Message::user(query, modality))?;
        let message_id = self.store.append(Message::assistant())?;
        let mut engine =
            ReconciliationEngine::new(message_id, self.config.clone(), self.normalizer.clone());

        tracing::info!(%session_id, %message_id, ?modality, "query submitted");

        let chunks = match self.transport.open(&QueryRequest::new(query)).await {
            Ok(chunks) => chunks,
            Err(error) => return Ok(self.connection_failed(&mut engine, session_id, error)),
        };

        let mut frame_stream = Box::pin(frames(chunks));
        loop {
            let next = match self.idle_timeout {
                Some(limit) => match tokio::time::timeout(limit, frame_stream.next()).await {
                    Ok(next) => next,
                    Err(_) => {
                        if !engine.phase().is_terminal() {
                            tracing::warn!(
                                %session_id,
                                idle_timeout_ms = limit.as_millis() as u64,
                                "no frame within idle timeout"
                            );
                            self.feed(&mut engine, session_id, &Event::Timeout);
                        }
                        break;
                    }
                },
                None => frame_stream.next().await,
            };

            match next {
                Some(Ok(frame)) => {
                    let event = self.decoder.decode(&frame);
                    self.feed(&mut engine, session_id, &event);
                }
                Some(Err(error)) if engine.phase().is_terminal() => {
                    tracing::warn!(%session_id, error = %error, "stream failed after terminal phase");
                    break;
                }
                Some(Err(error)) => {
                    return Ok(self.connection_failed(&mut engine, session_id, error));
                }
                None => break,
            }
        }

        let outcome = match engine.phase() {
            Phase::Finalized => QueryOutcome::Finalized { message_id },
            Phase::Failed => QueryOutcome::Failed {
                message_id,
                reason: engine.state().failure_reason.clone().unwrap_or_default(),
            },
            _ => {
                return Ok(self.connection_failed(
                    &mut engine,
                    session_id,
                    ConnectionError::EndedEarly,
                ))
            }
        };

        tracing::info!(
            %session_id,
            %message_id,
            phase = %engine.phase(),
            agents_run = self.status.agents_run().len(),
            "session ended"
        );
        Ok(outcome)
    }

    /// Feed an implicit error so the message and phase reflect the failure.
    fn connection_failed(
        &mut self,
        engine: &mut ReconciliationEngine,
        session_id: Uuid,
        error: ConnectionError,
    ) -> QueryOutcome {
        tracing::warn!(%session_id, error = %error, "connection failed");
        self.feed(engine, session_id, &Event::Error(error.to_string()));
        QueryOutcome::ConnectionError {
            message_id: engine.message_id(),
            error,
        }
    }

    fn feed(&mut self, engine: &mut ReconciliationEngine, session_id: Uuid, event: &Event) {
        tracing::debug!(%session_id, event = event.name(), phase = %engine.phase(), "event received");
        let effects = engine.apply(event, &mut self.store, &mut self.status);

        if let Some(observer) = &self.observer {
            for effect in effects {
                if observer.send(effect).is_err() {
                    tracing::debug!(%session_id, "effect observer closed");
                    break;
                }
            }
        }
    }
}
