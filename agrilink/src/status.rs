// Copyright 2026 The Agrilink Project
// SPDX-License-Identifier: Apache-2.0

// Aggregate session status: connection state, the current status line,
// and the agent tally reported by `meta` events.
//
// The tracker is a derived view. It changes only by applying engine
// effects and is never written by transport code.

use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

use crate::engine::Effect;

// ---------------------------------------------------------------------------
// MetaSummary
// ---------------------------------------------------------------------------

/// Typed view of a `meta` payload. Missing or mistyped fields default.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct MetaSummary {
    pub intent_classification: Option<String>,
    pub agents_to_run: Vec<String>,
    pub agents_run: Vec<String>,
    pub confidence_score: Option<f64>,
    pub success_count: u64,
    pub error_count: u64,
    /// Agent name to error message.
    pub errors: BTreeMap<String, String>,
    /// Orchestrator-side wall time in seconds.
    pub processing_time: Option<f64>,
}

impl MetaSummary {
    pub fn from_value(value: &Value) -> Self {
        let str_list = |key: &str| -> Vec<String> {
            value
                .get(key)
                .and_then(Value::as_array)
                .map(|items| {
                    items
                        .iter()
                        .filter_map(Value::as_str)
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default()
        };

        let errors = value
            .get("errors")
            .and_then(Value::as_object)
            .map(|obj| {
                obj.iter()
                    .map(|(agent, err)| {
                        let text = match err {
                            Value::String(s) => s.clone(),
                            other => other.to_string(),
                        };
                        (agent.clone(), text)
                    })
                    .collect()
            })
            .unwrap_or_default();

        Self {
            intent_classification: value
                .get("intent_classification")
                .and_then(Value::as_str)
                .map(str::to_string),
            agents_to_run: str_list("agents_to_run"),
            agents_run: str_list("agents_run"),
            confidence_score: value.get("confidence_score").and_then(Value::as_f64),
            success_count: value.get("success_count").and_then(Value::as_u64).unwrap_or(0),
            error_count: value.get("error_count").and_then(Value::as_u64).unwrap_or(0),
            errors,
            processing_time: value.get("processing_time").and_then(Value::as_f64),
        }
    }
}

// ---------------------------------------------------------------------------
// StatusTracker
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize)]
pub struct StatusTracker {
    is_connected: bool,
    current_status_line: Option<String>,
    /// Distinct agent names in first-reported order.
    agents_run: Vec<String>,
    success_count: u64,
    error_count: u64,
    intent_classification: Option<String>,
    confidence_score: Option<f64>,
}

impl StatusTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one engine effect into the view. Effects that carry no
    /// status information are ignored.
    pub(crate) fn apply(&mut self, effect: &Effect) {
        match effect {
            Effect::ConnectionChanged(connected) => self.is_connected = *connected,
            Effect::StatusLine(line) => self.current_status_line = Some(line.clone()),
            Effect::MetricsUpdated(summary) => self.recompute(summary),
            _ => {}
        }
    }

    /// Metrics are recomputed from each summary, not merged with the
    /// previous one.
    fn recompute(&mut self, summary: &MetaSummary) {
        self.agents_run.clear();
        for agent in &summary.agents_run {
            if !self.agents_run.contains(agent) {
                self.agents_run.push(agent.clone());
            }
        }
        self.success_count = summary.success_count;
        self.error_count = summary.error_count;
        self.intent_classification = summary.intent_classification.clone();
        self.confidence_score = summary.confidence_score;
    }

    /// Forget the previous session's view.
    pub(crate) fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn is_connected(&self) -> bool {
        self.is_connected
    }

    pub fn current_status_line(&self) -> Option<&str> {
        self.current_status_line.as_deref()
    }

    pub fn agents_run(&self) -> &[String] {
        &self.agents_run
    }

    pub fn success_count(&self) -> u64 {
        self.success_count
    }

    pub fn error_count(&self) -> u64 {
        self.error_count
    }

    pub fn intent_classification(&self) -> Option<&str> {
        self.intent_classification.as_deref()
    }

    pub fn confidence_score(&self) -> Option<f64> {
        self.confidence_score
    }
}
