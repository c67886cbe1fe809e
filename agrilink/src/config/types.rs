// Copyright 2026 The Agrilink Project
// SPDX-License-Identifier: Apache-2.0

use super::defaults::*;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Top-level parsed and validated agrilink config.
#[derive(Debug, Clone)]
pub struct Config {
    /// Config format version. Always "v1".
    pub version: String,
    /// Orchestrator streaming query endpoint (after interpolation).
    pub endpoint: String,
    /// Transport timeouts.
    pub request: RequestConfig,
    /// Reconciliation behaviour shared by every session.
    pub session: SessionConfig,
    /// Environment label (e.g. "dev", "field-test").
    pub environment: String,
    /// SHA256 hash of the raw YAML: "sha256:{hex}".
    pub config_hash: String,
}

impl Config {
    /// Defaults for everything but the endpoint. Used when no config file
    /// exists; the endpoint is not validated here.
    pub fn for_endpoint(endpoint: impl Into<String>) -> Self {
        let endpoint = endpoint.into();
        Self {
            version: "v1".to_string(),
            config_hash: super::loader::compute_hash(&format!("endpoint: {endpoint}")),
            endpoint,
            request: RequestConfig::default(),
            session: SessionConfig::default(),
            environment: DEFAULT_ENVIRONMENT.to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Typed config structs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct RequestConfig {
    /// Bound on establishing the exchange (connect + response headers).
    pub connect_timeout_ms: u64,
    /// When set, a session that sees no frame for this long is failed
    /// with a synthesized timeout event.
    pub idle_timeout_ms: Option<u64>,
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self {
            connect_timeout_ms: DEFAULT_CONNECT_TIMEOUT_MS,
            idle_timeout_ms: None,
        }
    }
}

/// Everything the reconciliation engine needs besides the events.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SessionConfig {
    pub sentinels: Sentinels,
    pub messages: DisplayMessages,
}

/// Plain-text phase markers, matched as case-sensitive substrings.
#[derive(Debug, Clone, PartialEq)]
pub struct Sentinels {
    /// Silent completion: finalizes without touching content.
    pub query_complete: String,
    /// Switches content handling from replace to accumulate.
    pub processing_announcement: String,
}

impl Default for Sentinels {
    fn default() -> Self {
        Self {
            query_complete: DEFAULT_QUERY_COMPLETE_SENTINEL.to_string(),
            processing_announcement: DEFAULT_PROCESSING_ANNOUNCEMENT_SENTINEL.to_string(),
        }
    }
}

/// Human-readable strings the engine writes into status and content.
#[derive(Debug, Clone, PartialEq)]
pub struct DisplayMessages {
    pub connected: String,
    pub connecting_placeholder: String,
    pub complete: String,
    pub error_prefix: String,
    pub timeout: String,
    /// Template with an `{agent}` placeholder.
    pub agent_working: String,
}

impl DisplayMessages {
    pub fn agent_working_for(&self, agent: &str) -> String {
        self.agent_working.replace("{agent}", agent)
    }
}

impl Default for DisplayMessages {
    fn default() -> Self {
        Self {
            connected: DEFAULT_CONNECTED_STATUS.to_string(),
            connecting_placeholder: DEFAULT_CONNECTING_PLACEHOLDER.to_string(),
            complete: DEFAULT_COMPLETE_STATUS.to_string(),
            error_prefix: DEFAULT_ERROR_PREFIX.to_string(),
            timeout: DEFAULT_TIMEOUT_MESSAGE.to_string(),
            agent_working: DEFAULT_AGENT_WORKING.to_string(),
        }
    }
}
