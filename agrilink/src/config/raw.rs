// Copyright 2026 The Agrilink Project
// SPDX-License-Identifier: Apache-2.0

// Raw YAML deserialization types (internal).
// Kept apart from the public Config structs so interpolation, defaults
// and validation happen between the two.

use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawConfig {
    pub agrilink: String,
    pub endpoint: String,
    pub request: Option<RawRequestConfig>,
    pub sentinels: Option<RawSentinels>,
    pub messages: Option<RawMessages>,
    pub environment: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawRequestConfig {
    pub connect_timeout_ms: Option<u64>,
    pub idle_timeout_ms: Option<u64>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawSentinels {
    pub query_complete: Option<String>,
    pub processing_announcement: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawMessages {
    pub connected: Option<String>,
    pub connecting_placeholder: Option<String>,
    pub complete: Option<String>,
    pub error_prefix: Option<String>,
    pub timeout: Option<String>,
    pub agent_working: Option<String>,
}
