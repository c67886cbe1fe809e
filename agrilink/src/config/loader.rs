// Copyright 2026 The Agrilink Project
// SPDX-License-Identifier: Apache-2.0

use sha2::{Digest, Sha256};

use super::defaults::DEFAULT_ENVIRONMENT;
use super::error::ConfigError;
use super::interpolation::resolve_variables;
use super::raw;
use super::source::ConfigSource;
use super::types::*;

/// Load and validate an agrilink config from the given source.
///
/// Steps:
/// 1. Read raw YAML from source
/// 2. Compute SHA256 config hash
/// 3. Parse YAML into raw deserialization types
/// 4. Resolve variable interpolation in string fields
/// 5. Fill defaults and validate
pub fn load_config(source: &dyn ConfigSource) -> Result<Config, ConfigError> {
    let raw_yaml = source.load()?;
    let config_hash = compute_hash(&raw_yaml);

    let raw: raw::RawConfig = serde_yaml::from_str(&raw_yaml)?;

    if raw.agrilink != "v1" {
        return Err(ConfigError::Validation(format!(
            "unsupported config version \"{}\", expected \"v1\"",
            raw.agrilink
        )));
    }

    let endpoint = resolve_variables(raw.endpoint.trim())?;
    validate_endpoint(&endpoint)?;

    let request = build_request_config(raw.request)?;
    let sentinels = build_sentinels(raw.sentinels)?;
    let messages = build_messages(raw.messages)?;

    Ok(Config {
        version: raw.agrilink,
        endpoint,
        request,
        session: SessionConfig {
            sentinels,
            messages,
        },
        environment: raw
            .environment
            .unwrap_or_else(|| DEFAULT_ENVIRONMENT.to_string()),
        config_hash,
    })
}

pub fn compute_hash(raw_yaml: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(raw_yaml.as_bytes());
    let hash = hasher.finalize();
    format!("sha256:{:x}", hash)
}

/// Endpoint rule shared by the file loader and command-line overrides.
pub fn validate_endpoint(endpoint: &str) -> Result<(), ConfigError> {
    if endpoint.is_empty() {
        return Err(ConfigError::Validation("endpoint must not be empty".into()));
    }
    if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
        return Err(ConfigError::Validation(format!(
            "endpoint \"{endpoint}\" must start with http:// or https://"
        )));
    }
    Ok(())
}

fn build_request_config(raw: Option<raw::RawRequestConfig>) -> Result<RequestConfig, ConfigError> {
    let mut request = RequestConfig::default();
    let Some(raw) = raw else {
        return Ok(request);
    };

    if let Some(ms) = raw.connect_timeout_ms {
        if ms == 0 {
            return Err(ConfigError::Validation(
                "request.connect_timeout_ms must be greater than 0".into(),
            ));
        }
        request.connect_timeout_ms = ms;
    }
    if let Some(ms) = raw.idle_timeout_ms {
        if ms == 0 {
            return Err(ConfigError::Validation(
                "request.idle_timeout_ms must be greater than 0".into(),
            ));
        }
        request.idle_timeout_ms = Some(ms);
    }
    Ok(request)
}

fn build_sentinels(raw: Option<raw::RawSentinels>) -> Result<Sentinels, ConfigError> {
    let mut sentinels = Sentinels::default();
    let Some(raw) = raw else {
        return Ok(sentinels);
    };

    if let Some(s) = raw.query_complete {
        sentinels.query_complete = non_empty("sentinels.query_complete", s)?;
    }
    if let Some(s) = raw.processing_announcement {
        sentinels.processing_announcement = non_empty("sentinels.processing_announcement", s)?;
    }
    Ok(sentinels)
}

fn build_messages(raw: Option<raw::RawMessages>) -> Result<DisplayMessages, ConfigError> {
    let mut messages = DisplayMessages::default();
    let Some(raw) = raw else {
        return Ok(messages);
    };

    let fields = [
        (raw.connected, &mut messages.connected),
        (raw.connecting_placeholder, &mut messages.connecting_placeholder),
        (raw.complete, &mut messages.complete),
        (raw.error_prefix, &mut messages.error_prefix),
        (raw.timeout, &mut messages.timeout),
        (raw.agent_working, &mut messages.agent_working),
    ];
    for (value, slot) in fields {
        if let Some(value) = value {
            *slot = resolve_variables(&value)?;
        }
    }
    Ok(messages)
}

fn non_empty(field: &str, value: String) -> Result<String, ConfigError> {
    if value.trim().is_empty() {
        return Err(ConfigError::Validation(format!("{field} must not be empty")));
    }
    Ok(value)
}
