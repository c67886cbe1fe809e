// Copyright 2026 The Agrilink Project
// SPDX-License-Identifier: Apache-2.0

// Built-in values used when the config file leaves a field out. The
// sentinel phrases are the ones the farm orchestrator emits verbatim.

pub const DEFAULT_QUERY_COMPLETE_SENTINEL: &str = "Query processing completed successfully";
pub const DEFAULT_PROCESSING_ANNOUNCEMENT_SENTINEL: &str = "Processing completed successfully";

pub const DEFAULT_CONNECTED_STATUS: &str = "Connected to Farm AI Assistant";
pub const DEFAULT_CONNECTING_PLACEHOLDER: &str = "Connecting to Farm AI Assistant...";
pub const DEFAULT_COMPLETE_STATUS: &str = "Query processing complete";
pub const DEFAULT_ERROR_PREFIX: &str = "Error: ";
pub const DEFAULT_TIMEOUT_MESSAGE: &str = "The request timed out. Please try again.";

/// `{agent}` is replaced with the reporting agent's name.
pub const DEFAULT_AGENT_WORKING: &str = "Working on it... {agent} agent has responded.";

pub const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 10_000;

pub const DEFAULT_ENVIRONMENT: &str = "dev";
