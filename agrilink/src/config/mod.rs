// Copyright 2026 The Agrilink Project
// SPDX-License-Identifier: Apache-2.0

// Config loader and validator.
//
// Loads agrilink.yaml, resolves variable interpolation, fills defaults,
// validates the endpoint and timeouts, and computes a content hash that
// is logged at startup.

mod defaults;
mod error;
mod interpolation;
mod loader;
mod raw;
mod source;
mod types;

pub use defaults::*;
pub use error::ConfigError;
pub use interpolation::resolve_variables;
pub use loader::{compute_hash, load_config, validate_endpoint};
pub use source::{ConfigSource, FileSource, StringSource};
pub use types::{Config, DisplayMessages, RequestConfig, Sentinels, SessionConfig};
