// Copyright 2026 The Agrilink Project
// SPDX-License-Identifier: Apache-2.0

use std::path::PathBuf;

use super::error::ConfigError;

/// Where the `agrilink.yaml` text is read from.
///
/// The CLI reads `--config` through `FileSource`. Tests hand YAML to the
/// loader through `StringSource`, usually with a mock orchestrator's URL
/// spliced into `endpoint`.
pub trait ConfigSource {
    fn load(&self) -> Result<String, ConfigError>;
}

/// An `agrilink.yaml` on disk. A missing file surfaces as `ConfigError::IoError`.
pub struct FileSource {
    pub path: PathBuf,
}

impl ConfigSource for FileSource {
    fn load(&self) -> Result<String, ConfigError> {
        Ok(std::fs::read_to_string(&self.path)?)
    }
}

/// YAML already in memory.
pub struct StringSource {
    pub content: String,
}

impl ConfigSource for StringSource {
    fn load(&self) -> Result<String, ConfigError> {
        Ok(self.content.clone())
    }
}
