//! Bridge configuration

use crate::error::ScriptError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// What a failed plain `call` does after logging
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssertPolicy {
    /// Panic with the failing `module.function`
    Panic,
    /// Log at error level and carry on
    Log,
}

impl Default for AssertPolicy {
    fn default() -> Self {
        if cfg!(debug_assertions) {
            AssertPolicy::Panic
        } else {
            AssertPolicy::Log
        }
    }
}

/// Bridge settings, loadable from JSON
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    pub assert_policy: AssertPolicy,
    /// Attach the interpreter stack to fatal failures
    pub capture_stack_on_failure: bool,
    /// Emit a debug event for every call
    pub log_calls: bool,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            assert_policy: AssertPolicy::default(),
            capture_stack_on_failure: true,
            log_calls: false,
        }
    }
}

impl BridgeConfig {
    pub fn load(path: &Path) -> Result<Self, ScriptError> {
        let text = std::fs::read_to_string(path).map_err(|source| ScriptError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> Result<Self, ScriptError> {
        Ok(serde_json::from_str(text)?)
    }
}
