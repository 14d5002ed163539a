//! Tool configuration.
//!
//! Optional YAML file selecting the external programs and resolution
//! tunables. Every field has a default, so an empty file is valid:
//!
//! ```yaml
//! compiler: protoc
//! git: git
//! fetch_retries: 0
//! max_depth: 1
//! compile_timeout_secs: 300
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ProtoError, ProtoResult};
use crate::invocation::COMPILER;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ToolConfig {
    /// Schema compiler executable.
    pub compiler: String,
    /// Git executable used to fetch dependencies.
    pub git: String,
    /// Extra fetch attempts per dependency.
    pub fetch_retries: u32,
    /// Levels of dependencies to resolve; 1 is immediate deps only.
    pub max_depth: usize,
    /// Kill the compiler after this many seconds.
    pub compile_timeout_secs: Option<u64>,
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            compiler: COMPILER.to_string(),
            git: "git".to_string(),
            fetch_retries: 0,
            max_depth: 1,
            compile_timeout_secs: None,
        }
    }
}

impl ToolConfig {
    /// Read a configuration file. Missing fields take their defaults.
    pub fn load(path: &Path) -> ProtoResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| ProtoError::Config {
            path: path.to_path_buf(),
            detail: e.to_string(),
        })?;
        let config: Self = if content.trim().is_empty() {
            Self::default()
        } else {
            serde_yaml::from_str(&content).map_err(|e| ProtoError::Config {
                path: path.to_path_buf(),
                detail: e.to_string(),
            })?
        };
        if config.max_depth == 0 {
            return Err(ProtoError::Config {
                path: path.to_path_buf(),
                detail: "max_depth must be at least 1".to_string(),
            });
        }
        Ok(config)
    }

    /// `load` when a path is given, defaults otherwise.
    pub fn load_or_default(path: Option<&Path>) -> ProtoResult<Self> {
        path.map_or_else(|| Ok(Self::default()), Self::load)
    }

    pub fn compile_timeout(&self) -> Option<Duration> {
        self.compile_timeout_secs.map(Duration::from_secs)
    }
}
