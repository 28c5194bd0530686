//! Configuration file for the snipcheck tool.
//!
//! ```toml
//! max_concurrent = 4
//!
//! [execution]
//! timeout_ms = 2000
//!
//! [runtimes]
//! python = "/usr/local/bin/python3.12"
//! ```
//!
//! Every key is optional; missing keys take their defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::execution::{ExecutionConfig, ExecutionError, RuntimePrograms};

/// Errors reading or validating a config or challenge file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid toml: {0}")]
    Parse(#[from] toml::de::Error),

    #[error(transparent)]
    Invalid(#[from] ExecutionError),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SnipcheckConfig {
    pub execution: ExecutionConfig,
    pub runtimes: RuntimePrograms,
    /// Upper bound on snippets executed at once by `regenerate`.
    pub max_concurrent: usize,
}

impl Default for SnipcheckConfig {
    fn default() -> Self {
        Self {
            execution: ExecutionConfig::default(),
            runtimes: RuntimePrograms::default(),
            max_concurrent: 4,
        }
    }
}

impl SnipcheckConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.execution.validate()?;
        if self.max_concurrent == 0 {
            return Err(ExecutionError::InvalidConfig(
                "max_concurrent must be greater than zero".to_string(),
            )
            .into());
        }
        Ok(())
    }
}
