//! Error types for the execution layer.

use crate::language::Language;

/// Errors produced while running an instrumented script.
#[derive(Debug, thiserror::Error)]
pub enum ExecutionError {
    #[error("execution timed out after {limit_ms}ms")]
    Timeout { limit_ms: u64 },

    #[error("runtime exited with {}: {stderr}", exit_label(*exit_code))]
    Runtime {
        exit_code: Option<i32>,
        stderr: String,
    },

    #[error("runtime program not available: {program}")]
    RuntimeUnavailable { program: String },

    #[error("malformed runtime output: {0}")]
    MalformedOutput(String),

    #[error("script produced {produced} values (limit {limit})")]
    ValueLimitExceeded { produced: usize, limit: usize },

    #[error("runtime output exceeded {limit} bytes")]
    OutputLimitExceeded { limit: usize },

    #[error("script cannot be staged: {0}")]
    InvalidScript(String),

    #[error("no execution adapter registered for {language}")]
    NoAdapter { language: Language },

    #[error("invalid execution configuration: {0}")]
    InvalidConfig(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

fn exit_label(code: Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {code}"),
        None => "a signal".to_string(),
    }
}

/// Result type for execution operations.
pub type ExecutionResult<T> = std::result::Result<T, ExecutionError>;
