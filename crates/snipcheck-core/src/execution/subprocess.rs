//! Subprocess adapter: run instrumented scripts with real interpreters.
//!
//! Each run gets a fresh temporary directory. The per-language staging code
//! writes the script plus a small launcher that prints the collector as JSON
//! on a line starting with [`RESULT_SENTINEL`]; this module spawns the
//! commands and decodes that line.

use std::path::Path;
use std::process::Stdio;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tracing::debug;

use super::error::{ExecutionError, ExecutionResult};
use super::{Bindings, ExecutionAdapter, ExecutionConfig};
use crate::language::Language;
use crate::languages;
use crate::transform::InstrumentedScript;

/// Prefix of the stdout line carrying the collected values.
pub const RESULT_SENTINEL: &str = "__SNIPCHECK_RESULT__";

/// Message of the error a staged collector raises when it is full.
pub const VALUE_LIMIT_MARKER: &str = "__SNIPCHECK_VALUE_LIMIT__";

/// Stderr kept for error reports.
const STDERR_LIMIT: usize = 16 * 1024;

/// Program names (or paths) used to run each language.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RuntimePrograms {
    pub python: String,
    pub node: String,
    pub java: String,
    pub javac: String,
}

impl Default for RuntimePrograms {
    fn default() -> Self {
        Self {
            python: "python3".to_string(),
            node: "node".to_string(),
            java: "java".to_string(),
            javac: "javac".to_string(),
        }
    }
}

impl RuntimePrograms {
    /// The program that finally runs `language` scripts.
    pub fn runner(&self, language: Language) -> &str {
        match language {
            Language::Java => &self.java,
            Language::JavaScript => &self.node,
            Language::Python => &self.python,
        }
    }
}

/// Commands to run, in order, after staging. The last one prints the result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedRun {
    pub steps: Vec<Vec<String>>,
}

/// Runs scripts of one language as child processes.
///
/// The value cap is enforced inside the child by the staged collector, so a
/// runaway loop fails as soon as it collects one value too many.
#[derive(Debug, Clone)]
pub struct SubprocessAdapter {
    language: Language,
    programs: RuntimePrograms,
    max_output_bytes: usize,
    max_values: usize,
}

impl SubprocessAdapter {
    pub fn new(language: Language, programs: RuntimePrograms, limits: &ExecutionConfig) -> Self {
        Self {
            language,
            programs,
            max_output_bytes: limits.max_output_bytes,
            max_values: limits.max_values,
        }
    }

    pub fn programs(&self) -> &RuntimePrograms {
        &self.programs
    }

    /// A runtime failure raised by the full collector becomes
    /// `ValueLimitExceeded`; anything else passes through.
    fn value_limit_or(&self, error: ExecutionError) -> ExecutionError {
        match error {
            ExecutionError::Runtime { ref stderr, .. } if stderr.contains(VALUE_LIMIT_MARKER) => {
                ExecutionError::ValueLimitExceeded {
                    produced: self.max_values + 1,
                    limit: self.max_values,
                }
            }
            other => other,
        }
    }
}

#[async_trait]
impl ExecutionAdapter for SubprocessAdapter {
    fn language(&self) -> Language {
        self.language
    }

    async fn execute(
        &self,
        script: &InstrumentedScript,
        bindings: &Bindings,
    ) -> ExecutionResult<Vec<Value>> {
        let dir = tempfile::tempdir()?;
        let staged = languages::stage(
            script,
            bindings,
            dir.path(),
            &self.programs,
            self.max_values,
        )?;

        let mut stdout = Vec::new();
        for step in &staged.steps {
            stdout = run_step(step, dir.path(), self.max_output_bytes)
                .await
                .map_err(|e| self.value_limit_or(e))?;
        }
        parse_result(&stdout)
    }
}

/// Spawn one command and return its stdout, failing on non-zero exit.
async fn run_step(step: &[String], dir: &Path, max_output_bytes: usize) -> ExecutionResult<Vec<u8>> {
    let (program, args) = step
        .split_first()
        .ok_or_else(|| ExecutionError::InvalidScript("empty command".to_string()))?;
    debug!(program = %program, args = args.len(), "spawning runtime");

    let mut child = Command::new(program)
        .args(args)
        .current_dir(dir)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => ExecutionError::RuntimeUnavailable {
                program: program.clone(),
            },
            _ => ExecutionError::Io(e),
        })?;

    let out = child
        .stdout
        .take()
        .ok_or_else(|| ExecutionError::MalformedOutput("stdout not captured".to_string()))?;
    let err = child
        .stderr
        .take()
        .ok_or_else(|| ExecutionError::MalformedOutput("stderr not captured".to_string()))?;

    let stderr_task = tokio::spawn(read_stderr(err));
    let stdout = read_capped(out, max_output_bytes).await?;
    if stdout.len() > max_output_bytes {
        stderr_task.abort();
        // Dropping the child kills it.
        return Err(ExecutionError::OutputLimitExceeded {
            limit: max_output_bytes,
        });
    }
    let stderr = stderr_task
        .await
        .map_err(|e| ExecutionError::Io(std::io::Error::other(e)))??;

    let status = child.wait().await?;
    if !status.success() {
        let mut stderr = String::from_utf8_lossy(&stderr).into_owned();
        stderr.truncate(stderr.trim_end().len());
        return Err(ExecutionError::Runtime {
            exit_code: status.code(),
            stderr,
        });
    }
    Ok(stdout)
}

/// Read at most `limit + 1` bytes, so callers can tell an overflow apart.
async fn read_capped<R: AsyncRead + Unpin>(reader: R, limit: usize) -> ExecutionResult<Vec<u8>> {
    let mut buf = Vec::new();
    reader.take(limit as u64 + 1).read_to_end(&mut buf).await?;
    Ok(buf)
}

/// Keep the head of stderr and discard the rest, so a chatty child never
/// blocks on a full pipe.
async fn read_stderr<R: AsyncRead + Unpin>(mut reader: R) -> ExecutionResult<Vec<u8>> {
    let mut buf = Vec::new();
    (&mut reader)
        .take(STDERR_LIMIT as u64)
        .read_to_end(&mut buf)
        .await?;
    tokio::io::copy(&mut reader, &mut tokio::io::sink()).await?;
    Ok(buf)
}

/// Decode the last sentinel line of `stdout` into the collected values.
pub fn parse_result(stdout: &[u8]) -> ExecutionResult<Vec<Value>> {
    let text = String::from_utf8_lossy(stdout);
    let payload = text
        .lines()
        .rev()
        .find_map(|line| line.strip_prefix(RESULT_SENTINEL))
        .ok_or_else(|| ExecutionError::MalformedOutput("no result line in runtime output".to_string()))?;

    match serde_json::from_str::<Value>(payload.trim()) {
        Ok(Value::Array(values)) => Ok(values),
        Ok(Value::Null) => Ok(Vec::new()),
        Ok(other) => Err(ExecutionError::MalformedOutput(format!(
            "expected a list of values, got {other}"
        ))),
        Err(e) => Err(ExecutionError::MalformedOutput(e.to_string())),
    }
}
