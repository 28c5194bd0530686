//! Driver: tie extraction, transformation, execution and comparison together.
//!
//! Extraction and transformation always finish before anything runs, so a
//! malformed snippet is reported as a [`SnippetError`] and never reaches an
//! interpreter.

use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::Instrument;

use crate::compare::{compare_answers, parse_answer_literal, AnswerMismatch, Comparison};
use crate::config::ConfigError;
use crate::error::SnippetError;
use crate::execution::{
    execute_with_limits, AdapterRegistry, Bindings, ExecutionAdapter, ExecutionConfig,
    ExecutionError,
};
use crate::extract::expected_answers;
use crate::language::Language;
use crate::lines::Snippet;
use crate::obs;
use crate::transform::{transform_with, TracingObserver};

/// A challenge file: reference source plus its answer key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Challenge {
    pub id: String,
    pub language: Language,
    pub source: String,
    /// Expected values as source literals (`true`, `3`, `'x'`), one per
    /// output call. Required for verification.
    #[serde(default)]
    pub answers: Vec<String>,
    #[serde(default)]
    pub bindings: Bindings,
}

impl Challenge {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    pub fn snippet(&self) -> Snippet {
        Snippet::new(&self.id, self.language, &self.source)
    }

    /// The answer key. Output-call arguments are expressions, not values,
    /// so a challenge without listed answers has no key.
    pub fn answer_key(&self) -> Result<&[String], SnippetError> {
        if self.answers.is_empty() {
            return Err(SnippetError::MissingAnswerKey {
                snippet: self.id.clone(),
            });
        }
        Ok(&self.answers)
    }
}

/// Outcome of a successful verification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationReport {
    pub snippet_id: String,
    pub language: Language,
    pub digest: String,
    pub expected: Vec<Value>,
    pub actual: Vec<Value>,
}

#[derive(Debug, thiserror::Error)]
pub enum VerifyError {
    #[error(transparent)]
    Snippet(#[from] SnippetError),

    #[error("snippet {snippet}: execution failed: {source}")]
    Execution {
        snippet: String,
        source: ExecutionError,
    },

    #[error("snippet {snippet}: {mismatch}")]
    AnswerMismatch {
        snippet: String,
        mismatch: AnswerMismatch,
    },
}

impl VerifyError {
    /// True for problems the challenge author has to fix in the snippet.
    pub fn is_configuration_error(&self) -> bool {
        matches!(self, VerifyError::Snippet(_))
    }
}

/// The argument text of every output call in the entry block, for authors
/// writing an answer key. These are expressions; run the snippet to get values.
pub fn derive_answers(snippet: &Snippet) -> Result<Vec<String>, SnippetError> {
    expected_answers(snippet)
}

/// Transform `snippet`, then run it once.
pub async fn evaluate(
    snippet: &Snippet,
    adapter: &dyn ExecutionAdapter,
    bindings: &Bindings,
    config: &ExecutionConfig,
) -> Result<Vec<Value>, VerifyError> {
    let script = transform_with(snippet, &TracingObserver)?;
    execute_with_limits(adapter, &script, bindings, config)
        .await
        .map_err(|source| VerifyError::Execution {
            snippet: snippet.id.clone(),
            source,
        })
}

/// Run a challenge's source and compare what it produces against its key.
pub async fn verify(
    challenge: &Challenge,
    adapter: &dyn ExecutionAdapter,
    config: &ExecutionConfig,
) -> Result<VerificationReport, VerifyError> {
    let snippet = challenge.snippet();
    let span = obs::snippet_span(&snippet.id, snippet.language);

    let expected: Vec<Value> = challenge
        .answer_key()?
        .iter()
        .map(|literal| parse_answer_literal(literal, challenge.language))
        .collect();
    let actual = evaluate(&snippet, adapter, &challenge.bindings, config)
        .instrument(span)
        .await?;

    let comparison = compare_answers(&expected, &actual);
    obs::emit_verification(&snippet.id, expected.len(), actual.len(), comparison.is_equal());
    match comparison {
        Comparison::Equal => Ok(VerificationReport {
            snippet_id: snippet.id.clone(),
            language: snippet.language,
            digest: snippet.digest(),
            expected,
            actual,
        }),
        Comparison::Mismatch(mismatch) => Err(VerifyError::AnswerMismatch {
            snippet: snippet.id,
            mismatch,
        }),
    }
}

/// Execute reference snippets concurrently and return their produced values
/// in input order. Each snippet succeeds or fails on its own.
pub async fn regenerate_answers(
    snippets: Vec<Snippet>,
    registry: &AdapterRegistry,
    config: &ExecutionConfig,
    max_concurrent: usize,
) -> Vec<Result<Vec<Value>, VerifyError>> {
    let sem = Arc::new(Semaphore::new(max_concurrent.max(1)));
    let ids: Vec<String> = snippets.iter().map(|s| s.id.clone()).collect();
    let mut join_set = JoinSet::new();

    for (idx, snippet) in snippets.into_iter().enumerate() {
        let adapter = registry.adapter_for(snippet.language);
        let config = config.clone();
        let sem = Arc::clone(&sem);
        let span = obs::snippet_span(&snippet.id, snippet.language);
        join_set.spawn(
            async move {
                let _permit = sem.acquire_owned().await.ok();
                let result = match adapter {
                    Ok(adapter) => {
                        evaluate(&snippet, adapter.as_ref(), &Bindings::new(), &config).await
                    }
                    Err(source) => Err(VerifyError::Execution {
                        snippet: snippet.id.clone(),
                        source,
                    }),
                };
                (idx, result)
            }
            .instrument(span),
        );
    }

    let mut slots: Vec<Option<Result<Vec<Value>, VerifyError>>> =
        std::iter::repeat_with(|| None).take(ids.len()).collect();
    while let Some(joined) = join_set.join_next().await {
        match joined {
            Ok((idx, result)) => slots[idx] = Some(result),
            Err(e) => tracing::warn!(error = %e, "regeneration task join error"),
        }
    }

    slots
        .into_iter()
        .zip(ids)
        .map(|(slot, snippet)| {
            slot.unwrap_or_else(|| {
                Err(VerifyError::Execution {
                    snippet,
                    source: ExecutionError::Io(std::io::Error::other("task did not complete")),
                })
            })
        })
        .collect()
}
