//! Error taxonomy for snippet analysis and rewriting.
//!
//! Every variant names the offending snippet so content authors can find the
//! challenge to fix. Line indices are 0-based against the original snippet.

use crate::markers::MarkerRole;

/// Errors produced while locating, extracting, or rewriting a snippet.
///
/// All of these indicate a malformed challenge definition; none are retried.
#[derive(Debug, thiserror::Error)]
pub enum SnippetError {
    #[error("snippet {snippet}: {role} marker not found")]
    BoundaryNotFound { snippet: String, role: MarkerRole },

    #[error("snippet {snippet}: unrecognized return type `{token}` at line {line}")]
    UnrecognizedReturnType {
        snippet: String,
        token: String,
        line: usize,
    },

    #[error("snippet {snippet}: unbalanced parentheses in output call at line {line}")]
    UnbalancedExpression { snippet: String, line: usize },

    #[error("snippet {snippet}: entry-point block opened at line {line} is never closed")]
    UnterminatedBlock { snippet: String, line: usize },

    #[error("snippet {snippet}: challenge has no answer key")]
    MissingAnswerKey { snippet: String },

    #[error("unsupported language: {0}")]
    UnsupportedLanguage(String),
}

impl SnippetError {
    /// The snippet identity carried by this error, if any.
    pub fn snippet(&self) -> Option<&str> {
        match self {
            SnippetError::BoundaryNotFound { snippet, .. }
            | SnippetError::UnrecognizedReturnType { snippet, .. }
            | SnippetError::UnbalancedExpression { snippet, .. }
            | SnippetError::UnterminatedBlock { snippet, .. }
            | SnippetError::MissingAnswerKey { snippet } => Some(snippet),
            SnippetError::UnsupportedLanguage(_) => None,
        }
    }

    /// The 0-based line index the error refers to, where applicable.
    pub fn line(&self) -> Option<usize> {
        match self {
            SnippetError::UnrecognizedReturnType { line, .. }
            | SnippetError::UnbalancedExpression { line, .. }
            | SnippetError::UnterminatedBlock { line, .. } => Some(*line),
            SnippetError::BoundaryNotFound { .. }
            | SnippetError::MissingAnswerKey { .. }
            | SnippetError::UnsupportedLanguage(_) => None,
        }
    }
}

/// Result type for snippet operations.
pub type Result<T> = std::result::Result<T, SnippetError>;
