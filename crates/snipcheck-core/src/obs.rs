//! Structured observability hooks for snippet lifecycle events.
//!
//! This module provides:
//! - Snippet-scoped tracing spans via the `SnippetSpan` RAII guard
//! - Emission functions for transform, execution and verification events
//!
//! Events are emitted at `info!` level (configurable via `SNIPCHECK_LOG`).
//! Per-line rewrite events are `debug!` so they only show up with `-v`.

use tracing::{debug, info, warn};

use crate::language::Language;
use crate::transform::RewriteKind;

/// RAII guard that enters a snippet-scoped tracing span.
///
/// # Example
///
/// ```ignore
/// let _span = SnippetSpan::enter("fizzbuzz", Language::Python);
/// // every event below carries snippet = "fizzbuzz"
/// ```
pub struct SnippetSpan {
    _span: tracing::span::EnteredSpan,
}

impl SnippetSpan {
    pub fn enter(snippet_id: &str, language: Language) -> Self {
        Self {
            _span: snippet_span(snippet_id, language).entered(),
        }
    }
}

/// The snippet-scoped span, for instrumenting futures.
pub fn snippet_span(snippet_id: &str, language: Language) -> tracing::Span {
    tracing::info_span!("snipcheck.snippet", snippet = %snippet_id, language = %language)
}

/// Emit event: snippet transformed into an instrumented script.
pub fn emit_transform_finished(
    snippet_id: &str,
    digest: &str,
    language: Language,
    lines_in: usize,
    lines_out: usize,
    appended_calls: usize,
) {
    info!(
        event = "transform.finished",
        snippet = %snippet_id,
        digest = %digest,
        language = %language,
        lines_in = lines_in,
        lines_out = lines_out,
        appended_calls = appended_calls,
    );
}

/// Emit event: one source line rewritten.
pub fn emit_line_rewritten(snippet_id: &str, line: usize, kind: RewriteKind, emitted: usize) {
    debug!(
        event = "transform.line_rewritten",
        snippet = %snippet_id,
        line = line,
        kind = ?kind,
        emitted = emitted,
    );
}

/// Emit event: instrumented script executed.
pub fn emit_execution_finished(snippet_id: &str, language: Language, duration_ms: u64, values: usize) {
    info!(
        event = "execution.finished",
        snippet = %snippet_id,
        language = %language,
        duration_ms = duration_ms,
        values = values,
    );
}

/// Emit event: execution failed (warning level).
pub fn emit_execution_failed(snippet_id: &str, language: Language, error: &dyn std::fmt::Display) {
    warn!(
        event = "execution.failed",
        snippet = %snippet_id,
        language = %language,
        error = %error,
    );
}

/// Emit event: answers compared against the key.
pub fn emit_verification(snippet_id: &str, expected: usize, actual: usize, passed: bool) {
    info!(
        event = "verification.finished",
        snippet = %snippet_id,
        expected = expected,
        actual = actual,
        passed = passed,
    );
}
