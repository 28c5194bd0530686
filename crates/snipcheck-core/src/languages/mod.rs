//! Dialect tables and runtime staging, one module per language.

pub mod java;
pub mod javascript;
pub mod python;

use std::path::Path;

use serde_json::Value;

use crate::execution::error::ExecutionResult;
use crate::execution::subprocess::{RuntimePrograms, StagedRun};
use crate::execution::Bindings;
use crate::language::Language;
use crate::transform::InstrumentedScript;

/// Write the runnable files for `script` into `dir` and return the commands
/// that execute them. The staged collector fails the run once it would hold
/// more than `max_values` values.
pub(crate) fn stage(
    script: &InstrumentedScript,
    bindings: &Bindings,
    dir: &Path,
    programs: &RuntimePrograms,
    max_values: usize,
) -> ExecutionResult<StagedRun> {
    match script.language {
        Language::Java => java::stage(script, bindings, dir, programs, max_values),
        Language::JavaScript => javascript::stage(script, bindings, dir, programs, max_values),
        Language::Python => python::stage(script, bindings, dir, programs, max_values),
    }
}

/// Literal forms specific to one dialect, tried before plain JSON.
pub(crate) fn normalize_literal(language: Language, expr: &str) -> Option<Value> {
    match language {
        Language::Java => java::normalize_literal(expr),
        Language::JavaScript => javascript::normalize_literal(expr),
        Language::Python => python::normalize_literal(expr),
    }
}

/// Contents of a `'...'` literal with the common escapes resolved.
pub(crate) fn single_quoted(expr: &str) -> Option<String> {
    let inner = expr.strip_prefix('\'')?.strip_suffix('\'')?;
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next()? {
            'n' => out.push('\n'),
            't' => out.push('\t'),
            other => out.push(other),
        }
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_quoted_unescapes() {
        assert_eq!(single_quoted(r"'it\'s'"), Some("it's".to_string()));
        assert_eq!(single_quoted(r"'a\nb'"), Some("a\nb".to_string()));
        assert_eq!(single_quoted("\"a\""), None);
        assert_eq!(single_quoted("'"), None);
    }
}
