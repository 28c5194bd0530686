//! Python snippets: `def` helpers plus an `if __name__ == "__main__":` guard.
//!
//! The guard is not a declaration, so nothing is rewritten to return the
//! collector: a module-level `answers = []` is declared right above the guard
//! and the runtime dumps it after the module has run.

use std::path::Path;

use once_cell::sync::Lazy;
use serde_json::Value;

use crate::execution::error::{ExecutionError, ExecutionResult};
use crate::execution::subprocess::{
    RuntimePrograms, StagedRun, RESULT_SENTINEL, VALUE_LIMIT_MARKER,
};
use crate::expr::split_arguments;
use crate::execution::Bindings;
use crate::language::Language;
use crate::markers::{
    BlockEnd, BoundaryMarker, CollectorSyntax, CommentSyntax, EntryRewrite, MarkerRole,
    MarkerTable,
};
use crate::transform::InstrumentedScript;

pub static MARKERS: Lazy<MarkerTable> = Lazy::new(|| MarkerTable {
    language: Language::Python,
    function_start: BoundaryMarker::new(
        MarkerRole::FunctionStart,
        r"^\s*(?:async\s+)?def\s+(?P<name>\w+)\s*\(",
    )
    .expect("python function-start pattern"),
    entry_point: BoundaryMarker::new(
        MarkerRole::EntryPoint,
        r#"^\s*if\s+__name__\s*==\s*(?:"__main__"|'__main__')\s*:\s*(?:#.*)?$"#,
    )
    .expect("python entry-point pattern"),
    block_end: BlockEnd::Dedent,
    output_calls: &["print("],
    comments: CommentSyntax {
        line: "#",
        block: None,
    },
    collector: CollectorSyntax {
        entry: EntryRewrite::DeclareBefore {
            declaration: "{collector} = {init}",
        },
        initializer: "[]",
        append: "{collector}.append({expr})",
        value: collected_value,
        return_stmt: None,
        entry_symbol: "answers",
    },
});

/// Keyword arguments of `print` that shape the output but print nothing.
const PRINT_KEYWORDS: [&str; 4] = ["sep", "end", "file", "flush"];

/// One value per `print` call. A lone positional argument is kept as is;
/// several are rendered to the text `print` would write, honouring `sep`.
fn collected_value(args: &str) -> String {
    let mut sep = None;
    let mut positional = Vec::new();
    for arg in split_arguments(args) {
        match print_keyword(arg) {
            Some(("sep", value)) => sep = Some(value),
            Some(_) => {}
            None => positional.push(arg),
        }
    }
    match positional.as_slice() {
        [] => "''".to_string(),
        [single] if !single.starts_with('*') => single.to_string(),
        many => format!(
            "({}).join(map(str, ({},)))",
            sep.unwrap_or("' '"),
            many.join(", ")
        ),
    }
}

/// `name=value` for one of [`PRINT_KEYWORDS`].
fn print_keyword(arg: &str) -> Option<(&str, &str)> {
    let (name, value) = arg.split_once('=')?;
    let name = name.trim();
    if value.starts_with('=') || !PRINT_KEYWORDS.contains(&name) {
        return None;
    }
    Some((name, value.trim()))
}

/// Preamble defining a list type that refuses to grow past `max_values`.
fn capped_collector_class(max_values: usize) -> String {
    format!(
        "class _SnipcheckAnswers(list):\n    def append(self, value):\n        if len(self) >= {max_values}:\n            raise RuntimeError({marker:?})\n        super().append(value)\n",
        marker = VALUE_LIMIT_MARKER,
    )
}

/// Write `script.py`: bindings decoded from JSON, the script, then a dump of
/// the collector binding.
pub(crate) fn stage(
    script: &InstrumentedScript,
    bindings: &Bindings,
    dir: &Path,
    programs: &RuntimePrograms,
    max_values: usize,
) -> ExecutionResult<StagedRun> {
    let mut source = String::from("import json as _snipcheck_json\n");
    for (name, value) in bindings {
        // A JSON string literal is also a valid Python string literal.
        let encoded = serde_json::to_string(&value.to_string())
            .map_err(|e| ExecutionError::InvalidScript(e.to_string()))?;
        source.push_str(&format!("{name} = _snipcheck_json.loads({encoded})\n"));
    }
    source.push_str(&capped_collector_class(max_values));
    source.push_str(&script.with_collector_init("_SnipcheckAnswers()"));
    source.push_str(&format!(
        "print({sentinel:?} + _snipcheck_json.dumps({entry}, default=repr))\n",
        sentinel = RESULT_SENTINEL,
        entry = script.entry_symbol,
    ));

    let file = dir.join("script.py");
    std::fs::write(&file, source)?;
    Ok(StagedRun {
        steps: vec![vec![
            programs.python.clone(),
            file.to_string_lossy().into_owned(),
        ]],
    })
}

/// Python-only literal forms: `True`/`False`/`None`, single-quoted strings,
/// and list or tuple literals that use them.
pub(crate) fn normalize_literal(expr: &str) -> Option<Value> {
    match expr {
        "True" => return Some(Value::Bool(true)),
        "False" => return Some(Value::Bool(false)),
        "None" => return Some(Value::Null),
        _ => {}
    }
    if let Some(s) = super::single_quoted(expr) {
        return Some(Value::String(s));
    }
    if expr.starts_with('[') && expr.ends_with(']') {
        return serde_json::from_str(&pythonic(expr)).ok();
    }
    let inner = expr.strip_prefix('(')?.strip_suffix(')')?;
    if !inner.contains(',') {
        return None;
    }
    serde_json::from_str(&format!("[{}]", pythonic(inner).trim_end_matches([',', ' ']))).ok()
}

/// Rewrite a Python container literal as JSON text: `True`/`False`/`None`
/// tokens become JSON keywords and `'...'` strings become `"..."` strings.
/// Text inside string literals is never touched.
fn pythonic(literal: &str) -> String {
    let mut out = String::with_capacity(literal.len());
    let mut word = String::new();
    let mut chars = literal.chars();

    while let Some(c) = chars.next() {
        if c.is_alphanumeric() || c == '_' {
            word.push(c);
            continue;
        }
        flush_word(&mut out, &mut word);
        match c {
            '"' => copy_double_quoted(&mut out, &mut chars),
            '\'' => copy_single_quoted(&mut out, &mut chars),
            other => out.push(other),
        }
    }
    flush_word(&mut out, &mut word);
    out
}

fn flush_word(out: &mut String, word: &mut String) {
    out.push_str(match word.as_str() {
        "True" => "true",
        "False" => "false",
        "None" => "null",
        other => other,
    });
    word.clear();
}

fn copy_double_quoted(out: &mut String, chars: &mut std::str::Chars<'_>) {
    out.push('"');
    while let Some(c) = chars.next() {
        out.push(c);
        match c {
            '\\' => {
                if let Some(next) = chars.next() {
                    out.push(next);
                }
            }
            '"' => return,
            _ => {}
        }
    }
}

fn copy_single_quoted(out: &mut String, chars: &mut std::str::Chars<'_>) {
    out.push('"');
    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some('\'') => out.push('\''),
                Some(next) => {
                    out.push('\\');
                    out.push(next);
                }
                None => out.push('\\'),
            },
            '"' => out.push_str("\\\""),
            '\'' => {
                out.push('"');
                return;
            }
            other => out.push(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lines::Snippet;
    use crate::transform::transform;

    #[test]
    fn test_entry_point_accepts_both_quote_styles() {
        let marker = &MARKERS.entry_point;
        assert!(marker.matches("if __name__ == \"__main__\":"));
        assert!(marker.matches("if __name__=='__main__':  # run"));
        assert!(!marker.matches("# if __name__ == '__main__':"));
    }

    #[test]
    fn test_entry_rewrite_declares_collector_before_guard() {
        assert_eq!(
            MARKERS.rewrite_entry("if __name__ == '__main__':"),
            vec![
                "answers = []".to_string(),
                "if __name__ == '__main__':".to_string()
            ]
        );
    }

    #[test]
    fn test_stage_decodes_bindings_and_dumps_collector() {
        let snippet = Snippet::new(
            "py-1",
            Language::Python,
            "if __name__ == \"__main__\":\n    print(limit)\n",
        );
        let script = transform(&snippet).unwrap();
        let mut bindings = Bindings::new();
        bindings.insert("limit".to_string(), serde_json::json!({"n": true}));
        let dir = tempfile::tempdir().unwrap();
        stage(&script, &bindings, dir.path(), &RuntimePrograms::default(), 7).unwrap();
        let source = std::fs::read_to_string(dir.path().join("script.py")).unwrap();
        assert!(source.contains(r#"limit = _snipcheck_json.loads("{\"n\":true}")"#));
        assert!(source.contains("answers.append(limit)"));
        assert!(source.trim_end().ends_with("default=repr))"));
        assert!(source.contains("if len(self) >= 7:"));
        assert!(source.contains("\nanswers = _SnipcheckAnswers()\n"));
    }

    #[test]
    fn test_each_print_appends_one_value() {
        assert_eq!(MARKERS.render_append("", "f(1)"), "answers.append(f(1))");
        assert_eq!(
            MARKERS.render_append("", "'a', 1"),
            "answers.append((' ').join(map(str, ('a', 1,))))"
        );
        assert_eq!(MARKERS.render_append("", "x, end=''"), "answers.append(x)");
        assert_eq!(
            MARKERS.render_append("", "a, b, sep='-', flush=True"),
            "answers.append(('-').join(map(str, (a, b,))))"
        );
        assert_eq!(MARKERS.render_append("", "a == b"), "answers.append(a == b)");
        assert_eq!(MARKERS.render_append("", ""), "answers.append('')");
        assert_eq!(
            MARKERS.render_append("", "*xs"),
            "answers.append((' ').join(map(str, (*xs,))))"
        );
    }

    #[test]
    fn test_normalize_python_literals() {
        assert_eq!(normalize_literal("True"), Some(Value::Bool(true)));
        assert_eq!(normalize_literal("None"), Some(Value::Null));
        assert_eq!(normalize_literal("'a'"), Some(Value::String("a".into())));
        assert_eq!(
            normalize_literal("(1, True)"),
            Some(serde_json::json!([1, true]))
        );
        assert_eq!(normalize_literal("(2)"), None);
        assert_eq!(
            normalize_literal("[False, None]"),
            Some(serde_json::json!([false, null]))
        );
        assert_eq!(normalize_literal("len(x)"), None);
    }

    #[test]
    fn test_keywords_inside_strings_are_kept() {
        assert_eq!(
            normalize_literal(r#"["None left", "Trueman", True]"#),
            Some(serde_json::json!(["None left", "Trueman", true]))
        );
        assert_eq!(
            normalize_literal("['False start', None, 'it\\'s', 'say \"hi\"']"),
            Some(serde_json::json!(["False start", null, "it's", "say \"hi\""]))
        );
        assert_eq!(normalize_literal("(NoneType, 1)"), None);
        assert_eq!(normalize_literal("('a', Falsey)"), None);
    }
}
