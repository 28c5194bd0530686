//! JavaScript snippets: helper functions plus a `function main()` entry point.

use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use crate::execution::error::ExecutionResult;
use crate::execution::subprocess::{
    RuntimePrograms, StagedRun, RESULT_SENTINEL, VALUE_LIMIT_MARKER,
};
use crate::expr::split_arguments;
use crate::execution::Bindings;
use crate::language::Language;
use crate::markers::{
    BlockEnd, BoundaryMarker, CollectorSyntax, CommentSyntax, EntryRewrite, MarkerRole,
    MarkerTable, COLLECTOR,
};
use crate::transform::InstrumentedScript;

pub static MARKERS: Lazy<MarkerTable> = Lazy::new(|| MarkerTable {
    language: Language::JavaScript,
    function_start: BoundaryMarker::new(
        MarkerRole::FunctionStart,
        r"^\s*(?:export\s+)?(?:async\s+function\*?|function\*?|const|let|var)\s+(?P<name>[\w$]+)\s*(?:\(|=\s*(?:async\s*)?(?:\([^)]*\)|[\w$]+)\s*=>)",
    )
    .expect("javascript function-start pattern")
    .excluding(&["main"]),
    entry_point: BoundaryMarker::new(
        MarkerRole::EntryPoint,
        r"^\s*(?:async\s+)?function\s+main\s*\(",
    )
    .expect("javascript entry-point pattern"),
    block_end: BlockEnd::AlignedClosingLine(
        BoundaryMarker::new(MarkerRole::BlockEnd, r"^\s*\}\s*;?\s*$")
            .expect("javascript block-end pattern"),
    ),
    output_calls: &["console.log("],
    comments: CommentSyntax {
        line: "//",
        block: Some(("/*", "*/")),
    },
    collector: CollectorSyntax {
        entry: EntryRewrite::Substitute {
            pattern: Regex::new(r"^(?P<indent>\s*)(?P<rest>.*)$")
                .expect("javascript entry rewrite pattern"),
            replacement: "${indent}const {collector} = {init}; ${rest}",
        },
        initializer: "[]",
        append: "{collector}.push({expr});",
        value: collected_value,
        return_stmt: Some("return {collector};"),
        entry_symbol: "main",
    },
});

/// One value per `console.log` call: a lone argument as is, several joined
/// with spaces the way they are printed.
fn collected_value(args: &str) -> String {
    match split_arguments(args).as_slice() {
        [] => "''".to_string(),
        [single] if !single.starts_with("...") => single.to_string(),
        many => format!("[{}].join(' ')", many.join(", ")),
    }
}

/// Array whose `push` throws once `max_values` values are held.
fn capped_collector(max_values: usize) -> String {
    format!(
        "Object.defineProperty([], 'push', {{ value: function (...items) {{ \
         if (this.length + items.length > {max_values}) {{ throw new Error({marker:?}); }} \
         return Array.prototype.push.apply(this, items); }} }})",
        marker = VALUE_LIMIT_MARKER,
    )
}

/// Write `script.js`: bindings as constants, the script, then a fresh call of
/// the entry point whose result is printed as JSON.
pub(crate) fn stage(
    script: &InstrumentedScript,
    bindings: &Bindings,
    dir: &Path,
    programs: &RuntimePrograms,
    max_values: usize,
) -> ExecutionResult<StagedRun> {
    let mut source = String::new();
    for (name, value) in bindings {
        source.push_str(&format!("const {name} = {value};\n"));
    }
    source.push_str(&script.with_collector_init(&capped_collector(max_values)));
    // A snippet may already call main() at top level; start from an empty
    // collector so only the launcher's call is observed.
    source.push_str(&format!(
        "{COLLECTOR}.length = 0;\nPromise.resolve({entry}()).then((result) => console.log({sentinel:?} + JSON.stringify(result)));\n",
        entry = script.entry_symbol,
        sentinel = RESULT_SENTINEL,
    ));

    let file = dir.join("script.js");
    std::fs::write(&file, source)?;
    Ok(StagedRun {
        steps: vec![vec![
            programs.node.clone(),
            file.to_string_lossy().into_owned(),
        ]],
    })
}

/// JavaScript-only literal forms: single-quoted strings and `undefined`.
pub(crate) fn normalize_literal(expr: &str) -> Option<Value> {
    if expr == "undefined" {
        return Some(Value::Null);
    }
    super::single_quoted(expr).map(Value::String)
}
