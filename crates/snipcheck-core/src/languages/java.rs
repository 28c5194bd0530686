//! Java snippets: a class holding static helpers and a `main` entry point.
//!
//! The runtime compiles the instrumented class next to a small launcher class
//! that calls the rewritten `main`, serialises the returned collector to JSON
//! and prints it behind [`RESULT_SENTINEL`].

use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use tracing::warn;

use crate::execution::error::{ExecutionError, ExecutionResult};
use crate::execution::subprocess::{
    RuntimePrograms, StagedRun, RESULT_SENTINEL, VALUE_LIMIT_MARKER,
};
use crate::execution::Bindings;
use crate::language::Language;
use crate::markers::{
    BlockEnd, BoundaryMarker, CollectorSyntax, CommentSyntax, EntryRewrite, MarkerRole,
    MarkerTable,
};
use crate::transform::InstrumentedScript;

const LAUNCHER_CLASS: &str = "SnipcheckLauncher";

pub static MARKERS: Lazy<MarkerTable> = Lazy::new(|| MarkerTable {
    language: Language::Java,
    function_start: BoundaryMarker::new(
        MarkerRole::FunctionStart,
        r"^\s*(?:(?:public|private|protected|final|synchronized)\s+)*static\s+(?:(?:final|synchronized)\s+)*(?P<type>[\w.]+(?:\s*<[^()]*>)?(?:\s*\[\])*)\s+(?P<name>\w+)\s*\(",
    )
    .expect("java function-start pattern")
    .excluding(&["main"]),
    entry_point: BoundaryMarker::new(
        MarkerRole::EntryPoint,
        r"^\s*public\s+static\s+void\s+main\s*\(",
    )
    .expect("java entry-point pattern"),
    block_end: BlockEnd::AlignedClosingLine(
        BoundaryMarker::new(MarkerRole::BlockEnd, r"^\s*\}\s*$").expect("java block-end pattern"),
    ),
    output_calls: &["System.out.println(", "printArray(", "printList("],
    comments: CommentSyntax {
        line: "//",
        block: Some(("/*", "*/")),
    },
    collector: CollectorSyntax {
        entry: EntryRewrite::Substitute {
            pattern: Regex::new(r"^(?P<indent>\s*)(?P<head>public\s+static\s+)void(?P<rest>\s+main\s*\(.*)$")
                .expect("java entry rewrite pattern"),
            replacement: "${indent}static java.util.List<Object> {collector} = {init}; ${head}java.util.List<Object>${rest}",
        },
        initializer: "new java.util.ArrayList<>()",
        append: "{collector}.add({expr});",
        value: collected_value,
        return_stmt: Some("return {collector};"),
        entry_symbol: "main",
    },
});

static CLASS_DECL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(?:public\s+)?(?:final\s+)?class\s+(?P<name>\w+)")
        .expect("java class declaration pattern")
});

static CHAR_LITERAL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^'(?P<c>\\.|[^'\\])'$").expect("java char literal pattern")
});

const LAUNCHER_SOURCE: &str = r#"import java.lang.reflect.Array;
import java.util.Map;

public class SnipcheckLauncher {
    public static void main(String[] args) throws Exception {
        Object answers = __CLASS__.main(args);
        System.out.println("__SENTINEL__" + toJson(answers));
    }

    static String toJson(Object value) {
        if (value == null) {
            return "null";
        }
        if (value instanceof Boolean || value instanceof Integer || value instanceof Long
                || value instanceof Short || value instanceof Byte) {
            return value.toString();
        }
        if (value instanceof Double || value instanceof Float) {
            double d = ((Number) value).doubleValue();
            if (Double.isNaN(d) || Double.isInfinite(d)) {
                return quote(value.toString());
            }
            return Double.toString(d);
        }
        if (value instanceof Character || value instanceof CharSequence) {
            return quote(value.toString());
        }
        StringBuilder sb = new StringBuilder();
        if (value.getClass().isArray()) {
            sb.append('[');
            for (int i = 0; i < Array.getLength(value); i++) {
                if (i > 0) sb.append(',');
                sb.append(toJson(Array.get(value, i)));
            }
            return sb.append(']').toString();
        }
        if (value instanceof Iterable) {
            sb.append('[');
            boolean first = true;
            for (Object item : (Iterable<?>) value) {
                if (!first) sb.append(',');
                sb.append(toJson(item));
                first = false;
            }
            return sb.append(']').toString();
        }
        if (value instanceof Map) {
            sb.append('{');
            boolean first = true;
            for (Map.Entry<?, ?> e : ((Map<?, ?>) value).entrySet()) {
                if (!first) sb.append(',');
                sb.append(quote(String.valueOf(e.getKey()))).append(':').append(toJson(e.getValue()));
                first = false;
            }
            return sb.append('}').toString();
        }
        return quote(value.toString());
    }

    static String quote(String s) {
        StringBuilder sb = new StringBuilder("\"");
        for (char c : s.toCharArray()) {
            switch (c) {
                case '"': sb.append("\\\""); break;
                case '\\': sb.append("\\\\"); break;
                case '\n': sb.append("\\n"); break;
                case '\r': sb.append("\\r"); break;
                case '\t': sb.append("\\t"); break;
                default:
                    if (c < 0x20) sb.append(String.format("\\u%04x", (int) c));
                    else sb.append(c);
            }
        }
        return sb.append('"').toString();
    }
}
"#;

/// `println()` collects an empty line; every recognised call takes at most
/// one argument, so the text is kept whole.
fn collected_value(args: &str) -> String {
    let args = args.trim();
    if args.is_empty() {
        "\"\"".to_string()
    } else {
        args.to_string()
    }
}

/// A list that refuses to grow past `max_values`.
fn capped_collector(max_values: usize) -> String {
    format!(
        "new java.util.ArrayList<Object>() {{ @Override public boolean add(Object value) {{ \
         if (size() >= {max_values}) {{ throw new IllegalStateException(\"{VALUE_LIMIT_MARKER}\"); }} \
         return super.add(value); }} }}"
    )
}

/// Name of the first top-level class declared by the script.
fn class_name(script: &InstrumentedScript) -> Option<&str> {
    script
        .text
        .lines()
        .find_map(|line| CLASS_DECL.captures(line))
        .and_then(|caps| caps.name("name"))
        .map(|m| m.as_str())
}

/// Write the instrumented class and launcher, then compile and run them.
pub(crate) fn stage(
    script: &InstrumentedScript,
    bindings: &Bindings,
    dir: &Path,
    programs: &RuntimePrograms,
    max_values: usize,
) -> ExecutionResult<StagedRun> {
    if !bindings.is_empty() {
        warn!(
            snippet = %script.snippet_id,
            count = bindings.len(),
            "java runtime ignores bindings"
        );
    }

    let class = class_name(script).ok_or_else(|| {
        ExecutionError::InvalidScript(format!(
            "snippet {} declares no top-level class",
            script.snippet_id
        ))
    })?;

    let source_file = dir.join(format!("{class}.java"));
    let launcher_file = dir.join(format!("{LAUNCHER_CLASS}.java"));
    std::fs::write(
        &source_file,
        script.with_collector_init(&capped_collector(max_values)),
    )?;
    std::fs::write(
        &launcher_file,
        LAUNCHER_SOURCE
            .replace("__CLASS__", class)
            .replace("__SENTINEL__", RESULT_SENTINEL),
    )?;

    let out_dir = dir.join("classes");
    let out = out_dir.to_string_lossy().into_owned();
    Ok(StagedRun {
        steps: vec![
            vec![
                programs.javac.clone(),
                "-d".to_string(),
                out.clone(),
                source_file.to_string_lossy().into_owned(),
                launcher_file.to_string_lossy().into_owned(),
            ],
            vec![
                programs.java.clone(),
                "-cp".to_string(),
                out,
                LAUNCHER_CLASS.to_string(),
            ],
        ],
    })
}

/// Java-only literal forms: `'c'` char literals and `L`/`f`/`d` suffixes.
pub(crate) fn normalize_literal(expr: &str) -> Option<Value> {
    if let Some(caps) = CHAR_LITERAL.captures(expr) {
        let c = &caps["c"];
        let text = match c {
            r"\n" => "\n",
            r"\t" => "\t",
            r"\'" => "'",
            r"\\" => "\\",
            other => other,
        };
        return Some(Value::String(text.to_string()));
    }
    let unsuffixed = expr.strip_suffix(['L', 'l', 'f', 'F', 'd', 'D'])?;
    serde_json::from_str::<serde_json::Number>(unsuffixed)
        .ok()
        .map(Value::Number)
}
