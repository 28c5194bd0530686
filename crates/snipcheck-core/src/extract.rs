//! Function extraction and output-argument extraction.
//!
//! Both run offline on the author's reference snippet: the function text is
//! embedded in a harness by the caller, and the output arguments become the
//! challenge's answer key.

use std::fmt;
use std::ops::Range;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SnippetError};
use crate::lines::{dedent, Snippet};
use crate::locate::{between, entry_block, find_first, find_last};
use crate::markers::{BoundaryMarker, CommentTracker, MarkerRole};

/// Indentation-normalised text of the callable(s) preceding the entry point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionText(String);

impl FunctionText {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for FunctionText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Slice out the function text: from the first function declaration up to the
/// line before the entry point, trailing blank lines dropped, re-indented to
/// column zero.
pub fn extract_function(snippet: &Snippet) -> Result<FunctionText> {
    let table = snippet.language.markers();
    let lines = &snippet.lines;

    let entry =
        find_last(lines, &table.entry_point).ok_or_else(|| SnippetError::BoundaryNotFound {
            snippet: snippet.id.clone(),
            role: MarkerRole::EntryPoint,
        })?;
    let head = lines.slice(0..entry).unwrap_or_default();
    let start =
        find_first(&head, &table.function_start).ok_or_else(|| SnippetError::BoundaryNotFound {
            snippet: snippet.id.clone(),
            role: MarkerRole::FunctionStart,
        })?;

    let mut end = entry;
    while end > start && head.get(end - 1).is_some_and(|l| l.trim().is_empty()) {
        end -= 1;
    }

    Ok(FunctionText(dedent(&head.as_slice()[start..end])))
}

/// One output call captured from the source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputExpression {
    /// 0-based line index in the snippet.
    pub line: usize,
    /// The recognised call prefix, e.g. `console.log(`.
    pub prefix: String,
    /// The literal argument text.
    pub expression: String,
}

/// Output calls in the entry-point block, in source order.
pub fn output_expressions(snippet: &Snippet) -> Result<Vec<OutputExpression>> {
    let span = entry_block(snippet)?;
    collect_outputs(snippet, span.body())
}

/// Output calls strictly between an explicit start/end marker pair.
pub fn output_expressions_between(
    snippet: &Snippet,
    start: &BoundaryMarker,
    end: &BoundaryMarker,
) -> Result<Vec<OutputExpression>> {
    let range = between(&snippet.lines, start, end).ok_or_else(|| {
        let role = if find_first(&snippet.lines, start).is_none() {
            start.role()
        } else {
            end.role()
        };
        SnippetError::BoundaryNotFound {
            snippet: snippet.id.clone(),
            role,
        }
    })?;
    collect_outputs(snippet, range)
}

/// The answer key: argument text of every output call in the entry block.
pub fn expected_answers(snippet: &Snippet) -> Result<Vec<String>> {
    Ok(output_expressions(snippet)?
        .into_iter()
        .map(|o| o.expression)
        .collect())
}

fn collect_outputs(snippet: &Snippet, range: Range<usize>) -> Result<Vec<OutputExpression>> {
    let table = snippet.language.markers();
    let mut comments = CommentTracker::default();
    let mut found = Vec::new();

    for idx in range {
        let Some(line) = snippet.lines.get(idx) else {
            break;
        };
        if comments.is_comment(line, &table.comments) {
            continue;
        }
        let Some(call) = table.output_call(line) else {
            continue;
        };
        let expression = call
            .argument(line)
            .ok_or_else(|| SnippetError::UnbalancedExpression {
                snippet: snippet.id.clone(),
                line: idx,
            })?;
        found.push(OutputExpression {
            line: idx,
            prefix: call.prefix.to_string(),
            expression: expression.to_string(),
        });
    }
    Ok(found)
}
