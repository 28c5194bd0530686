//! Boundary locator: line indices of structurally significant lines.
//!
//! Lookups report "not found" as `None`; only [`entry_block`], which callers
//! need as a hard requirement, turns absence into a [`SnippetError`].

use std::ops::Range;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SnippetError};
use crate::lines::{indent_width, SourceLines, Snippet};
use crate::markers::{BoundaryMarker, CommentTracker, MarkerRole};

/// Index of the first line matching `marker`.
pub fn find_first(lines: &SourceLines, marker: &BoundaryMarker) -> Option<usize> {
    lines.iter().position(|line| marker.matches(line))
}

/// Index of the last line matching `marker`.
pub fn find_last(lines: &SourceLines, marker: &BoundaryMarker) -> Option<usize> {
    lines.iter().rposition(|line| marker.matches(line))
}

/// Lines strictly between the first `start` match and the first `end` match
/// after it. Both marker lines are excluded.
pub fn between(
    lines: &SourceLines,
    start: &BoundaryMarker,
    end: &BoundaryMarker,
) -> Option<Range<usize>> {
    let open = find_first(lines, start)?;
    let close = lines
        .iter()
        .skip(open + 1)
        .position(|line| end.matches(line))?
        + open
        + 1;
    Some(open + 1..close)
}

/// Location of the entry-point block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockSpan {
    /// Index of the entry-point line.
    pub start: usize,
    /// Index of the line that closes the block, or the line count when the
    /// block runs to end of input.
    pub end: usize,
    /// `false` when the block was closed by end of input.
    pub closed_by_marker: bool,
}

impl BlockSpan {
    /// The block body, excluding the entry and closing lines.
    pub fn body(&self) -> Range<usize> {
        self.start + 1..self.end
    }
}

/// Locate the entry-point block of `snippet`.
///
/// When several lines look like an entry point the last one wins.
pub fn entry_block(snippet: &Snippet) -> Result<BlockSpan> {
    let table = snippet.language.markers();
    let lines = &snippet.lines;

    let start =
        find_last(lines, &table.entry_point).ok_or_else(|| SnippetError::BoundaryNotFound {
            snippet: snippet.id.clone(),
            role: MarkerRole::EntryPoint,
        })?;
    let entry_indent = lines.get(start).map(indent_width).unwrap_or(0);

    let mut comments = CommentTracker::default();
    for (idx, line) in lines.iter().enumerate().skip(start + 1) {
        if comments.is_comment(line, &table.comments) {
            continue;
        }
        if table.closes_block(line, entry_indent) {
            return Ok(BlockSpan {
                start,
                end: idx,
                closed_by_marker: true,
            });
        }
    }

    if table.runs_to_end_of_input() {
        Ok(BlockSpan {
            start,
            end: lines.len(),
            closed_by_marker: false,
        })
    } else {
        Err(SnippetError::UnterminatedBlock {
            snippet: snippet.id.clone(),
            line: start,
        })
    }
}
