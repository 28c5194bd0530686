//! Per-language marker tables.
//!
//! A dialect is described entirely as data: boundary patterns with their role,
//! the output-call prefixes that feed the answer collector, comment syntax, and
//! the templates used to instrument the entry point. The locator, extractor and
//! transformer are written once against [`MarkerTable`]; adding a language
//! means adding a table under [`crate::languages`].

use std::fmt;

use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};

use crate::expr::balanced_argument;
use crate::language::Language;
use crate::lines::{indent_width, leading_whitespace};

/// Name of the collector every instrumented script appends into.
pub const COLLECTOR: &str = "answers";

/// What a boundary line means structurally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkerRole {
    FunctionStart,
    EntryPoint,
    BlockEnd,
}

impl fmt::Display for MarkerRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MarkerRole::FunctionStart => "function-start",
            MarkerRole::EntryPoint => "entry-point",
            MarkerRole::BlockEnd => "block-end",
        })
    }
}

/// A line pattern with a structural role.
///
/// When the pattern has a `name` capture group, declarations whose name is in
/// `excluded_names` do not match (e.g. `main` is never a helper function).
#[derive(Debug, Clone)]
pub struct BoundaryMarker {
    role: MarkerRole,
    pattern: Regex,
    excluded_names: &'static [&'static str],
}

impl BoundaryMarker {
    pub fn new(role: MarkerRole, pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            role,
            pattern: Regex::new(pattern)?,
            excluded_names: &[],
        })
    }

    pub fn excluding(mut self, names: &'static [&'static str]) -> Self {
        self.excluded_names = names;
        self
    }

    pub fn role(&self) -> MarkerRole {
        self.role
    }

    pub fn captures<'a>(&self, line: &'a str) -> Option<Captures<'a>> {
        let caps = self.pattern.captures(line)?;
        let excluded = caps
            .name("name")
            .is_some_and(|name| self.excluded_names.contains(&name.as_str()));
        (!excluded).then_some(caps)
    }

    pub fn matches(&self, line: &str) -> bool {
        self.captures(line).is_some()
    }
}

/// How the entry-point block is terminated.
#[derive(Debug, Clone)]
pub enum BlockEnd {
    /// A line matching the marker at exactly the entry line's indentation.
    AlignedClosingLine(BoundaryMarker),
    /// The first code line indented at or left of the entry line; end of
    /// input also closes the block.
    Dedent,
}

/// Comment delimiters of a dialect.
#[derive(Debug, Clone, Copy)]
pub struct CommentSyntax {
    pub line: &'static str,
    pub block: Option<(&'static str, &'static str)>,
}

/// Tracks whether a line sits inside a comment while scanning in order.
///
/// A line is commentary when it starts inside a block comment, opens one, or
/// is a line comment. A block comment opened after code (`x = 1; /* note`)
/// leaves that line as code and marks the following lines as commentary.
/// Code after a closing delimiter on the same line is not seen.
#[derive(Debug, Default, Clone)]
pub struct CommentTracker {
    in_block: bool,
}

impl CommentTracker {
    /// Feed the next line; returns `true` when the whole line is commentary.
    pub fn is_comment(&mut self, line: &str, syntax: &CommentSyntax) -> bool {
        let trimmed = line.trim_start();
        let Some((open, close)) = syntax.block else {
            return trimmed.starts_with(syntax.line);
        };
        if self.in_block {
            if let Some(at) = trimmed.find(close) {
                self.in_block = opens_block(&trimmed[at + close.len()..], syntax);
            }
            return true;
        }
        if let Some(rest) = trimmed.strip_prefix(open) {
            self.in_block = match rest.find(close) {
                Some(at) => opens_block(&rest[at + close.len()..], syntax),
                None => true,
            };
            return true;
        }
        if trimmed.starts_with(syntax.line) {
            return true;
        }
        self.in_block = opens_block(trimmed, syntax);
        false
    }
}

/// Whether `code` leaves a block comment open at its end. String literals
/// are skipped and a line comment ends the scan.
fn opens_block(code: &str, syntax: &CommentSyntax) -> bool {
    let Some((open, close)) = syntax.block else {
        return false;
    };
    let bytes = code.as_bytes();
    let mut quote: Option<u8> = None;
    let mut escaped = false;
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == q {
                quote = None;
            }
            i += 1;
            continue;
        }
        let rest = &code[i..];
        if rest.starts_with(syntax.line) {
            return false;
        }
        if rest.starts_with(open) {
            match rest[open.len()..].find(close) {
                Some(at) => i += open.len() + at + close.len(),
                None => return true,
            }
            continue;
        }
        if matches!(b, b'"' | b'\'' | b'`') {
            quote = Some(b);
        }
        i += 1;
    }
    false
}

/// How the entry-point line is instrumented.
#[derive(Debug, Clone)]
pub enum EntryRewrite {
    /// Rewrite the entry line in place. `replacement` uses regex `${group}`
    /// syntax; `{collector}` is substituted first.
    Substitute {
        pattern: Regex,
        replacement: &'static str,
    },
    /// Emit `declaration` on its own line, at the entry indentation, before
    /// the unchanged entry line.
    DeclareBefore { declaration: &'static str },
}

/// Collector instrumentation templates. `{collector}`, `{init}` and `{expr}`
/// are substituted in that order.
#[derive(Debug, Clone)]
pub struct CollectorSyntax {
    pub entry: EntryRewrite,
    /// Expression creating the empty collector, as written in the entry
    /// rewrite. Runtimes may swap it for a capped collector.
    pub initializer: &'static str,
    pub append: &'static str,
    /// Turns an output call's argument text into the one expression appended
    /// for that call, whatever the number of arguments.
    pub value: fn(&str) -> String,
    /// Emitted before the block's closing line; `None` for dialects whose
    /// runtime reads the collector binding directly.
    pub return_stmt: Option<&'static str>,
    /// Symbol the runtime evaluates to obtain the collector.
    pub entry_symbol: &'static str,
}

/// An output call recognised on a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputCallSite {
    pub prefix: &'static str,
    /// Byte index of the call's opening parenthesis within the line.
    pub open_paren: usize,
}

impl OutputCallSite {
    /// The argument text between the call's parenthesis and the one that
    /// balances it, trimmed. `None` when the call never closes on this line.
    pub fn argument<'a>(&self, line: &'a str) -> Option<&'a str> {
        balanced_argument(line, self.open_paren).map(str::trim)
    }
}

/// Everything the line-oriented machinery needs to know about one dialect.
#[derive(Debug, Clone)]
pub struct MarkerTable {
    pub language: Language,
    pub function_start: BoundaryMarker,
    pub entry_point: BoundaryMarker,
    pub block_end: BlockEnd,
    /// Recognised output-call prefixes, each ending in `(`.
    pub output_calls: &'static [&'static str],
    pub comments: CommentSyntax,
    pub collector: CollectorSyntax,
}

impl MarkerTable {
    /// Match a recognised output call at the start of the trimmed line.
    pub fn output_call(&self, line: &str) -> Option<OutputCallSite> {
        let trimmed = line.trim_start();
        let offset = line.len() - trimmed.len();
        self.output_calls
            .iter()
            .copied()
            .find(|prefix| trimmed.starts_with(prefix))
            .map(|prefix| OutputCallSite {
                prefix,
                open_paren: offset + prefix.len() - 1,
            })
    }

    /// Whether `line` terminates an entry block whose header sits at
    /// `entry_indent`. Callers skip comment lines before asking.
    pub fn closes_block(&self, line: &str, entry_indent: usize) -> bool {
        match &self.block_end {
            BlockEnd::AlignedClosingLine(marker) => {
                marker.matches(line) && indent_width(line) == entry_indent
            }
            BlockEnd::Dedent => !line.trim().is_empty() && indent_width(line) <= entry_indent,
        }
    }

    pub fn runs_to_end_of_input(&self) -> bool {
        matches!(self.block_end, BlockEnd::Dedent)
    }

    /// Lines replacing the entry-point line.
    pub fn rewrite_entry(&self, line: &str) -> Vec<String> {
        match &self.collector.entry {
            EntryRewrite::Substitute {
                pattern,
                replacement,
            } => {
                let replacement = self.fill_declaration(replacement);
                vec![pattern.replace(line, replacement.as_str()).into_owned()]
            }
            EntryRewrite::DeclareBefore { declaration } => vec![
                format!(
                    "{}{}",
                    leading_whitespace(line),
                    self.fill_declaration(declaration)
                ),
                line.to_string(),
            ],
        }
    }

    fn fill_declaration(&self, template: &str) -> String {
        template
            .replace("{collector}", COLLECTOR)
            .replace("{init}", self.collector.initializer)
    }

    /// Append statement for one output call, given its argument text.
    pub fn render_append(&self, indent: &str, args: &str) -> String {
        let expr = (self.collector.value)(args);
        let stmt = self
            .collector
            .append
            .replace("{collector}", COLLECTOR)
            .replace("{expr}", &expr);
        format!("{indent}{stmt}")
    }

    pub fn render_return(&self, indent: &str) -> Option<String> {
        self.collector
            .return_stmt
            .map(|stmt| format!("{indent}{}", stmt.replace("{collector}", COLLECTOR)))
    }
}
