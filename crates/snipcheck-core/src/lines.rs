//! Line-addressed snippet text.

use std::ops::Range;

use sha2::{Digest, Sha256};

use crate::language::Language;

/// Columns a tab counts for when comparing indentation.
const TAB_WIDTH: usize = 4;

/// An ordered sequence of source lines. Line order is the only addressing
/// mechanism; lines are sliced or filtered into new sequences, never reordered.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceLines(Vec<String>);

impl SourceLines {
    /// Split text into lines. `\r\n` endings are normalised and a trailing
    /// newline does not produce an empty final line.
    pub fn from_text(text: &str) -> Self {
        Self(text.lines().map(str::to_string).collect())
    }

    pub fn from_lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(lines.into_iter().map(Into::into).collect())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.0.get(index).map(String::as_str)
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &str> + ExactSizeIterator {
        self.0.iter().map(String::as_str)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    /// Copy a sub-range into a new sequence. Returns `None` when the range
    /// falls outside the snippet.
    pub fn slice(&self, range: Range<usize>) -> Option<SourceLines> {
        self.0.get(range).map(|lines| Self(lines.to_vec()))
    }

    pub fn to_text(&self) -> String {
        self.0.join("\n")
    }
}

impl From<Vec<String>> for SourceLines {
    fn from(lines: Vec<String>) -> Self {
        Self(lines)
    }
}

/// One challenge's reference or submitted source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snippet {
    /// Identity used in every diagnostic (usually the challenge id).
    pub id: String,
    pub language: Language,
    pub lines: SourceLines,
}

impl Snippet {
    pub fn new(id: impl Into<String>, language: Language, text: &str) -> Self {
        Self {
            id: id.into(),
            language,
            lines: SourceLines::from_text(text),
        }
    }

    /// SHA-256 hex digest of the canonical (newline-joined) text.
    pub fn digest(&self) -> String {
        let mut hasher = Sha256::new();
        for (i, line) in self.lines.iter().enumerate() {
            if i > 0 {
                hasher.update(b"\n");
            }
            hasher.update(line.as_bytes());
        }
        hex::encode(hasher.finalize())
    }
}

/// The leading whitespace of `line`.
pub fn leading_whitespace(line: &str) -> &str {
    &line[..line.len() - line.trim_start().len()]
}

/// Indentation width in columns, with tabs expanded.
pub fn indent_width(line: &str) -> usize {
    leading_whitespace(line)
        .chars()
        .map(|c| if c == '\t' { TAB_WIDTH } else { 1 })
        .sum()
}

/// Remove the longest whitespace prefix shared by every non-blank line.
/// Blank lines come out empty.
pub fn dedent(lines: &[String]) -> String {
    let common = lines
        .iter()
        .filter(|l| !l.trim().is_empty())
        .map(|l| leading_whitespace(l))
        .reduce(|acc, ws| {
            let shared = acc
                .char_indices()
                .zip(ws.chars())
                .take_while(|((_, a), b)| a == b)
                .last()
                .map(|((i, c), _)| i + c.len_utf8())
                .unwrap_or(0);
            &acc[..shared]
        })
        .unwrap_or("");

    lines
        .iter()
        .map(|l| {
            if l.trim().is_empty() {
                ""
            } else {
                l.strip_prefix(common).unwrap_or(l)
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_text_handles_crlf_and_trailing_newline() {
        let lines = SourceLines::from_text("a\r\nb\r\n");
        assert_eq!(lines.len(), 2);
        assert_eq!(lines.get(1), Some("b"));
    }

    #[test]
    fn test_slice_out_of_range_is_none() {
        let lines = SourceLines::from_text("a\nb");
        assert!(lines.slice(1..5).is_none());
        assert_eq!(lines.slice(1..2).unwrap().to_text(), "b");
    }

    #[test]
    fn test_indent_width_expands_tabs() {
        assert_eq!(indent_width("\t  x"), 6);
        assert_eq!(indent_width("x"), 0);
    }

    #[test]
    fn test_dedent_strips_common_prefix_and_keeps_nesting() {
        let lines = vec![
            "    int f() {".to_string(),
            "".to_string(),
            "        return 1;".to_string(),
            "    }".to_string(),
        ];
        assert_eq!(dedent(&lines), "int f() {\n\n    return 1;\n}");
    }

    #[test]
    fn test_digest_is_stable_and_content_sensitive() {
        let a = Snippet::new("a", Language::Python, "print(1)\n");
        let b = Snippet::new("b", Language::Python, "print(1)");
        let c = Snippet::new("c", Language::Python, "print(2)");
        assert_eq!(a.digest(), b.digest());
        assert_ne!(a.digest(), c.digest());
    }
}
