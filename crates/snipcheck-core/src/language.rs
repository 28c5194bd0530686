//! Supported snippet dialects.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::SnippetError;
use crate::languages::{java, javascript, python};
use crate::markers::MarkerTable;

/// A source-language dialect with its own marker table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Java,
    #[serde(alias = "js", alias = "node")]
    JavaScript,
    #[serde(alias = "py")]
    Python,
}

impl Language {
    pub const ALL: [Language; 3] = [Language::Java, Language::JavaScript, Language::Python];

    /// Canonical tag, as accepted by [`FromStr`].
    pub fn tag(&self) -> &'static str {
        match self {
            Language::Java => "java",
            Language::JavaScript => "javascript",
            Language::Python => "python",
        }
    }

    /// The static marker table describing this dialect.
    pub fn markers(&self) -> &'static MarkerTable {
        match self {
            Language::Java => &java::MARKERS,
            Language::JavaScript => &javascript::MARKERS,
            Language::Python => &python::MARKERS,
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for Language {
    type Err = SnippetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "java" => Ok(Language::Java),
            "javascript" | "js" | "node" => Ok(Language::JavaScript),
            "python" | "py" => Ok(Language::Python),
            other => Err(SnippetError::UnsupportedLanguage(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_language_tags_parse_case_insensitively() {
        assert_eq!("Java".parse::<Language>().unwrap(), Language::Java);
        assert_eq!("node".parse::<Language>().unwrap(), Language::JavaScript);
        assert_eq!(" py ".parse::<Language>().unwrap(), Language::Python);
        assert!(matches!(
            "ruby".parse::<Language>(),
            Err(SnippetError::UnsupportedLanguage(_))
        ));
    }

    #[test]
    fn test_language_serde_uses_canonical_tag_and_aliases() {
        assert_eq!(
            serde_json::to_string(&Language::JavaScript).unwrap(),
            "\"javascript\""
        );
        let lang: Language = serde_json::from_str("\"js\"").unwrap();
        assert_eq!(lang, Language::JavaScript);
    }

    #[test]
    fn test_every_language_has_its_own_table() {
        for lang in Language::ALL {
            assert_eq!(lang.markers().language, lang);
        }
    }
}
