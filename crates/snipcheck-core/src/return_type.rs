//! Declared result category of a Java challenge's method.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SnippetError};
use crate::language::Language;
use crate::lines::Snippet;
use crate::markers::MarkerRole;

/// Closed vocabulary of result types a challenge method may declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReturnType {
    Int,
    Long,
    Double,
    Boolean,
    Char,
    String,
    Void,
    IntArray,
    DoubleArray,
    BooleanArray,
    CharArray,
    StringArray,
    List,
}

impl ReturnType {
    /// Map a declared type token; whitespace inside the token is ignored.
    pub fn from_token(token: &str) -> Option<Self> {
        let compact: std::string::String = token.chars().filter(|c| !c.is_whitespace()).collect();
        let ty = match compact.as_str() {
            "int" | "Integer" | "short" | "Short" | "byte" | "Byte" => ReturnType::Int,
            "long" | "Long" => ReturnType::Long,
            "double" | "Double" | "float" | "Float" => ReturnType::Double,
            "boolean" | "Boolean" => ReturnType::Boolean,
            "char" | "Character" => ReturnType::Char,
            "String" => ReturnType::String,
            "void" => ReturnType::Void,
            "int[]" => ReturnType::IntArray,
            "double[]" => ReturnType::DoubleArray,
            "boolean[]" => ReturnType::BooleanArray,
            "char[]" => ReturnType::CharArray,
            "String[]" => ReturnType::StringArray,
            t if t.starts_with("List<")
                || t.starts_with("ArrayList<")
                || t.starts_with("java.util.List<") =>
            {
                ReturnType::List
            }
            _ => return None,
        };
        Some(ty)
    }

    pub fn is_collection(&self) -> bool {
        matches!(
            self,
            ReturnType::IntArray
                | ReturnType::DoubleArray
                | ReturnType::BooleanArray
                | ReturnType::CharArray
                | ReturnType::StringArray
                | ReturnType::List
        )
    }
}

impl fmt::Display for ReturnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ReturnType::Int => "int",
            ReturnType::Long => "long",
            ReturnType::Double => "double",
            ReturnType::Boolean => "boolean",
            ReturnType::Char => "char",
            ReturnType::String => "String",
            ReturnType::Void => "void",
            ReturnType::IntArray => "int[]",
            ReturnType::DoubleArray => "double[]",
            ReturnType::BooleanArray => "boolean[]",
            ReturnType::CharArray => "char[]",
            ReturnType::StringArray => "String[]",
            ReturnType::List => "List",
        };
        f.write_str(name)
    }
}

/// Infer the declared result type of the first static, non-`main` method.
///
/// Only Java snippets carry a return-type vocabulary.
pub fn infer_return_type(snippet: &Snippet) -> Result<ReturnType> {
    if snippet.language != Language::Java {
        return Err(SnippetError::UnsupportedLanguage(format!(
            "return-type inference is not available for {}",
            snippet.language
        )));
    }
    let marker = &snippet.language.markers().function_start;

    for (idx, line) in snippet.lines.iter().enumerate() {
        let Some(caps) = marker.captures(line) else {
            continue;
        };
        let token = caps.name("type").map(|m| m.as_str()).unwrap_or_default();
        return ReturnType::from_token(token).ok_or_else(|| SnippetError::UnrecognizedReturnType {
            snippet: snippet.id.clone(),
            token: token.to_string(),
            line: idx,
        });
    }

    Err(SnippetError::BoundaryNotFound {
        snippet: snippet.id.clone(),
        role: MarkerRole::FunctionStart,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn java(body: &str) -> Snippet {
        Snippet::new("rt", Language::Java, body)
    }

    #[test]
    fn test_first_qualifying_declaration_wins() {
        let snippet = java(
            "class A {\n    public static void main(String[] a) {\n    }\n    private static boolean first(int x) {\n    }\n    static int second() {\n    }\n}",
        );
        assert_eq!(infer_return_type(&snippet).unwrap(), ReturnType::Boolean);
    }

    #[test]
    fn test_array_and_generic_tokens() {
        assert_eq!(ReturnType::from_token("int[]"), Some(ReturnType::IntArray));
        assert_eq!(ReturnType::from_token("String []"), Some(ReturnType::StringArray));
        assert_eq!(ReturnType::from_token("List<Integer>"), Some(ReturnType::List));
        assert_eq!(ReturnType::from_token("Map<String,Integer>"), None);
        assert!(ReturnType::List.is_collection());
        assert!(!ReturnType::Char.is_collection());
    }

    #[test]
    fn test_unrecognized_token_names_snippet_and_line() {
        let snippet = java("class A {\n    public static Map<String, Integer> count(String s) {\n    }\n}");
        match infer_return_type(&snippet) {
            Err(SnippetError::UnrecognizedReturnType { snippet, token, line }) => {
                assert_eq!(snippet, "rt");
                assert_eq!(token, "Map<String, Integer>");
                assert_eq!(line, 1);
            }
            other => panic!("expected UnrecognizedReturnType, got {other:?}"),
        }
    }

    #[test]
    fn test_no_declaration_is_boundary_error() {
        let snippet = java("class A {\n    public static void main(String[] a) {\n    }\n}");
        assert!(matches!(
            infer_return_type(&snippet),
            Err(SnippetError::BoundaryNotFound {
                role: MarkerRole::FunctionStart,
                ..
            })
        ));
    }

    #[test]
    fn test_other_languages_are_rejected() {
        let snippet = Snippet::new("py", Language::Python, "def f():\n    return 1\n");
        assert!(matches!(
            infer_return_type(&snippet),
            Err(SnippetError::UnsupportedLanguage(_))
        ));
    }
}
