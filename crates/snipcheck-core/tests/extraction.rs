//! Function, return-type and answer-key extraction across dialects.

use snipcheck_core::{
    expected_answers, extract_function, infer_return_type, output_expressions, Language,
    MarkerRole, ReturnType, Snippet, SnippetError,
};

#[test]
fn test_javascript_function_text_stops_before_main() {
    let snippet = Snippet::new(
        "js",
        Language::JavaScript,
        "// helper\nconst limit = 3;\nfunction clamp(x) {\n  return Math.min(x, limit);\n}\n\nfunction main() {\n  console.log(clamp(5));\n}\n",
    );
    let text = extract_function(&snippet).unwrap();
    assert_eq!(text.as_str(), "function clamp(x) {\n  return Math.min(x, limit);\n}");
}

#[test]
fn test_python_function_text_is_dedented() {
    let snippet = Snippet::new(
        "nested",
        Language::Python,
        "class Box:\n    def size(self):\n        return 3\n\n\nif __name__ == '__main__':\n    print(Box().size())\n",
    );
    let text = extract_function(&snippet).unwrap();
    assert_eq!(text.to_string(), "def size(self):\n    return 3");
}

#[test]
fn test_extraction_is_idempotent_on_its_output() {
    let snippet = Snippet::new(
        "js",
        Language::JavaScript,
        "function a() {\n  return 1;\n}\nfunction main() {\n  console.log(a());\n}\n",
    );
    let first = extract_function(&snippet).unwrap();
    let again = Snippet::new(
        "js",
        Language::JavaScript,
        &format!("{first}\nfunction main() {{\n}}\n"),
    );
    assert_eq!(extract_function(&again).unwrap(), first);
}

#[test]
fn test_missing_entry_point_names_role() {
    let snippet = Snippet::new("lib", Language::Python, "def f():\n    return 1\n");
    match extract_function(&snippet) {
        Err(SnippetError::BoundaryNotFound { snippet, role }) => {
            assert_eq!(snippet, "lib");
            assert_eq!(role, MarkerRole::EntryPoint);
        }
        other => panic!("expected BoundaryNotFound, got {other:?}"),
    }
}

#[test]
fn test_answer_key_handles_literals_with_parentheses() {
    let snippet = Snippet::new(
        "strings",
        Language::JavaScript,
        "function main() {\n  console.log(\"a)b\".length);\n  console.log(`(${1 + 1}`);\n  console.log('it\\'s (fine)');\n}\n",
    );
    assert_eq!(
        expected_answers(&snippet).unwrap(),
        vec!["\"a)b\".length", "`(${1 + 1}`", "'it\\'s (fine)'"]
    );
}

#[test]
fn test_output_expressions_ignore_calls_outside_entry_block() {
    let snippet = Snippet::new(
        "scope",
        Language::Python,
        "def f():\n    print('inside helper')\n    return 2\n\nif __name__ == '__main__':\n    print(f())\n",
    );
    let outputs = output_expressions(&snippet).unwrap();
    assert_eq!(outputs.len(), 1);
    assert_eq!(outputs[0].line, 5);
    assert_eq!(outputs[0].prefix, "print(");
    assert_eq!(outputs[0].expression, "f()");
}

#[test]
fn test_java_return_types() {
    let source = |decl: &str| {
        format!(
            "public class T {{\n    {decl} {{\n        return null;\n    }}\n\n    public static void main(String[] args) {{\n    }}\n}}\n"
        )
    };
    let cases = [
        ("public static int[] squares(int n)", ReturnType::IntArray),
        ("static String name()", ReturnType::String),
        ("private static List<Integer> evens(int n)", ReturnType::List),
        ("public static char first(String s)", ReturnType::Char),
        ("public static double mean(int[] xs)", ReturnType::Double),
    ];
    for (decl, expected) in cases {
        let snippet = Snippet::new("t", Language::Java, &source(decl));
        assert_eq!(infer_return_type(&snippet).unwrap(), expected, "{decl}");
    }
}
