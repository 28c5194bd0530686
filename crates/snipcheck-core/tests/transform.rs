//! End-to-end rewriting of whole snippets into instrumented scripts.

use snipcheck_core::{
    expected_answers, transform, transform_with, Language, RecordingObserver, RewriteKind,
    Snippet, SnippetError,
};

const JAVA: &str = r#"public class Compare {
    public static boolean compare(int a, int b) {
        return a < b;
    }

    public static void main(String[] args) {
        System.out.println(compare(4, 6));
        // System.out.println(compare(1, 1));
        for (int i = 0; i < 2; i++) {
            System.out.println(compare(i, 1));
        }
        System.out.println(compare(6, 4));
    }
}
"#;

const PYTHON: &str = r#"def f(x):
    return x + 1

if __name__ == "__main__":
    print(f(1))
    # print(f(2))
    print(f(3))
x = 10
"#;

#[test]
fn test_java_main_collects_instead_of_printing() {
    let snippet = Snippet::new("compare", Language::Java, JAVA);
    let script = transform(&snippet).unwrap();

    let expected = r#"public class Compare {
    public static boolean compare(int a, int b) {
        return a < b;
    }

    static java.util.List<Object> answers = new java.util.ArrayList<>(); public static java.util.List<Object> main(String[] args) {
        answers.add(compare(4, 6));
        // System.out.println(compare(1, 1));
        for (int i = 0; i < 2; i++) {
            answers.add(compare(i, 1));
        }
        answers.add(compare(6, 4));
        return answers;
    }
}

"#;
    assert_eq!(script.text, expected);
    assert_eq!(script.appended_calls, 3);
    assert_eq!(script.entry_symbol, "main");
    assert_eq!(script.collector, "answers");
}

#[test]
fn test_python_guard_gets_collector_and_dedent_closes_block() {
    let snippet = Snippet::new("inc", Language::Python, PYTHON);
    let script = transform(&snippet).unwrap();

    assert_eq!(
        script.text,
        "def f(x):\n    return x + 1\n\nanswers = []\nif __name__ == \"__main__\":\n    answers.append(f(1))\n    # print(f(2))\n    answers.append(f(3))\nx = 10\n\n"
    );
    assert_eq!(
        script.line_origins,
        vec![
            Some(0),
            Some(1),
            Some(2),
            None,
            Some(3),
            Some(4),
            Some(5),
            Some(6),
            Some(7),
            None
        ]
    );
    assert_eq!(script.entry_symbol, "answers");
}

#[test]
fn test_appended_calls_match_answer_key() {
    let cases = [
        Snippet::new("compare", Language::Java, JAVA),
        Snippet::new("inc", Language::Python, PYTHON),
        Snippet::new(
            "js",
            Language::JavaScript,
            "function twice(x) {\n  return x * 2;\n}\n\nfunction main() {\n  console.log(twice(1));\n  // console.log(twice(2));\n  console.log(twice(3), 'extra');\n}\n",
        ),
    ];
    for snippet in &cases {
        let script = transform(snippet).unwrap();
        let answers = expected_answers(snippet).unwrap();
        assert_eq!(script.appended_calls, answers.len(), "snippet {}", snippet.id);
    }
    let js = transform(&cases[2]).unwrap();
    assert!(js.text.contains("answers.push(twice(1));"));
    assert!(js.text.contains("answers.push([twice(3), 'extra'].join(' '));"));
    assert_eq!(js.text.matches("answers.push(").count(), 2);
}

#[test]
fn test_multi_argument_prints_append_once() {
    let snippet = Snippet::new(
        "multi",
        Language::Python,
        "if __name__ == '__main__':\n    print('a', 1)\n    print(x, end='')\n    print('a', 'b', sep='-')\n",
    );
    let script = transform(&snippet).unwrap();
    assert_eq!(script.appended_calls, 3);
    assert!(script
        .text
        .contains("answers.append((' ').join(map(str, ('a', 1,))))"));
    assert!(script.text.contains("answers.append(x)\n"));
    assert!(script
        .text
        .contains("answers.append(('-').join(map(str, ('a', 'b',))))"));
}

#[test]
fn test_transform_is_deterministic() {
    let snippet = Snippet::new("compare", Language::Java, JAVA);
    let first = transform(&snippet).unwrap();
    let second = transform(&snippet).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_block_comment_inside_entry_is_left_alone() {
    let snippet = Snippet::new(
        "hidden",
        Language::JavaScript,
        "function main() {\n  /* console.log(hidden());\n     console.log(hidden()); */\n  console.log(1);\n}\n",
    );
    let script = transform(&snippet).unwrap();
    assert_eq!(
        script.text,
        "const answers = []; function main() {\n  /* console.log(hidden());\n     console.log(hidden()); */\n  answers.push(1);\n  return answers;\n}\n\n"
    );
}

#[test]
fn test_last_entry_point_is_rewritten() {
    let snippet = Snippet::new(
        "twice",
        Language::JavaScript,
        "function main() {\n  console.log(0);\n}\nfunction main() {\n  console.log(1);\n}\n",
    );
    let script = transform(&snippet).unwrap();
    assert_eq!(
        script.text,
        "function main() {\n  console.log(0);\n}\nconst answers = []; function main() {\n  answers.push(1);\n  return answers;\n}\n\n"
    );
}

#[test]
fn test_observer_sees_every_rewrite_in_order() {
    let snippet = Snippet::new("inc", Language::Python, PYTHON);
    let observer = RecordingObserver::default();
    transform_with(&snippet, &observer).unwrap();

    let events = observer.events();
    let kinds: Vec<_> = events.iter().map(|e| (e.line, e.kind)).collect();
    assert_eq!(
        kinds,
        vec![
            (3, RewriteKind::EntryPoint),
            (4, RewriteKind::OutputCall),
            (6, RewriteKind::OutputCall),
        ]
    );
    assert_eq!(events[0].emitted, vec!["answers = []", "if __name__ == \"__main__\":"]);
    assert_eq!(events[1].original, "    print(f(1))");
}

#[test]
fn test_unclosed_java_main_is_an_error() {
    let snippet = Snippet::new(
        "open",
        Language::Java,
        "public class Open {\n    public static void main(String[] args) {\n        System.out.println(1);\n",
    );
    match transform(&snippet) {
        Err(SnippetError::UnterminatedBlock { snippet, line }) => {
            assert_eq!(snippet, "open");
            assert_eq!(line, 1);
        }
        other => panic!("expected UnterminatedBlock, got {other:?}"),
    }
}

#[test]
fn test_unbalanced_output_call_is_reported_with_line() {
    let snippet = Snippet::new(
        "broken",
        Language::Python,
        "if __name__ == '__main__':\n    print(1)\n    print((2)\n",
    );
    let err = transform(&snippet).unwrap_err();
    assert_eq!(err.line(), Some(2));
    assert_eq!(err.snippet(), Some("broken"));
}
