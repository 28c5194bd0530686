//! Structured events for transform and verification lifecycles.

use snipcheck_core::{
    emit_execution_failed, emit_verification, transform_with, ExecutionError, Language,
    Snippet, SnippetSpan, TracingObserver,
};
use tracing_test::traced_test;

#[traced_test]
#[test]
fn test_transform_logs_digest_and_rewrites() {
    let snippet = Snippet::new(
        "obs-demo",
        Language::JavaScript,
        "function main() {\n  console.log(1);\n}\n",
    );
    transform_with(&snippet, &TracingObserver).unwrap();

    assert!(logs_contain("transform.finished"));
    assert!(logs_contain(&snippet.digest()));
    assert!(logs_contain("transform.line_rewritten"));
}

#[traced_test]
#[test]
fn test_verification_event_carries_outcome() {
    let _span = SnippetSpan::enter("obs-verify", Language::Python);
    emit_verification("obs-verify", 3, 2, false);
    assert!(logs_contain("verification.finished"));
    assert!(logs_contain("passed=false"));
}

#[traced_test]
#[test]
fn test_execution_failure_is_a_warning() {
    let err = ExecutionError::Timeout { limit_ms: 10 };
    emit_execution_failed("obs-timeout", Language::Java, &err);
    assert!(logs_contain("WARN"));
    assert!(logs_contain("timed out after 10ms"));
}
