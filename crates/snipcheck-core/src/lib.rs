//! snipcheck core library
//!
//! Turns a reference code snippet into an instrumented script whose entry
//! point collects its printed values, runs it, and compares the values with
//! the snippet's answer key.

pub mod compare;
pub mod config;
pub mod driver;
pub mod error;
pub mod execution;
pub mod expr;
pub mod extract;
pub mod language;
pub mod languages;
pub mod lines;
pub mod locate;
pub mod markers;
pub mod obs;
pub mod return_type;
pub mod telemetry;
pub mod transform;

pub use compare::{compare_answers, parse_answer_literal, values_equal, AnswerMismatch, Comparison};
pub use config::{ConfigError, SnipcheckConfig};
pub use driver::{
    derive_answers, evaluate, regenerate_answers, verify, Challenge, VerificationReport,
    VerifyError,
};
pub use error::{Result, SnippetError};
pub use execution::{
    execute_with_limits, AdapterRegistry, Bindings, ExecutionAdapter, ExecutionConfig,
    ExecutionError, ExecutionResult, RuntimePrograms, SubprocessAdapter, VALUE_LIMIT_MARKER,
};
pub use expr::{balanced_argument, split_arguments};
pub use extract::{
    expected_answers, extract_function, output_expressions, output_expressions_between,
    FunctionText, OutputExpression,
};
pub use language::Language;
pub use lines::{SourceLines, Snippet};
pub use locate::{between, entry_block, find_first, find_last, BlockSpan};
pub use markers::{BlockEnd, BoundaryMarker, MarkerRole, MarkerTable, COLLECTOR};
pub use obs::{
    emit_execution_failed, emit_execution_finished, emit_transform_finished, emit_verification,
    SnippetSpan,
};
pub use return_type::{infer_return_type, ReturnType};
pub use telemetry::init_tracing;
pub use transform::{
    transform, transform_with, EntryMachine, EntryState, InstrumentedScript, NoopObserver,
    RecordingObserver, RewriteEvent, RewriteKind, TracingObserver, TransformObserver,
};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
