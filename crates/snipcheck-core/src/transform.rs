//! Script transformer: rewrite a snippet so its entry point fills the
//! answer collector instead of printing.
//!
//! The rewrite streams line by line through a two-state machine
//! ([`EntryState`]). Lines outside the entry-point block are copied verbatim,
//! so runtime diagnostics can be mapped back to the original snippet through
//! [`InstrumentedScript::line_origins`].

use serde::{Deserialize, Serialize};

use crate::error::{Result, SnippetError};
use crate::language::Language;
use crate::lines::{indent_width, leading_whitespace, Snippet};
use crate::locate::entry_block;
use crate::markers::{CommentTracker, MarkerTable, COLLECTOR};
use crate::obs;

/// Indentation used for a synthesized `return` when the block body is empty.
const DEFAULT_BODY_INDENT: &str = "    ";

/// A snippet rewritten to collect its outputs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstrumentedScript {
    pub snippet_id: String,
    pub language: Language,
    /// Runnable source, ending with a blank line.
    pub text: String,
    /// Name of the collector binding (always `answers`).
    pub collector: String,
    /// Symbol the runtime evaluates to obtain the collector.
    pub entry_symbol: String,
    /// 0-based index of the emitted line declaring the collector.
    pub collector_line: usize,
    /// Original 0-based line index of each emitted line; `None` for
    /// synthesized lines.
    pub line_origins: Vec<Option<usize>>,
    /// Number of output calls rewritten into appends.
    pub appended_calls: usize,
}

impl InstrumentedScript {
    /// Map a 0-based emitted line index back to the snippet line it came from.
    pub fn original_line(&self, emitted: usize) -> Option<usize> {
        self.line_origins.get(emitted).copied().flatten()
    }

    /// The script text with the collector's initializer replaced by `init`
    /// on the declaration line only.
    pub fn with_collector_init(&self, init: &str) -> String {
        let initializer = self.language.markers().collector.initializer;
        self.text
            .split('\n')
            .enumerate()
            .map(|(i, line)| {
                if i == self.collector_line {
                    line.replacen(initializer, init, 1)
                } else {
                    line.to_string()
                }
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Kind of rewrite applied to a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RewriteKind {
    EntryPoint,
    OutputCall,
    BlockEnd,
}

/// Notification for one rewritten line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewriteEvent {
    pub line: usize,
    pub kind: RewriteKind,
    pub original: String,
    pub emitted: Vec<String>,
}

/// Observer notified for every line the transformer rewrites.
pub trait TransformObserver {
    fn on_rewrite(&self, snippet: &Snippet, event: &RewriteEvent);
}

/// Observer that ignores every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl TransformObserver for NoopObserver {
    fn on_rewrite(&self, _snippet: &Snippet, _event: &RewriteEvent) {}
}

/// Observer that emits a `debug!` event per rewritten line.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl TransformObserver for TracingObserver {
    fn on_rewrite(&self, snippet: &Snippet, event: &RewriteEvent) {
        obs::emit_line_rewritten(&snippet.id, event.line, event.kind, event.emitted.len());
    }
}

/// Observer that keeps every event, in order.
#[derive(Debug, Default)]
pub struct RecordingObserver {
    events: std::sync::Mutex<Vec<RewriteEvent>>,
}

impl RecordingObserver {
    pub fn events(&self) -> Vec<RewriteEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }
}

impl TransformObserver for RecordingObserver {
    fn on_rewrite(&self, _snippet: &Snippet, event: &RewriteEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }
}

/// Position of the stream relative to the entry-point block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryState {
    Outside,
    Inside {
        entry_line: usize,
        entry_indent: usize,
        /// Indentation of the first body line, once seen.
        body_indent: Option<String>,
    },
}

/// One emitted line and the original line it derives from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Emitted {
    pub text: String,
    pub origin: Option<usize>,
}

impl Emitted {
    fn copied(line: &str, origin: usize) -> Self {
        Self {
            text: line.to_string(),
            origin: Some(origin),
        }
    }
}

/// Outcome of feeding one line to [`EntryMachine::step`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    pub emitted: Vec<Emitted>,
    pub rewrite: Option<RewriteKind>,
}

impl Step {
    fn copied(line: &str, origin: usize) -> Self {
        Self {
            emitted: vec![Emitted::copied(line, origin)],
            rewrite: None,
        }
    }
}

/// The `{Outside, Inside}` state machine over one snippet's lines.
///
/// `entry_line` is the authoritative entry point (the last marker match); the
/// machine enters the block only there.
#[derive(Debug, Clone)]
pub struct EntryMachine<'t> {
    table: &'t MarkerTable,
    entry_line: usize,
    state: EntryState,
    comments: CommentTracker,
}

impl<'t> EntryMachine<'t> {
    pub fn new(table: &'t MarkerTable, entry_line: usize) -> Self {
        Self {
            table,
            entry_line,
            state: EntryState::Outside,
            comments: CommentTracker::default(),
        }
    }

    pub fn state(&self) -> &EntryState {
        &self.state
    }

    /// Feed line `idx`. Unbalanced output calls yield `Err(idx)`.
    pub fn step(&mut self, idx: usize, line: &str) -> std::result::Result<Step, usize> {
        let commented = self.comments.is_comment(line, &self.table.comments);

        if self.state == EntryState::Outside {
            return Ok(if idx == self.entry_line {
                self.enter(idx, line)
            } else {
                Step::copied(line, idx)
            });
        }
        let EntryState::Inside {
            entry_indent,
            body_indent,
            ..
        } = &mut self.state
        else {
            return Ok(Step::copied(line, idx));
        };
        let entry_indent = *entry_indent;

        if commented || line.trim().is_empty() {
            return Ok(Step::copied(line, idx));
        }

        if self.table.closes_block(line, entry_indent) {
            let indent = body_indent
                .clone()
                .unwrap_or_else(|| format!("{}{DEFAULT_BODY_INDENT}", leading_whitespace(line)));
            let mut emitted = Vec::new();
            if let Some(ret) = self.table.render_return(&indent) {
                emitted.push(Emitted {
                    text: ret,
                    origin: None,
                });
            }
            self.state = EntryState::Outside;
            emitted.push(Emitted::copied(line, idx));
            let rewrite = (emitted.len() > 1).then_some(RewriteKind::BlockEnd);
            return Ok(Step { emitted, rewrite });
        }

        if body_indent.is_none() {
            *body_indent = Some(leading_whitespace(line).to_string());
        }

        let Some(call) = self.table.output_call(line) else {
            return Ok(Step::copied(line, idx));
        };
        let expr = call.argument(line).ok_or(idx)?;
        Ok(Step {
            emitted: vec![Emitted {
                text: self.table.render_append(leading_whitespace(line), expr),
                origin: Some(idx),
            }],
            rewrite: Some(RewriteKind::OutputCall),
        })
    }

    /// Outside -> Inside at the entry line. Only the last emitted line stands
    /// for the original entry line; anything before it is synthesized.
    fn enter(&mut self, idx: usize, line: &str) -> Step {
        self.state = EntryState::Inside {
            entry_line: idx,
            entry_indent: indent_width(line),
            body_indent: None,
        };
        let rewritten = self.table.rewrite_entry(line);
        let last = rewritten.len().saturating_sub(1);
        let emitted = rewritten
            .into_iter()
            .enumerate()
            .map(|(i, text)| Emitted {
                text,
                origin: (i == last).then_some(idx),
            })
            .collect();
        Step {
            emitted,
            rewrite: Some(RewriteKind::EntryPoint),
        }
    }

    /// Close the stream. A brace block still open is malformed; an
    /// indentation block is closed by end of input.
    pub fn finish(self) -> std::result::Result<(), usize> {
        match self.state {
            EntryState::Inside { entry_line, .. } if !self.table.runs_to_end_of_input() => {
                Err(entry_line)
            }
            _ => Ok(()),
        }
    }
}

/// Rewrite `snippet` into an [`InstrumentedScript`].
pub fn transform(snippet: &Snippet) -> Result<InstrumentedScript> {
    transform_with(snippet, &NoopObserver)
}

/// Rewrite `snippet`, notifying `observer` for every rewritten line.
pub fn transform_with(
    snippet: &Snippet,
    observer: &dyn TransformObserver,
) -> Result<InstrumentedScript> {
    let table = snippet.language.markers();
    let span = entry_block(snippet)?;

    let mut machine = EntryMachine::new(table, span.start);
    let mut text_lines = Vec::with_capacity(snippet.lines.len() + 4);
    let mut line_origins = Vec::with_capacity(snippet.lines.len() + 4);
    let mut appended_calls = 0;
    let mut collector_line = 0;

    for (idx, line) in snippet.lines.iter().enumerate() {
        let step = machine
            .step(idx, line)
            .map_err(|line| SnippetError::UnbalancedExpression {
                snippet: snippet.id.clone(),
                line,
            })?;

        if let Some(kind) = step.rewrite {
            match kind {
                RewriteKind::OutputCall => appended_calls += 1,
                RewriteKind::EntryPoint => collector_line = text_lines.len(),
                RewriteKind::BlockEnd => {}
            }
            observer.on_rewrite(
                snippet,
                &RewriteEvent {
                    line: idx,
                    kind,
                    original: line.to_string(),
                    emitted: step.emitted.iter().map(|e| e.text.clone()).collect(),
                },
            );
        }
        for emitted in step.emitted {
            text_lines.push(emitted.text);
            line_origins.push(emitted.origin);
        }
    }

    machine
        .finish()
        .map_err(|line| SnippetError::UnterminatedBlock {
            snippet: snippet.id.clone(),
            line,
        })?;

    text_lines.push(String::new());
    line_origins.push(None);

    let mut text = text_lines.join("\n");
    text.push('\n');

    obs::emit_transform_finished(
        &snippet.id,
        &snippet.digest(),
        snippet.language,
        snippet.lines.len(),
        line_origins.len(),
        appended_calls,
    );

    Ok(InstrumentedScript {
        snippet_id: snippet.id.clone(),
        language: snippet.language,
        text,
        collector: COLLECTOR.to_string(),
        entry_symbol: table.collector.entry_symbol.to_string(),
        collector_line,
        line_origins,
        appended_calls,
    })
}
