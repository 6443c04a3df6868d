//! Lifecycle state machine.
//!
//! Streams through configuration lines once, opening a new [`StubLifecycle`]
//! at every boundary and binding fields onto the side that is currently
//! active. Nothing here fails: unexpected content is dropped or bound
//! leniently and reported as a [`Diagnostic`].

use super::binder::{self, RequestField};
use super::block::{self, BlockIndicator};
use super::classifier::{classify, NodeKind};
use super::lines::{unquote, KeyValue, Line};
use crate::model::StubLifecycle;
use serde::Serialize;
use std::iter::Peekable;

/// Category of a non-fatal parse problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// Field before any lifecycle was opened
    OrphanField,
    /// `response` before any lifecycle was opened
    OrphanMarker,
    /// Header entry with no active side to receive it
    DroppedEntry,
    /// Line without a usable key or value
    MalformedLine,
    /// Value rejected by a typed field
    InvalidValue,
    /// Response with both `body` and `file`
    ConflictingBody,
}

/// A non-fatal problem found while parsing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    /// 1-based line number
    pub line: usize,
    pub kind: DiagnosticKind,
    pub message: String,
}

impl Diagnostic {
    pub fn new(line: usize, kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self {
            line,
            kind,
            message: message.into(),
        }
    }
}

/// Output of a parse pass.
#[derive(Debug, Default)]
pub struct Parsed {
    pub lifecycles: Vec<StubLifecycle>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Which part of the current lifecycle receives fields.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ParserState {
    #[default]
    NoActiveLifecycle,
    AwaitingSide,
    ActiveRequest,
    ActiveResponse,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MapTarget {
    Query,
    RequestHeaders,
    ResponseHeaders,
    Discard,
}

/// An open `headers:` or `query:` block. Lines indented deeper than the
/// marker are entries.
#[derive(Debug, Clone, Copy)]
struct MapBlock {
    indent: usize,
    target: MapTarget,
}

#[derive(Debug, Default)]
struct LifecycleBuilder {
    lifecycles: Vec<StubLifecycle>,
    /// Line each lifecycle started on
    starts: Vec<usize>,
    state: ParserState,
    /// Set while an `httplifecycle` block has not seen its `request` yet
    request_pending: bool,
    map: Option<MapBlock>,
    diagnostics: Vec<Diagnostic>,
}

/// Parse configuration lines into lifecycles.
pub fn parse_lines<'a, I>(lines: I) -> Parsed
where
    I: IntoIterator<Item = &'a str>,
{
    let mut builder = LifecycleBuilder::default();
    let mut lines = lines
        .into_iter()
        .enumerate()
        .map(|(i, line)| (i + 1, line))
        .peekable();

    while let Some((number, raw)) = lines.next() {
        let line = Line::new(number, raw);
        if line.is_ignorable() {
            continue;
        }

        let kv = line.key_value();
        if builder.in_map(&line) {
            let value = read_value(&mut lines, &line, &kv);
            builder.map_entry(&line, &kv, value);
            continue;
        }

        match classify(&kv.key) {
            NodeKind::LifecycleBoundary => builder.open_lifecycle(number, ParserState::AwaitingSide),
            NodeKind::RequestMarker => builder.enter_request(number),
            NodeKind::ResponseMarker => builder.enter_response(number),
            NodeKind::HeadersMarker => builder.open_headers(&line),
            NodeKind::Field => {
                let value = read_value(&mut lines, &line, &kv);
                builder.bind_field(&line, &kv, value);
            }
        }
    }

    builder.finish()
}

/// The value of `kv`, reading the following lines when it opens a block.
fn read_value<'a, I>(lines: &mut Peekable<I>, line: &Line<'_>, kv: &KeyValue<'_>) -> Option<String>
where
    I: Iterator<Item = (usize, &'a str)>,
{
    match kv.value.and_then(BlockIndicator::parse) {
        Some(indicator) => Some(block::accumulate(lines, line.indent, indicator)),
        None => kv.value.map(|value| unquote(value).into_owned()),
    }
}

impl LifecycleBuilder {
    fn open_lifecycle(&mut self, line: usize, state: ParserState) {
        self.lifecycles.push(StubLifecycle::default());
        self.starts.push(line);
        self.state = state;
        self.request_pending = state == ParserState::AwaitingSide;
        self.map = None;
    }

    /// `request` inside an `httplifecycle` block selects the request side the
    /// first time; everywhere else it starts a new lifecycle.
    fn enter_request(&mut self, line: usize) {
        if self.request_pending {
            self.request_pending = false;
            self.state = ParserState::ActiveRequest;
            self.map = None;
        } else {
            self.open_lifecycle(line, ParserState::ActiveRequest);
        }
    }

    fn enter_response(&mut self, line: usize) {
        if self.state == ParserState::NoActiveLifecycle {
            self.diagnostics.push(Diagnostic::new(
                line,
                DiagnosticKind::OrphanMarker,
                "`response` appears before any request; ignored",
            ));
        } else {
            self.state = ParserState::ActiveResponse;
        }
    }

    fn open_headers(&mut self, line: &Line<'_>) {
        let target = match self.state {
            ParserState::ActiveRequest => MapTarget::RequestHeaders,
            ParserState::ActiveResponse => MapTarget::ResponseHeaders,
            ParserState::NoActiveLifecycle | ParserState::AwaitingSide => {
                self.diagnostics.push(Diagnostic::new(
                    line.number,
                    DiagnosticKind::DroppedEntry,
                    "`headers` outside of a request or response; entries dropped",
                ));
                MapTarget::Discard
            }
        };
        self.map = Some(MapBlock {
            indent: line.indent,
            target,
        });
    }

    /// Whether `line` belongs to the open map block. Closes the block when
    /// the line is not indented past its marker.
    fn in_map(&mut self, line: &Line<'_>) -> bool {
        match self.map {
            Some(block) if line.indent > block.indent => true,
            Some(_) => {
                self.map = None;
                false
            }
            None => false,
        }
    }

    fn map_entry(&mut self, line: &Line<'_>, kv: &KeyValue<'_>, value: Option<String>) {
        let Some(block) = self.map else {
            return;
        };
        if kv.key.is_empty() {
            self.diagnostics.push(Diagnostic::new(
                line.number,
                DiagnosticKind::MalformedLine,
                "map entry without a key; dropped",
            ));
            return;
        }
        let Some(lifecycle) = self.lifecycles.last_mut() else {
            return;
        };

        match (block.target, value) {
            (MapTarget::Discard, _) => {}
            (MapTarget::Query, value) => {
                lifecycle
                    .request
                    .query
                    .insert(kv.name.to_string(), value.unwrap_or_default());
            }
            (MapTarget::RequestHeaders | MapTarget::ResponseHeaders, None) => {
                self.diagnostics.push(Diagnostic::new(
                    line.number,
                    DiagnosticKind::MalformedLine,
                    format!("header `{}` has no value; dropped", kv.raw_key),
                ));
            }
            (MapTarget::RequestHeaders, Some(value)) => {
                lifecycle.request.headers.insert(&kv.name, value);
            }
            (MapTarget::ResponseHeaders, Some(value)) => {
                lifecycle.response.headers.insert(&kv.name, value);
            }
        }
    }

    fn bind_field(&mut self, line: &Line<'_>, kv: &KeyValue<'_>, value: Option<String>) {
        if kv.key.is_empty() {
            self.diagnostics.push(Diagnostic::new(
                line.number,
                DiagnosticKind::MalformedLine,
                "line has no key; dropped",
            ));
            return;
        }
        let Some(lifecycle) = self.lifecycles.last_mut() else {
            self.diagnostics.push(Diagnostic::new(
                line.number,
                DiagnosticKind::OrphanField,
                format!("`{}` appears before any request; dropped", kv.raw_key),
            ));
            return;
        };

        let result = if let Some(field) = binder::request_field(&kv.key) {
            self.state = ParserState::ActiveRequest;
            match field {
                RequestField::Scalar(set) => set(&mut lifecycle.request, value.unwrap_or_default()),
                RequestField::Query => {
                    self.map = Some(MapBlock {
                        indent: line.indent,
                        target: MapTarget::Query,
                    });
                    for (key, value) in binder::parse_query_pairs(value.as_deref().unwrap_or("")) {
                        lifecycle
                            .request
                            .query
                            .insert(key.to_string(), value.to_string());
                    }
                    Ok(())
                }
            }
        } else if let Some(set) = binder::response_field(&kv.key) {
            self.state = ParserState::ActiveResponse;
            set(&mut lifecycle.response, value.unwrap_or_default())
        } else {
            let Some(value) = value else {
                self.diagnostics.push(Diagnostic::new(
                    line.number,
                    DiagnosticKind::MalformedLine,
                    format!("`{}` has no value; dropped", kv.raw_key),
                ));
                return;
            };
            match self.state {
                ParserState::ActiveRequest => {
                    lifecycle.request.headers.insert(&kv.name, value);
                }
                ParserState::ActiveResponse => {
                    lifecycle.response.headers.insert(&kv.name, value);
                }
                ParserState::NoActiveLifecycle | ParserState::AwaitingSide => {
                    self.diagnostics.push(Diagnostic::new(
                        line.number,
                        DiagnosticKind::DroppedEntry,
                        format!("`{}` has no request or response to attach to; dropped", kv.raw_key),
                    ));
                }
            }
            Ok(())
        };

        if let Err(e) = result {
            self.diagnostics.push(Diagnostic::new(
                line.number,
                DiagnosticKind::InvalidValue,
                format!("{e}; `{}` left unchanged", kv.raw_key),
            ));
        }
    }

    fn finish(mut self) -> Parsed {
        for (lifecycle, &start) in self.lifecycles.iter().zip(&self.starts) {
            let response = &lifecycle.response;
            if response.body.is_some() && response.file.is_some() {
                self.diagnostics.push(Diagnostic::new(
                    start,
                    DiagnosticKind::ConflictingBody,
                    "response sets both `body` and `file`; `file` is served",
                ));
            }
        }
        self.diagnostics.sort_by_key(|d| d.line);

        Parsed {
            lifecycles: self.lifecycles,
            diagnostics: self.diagnostics,
        }
    }
}
