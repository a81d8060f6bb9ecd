//! Diagnostics and their rendering.

use crate::config::OutputFormat;
use crate::span::{LineInfo, Span};
use serde::Serialize;
use std::fmt::Write as _;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Note,
}

impl Severity {
    pub fn label(self) -> &'static str {
        match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Note => "note",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    AnnotationResolution,
    TypeMismatch,
    UnwrapRequired,
    NilIncompatible,
    Syntax,
    Unresolved,
    Usage,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixIt {
    pub span: Span,
    pub replacement: String,
}

impl FixIt {
    pub fn insert(offset: usize, text: impl Into<String>) -> Self {
        Self {
            span: Span::point(offset),
            replacement: text.into(),
        }
    }

    pub fn remove(span: Span) -> Self {
        Self {
            span,
            replacement: String::new(),
        }
    }

    pub fn replace(span: Span, text: impl Into<String>) -> Self {
        Self {
            span,
            replacement: text.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Note {
    pub message: String,
    pub span: Option<Span>,
    pub fixits: Vec<FixIt>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub category: Category,
    pub message: String,
    /// `None` for diagnostics about the imported module rather than the source.
    pub span: Option<Span>,
    pub fixits: Vec<FixIt>,
    pub notes: Vec<Note>,
}

impl Diagnostic {
    pub fn error(category: Category, span: Span, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            category,
            message: message.into(),
            span: Some(span),
            fixits: Vec::new(),
            notes: Vec::new(),
        }
    }

    pub fn warning(category: Category, span: Option<Span>, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            category,
            message: message.into(),
            span,
            fixits: Vec::new(),
            notes: Vec::new(),
        }
    }

    pub fn with_fixits(mut self, fixits: Vec<FixIt>) -> Self {
        self.fixits = fixits;
        self
    }

    pub fn with_notes(mut self, notes: Vec<Note>) -> Self {
        self.notes = notes;
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

#[derive(Debug, Serialize)]
struct JsonFixIt<'d> {
    line: usize,
    start_column: usize,
    end_column: usize,
    replacement: &'d str,
}

#[derive(Debug, Serialize)]
struct JsonNote<'d> {
    message: &'d str,
    line: Option<usize>,
    column: Option<usize>,
    fixits: Vec<JsonFixIt<'d>>,
}

#[derive(Debug, Serialize)]
struct JsonDiagnostic<'d> {
    file: &'d str,
    severity: Severity,
    category: Category,
    message: &'d str,
    line: Option<usize>,
    column: Option<usize>,
    fixits: Vec<JsonFixIt<'d>>,
    notes: Vec<JsonNote<'d>>,
}

/// Renders diagnostics for one source file, in the order given.
pub struct Emitter<'a> {
    file: &'a str,
    source: &'a [u8],
}

impl<'a> Emitter<'a> {
    pub fn new(file: &'a str, source: &'a str) -> Self {
        Self {
            file,
            source: source.as_bytes(),
        }
    }

    pub fn render(
        &self,
        diagnostics: &[Diagnostic],
        format: OutputFormat,
    ) -> Result<String, serde_json::Error> {
        match format {
            OutputFormat::Plain => Ok(self.render_plain(diagnostics)),
            OutputFormat::Pretty => Ok(self.render_pretty(diagnostics)),
            OutputFormat::Json => self.render_json(diagnostics),
        }
    }

    fn location(&self, span: Option<Span>) -> Option<LineInfo<'a>> {
        span.and_then(|span| span.line_info(self.source))
    }

    fn header(&self, span: Option<Span>, severity: Severity, message: &str) -> String {
        match self.location(span) {
            Some(info) => format!(
                "{}:{}:{}: {}: {message}",
                self.file,
                info.line,
                info.column,
                severity.label()
            ),
            None => format!("{}: {}: {message}", self.file, severity.label()),
        }
    }

    fn fixit_columns(&self, fixit: &FixIt) -> Option<(usize, usize, usize)> {
        let start = fixit.span.line_info(self.source)?;
        let end = Span::point(fixit.span.end).line_info(self.source)?;
        Some((start.line, start.column, end.column))
    }

    fn append_fixits(&self, out: &mut String, fixits: &[FixIt]) {
        for fixit in fixits {
            if let Some((_, start, end)) = self.fixit_columns(fixit) {
                let _ = write!(out, " {{{start}-{end}={}}}", fixit.replacement);
            }
        }
    }

    /// `file:line:col: error: message {start-end=replacement}`, notes beneath.
    pub fn render_plain(&self, diagnostics: &[Diagnostic]) -> String {
        let mut out = String::new();
        for diag in diagnostics {
            out.push_str(&self.header(diag.span, diag.severity, &diag.message));
            self.append_fixits(&mut out, &diag.fixits);
            out.push('\n');
            for note in &diag.notes {
                out.push_str(&self.header(note.span, Severity::Note, &note.message));
                self.append_fixits(&mut out, &note.fixits);
                out.push('\n');
            }
        }
        out
    }

    fn snippet(&self, span: Span) -> Option<String> {
        let info = span.line_info(self.source)?;
        let line_str = String::from_utf8_lossy(info.line_text);
        let gutter_width = info.line.to_string().len();
        let padding = std::cmp::min(info.line_text.len(), info.column.saturating_sub(1));
        let highlight_len = std::cmp::max(
            1,
            std::cmp::min(span.len(), info.line_text.len().saturating_sub(padding)),
        );

        let mut marker = String::new();
        marker.push_str(&" ".repeat(padding));
        marker.push_str(&"^".repeat(highlight_len));

        Some(format!(
            "{gutter}|\n{line_no:>width$} | {line_src}\n{gutter}| {marker}",
            gutter = " ".repeat(gutter_width + 1),
            line_no = info.line,
            width = gutter_width,
            line_src = line_str,
        ))
    }

    /// Header, then the source line with a caret underline.
    pub fn render_pretty(&self, diagnostics: &[Diagnostic]) -> String {
        let mut out = String::new();
        for diag in diagnostics {
            out.push_str(&self.header(diag.span, diag.severity, &diag.message));
            out.push('\n');
            if let Some(snippet) = diag.span.and_then(|span| self.snippet(span)) {
                out.push_str(&snippet);
                out.push('\n');
            }
            for fixit in &diag.fixits {
                if let Some((line, start, end)) = self.fixit_columns(fixit) {
                    let _ = writeln!(
                        out,
                        "  fix-it: line {line}, columns {start}-{end}: replace with '{}'",
                        fixit.replacement
                    );
                }
            }
            for note in &diag.notes {
                out.push_str("  ");
                out.push_str(&self.header(note.span, Severity::Note, &note.message));
                out.push('\n');
            }
        }
        out
    }

    fn json_fixits<'d>(&self, fixits: &'d [FixIt]) -> Vec<JsonFixIt<'d>> {
        fixits
            .iter()
            .filter_map(|fixit| {
                let (line, start_column, end_column) = self.fixit_columns(fixit)?;
                Some(JsonFixIt {
                    line,
                    start_column,
                    end_column,
                    replacement: &fixit.replacement,
                })
            })
            .collect()
    }

    pub fn render_json(&self, diagnostics: &[Diagnostic]) -> Result<String, serde_json::Error> {
        let entries: Vec<JsonDiagnostic> = diagnostics
            .iter()
            .map(|diag| {
                let location = self.location(diag.span);
                JsonDiagnostic {
                    file: self.file,
                    severity: diag.severity,
                    category: diag.category,
                    message: &diag.message,
                    line: location.map(|info| info.line),
                    column: location.map(|info| info.column),
                    fixits: self.json_fixits(&diag.fixits),
                    notes: diag
                        .notes
                        .iter()
                        .map(|note| {
                            let location = self.location(note.span);
                            JsonNote {
                                message: &note.message,
                                line: location.map(|info| info.line),
                                column: location.map(|info| info.column),
                                fixits: self.json_fixits(&note.fixits),
                            }
                        })
                        .collect(),
                }
            })
            .collect();
        serde_json::to_string_pretty(&entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SOURCE: &str = "func f() {\n  let a: Int = b\n}\n";

    fn unwrap_error() -> Diagnostic {
        Diagnostic::error(Category::UnwrapRequired, Span::new(26, 27), "value not unwrapped")
            .with_fixits(vec![FixIt::insert(27, "!")])
            .with_notes(vec![Note {
                message: "use 'if let'".to_string(),
                span: Some(Span::new(13, 16)),
                fixits: vec![FixIt::replace(Span::new(13, 16), "if let")],
            }])
    }

    #[test]
    fn plain_output_carries_columns_and_fixits() {
        let emitter = Emitter::new("main.swift", SOURCE);
        let text = emitter.render_plain(&[unwrap_error()]);
        assert_eq!(
            text,
            "main.swift:2:16: error: value not unwrapped {17-17=!}\n\
             main.swift:2:3: note: use 'if let' {3-6=if let}\n"
        );
    }

    #[test]
    fn unlocated_diagnostics_name_only_the_file() {
        let emitter = Emitter::new("main.swift", SOURCE);
        let diag = Diagnostic::warning(Category::AnnotationResolution, None, "bad annotation");
        assert_eq!(emitter.render_plain(&[diag]), "main.swift: warning: bad annotation\n");
    }

    #[test]
    fn pretty_output_underlines_the_span() {
        let emitter = Emitter::new("main.swift", SOURCE);
        let text = emitter.render_pretty(&[unwrap_error()]);
        assert!(text.contains("2 |   let a: Int = b"), "{text}");
        assert!(text.contains("|                ^"), "{text}");
        assert!(text.contains("columns 17-17"), "{text}");
    }

    #[test]
    fn json_output_preserves_order() {
        let emitter = Emitter::new("main.swift", SOURCE);
        let diags = vec![
            unwrap_error(),
            Diagnostic::warning(Category::AnnotationResolution, None, "second"),
        ];
        let text = emitter.render_json(&diags).unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value[0]["category"], "unwrap-required");
        assert_eq!(value[0]["fixits"][0]["start_column"], 17);
        assert_eq!(value[1]["message"], "second");
        assert!(value[1]["line"].is_null());
    }
}
