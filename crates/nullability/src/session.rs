//! One check run: import a module once, then check any number of sources
//! against it.

use crate::config::{NullcheckConfig, OutputFormat};
use crate::diag::{Category, Diagnostic, Emitter};
use crate::error::SessionError;
use crate::project::ImportedModule;
use crate::syntax::lexer::Lexer;
use crate::syntax::parser::Parser;
use crate::typeck::check_program;
use bumpalo::Bump;
use std::path::Path;

pub struct Session {
    module: ImportedModule,
    config: NullcheckConfig,
}

/// Diagnostics for a single source file, in the order they were produced.
#[derive(Debug)]
pub struct SourceReport {
    pub file: String,
    pub source: String,
    pub diagnostics: Vec<Diagnostic>,
}

impl SourceReport {
    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(Diagnostic::is_error)
    }

    pub fn render(&self, format: OutputFormat) -> Result<String, serde_json::Error> {
        Emitter::new(&self.file, &self.source).render(&self.diagnostics, format)
    }
}

impl Session {
    pub fn new(module: ImportedModule, config: NullcheckConfig) -> Self {
        Self { module, config }
    }

    pub fn open(manifest: &Path, config: NullcheckConfig) -> Result<Self, SessionError> {
        let module = ImportedModule::load(manifest, &config.resolve)?;
        Ok(Self::new(module, config))
    }

    pub fn module(&self) -> &ImportedModule {
        &self.module
    }

    pub fn config(&self) -> &NullcheckConfig {
        &self.config
    }

    /// Annotation problems found while importing, as unlocated warnings.
    pub fn import_diagnostics(&self) -> Vec<Diagnostic> {
        self.module
            .issues()
            .iter()
            .map(|issue| {
                Diagnostic::warning(
                    Category::AnnotationResolution,
                    None,
                    format!("{} (treated as unspecified)", issue),
                )
            })
            .collect()
    }

    pub fn check_source(&self, file: &str, source: &str) -> SourceReport {
        let arena = Bump::new();
        let mut parser = Parser::new(Lexer::new(source.as_bytes()), &arena);
        let program = parser.parse_program();

        let mut diagnostics: Vec<Diagnostic> = program
            .errors
            .iter()
            .map(|err| Diagnostic::error(Category::Syntax, err.span, err.message.clone()))
            .collect();
        diagnostics.extend(check_program(&program, &self.module, &self.config.check));
        diagnostics.sort_by_key(|diag| diag.span.map(|span| span.start));

        tracing::debug!("{file}: {} diagnostics", diagnostics.len());
        SourceReport {
            file: file.to_string(),
            source: source.to_string(),
            diagnostics,
        }
    }

    pub fn check_file(&self, path: &Path) -> Result<SourceReport, SessionError> {
        let source = std::fs::read_to_string(path).map_err(|source| SessionError::Source {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(self.check_source(&path.display().to_string(), &source))
    }
}
