use std::fmt;

use serde::Serialize;

use crate::ast::SourceSpan;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum DiagnosticKind {
    Syntax,
    DuplicateClass,
    InvalidProgramEntry,
    UnknownParentClass,
    InheritanceCycle,
    DuplicateSymbol,
    UndefinedSymbol,
    UndefinedMethod,
    ArityMismatch,
    TypeMismatch,
    InvalidOperandType,
    StaticDispatchViolation,
    IncomparableTypes,
}

impl DiagnosticKind {
    pub fn name(self) -> &'static str {
        match self {
            DiagnosticKind::Syntax => "Syntax",
            DiagnosticKind::DuplicateClass => "DuplicateClass",
            DiagnosticKind::InvalidProgramEntry => "InvalidProgramEntry",
            DiagnosticKind::UnknownParentClass => "UnknownParentClass",
            DiagnosticKind::InheritanceCycle => "InheritanceCycle",
            DiagnosticKind::DuplicateSymbol => "DuplicateSymbol",
            DiagnosticKind::UndefinedSymbol => "UndefinedSymbol",
            DiagnosticKind::UndefinedMethod => "UndefinedMethod",
            DiagnosticKind::ArityMismatch => "ArityMismatch",
            DiagnosticKind::TypeMismatch => "TypeMismatch",
            DiagnosticKind::InvalidOperandType => "InvalidOperandType",
            DiagnosticKind::StaticDispatchViolation => "StaticDispatchViolation",
            DiagnosticKind::IncomparableTypes => "IncomparableTypes",
        }
    }
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub message: String,
    pub span: Option<SourceSpan>,
}

#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    pub fn push<S: Into<String>>(&mut self, kind: DiagnosticKind, message: S) {
        self.push_with_span(kind, message, None);
    }

    pub fn push_with_span<S: Into<String>>(
        &mut self,
        kind: DiagnosticKind,
        message: S,
        span: Option<SourceSpan>,
    ) {
        self.entries.push(Diagnostic {
            kind,
            message: message.into(),
            span,
        });
    }

    pub fn extend(&mut self, other: Diagnostics) {
        self.entries.extend(other.entries);
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn entries(&self) -> &[Diagnostic] {
        &self.entries
    }

    pub fn count_of(&self, kind: DiagnosticKind) -> usize {
        self.entries
            .iter()
            .filter(|diagnostic| diagnostic.kind == kind)
            .count()
    }

    pub fn has_syntax_errors(&self) -> bool {
        self.count_of(DiagnosticKind::Syntax) > 0
    }
}
