use derive_more::Display;
use std::fmt;

///
/// Severity
///

#[derive(Clone, Copy, Debug, Display, Eq, Ord, PartialEq, PartialOrd)]
pub enum Severity {
    #[display("warning")]
    Warning,
    #[display("error")]
    Error,
}

///
/// Location
///
/// 1-based line and column inside one source file. Unit-level problems
/// (for example a missing accessor) use line 0.
///

#[derive(Clone, Debug, Eq, Ord, PartialEq, PartialOrd)]
pub struct Location {
    pub file: String,
    pub line: usize,
    pub column: usize,
}

impl Location {
    #[must_use]
    pub fn new(file: impl Into<String>, line: usize, column: usize) -> Self {
        Self {
            file: file.into(),
            line,
            column,
        }
    }

    /// Location for problems that belong to the whole unit.
    #[must_use]
    pub fn unit() -> Self {
        Self::new("<unit>", 0, 0)
    }

    /// Convert a span start into a location in `file`.
    pub(crate) fn from_span(file: &str, span: proc_macro2::Span) -> Self {
        let start = span.start();

        Self::new(file, start.line, start.column + 1)
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.line == 0 {
            write!(f, "{}", self.file)
        } else {
            write!(f, "{}:{}:{}", self.file, self.line, self.column)
        }
    }
}

///
/// Diagnostic
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub location: Location,
    pub message: String,
}

impl Diagnostic {
    #[must_use]
    pub fn error(location: Location, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            location,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn warning(location: Location, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            location,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}: {}", self.location, self.severity, self.message)
    }
}

///
/// Diagnostics
///
/// Ordered collector used while compiling one unit.
///

#[derive(Debug, Default)]
pub(crate) struct Diagnostics {
    items: Vec<Diagnostic>,
}

impl Diagnostics {
    pub(crate) fn error(&mut self, location: Location, message: impl Into<String>) {
        self.items.push(Diagnostic::error(location, message));
    }

    pub(crate) fn warning(&mut self, location: Location, message: impl Into<String>) {
        self.items.push(Diagnostic::warning(location, message));
    }

    pub(crate) fn has_errors(&self) -> bool {
        self.items.iter().any(Diagnostic::is_error)
    }

    pub(crate) fn into_vec(self) -> Vec<Diagnostic> {
        self.items
    }
}
