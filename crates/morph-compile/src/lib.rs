//! Compilation of generated access-layer sources into a loadable binary
//! module.
//!
//! Every file of a [`CompilationUnit`] is parsed independently, symbols are
//! resolved across the whole unit against its [`ReferenceSet`], and the
//! result is lowered into a [`ModuleImage`] and encoded. Problems never
//! abort early: all diagnostics are collected and returned together.

mod cancel;
mod diagnostic;
pub mod image;
mod parse;
mod resolve;
mod unit;

pub use cancel::{CancelToken, CompileTask, spawn_compile};
pub use diagnostic::{Diagnostic, Location, Severity};
pub use image::{ImageError, ModuleImage};
pub use unit::{CompilationUnit, Export, ExportKind, LibraryRef, ReferenceSet};

use diagnostic::Diagnostics;
use std::fmt;
use thiserror::Error as ThisError;
use tracing::{debug, warn};

///
/// CompiledModule
///
/// Binary image plus every diagnostic produced while building it. The
/// binary is empty whenever an error diagnostic is present.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CompiledModule {
    bytes: Vec<u8>,
    diagnostics: Vec<Diagnostic>,
}

impl CompiledModule {
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    #[must_use]
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(Diagnostic::is_error)
    }

    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(|d| d.is_error())
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(|d| !d.is_error())
    }

    /// Turn a module carrying error diagnostics into an error.
    pub fn into_result(self) -> Result<Self, CompileDiagnosticError> {
        if self.has_errors() {
            Err(CompileDiagnosticError {
                diagnostics: self.diagnostics,
            })
        } else {
            Ok(self)
        }
    }
}

///
/// CompileDiagnosticError
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub struct CompileDiagnosticError {
    pub diagnostics: Vec<Diagnostic>,
}

impl CompileDiagnosticError {
    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(|d| d.is_error())
    }
}

impl fmt::Display for CompileDiagnosticError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let count = self.errors().count();
        write!(f, "compilation failed with {count} error(s)")?;
        for diagnostic in self.errors() {
            write!(f, "\n  {diagnostic}")?;
        }

        Ok(())
    }
}

/// Compile `unit` into a binary module.
#[must_use]
pub fn compile(unit: &CompilationUnit) -> CompiledModule {
    match run(unit, None) {
        Some(module) => module,
        None => unreachable!("compilation without a cancel token always completes"),
    }
}

/// Compile `unit`, giving up between stages once `token` is cancelled.
/// Returns `None` when cancelled.
#[must_use]
pub fn compile_cancellable(unit: &CompilationUnit, token: &CancelToken) -> Option<CompiledModule> {
    run(unit, Some(token))
}

fn run(unit: &CompilationUnit, cancel: Option<&CancelToken>) -> Option<CompiledModule> {
    let cancelled = || cancel.is_some_and(CancelToken::is_cancelled);
    let mut diags = Diagnostics::default();

    let mut parsed = Vec::with_capacity(unit.sources().len());
    for file in unit.sources().files() {
        if cancelled() {
            debug!("compilation cancelled during parsing");
            return None;
        }
        if let Some(file) = parse::parse_source(file, &mut diags) {
            parsed.push(file);
        }
    }

    if cancelled() {
        debug!("compilation cancelled before resolution");
        return None;
    }

    let digest = image::source_digest(
        unit.sources()
            .files()
            .iter()
            .map(|file| (file.name(), file.text())),
    );
    let resolved = resolve::Resolver::new(unit.references(), &mut diags).resolve(parsed, digest);

    let bytes = match resolved {
        Some(image) if !diags.has_errors() => match image::encode(&image) {
            Ok(bytes) => bytes,
            Err(e) => {
                diags.error(Location::unit(), e.to_string());
                Vec::new()
            }
        },
        _ => Vec::new(),
    };

    let module = CompiledModule {
        bytes,
        diagnostics: diags.into_vec(),
    };

    if module.has_errors() {
        warn!(
            errors = module.errors().count(),
            files = unit.sources().len(),
            "compilation failed"
        );
    } else {
        debug!(
            bytes = module.bytes.len(),
            warnings = module.warnings().count(),
            "compiled module"
        );
    }

    Some(module)
}

///
/// TESTS
///

#[cfg(test)]
mod tests;
