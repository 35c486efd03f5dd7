// src/errors/reporter.rs
//! The shared error-reporting collaborator.
//!
//! `report` never fails and never aborts; diagnostics accumulate for batch
//! surfacing after resolution finishes.

use std::cell::RefCell;
use std::fmt;
use std::path::PathBuf;

use super::resolve::ResolveError;

/// Where a diagnostic points: a source file, a fully-qualified name, or both.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Location {
    pub file: Option<PathBuf>,
    pub subject: Option<String>,
}

impl Location {
    pub fn name(subject: impl Into<String>) -> Self {
        Self {
            file: None,
            subject: Some(subject.into()),
        }
    }

    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self {
            file: Some(path.into()),
            subject: None,
        }
    }

    pub fn unknown() -> Self {
        Self::default()
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.file, &self.subject) {
            (Some(file), Some(subject)) => write!(f, "{} ({})", subject, file.display()),
            (Some(file), None) => write!(f, "{}", file.display()),
            (None, Some(subject)) => write!(f, "{subject}"),
            (None, None) => write!(f, "<unknown>"),
        }
    }
}

/// One reported diagnostic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub location: Location,
    pub error: ResolveError,
}

/// Error-reporting collaborator consumed by resolution.
///
/// Implementations must not fail; resolution continues for all other names
/// after a report.
pub trait ErrorReporter {
    fn report(&self, diagnostic: Diagnostic);
}

/// Accumulating reporter used by the compiler driver and tests.
#[derive(Debug, Default)]
pub struct CollectingReporter {
    collected: RefCell<Vec<Diagnostic>>,
}

impl CollectingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.collected.borrow().is_empty()
    }

    pub fn len(&self) -> usize {
        self.collected.borrow().len()
    }

    /// Snapshot of everything reported so far.
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.collected.borrow().clone()
    }

    /// Drain the accumulated diagnostics.
    pub fn take(&self) -> Vec<Diagnostic> {
        std::mem::take(&mut *self.collected.borrow_mut())
    }
}

impl ErrorReporter for CollectingReporter {
    fn report(&self, diagnostic: Diagnostic) {
        tracing::debug!(location = %diagnostic.location, error = %diagnostic.error, "reported");
        self.collected.borrow_mut().push(diagnostic);
    }
}
