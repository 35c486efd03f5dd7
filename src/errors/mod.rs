// src/errors/mod.rs
//! Structured error reporting for the Sable middle-end.
//!
//! User-program-class errors are accumulated through [`ErrorReporter`] and
//! rendered with miette; internal invariant violations abort the run with
//! full context instead.

pub mod report;
pub mod reporter;
pub mod resolve;

pub use report::{render_to_string, render_to_writer};
pub use reporter::{CollectingReporter, Diagnostic, ErrorReporter, Location};
pub use resolve::ResolveError;
