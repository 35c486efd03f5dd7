// src/errors/resolve.rs
//! Resolution errors (E3xxx).
//!
//! These are user-program-class: reported and accumulated, never a reason to
//! abort resolution of unrelated names.

use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Debug, Diagnostic, Clone, PartialEq, Eq)]
pub enum ResolveError {
    #[error("unresolved name '{name}'")]
    #[diagnostic(code(E3001))]
    UnresolvedName { name: String },

    #[error("malformed foreign class '{name}': {detail}")]
    #[diagnostic(
        code(E3002),
        help("the classpath entry could not be read as valid binary class structure")
    )]
    MalformedForeignClass { name: String, detail: String },

    #[error("ambiguous static members at '{name}'")]
    #[diagnostic(code(E3003))]
    StaticMembersAmbiguity { name: String },

    #[error("unresolved type '{name}' referenced by '{referrer}'")]
    #[diagnostic(code(E3004))]
    UnresolvedType { name: String, referrer: String },

    #[error("unresolved supertype '{name}' of '{class}'")]
    #[diagnostic(code(E3005))]
    UnresolvedSupertype { name: String, class: String },
}

impl ResolveError {
    /// Stable diagnostic code, for assertions and log correlation.
    pub fn code_string(&self) -> &'static str {
        match self {
            ResolveError::UnresolvedName { .. } => "E3001",
            ResolveError::MalformedForeignClass { .. } => "E3002",
            ResolveError::StaticMembersAmbiguity { .. } => "E3003",
            ResolveError::UnresolvedType { .. } => "E3004",
            ResolveError::UnresolvedSupertype { .. } => "E3005",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_match_variants() {
        let err = ResolveError::UnresolvedName {
            name: "a.b.Missing".to_string(),
        };
        assert_eq!(err.code_string(), "E3001");
        assert_eq!(err.to_string(), "unresolved name 'a.b.Missing'");
    }
}
