// src/resolve/mod.rs
//! The lazy resolution session and its service wiring.
//!
//! Given a fully-qualified name, the session produces the package fragment or
//! class descriptor for it, resolving on first access and returning the
//! cached object thereafter. Foreign cross-references are delegated to the
//! resolver services assembled by [`graph::ResolverGraph`].

pub mod force;
pub mod graph;
pub mod scope;
pub mod session;

pub use force::force_resolve_all_contents;
pub use graph::ResolverGraph;
pub use scope::{MemberKind, MemberScope, MemberSet, ScopeBacking, ScopeId, ScopeTable};
pub use session::{ResolveSession, SessionConfig};
