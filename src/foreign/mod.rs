// src/foreign/mod.rs
//! The foreign symbol bridge: turns classes of the pre-compiled foreign
//! library into descriptors on demand.
//!
//! Resolution is split across small services wired by the
//! [`crate::resolve::graph::ResolverGraph`]; all caches live in the session.

pub mod model;
pub mod resolvers;
pub mod statics;

pub use model::{
    ForeignAnnotation, ForeignClass, ForeignClassFinder, ForeignClassKind, ForeignConstructor,
    ForeignField, ForeignMethod, ForeignPackage, ForeignStructureError, ForeignTypeRef,
    MemoryClassIndex, COMPILED_ARTIFACT_MARKER,
};
pub use statics::{MemberExclusions, SamConverter, StaticMemberFilter, StaticMemberPolicy};
