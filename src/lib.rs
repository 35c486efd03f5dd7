// src/lib.rs
//
// Middle-end of the Sable compiler: lazy, memoized semantic resolution of
// source and foreign-library declarations into a descriptor graph, and
// emission of one binary output unit per top-level binary name.
//
// The parser, the CLI and the low-level bytecode instruction writer are
// external collaborators; see `syntax::DeclarationProvider`,
// `foreign::ForeignClassFinder` and `codegen::ClassBuilderFactory` for the
// seams.

pub mod codegen;
pub mod descriptors;
pub mod errors;
pub mod foreign;
pub mod identity;
pub mod memo;
pub mod resolve;
pub mod syntax;
