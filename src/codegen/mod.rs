// src/codegen/mod.rs
//! The code emission stage: one binary output unit per binary name, with
//! provenance back to the contributing source files.

pub mod builder;
pub mod generate;
pub mod mapper;
pub mod package;
pub mod stage;

pub use builder::{
    ClassBuilder, ClassBuilderFactory, CollectingTracker, NullTracker, ProgressTracker,
    TextBuilderFactory, TextClassBuilder,
};
pub use generate::{emit_package, emit_packages};
pub use package::{PackageCodegen, PendingKind, PendingMember};
pub use stage::{EmissionStage, EmitError, OutputUnit};
