// src/descriptors/mod.rs
//! The descriptor model: arena-stored nodes of the semantic graph.
//!
//! Construction of a descriptor never performs resolution work beyond what is
//! passed in; supertypes, member scopes, signatures and annotations live
//! behind write-once lazy slots forced by the resolution session.

pub mod arena;
pub mod substitute;
pub mod types;

pub use arena::{
    ClassData, ClassKind, ClassOrigin, ConstructorData, Descriptor, DescriptorArena,
    DescriptorId, DescriptorKind, FragmentData, FunctionData, ModuleData, PropertyData,
    ProviderTag, TypeParameterData,
};
pub use substitute::substitute;
pub use types::{Annotation, Param, Primitive, Signature, TypeRef, TypeSubstitution};
