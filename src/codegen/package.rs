// src/codegen/package.rs
//
// Per-package code generator. Top-level functions and properties accumulate
// as pending members while the driver walks source files; the package's
// output unit is written in one pass at finalize.

use crate::foreign::model::COMPILED_ARTIFACT_MARKER;

use super::builder::ClassBuilder;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PendingKind {
    Method,
    Field,
}

/// One already-lowered top-level member awaiting emission.
#[derive(Debug, Clone)]
pub struct PendingMember {
    pub kind: PendingKind,
    pub name: String,
    /// Rendered signature descriptor or field type.
    pub descriptor: String,
}

/// Accumulates a package's top-level members and writes them at finalize.
#[derive(Debug)]
pub struct PackageCodegen {
    unit: usize,
    binary_name: String,
    pending: Vec<PendingMember>,
    finalized: bool,
}

impl PackageCodegen {
    pub fn new(unit: usize, binary_name: String) -> Self {
        Self {
            unit,
            binary_name,
            pending: Vec::new(),
            finalized: false,
        }
    }

    pub fn unit(&self) -> usize {
        self.unit
    }

    pub fn push(&mut self, member: PendingMember) {
        if self.finalized {
            panic!("pending member added to finalized package unit {}", self.binary_name);
        }
        self.pending.push(member);
    }

    /// Write every pending member into the unit's builder. A second call is
    /// a no-op.
    pub fn finalize(&mut self, builder: &mut dyn ClassBuilder) {
        if self.finalized {
            return;
        }
        self.finalized = true;
        tracing::debug!(unit = %self.binary_name, members = self.pending.len(), "finalizing package unit");
        builder.begin_class(&self.binary_name, "package");
        builder.annotate(COMPILED_ARTIFACT_MARKER);
        for member in &self.pending {
            match member.kind {
                PendingKind::Method => builder.declare_method(&member.name, &member.descriptor),
                PendingKind::Field => builder.declare_field(&member.name, &member.descriptor),
            }
        }
        builder.end_class();
    }
}
