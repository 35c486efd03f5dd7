// src/codegen/stage.rs
//
// The emission stage: the binary-name to output-unit map and its lifecycle.
// Exactly one unit exists per binary name no matter how many call sites
// request a builder for it; finalization happens once, implicitly before the
// first render.

use std::path::PathBuf;
use std::rc::Rc;

use miette::Diagnostic;
use rustc_hash::FxHashMap;
use thiserror::Error;

use crate::descriptors::{DescriptorId, TypeRef};
use crate::identity::NameId;
use crate::resolve::session::ResolveSession;
use crate::syntax::SourceFile;

use super::builder::{ClassBuilder, ClassBuilderFactory, ProgressTracker};
use super::mapper;
use super::package::{PackageCodegen, PendingMember};

/// Caller-facing emission failures: nothing to render under that name. An
/// internal-invariant breach panics instead.
#[derive(Error, Debug, Diagnostic, Clone, PartialEq, Eq)]
pub enum EmitError {
    #[error("unknown output '{name}'")]
    #[diagnostic(code(E4001))]
    UnknownOutput { name: String },
}

/// One binary output container plus its provenance.
pub struct OutputUnit {
    binary_name: String,
    builder: Box<dyn ClassBuilder>,
    /// On-disk paths of the contributing source files. Synthetic files have
    /// no path and are not recorded.
    source_files: Vec<PathBuf>,
}

impl OutputUnit {
    pub fn binary_name(&self) -> &str {
        &self.binary_name
    }

    pub fn source_files(&self) -> &[PathBuf] {
        &self.source_files
    }
}

pub struct EmissionStage {
    factory: Box<dyn ClassBuilderFactory>,
    tracker: Box<dyn ProgressTracker>,
    units: Vec<OutputUnit>,
    by_name: FxHashMap<String, usize>,
    packages: FxHashMap<NameId, PackageCodegen>,
    package_order: Vec<NameId>,
    done: bool,
}

impl EmissionStage {
    pub fn new(factory: Box<dyn ClassBuilderFactory>, tracker: Box<dyn ProgressTracker>) -> Self {
        Self {
            factory,
            tracker,
            units: Vec::new(),
            by_name: FxHashMap::default(),
            packages: FxHashMap::default(),
            package_order: Vec::new(),
            done: false,
        }
    }

    /// Register an output unit if absent and return its index. First
    /// registration wins, for identity and for the recorded file set alike;
    /// later requests return the existing unit untouched. Files without a
    /// backing path are excluded from provenance.
    pub fn acquire_builder(&mut self, binary_name: &str, sources: &[Rc<SourceFile>]) -> usize {
        if let Some(&unit) = self.by_name.get(binary_name) {
            return unit;
        }
        let source_files: Vec<PathBuf> = sources
            .iter()
            .filter_map(|file| file.path.clone())
            .collect();
        self.tracker.report_output(&source_files, binary_name);
        tracing::debug!(output = binary_name, files = source_files.len(), "registered output unit");
        let unit = self.units.len();
        self.units.push(OutputUnit {
            binary_name: binary_name.to_string(),
            builder: self.factory.new_builder(),
            source_files,
        });
        self.by_name.insert(binary_name.to_string(), unit);
        unit
    }

    pub fn builder_mut(&mut self, unit: usize) -> &mut dyn ClassBuilder {
        self.units[unit].builder.as_mut()
    }

    /// The unit backing a resolved type's binary representation. Primitive
    /// and other non-class types have none; requesting one is a caller bug.
    pub fn unit_for_type(
        &mut self,
        session: &ResolveSession,
        ty: &TypeRef,
        file: &Rc<SourceFile>,
    ) -> usize {
        let binary_name = match ty {
            TypeRef::Class { class, .. } => mapper::class_unit_name(session, *class),
            other => panic!(
                "codegen for type {} is not possible",
                mapper::type_text(session, other)
            ),
        };
        self.acquire_builder(&binary_name, std::slice::from_ref(file))
    }

    pub fn for_class_implementation(
        &mut self,
        session: &ResolveSession,
        class: DescriptorId,
        file: &Rc<SourceFile>,
    ) -> usize {
        self.unit_for_type(session, &TypeRef::class(class), file)
    }

    /// The default-implementation unit of a trait: a distinct binary name
    /// from the trait's own unit.
    pub fn for_trait_defaults(
        &mut self,
        session: &ResolveSession,
        class: DescriptorId,
        file: &Rc<SourceFile>,
    ) -> usize {
        let binary_name = mapper::trait_defaults_name(session, class);
        self.acquire_builder(&binary_name, std::slice::from_ref(file))
    }

    /// The package-members unit of a package, created on first request.
    pub fn for_package(
        &mut self,
        session: &ResolveSession,
        fq: NameId,
        sources: &[Rc<SourceFile>],
    ) -> usize {
        if let Some(codegen) = self.packages.get(&fq) {
            return codegen.unit();
        }
        let binary_name = mapper::package_unit_name(session, fq);
        let unit = self.acquire_builder(&binary_name, sources);
        self.packages.insert(fq, PackageCodegen::new(unit, binary_name));
        self.package_order.push(fq);
        unit
    }

    /// Queue a top-level member for the package's unit. The package codegen
    /// must already exist; a missing one is a driver bug.
    pub fn add_package_member(&mut self, fq: NameId, member: PendingMember) {
        match self.packages.get_mut(&fq) {
            Some(codegen) => codegen.push(member),
            None => panic!("no package codegen registered for name #{}", fq.index()),
        }
    }

    /// Complete every package-level generator. Idempotent; implicitly run by
    /// the first render or listing.
    pub fn finalize_all(&mut self) {
        if self.done {
            return;
        }
        self.done = true;
        for fq in self.package_order.clone() {
            let Some(codegen) = self.packages.get_mut(&fq) else {
                continue;
            };
            let unit = codegen.unit();
            codegen.finalize(self.units[unit].builder.as_mut());
        }
    }

    pub fn render(&mut self, binary_name: &str) -> Result<String, EmitError> {
        self.finalize_all();
        let unit = self.lookup(binary_name)?;
        Ok(self.factory.as_text(self.units[unit].builder.as_ref()))
    }

    pub fn render_bytes(&mut self, binary_name: &str) -> Result<Vec<u8>, EmitError> {
        self.finalize_all();
        let unit = self.lookup(binary_name)?;
        Ok(self.factory.as_bytes(self.units[unit].builder.as_ref()))
    }

    /// All registered binary names, in first-registration order.
    pub fn list_outputs(&mut self) -> Vec<String> {
        self.finalize_all();
        self.units
            .iter()
            .map(|unit| unit.binary_name.clone())
            .collect()
    }

    /// Contributing source paths recorded for a unit. Asking for a name that
    /// was never registered is a fatal lookup error, distinct from the
    /// recoverable unknown-output render failure.
    pub fn source_files_for(&self, binary_name: &str) -> &[PathBuf] {
        match self.by_name.get(binary_name) {
            Some(&unit) => &self.units[unit].source_files,
            None => panic!("no record for binary output '{binary_name}'"),
        }
    }

    fn lookup(&self, binary_name: &str) -> Result<usize, EmitError> {
        self.by_name
            .get(binary_name)
            .copied()
            .ok_or_else(|| EmitError::UnknownOutput {
                name: binary_name.to_string(),
            })
    }
}
