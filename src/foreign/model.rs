// src/foreign/model.rs
//
// The reflection surface of the foreign binary library, as produced by a
// classpath lookup. Side-effect-free data; descriptors are built from it by
// the bridge's resolver services.

use std::cell::Cell;
use std::rc::Rc;

use rustc_hash::{FxHashMap, FxHashSet};
use thiserror::Error;

/// Annotation fq-name the emission stage stamps on its own output. A foreign
/// class carrying it is a compiled artifact of this compiler, not a foreign
/// symbol.
pub const COMPILED_ARTIFACT_MARKER: &str = "sable.runtime.SableCompiled";

/// A classpath entry that could not be read as valid binary class structure.
/// User-program-class: reported, never a halting condition.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("malformed class data for '{name}': {detail}")]
pub struct ForeignStructureError {
    pub name: String,
    pub detail: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForeignClassKind {
    Class,
    Interface,
    Enum,
    Annotation,
}

/// A type reference as it appears in foreign binary signatures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ForeignTypeRef {
    /// Platform primitive, by its foreign spelling ("int", "boolean", ...).
    Primitive(String),
    Named {
        name: String,
        args: Vec<ForeignTypeRef>,
    },
    Array(Box<ForeignTypeRef>),
    /// Reference to a type variable of the enclosing class or method.
    TypeVar(String),
}

impl ForeignTypeRef {
    pub fn named(name: impl Into<String>) -> Self {
        ForeignTypeRef::Named {
            name: name.into(),
            args: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignAnnotation {
    pub name: String,
    pub arguments: Vec<(String, String)>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignMethod {
    pub name: String,
    pub is_static: bool,
    pub is_abstract: bool,
    pub is_synthetic: bool,
    pub type_params: Vec<String>,
    pub params: Vec<(String, ForeignTypeRef)>,
    pub return_type: ForeignTypeRef,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignField {
    pub name: String,
    pub is_static: bool,
    pub is_final: bool,
    pub is_enum_constant: bool,
    pub ty: ForeignTypeRef,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignConstructor {
    pub params: Vec<(String, ForeignTypeRef)>,
}

/// One foreign binary class, already located on the classpath.
#[derive(Debug, Clone)]
pub struct ForeignClass {
    /// Fully-qualified dotted name (nested classes use their full path).
    pub fq: String,
    pub kind: ForeignClassKind,
    pub is_static: bool,
    pub is_abstract: bool,
    pub type_params: Vec<String>,
    pub supertypes: Vec<ForeignTypeRef>,
    pub constructors: Vec<ForeignConstructor>,
    pub methods: Vec<ForeignMethod>,
    pub fields: Vec<ForeignField>,
    pub nested: Vec<Rc<ForeignClass>>,
    pub annotations: Vec<ForeignAnnotation>,
}

impl ForeignClass {
    pub fn short_name(&self) -> &str {
        self.fq.rsplit('.').next().unwrap_or(&self.fq)
    }

    pub fn is_interface(&self) -> bool {
        self.kind == ForeignClassKind::Interface
    }

    pub fn has_annotation(&self, fq: &str) -> bool {
        self.annotations.iter().any(|ann| ann.name == fq)
    }
}

/// A foreign package handle: proof the package exists, plus its class names.
#[derive(Debug, Clone)]
pub struct ForeignPackage {
    pub fq: String,
    pub class_names: Vec<String>,
}

/// Classpath lookup collaborator. Side-effect-free and idempotent; `dispose`
/// releases any underlying file handles and must tolerate repeated calls.
pub trait ForeignClassFinder {
    fn find_package(&self, fq: &str) -> Option<ForeignPackage>;

    fn find_class(&self, fq: &str) -> Result<Option<Rc<ForeignClass>>, ForeignStructureError>;

    fn dispose(&self) {}
}

/// In-memory classpath index for tests and embedders.
#[derive(Debug, Default)]
pub struct MemoryClassIndex {
    classes: FxHashMap<String, Rc<ForeignClass>>,
    /// Names that answer `find_class` with a structural error.
    poisoned: FxHashSet<String>,
    probes: Cell<usize>,
    disposed: Cell<bool>,
}

impl MemoryClassIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a class and, recursively, its nested classes under
    /// `outer.Nested` names.
    pub fn insert(&mut self, class: Rc<ForeignClass>) {
        for nested in &class.nested {
            self.insert(nested.clone());
        }
        self.classes.insert(class.fq.clone(), class);
    }

    /// Make `find_class(fq)` fail with a structural error.
    pub fn poison(&mut self, fq: impl Into<String>) {
        self.poisoned.insert(fq.into());
    }

    /// Number of `find_package`/`find_class` probes answered so far.
    pub fn probes(&self) -> usize {
        self.probes.get()
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.get()
    }
}

impl ForeignClassFinder for MemoryClassIndex {
    fn find_package(&self, fq: &str) -> Option<ForeignPackage> {
        self.probes.set(self.probes.get() + 1);
        // Nested classes live under their outer class, not under a package of
        // the same spelling; a name that is itself a class is never a package.
        if self.classes.contains_key(fq) {
            return None;
        }
        let mut class_names: Vec<String> = self
            .classes
            .values()
            .filter(|class| {
                let Some(short) = class.fq.strip_suffix(class.short_name()) else {
                    return false;
                };
                let package = short.strip_suffix('.').unwrap_or(short);
                package == fq
            })
            .map(|class| class.short_name().to_string())
            .collect();
        if class_names.is_empty() {
            return None;
        }
        class_names.sort();
        Some(ForeignPackage {
            fq: fq.to_string(),
            class_names,
        })
    }

    fn find_class(&self, fq: &str) -> Result<Option<Rc<ForeignClass>>, ForeignStructureError> {
        self.probes.set(self.probes.get() + 1);
        if self.poisoned.contains(fq) {
            return Err(ForeignStructureError {
                name: fq.to_string(),
                detail: "unreadable class data".to_string(),
            });
        }
        Ok(self.classes.get(fq).cloned())
    }

    fn dispose(&self) {
        self.disposed.set(true);
    }
}

/// Convenience constructors for foreign fixtures.
pub mod build {
    use super::*;

    pub fn class(fq: &str, kind: ForeignClassKind) -> ForeignClass {
        ForeignClass {
            fq: fq.to_string(),
            kind,
            is_static: false,
            is_abstract: false,
            type_params: Vec::new(),
            supertypes: Vec::new(),
            constructors: Vec::new(),
            methods: Vec::new(),
            fields: Vec::new(),
            nested: Vec::new(),
            annotations: Vec::new(),
        }
    }

    pub fn method(name: &str, is_static: bool, return_type: ForeignTypeRef) -> ForeignMethod {
        ForeignMethod {
            name: name.to_string(),
            is_static,
            is_abstract: false,
            is_synthetic: false,
            type_params: Vec::new(),
            params: Vec::new(),
            return_type,
        }
    }

    pub fn field(name: &str, is_static: bool, ty: ForeignTypeRef) -> ForeignField {
        ForeignField {
            name: name.to_string(),
            is_static,
            is_final: false,
            is_enum_constant: false,
            ty,
        }
    }
}
