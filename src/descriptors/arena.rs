// src/descriptors/arena.rs
//
// Arena storage for descriptor nodes. Ids are indices; the arena never
// removes a node, so ids stay valid for the session's lifetime and callers
// may compare descriptors by id for identity.

use std::rc::Rc;

use crate::foreign::model::ForeignClass;
use crate::identity::{NameId, NameTable};
use crate::memo::{OnceSlot, ResolveState};
use crate::resolve::scope::ScopeId;
use crate::syntax::{RawClass, RawConstructor, RawFunction, RawProperty, SourceFile};

use super::types::{Annotation, Param, Signature, TypeRef};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DescriptorId(u32);

impl DescriptorId {
    pub fn index(self) -> u32 {
        self.0
    }

    pub fn from_index(index: u32) -> Self {
        DescriptorId(index)
    }
}

/// Which fragment provider contributed a package fragment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderTag {
    Source,
    /// Index into the foreign finder registration order.
    Foreign(usize),
}

#[derive(Debug, Clone)]
pub struct ModuleData {
    pub default_imports: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct FragmentData {
    pub fq: NameId,
    pub provider: ProviderTag,
    pub scope: OnceSlot<ScopeId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassKind {
    Class,
    Interface,
    Enum,
}

#[derive(Debug, Clone)]
pub enum ClassOrigin {
    Source {
        raw: Rc<RawClass>,
        file: Rc<SourceFile>,
    },
    Foreign(Rc<ForeignClass>),
    Substituted {
        original: DescriptorId,
    },
}

#[derive(Debug, Clone)]
pub struct ClassData {
    pub fq: NameId,
    pub kind: ClassKind,
    pub origin: ClassOrigin,
    pub type_params: Vec<DescriptorId>,
    pub supertypes: OnceSlot<Vec<TypeRef>>,
    pub supertypes_state: ResolveState,
    pub scope: OnceSlot<ScopeId>,
    pub annotations: OnceSlot<Vec<Annotation>>,
    pub annotations_state: ResolveState,
    /// Whether the class is an interface eligible for function-literal
    /// conversion.
    pub sam_eligible: OnceSlot<bool>,
}

impl ClassData {
    pub fn new(fq: NameId, kind: ClassKind, origin: ClassOrigin) -> Self {
        Self {
            fq,
            kind,
            origin,
            type_params: Vec::new(),
            supertypes: OnceSlot::empty(),
            supertypes_state: ResolveState::NotStarted,
            scope: OnceSlot::empty(),
            annotations: OnceSlot::empty(),
            annotations_state: ResolveState::NotStarted,
            sam_eligible: OnceSlot::empty(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct FunctionData {
    pub type_params: Vec<DescriptorId>,
    pub signature: OnceSlot<Signature>,
    pub signature_state: ResolveState,
    pub is_static: bool,
    pub is_abstract: bool,
    pub has_body: bool,
    /// Present for source-declared functions only.
    pub raw: Option<Rc<RawFunction>>,
    /// Set on substituted copies.
    pub original: Option<DescriptorId>,
}

#[derive(Debug, Clone)]
pub struct PropertyData {
    pub ty: OnceSlot<TypeRef>,
    pub ty_state: ResolveState,
    pub is_mutable: bool,
    pub is_static: bool,
    pub raw: Option<Rc<RawProperty>>,
    pub original: Option<DescriptorId>,
}

#[derive(Debug, Clone)]
pub struct ConstructorData {
    pub params: OnceSlot<Vec<Param>>,
    pub params_state: ResolveState,
    pub raw: Option<Rc<RawConstructor>>,
    pub original: Option<DescriptorId>,
}

#[derive(Debug, Clone)]
pub struct TypeParameterData {
    pub index: usize,
}

#[derive(Debug, Clone)]
pub enum DescriptorKind {
    Module(ModuleData),
    PackageFragment(FragmentData),
    Class(ClassData),
    Function(FunctionData),
    Property(PropertyData),
    Constructor(ConstructorData),
    TypeParameter(TypeParameterData),
}

impl DescriptorKind {
    pub fn kind_name(&self) -> &'static str {
        match self {
            DescriptorKind::Module(_) => "module",
            DescriptorKind::PackageFragment(_) => "package fragment",
            DescriptorKind::Class(_) => "class",
            DescriptorKind::Function(_) => "function",
            DescriptorKind::Property(_) => "property",
            DescriptorKind::Constructor(_) => "constructor",
            DescriptorKind::TypeParameter(_) => "type parameter",
        }
    }
}

/// One node of the semantic graph. Every descriptor except the module has
/// exactly one containing declaration.
#[derive(Debug, Clone)]
pub struct Descriptor {
    pub name: String,
    pub containing: Option<DescriptorId>,
    pub kind: DescriptorKind,
}

#[derive(Debug, Default)]
pub struct DescriptorArena {
    nodes: Vec<Descriptor>,
}

impl DescriptorArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alloc(&mut self, descriptor: Descriptor) -> DescriptorId {
        debug_assert!(
            descriptor.containing.is_some()
                || matches!(descriptor.kind, DescriptorKind::Module(_)),
            "only the module descriptor may lack a containing declaration"
        );
        let id = DescriptorId(self.nodes.len() as u32);
        tracing::trace!(
            id = id.index(),
            kind = descriptor.kind.kind_name(),
            name = %descriptor.name,
            "alloc descriptor"
        );
        self.nodes.push(descriptor);
        id
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, id: DescriptorId) -> &Descriptor {
        &self.nodes[id.0 as usize]
    }

    pub fn get_mut(&mut self, id: DescriptorId) -> &mut Descriptor {
        &mut self.nodes[id.0 as usize]
    }

    pub fn name(&self, id: DescriptorId) -> &str {
        &self.get(id).name
    }

    pub fn containing(&self, id: DescriptorId) -> Option<DescriptorId> {
        self.get(id).containing
    }

    /// Dotted path of the descriptor for error messages, climbing the
    /// containing chain.
    pub fn path(&self, names: &NameTable, id: DescriptorId) -> String {
        match &self.get(id).kind {
            DescriptorKind::Class(class) => names.display(class.fq).to_string(),
            DescriptorKind::PackageFragment(fragment) => names.display(fragment.fq).to_string(),
            _ => match self.containing(id) {
                Some(parent) => {
                    let prefix = self.path(names, parent);
                    if prefix.is_empty() {
                        self.name(id).to_string()
                    } else {
                        format!("{}.{}", prefix, self.name(id))
                    }
                }
                None => self.name(id).to_string(),
            },
        }
    }

    fn expected(&self, id: DescriptorId, expected: &str) -> ! {
        panic!(
            "expected {expected} descriptor at #{}, found {} '{}'",
            id.0,
            self.get(id).kind.kind_name(),
            self.get(id).name
        );
    }

    pub fn module(&self, id: DescriptorId) -> &ModuleData {
        match &self.get(id).kind {
            DescriptorKind::Module(data) => data,
            _ => self.expected(id, "module"),
        }
    }

    pub fn fragment(&self, id: DescriptorId) -> &FragmentData {
        match &self.get(id).kind {
            DescriptorKind::PackageFragment(data) => data,
            _ => self.expected(id, "package fragment"),
        }
    }

    pub fn fragment_mut(&mut self, id: DescriptorId) -> &mut FragmentData {
        if !matches!(self.get(id).kind, DescriptorKind::PackageFragment(_)) {
            self.expected(id, "package fragment");
        }
        match &mut self.nodes[id.0 as usize].kind {
            DescriptorKind::PackageFragment(data) => data,
            _ => unreachable!(),
        }
    }

    pub fn class(&self, id: DescriptorId) -> &ClassData {
        match &self.get(id).kind {
            DescriptorKind::Class(data) => data,
            _ => self.expected(id, "class"),
        }
    }

    pub fn class_mut(&mut self, id: DescriptorId) -> &mut ClassData {
        if !matches!(self.get(id).kind, DescriptorKind::Class(_)) {
            self.expected(id, "class");
        }
        match &mut self.nodes[id.0 as usize].kind {
            DescriptorKind::Class(data) => data,
            _ => unreachable!(),
        }
    }

    pub fn is_class(&self, id: DescriptorId) -> bool {
        matches!(self.get(id).kind, DescriptorKind::Class(_))
    }

    pub fn function(&self, id: DescriptorId) -> &FunctionData {
        match &self.get(id).kind {
            DescriptorKind::Function(data) => data,
            _ => self.expected(id, "function"),
        }
    }

    pub fn function_mut(&mut self, id: DescriptorId) -> &mut FunctionData {
        if !matches!(self.get(id).kind, DescriptorKind::Function(_)) {
            self.expected(id, "function");
        }
        match &mut self.nodes[id.0 as usize].kind {
            DescriptorKind::Function(data) => data,
            _ => unreachable!(),
        }
    }

    pub fn property(&self, id: DescriptorId) -> &PropertyData {
        match &self.get(id).kind {
            DescriptorKind::Property(data) => data,
            _ => self.expected(id, "property"),
        }
    }

    pub fn property_mut(&mut self, id: DescriptorId) -> &mut PropertyData {
        if !matches!(self.get(id).kind, DescriptorKind::Property(_)) {
            self.expected(id, "property");
        }
        match &mut self.nodes[id.0 as usize].kind {
            DescriptorKind::Property(data) => data,
            _ => unreachable!(),
        }
    }

    pub fn constructor(&self, id: DescriptorId) -> &ConstructorData {
        match &self.get(id).kind {
            DescriptorKind::Constructor(data) => data,
            _ => self.expected(id, "constructor"),
        }
    }

    pub fn constructor_mut(&mut self, id: DescriptorId) -> &mut ConstructorData {
        if !matches!(self.get(id).kind, DescriptorKind::Constructor(_)) {
            self.expected(id, "constructor");
        }
        match &mut self.nodes[id.0 as usize].kind {
            DescriptorKind::Constructor(data) => data,
            _ => unreachable!(),
        }
    }

    pub fn type_parameter(&self, id: DescriptorId) -> &TypeParameterData {
        match &self.get(id).kind {
            DescriptorKind::TypeParameter(data) => data,
            _ => self.expected(id, "type parameter"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn module(arena: &mut DescriptorArena) -> DescriptorId {
        arena.alloc(Descriptor {
            name: "<main>".to_string(),
            containing: None,
            kind: DescriptorKind::Module(ModuleData {
                default_imports: vec![],
            }),
        })
    }

    #[test]
    fn alloc_and_typed_access() {
        let mut names = NameTable::new();
        let mut arena = DescriptorArena::new();
        let module = module(&mut arena);
        let fq = names.intern("a.B");
        let class = arena.alloc(Descriptor {
            name: "B".to_string(),
            containing: Some(module),
            kind: DescriptorKind::Class(ClassData::new(
                fq,
                ClassKind::Class,
                ClassOrigin::Substituted { original: module },
            )),
        });
        assert_eq!(arena.class(class).fq, fq);
        assert_eq!(arena.path(&names, class), "a.B");
        assert_eq!(arena.containing(class), Some(module));
    }

    #[test]
    #[should_panic(expected = "expected class descriptor")]
    fn wrong_kind_access_is_fatal() {
        let mut arena = DescriptorArena::new();
        let module = module(&mut arena);
        arena.class(module);
    }
}
