// src/resolve/session.rs
//
// The lazy resolution session. All descriptor state, name interning, scope
// storage, and memoization caches live here; the stateless resolver services
// of the wiring graph borrow the session per call. Every cached answer is
// identity-stable for the session's lifetime.

use std::rc::Rc;

use rustc_hash::{FxHashMap, FxHashSet};
use smallvec::SmallVec;

use crate::descriptors::{
    Annotation, ClassData, ClassKind, ClassOrigin, ConstructorData, Descriptor, DescriptorArena,
    DescriptorId, DescriptorKind, FragmentData, FunctionData, ModuleData, Param, Primitive,
    PropertyData, ProviderTag, Signature, TypeRef,
};
use crate::errors::{Location, ResolveError};
use crate::foreign::resolvers::TypeVars;
use crate::identity::{NameId, NameTable};
use crate::memo::{OnceSlot, ResolveState};
use crate::syntax::{
    DeclarationProvider, RawClass, RawClassKind, RawDeclaration, RawFunction, RawProperty,
    RawTypeName, SourceFile,
};

use super::graph::ResolverGraph;
use super::scope::{MemberKind, MemberSet, ScopeBacking, ScopeId, ScopeTable};

/// All fragments registered for one package name, in provider precedence
/// order: the first entry is canonical.
pub type FragmentSet = SmallVec<[DescriptorId; 1]>;

/// Module-level knobs fixed at session creation.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub module_name: String,
    /// Packages consulted when a short type name does not resolve in its own
    /// package.
    pub default_imports: Vec<String>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            module_name: "<main>".to_string(),
            default_imports: vec!["sable.lang".to_string()],
        }
    }
}

pub struct ResolveSession {
    pub names: NameTable,
    pub arena: DescriptorArena,
    pub scopes: ScopeTable,
    module: DescriptorId,
    source: Rc<dyn DeclarationProvider>,
    fragments: FxHashMap<NameId, FragmentSet>,
    fragment_order: Vec<DescriptorId>,
    fragment_providers: FxHashSet<(NameId, ProviderTag)>,
    /// Package names known to have no backing declaration anywhere.
    unresolved: FxHashSet<NameId>,
    source_classes: FxHashMap<NameId, DescriptorId>,
    foreign_classes: FxHashMap<NameId, DescriptorId>,
    /// Class names every finder has already declined.
    unresolved_classes: FxHashSet<NameId>,
}

impl ResolveSession {
    pub fn new(source: Rc<dyn DeclarationProvider>, config: SessionConfig) -> Self {
        let names = NameTable::new();
        let mut arena = DescriptorArena::new();
        let module = arena.alloc(Descriptor {
            name: config.module_name,
            containing: None,
            kind: DescriptorKind::Module(ModuleData {
                default_imports: config.default_imports,
            }),
        });
        Self {
            names,
            arena,
            scopes: ScopeTable::new(),
            module,
            source,
            fragments: FxHashMap::default(),
            fragment_order: Vec::new(),
            fragment_providers: FxHashSet::default(),
            unresolved: FxHashSet::default(),
            source_classes: FxHashMap::default(),
            foreign_classes: FxHashMap::default(),
            unresolved_classes: FxHashSet::default(),
        }
    }

    pub fn module(&self) -> DescriptorId {
        self.module
    }

    pub fn source(&self) -> &Rc<dyn DeclarationProvider> {
        &self.source
    }

    // --- identity caches used by the foreign bridge -------------------------

    pub fn foreign_class_cached(&self, fq: NameId) -> Option<DescriptorId> {
        self.foreign_classes.get(&fq).copied()
    }

    pub fn cache_foreign_class(&mut self, fq: NameId, id: DescriptorId) {
        if self.foreign_classes.insert(fq, id).is_some() {
            panic!("rewrite at {}", self.names.display(fq));
        }
    }

    pub fn is_unresolved_class(&self, fq: NameId) -> bool {
        self.unresolved_classes.contains(&fq)
    }

    pub fn mark_unresolved_class(&mut self, fq: NameId) {
        self.unresolved_classes.insert(fq);
    }

    pub fn is_unresolved_package(&self, fq: NameId) -> bool {
        self.unresolved.contains(&fq)
    }

    /// Every fragment registered so far, in registration order.
    pub fn registered_fragments(&self) -> Vec<DescriptorId> {
        self.fragment_order.clone()
    }

    // --- package fragments --------------------------------------------------

    /// All fragments for the package, resolving on first request.
    ///
    /// Providers are probed in precedence order: source declarations, then
    /// each foreign finder's packages in registration order. Only when no
    /// provider claims the package is the static-members namespace of a
    /// like-named foreign class considered. A package nobody answers for is
    /// reported once, recorded, and fails fast on every later request.
    pub fn package_fragments(&mut self, graph: &ResolverGraph, fq: NameId) -> FragmentSet {
        if self.unresolved.contains(&fq) {
            return FragmentSet::new();
        }
        if let Some(cached) = self.fragments.get(&fq) {
            return cached.clone();
        }

        let mut found = FragmentSet::new();
        let dotted = self.names.display(fq).to_string();
        if self.source.package_exists(&dotted) {
            found.push(self.create_fragment(
                fq,
                ProviderTag::Source,
                ScopeBacking::SourcePackage { package: fq },
            ));
        }
        for finder in graph.fragments.find_packages(self, graph, fq) {
            found.push(self.create_fragment(
                fq,
                ProviderTag::Foreign(finder),
                ScopeBacking::ForeignPackage {
                    package: fq,
                    finder,
                },
            ));
        }
        if found.is_empty() {
            if let Some((finder, class)) = graph.fragments.find_statics(self, graph, fq) {
                found.push(self.create_fragment(
                    fq,
                    ProviderTag::Foreign(finder),
                    ScopeBacking::ForeignStatics { class },
                ));
            }
        }
        if found.is_empty() {
            tracing::debug!(package = %dotted, "package has no fragments");
            graph.report(
                Location::name(dotted.as_str()),
                ResolveError::UnresolvedName { name: dotted },
            );
            self.unresolved.insert(fq);
            return found;
        }
        self.fragments.insert(fq, found.clone());
        found
    }

    /// The canonical fragment for the package, if any provider claims it.
    pub fn package_fragment(&mut self, graph: &ResolverGraph, fq: NameId) -> Option<DescriptorId> {
        self.package_fragments(graph, fq).first().copied()
    }

    /// Pre-register a fragment outside the normal provider probe, for
    /// synthesized packages. Registering over an already-resolved name is a
    /// fatal invariant violation.
    pub fn register_fragment(
        &mut self,
        fq: NameId,
        provider: ProviderTag,
        backing: ScopeBacking,
    ) -> DescriptorId {
        if self.fragments.contains_key(&fq) {
            panic!("rewrite at {}", self.names.display(fq));
        }
        let id = self.create_fragment(fq, provider, backing);
        self.fragments.insert(fq, FragmentSet::from_slice(&[id]));
        id
    }

    fn create_fragment(
        &mut self,
        fq: NameId,
        provider: ProviderTag,
        backing: ScopeBacking,
    ) -> DescriptorId {
        if !self.fragment_providers.insert((fq, provider)) {
            panic!("rewrite at {}", self.names.display(fq));
        }
        let short = self.names.short_name(fq).to_string();
        let id = self.arena.alloc(Descriptor {
            name: short,
            containing: Some(self.module),
            kind: DescriptorKind::PackageFragment(FragmentData {
                fq,
                provider,
                scope: OnceSlot::empty(),
            }),
        });
        let scope = self.scopes.alloc(id, backing);
        let what = format!("scope of package fragment {}", self.names.display(fq));
        self.arena.fragment_mut(id).scope.set(scope, what);
        self.fragment_order.push(id);
        tracing::debug!(package = %self.names.display(fq), ?provider, "created package fragment");
        id
    }

    pub fn fragment_scope(&self, fragment: DescriptorId) -> ScopeId {
        let data = self.arena.fragment(fragment);
        let what = format!("scope of package fragment {}", self.names.display(data.fq));
        *data.scope.demand(what)
    }

    // --- classes ------------------------------------------------------------

    /// Resolve a class by fully-qualified name. Source declarations always
    /// shadow foreign classes of the same name.
    pub fn class_by_name(&mut self, graph: &ResolverGraph, fq: NameId) -> Option<DescriptorId> {
        if let Some(&id) = self.source_classes.get(&fq) {
            return Some(id);
        }
        let parent = self.names.parent(fq).unwrap_or_else(|| self.names.root());
        let package = self.names.display(parent).to_string();
        let short = self.names.short_name(fq).to_string();
        let source = self.source.clone();
        for decl in source.declarations_in(&package, &short) {
            if let RawDeclaration::Class(raw) = decl {
                let Some(file) = source.file_of(&package, &short) else {
                    continue;
                };
                let containing = self
                    .package_fragment(graph, parent)
                    .unwrap_or(self.module);
                return Some(self.resolve_source_class(graph, fq, &raw, file, containing));
            }
        }
        // The parent segment may itself be a source class with this name
        // nested inside it.
        if !self.names.is_root(parent) {
            if let Some(&outer) = self.source_classes.get(&parent) {
                let scope = self.class_scope(outer);
                if let Some(&id) = self.member(graph, scope, &short, MemberKind::Class).first() {
                    return Some(id);
                }
            }
        }
        graph.classes.resolve_by_name(self, graph, fq)
    }

    pub fn resolve_source_class(
        &mut self,
        graph: &ResolverGraph,
        fq: NameId,
        raw: &Rc<RawClass>,
        file: Rc<SourceFile>,
        containing: DescriptorId,
    ) -> DescriptorId {
        if let Some(&id) = self.source_classes.get(&fq) {
            return id;
        }
        let kind = match raw.kind {
            RawClassKind::Class => ClassKind::Class,
            RawClassKind::Interface => ClassKind::Interface,
            RawClassKind::Enum => ClassKind::Enum,
        };
        let id = self.arena.alloc(Descriptor {
            name: raw.name.clone(),
            containing: Some(containing),
            kind: DescriptorKind::Class(ClassData::new(
                fq,
                kind,
                ClassOrigin::Source {
                    raw: raw.clone(),
                    file,
                },
            )),
        });
        self.source_classes.insert(fq, id);
        let type_params = graph.type_params.resolve(self, &raw.type_params, id);
        self.arena.class_mut(id).type_params = type_params;
        // Function-literal conversion applies to foreign interfaces only.
        let what = format!("sam eligibility of {}", self.names.display(fq));
        self.arena.class_mut(id).sam_eligible.set(false, what);
        tracing::debug!(name = %self.names.display(fq), id = id.index(), "resolved source class");
        id
    }

    /// The member scope of a class, allocated on first request. Substituted
    /// classes view their original's scope.
    pub fn class_scope(&mut self, class: DescriptorId) -> ScopeId {
        if let Some(&scope) = self.arena.class(class).scope.get() {
            return scope;
        }
        let backing = match &self.arena.class(class).origin {
            ClassOrigin::Source { .. } => ScopeBacking::SourceClass { class },
            ClassOrigin::Foreign(_) => ScopeBacking::ForeignClassMembers { class },
            ClassOrigin::Substituted { original } => {
                let original = *original;
                return self.class_scope(original);
            }
        };
        let scope = self.scopes.alloc(class, backing);
        let what = format!(
            "scope of {}",
            self.names.display(self.arena.class(class).fq)
        );
        self.arena.class_mut(class).scope.set(scope, what);
        scope
    }

    /// Declared supertypes, resolved on first request. A request arriving
    /// while resolution is in flight sees the empty partial view; cyclic
    /// hierarchies are the user's error to report elsewhere, not a hang.
    pub fn class_supertypes(&mut self, graph: &ResolverGraph, class: DescriptorId) -> Vec<TypeRef> {
        {
            let data = self.arena.class(class);
            if let Some(list) = data.supertypes.get() {
                return list.clone();
            }
            if data.supertypes_state.in_progress() {
                return Vec::new();
            }
        }
        self.arena.class_mut(class).supertypes_state = ResolveState::InProgress;
        let origin = self.arena.class(class).origin.clone();
        let resolved = match origin {
            ClassOrigin::Source { raw, .. } => self.source_supertypes(graph, class, &raw),
            ClassOrigin::Foreign(_) => graph.supertypes.resolve(self, graph, class),
            ClassOrigin::Substituted { original } => self.class_supertypes(graph, original),
        };
        let what = format!(
            "supertypes of {}",
            self.names.display(self.arena.class(class).fq)
        );
        let data = self.arena.class_mut(class);
        data.supertypes.set(resolved.clone(), what);
        data.supertypes_state = ResolveState::Done;
        resolved
    }

    fn source_supertypes(
        &mut self,
        graph: &ResolverGraph,
        class: DescriptorId,
        raw: &RawClass,
    ) -> Vec<TypeRef> {
        let package = self.containing_package(class);
        let vars = self.type_vars_of_class(class);
        let class_name = self
            .names
            .display(self.arena.class(class).fq)
            .to_string();
        let mut supertypes = Vec::with_capacity(raw.supertypes.len());
        for declared in &raw.supertypes {
            let mut args = Vec::with_capacity(declared.args.len());
            for arg in &declared.args {
                args.push(self.resolve_type(graph, arg, package, &vars, &class_name));
            }
            match self.resolve_class_ref(graph, &declared.name, package) {
                Some(super_class) => supertypes.push(TypeRef::Class {
                    class: super_class,
                    args,
                }),
                None => {
                    graph.report(
                        Location::name(&class_name),
                        ResolveError::UnresolvedSupertype {
                            name: declared.name.clone(),
                            class: class_name.clone(),
                        },
                    );
                    supertypes.push(TypeRef::Error);
                }
            }
        }
        supertypes
    }

    /// Resolved annotations of a class.
    pub fn class_annotations(
        &mut self,
        graph: &ResolverGraph,
        class: DescriptorId,
    ) -> Vec<Annotation> {
        {
            let data = self.arena.class(class);
            if let Some(list) = data.annotations.get() {
                return list.clone();
            }
            if data.annotations_state.in_progress() {
                return Vec::new();
            }
        }
        self.arena.class_mut(class).annotations_state = ResolveState::InProgress;
        let origin = self.arena.class(class).origin.clone();
        let resolved = match origin {
            ClassOrigin::Foreign(handle) => graph.annotations.resolve(&handle),
            ClassOrigin::Source { .. } => Vec::new(),
            ClassOrigin::Substituted { original } => self.class_annotations(graph, original),
        };
        let what = format!(
            "annotations of {}",
            self.names.display(self.arena.class(class).fq)
        );
        let data = self.arena.class_mut(class);
        data.annotations.set(resolved.clone(), what);
        data.annotations_state = ResolveState::Done;
        resolved
    }

    // --- member scopes ------------------------------------------------------

    /// Look up scope members by name and kind, computing and caching the
    /// entry on first request. Re-entrant requests for an entry being
    /// computed see the empty partial view.
    pub fn member(
        &mut self,
        graph: &ResolverGraph,
        scope: ScopeId,
        name: &str,
        kind: MemberKind,
    ) -> MemberSet {
        {
            let data = self.scopes.get(scope);
            if let Some(set) = data.cached(name, kind) {
                return set.clone();
            }
            if data.is_computing(name, kind) {
                return MemberSet::new();
            }
        }
        self.scopes.get_mut(scope).begin(name, kind);
        let (owner, backing) = {
            let data = self.scopes.get(scope);
            (data.owner, data.backing)
        };
        let members = match backing {
            ScopeBacking::SourcePackage { package } => {
                self.source_package_members(graph, owner, package, name, kind)
            }
            ScopeBacking::SourceClass { class } => {
                self.source_class_members(graph, class, name, kind)
            }
            ScopeBacking::ForeignPackage { package, .. } => {
                self.foreign_package_members(graph, package, name, kind)
            }
            ScopeBacking::ForeignClassMembers { class } => graph.members.resolve_member(
                self,
                graph,
                class,
                name,
                kind,
                crate::foreign::resolvers::ForeignMemberView::All,
            ),
            ScopeBacking::ForeignStatics { class } => graph.members.resolve_member(
                self,
                graph,
                class,
                name,
                kind,
                crate::foreign::resolvers::ForeignMemberView::StaticsOnly,
            ),
        };
        self.scopes.get_mut(scope).complete(name, kind, members.clone());
        members
    }

    fn source_package_members(
        &mut self,
        graph: &ResolverGraph,
        fragment: DescriptorId,
        package: NameId,
        name: &str,
        kind: MemberKind,
    ) -> MemberSet {
        let dotted = self.names.display(package).to_string();
        let source = self.source.clone();
        let mut members = MemberSet::new();
        for decl in source.declarations_in(&dotted, name) {
            match (kind, decl) {
                (MemberKind::Class, RawDeclaration::Class(raw)) => {
                    let Some(file) = source.file_of(&dotted, name) else {
                        continue;
                    };
                    let fq = self.names.child(package, name);
                    members.push(self.resolve_source_class(graph, fq, &raw, file, fragment));
                }
                (MemberKind::Function, RawDeclaration::Function(raw)) => {
                    members.push(self.resolve_source_function(graph, &raw, fragment));
                }
                (MemberKind::Property, RawDeclaration::Property(raw)) => {
                    members.push(self.resolve_source_property(&raw, fragment));
                }
                _ => {}
            }
        }
        members
    }

    fn source_class_members(
        &mut self,
        graph: &ResolverGraph,
        class: DescriptorId,
        name: &str,
        kind: MemberKind,
    ) -> MemberSet {
        let (raw, file) = match &self.arena.class(class).origin {
            ClassOrigin::Source { raw, file } => (raw.clone(), file.clone()),
            other => panic!("source member lookup on class with origin {other:?}"),
        };
        let mut members = MemberSet::new();
        if kind == MemberKind::Constructor {
            if name == "<init>" {
                for constructor in &raw.constructors {
                    let constructor = Rc::new(constructor.clone());
                    let id = self.arena.alloc(Descriptor {
                        name: "<init>".to_string(),
                        containing: Some(class),
                        kind: DescriptorKind::Constructor(ConstructorData {
                            params: OnceSlot::empty(),
                            params_state: ResolveState::NotStarted,
                            raw: Some(constructor),
                            original: None,
                        }),
                    });
                    members.push(id);
                }
            }
            return members;
        }
        for member in &raw.members {
            if member.name() != name {
                continue;
            }
            match (kind, member) {
                (MemberKind::Class, RawDeclaration::Class(nested)) => {
                    let class_fq = self.arena.class(class).fq;
                    let fq = self.names.child(class_fq, name);
                    members.push(self.resolve_source_class(graph, fq, nested, file.clone(), class));
                }
                (MemberKind::Function, RawDeclaration::Function(raw_fn)) => {
                    members.push(self.resolve_source_function(graph, raw_fn, class));
                }
                (MemberKind::Property, RawDeclaration::Property(raw_prop)) => {
                    members.push(self.resolve_source_property(raw_prop, class));
                }
                _ => {}
            }
        }
        members
    }

    fn foreign_package_members(
        &mut self,
        graph: &ResolverGraph,
        package: NameId,
        name: &str,
        kind: MemberKind,
    ) -> MemberSet {
        let mut members = MemberSet::new();
        if kind == MemberKind::Class {
            let fq = self.names.child(package, name);
            if let Some(id) = graph.classes.resolve_by_name(self, graph, fq) {
                members.push(id);
            }
        }
        members
    }

    fn resolve_source_function(
        &mut self,
        graph: &ResolverGraph,
        raw: &Rc<RawFunction>,
        containing: DescriptorId,
    ) -> DescriptorId {
        let is_static = !self.arena.is_class(containing);
        let id = self.arena.alloc(Descriptor {
            name: raw.name.clone(),
            containing: Some(containing),
            kind: DescriptorKind::Function(FunctionData {
                type_params: Vec::new(),
                signature: OnceSlot::empty(),
                signature_state: ResolveState::NotStarted,
                is_static,
                is_abstract: !raw.has_body,
                has_body: raw.has_body,
                raw: Some(raw.clone()),
                original: None,
            }),
        });
        let type_params = graph.type_params.resolve(self, &raw.type_params, id);
        self.arena.function_mut(id).type_params = type_params;
        id
    }

    fn resolve_source_property(
        &mut self,
        raw: &Rc<RawProperty>,
        containing: DescriptorId,
    ) -> DescriptorId {
        let is_static = !self.arena.is_class(containing);
        self.arena.alloc(Descriptor {
            name: raw.name.clone(),
            containing: Some(containing),
            kind: DescriptorKind::Property(PropertyData {
                ty: OnceSlot::empty(),
                ty_state: ResolveState::NotStarted,
                is_mutable: raw.is_mutable,
                is_static,
                raw: Some(raw.clone()),
                original: None,
            }),
        })
    }

    // --- lazy signature aspects ---------------------------------------------

    pub fn function_signature(
        &mut self,
        graph: &ResolverGraph,
        function: DescriptorId,
    ) -> Signature {
        {
            let data = self.arena.function(function);
            if let Some(signature) = data.signature.get() {
                return signature.clone();
            }
            if data.signature_state.in_progress() {
                return Signature {
                    params: Vec::new(),
                    return_type: TypeRef::Error,
                };
            }
        }
        let raw = match &self.arena.function(function).raw {
            Some(raw) => raw.clone(),
            None => panic!(
                "signature of {} was never resolved",
                self.arena.path(&self.names, function)
            ),
        };
        self.arena.function_mut(function).signature_state = ResolveState::InProgress;
        let package = self.containing_package(function);
        let vars = self.own_and_enclosing_vars(function);
        let referrer = self.arena.path(&self.names, function);
        let mut params = Vec::with_capacity(raw.params.len());
        for param in &raw.params {
            params.push(Param {
                name: param.name.clone(),
                ty: self.resolve_type(graph, &param.ty, package, &vars, &referrer),
            });
        }
        let return_type = match &raw.return_type {
            Some(ty) => self.resolve_type(graph, ty, package, &vars, &referrer),
            None => TypeRef::Primitive(Primitive::Unit),
        };
        let signature = Signature {
            params,
            return_type,
        };
        let what = format!("signature of {referrer}");
        let data = self.arena.function_mut(function);
        data.signature.set(signature.clone(), what);
        data.signature_state = ResolveState::Done;
        signature
    }

    pub fn property_type(&mut self, graph: &ResolverGraph, property: DescriptorId) -> TypeRef {
        {
            let data = self.arena.property(property);
            if let Some(ty) = data.ty.get() {
                return ty.clone();
            }
            if data.ty_state.in_progress() {
                return TypeRef::Error;
            }
        }
        let raw = match &self.arena.property(property).raw {
            Some(raw) => raw.clone(),
            None => panic!(
                "type of {} was never resolved",
                self.arena.path(&self.names, property)
            ),
        };
        self.arena.property_mut(property).ty_state = ResolveState::InProgress;
        let package = self.containing_package(property);
        let vars = self.type_vars_of_class(property);
        let referrer = self.arena.path(&self.names, property);
        let ty = self.resolve_type(graph, &raw.ty, package, &vars, &referrer);
        let what = format!("type of {referrer}");
        let data = self.arena.property_mut(property);
        data.ty.set(ty.clone(), what);
        data.ty_state = ResolveState::Done;
        ty
    }

    pub fn constructor_params(
        &mut self,
        graph: &ResolverGraph,
        constructor: DescriptorId,
    ) -> Vec<Param> {
        {
            let data = self.arena.constructor(constructor);
            if let Some(params) = data.params.get() {
                return params.clone();
            }
            if data.params_state.in_progress() {
                return Vec::new();
            }
        }
        let raw = match &self.arena.constructor(constructor).raw {
            Some(raw) => raw.clone(),
            None => panic!(
                "parameters of {} were never resolved",
                self.arena.path(&self.names, constructor)
            ),
        };
        self.arena.constructor_mut(constructor).params_state = ResolveState::InProgress;
        let package = self.containing_package(constructor);
        let vars = self.type_vars_of_class(constructor);
        let referrer = self.arena.path(&self.names, constructor);
        let mut params = Vec::with_capacity(raw.params.len());
        for param in &raw.params {
            params.push(Param {
                name: param.name.clone(),
                ty: self.resolve_type(graph, &param.ty, package, &vars, &referrer),
            });
        }
        let what = format!("parameters of {referrer}");
        let data = self.arena.constructor_mut(constructor);
        data.params.set(params.clone(), what);
        data.params_state = ResolveState::Done;
        params
    }

    // --- type resolution ----------------------------------------------------

    /// Resolve a written type reference against the primitives, the
    /// type variables in scope, the containing package, the module's default
    /// imports, and finally the root package.
    pub fn resolve_type(
        &mut self,
        graph: &ResolverGraph,
        raw: &RawTypeName,
        package: NameId,
        vars: &TypeVars,
        referrer: &str,
    ) -> TypeRef {
        if raw.args.is_empty() {
            if let Some(primitive) = Primitive::by_name(&raw.name) {
                return TypeRef::Primitive(primitive);
            }
            if let Some((_, param)) = vars.iter().find(|(var, _)| var == &raw.name) {
                return TypeRef::TypeParam(*param);
            }
        }
        let mut args = Vec::with_capacity(raw.args.len());
        for arg in &raw.args {
            args.push(self.resolve_type(graph, arg, package, vars, referrer));
        }
        match self.resolve_class_ref(graph, &raw.name, package) {
            Some(class) => TypeRef::Class { class, args },
            None => {
                graph.report(
                    Location::name(referrer),
                    ResolveError::UnresolvedType {
                        name: raw.name.clone(),
                        referrer: referrer.to_string(),
                    },
                );
                TypeRef::Error
            }
        }
    }

    /// Resolve a class reference as written: dotted names absolutely, short
    /// names through the package, the default imports, then the root.
    pub fn resolve_class_ref(
        &mut self,
        graph: &ResolverGraph,
        name: &str,
        package: NameId,
    ) -> Option<DescriptorId> {
        if name.contains('.') {
            let fq = self.names.intern(name);
            return self.class_by_name(graph, fq);
        }
        let fq = self.names.child(package, name);
        if let Some(id) = self.class_by_name(graph, fq) {
            return Some(id);
        }
        let imports = self.arena.module(self.module).default_imports.clone();
        for import in imports {
            let base = self.names.intern(&import);
            let fq = self.names.child(base, name);
            if let Some(id) = self.class_by_name(graph, fq) {
                return Some(id);
            }
        }
        if !self.names.is_root(package) {
            let root = self.names.root();
            let fq = self.names.child(root, name);
            return self.class_by_name(graph, fq);
        }
        None
    }

    // --- scope context helpers ----------------------------------------------

    /// The package a descriptor belongs to, climbing the containing chain to
    /// the nearest package fragment.
    pub fn containing_package(&self, id: DescriptorId) -> NameId {
        let mut current = Some(id);
        while let Some(node) = current {
            if let DescriptorKind::PackageFragment(fragment) = &self.arena.get(node).kind {
                return fragment.fq;
            }
            current = self.arena.containing(node);
        }
        self.names.root()
    }

    /// Type variables visible from a descriptor: the type parameters of every
    /// enclosing class, innermost first.
    pub fn type_vars_of_class(&self, owner: DescriptorId) -> TypeVars {
        let mut vars = TypeVars::new();
        let mut current = Some(owner);
        while let Some(id) = current {
            if self.arena.is_class(id) {
                for &param in &self.arena.class(id).type_params {
                    vars.push((self.arena.name(param).to_string(), param));
                }
            }
            current = self.arena.containing(id);
        }
        vars
    }

    fn own_and_enclosing_vars(&self, function: DescriptorId) -> TypeVars {
        let mut vars: TypeVars = self
            .arena
            .function(function)
            .type_params
            .iter()
            .map(|&param| (self.arena.name(param).to_string(), param))
            .collect();
        vars.extend(self.type_vars_of_class(function));
        vars
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::CollectingReporter;
    use crate::foreign::model::{build, ForeignClassFinder, ForeignClassKind, ForeignTypeRef, MemoryClassIndex};
    use crate::syntax::{MemoryDeclarations, RawConstructor, RawParam};

    fn source_files() -> Vec<Rc<SourceFile>> {
        vec![SourceFile::physical(
            "greeter.sab",
            "/src/greeter.sab",
            "app",
            vec![
                RawDeclaration::Class(Rc::new(RawClass {
                    name: "Greeter".to_string(),
                    kind: RawClassKind::Class,
                    type_params: vec![],
                    supertypes: vec![],
                    constructors: vec![RawConstructor { params: vec![] }],
                    members: vec![RawDeclaration::Function(Rc::new(RawFunction {
                        name: "greet".to_string(),
                        type_params: vec![],
                        params: vec![RawParam {
                            name: "name".to_string(),
                            ty: RawTypeName::simple("Text"),
                        }],
                        return_type: None,
                        has_body: true,
                    }))],
                })),
                RawDeclaration::Class(Rc::new(RawClass {
                    name: "Text".to_string(),
                    kind: RawClassKind::Class,
                    type_params: vec![],
                    supertypes: vec![],
                    constructors: vec![],
                    members: vec![],
                })),
            ],
        )]
    }

    fn foreign_index() -> MemoryClassIndex {
        let mut index = MemoryClassIndex::new();
        index.insert(Rc::new(build::class("host.lang.Text", ForeignClassKind::Class)));
        index.insert(Rc::new(build::class("app.Text", ForeignClassKind::Class)));

        let mut registry = build::class("host.util.Registry", ForeignClassKind::Class);
        registry.fields.push(build::field(
            "DEFAULT",
            true,
            ForeignTypeRef::Primitive("int".to_string()),
        ));
        registry.methods.push(build::method(
            "lookup",
            true,
            ForeignTypeRef::Primitive("int".to_string()),
        ));
        registry.methods.push(build::method(
            "refresh",
            false,
            ForeignTypeRef::Primitive("void".to_string()),
        ));
        index.insert(Rc::new(registry));
        index
    }

    fn fixture() -> (
        ResolveSession,
        ResolverGraph,
        Rc<CollectingReporter>,
        Rc<MemoryClassIndex>,
    ) {
        let index = Rc::new(foreign_index());
        let reporter = Rc::new(CollectingReporter::new());
        let graph = ResolverGraph::build(
            vec![index.clone() as Rc<dyn ForeignClassFinder>],
            reporter.clone(),
        );
        let session = ResolveSession::new(
            Rc::new(MemoryDeclarations::new(source_files())),
            SessionConfig {
                module_name: "<test>".to_string(),
                default_imports: vec!["host.lang".to_string()],
            },
        );
        (session, graph, reporter, index)
    }

    #[test]
    fn source_fragment_is_canonical_and_stable() {
        let (mut session, graph, _, _) = fixture();
        let app = session.names.intern("app");
        let first = session.package_fragment(&graph, app).unwrap();
        let second = session.package_fragment(&graph, app).unwrap();
        assert_eq!(first, second);
        assert_eq!(session.arena.fragment(first).provider, ProviderTag::Source);
    }

    #[test]
    fn unknown_package_fails_fast_without_reprobing() {
        let (mut session, graph, _, index) = fixture();
        let missing = session.names.intern("no.such.pkg");
        assert!(session.package_fragment(&graph, missing).is_none());
        assert!(session.is_unresolved_package(missing));
        let probes = index.probes();
        assert!(session.package_fragment(&graph, missing).is_none());
        assert_eq!(index.probes(), probes);
    }

    #[test]
    fn unresolved_package_reports_once() {
        let (mut session, graph, reporter, _) = fixture();
        let missing = session.names.intern("no.such.pkg");
        assert!(session.package_fragment(&graph, missing).is_none());
        assert!(session.package_fragment(&graph, missing).is_none());
        let diagnostics = reporter.diagnostics();
        assert_eq!(
            diagnostics
                .iter()
                .filter(|d| d.error.code_string() == "E3001")
                .count(),
            1
        );
    }

    #[test]
    fn registered_fragments_preserve_registration_order() {
        let (mut session, graph, _, _) = fixture();
        let lang = session.names.intern("host.lang");
        let app = session.names.intern("app");
        let lang_fragment = session.package_fragment(&graph, lang).unwrap();
        let app_fragments = session.package_fragments(&graph, app);

        let mut expected = vec![lang_fragment];
        expected.extend(app_fragments.iter().copied());
        assert_eq!(session.registered_fragments(), expected);
    }

    #[test]
    #[should_panic(expected = "rewrite at app")]
    fn reregistering_a_resolved_package_is_fatal() {
        let (mut session, graph, _, _) = fixture();
        let app = session.names.intern("app");
        session.package_fragment(&graph, app).unwrap();
        session.register_fragment(
            app,
            ProviderTag::Source,
            ScopeBacking::SourcePackage { package: app },
        );
    }

    #[test]
    fn source_class_shadows_foreign_class() {
        let (mut session, graph, _, _) = fixture();
        let fq = session.names.intern("app.Text");
        let class = session.class_by_name(&graph, fq).unwrap();
        assert!(matches!(
            session.arena.class(class).origin,
            ClassOrigin::Source { .. }
        ));
        // Identity holds across repeated requests.
        assert_eq!(session.class_by_name(&graph, fq), Some(class));
    }

    #[test]
    fn statics_namespace_backs_a_package_fragment() {
        let (mut session, graph, _, _) = fixture();
        let fq = session.names.intern("host.util.Registry");
        let fragment = session.package_fragment(&graph, fq).unwrap();
        let scope = session.fragment_scope(fragment);
        assert!(matches!(
            session.scopes.get(scope).backing,
            ScopeBacking::ForeignStatics { .. }
        ));

        let lookup = session.member(&graph, scope, "lookup", MemberKind::Function);
        assert_eq!(lookup.len(), 1);
        // Instance methods stay out of the statics namespace.
        let refresh = session.member(&graph, scope, "refresh", MemberKind::Function);
        assert!(refresh.is_empty());
    }

    #[test]
    fn nested_classes_do_not_mask_the_statics_namespace() {
        let mut index = MemoryClassIndex::new();
        let mut holder = build::class("host.Outer.Holder", ForeignClassKind::Class);
        holder.is_static = true;
        holder.fields.push(build::field(
            "UNIT",
            true,
            ForeignTypeRef::Primitive("int".to_string()),
        ));
        let mut outer = build::class("host.Outer", ForeignClassKind::Class);
        outer.fields.push(build::field(
            "MAX",
            true,
            ForeignTypeRef::Primitive("int".to_string()),
        ));
        outer.nested.push(Rc::new(holder));
        index.insert(Rc::new(outer));

        let reporter = Rc::new(CollectingReporter::new());
        let graph = ResolverGraph::build(
            vec![Rc::new(index) as Rc<dyn ForeignClassFinder>],
            reporter.clone(),
        );
        let mut session = ResolveSession::new(
            Rc::new(MemoryDeclarations::new([])),
            SessionConfig::default(),
        );

        // The nested class is indexed under a dotted name, but the outer
        // class's fq still resolves to its statics namespace, not to a
        // foreign package of classes.
        let fq = session.names.intern("host.Outer");
        let fragment = session.package_fragment(&graph, fq).unwrap();
        let scope = session.fragment_scope(fragment);
        assert!(matches!(
            session.scopes.get(scope).backing,
            ScopeBacking::ForeignStatics { .. }
        ));
        let max = session.member(&graph, scope, "MAX", MemberKind::Property);
        assert_eq!(max.len(), 1);
        assert!(reporter.is_empty());
    }

    #[test]
    fn malformed_foreign_class_reports_and_continues() {
        let mut index = foreign_index();
        index.poison("bad.Broken");
        let index = Rc::new(index);
        let reporter = Rc::new(CollectingReporter::new());
        let graph = ResolverGraph::build(
            vec![index as Rc<dyn ForeignClassFinder>],
            reporter.clone(),
        );
        let mut session = ResolveSession::new(
            Rc::new(MemoryDeclarations::new(source_files())),
            SessionConfig::default(),
        );

        let bad = session.names.intern("bad.Broken");
        assert!(session.class_by_name(&graph, bad).is_none());
        let diagnostics = reporter.diagnostics();
        assert!(diagnostics
            .iter()
            .any(|d| d.error.code_string() == "E3002"));

        // Unrelated resolution proceeds.
        let good = session.names.intern("host.lang.Text");
        assert!(session.class_by_name(&graph, good).is_some());
    }

    #[test]
    fn member_signatures_resolve_against_default_imports() {
        let (mut session, graph, reporter, _) = fixture();
        let fq = session.names.intern("app.Greeter");
        let class = session.class_by_name(&graph, fq).unwrap();
        let scope = session.class_scope(class);
        let greet = session.member(&graph, scope, "greet", MemberKind::Function);
        assert_eq!(greet.len(), 1);

        let signature = session.function_signature(&graph, greet[0]);
        assert_eq!(signature.params.len(), 1);
        // "Text" resolves to the source class in the same package, shadowing
        // the default import.
        let text = session.names.intern("app.Text");
        let text_class = session.class_by_name(&graph, text).unwrap();
        assert_eq!(signature.params[0].ty, TypeRef::class(text_class));
        assert_eq!(signature.return_type, TypeRef::Primitive(Primitive::Unit));
        assert!(reporter.is_empty());
    }

    #[test]
    fn unresolved_type_reports_and_degrades() {
        let (mut session, graph, reporter, _) = fixture();
        let app = session.names.intern("app");
        let ty = session.resolve_type(
            &graph,
            &RawTypeName::simple("Nonexistent"),
            app,
            &TypeVars::new(),
            "app.test",
        );
        assert!(ty.is_error());
        let diagnostics = reporter.diagnostics();
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].error.code_string(), "E3004");
    }

    #[test]
    fn ambiguous_statics_namespace_reports_and_first_finder_wins() {
        let mut first = MemoryClassIndex::new();
        let mut holder = build::class("dup.Holder", ForeignClassKind::Class);
        holder.fields.push(build::field(
            "ONE",
            true,
            ForeignTypeRef::Primitive("int".to_string()),
        ));
        first.insert(Rc::new(holder));

        let mut second = MemoryClassIndex::new();
        let mut shadow = build::class("dup.Holder", ForeignClassKind::Class);
        shadow.methods.push(build::method(
            "two",
            true,
            ForeignTypeRef::Primitive("int".to_string()),
        ));
        second.insert(Rc::new(shadow));

        let reporter = Rc::new(CollectingReporter::new());
        let graph = ResolverGraph::build(
            vec![
                Rc::new(first) as Rc<dyn ForeignClassFinder>,
                Rc::new(second) as Rc<dyn ForeignClassFinder>,
            ],
            reporter.clone(),
        );
        let mut session = ResolveSession::new(
            Rc::new(MemoryDeclarations::new([])),
            SessionConfig::default(),
        );

        let fq = session.names.intern("dup.Holder");
        let fragment = session.package_fragment(&graph, fq).unwrap();
        let scope = session.fragment_scope(fragment);
        // The first finder's class backs the namespace.
        let one = session.member(&graph, scope, "ONE", MemberKind::Property);
        assert_eq!(one.len(), 1);
        let two = session.member(&graph, scope, "two", MemberKind::Function);
        assert!(two.is_empty());
        assert!(reporter
            .diagnostics()
            .iter()
            .any(|d| d.error.code_string() == "E3003"));
    }

    #[test]
    fn mutually_recursive_supertypes_resolve_without_hanging() {
        let file = SourceFile::physical(
            "cycle.sab",
            "/src/cycle.sab",
            "cyc",
            vec![
                RawDeclaration::Class(Rc::new(RawClass {
                    name: "A".to_string(),
                    kind: RawClassKind::Class,
                    type_params: vec![],
                    supertypes: vec![RawTypeName::simple("B")],
                    constructors: vec![],
                    members: vec![],
                })),
                RawDeclaration::Class(Rc::new(RawClass {
                    name: "B".to_string(),
                    kind: RawClassKind::Class,
                    type_params: vec![],
                    supertypes: vec![RawTypeName::simple("A")],
                    constructors: vec![],
                    members: vec![],
                })),
            ],
        );
        let reporter = Rc::new(CollectingReporter::new());
        let graph = ResolverGraph::build(vec![], reporter.clone());
        let mut session = ResolveSession::new(
            Rc::new(MemoryDeclarations::new([file])),
            SessionConfig::default(),
        );

        let fq_a = session.names.intern("cyc.A");
        let fq_b = session.names.intern("cyc.B");
        let a = session.class_by_name(&graph, fq_a).unwrap();
        let supers_a = session.class_supertypes(&graph, a);
        let b = session.class_by_name(&graph, fq_b).unwrap();
        assert_eq!(supers_a, vec![TypeRef::class(b)]);
        assert_eq!(session.class_supertypes(&graph, b), vec![TypeRef::class(a)]);
        assert!(reporter.is_empty());
    }

    #[test]
    fn constructors_resolve_under_init_entry() {
        let (mut session, graph, _, _) = fixture();
        let fq = session.names.intern("app.Greeter");
        let class = session.class_by_name(&graph, fq).unwrap();
        let scope = session.class_scope(class);
        let constructors = session.member(&graph, scope, "<init>", MemberKind::Constructor);
        assert_eq!(constructors.len(), 1);
        assert!(session.constructor_params(&graph, constructors[0]).is_empty());
    }
}
