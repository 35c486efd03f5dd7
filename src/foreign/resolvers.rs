// src/foreign/resolvers.rs
//
// The per-concern resolver services of the foreign symbol bridge. Services
// are stateless; every cache lives in the session, and cross-service
// references are late-bound by the wiring graph's connection phase.

use std::rc::Rc;

use crate::descriptors::{
    ClassData, ClassKind, ClassOrigin, ConstructorData, Descriptor, DescriptorId, DescriptorKind,
    FunctionData, Param, Primitive, PropertyData, Signature, TypeParameterData, TypeRef,
};
use crate::errors::{Location, ResolveError};
use crate::identity::NameId;
use crate::memo::{LateRef, ResolveState};
use crate::resolve::graph::ResolverGraph;
use crate::resolve::scope::{MemberKind, MemberSet};
use crate::resolve::session::ResolveSession;

use super::model::{
    ForeignClass, ForeignClassKind, ForeignConstructor, ForeignField, ForeignMethod,
    ForeignTypeRef, COMPILED_ARTIFACT_MARKER,
};
use super::statics::{SamConverter, StaticMemberFilter};

/// Pair of a type-variable name and its type-parameter descriptor, in scope
/// for signature transformation.
pub type TypeVars = Vec<(String, DescriptorId)>;

/// Recognizes binary classes produced by this compiler's own emission stage,
/// which must not round-trip through the foreign bridge.
#[derive(Debug)]
pub struct ArtifactDetector {
    marker: String,
}

impl ArtifactDetector {
    pub fn new() -> Self {
        Self::with_marker(COMPILED_ARTIFACT_MARKER)
    }

    pub fn with_marker(marker: impl Into<String>) -> Self {
        Self {
            marker: marker.into(),
        }
    }

    pub fn is_compiled_artifact(&self, class: &ForeignClass) -> bool {
        class.has_annotation(&self.marker)
    }
}

impl Default for ArtifactDetector {
    fn default() -> Self {
        Self::new()
    }
}

/// Allocates type-parameter descriptors for a generic owner, in declaration
/// order. Shared by the source and foreign resolution paths.
#[derive(Debug, Default)]
pub struct TypeParameterResolver;

impl TypeParameterResolver {
    pub fn new() -> Self {
        Self
    }

    pub fn resolve(
        &self,
        session: &mut ResolveSession,
        names: &[String],
        owner: DescriptorId,
    ) -> Vec<DescriptorId> {
        names
            .iter()
            .enumerate()
            .map(|(index, name)| {
                session.arena.alloc(Descriptor {
                    name: name.clone(),
                    containing: Some(owner),
                    kind: DescriptorKind::TypeParameter(TypeParameterData { index }),
                })
            })
            .collect()
    }
}

/// Translates foreign signature types into resolved type references.
#[derive(Debug)]
pub struct TypeTransformer {
    pub(crate) classes: LateRef<ForeignClassResolver>,
}

impl TypeTransformer {
    pub fn new() -> Self {
        Self {
            classes: LateRef::unset("foreign class resolver"),
        }
    }

    /// Map a foreign primitive spelling onto the target primitive set.
    pub fn primitive_by_foreign_name(name: &str) -> Option<Primitive> {
        Some(match name {
            "boolean" => Primitive::Bool,
            "byte" => Primitive::I8,
            "short" => Primitive::I16,
            "int" => Primitive::I32,
            "long" => Primitive::I64,
            "float" => Primitive::F32,
            "double" => Primitive::F64,
            "char" => Primitive::Char,
            "void" => Primitive::Unit,
            _ => return None,
        })
    }

    /// A reference that fails to resolve yields `TypeRef::Error` after a
    /// report; the surrounding declaration stays usable.
    pub fn transform(
        &self,
        session: &mut ResolveSession,
        graph: &ResolverGraph,
        ty: &ForeignTypeRef,
        vars: &TypeVars,
        referrer: &str,
    ) -> TypeRef {
        match ty {
            ForeignTypeRef::Primitive(name) => match Self::primitive_by_foreign_name(name) {
                Some(primitive) => TypeRef::Primitive(primitive),
                None => {
                    graph.report(
                        Location::name(referrer),
                        ResolveError::UnresolvedType {
                            name: name.clone(),
                            referrer: referrer.to_string(),
                        },
                    );
                    TypeRef::Error
                }
            },
            ForeignTypeRef::TypeVar(name) => {
                match vars.iter().find(|(var, _)| var == name) {
                    Some((_, param)) => TypeRef::TypeParam(*param),
                    None => {
                        graph.report(
                            Location::name(referrer),
                            ResolveError::UnresolvedType {
                                name: name.clone(),
                                referrer: referrer.to_string(),
                            },
                        );
                        TypeRef::Error
                    }
                }
            }
            ForeignTypeRef::Array(elem) => {
                TypeRef::Array(Box::new(self.transform(session, graph, elem, vars, referrer)))
            }
            ForeignTypeRef::Named { name, args } => {
                let mut resolved_args = Vec::with_capacity(args.len());
                for arg in args {
                    resolved_args.push(self.transform(session, graph, arg, vars, referrer));
                }
                let fq = session.names.intern(name);
                match self.classes.get().resolve_by_name(session, graph, fq) {
                    Some(class) => TypeRef::Class {
                        class,
                        args: resolved_args,
                    },
                    None => {
                        graph.report(
                            Location::name(referrer),
                            ResolveError::UnresolvedType {
                                name: name.clone(),
                                referrer: referrer.to_string(),
                            },
                        );
                        TypeRef::Error
                    }
                }
            }
        }
    }
}

/// Resolves value parameter lists of foreign callables.
#[derive(Debug)]
pub struct ValueParameterResolver {
    pub(crate) types: LateRef<TypeTransformer>,
}

impl ValueParameterResolver {
    pub fn new() -> Self {
        Self {
            types: LateRef::unset("type transformer"),
        }
    }

    pub fn resolve(
        &self,
        session: &mut ResolveSession,
        graph: &ResolverGraph,
        params: &[(String, ForeignTypeRef)],
        vars: &TypeVars,
        referrer: &str,
    ) -> Vec<Param> {
        let types = self.types.get();
        params
            .iter()
            .map(|(name, ty)| Param {
                name: name.clone(),
                ty: types.transform(session, graph, ty, vars, referrer),
            })
            .collect()
    }
}

/// Builds function descriptors for foreign methods. Signatures resolve
/// eagerly; the member scope lookup that triggered the build is itself lazy.
#[derive(Debug)]
pub struct ForeignFunctionResolver {
    pub(crate) types: LateRef<TypeTransformer>,
    pub(crate) value_params: LateRef<ValueParameterResolver>,
    pub(crate) type_params: LateRef<TypeParameterResolver>,
}

impl ForeignFunctionResolver {
    pub fn new() -> Self {
        Self {
            types: LateRef::unset("type transformer"),
            value_params: LateRef::unset("value parameter resolver"),
            type_params: LateRef::unset("type parameter resolver"),
        }
    }

    pub fn resolve(
        &self,
        session: &mut ResolveSession,
        graph: &ResolverGraph,
        owner: DescriptorId,
        method: &ForeignMethod,
    ) -> DescriptorId {
        let id = session.arena.alloc(Descriptor {
            name: method.name.clone(),
            containing: Some(owner),
            kind: DescriptorKind::Function(FunctionData {
                type_params: Vec::new(),
                signature: Default::default(),
                signature_state: ResolveState::NotStarted,
                is_static: method.is_static,
                is_abstract: method.is_abstract,
                has_body: !method.is_abstract,
                raw: None,
                original: None,
            }),
        });
        let own_params = self.type_params.get().resolve(session, &method.type_params, id);
        let mut vars = session.type_vars_of_class(owner);
        for &param in &own_params {
            vars.push((session.arena.name(param).to_string(), param));
        }
        session.arena.function_mut(id).type_params = own_params;

        let referrer = session.arena.path(&session.names, id);
        let signature = Signature {
            params: self
                .value_params
                .get()
                .resolve(session, graph, &method.params, &vars, &referrer),
            return_type: self
                .types
                .get()
                .transform(session, graph, &method.return_type, &vars, &referrer),
        };
        let function = session.arena.function_mut(id);
        function
            .signature
            .set(signature, format_args!("signature of {referrer}"));
        function.signature_state = ResolveState::Done;
        id
    }
}

/// Builds property descriptors for foreign fields.
#[derive(Debug)]
pub struct ForeignPropertyResolver {
    pub(crate) types: LateRef<TypeTransformer>,
}

impl ForeignPropertyResolver {
    pub fn new() -> Self {
        Self {
            types: LateRef::unset("type transformer"),
        }
    }

    pub fn resolve(
        &self,
        session: &mut ResolveSession,
        graph: &ResolverGraph,
        owner: DescriptorId,
        field: &ForeignField,
    ) -> DescriptorId {
        let id = session.arena.alloc(Descriptor {
            name: field.name.clone(),
            containing: Some(owner),
            kind: DescriptorKind::Property(PropertyData {
                ty: Default::default(),
                ty_state: ResolveState::NotStarted,
                is_mutable: !field.is_final,
                is_static: field.is_static,
                raw: None,
                original: None,
            }),
        });
        let vars = session.type_vars_of_class(owner);
        let referrer = session.arena.path(&session.names, id);
        let ty = self
            .types
            .get()
            .transform(session, graph, &field.ty, &vars, &referrer);
        let property = session.arena.property_mut(id);
        property.ty.set(ty, format_args!("type of {referrer}"));
        property.ty_state = ResolveState::Done;
        id
    }
}

/// Builds constructor descriptors for foreign classes.
#[derive(Debug)]
pub struct ForeignConstructorResolver {
    pub(crate) value_params: LateRef<ValueParameterResolver>,
}

impl ForeignConstructorResolver {
    pub fn new() -> Self {
        Self {
            value_params: LateRef::unset("value parameter resolver"),
        }
    }

    pub fn resolve(
        &self,
        session: &mut ResolveSession,
        graph: &ResolverGraph,
        owner: DescriptorId,
        constructor: &ForeignConstructor,
    ) -> DescriptorId {
        let id = session.arena.alloc(Descriptor {
            name: "<init>".to_string(),
            containing: Some(owner),
            kind: DescriptorKind::Constructor(ConstructorData {
                params: Default::default(),
                params_state: ResolveState::NotStarted,
                raw: None,
                original: None,
            }),
        });
        let vars = session.type_vars_of_class(owner);
        let referrer = session.arena.path(&session.names, id);
        let params = self
            .value_params
            .get()
            .resolve(session, graph, &constructor.params, &vars, &referrer);
        let data = session.arena.constructor_mut(id);
        data.params
            .set(params, format_args!("parameters of {referrer}"));
        data.params_state = ResolveState::Done;
        id
    }
}

/// Translates foreign annotation values. Annotation classes themselves are
/// not resolved to descriptors; the value carries the fq name.
#[derive(Debug, Default)]
pub struct ForeignAnnotationResolver;

impl ForeignAnnotationResolver {
    pub fn new() -> Self {
        Self
    }

    pub fn resolve(&self, class: &ForeignClass) -> Vec<crate::descriptors::Annotation> {
        class
            .annotations
            .iter()
            .map(|ann| crate::descriptors::Annotation {
                name: ann.name.clone(),
                arguments: ann.arguments.clone(),
            })
            .collect()
    }
}

/// Resolves the declared supertypes of a foreign class.
#[derive(Debug)]
pub struct ForeignSupertypeResolver {
    pub(crate) classes: LateRef<ForeignClassResolver>,
    pub(crate) types: LateRef<TypeTransformer>,
}

impl ForeignSupertypeResolver {
    pub fn new() -> Self {
        Self {
            classes: LateRef::unset("foreign class resolver"),
            types: LateRef::unset("type transformer"),
        }
    }

    pub fn resolve(
        &self,
        session: &mut ResolveSession,
        graph: &ResolverGraph,
        class: DescriptorId,
    ) -> Vec<TypeRef> {
        let handle = match &session.arena.class(class).origin {
            ClassOrigin::Foreign(handle) => handle.clone(),
            other => panic!(
                "foreign supertype resolution on class with origin {other:?}"
            ),
        };
        let class_name = session
            .names
            .display(session.arena.class(class).fq)
            .to_string();
        let vars = session.type_vars_of_class(class);

        let mut supertypes = Vec::with_capacity(handle.supertypes.len());
        for declared in &handle.supertypes {
            let resolved = match declared {
                ForeignTypeRef::Named { name, args } => {
                    let mut resolved_args = Vec::with_capacity(args.len());
                    for arg in args {
                        resolved_args.push(self.types.get().transform(
                            session, graph, arg, &vars, &class_name,
                        ));
                    }
                    let fq = session.names.intern(name);
                    match self.classes.get().resolve_by_name(session, graph, fq) {
                        Some(super_class) => TypeRef::Class {
                            class: super_class,
                            args: resolved_args,
                        },
                        None => {
                            graph.report(
                                Location::name(&class_name),
                                ResolveError::UnresolvedSupertype {
                                    name: name.clone(),
                                    class: class_name.clone(),
                                },
                            );
                            TypeRef::Error
                        }
                    }
                }
                other => self.types.get().transform(session, graph, other, &vars, &class_name),
            };
            supertypes.push(resolved);
        }
        supertypes
    }
}

/// Resolves foreign binary classes to class descriptors, with identity
/// caching in the session: one descriptor per fq name for the session's
/// lifetime.
#[derive(Debug)]
pub struct ForeignClassResolver {
    pub(crate) artifacts: LateRef<ArtifactDetector>,
    pub(crate) sam: LateRef<SamConverter>,
    pub(crate) type_params: LateRef<TypeParameterResolver>,
}

impl ForeignClassResolver {
    pub fn new() -> Self {
        Self {
            artifacts: LateRef::unset("artifact detector"),
            sam: LateRef::unset("sam converter"),
            type_params: LateRef::unset("type parameter resolver"),
        }
    }

    /// Probe the finders for a class with the given fq name. Structural
    /// errors are reported and the finder treated as not answering; classes
    /// stamped as our own compiled artifacts are skipped.
    pub fn resolve_by_name(
        &self,
        session: &mut ResolveSession,
        graph: &ResolverGraph,
        fq: NameId,
    ) -> Option<DescriptorId> {
        if let Some(id) = session.foreign_class_cached(fq) {
            return Some(id);
        }
        if session.is_unresolved_class(fq) {
            return None;
        }
        let dotted = session.names.display(fq).to_string();
        for (index, finder) in graph.finders().iter().enumerate() {
            match finder.find_class(&dotted) {
                Ok(Some(handle)) => {
                    if self.artifacts.get().is_compiled_artifact(&handle) {
                        tracing::debug!(name = %dotted, finder = index, "skipping compiled artifact");
                        continue;
                    }
                    return Some(self.resolve_class(session, graph, &handle));
                }
                Ok(None) => {}
                Err(err) => {
                    graph.report(
                        Location::name(&err.name),
                        ResolveError::MalformedForeignClass {
                            name: err.name,
                            detail: err.detail,
                        },
                    );
                }
            }
        }
        session.mark_unresolved_class(fq);
        None
    }

    /// Build (or fetch) the descriptor for an already-located foreign class.
    pub fn resolve_class(
        &self,
        session: &mut ResolveSession,
        graph: &ResolverGraph,
        handle: &Rc<ForeignClass>,
    ) -> DescriptorId {
        let fq = session.names.intern(&handle.fq);
        if let Some(id) = session.foreign_class_cached(fq) {
            return id;
        }
        let containing = self.containing_for(session, graph, fq);
        // Resolving the containing declaration may itself have pulled this
        // class in; the cache is authoritative for identity.
        if let Some(id) = session.foreign_class_cached(fq) {
            return id;
        }
        let kind = match handle.kind {
            ForeignClassKind::Class => ClassKind::Class,
            ForeignClassKind::Interface | ForeignClassKind::Annotation => ClassKind::Interface,
            ForeignClassKind::Enum => ClassKind::Enum,
        };
        let id = session.arena.alloc(Descriptor {
            name: handle.short_name().to_string(),
            containing: Some(containing),
            kind: DescriptorKind::Class(ClassData::new(
                fq,
                kind,
                ClassOrigin::Foreign(handle.clone()),
            )),
        });
        session.cache_foreign_class(fq, id);

        let type_params = self.type_params.get().resolve(session, &handle.type_params, id);
        session.arena.class_mut(id).type_params = type_params;
        let sam_eligible = self.sam.get().is_sam_interface(handle);
        session
            .arena
            .class_mut(id)
            .sam_eligible
            .set(sam_eligible, format_args!("sam eligibility of {}", handle.fq));
        tracing::debug!(name = %handle.fq, id = id.index(), "resolved foreign class");
        id
    }

    /// Nested classes hang off their outer class; top-level classes off the
    /// canonical fragment of their package, or the module when the package
    /// resolves to nothing.
    fn containing_for(
        &self,
        session: &mut ResolveSession,
        graph: &ResolverGraph,
        fq: NameId,
    ) -> DescriptorId {
        let Some(parent) = session.names.parent(fq) else {
            return session.module();
        };
        if !session.names.is_root(parent) {
            if let Some(outer) = self.resolve_by_name(session, graph, parent) {
                return outer;
            }
        }
        session
            .package_fragment(graph, parent)
            .unwrap_or_else(|| session.module())
    }
}

/// Which view of a foreign class a member scope exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForeignMemberView {
    /// Declared members, instance and static, minus synthetics.
    All,
    /// The static-namespace view, filtered by the exclusion policy.
    StaticsOnly,
}

/// Entry point for member scope lookups against a foreign class.
#[derive(Debug)]
pub struct ForeignMemberResolver {
    pub(crate) classes: LateRef<ForeignClassResolver>,
    pub(crate) functions: LateRef<ForeignFunctionResolver>,
    pub(crate) properties: LateRef<ForeignPropertyResolver>,
    pub(crate) constructors: LateRef<ForeignConstructorResolver>,
    pub(crate) statics: LateRef<StaticMemberFilter>,
    pub(crate) sam: LateRef<SamConverter>,
}

impl ForeignMemberResolver {
    pub fn new() -> Self {
        Self {
            classes: LateRef::unset("foreign class resolver"),
            functions: LateRef::unset("foreign function resolver"),
            properties: LateRef::unset("foreign property resolver"),
            constructors: LateRef::unset("foreign constructor resolver"),
            statics: LateRef::unset("static member filter"),
            sam: LateRef::unset("sam converter"),
        }
    }

    pub fn resolve_member(
        &self,
        session: &mut ResolveSession,
        graph: &ResolverGraph,
        class: DescriptorId,
        name: &str,
        kind: MemberKind,
        view: ForeignMemberView,
    ) -> MemberSet {
        let handle = match &session.arena.class(class).origin {
            ClassOrigin::Foreign(handle) => handle.clone(),
            other => panic!("foreign member lookup on class with origin {other:?}"),
        };
        let mut members = MemberSet::new();
        match kind {
            MemberKind::Function => {
                for method in &handle.methods {
                    if method.name != name {
                        continue;
                    }
                    let admitted = match view {
                        ForeignMemberView::All => !method.is_synthetic,
                        ForeignMemberView::StaticsOnly => {
                            self.statics.get().admits_method(&handle, method)
                        }
                    };
                    if admitted {
                        members.push(self.functions.get().resolve(session, graph, class, method));
                    }
                }
            }
            MemberKind::Property => {
                for field in &handle.fields {
                    if field.name != name {
                        continue;
                    }
                    let admitted = match view {
                        ForeignMemberView::All => true,
                        ForeignMemberView::StaticsOnly => {
                            self.statics.get().admits_field(&handle, field)
                        }
                    };
                    if admitted {
                        members.push(self.properties.get().resolve(session, graph, class, field));
                    }
                }
            }
            MemberKind::Constructor => {
                if view == ForeignMemberView::All && name == "<init>" {
                    for constructor in &handle.constructors {
                        members.push(
                            self.constructors
                                .get()
                                .resolve(session, graph, class, constructor),
                        );
                    }
                }
            }
            MemberKind::Class => {
                for nested in &handle.nested {
                    if nested.short_name() != name {
                        continue;
                    }
                    let admitted = match view {
                        ForeignMemberView::All => true,
                        ForeignMemberView::StaticsOnly => {
                            self.sam.get().is_sam_interface(nested)
                                || (nested.is_static
                                    && self.statics.get().has_static_members(nested))
                        }
                    };
                    if admitted {
                        members.push(self.classes.get().resolve_class(session, graph, nested));
                    }
                }
            }
        }
        members
    }
}

/// Answers package-fragment probes against the foreign classpath: real
/// packages first, then the static-members namespace of a like-named class.
#[derive(Debug)]
pub struct ForeignFragmentProvider {
    pub(crate) classes: LateRef<ForeignClassResolver>,
    pub(crate) statics: LateRef<StaticMemberFilter>,
    pub(crate) artifacts: LateRef<ArtifactDetector>,
}

impl ForeignFragmentProvider {
    pub fn new() -> Self {
        Self {
            classes: LateRef::unset("foreign class resolver"),
            statics: LateRef::unset("static member filter"),
            artifacts: LateRef::unset("artifact detector"),
        }
    }

    /// Indices of the finders that claim the package.
    pub fn find_packages(&self, session: &ResolveSession, graph: &ResolverGraph, fq: NameId) -> Vec<usize> {
        let dotted = session.names.display(fq);
        graph
            .finders()
            .iter()
            .enumerate()
            .filter(|(_, finder)| finder.find_package(dotted).is_some())
            .map(|(index, _)| index)
            .collect()
    }

    /// The statics-namespace fallback: the first finder whose class at `fq`
    /// has static members wins and backs the namespace. A second qualifying
    /// finder is reported as an ambiguity; the first still wins.
    pub fn find_statics(
        &self,
        session: &mut ResolveSession,
        graph: &ResolverGraph,
        fq: NameId,
    ) -> Option<(usize, DescriptorId)> {
        let dotted = session.names.display(fq).to_string();
        let mut winner: Option<(usize, DescriptorId)> = None;
        for (index, finder) in graph.finders().iter().enumerate() {
            match finder.find_class(&dotted) {
                Ok(Some(handle)) => {
                    if self.artifacts.get().is_compiled_artifact(&handle) {
                        continue;
                    }
                    if self.statics.get().has_static_members(&handle) {
                        if winner.is_some() {
                            graph.report(
                                Location::name(&dotted),
                                ResolveError::StaticMembersAmbiguity {
                                    name: dotted.clone(),
                                },
                            );
                            break;
                        }
                        let class = self.classes.get().resolve_class(session, graph, &handle);
                        winner = Some((index, class));
                    }
                }
                Ok(None) => {}
                Err(err) => {
                    graph.report(
                        Location::name(&err.name),
                        ResolveError::MalformedForeignClass {
                            name: err.name,
                            detail: err.detail,
                        },
                    );
                }
            }
        }
        winner
    }
}
