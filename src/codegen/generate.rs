// src/codegen/generate.rs
//
// The emission driver: walks the resolved descriptors behind each source
// package and feeds the emission stage. Classes get implementation units
// (plus a defaults unit for traits with bodied methods); top-level functions
// and properties accumulate in the package unit.

use std::rc::Rc;

use rustc_hash::FxHashSet;

use crate::descriptors::{ClassKind, ClassOrigin, DescriptorId, ProviderTag};
use crate::foreign::model::COMPILED_ARTIFACT_MARKER;
use crate::resolve::force::force_resolve_all_contents;
use crate::resolve::graph::ResolverGraph;
use crate::resolve::scope::MemberKind;
use crate::resolve::session::ResolveSession;
use crate::syntax::{RawDeclaration, SourceFile};

use super::mapper;
use super::package::{PendingKind, PendingMember};
use super::stage::EmissionStage;

/// Emit every named source package into the stage. Packages without a source
/// fragment are skipped; they have nothing of ours to emit.
pub fn emit_packages(
    session: &mut ResolveSession,
    graph: &ResolverGraph,
    stage: &mut EmissionStage,
    packages: &[&str],
) {
    for package in packages {
        emit_package(session, graph, stage, package);
    }
}

pub fn emit_package(
    session: &mut ResolveSession,
    graph: &ResolverGraph,
    stage: &mut EmissionStage,
    package: &str,
) {
    let fq = session.names.intern(package);
    let fragments = session.package_fragments(graph, fq);
    let Some(&fragment) = fragments
        .iter()
        .find(|&&f| session.arena.fragment(f).provider == ProviderTag::Source)
    else {
        return;
    };
    // Surface every resolution diagnostic before any output is written.
    force_resolve_all_contents(session, graph, fragment);

    let scope = session.fragment_scope(fragment);
    let source = session.source().clone();
    let files = source.files_in(package);
    tracing::debug!(package, files = files.len(), "emitting package");

    let mut seen: FxHashSet<(String, MemberKind)> = FxHashSet::default();
    for file in &files {
        for decl in &file.declarations {
            match decl {
                RawDeclaration::Class(raw) => {
                    if !seen.insert((raw.name.clone(), MemberKind::Class)) {
                        continue;
                    }
                    for class in session.member(graph, scope, &raw.name, MemberKind::Class) {
                        emit_class(session, graph, stage, class, file);
                    }
                }
                RawDeclaration::Function(raw) => {
                    if !seen.insert((raw.name.clone(), MemberKind::Function)) {
                        continue;
                    }
                    for id in session.member(graph, scope, &raw.name, MemberKind::Function) {
                        let signature = session.function_signature(graph, id);
                        let descriptor = mapper::method_descriptor(session, &signature);
                        stage.for_package(session, fq, &files);
                        stage.add_package_member(
                            fq,
                            PendingMember {
                                kind: PendingKind::Method,
                                name: raw.name.clone(),
                                descriptor,
                            },
                        );
                    }
                }
                RawDeclaration::Property(raw) => {
                    if !seen.insert((raw.name.clone(), MemberKind::Property)) {
                        continue;
                    }
                    for id in session.member(graph, scope, &raw.name, MemberKind::Property) {
                        let ty = session.property_type(graph, id);
                        let descriptor = mapper::type_text(session, &ty);
                        stage.for_package(session, fq, &files);
                        stage.add_package_member(
                            fq,
                            PendingMember {
                                kind: PendingKind::Field,
                                name: raw.name.clone(),
                                descriptor,
                            },
                        );
                    }
                }
            }
        }
    }
}

/// Emit one source class: its implementation unit, its trait-defaults unit if
/// needed, then its nested classes.
fn emit_class(
    session: &mut ResolveSession,
    graph: &ResolverGraph,
    stage: &mut EmissionStage,
    class: DescriptorId,
    file: &Rc<SourceFile>,
) {
    let raw = match &session.arena.class(class).origin {
        ClassOrigin::Source { raw, .. } => raw.clone(),
        _ => return,
    };
    let _ = session.class_supertypes(graph, class);
    let scope = session.class_scope(class);

    let kind = session.arena.class(class).kind;
    let is_trait = kind == ClassKind::Interface;
    let kind_label = match kind {
        ClassKind::Class => "class",
        ClassKind::Interface => "trait",
        ClassKind::Enum => "enum",
    };
    let binary_name = mapper::class_unit_name(session, class);

    let mut methods: Vec<(String, String)> = Vec::new();
    let mut fields: Vec<(String, String)> = Vec::new();
    let mut defaults: Vec<(String, String)> = Vec::new();
    let mut nested: Vec<DescriptorId> = Vec::new();

    for constructor in session.member(graph, scope, "<init>", MemberKind::Constructor) {
        let params = session.constructor_params(graph, constructor);
        methods.push((
            "<init>".to_string(),
            mapper::constructor_descriptor(session, &params),
        ));
    }
    let mut seen: FxHashSet<(String, MemberKind)> = FxHashSet::default();
    for member in &raw.members {
        match member {
            RawDeclaration::Function(raw_fn) => {
                if !seen.insert((raw_fn.name.clone(), MemberKind::Function)) {
                    continue;
                }
                for id in session.member(graph, scope, &raw_fn.name, MemberKind::Function) {
                    let signature = session.function_signature(graph, id);
                    let descriptor = mapper::method_descriptor(session, &signature);
                    if is_trait && raw_fn.has_body {
                        defaults.push((raw_fn.name.clone(), descriptor.clone()));
                    }
                    methods.push((raw_fn.name.clone(), descriptor));
                }
            }
            RawDeclaration::Property(raw_prop) => {
                if !seen.insert((raw_prop.name.clone(), MemberKind::Property)) {
                    continue;
                }
                for id in session.member(graph, scope, &raw_prop.name, MemberKind::Property) {
                    let ty = session.property_type(graph, id);
                    fields.push((raw_prop.name.clone(), mapper::type_text(session, &ty)));
                }
            }
            RawDeclaration::Class(raw_nested) => {
                if !seen.insert((raw_nested.name.clone(), MemberKind::Class)) {
                    continue;
                }
                for id in session.member(graph, scope, &raw_nested.name, MemberKind::Class) {
                    nested.push(id);
                }
            }
        }
    }

    let unit = stage.for_class_implementation(session, class, file);
    let builder = stage.builder_mut(unit);
    builder.begin_class(&binary_name, kind_label);
    builder.annotate(COMPILED_ARTIFACT_MARKER);
    for (name, descriptor) in &methods {
        builder.declare_method(name, descriptor);
    }
    for (name, ty) in &fields {
        builder.declare_field(name, ty);
    }
    builder.end_class();

    if !defaults.is_empty() {
        let defaults_name = mapper::trait_defaults_name(session, class);
        let unit = stage.for_trait_defaults(session, class, file);
        let builder = stage.builder_mut(unit);
        builder.begin_class(&defaults_name, "defaults");
        builder.annotate(COMPILED_ARTIFACT_MARKER);
        for (name, descriptor) in &defaults {
            builder.declare_method(name, descriptor);
        }
        builder.end_class();
    }

    for id in nested {
        emit_class(session, graph, stage, id, file);
    }
}
