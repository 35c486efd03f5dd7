// src/resolve/force.rs
//
// Eager forcing of the lazy descriptor graph. Forcing visits every member
// entry of every reachable scope so that later consumers (emission, tests)
// can rely on fully materialized descriptors. Laziness is the default;
// forcing is an explicit opt-in at the end of resolution.

use rustc_hash::FxHashSet;

use crate::descriptors::{ClassOrigin, DescriptorId, DescriptorKind};
use crate::foreign::model::ForeignClass;

use super::graph::ResolverGraph;
use super::scope::{MemberKind, ScopeBacking, ScopeId};
use super::session::ResolveSession;

/// Force every lazy aspect of `root` and everything declared inside it.
/// Passing the module descriptor forces all fragments registered so far.
pub fn force_resolve_all_contents(
    session: &mut ResolveSession,
    graph: &ResolverGraph,
    root: DescriptorId,
) {
    let mut visited = FxHashSet::default();
    force(session, graph, root, &mut visited);
}

fn force(
    session: &mut ResolveSession,
    graph: &ResolverGraph,
    id: DescriptorId,
    visited: &mut FxHashSet<DescriptorId>,
) {
    if !visited.insert(id) {
        return;
    }
    enum Node {
        Module,
        Fragment,
        Class,
        Function,
        Property,
        Constructor,
        TypeParameter,
    }
    let node = match &session.arena.get(id).kind {
        DescriptorKind::Module(_) => Node::Module,
        DescriptorKind::PackageFragment(_) => Node::Fragment,
        DescriptorKind::Class(_) => Node::Class,
        DescriptorKind::Function(_) => Node::Function,
        DescriptorKind::Property(_) => Node::Property,
        DescriptorKind::Constructor(_) => Node::Constructor,
        DescriptorKind::TypeParameter(_) => Node::TypeParameter,
    };
    match node {
        Node::Module => {
            for fragment in session.registered_fragments() {
                force(session, graph, fragment, visited);
            }
        }
        Node::Fragment => {
            let scope = session.fragment_scope(id);
            force_scope(session, graph, scope, visited);
        }
        Node::Class => {
            let _ = session.class_supertypes(graph, id);
            let _ = session.class_annotations(graph, id);
            let scope = session.class_scope(id);
            force_scope(session, graph, scope, visited);
        }
        Node::Function => {
            let _ = session.function_signature(graph, id);
        }
        Node::Property => {
            let _ = session.property_type(graph, id);
        }
        Node::Constructor => {
            let _ = session.constructor_params(graph, id);
        }
        Node::TypeParameter => {}
    }
}

/// Force every entry a scope can possibly hold, then descend into the
/// resulting members.
fn force_scope(
    session: &mut ResolveSession,
    graph: &ResolverGraph,
    scope: ScopeId,
    visited: &mut FxHashSet<DescriptorId>,
) {
    if session.scopes.get(scope).is_fully_forced() {
        return;
    }
    let requests = scope_requests(session, graph, scope);
    for (name, kind) in requests {
        let members = session.member(graph, scope, &name, kind);
        for member in members {
            force(session, graph, member, visited);
        }
    }
    session.scopes.get_mut(scope).mark_fully_forced();
}

/// Every (name, kind) pair the scope's backing can answer.
fn scope_requests(
    session: &ResolveSession,
    graph: &ResolverGraph,
    scope: ScopeId,
) -> Vec<(String, MemberKind)> {
    let mut requests = Vec::new();
    match session.scopes.get(scope).backing {
        ScopeBacking::SourcePackage { package } => {
            let dotted = session.names.display(package);
            for name in session.source().declared_names(dotted) {
                requests.push((name.clone(), MemberKind::Class));
                requests.push((name.clone(), MemberKind::Function));
                requests.push((name, MemberKind::Property));
            }
        }
        ScopeBacking::SourceClass { class } => {
            let raw = match &session.arena.class(class).origin {
                ClassOrigin::Source { raw, .. } => raw,
                other => panic!("source scope on class with origin {other:?}"),
            };
            for member in &raw.members {
                let kind = match member {
                    crate::syntax::RawDeclaration::Class(_) => MemberKind::Class,
                    crate::syntax::RawDeclaration::Function(_) => MemberKind::Function,
                    crate::syntax::RawDeclaration::Property(_) => MemberKind::Property,
                };
                requests.push((member.name().to_string(), kind));
            }
            if !raw.constructors.is_empty() {
                requests.push(("<init>".to_string(), MemberKind::Constructor));
            }
        }
        ScopeBacking::ForeignPackage { package, finder } => {
            let dotted = session.names.display(package);
            if let Some(found) = graph.finders()[finder].find_package(dotted) {
                for name in found.class_names {
                    requests.push((name, MemberKind::Class));
                }
            }
        }
        ScopeBacking::ForeignClassMembers { class } | ScopeBacking::ForeignStatics { class } => {
            let handle = foreign_handle(session, class);
            for method in &handle.methods {
                requests.push((method.name.clone(), MemberKind::Function));
            }
            for field in &handle.fields {
                requests.push((field.name.clone(), MemberKind::Property));
            }
            for nested in &handle.nested {
                requests.push((nested.short_name().to_string(), MemberKind::Class));
            }
            if !handle.constructors.is_empty() {
                requests.push(("<init>".to_string(), MemberKind::Constructor));
            }
        }
    }
    requests.sort();
    requests.dedup();
    requests
}

fn foreign_handle(session: &ResolveSession, class: DescriptorId) -> std::rc::Rc<ForeignClass> {
    match &session.arena.class(class).origin {
        ClassOrigin::Foreign(handle) => handle.clone(),
        other => panic!("foreign scope on class with origin {other:?}"),
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use super::*;
    use crate::errors::CollectingReporter;
    use crate::foreign::model::{build, ForeignClassFinder, ForeignClassKind, ForeignTypeRef, MemoryClassIndex};
    use crate::resolve::session::SessionConfig;
    use crate::syntax::{
        MemoryDeclarations, RawClass, RawClassKind, RawDeclaration, RawFunction, RawProperty,
        RawTypeName, SourceFile,
    };

    #[test]
    fn forcing_a_package_materializes_every_member() {
        let file = SourceFile::physical(
            "lib.sab",
            "/src/lib.sab",
            "demo",
            vec![
                RawDeclaration::Class(Rc::new(RawClass {
                    name: "Pair".to_string(),
                    kind: RawClassKind::Class,
                    type_params: vec!["A".to_string(), "B".to_string()],
                    supertypes: vec![],
                    constructors: vec![],
                    members: vec![RawDeclaration::Property(Rc::new(RawProperty {
                        name: "first".to_string(),
                        ty: RawTypeName::simple("A"),
                        is_mutable: false,
                    }))],
                })),
                RawDeclaration::Function(Rc::new(RawFunction {
                    name: "pairOf".to_string(),
                    type_params: vec![],
                    params: vec![],
                    return_type: Some(RawTypeName::simple("Pair")),
                    has_body: true,
                })),
            ],
        );

        let mut index = MemoryClassIndex::new();
        let mut helper = build::class("demo.Helpers", ForeignClassKind::Class);
        helper.methods.push(build::method(
            "twice",
            true,
            ForeignTypeRef::Primitive("int".to_string()),
        ));
        index.insert(Rc::new(helper));

        let reporter = Rc::new(CollectingReporter::new());
        let graph = ResolverGraph::build(
            vec![Rc::new(index) as Rc<dyn ForeignClassFinder>],
            reporter.clone(),
        );
        let mut session = crate::resolve::session::ResolveSession::new(
            Rc::new(MemoryDeclarations::new([file])),
            SessionConfig::default(),
        );

        let demo = session.names.intern("demo");
        let fragment = session.package_fragment(&graph, demo).unwrap();
        force_resolve_all_contents(&mut session, &graph, fragment);

        let scope = session.fragment_scope(fragment);
        assert!(session.scopes.get(scope).is_fully_forced());

        let pair = session.names.intern("demo.Pair");
        let pair_class = session.class_by_name(&graph, pair).unwrap();
        let class_scope = session.class_scope(pair_class);
        assert!(session.scopes.get(class_scope).is_fully_forced());

        // The nested property's type slot was forced to the type parameter.
        let first = session.member(&graph, class_scope, "first", MemberKind::Property);
        let ty = session.property_type(&graph, first[0]);
        assert_eq!(
            ty,
            crate::descriptors::TypeRef::TypeParam(session.arena.class(pair_class).type_params[0])
        );
        assert!(reporter.is_empty());
    }

    #[test]
    fn forcing_the_module_covers_registered_fragments() {
        let file = SourceFile::physical(
            "a.sab",
            "/src/a.sab",
            "alpha",
            vec![RawDeclaration::Function(Rc::new(RawFunction {
                name: "noop".to_string(),
                type_params: vec![],
                params: vec![],
                return_type: None,
                has_body: true,
            }))],
        );
        let reporter = Rc::new(CollectingReporter::new());
        let graph = ResolverGraph::build(vec![], reporter);
        let mut session = crate::resolve::session::ResolveSession::new(
            Rc::new(MemoryDeclarations::new([file])),
            SessionConfig::default(),
        );
        let alpha = session.names.intern("alpha");
        let fragment = session.package_fragment(&graph, alpha).unwrap();

        let module = session.module();
        force_resolve_all_contents(&mut session, &graph, module);
        let scope = session.fragment_scope(fragment);
        assert!(session.scopes.get(scope).is_fully_forced());
    }

    #[test]
    fn scope_requests_come_sorted_and_deduped() {
        let file = SourceFile::physical(
            "s.sab",
            "/src/s.sab",
            "pkg",
            vec![
                RawDeclaration::Function(Rc::new(RawFunction {
                    name: "zeta".to_string(),
                    type_params: vec![],
                    params: vec![],
                    return_type: None,
                    has_body: true,
                })),
                RawDeclaration::Class(Rc::new(RawClass {
                    name: "Alpha".to_string(),
                    kind: RawClassKind::Class,
                    type_params: vec![],
                    supertypes: vec![],
                    constructors: vec![],
                    members: vec![],
                })),
            ],
        );
        let reporter = Rc::new(CollectingReporter::new());
        let graph = ResolverGraph::build(vec![], reporter);
        let mut session = crate::resolve::session::ResolveSession::new(
            Rc::new(MemoryDeclarations::new([file])),
            SessionConfig::default(),
        );
        let pkg = session.names.intern("pkg");
        let fragment = session.package_fragment(&graph, pkg).unwrap();
        let scope = session.fragment_scope(fragment);

        let requests = scope_requests(&session, &graph, scope);
        let mut resorted = requests.clone();
        resorted.sort();
        resorted.dedup();
        assert_eq!(requests, resorted);
        assert!(requests.contains(&("Alpha".to_string(), MemberKind::Class)));
        assert!(requests.contains(&("zeta".to_string(), MemberKind::Function)));
    }
}
