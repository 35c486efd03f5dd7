// tests/emission_integration.rs
//
// End-to-end: parse-model input plus a foreign class index, through lazy
// resolution, into rendered output units.

use std::path::PathBuf;
use std::rc::Rc;

use sable::codegen::{emit_packages, CollectingTracker, EmissionStage, EmitError, TextBuilderFactory};
use sable::errors::CollectingReporter;
use sable::foreign::model::{build, ForeignClassFinder, ForeignClassKind, ForeignTypeRef, MemoryClassIndex};
use sable::resolve::session::{ResolveSession, SessionConfig};
use sable::resolve::ResolverGraph;
use sable::syntax::{
    MemoryDeclarations, RawClass, RawClassKind, RawConstructor, RawDeclaration, RawFunction,
    RawParam, RawProperty, RawTypeName, SourceFile,
};

fn app_file() -> Rc<SourceFile> {
    SourceFile::physical(
        "app.sab",
        "/src/app.sab",
        "app",
        vec![
            RawDeclaration::Class(Rc::new(RawClass {
                name: "Greeter".to_string(),
                kind: RawClassKind::Class,
                type_params: vec![],
                supertypes: vec![],
                constructors: vec![RawConstructor {
                    params: vec![RawParam {
                        name: "prefix".to_string(),
                        ty: RawTypeName::simple("Text"),
                    }],
                }],
                members: vec![
                    RawDeclaration::Function(Rc::new(RawFunction {
                        name: "greet".to_string(),
                        type_params: vec![],
                        params: vec![RawParam {
                            name: "name".to_string(),
                            ty: RawTypeName::simple("Text"),
                        }],
                        return_type: Some(RawTypeName::simple("Text")),
                        has_body: true,
                    })),
                    RawDeclaration::Property(Rc::new(RawProperty {
                        name: "version".to_string(),
                        ty: RawTypeName::simple("i32"),
                        is_mutable: false,
                    })),
                ],
            })),
            RawDeclaration::Class(Rc::new(RawClass {
                name: "Renderer".to_string(),
                kind: RawClassKind::Interface,
                type_params: vec![],
                supertypes: vec![],
                constructors: vec![],
                members: vec![
                    RawDeclaration::Function(Rc::new(RawFunction {
                        name: "render".to_string(),
                        type_params: vec![],
                        params: vec![RawParam {
                            name: "value".to_string(),
                            ty: RawTypeName::simple("i32"),
                        }],
                        return_type: None,
                        has_body: true,
                    })),
                    RawDeclaration::Function(Rc::new(RawFunction {
                        name: "target".to_string(),
                        type_params: vec![],
                        params: vec![],
                        return_type: Some(RawTypeName::simple("Text")),
                        has_body: false,
                    })),
                ],
            })),
            RawDeclaration::Function(Rc::new(RawFunction {
                name: "main".to_string(),
                type_params: vec![],
                params: vec![],
                return_type: None,
                has_body: true,
            })),
            RawDeclaration::Property(Rc::new(RawProperty {
                name: "LIMIT".to_string(),
                ty: RawTypeName::simple("i32"),
                is_mutable: false,
            })),
        ],
    )
}

fn foreign_index() -> MemoryClassIndex {
    let mut index = MemoryClassIndex::new();
    let mut text = build::class("host.lang.Text", ForeignClassKind::Class);
    text.methods.push(build::method(
        "length",
        false,
        ForeignTypeRef::Primitive("int".to_string()),
    ));
    index.insert(Rc::new(text));

    // A foreign class shadowed by the source Greeter; its members must not
    // leak into the emitted unit.
    let mut shadowed = build::class("app.Greeter", ForeignClassKind::Class);
    shadowed.methods.push(build::method(
        "foreignOnly",
        true,
        ForeignTypeRef::Primitive("int".to_string()),
    ));
    index.insert(Rc::new(shadowed));
    index
}

struct Pipeline {
    session: ResolveSession,
    graph: ResolverGraph,
    stage: EmissionStage,
    reporter: Rc<CollectingReporter>,
    tracker: Rc<CollectingTracker>,
    index: Rc<MemoryClassIndex>,
}

struct SharedTracker(Rc<CollectingTracker>);

impl sable::codegen::ProgressTracker for SharedTracker {
    fn report_output(&self, sources: &[PathBuf], output: &str) {
        self.0.report_output(sources, output);
    }
}

/// Opt-in resolution tracing: `RUST_LOG=sable=trace cargo test`.
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn pipeline() -> Pipeline {
    init_tracing();
    let index = Rc::new(foreign_index());
    let reporter = Rc::new(CollectingReporter::new());
    let tracker = Rc::new(CollectingTracker::new());
    let graph = ResolverGraph::build(
        vec![index.clone() as Rc<dyn ForeignClassFinder>],
        reporter.clone(),
    );
    let session = ResolveSession::new(
        Rc::new(MemoryDeclarations::new([app_file()])),
        SessionConfig {
            module_name: "<app>".to_string(),
            default_imports: vec!["host.lang".to_string()],
        },
    );
    let stage = EmissionStage::new(
        Box::new(TextBuilderFactory::new()),
        Box::new(SharedTracker(tracker.clone())),
    );
    Pipeline {
        session,
        graph,
        stage,
        reporter,
        tracker,
        index,
    }
}

#[test]
fn emits_one_unit_per_binary_name_in_registration_order() {
    let mut p = pipeline();
    emit_packages(&mut p.session, &p.graph, &mut p.stage, &["app"]);
    assert_eq!(
        p.stage.list_outputs(),
        vec![
            "app/Greeter".to_string(),
            "app/Renderer".to_string(),
            "app/Renderer$Defaults".to_string(),
            "app/PackageUnit".to_string(),
        ]
    );
    assert!(p.reporter.is_empty());
}

#[test]
fn class_unit_carries_resolved_signatures() {
    let mut p = pipeline();
    emit_packages(&mut p.session, &p.graph, &mut p.stage, &["app"]);
    let text = p.stage.render("app/Greeter").unwrap();
    assert!(text.starts_with("class app/Greeter\n"));
    assert!(text.contains("@sable.runtime.SableCompiled"));
    assert!(text.contains("method <init>: (host.lang.Text)"));
    assert!(text.contains("method greet: (host.lang.Text) -> host.lang.Text"));
    assert!(text.contains("field version: i32"));
    // The shadowed foreign class contributed nothing.
    assert!(!text.contains("foreignOnly"));
}

#[test]
fn trait_defaults_are_a_distinct_unit() {
    let mut p = pipeline();
    emit_packages(&mut p.session, &p.graph, &mut p.stage, &["app"]);
    let implementation = p.stage.render("app/Renderer").unwrap();
    assert!(implementation.contains("method render: (i32) -> unit"));
    assert!(implementation.contains("method target: () -> host.lang.Text"));

    let defaults = p.stage.render("app/Renderer$Defaults").unwrap();
    assert!(defaults.starts_with("defaults app/Renderer$Defaults\n"));
    assert!(defaults.contains("method render: (i32) -> unit"));
    // Bodiless members stay out of the defaults unit.
    assert!(!defaults.contains("target"));
}

#[test]
fn package_unit_holds_top_level_members_after_finalize() {
    let mut p = pipeline();
    emit_packages(&mut p.session, &p.graph, &mut p.stage, &["app"]);
    let first = p.stage.render("app/PackageUnit").unwrap();
    assert!(first.starts_with("package app/PackageUnit\n"));
    assert!(first.contains("method main: () -> unit"));
    assert!(first.contains("field LIMIT: i32"));
    // Finalization already ran; rendering again is byte-identical.
    assert_eq!(p.stage.render("app/PackageUnit").unwrap(), first);
}

#[test]
fn provenance_tracks_back_to_source_paths() {
    let mut p = pipeline();
    emit_packages(&mut p.session, &p.graph, &mut p.stage, &["app"]);
    assert_eq!(
        p.stage.source_files_for("app/Greeter"),
        &[PathBuf::from("/src/app.sab")]
    );
    let edges = p.tracker.edges();
    assert_eq!(edges[0].1, "app/Greeter");
    assert_eq!(edges[0].0, vec![PathBuf::from("/src/app.sab")]);
}

#[test]
fn rendering_an_unknown_output_is_recoverable() {
    let mut p = pipeline();
    emit_packages(&mut p.session, &p.graph, &mut p.stage, &["app"]);
    assert_eq!(
        p.stage.render("app/Nope"),
        Err(EmitError::UnknownOutput {
            name: "app/Nope".to_string()
        })
    );
}

#[test]
fn graph_teardown_releases_finders() {
    let p = pipeline();
    p.graph.dispose();
    p.graph.dispose();
    assert!(p.index.is_disposed());
}
