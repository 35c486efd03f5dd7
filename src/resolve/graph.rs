// src/resolve/graph.rs
//
// Assembly of the resolver services. Construction happens in two phases:
// every service is first created bare, then the connection phase wires the
// late-bound cross-references. Using a service before `build` returns is a
// fatal wiring error, as is wiring one twice.

use std::cell::Cell;
use std::rc::Rc;

use crate::errors::{Diagnostic, ErrorReporter, Location, ResolveError};
use crate::foreign::model::ForeignClassFinder;
use crate::foreign::resolvers::{
    ArtifactDetector, ForeignAnnotationResolver, ForeignClassResolver, ForeignConstructorResolver,
    ForeignFragmentProvider, ForeignFunctionResolver, ForeignMemberResolver,
    ForeignPropertyResolver, ForeignSupertypeResolver, TypeParameterResolver, TypeTransformer,
    ValueParameterResolver,
};
use crate::foreign::statics::{SamConverter, StaticMemberFilter, StaticMemberPolicy};

/// The wired set of resolver services, plus the injected collaborators
/// (class finders and the error reporter). Services are stateless; the graph
/// holds the only strong references to them.
pub struct ResolverGraph {
    finders: Vec<Rc<dyn ForeignClassFinder>>,
    reporter: Rc<dyn ErrorReporter>,
    pub classes: Rc<ForeignClassResolver>,
    pub fragments: Rc<ForeignFragmentProvider>,
    pub members: Rc<ForeignMemberResolver>,
    pub functions: Rc<ForeignFunctionResolver>,
    pub properties: Rc<ForeignPropertyResolver>,
    pub constructors: Rc<ForeignConstructorResolver>,
    pub value_params: Rc<ValueParameterResolver>,
    pub annotations: Rc<ForeignAnnotationResolver>,
    pub supertypes: Rc<ForeignSupertypeResolver>,
    pub type_params: Rc<TypeParameterResolver>,
    pub types: Rc<TypeTransformer>,
    pub sam: Rc<SamConverter>,
    pub statics: Rc<StaticMemberFilter>,
    pub artifacts: Rc<ArtifactDetector>,
    disposed: Cell<bool>,
}

impl ResolverGraph {
    pub fn build(
        finders: Vec<Rc<dyn ForeignClassFinder>>,
        reporter: Rc<dyn ErrorReporter>,
    ) -> Self {
        Self::with_policy(finders, reporter, StaticMemberPolicy::default())
    }

    pub fn with_policy(
        finders: Vec<Rc<dyn ForeignClassFinder>>,
        reporter: Rc<dyn ErrorReporter>,
        policy: StaticMemberPolicy,
    ) -> Self {
        // Construction phase: every service exists before any is wired.
        let graph = Self {
            finders,
            reporter,
            classes: Rc::new(ForeignClassResolver::new()),
            fragments: Rc::new(ForeignFragmentProvider::new()),
            members: Rc::new(ForeignMemberResolver::new()),
            functions: Rc::new(ForeignFunctionResolver::new()),
            properties: Rc::new(ForeignPropertyResolver::new()),
            constructors: Rc::new(ForeignConstructorResolver::new()),
            value_params: Rc::new(ValueParameterResolver::new()),
            annotations: Rc::new(ForeignAnnotationResolver::new()),
            supertypes: Rc::new(ForeignSupertypeResolver::new()),
            type_params: Rc::new(TypeParameterResolver::new()),
            types: Rc::new(TypeTransformer::new()),
            sam: Rc::new(SamConverter::new()),
            statics: Rc::new(StaticMemberFilter::new(policy)),
            artifacts: Rc::new(ArtifactDetector::new()),
            disposed: Cell::new(false),
        };
        graph.connect();
        graph
    }

    /// Connection phase. Each cross-reference is assigned exactly once.
    fn connect(&self) {
        self.classes.artifacts.set(&self.artifacts);
        self.classes.sam.set(&self.sam);
        self.classes.type_params.set(&self.type_params);

        self.fragments.classes.set(&self.classes);
        self.fragments.statics.set(&self.statics);
        self.fragments.artifacts.set(&self.artifacts);

        self.members.classes.set(&self.classes);
        self.members.functions.set(&self.functions);
        self.members.properties.set(&self.properties);
        self.members.constructors.set(&self.constructors);
        self.members.statics.set(&self.statics);
        self.members.sam.set(&self.sam);

        self.functions.types.set(&self.types);
        self.functions.value_params.set(&self.value_params);
        self.functions.type_params.set(&self.type_params);

        self.properties.types.set(&self.types);
        self.constructors.value_params.set(&self.value_params);
        self.value_params.types.set(&self.types);

        self.supertypes.classes.set(&self.classes);
        self.supertypes.types.set(&self.types);

        self.types.classes.set(&self.classes);
    }

    pub fn finders(&self) -> &[Rc<dyn ForeignClassFinder>] {
        &self.finders
    }

    pub fn reporter(&self) -> &Rc<dyn ErrorReporter> {
        &self.reporter
    }

    pub fn report(&self, location: Location, error: ResolveError) {
        self.reporter.report(Diagnostic { location, error });
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.get()
    }

    /// Release the finders' underlying resources. Idempotent.
    pub fn dispose(&self) {
        if self.disposed.replace(true) {
            return;
        }
        tracing::debug!(finders = self.finders.len(), "disposing resolver graph");
        for finder in &self.finders {
            finder.dispose();
        }
    }
}
