// src/syntax.rs
//
// The syntax-facing input model. The parser is an external collaborator; it
// hands the session raw declarations through `DeclarationProvider`. Nothing
// here performs resolution.

use std::path::PathBuf;
use std::rc::Rc;

use rustc_hash::FxHashMap;

/// One parsed source file.
///
/// Synthesized/virtual files have no backing `path`; they are excluded from
/// change-tracking provenance.
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub name: String,
    pub path: Option<PathBuf>,
    /// Dotted package name; empty for the root package.
    pub package: String,
    pub declarations: Vec<RawDeclaration>,
}

impl SourceFile {
    pub fn physical(
        name: impl Into<String>,
        path: impl Into<PathBuf>,
        package: impl Into<String>,
        declarations: Vec<RawDeclaration>,
    ) -> Rc<Self> {
        Rc::new(Self {
            name: name.into(),
            path: Some(path.into()),
            package: package.into(),
            declarations,
        })
    }

    pub fn synthetic(
        name: impl Into<String>,
        package: impl Into<String>,
        declarations: Vec<RawDeclaration>,
    ) -> Rc<Self> {
        Rc::new(Self {
            name: name.into(),
            path: None,
            package: package.into(),
            declarations,
        })
    }
}

#[derive(Debug, Clone)]
pub enum RawDeclaration {
    Class(Rc<RawClass>),
    Function(Rc<RawFunction>),
    Property(Rc<RawProperty>),
}

impl RawDeclaration {
    pub fn name(&self) -> &str {
        match self {
            RawDeclaration::Class(c) => &c.name,
            RawDeclaration::Function(f) => &f.name,
            RawDeclaration::Property(p) => &p.name,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawClassKind {
    Class,
    Interface,
    Enum,
}

#[derive(Debug, Clone)]
pub struct RawClass {
    pub name: String,
    pub kind: RawClassKind,
    pub type_params: Vec<String>,
    pub supertypes: Vec<RawTypeName>,
    pub constructors: Vec<RawConstructor>,
    pub members: Vec<RawDeclaration>,
}

#[derive(Debug, Clone)]
pub struct RawFunction {
    pub name: String,
    pub type_params: Vec<String>,
    pub params: Vec<RawParam>,
    /// Missing annotation means the unit type.
    pub return_type: Option<RawTypeName>,
    pub has_body: bool,
}

#[derive(Debug, Clone)]
pub struct RawProperty {
    pub name: String,
    pub ty: RawTypeName,
    pub is_mutable: bool,
}

#[derive(Debug, Clone)]
pub struct RawConstructor {
    pub params: Vec<RawParam>,
}

#[derive(Debug, Clone)]
pub struct RawParam {
    pub name: String,
    pub ty: RawTypeName,
}

/// An unresolved type reference as written: a short or dotted name plus
/// type arguments.
#[derive(Debug, Clone)]
pub struct RawTypeName {
    pub name: String,
    pub args: Vec<RawTypeName>,
}

impl RawTypeName {
    pub fn simple(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            args: Vec::new(),
        }
    }
}

/// Source-only declaration lookup. Given a binary name this yields nothing;
/// foreign symbols come through the class finder instead.
pub trait DeclarationProvider {
    /// Whether any source file declares the given dotted package (directly or
    /// through a subpackage).
    fn package_exists(&self, package: &str) -> bool;

    /// Raw top-level declarations with the given short name in the package.
    fn declarations_in(&self, package: &str, name: &str) -> Vec<RawDeclaration>;

    /// All top-level declared names in the package, for full forcing.
    fn declared_names(&self, package: &str) -> Vec<String>;

    /// Files contributing to the package, for emission provenance.
    fn files_in(&self, package: &str) -> Vec<Rc<SourceFile>>;

    /// The file a given top-level declaration came from.
    fn file_of(&self, package: &str, name: &str) -> Option<Rc<SourceFile>>;
}

/// In-memory provider over a fixed file set.
#[derive(Debug, Default)]
pub struct MemoryDeclarations {
    by_package: FxHashMap<String, Vec<Rc<SourceFile>>>,
}

impl MemoryDeclarations {
    pub fn new(files: impl IntoIterator<Item = Rc<SourceFile>>) -> Self {
        let mut by_package: FxHashMap<String, Vec<Rc<SourceFile>>> = FxHashMap::default();
        for file in files {
            by_package
                .entry(file.package.clone())
                .or_default()
                .push(file);
        }
        Self { by_package }
    }
}

impl DeclarationProvider for MemoryDeclarations {
    fn package_exists(&self, package: &str) -> bool {
        self.by_package.keys().any(|declared| {
            declared == package
                || (package.is_empty() && !declared.is_empty())
                || declared
                    .strip_prefix(package)
                    .is_some_and(|rest| rest.starts_with('.'))
        })
    }

    fn declarations_in(&self, package: &str, name: &str) -> Vec<RawDeclaration> {
        let Some(files) = self.by_package.get(package) else {
            return Vec::new();
        };
        files
            .iter()
            .flat_map(|file| file.declarations.iter())
            .filter(|decl| decl.name() == name)
            .cloned()
            .collect()
    }

    fn declared_names(&self, package: &str) -> Vec<String> {
        let Some(files) = self.by_package.get(package) else {
            return Vec::new();
        };
        let mut names: Vec<String> = files
            .iter()
            .flat_map(|file| file.declarations.iter())
            .map(|decl| decl.name().to_string())
            .collect();
        names.sort();
        names.dedup();
        names
    }

    fn files_in(&self, package: &str) -> Vec<Rc<SourceFile>> {
        self.by_package.get(package).cloned().unwrap_or_default()
    }

    fn file_of(&self, package: &str, name: &str) -> Option<Rc<SourceFile>> {
        self.by_package.get(package)?.iter().find_map(|file| {
            file.declarations
                .iter()
                .any(|decl| decl.name() == name)
                .then(|| file.clone())
        })
    }
}
