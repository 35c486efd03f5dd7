// src/resolve/scope.rs
//
// Lazily populated member scopes. A scope maps (name, kind) to a descriptor
// set, backed by either a source declaration provider or a foreign reflection
// view; entries materialize one at a time on demand and a scope never fully
// materializes unless explicitly forced.

use hashbrown::{HashMap, HashSet};
use smallvec::SmallVec;

use crate::descriptors::DescriptorId;
use crate::identity::NameId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScopeId(u32);

impl ScopeId {
    pub fn index(self) -> u32 {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MemberKind {
    Class,
    Function,
    Property,
    Constructor,
}

impl MemberKind {
    pub fn label(self) -> &'static str {
        match self {
            MemberKind::Class => "class",
            MemberKind::Function => "function",
            MemberKind::Property => "property",
            MemberKind::Constructor => "constructor",
        }
    }
}

/// What produces a scope's members when an entry is first demanded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeBacking {
    /// Top-level declarations of a source package.
    SourcePackage { package: NameId },
    /// Members of a source-declared class.
    SourceClass { class: DescriptorId },
    /// Classes of a foreign package, via finder index.
    ForeignPackage { package: NameId, finder: usize },
    /// Instance and static members of a foreign class.
    ForeignClassMembers { class: DescriptorId },
    /// The static-members namespace view of a foreign class.
    ForeignStatics { class: DescriptorId },
}

pub type MemberSet = SmallVec<[DescriptorId; 1]>;

/// One lazily populated member scope.
#[derive(Debug)]
pub struct MemberScope {
    pub owner: DescriptorId,
    pub backing: ScopeBacking,
    entries: HashMap<(String, MemberKind), MemberSet>,
    in_progress: HashSet<(String, MemberKind)>,
    fully_forced: bool,
}

impl MemberScope {
    fn new(owner: DescriptorId, backing: ScopeBacking) -> Self {
        Self {
            owner,
            backing,
            entries: HashMap::new(),
            in_progress: HashSet::new(),
            fully_forced: false,
        }
    }

    pub fn cached(&self, name: &str, kind: MemberKind) -> Option<&MemberSet> {
        self.entries.get(&(name.to_string(), kind))
    }

    /// Re-entrant lookups observe the in-progress marker and get the partial
    /// view instead of recursing.
    pub fn is_computing(&self, name: &str, kind: MemberKind) -> bool {
        self.in_progress.contains(&(name.to_string(), kind))
    }

    pub fn begin(&mut self, name: &str, kind: MemberKind) {
        self.in_progress.insert((name.to_string(), kind));
    }

    /// Record a computed entry. Writing an entry that is already cached is a
    /// fatal invariant violation.
    pub fn complete(&mut self, name: &str, kind: MemberKind, members: MemberSet) {
        let key = (name.to_string(), kind);
        self.in_progress.remove(&key);
        if self.entries.insert(key, members).is_some() {
            panic!("rewrite of scope entry '{name}' ({})", kind.label());
        }
    }

    pub fn is_fully_forced(&self) -> bool {
        self.fully_forced
    }

    pub fn mark_fully_forced(&mut self) {
        self.fully_forced = true;
    }

    /// All descriptor ids cached so far. A partial view unless fully forced.
    pub fn known_members(&self) -> Vec<DescriptorId> {
        let mut members: Vec<DescriptorId> =
            self.entries.values().flat_map(|set| set.iter().copied()).collect();
        members.sort_by_key(|id| id.index());
        members.dedup();
        members
    }
}

/// Session-owned storage for all member scopes.
#[derive(Debug, Default)]
pub struct ScopeTable {
    scopes: Vec<MemberScope>,
}

impl ScopeTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alloc(&mut self, owner: DescriptorId, backing: ScopeBacking) -> ScopeId {
        let id = ScopeId(self.scopes.len() as u32);
        tracing::trace!(scope = id.index(), ?backing, "alloc scope");
        self.scopes.push(MemberScope::new(owner, backing));
        id
    }

    pub fn get(&self, id: ScopeId) -> &MemberScope {
        &self.scopes[id.0 as usize]
    }

    pub fn get_mut(&mut self, id: ScopeId) -> &mut MemberScope {
        &mut self.scopes[id.0 as usize]
    }
}
