// src/identity.rs
//
// Interned fully-qualified names for declarations and packages.

use rustc_hash::FxHashMap;

/// Handle to an interned fully-qualified name.
///
/// Equality of `NameId`s is equality of names; the table guarantees one id
/// per distinct dotted name for its lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NameId(u32);

impl NameId {
    pub fn index(self) -> u32 {
        self.0
    }
}

#[derive(Debug, Clone)]
struct NameData {
    parent: Option<NameId>,
    segment: String,
    display: String,
}

/// Interning table for dotted fully-qualified names.
///
/// The root package is the empty name and is always present at index 0.
#[derive(Debug, Clone)]
pub struct NameTable {
    names: Vec<NameData>,
    lookup: FxHashMap<String, NameId>,
}

impl NameTable {
    pub fn new() -> Self {
        let mut table = Self {
            names: Vec::new(),
            lookup: FxHashMap::default(),
        };
        table.names.push(NameData {
            parent: None,
            segment: String::new(),
            display: String::new(),
        });
        table.lookup.insert(String::new(), NameId(0));
        table
    }

    /// The root package name.
    pub fn root(&self) -> NameId {
        NameId(0)
    }

    /// Intern a dotted name like `"a.b.C"`. The empty string is the root.
    pub fn intern(&mut self, dotted: &str) -> NameId {
        if let Some(id) = self.lookup.get(dotted) {
            return *id;
        }
        let mut current = self.root();
        for segment in dotted.split('.') {
            current = self.child(current, segment);
        }
        current
    }

    /// Intern a direct child of `parent`.
    pub fn child(&mut self, parent: NameId, segment: &str) -> NameId {
        let display = if self.is_root(parent) {
            segment.to_string()
        } else {
            format!("{}.{}", self.display(parent), segment)
        };
        if let Some(id) = self.lookup.get(&display) {
            return *id;
        }
        let id = NameId(self.names.len() as u32);
        self.names.push(NameData {
            parent: Some(parent),
            segment: segment.to_string(),
            display: display.clone(),
        });
        self.lookup.insert(display, id);
        id
    }

    /// Look up a dotted name without interning it.
    pub fn get(&self, dotted: &str) -> Option<NameId> {
        self.lookup.get(dotted).copied()
    }

    pub fn parent(&self, id: NameId) -> Option<NameId> {
        self.names[id.0 as usize].parent
    }

    /// Last segment of the name; empty for the root.
    pub fn short_name(&self, id: NameId) -> &str {
        &self.names[id.0 as usize].segment
    }

    /// Full dotted rendering of the name.
    pub fn display(&self, id: NameId) -> &str {
        &self.names[id.0 as usize].display
    }

    pub fn is_root(&self, id: NameId) -> bool {
        id.0 == 0
    }
}

impl Default for NameTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intern_is_idempotent() {
        let mut names = NameTable::new();
        let a = names.intern("a.b.C");
        let b = names.intern("a.b.C");
        assert_eq!(a, b);
        assert_eq!(names.display(a), "a.b.C");
        assert_eq!(names.short_name(a), "C");
    }

    #[test]
    fn parent_chain_reaches_root() {
        let mut names = NameTable::new();
        let c = names.intern("a.b.C");
        let b = names.parent(c).unwrap();
        assert_eq!(names.display(b), "a.b");
        let a = names.parent(b).unwrap();
        assert_eq!(names.display(a), "a");
        let root = names.parent(a).unwrap();
        assert!(names.is_root(root));
        assert_eq!(names.parent(root), None);
    }

    #[test]
    fn child_matches_intern() {
        let mut names = NameTable::new();
        let pkg = names.intern("a.b");
        let child = names.child(pkg, "C");
        assert_eq!(names.intern("a.b.C"), child);
    }

    #[test]
    fn root_is_empty_name() {
        let mut names = NameTable::new();
        assert_eq!(names.intern(""), names.root());
        assert_eq!(names.display(names.root()), "");
    }
}
