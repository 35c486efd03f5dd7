// src/memo.rs
//
// Write-once memoization primitives for the lazily resolved descriptor graph
// and the two-phase resolver wiring.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

/// A lazily computed, write-once field on an otherwise immutable node.
///
/// The first `set` wins; a second write is a fatal invariant violation, not
/// merely ignored.
#[derive(Debug, Clone)]
pub struct OnceSlot<T> {
    value: Option<T>,
}

impl<T> OnceSlot<T> {
    pub const fn empty() -> Self {
        Self { value: None }
    }

    pub fn is_set(&self) -> bool {
        self.value.is_some()
    }

    /// Store the resolved value. Panics with `what` if the slot was already
    /// written.
    pub fn set(&mut self, value: T, what: impl fmt::Display) {
        if self.value.is_some() {
            panic!("rewrite at {what}");
        }
        self.value = Some(value);
    }

    pub fn get(&self) -> Option<&T> {
        self.value.as_ref()
    }

    /// Read a value that the resolution protocol guarantees is present.
    /// Panics with `what` if forcing never happened; that is a caller bug.
    pub fn demand(&self, what: impl fmt::Display) -> &T {
        match &self.value {
            Some(value) => value,
            None => panic!("{what} was never resolved"),
        }
    }
}

impl<T> Default for OnceSlot<T> {
    fn default() -> Self {
        Self::empty()
    }
}

/// Per-aspect marker for re-entrant lazy forcing.
///
/// A request arriving while the aspect is `InProgress` receives the partially
/// built view instead of recursing; mutually recursive declarations are legal
/// programs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResolveState {
    #[default]
    NotStarted,
    InProgress,
    Done,
}

impl ResolveState {
    pub fn is_done(self) -> bool {
        self == ResolveState::Done
    }

    pub fn in_progress(self) -> bool {
        self == ResolveState::InProgress
    }
}

/// A late-bound reference to a sibling resolver service.
///
/// Constructed empty during the wiring graph's construction phase and
/// assigned exactly once during the connection phase. Holds the target weakly;
/// the graph keeps the only strong references, so tearing the graph down
/// cannot leak a cycle.
pub struct LateRef<T> {
    service: &'static str,
    slot: RefCell<Option<Weak<T>>>,
}

impl<T> LateRef<T> {
    pub fn unset(service: &'static str) -> Self {
        Self {
            service,
            slot: RefCell::new(None),
        }
    }

    /// Connection-phase wiring. Panics if the reference was already wired.
    pub fn set(&self, target: &Rc<T>) {
        let mut slot = self.slot.borrow_mut();
        if slot.is_some() {
            panic!("resolver service '{}' wired twice", self.service);
        }
        *slot = Some(Rc::downgrade(target));
    }

    /// Dereference the collaborator. Panics if the connection phase never
    /// wired it or the owning graph was dropped.
    pub fn get(&self) -> Rc<T> {
        match self.slot.borrow().as_ref() {
            Some(weak) => weak.upgrade().unwrap_or_else(|| {
                panic!("resolver service '{}' used after teardown", self.service)
            }),
            None => panic!("resolver service '{}' used before wiring", self.service),
        }
    }
}

impl<T> fmt::Debug for LateRef<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match self.slot.borrow().as_ref() {
            Some(_) => "wired",
            None => "unset",
        };
        write!(f, "LateRef({}, {})", self.service, state)
    }
}
