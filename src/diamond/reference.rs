//! Opaque reference tokens.
//!
//! References are only ever compared for equality and used as map keys.

use crate::element::ElementId;
use std::fmt;

/// Identity of a link transaction that created new edges.
///
/// Minted by the link coordinator; every element whose output pad was linked
/// in the same transaction receives the same trigger reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TriggerRef(u64);

impl TriggerRef {
    /// Create a trigger reference from a raw transaction number.
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }
}

impl fmt::Display for TriggerRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "trigger-{}", self.0)
    }
}

/// Identity of one search session.
///
/// Minted by the element that originates the search from an element-local
/// counter, so two elements can never mint the same reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SearchRef {
    origin: ElementId,
    seq: u64,
}

impl SearchRef {
    /// Create a search reference.
    pub const fn new(origin: ElementId, seq: u64) -> Self {
        Self { origin, seq }
    }

    /// Element that started the search.
    pub fn origin(&self) -> ElementId {
        self.origin
    }

    /// Position in the origin's sequence of searches.
    pub fn seq(&self) -> u64 {
        self.seq
    }
}

impl fmt::Display for SearchRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "search-{}-{}", self.origin.0, self.seq)
    }
}

/// Element-local generator for [`SearchRef`]s.
#[derive(Debug)]
pub(crate) struct SearchRefGenerator {
    origin: ElementId,
    next: u64,
}

impl SearchRefGenerator {
    pub(crate) fn new(origin: ElementId) -> Self {
        Self { origin, next: 0 }
    }

    pub(crate) fn mint(&mut self) -> SearchRef {
        let reference = SearchRef::new(self.origin, self.next);
        self.next += 1;
        reference
    }
}
