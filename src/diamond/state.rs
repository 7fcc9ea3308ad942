//! Per-element diamond-detection state.

use crate::diamond::path::Path;
use crate::diamond::reference::{SearchRef, TriggerRef};
use std::collections::{HashMap, HashSet};

/// State owned by a single element.
///
/// Every entry in `ref_to_path` and `trigger_refs` has exactly one expiry
/// message in flight; removal of an absent key is a no-op.
#[derive(Debug, Default)]
pub struct DetectionState {
    /// First path remembered for each search reference.
    ref_to_path: HashMap<SearchRef, Path>,
    /// Trigger references already handled.
    trigger_refs: HashSet<TriggerRef>,
    /// Whether a deferred search start is pending.
    search_postponed: bool,
}

impl DetectionState {
    /// Create empty state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Path remembered for `reference`.
    pub fn remembered(&self, reference: &SearchRef) -> Option<&Path> {
        self.ref_to_path.get(reference)
    }

    /// Remember `path` for `reference`.
    ///
    /// Returns `false` if a path is already remembered; the existing one is
    /// kept.
    pub fn remember(&mut self, reference: SearchRef, path: Path) -> bool {
        match self.ref_to_path.entry(reference) {
            std::collections::hash_map::Entry::Occupied(_) => false,
            std::collections::hash_map::Entry::Vacant(slot) => {
                slot.insert(path);
                true
            }
        }
    }

    /// Forget the path remembered for `reference`.
    pub fn forget_search(&mut self, reference: &SearchRef) -> bool {
        self.ref_to_path.remove(reference).is_some()
    }

    /// Check if the trigger reference was already handled.
    pub fn has_trigger(&self, reference: &TriggerRef) -> bool {
        self.trigger_refs.contains(reference)
    }

    /// Record a handled trigger reference.
    pub fn record_trigger(&mut self, reference: TriggerRef) -> bool {
        self.trigger_refs.insert(reference)
    }

    /// Forget a trigger reference.
    pub fn forget_trigger(&mut self, reference: &TriggerRef) -> bool {
        self.trigger_refs.remove(reference)
    }

    /// Whether a deferred search is pending.
    pub fn search_postponed(&self) -> bool {
        self.search_postponed
    }

    pub(crate) fn set_search_postponed(&mut self, postponed: bool) {
        self.search_postponed = postponed;
    }

    /// Number of remembered search paths.
    pub fn remembered_count(&self) -> usize {
        self.ref_to_path.len()
    }

    /// Number of remembered trigger references.
    pub fn trigger_count(&self) -> usize {
        self.trigger_refs.len()
    }

    /// Snapshot of the counters, for inspection.
    pub fn snapshot(&self) -> DetectionSnapshot {
        DetectionSnapshot {
            remembered_searches: self.ref_to_path.len(),
            trigger_refs: self.trigger_refs.len(),
            search_postponed: self.search_postponed,
        }
    }
}

/// Point-in-time view of an element's detection state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DetectionSnapshot {
    /// Number of remembered search paths.
    pub remembered_searches: usize,
    /// Number of remembered trigger references.
    pub trigger_refs: usize,
    /// Whether a deferred search is pending.
    pub search_postponed: bool,
}
