//! Per-element diamond detector.

use crate::diamond::config::DetectionConfig;
use crate::diamond::message::{DetectionAction, DetectionMessage};
use crate::diamond::reference::SearchRefGenerator;
use crate::diamond::state::{DetectionSnapshot, DetectionState};
use crate::element::{ElementId, ElementKind, PadTable};
use std::sync::Arc;

/// What a detector may know about the element hosting it.
///
/// This is the element's purely local view: its identity, its kind and its
/// own pad table. A detector never sees any other part of the graph.
#[derive(Debug, Clone, Copy)]
pub struct ElementView<'a> {
    /// Element identity.
    pub id: ElementId,
    /// Human-readable label used in path vertices.
    pub label: &'a Arc<str>,
    /// Element kind.
    pub kind: ElementKind,
    /// The element's pads and their peers.
    pub pads: &'a PadTable,
}

impl<'a> ElementView<'a> {
    /// Create a view.
    pub fn new(id: ElementId, label: &'a Arc<str>, kind: ElementKind, pads: &'a PadTable) -> Self {
        Self {
            id,
            label,
            kind,
            pads,
        }
    }
}

/// Diamond-detection logic of one element.
///
/// The detector performs no I/O. [`handle`](Self::handle) runs one message to
/// completion and returns the actions the host must carry out: forwarding
/// messages across pads, scheduling self-addressed timers, and reporting.
#[derive(Debug)]
pub struct DiamondDetector {
    pub(super) config: Arc<DetectionConfig>,
    pub(super) state: DetectionState,
    pub(super) refs: SearchRefGenerator,
}

impl DiamondDetector {
    /// Create a detector for `element`.
    pub fn new(element: ElementId, config: Arc<DetectionConfig>) -> Self {
        Self {
            config,
            state: DetectionState::new(),
            refs: SearchRefGenerator::new(element),
        }
    }

    /// Handle one message and return the resulting actions, in order.
    pub fn handle(
        &mut self,
        view: &ElementView<'_>,
        message: DetectionMessage,
    ) -> Vec<DetectionAction> {
        let mut actions = Vec::new();
        if !self.config.enabled {
            return actions;
        }

        tracing::trace!(
            element = %view.label,
            message = message.name(),
            "handling detection message"
        );

        match message {
            DetectionMessage::StartTrigger(reference) => {
                self.handle_start_trigger(view, reference, &mut actions)
            }
            DetectionMessage::Trigger(reference) => {
                self.handle_trigger(view, reference, &mut actions)
            }
            DetectionMessage::DeleteTriggerRef(reference) => {
                self.state.forget_trigger(&reference);
            }
            DetectionMessage::StartSearch => self.handle_start_search(view, &mut actions),
            DetectionMessage::Search {
                reference,
                path,
                input_pad,
            } => self.handle_search(view, reference, path, input_pad, &mut actions),
            DetectionMessage::DeleteSearchRef(reference) => {
                if self.state.forget_search(&reference) {
                    crate::observability::record_remembered_searches(
                        view.label,
                        self.state.remembered_count(),
                    );
                }
            }
        }

        actions
    }

    /// Current detection state.
    pub fn state(&self) -> &DetectionState {
        &self.state
    }

    /// Snapshot of the detection counters.
    pub fn snapshot(&self) -> DetectionSnapshot {
        self.state.snapshot()
    }

    /// Configuration in use.
    pub fn config(&self) -> &DetectionConfig {
        &self.config
    }
}
