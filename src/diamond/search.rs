//! Search broadcasting and diamond discovery.
//!
//! A search starts at an element with several pull outputs and floods
//! downstream across pull-mode output pads, accumulating the path it took.
//! Every element remembers the first path it saw for each search reference
//! and forwards only that one. A later arrival under the same reference is
//! either a cycle (dropped), a path sharing a prefix with the remembered one
//! (ignored), or the second leg of a diamond (reported, not forwarded).

use crate::diamond::config::{PathComparison, PostponePolicy};
use crate::diamond::detector::{DiamondDetector, ElementView};
use crate::diamond::message::{DetectionAction, DetectionMessage};
use crate::diamond::path::{Path, Vertex};
use crate::diamond::reference::SearchRef;
use crate::diamond::report::DiamondReport;
use crate::element::PadId;
use std::sync::Arc;

impl PathComparison {
    /// Check if two paths of the same search share a common prefix under
    /// this rule.
    pub fn shares_prefix(&self, remembered: &Path, arrived: &Path) -> bool {
        match self {
            PathComparison::Origin => remembered.same_origin(arrived),
            PathComparison::FirstHop => {
                remembered.same_origin(arrived) && remembered.first_hop() == arrived.first_hop()
            }
            PathComparison::FullPath => remembered == arrived,
        }
    }
}

impl DiamondDetector {
    pub(super) fn handle_start_search(
        &mut self,
        view: &ElementView<'_>,
        actions: &mut Vec<DetectionAction>,
    ) {
        if self.config.postpone_policy == PostponePolicy::ResetOnFire {
            self.state.set_search_postponed(false);
        }

        let reference = self.refs.mint();
        let path = Path::new(Vertex::new(view.id, Arc::clone(view.label)));

        tracing::debug!(
            element = %view.label,
            reference = %reference,
            outputs = view.pads.pull_outputs().count(),
            "starting diamond search"
        );
        crate::observability::record_search_started(view.label);

        self.forward_search(view, reference, &path, actions);
    }

    fn forward_search(
        &self,
        view: &ElementView<'_>,
        reference: SearchRef,
        path: &Path,
        actions: &mut Vec<DetectionAction>,
    ) {
        for (pad, peer) in view.pads.pull_outputs() {
            let vertex = Vertex::new(view.id, Arc::clone(view.label)).with_output_pad(pad.clone());
            actions.push(DetectionAction::Forward {
                pad: pad.clone(),
                message: DetectionMessage::Search {
                    reference,
                    path: path.prepend(vertex),
                    input_pad: peer.pad.clone(),
                },
            });
            crate::observability::record_search_hop(view.label);
        }
    }

    pub(super) fn handle_search(
        &mut self,
        view: &ElementView<'_>,
        reference: SearchRef,
        incoming: Path,
        input_pad: PadId,
        actions: &mut Vec<DetectionAction>,
    ) {
        let vertex = Vertex::new(view.id, Arc::clone(view.label)).with_input_pad(input_pad);
        let path = incoming.prepend(vertex);

        // The origin never remembers its own search
        if path.visits(view.id) > 1 {
            tracing::trace!(
                element = %view.label,
                reference = %reference,
                "search looped back, dropping"
            );
            return;
        }

        let Some(remembered) = self.state.remembered(&reference).cloned() else {
            self.state.remember(reference, path.clone());
            actions.push(DetectionAction::Schedule {
                delay: self.config.ref_expiry,
                message: DetectionMessage::DeleteSearchRef(reference),
            });
            crate::observability::record_remembered_searches(
                view.label,
                self.state.remembered_count(),
            );
            self.forward_search(view, reference, &path, actions);
            return;
        };

        if self.config.comparison.shares_prefix(&remembered, &path) {
            return;
        }

        let report = DiamondReport::new(
            view.id,
            Arc::clone(view.label),
            reference,
            remembered,
            path,
        );
        tracing::debug!(element = %view.label, %report, "search paths converged");
        crate::observability::record_diamond_detected(view.label);
        actions.push(DetectionAction::Report(report));
    }
}
