//! Trigger propagation.
//!
//! After a link transaction the coordinator sends `StartTrigger` to every
//! element whose output pad was just linked. Triggers travel upstream across
//! non-push input pads, so every element whose demand might now reach the new
//! edge gets a chance to look at its outputs. An element with two or more
//! pull outputs schedules a debounced search; any further triggers arriving
//! while that search is pending are absorbed.

use crate::diamond::detector::{DiamondDetector, ElementView};
use crate::diamond::message::{DetectionAction, DetectionMessage};
use crate::diamond::reference::TriggerRef;

impl DiamondDetector {
    pub(super) fn handle_start_trigger(
        &mut self,
        view: &ElementView<'_>,
        reference: TriggerRef,
        actions: &mut Vec<DetectionAction>,
    ) {
        if view.pads.len() < 2 || self.state.has_trigger(&reference) {
            return;
        }
        self.handle_trigger(view, reference, actions);
    }

    pub(super) fn handle_trigger(
        &mut self,
        view: &ElementView<'_>,
        reference: TriggerRef,
        actions: &mut Vec<DetectionAction>,
    ) {
        if view.kind.is_endpoint() || self.state.has_trigger(&reference) {
            return;
        }

        self.state.record_trigger(reference);
        actions.push(DetectionAction::Schedule {
            delay: self.config.ref_expiry,
            message: DetectionMessage::DeleteTriggerRef(reference),
        });
        crate::observability::record_trigger_handled(view.label);

        for (pad, _) in view.pads.non_push_inputs() {
            actions.push(DetectionAction::Forward {
                pad: pad.clone(),
                message: DetectionMessage::Trigger(reference),
            });
        }

        if view.pads.pull_outputs().count() >= 2 && !self.state.search_postponed() {
            tracing::debug!(
                element = %view.label,
                reference = %reference,
                delay = ?self.config.search_debounce,
                "scheduling diamond search"
            );
            actions.push(DetectionAction::Schedule {
                delay: self.config.search_debounce,
                message: DetectionMessage::StartSearch,
            });
            self.state.set_search_postponed(true);
        }
    }
}
