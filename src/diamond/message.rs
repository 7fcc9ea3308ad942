//! Messages exchanged by diamond detection and the actions it requests.

use crate::diamond::path::Path;
use crate::diamond::reference::{SearchRef, TriggerRef};
use crate::diamond::report::DiamondReport;
use crate::element::PadId;
use std::time::Duration;

/// A diamond-detection message addressed to one element.
#[derive(Debug, Clone, PartialEq)]
pub enum DetectionMessage {
    /// New edges were linked on this element's output pads.
    StartTrigger(TriggerRef),
    /// Upstream wake-up: re-evaluate whether a search should start.
    Trigger(TriggerRef),
    /// Self-timer: forget a processed trigger reference.
    DeleteTriggerRef(TriggerRef),
    /// Self-timer: the debounce elapsed, start a search.
    StartSearch,
    /// A search arriving through `input_pad`.
    Search {
        /// Search session.
        reference: SearchRef,
        /// Path travelled so far, newest hop first.
        path: Path,
        /// Input pad of the receiving element the search enters through.
        input_pad: PadId,
    },
    /// Self-timer: forget a remembered search path.
    DeleteSearchRef(SearchRef),
}

impl DetectionMessage {
    /// Short name for logging.
    pub fn name(&self) -> &'static str {
        match self {
            DetectionMessage::StartTrigger(_) => "start_trigger",
            DetectionMessage::Trigger(_) => "trigger",
            DetectionMessage::DeleteTriggerRef(_) => "delete_trigger_ref",
            DetectionMessage::StartSearch => "start_search",
            DetectionMessage::Search { .. } => "search",
            DetectionMessage::DeleteSearchRef(_) => "delete_search_ref",
        }
    }
}

/// Side effect requested by a detection handler.
///
/// Handlers never perform I/O; the host executes these in order after the
/// handler returns.
#[derive(Debug, Clone, PartialEq)]
pub enum DetectionAction {
    /// Deliver `message` to the peer linked on this element's `pad`.
    Forward {
        /// Local pad to send across.
        pad: PadId,
        /// Message for the peer.
        message: DetectionMessage,
    },
    /// Deliver `message` back to this element after `delay`.
    Schedule {
        /// Delay before delivery.
        delay: Duration,
        /// Self-addressed message.
        message: DetectionMessage,
    },
    /// Hand a diamond to the reporting sink.
    Report(DiamondReport),
}
