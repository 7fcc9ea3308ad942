//! Element tasks.
//!
//! Every element of a running pipeline is a tokio task that owns its pad
//! table and its diamond detector. Tasks talk to each other only through
//! their mailboxes; timers are separate tasks that sleep and post back into
//! the element's own mailbox.

use crate::diamond::{
    DetectionAction, DetectionMessage, DetectionSnapshot, DiamondDetector, DiamondSink, ElementView,
};
use crate::element::{ElementId, ElementKind, Pad, PadId, PadTable, Peer};
use crate::error::{Error, Result};
use crate::observability::{ElementMetrics, span_element};
use crate::pipeline::events::EventSender;
use crate::pipeline::flow::EffectiveFlowControl;
use kanal::{AsyncReceiver, AsyncSender, unbounded_async};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::Instrument;

/// Message delivered to an element task.
pub(crate) enum ElementMessage {
    /// Diamond-detection traffic.
    Detection(DetectionMessage),
    /// A pad was added to the element.
    PadAdded(Pad),
    /// One of the element's pads was linked.
    PadLinked {
        pad: PadId,
        peer: Peer,
        mode: EffectiveFlowControl,
        mailbox: Mailbox,
    },
    /// One of the element's pads was unlinked.
    PadUnlinked(PadId),
    /// The effective flow control of a pad changed.
    SetEffectiveFlowControl {
        pad: PadId,
        mode: EffectiveFlowControl,
    },
    /// Report the detection counters.
    Inspect(oneshot::Sender<DetectionSnapshot>),
    /// Leave the message loop.
    Stop,
}

/// Sending side of an element's mailbox.
#[derive(Clone)]
pub(crate) struct Mailbox {
    element: ElementId,
    sender: AsyncSender<ElementMessage>,
}

impl Mailbox {
    /// Create a mailbox for `element`, returning the receiving side as well.
    pub(crate) fn new(element: ElementId) -> (Self, AsyncReceiver<ElementMessage>) {
        let (sender, receiver) = unbounded_async();
        (Self { element, sender }, receiver)
    }

    /// Post a message without waiting.
    ///
    /// Fails only if the element task has stopped.
    pub(crate) fn post(&self, message: ElementMessage) -> Result<()> {
        match self.sender.try_send(message) {
            Ok(true) => Ok(()),
            _ => Err(Error::ElementStopped(self.element)),
        }
    }

    /// Check if the element task has stopped accepting messages.
    pub(crate) fn is_closed(&self) -> bool {
        self.sender.is_closed() || self.sender.is_disconnected()
    }
}

/// Everything an element task needs to run.
pub(crate) struct ElementTask {
    pub(crate) id: ElementId,
    pub(crate) label: Arc<str>,
    pub(crate) kind: ElementKind,
    pub(crate) pads: PadTable,
    pub(crate) peers: HashMap<PadId, Mailbox>,
    pub(crate) detector: DiamondDetector,
    pub(crate) mailbox: Mailbox,
    pub(crate) inbox: AsyncReceiver<ElementMessage>,
    pub(crate) sinks: Arc<[Arc<dyn DiamondSink>]>,
    pub(crate) events: EventSender,
    pub(crate) metrics: ElementMetrics,
}

impl ElementTask {
    /// Spawn the task on the current tokio runtime.
    pub(crate) fn spawn(self) -> JoinHandle<Result<()>> {
        let span = span_element(self.metrics.pipeline(), &self.label, self.kind.as_str());
        tokio::spawn(self.run().instrument(span))
    }

    async fn run(mut self) -> Result<()> {
        tracing::debug!("element '{}' started", self.label);
        self.events.send_element_started(self.label.as_ref());
        self.metrics.record_linked_pads(self.linked_pads());

        let mut handled: u64 = 0;
        while let Ok(message) = self.inbox.recv().await {
            handled += 1;
            self.metrics.record_message();
            match message {
                ElementMessage::Detection(message) => self.on_detection(message),
                ElementMessage::PadAdded(pad) => {
                    let id = pad.id().clone();
                    if !self.pads.add(pad) {
                        tracing::warn!(pad = %id, "ignoring duplicate pad");
                    }
                }
                ElementMessage::PadLinked {
                    pad,
                    peer,
                    mode,
                    mailbox,
                } => {
                    if self.pads.link(&pad, peer, mode) {
                        self.peers.insert(pad, mailbox);
                    } else {
                        tracing::warn!(pad = %pad, "link for unknown pad");
                    }
                    self.metrics.record_linked_pads(self.linked_pads());
                }
                ElementMessage::PadUnlinked(pad) => {
                    self.pads.unlink(&pad);
                    self.peers.remove(&pad);
                    self.metrics.record_linked_pads(self.linked_pads());
                }
                ElementMessage::SetEffectiveFlowControl { pad, mode } => {
                    self.pads.set_effective_flow_control(&pad, mode);
                }
                ElementMessage::Inspect(reply) => {
                    let _ = reply.send(self.detector.snapshot());
                }
                ElementMessage::Stop => break,
            }
        }

        // Pending `Inspect` replies must see the sender dropped
        while let Ok(Some(_)) = self.inbox.try_recv() {}
        let _ = self.inbox.close();
        while let Ok(Some(_)) = self.inbox.try_recv() {}

        tracing::debug!("element '{}' stopped", self.label);
        self.events.send_element_stopped(self.label.as_ref(), handled);
        Ok(())
    }

    fn on_detection(&mut self, message: DetectionMessage) {
        let view = ElementView::new(self.id, &self.label, self.kind, &self.pads);
        let actions = self.detector.handle(&view, message);

        for action in actions {
            match action {
                DetectionAction::Forward { pad, message } => {
                    let Some(peer) = self.peers.get(&pad) else {
                        tracing::debug!(pad = %pad, "no peer for forwarded message");
                        continue;
                    };
                    if peer.post(ElementMessage::Detection(message)).is_err() {
                        tracing::debug!(pad = %pad, "peer stopped, message dropped");
                        self.metrics.record_dropped();
                    }
                }
                DetectionAction::Schedule { delay, message } => {
                    let mailbox = self.mailbox.clone();
                    tokio::spawn(async move {
                        tokio::time::sleep(delay).await;
                        // The element may have stopped in the meantime
                        let _ = mailbox.post(ElementMessage::Detection(message));
                    });
                }
                DetectionAction::Report(report) => {
                    for sink in self.sinks.iter() {
                        sink.report(&report);
                    }
                }
            }
        }
    }

    fn linked_pads(&self) -> usize {
        self.pads.iter().filter(|entry| entry.is_linked()).count()
    }
}
