//! Pipeline event system for async event handling.
//!
//! Events are emitted by the running pipeline and can be received
//! asynchronously by the caller. Diamond reports are delivered as
//! [`PipelineEvent::DiamondDetected`].

use crate::diamond::{DiamondReport, DiamondSink};
use futures::StreamExt;
use futures::stream::BoxStream;
use std::fmt;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::broadcast;

/// Events emitted by the pipeline during execution.
#[derive(Debug, Clone)]
pub enum PipelineEvent {
    /// Pipeline execution started.
    Started,

    /// Pipeline execution stopped.
    Stopped,

    /// An element task started.
    ElementStarted {
        /// The element that started.
        element: String,
    },

    /// An element task finished.
    ElementStopped {
        /// The element that stopped.
        element: String,
        /// Number of messages the element handled.
        messages_handled: u64,
    },

    /// Two pads were linked.
    Linked {
        /// Upstream element.
        src: String,
        /// Output pad.
        src_pad: String,
        /// Downstream element.
        sink: String,
        /// Input pad.
        sink_pad: String,
    },

    /// A link was removed.
    Unlinked {
        /// Upstream element.
        src: String,
        /// Output pad.
        src_pad: String,
    },

    /// A pull-mode diamond was found.
    DiamondDetected(DiamondReport),

    /// Warning (non-fatal issue).
    Warning {
        /// The warning message.
        message: String,
        /// The element that emitted the warning (if known).
        element: Option<String>,
    },
}

impl fmt::Display for PipelineEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineEvent::Started => write!(f, "Pipeline started"),
            PipelineEvent::Stopped => write!(f, "Pipeline stopped"),
            PipelineEvent::ElementStarted { element } => write!(f, "Element {} started", element),
            PipelineEvent::ElementStopped {
                element,
                messages_handled,
            } => {
                write!(f, "Element {} stopped ({} messages)", element, messages_handled)
            }
            PipelineEvent::Linked {
                src,
                src_pad,
                sink,
                sink_pad,
            } => write!(f, "Linked {}:{} -> {}:{}", src, src_pad, sink, sink_pad),
            PipelineEvent::Unlinked { src, src_pad } => write!(f, "Unlinked {}:{}", src, src_pad),
            PipelineEvent::DiamondDetected(report) => write!(f, "{}", report),
            PipelineEvent::Warning { message, element } => {
                if let Some(e) = element {
                    write!(f, "Warning in {}: {}", e, message)
                } else {
                    write!(f, "Warning: {}", message)
                }
            }
        }
    }
}

/// Sender for pipeline events.
///
/// This is held by the executor and every element task.
#[derive(Clone)]
pub struct EventSender {
    sender: broadcast::Sender<PipelineEvent>,
}

impl EventSender {
    /// Create a new event sender with the given capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Send an event.
    ///
    /// Returns the number of receivers that received the event.
    /// Returns 0 if there are no receivers (which is fine).
    pub fn send(&self, event: PipelineEvent) -> usize {
        self.sender.send(event).unwrap_or(0)
    }

    /// Send a warning event.
    pub fn send_warning(&self, message: impl Into<String>, element: Option<String>) {
        self.send(PipelineEvent::Warning {
            message: message.into(),
            element,
        });
    }

    /// Send an element started event.
    pub fn send_element_started(&self, element: impl Into<String>) {
        self.send(PipelineEvent::ElementStarted {
            element: element.into(),
        });
    }

    /// Send an element stopped event.
    pub fn send_element_stopped(&self, element: impl Into<String>, messages_handled: u64) {
        self.send(PipelineEvent::ElementStopped {
            element: element.into(),
            messages_handled,
        });
    }

    /// Create a receiver for events.
    pub fn subscribe(&self) -> EventReceiver {
        EventReceiver {
            receiver: self.sender.subscribe(),
        }
    }

    /// Create a stream of events.
    pub fn stream(&self) -> EventStream {
        EventStream::new(self.subscribe())
    }
}

impl Default for EventSender {
    fn default() -> Self {
        Self::new(256)
    }
}

impl DiamondSink for EventSender {
    fn report(&self, report: &DiamondReport) {
        self.send(PipelineEvent::DiamondDetected(report.clone()));
    }
}

/// Receiver for pipeline events.
///
/// Multiple receivers can be created from a single sender.
pub struct EventReceiver {
    receiver: broadcast::Receiver<PipelineEvent>,
}

impl EventReceiver {
    /// Receive the next event.
    ///
    /// Returns `None` if the sender has been dropped.
    pub async fn recv(&mut self) -> Option<PipelineEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "event receiver lagged");
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Try to receive an event without blocking.
    ///
    /// Returns `None` if no event is available or the sender has been dropped.
    pub fn try_recv(&mut self) -> Option<PipelineEvent> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => return Some(event),
                Err(broadcast::error::TryRecvError::Lagged(_)) => continue,
                Err(_) => return None,
            }
        }
    }

    /// Wait for the next diamond report, skipping other events.
    ///
    /// Returns `None` once the pipeline has stopped.
    pub async fn next_diamond(&mut self) -> Option<DiamondReport> {
        while let Some(event) = self.recv().await {
            match event {
                PipelineEvent::DiamondDetected(report) => return Some(report),
                PipelineEvent::Stopped => return None,
                _ => continue,
            }
        }
        None
    }
}

/// A stream adapter for receiving events.
///
/// Implements `Stream` for use with async iteration. The pending receive
/// is kept across polls, so a wakeup from the channel is never lost.
pub struct EventStream {
    inner: BoxStream<'static, PipelineEvent>,
}

impl EventStream {
    /// Create a new event stream from a receiver.
    pub fn new(receiver: EventReceiver) -> Self {
        let inner = futures::stream::unfold(receiver, |mut receiver| async move {
            let event = receiver.recv().await?;
            Some((event, receiver))
        });
        Self {
            inner: inner.boxed(),
        }
    }
}

impl futures::Stream for EventStream {
    type Item = PipelineEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.poll_next_unpin(cx)
    }
}
