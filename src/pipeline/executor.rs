//! Pipeline executor.
//!
//! The executor turns a [`Pipeline`] into running element tasks and returns a
//! [`PipelineHandle`]. The handle is the link coordinator of the running
//! pipeline: every topology change goes through it, is validated against
//! its copy of the graph and is then announced to the affected elements.
//!
//! # Example
//!
//! ```rust,ignore
//! use lattice::prelude::*;
//!
//! let executor = Executor::with_config(ExecutorConfig::default().with_name("demo"));
//! let mut handle = executor.start(pipeline)?;
//! let mut events = handle.subscribe();
//!
//! handle.link(Link::new(a, "out_1", b, "sink"))?;
//! if let Some(report) = events.next_diamond().await {
//!     println!("{report}");
//! }
//! handle.shutdown().await?;
//! ```

use crate::diamond::{
    DetectionConfig, DetectionMessage, DetectionSnapshot, DiamondDetector, DiamondSink,
    TracingSink, TriggerRef,
};
use crate::element::{ElementId, ElementKind, Pad, PadId, PadTable, Peer};
use crate::error::{Error, Result};
use crate::observability::{
    ElementMetrics, init_metrics, record_mailbox_dropped, span_pipeline, trace_link,
    trace_state_change,
};
use crate::pipeline::actor::{ElementMessage, ElementTask, Mailbox};
use crate::pipeline::events::{EventReceiver, EventSender, EventStream, PipelineEvent};
use crate::pipeline::flow::EffectiveFlowControl;
use crate::pipeline::graph::{Link, LinkInfo, Pipeline};
use kanal::AsyncReceiver;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

/// Executor configuration.
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// Pipeline name, used in spans, metrics and events.
    pub name: String,

    /// Diamond-detection settings shared by all elements.
    pub detection: DetectionConfig,

    /// Capacity of the event broadcast channel.
    pub event_capacity: usize,

    /// Log every diamond report as a warning.
    pub log_reports: bool,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            name: "pipeline".to_string(),
            detection: DetectionConfig::default(),
            event_capacity: 256,
            log_reports: true,
        }
    }
}

impl ExecutorConfig {
    /// Create config with diamond detection turned off.
    pub fn without_detection() -> Self {
        Self {
            detection: DetectionConfig::disabled(),
            ..Default::default()
        }
    }

    /// Set the pipeline name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set the diamond-detection settings.
    pub fn with_detection(mut self, detection: DetectionConfig) -> Self {
        self.detection = detection;
        self
    }

    /// Set the event channel capacity.
    pub fn with_event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity;
        self
    }

    /// Do not log diamond reports.
    pub fn quiet(mut self) -> Self {
        self.log_reports = false;
        self
    }

    /// Check the configuration for inconsistent values.
    pub fn validate(&self) -> Result<()> {
        if self.event_capacity == 0 {
            return Err(Error::InvalidConfig(
                "event capacity must be at least 1".to_string(),
            ));
        }
        self.detection.validate()
    }
}

/// Spawns element tasks for a pipeline.
pub struct Executor {
    config: ExecutorConfig,
    sinks: Vec<Arc<dyn DiamondSink>>,
}

impl Executor {
    /// Create an executor with default configuration.
    pub fn new() -> Self {
        Self::with_config(ExecutorConfig::default())
    }

    /// Create an executor with custom configuration.
    pub fn with_config(config: ExecutorConfig) -> Self {
        Self {
            config,
            sinks: Vec::new(),
        }
    }

    /// Also deliver diamond reports to `sink`.
    pub fn with_sink(mut self, sink: impl DiamondSink) -> Self {
        self.sinks.push(Arc::new(sink));
        self
    }

    /// Get the configuration.
    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// Start the pipeline.
    ///
    /// Spawns one task per element on the current tokio runtime. Links that
    /// already exist in `pipeline` are announced as one transaction, exactly
    /// as if they had been made through [`PipelineHandle::link_all`].
    pub fn start(&self, pipeline: Pipeline) -> Result<PipelineHandle> {
        self.config.validate()?;
        init_metrics();

        let _span = span_pipeline(&self.config.name).entered();
        let events = EventSender::new(self.config.event_capacity);

        let mut sinks = self.sinks.clone();
        sinks.push(Arc::new(events.clone()));
        if self.config.log_reports {
            sinks.push(Arc::new(TracingSink));
        }

        let mut handle = PipelineHandle {
            name: self.config.name.clone(),
            topology: Pipeline::new().with_auto_resolution(pipeline.auto_resolution()),
            detection: Arc::new(self.config.detection.clone()),
            mailboxes: Vec::new(),
            tasks: Vec::new(),
            sinks: sinks.into(),
            events,
            next_trigger: 0,
        };

        // Tasks start with their full pad tables, so existing links need
        // their peer mailboxes wired in before spawning.
        let (mailboxes, inboxes): (Vec<_>, Vec<_>) =
            pipeline.nodes().map(|node| Mailbox::new(node.id())).unzip();

        for ((node, mailbox), inbox) in pipeline.nodes().zip(&mailboxes).zip(inboxes) {
            let peers: HashMap<PadId, Mailbox> = node
                .pads()
                .iter()
                .filter_map(|entry| {
                    let peer = entry.peer()?;
                    let mailbox = mailboxes.get(peer.element.index())?;
                    Some((entry.pad().id().clone(), mailbox.clone()))
                })
                .collect();

            handle.spawn(
                node.id(),
                node.label().clone(),
                node.kind(),
                node.pads().clone(),
                peers,
                mailbox.clone(),
                inbox,
            );
        }

        let links: Vec<Link> = pipeline.links().map(|info| info.link.clone()).collect();
        handle.topology = pipeline;
        handle.events.send(PipelineEvent::Started);
        trace_state_change(&handle.name, "stopped", "running");

        if !links.is_empty() {
            handle.trigger(&links)?;
        }
        Ok(handle)
    }
}

impl Default for Executor {
    fn default() -> Self {
        Self::new()
    }
}

/// Handle to a running pipeline.
///
/// Dropping the handle leaves the element tasks running until the runtime
/// shuts down; use [`shutdown`](Self::shutdown) to stop them.
pub struct PipelineHandle {
    name: String,
    topology: Pipeline,
    detection: Arc<DetectionConfig>,
    mailboxes: Vec<Mailbox>,
    tasks: Vec<JoinHandle<Result<()>>>,
    sinks: Arc<[Arc<dyn DiamondSink>]>,
    events: EventSender,
    next_trigger: u64,
}

impl PipelineHandle {
    /// Pipeline name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The coordinator's view of the topology.
    pub fn topology(&self) -> &Pipeline {
        &self.topology
    }

    /// Add an element to the running pipeline.
    pub fn add_element(
        &mut self,
        name: impl Into<String>,
        kind: ElementKind,
        pads: impl IntoIterator<Item = Pad>,
    ) -> Result<ElementId> {
        let mut staged = self.topology.clone();
        let id = staged.add_element(name, kind)?;
        staged.add_pads(id, pads)?;
        self.topology = staged;

        let Some(node) = self.topology.get_node(id) else {
            return Err(Error::UnknownElement(id));
        };
        let (label, pads) = (node.label().clone(), node.pads().clone());
        let (mailbox, inbox) = Mailbox::new(id);
        self.spawn(id, label, kind, pads, HashMap::new(), mailbox, inbox);
        Ok(id)
    }

    /// Add a pad to an element.
    pub fn add_pad(&mut self, element: ElementId, pad: Pad) -> Result<()> {
        self.ensure_running([element])?;
        self.topology.add_pad(element, pad.clone())?;
        self.post(element, ElementMessage::PadAdded(pad))
    }

    /// Link one pair of pads and announce it.
    pub fn link(&mut self, link: Link) -> Result<TriggerRef> {
        self.link_all([link])
    }

    /// Link several pairs of pads as one transaction.
    ///
    /// The links are validated together; if any is invalid, or touches an
    /// element that has stopped, none is applied. Every element whose output
    /// pad was linked then receives the same `start_trigger` reference,
    /// which is returned.
    pub fn link_all(&mut self, links: impl IntoIterator<Item = Link>) -> Result<TriggerRef> {
        let mut staged = self.topology.clone();
        let applied = staged.apply_all(links)?;
        self.ensure_running(
            applied
                .iter()
                .flat_map(|info| [info.link.src, info.link.sink]),
        )?;
        self.topology = staged;

        for info in &applied {
            self.announce_link(info)?;
        }
        let links: Vec<Link> = applied.into_iter().map(|info| info.link).collect();
        self.trigger(&links)
    }

    /// Remove the link on an output pad.
    pub fn unlink(&mut self, src: ElementId, src_pad: impl Into<PadId>) -> Result<Link> {
        let mut staged = self.topology.clone();
        let link = staged.unlink(src, src_pad)?;
        self.ensure_running([link.src, link.sink])?;
        self.topology = staged;

        self.post(link.src, ElementMessage::PadUnlinked(link.src_pad.clone()))?;
        self.post(link.sink, ElementMessage::PadUnlinked(link.sink_pad.clone()))?;
        self.events.send(PipelineEvent::Unlinked {
            src: self.element_name(link.src),
            src_pad: link.src_pad.to_string(),
        });
        Ok(link)
    }

    /// Change the effective flow control of a pad at runtime.
    pub fn set_effective_flow_control(
        &mut self,
        element: ElementId,
        pad: impl Into<PadId>,
        mode: EffectiveFlowControl,
    ) -> Result<()> {
        let pad = pad.into();
        self.topology
            .set_effective_flow_control(element, pad.clone(), mode)?;
        self.post(element, ElementMessage::SetEffectiveFlowControl { pad, mode })
    }

    /// Deliver a detection message to an element directly.
    pub fn send(&self, element: ElementId, message: DetectionMessage) -> Result<()> {
        self.post(element, ElementMessage::Detection(message))
    }

    /// Ask an element for its detection counters.
    pub async fn inspect(&self, element: ElementId) -> Result<DetectionSnapshot> {
        let (reply, response) = oneshot::channel();
        self.post(element, ElementMessage::Inspect(reply))?;
        response.await.map_err(|_| Error::ElementStopped(element))
    }

    /// Subscribe to pipeline events.
    pub fn subscribe(&self) -> EventReceiver {
        self.events.subscribe()
    }

    /// Stream of pipeline events.
    pub fn events(&self) -> EventStream {
        self.events.stream()
    }

    /// Get the event sender.
    pub fn event_sender(&self) -> &EventSender {
        &self.events
    }

    /// Stop every element and wait for the tasks to finish.
    pub async fn shutdown(self) -> Result<()> {
        for mailbox in &self.mailboxes {
            // Already-stopped elements need no stop message
            let _ = mailbox.post(ElementMessage::Stop);
        }

        let mut first_error = None;
        for task in self.tasks {
            let result = match task.await {
                Ok(result) => result,
                Err(e) => Err(Error::TaskFailed(e.to_string())),
            };
            if let Err(e) = result {
                self.events.send_warning(e.to_string(), None);
                first_error.get_or_insert(e);
            }
        }

        trace_state_change(&self.name, "running", "stopped");
        self.events.send(PipelineEvent::Stopped);

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Abort all element tasks.
    pub fn abort(self) {
        for task in self.tasks {
            task.abort();
        }
        self.events.send(PipelineEvent::Stopped);
    }

    #[allow(clippy::too_many_arguments)]
    fn spawn(
        &mut self,
        id: ElementId,
        label: Arc<str>,
        kind: ElementKind,
        pads: PadTable,
        peers: HashMap<PadId, Mailbox>,
        mailbox: Mailbox,
        inbox: AsyncReceiver<ElementMessage>,
    ) {
        let metrics = ElementMetrics::new(&self.name, &label);
        let task = ElementTask {
            id,
            label,
            kind,
            pads,
            peers,
            detector: DiamondDetector::new(id, Arc::clone(&self.detection)),
            mailbox: mailbox.clone(),
            inbox,
            sinks: Arc::clone(&self.sinks),
            events: self.events.clone(),
            metrics,
        };
        self.mailboxes.push(mailbox);
        self.tasks.push(task.spawn());
    }

    fn announce_link(&self, info: &LinkInfo) -> Result<()> {
        let link = &info.link;
        let src = self.mailbox(link.src)?;
        let sink = self.mailbox(link.sink)?;

        self.post(
            link.src,
            ElementMessage::PadLinked {
                pad: link.src_pad.clone(),
                peer: Peer::new(link.sink, link.sink_pad.clone()),
                mode: info.src_mode,
                mailbox: sink.clone(),
            },
        )?;
        self.post(
            link.sink,
            ElementMessage::PadLinked {
                pad: link.sink_pad.clone(),
                peer: Peer::new(link.src, link.src_pad.clone()),
                mode: info.sink_mode,
                mailbox: src.clone(),
            },
        )?;

        let (src_name, sink_name) = (self.element_name(link.src), self.element_name(link.sink));
        trace_link(
            &self.name,
            &src_name,
            link.src_pad.as_str(),
            &sink_name,
            link.sink_pad.as_str(),
        );
        self.events.send(PipelineEvent::Linked {
            src: src_name,
            src_pad: link.src_pad.to_string(),
            sink: sink_name,
            sink_pad: link.sink_pad.to_string(),
        });
        Ok(())
    }

    /// Send `start_trigger` to every element with a newly linked output pad.
    fn trigger(&mut self, links: &[Link]) -> Result<TriggerRef> {
        let reference = TriggerRef::new(self.next_trigger);
        self.next_trigger += 1;

        for element in Pipeline::trigger_targets(links) {
            self.post(
                element,
                ElementMessage::Detection(DetectionMessage::StartTrigger(reference)),
            )?;
        }
        Ok(reference)
    }

    /// Fail with `ElementStopped` unless every element still takes messages.
    fn ensure_running(&self, elements: impl IntoIterator<Item = ElementId>) -> Result<()> {
        for element in elements {
            if self.mailbox(element)?.is_closed() {
                return Err(Error::ElementStopped(element));
            }
        }
        Ok(())
    }

    fn mailbox(&self, element: ElementId) -> Result<&Mailbox> {
        self.mailboxes
            .get(element.index())
            .ok_or(Error::UnknownElement(element))
    }

    fn post(&self, element: ElementId, message: ElementMessage) -> Result<()> {
        let result = self.mailbox(element)?.post(message);
        if result.is_err() {
            record_mailbox_dropped(&self.name, &self.element_name(element));
        }
        result
    }

    fn element_name(&self, element: ElementId) -> String {
        self.topology
            .get_node(element)
            .map(|node| node.name().to_string())
            .unwrap_or_else(|| element.to_string())
    }
}
