//! Deterministic, single-threaded host for diamond detection.
//!
//! [`Simulation`] runs one [`DiamondDetector`] per element of a [`Pipeline`]
//! against a virtual clock. Messages are delivered one at a time in
//! `(time, sequence)` order, so a run is fully reproducible. Per-link
//! latencies let a test choose the order in which concurrent searches
//! arrive.
//!
//! ```rust,ignore
//! let mut sim = Simulation::new(pipeline, DetectionConfig::default())?;
//! sim.start();
//! sim.run_until_idle();
//! for report in sim.reports() {
//!     println!("{report}");
//! }
//! ```

use crate::diamond::config::DetectionConfig;
use crate::diamond::detector::{DiamondDetector, ElementView};
use crate::diamond::message::{DetectionAction, DetectionMessage};
use crate::diamond::reference::TriggerRef;
use crate::diamond::report::{DiamondReport, DiamondSink};
use crate::diamond::state::DetectionSnapshot;
use crate::element::{ElementId, PadId};
use crate::error::{Error, Result};
use crate::pipeline::{Link, Pipeline};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug)]
struct Envelope {
    to: ElementId,
    message: DetectionMessage,
}

/// A pipeline whose elements exchange detection messages on a virtual clock.
pub struct Simulation {
    pipeline: Pipeline,
    detectors: Vec<DiamondDetector>,
    queue: BTreeMap<(Duration, u64), Envelope>,
    latencies: HashMap<(ElementId, PadId), Duration>,
    now: Duration,
    seq: u64,
    next_trigger: u64,
    delivered: u64,
    reports: Vec<DiamondReport>,
    sink: Option<Arc<dyn DiamondSink>>,
}

impl Simulation {
    /// Create a simulation over `pipeline`.
    ///
    /// Links already present in the pipeline are not announced until
    /// [`start`](Self::start) is called.
    pub fn new(pipeline: Pipeline, config: DetectionConfig) -> Result<Self> {
        config.validate()?;
        let config = Arc::new(config);
        let detectors = pipeline
            .nodes()
            .map(|node| DiamondDetector::new(node.id(), Arc::clone(&config)))
            .collect();

        Ok(Self {
            pipeline,
            detectors,
            queue: BTreeMap::new(),
            latencies: HashMap::new(),
            now: Duration::ZERO,
            seq: 0,
            next_trigger: 0,
            delivered: 0,
            reports: Vec::new(),
            sink: None,
        })
    }

    /// Also hand every report to `sink`.
    pub fn with_sink(mut self, sink: impl DiamondSink) -> Self {
        self.sink = Some(Arc::new(sink));
        self
    }

    /// Announce every link already in the pipeline as one transaction.
    ///
    /// Returns `None` if the pipeline has no links.
    pub fn start(&mut self) -> Option<TriggerRef> {
        let links: Vec<Link> = self
            .pipeline
            .links()
            .map(|info| info.link.clone())
            .collect();
        if links.is_empty() {
            return None;
        }
        Some(self.announce(&links))
    }

    /// Apply one link and announce it.
    pub fn link(&mut self, link: Link) -> Result<TriggerRef> {
        self.link_all([link])
    }

    /// Apply several links as one transaction and announce them together.
    pub fn link_all(&mut self, links: impl IntoIterator<Item = Link>) -> Result<TriggerRef> {
        let applied = self.pipeline.apply_all(links)?;
        let links: Vec<Link> = applied.into_iter().map(|info| info.link).collect();
        Ok(self.announce(&links))
    }

    /// Remove the link on an output pad.
    ///
    /// Messages already in flight across the link are dropped on delivery.
    pub fn unlink(&mut self, src: ElementId, src_pad: impl Into<PadId>) -> Result<Link> {
        self.pipeline.unlink(src, src_pad)
    }

    /// Delay every message sent across `src_pad` of `src` by `latency`.
    pub fn set_link_latency(
        &mut self,
        src: ElementId,
        src_pad: impl Into<PadId>,
        latency: Duration,
    ) {
        self.latencies.insert((src, src_pad.into()), latency);
    }

    /// Queue `message` for `to` at the current time.
    pub fn send(&mut self, to: ElementId, message: DetectionMessage) -> Result<()> {
        if self.pipeline.get_node(to).is_none() {
            return Err(Error::UnknownElement(to));
        }
        self.enqueue(self.now, to, message);
        Ok(())
    }

    /// Deliver the next message, advancing the clock if it lies in the
    /// future.
    ///
    /// Returns `false` if nothing was queued.
    pub fn step(&mut self) -> bool {
        let Some(((at, _), envelope)) = self.queue.pop_first() else {
            return false;
        };
        self.now = self.now.max(at);
        self.deliver(envelope);
        true
    }

    /// Deliver messages until none is left, timers included.
    ///
    /// Returns the number of messages delivered.
    pub fn run_until_idle(&mut self) -> usize {
        let mut count = 0;
        while self.step() {
            count += 1;
        }
        count
    }

    /// Deliver every message due within `duration`, then move the clock to
    /// the end of that window.
    pub fn run_for(&mut self, duration: Duration) -> usize {
        let deadline = self.now + duration;
        let mut count = 0;
        while self
            .queue
            .first_key_value()
            .is_some_and(|((at, _), _)| *at <= deadline)
        {
            self.step();
            count += 1;
        }
        self.now = deadline;
        count
    }

    /// Current virtual time.
    pub fn now(&self) -> Duration {
        self.now
    }

    /// Number of queued messages.
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Total number of messages delivered so far.
    pub fn delivered(&self) -> u64 {
        self.delivered
    }

    /// Reports collected so far.
    pub fn reports(&self) -> &[DiamondReport] {
        &self.reports
    }

    /// Take the reports collected so far.
    pub fn take_reports(&mut self) -> Vec<DiamondReport> {
        std::mem::take(&mut self.reports)
    }

    /// Detection counters of one element.
    pub fn snapshot(&self, element: ElementId) -> Option<DetectionSnapshot> {
        self.detectors.get(element.index()).map(DiamondDetector::snapshot)
    }

    /// Detector of one element.
    pub fn detector(&self, element: ElementId) -> Option<&DiamondDetector> {
        self.detectors.get(element.index())
    }

    /// The simulated topology.
    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    fn announce(&mut self, links: &[Link]) -> TriggerRef {
        let reference = TriggerRef::new(self.next_trigger);
        self.next_trigger += 1;
        for target in Pipeline::trigger_targets(links) {
            self.enqueue(self.now, target, DetectionMessage::StartTrigger(reference));
        }
        reference
    }

    fn enqueue(&mut self, at: Duration, to: ElementId, message: DetectionMessage) {
        self.queue.insert((at, self.seq), Envelope { to, message });
        self.seq += 1;
    }

    fn deliver(&mut self, envelope: Envelope) {
        let Envelope { to, message } = envelope;
        let (Some(node), Some(detector)) = (
            self.pipeline.get_node(to),
            self.detectors.get_mut(to.index()),
        ) else {
            return;
        };
        self.delivered += 1;

        let view = ElementView::new(node.id(), node.label(), node.kind(), node.pads());
        let actions = detector.handle(&view, message);

        for action in actions {
            match action {
                DetectionAction::Forward { pad, message } => {
                    let peer = self
                        .pipeline
                        .get_node(to)
                        .and_then(|node| node.pads().get(&pad))
                        .and_then(|entry| entry.peer())
                        .map(|peer| peer.element);
                    let Some(peer) = peer else {
                        tracing::trace!(
                            element = %to,
                            pad = %pad,
                            "dropping message on unlinked pad"
                        );
                        continue;
                    };
                    let latency = self
                        .latencies
                        .get(&(to, pad))
                        .copied()
                        .unwrap_or_default();
                    self.enqueue(self.now + latency, peer, message);
                }
                DetectionAction::Schedule { delay, message } => {
                    self.enqueue(self.now + delay, to, message);
                }
                DetectionAction::Report(report) => {
                    if let Some(sink) = &self.sink {
                        sink.report(&report);
                    }
                    self.reports.push(report);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diamond::config::PathComparison;
    use crate::element::{ElementKind, Pad};
    use crate::pipeline::flow::FlowControl;

    /// `a` feeds `c` directly and through `b`, every pad manual.
    fn triangle() -> (Pipeline, [ElementId; 3]) {
        let mut pipeline = Pipeline::new();
        let a = pipeline.add_element("a", ElementKind::Source).unwrap();
        pipeline
            .add_pads(
                a,
                [
                    Pad::output("out_0", FlowControl::Manual),
                    Pad::output("out_1", FlowControl::Manual),
                ],
            )
            .unwrap();
        let b = pipeline.add_element("b", ElementKind::Filter).unwrap();
        pipeline
            .add_pads(
                b,
                [
                    Pad::input("sink", FlowControl::Manual),
                    Pad::output("src", FlowControl::Manual),
                ],
            )
            .unwrap();
        let c = pipeline.add_element("c", ElementKind::Sink).unwrap();
        pipeline
            .add_pads(
                c,
                [
                    Pad::input("in_0", FlowControl::Manual),
                    Pad::input("in_1", FlowControl::Manual),
                ],
            )
            .unwrap();
        (pipeline, [a, b, c])
    }

    #[test]
    fn test_idle_simulation() {
        let (pipeline, _) = triangle();
        let mut sim = Simulation::new(pipeline, DetectionConfig::default()).unwrap();
        assert!(sim.start().is_none());
        assert!(!sim.step());
        assert_eq!(sim.run_until_idle(), 0);
        assert_eq!(sim.now(), Duration::ZERO);
    }

    #[test]
    fn test_rejects_invalid_config() {
        let (pipeline, _) = triangle();
        let config = DetectionConfig::default().with_expiry(Duration::ZERO);
        assert!(Simulation::new(pipeline, config).is_err());
    }

    #[test]
    fn test_search_fires_after_debounce() {
        let (pipeline, [a, b, c]) = triangle();
        let config = DetectionConfig::default().with_comparison(PathComparison::FullPath);
        let mut sim = Simulation::new(pipeline, config).unwrap();

        sim.link_all([
            Link::new(a, "out_0", c, "in_0"),
            Link::new(a, "out_1", b, "sink"),
            Link::new(b, "src", c, "in_1"),
        ])
        .unwrap();

        sim.run_for(Duration::from_millis(999));
        assert!(sim.reports().is_empty());
        assert!(sim.snapshot(a).unwrap().search_postponed);

        sim.run_for(Duration::from_millis(1));
        assert_eq!(sim.reports().len(), 1);
        assert_eq!(sim.reports()[0].element(), c);
        assert_eq!(sim.now(), Duration::from_secs(1));
    }

    #[test]
    fn test_send_to_unknown_element() {
        let (pipeline, _) = triangle();
        let mut sim = Simulation::new(pipeline, DetectionConfig::default()).unwrap();
        assert!(matches!(
            sim.send(ElementId::from_raw(9), DetectionMessage::StartSearch),
            Err(Error::UnknownElement(_))
        ));
    }

    #[test]
    fn test_forward_on_unlinked_pad_is_dropped() {
        let (pipeline, [a, b, c]) = triangle();
        let config = DetectionConfig::default().with_comparison(PathComparison::FullPath);
        let mut sim = Simulation::new(pipeline, config).unwrap();
        sim.link_all([
            Link::new(a, "out_0", c, "in_0"),
            Link::new(a, "out_1", b, "sink"),
            Link::new(b, "src", c, "in_1"),
        ])
        .unwrap();
        sim.run_for(Duration::from_millis(500));
        sim.unlink(b, "src").unwrap();

        sim.run_until_idle();
        assert!(sim.reports().is_empty());
    }
}
