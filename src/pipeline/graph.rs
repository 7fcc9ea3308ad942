//! Pipeline graph structure using petgraph.
//!
//! The graph is the link coordinator's view of the pipeline: every element
//! with its pad table is a node, every applied link an edge. Unlike the elements
//! themselves, the coordinator sees the whole graph; it uses that view only
//! to validate link requests and resolve effective flow control.
//!
//! Cycles are allowed. Demand can legitimately loop (e.g. feedback paths),
//! and diamond detection has to cope with them.

use crate::element::{ElementId, ElementKind, Pad, PadDirection, PadId, PadTable, Peer};
use crate::error::{Error, Result};
use crate::pipeline::flow::{EffectiveFlowControl, FlowControl};
use petgraph::Direction;
use petgraph::stable_graph::{NodeIndex, StableDiGraph};
use petgraph::visit::EdgeRef;
use std::collections::HashMap;
use std::sync::Arc;

/// A node in the pipeline graph.
#[derive(Debug, Clone)]
pub struct Node {
    id: ElementId,
    /// Unique name of this node, used as the label in search paths.
    name: Arc<str>,
    kind: ElementKind,
    pads: PadTable,
}

impl Node {
    /// Get the node's id.
    pub fn id(&self) -> ElementId {
        self.id
    }

    /// Get the node's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the node's name as a shared string.
    pub fn label(&self) -> &Arc<str> {
        &self.name
    }

    /// Get the element kind.
    pub fn kind(&self) -> ElementKind {
        self.kind
    }

    /// Get the pad table.
    pub fn pads(&self) -> &PadTable {
        &self.pads
    }
}

/// A request to link an output pad to an input pad.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Link {
    /// Upstream element.
    pub src: ElementId,
    /// Output pad on the upstream element.
    pub src_pad: PadId,
    /// Downstream element.
    pub sink: ElementId,
    /// Input pad on the downstream element.
    pub sink_pad: PadId,
}

impl Link {
    /// Create a link request.
    pub fn new(
        src: ElementId,
        src_pad: impl Into<PadId>,
        sink: ElementId,
        sink_pad: impl Into<PadId>,
    ) -> Self {
        Self {
            src,
            src_pad: src_pad.into(),
            sink,
            sink_pad: sink_pad.into(),
        }
    }
}

/// A link that has been applied, with the resolved flow control of both ends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkInfo {
    /// The link.
    pub link: Link,
    /// Effective flow control of the output pad.
    pub src_mode: EffectiveFlowControl,
    /// Effective flow control of the input pad.
    pub sink_mode: EffectiveFlowControl,
}

/// A pipeline represented as a directed graph of elements.
///
/// Nodes are never removed, so an element's id is its node index.
#[derive(Debug, Clone)]
pub struct Pipeline {
    graph: StableDiGraph<Node, LinkInfo>,
    /// Name-to-ElementId mapping for duplicate checks.
    nodes_by_name: HashMap<String, ElementId>,
    /// Resolution used when two auto pads are linked together.
    auto_resolution: EffectiveFlowControl,
}

impl Pipeline {
    /// Create a new empty pipeline.
    pub fn new() -> Self {
        Self {
            graph: StableDiGraph::new(),
            nodes_by_name: HashMap::new(),
            auto_resolution: EffectiveFlowControl::default(),
        }
    }

    /// Set the mode two linked auto pads resolve to.
    pub fn with_auto_resolution(mut self, mode: EffectiveFlowControl) -> Self {
        self.auto_resolution = mode;
        self
    }

    /// Mode two linked auto pads resolve to.
    pub fn auto_resolution(&self) -> EffectiveFlowControl {
        self.auto_resolution
    }

    /// Add an element to the pipeline.
    ///
    /// Returns the element's ID for linking.
    pub fn add_element(
        &mut self,
        name: impl Into<String>,
        kind: ElementKind,
    ) -> Result<ElementId> {
        let name = name.into();
        if self.nodes_by_name.contains_key(&name) {
            return Err(Error::DuplicateElement(name));
        }

        let id = ElementId(self.graph.node_count() as u32);
        let index = self.graph.add_node(Node {
            id,
            name: Arc::from(name.as_str()),
            kind,
            pads: PadTable::new(),
        });
        debug_assert_eq!(index.index(), id.index());
        self.nodes_by_name.insert(name, id);
        Ok(id)
    }

    /// Add a pad to an element.
    pub fn add_pad(&mut self, element: ElementId, pad: Pad) -> Result<()> {
        let node = self.node_mut(element)?;
        let id = pad.id().clone();
        if !node.pads.add(pad) {
            return Err(Error::DuplicatePad { element, pad: id });
        }
        Ok(())
    }

    /// Add several pads to an element.
    pub fn add_pads(
        &mut self,
        element: ElementId,
        pads: impl IntoIterator<Item = Pad>,
    ) -> Result<()> {
        for pad in pads {
            self.add_pad(element, pad)?;
        }
        Ok(())
    }

    /// Get a node by ID.
    pub fn get_node(&self, id: ElementId) -> Option<&Node> {
        self.graph.node_weight(node_index(id))
    }

    fn node_mut(&mut self, id: ElementId) -> Result<&mut Node> {
        self.graph
            .node_weight_mut(node_index(id))
            .ok_or(Error::UnknownElement(id))
    }

    /// Iterate over all nodes in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.graph
            .node_indices()
            .filter_map(|index| self.graph.node_weight(index))
    }

    /// Iterate over all applied links.
    pub fn links(&self) -> impl Iterator<Item = &LinkInfo> {
        self.graph
            .edge_indices()
            .filter_map(|index| self.graph.edge_weight(index))
    }

    /// Link an output pad to an input pad.
    ///
    /// Both pads must exist, have the right direction and be unlinked. The
    /// effective flow control of auto pads is resolved against the peer.
    pub fn link_pads(
        &mut self,
        src: ElementId,
        src_pad: impl Into<PadId>,
        sink: ElementId,
        sink_pad: impl Into<PadId>,
    ) -> Result<LinkInfo> {
        self.apply(Link::new(src, src_pad, sink, sink_pad))
    }

    /// Apply a link request.
    pub fn apply(&mut self, link: Link) -> Result<LinkInfo> {
        let src_flow = self.unlinked_pad(link.src, &link.src_pad, PadDirection::Output)?;
        let sink_flow = self.unlinked_pad(link.sink, &link.sink_pad, PadDirection::Input)?;

        let src_mode = src_flow.resolve_against(sink_flow, self.auto_resolution);
        let sink_mode = sink_flow.resolve_against(src_flow, self.auto_resolution);

        self.node_mut(link.src)?.pads.link(
            &link.src_pad,
            Peer::new(link.sink, link.sink_pad.clone()),
            src_mode,
        );
        self.node_mut(link.sink)?.pads.link(
            &link.sink_pad,
            Peer::new(link.src, link.src_pad.clone()),
            sink_mode,
        );

        let (src, sink) = (node_index(link.src), node_index(link.sink));
        let info = LinkInfo {
            link,
            src_mode,
            sink_mode,
        };
        self.graph.add_edge(src, sink, info.clone());
        Ok(info)
    }

    /// Apply several link requests atomically.
    ///
    /// Either every link is applied or, on the first error, none is.
    pub fn apply_all(
        &mut self,
        links: impl IntoIterator<Item = Link>,
    ) -> Result<Vec<LinkInfo>> {
        let mut staged = self.clone();
        let applied = links
            .into_iter()
            .map(|link| staged.apply(link))
            .collect::<Result<Vec<_>>>()?;
        *self = staged;
        Ok(applied)
    }

    /// Remove the link on an output pad.
    pub fn unlink(&mut self, src: ElementId, src_pad: impl Into<PadId>) -> Result<Link> {
        let src_pad = src_pad.into();
        self.pad(src, &src_pad, PadDirection::Output)?;

        let peer = self
            .node_mut(src)?
            .pads
            .unlink(&src_pad)
            .ok_or_else(|| Error::PadNotLinked {
                element: src,
                pad: src_pad.clone(),
            })?;
        self.node_mut(peer.element)?.pads.unlink(&peer.pad);

        let edge = self
            .graph
            .edges_directed(node_index(src), Direction::Outgoing)
            .find(|edge| edge.weight().link.src_pad == src_pad)
            .map(|edge| edge.id());
        if let Some(edge) = edge {
            self.graph.remove_edge(edge);
        }

        Ok(Link {
            src,
            src_pad,
            sink: peer.element,
            sink_pad: peer.pad,
        })
    }

    /// Override the effective flow control of a pad.
    pub fn set_effective_flow_control(
        &mut self,
        element: ElementId,
        pad: impl Into<PadId>,
        mode: EffectiveFlowControl,
    ) -> Result<()> {
        let pad = pad.into();
        let node = self.node_mut(element)?;
        if !node.pads.set_effective_flow_control(&pad, mode) {
            return Err(Error::UnknownPad { element, pad });
        }
        Ok(())
    }

    /// Elements whose output pads appear in `links`, without duplicates, in
    /// first-seen order.
    ///
    /// These are the elements that receive `start_trigger` after a link
    /// transaction.
    pub fn trigger_targets<'a>(links: impl IntoIterator<Item = &'a Link>) -> Vec<ElementId> {
        let mut targets = Vec::new();
        for link in links {
            if !targets.contains(&link.src) {
                targets.push(link.src);
            }
        }
        targets
    }

    fn pad(
        &self,
        element: ElementId,
        pad: &PadId,
        expected: PadDirection,
    ) -> Result<&crate::element::PadEntry> {
        let node = self.get_node(element).ok_or(Error::UnknownElement(element))?;
        let entry = node.pads.get(pad).ok_or_else(|| Error::UnknownPad {
            element,
            pad: pad.clone(),
        })?;
        if entry.pad().direction() != expected {
            return Err(Error::DirectionMismatch {
                element,
                pad: pad.clone(),
                expected,
                actual: entry.pad().direction(),
            });
        }
        Ok(entry)
    }

    fn unlinked_pad(
        &self,
        element: ElementId,
        pad: &PadId,
        expected: PadDirection,
    ) -> Result<FlowControl> {
        let entry = self.pad(element, pad, expected)?;
        if entry.is_linked() {
            return Err(Error::PadAlreadyLinked {
                element,
                pad: pad.clone(),
            });
        }
        Ok(entry.pad().flow_control())
    }

    /// Get the number of elements in the pipeline.
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Get the number of links in the pipeline.
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Check if the pipeline is empty.
    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }
}

fn node_index(id: ElementId) -> NodeIndex {
    NodeIndex::new(id.index())
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new()
    }
}
