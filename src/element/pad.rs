//! Pad abstraction for element inputs and outputs.
//!
//! Pads represent the connection points of elements. Each element can have
//! multiple input and output pads, allowing for complex routing topologies.
//! An element keeps its pads in a [`PadTable`], which also records the peer
//! each pad is linked to and the effective flow control of auto pads.

use crate::element::ElementId;
use crate::pipeline::flow::{EffectiveFlowControl, FlowControl};
use std::fmt;
use std::sync::Arc;

/// Direction of a pad (input or output).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PadDirection {
    /// An input pad (receives buffers from upstream).
    Input,
    /// An output pad (sends buffers downstream).
    Output,
}

/// Name of a pad, unique within its element.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PadId(Arc<str>);

impl PadId {
    /// Create a pad id from a name.
    pub fn new(name: impl AsRef<str>) -> Self {
        Self(Arc::from(name.as_ref()))
    }

    /// Get the pad name.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PadId {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for PadId {
    fn from(name: String) -> Self {
        Self(Arc::from(name))
    }
}

/// A pad declaration on an element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pad {
    /// Unique name of this pad within the element.
    id: PadId,
    /// Direction of this pad.
    direction: PadDirection,
    /// Declared flow-control mode.
    flow_control: FlowControl,
}

impl Pad {
    /// Create a new pad.
    pub fn new(id: impl Into<PadId>, direction: PadDirection, flow_control: FlowControl) -> Self {
        Self {
            id: id.into(),
            direction,
            flow_control,
        }
    }

    /// Create an input pad.
    pub fn input(id: impl Into<PadId>, flow_control: FlowControl) -> Self {
        Self::new(id, PadDirection::Input, flow_control)
    }

    /// Create an output pad.
    pub fn output(id: impl Into<PadId>, flow_control: FlowControl) -> Self {
        Self::new(id, PadDirection::Output, flow_control)
    }

    /// Create a standard auto input pad named "sink".
    pub fn sink() -> Self {
        Self::input("sink", FlowControl::Auto)
    }

    /// Create a standard auto output pad named "src".
    pub fn src() -> Self {
        Self::output("src", FlowControl::Auto)
    }

    /// Get the pad's id.
    pub fn id(&self) -> &PadId {
        &self.id
    }

    /// Get the pad's direction.
    pub fn direction(&self) -> PadDirection {
        self.direction
    }

    /// Get the declared flow-control mode.
    pub fn flow_control(&self) -> FlowControl {
        self.flow_control
    }

    /// Check if this is an input pad.
    pub fn is_input(&self) -> bool {
        self.direction == PadDirection::Input
    }

    /// Check if this is an output pad.
    pub fn is_output(&self) -> bool {
        self.direction == PadDirection::Output
    }
}

/// The far end of a link: a pad on another element.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Peer {
    /// Element on the other side of the link.
    pub element: ElementId,
    /// Pad on that element.
    pub pad: PadId,
}

impl Peer {
    /// Create a peer reference.
    pub fn new(element: ElementId, pad: impl Into<PadId>) -> Self {
        Self {
            element,
            pad: pad.into(),
        }
    }
}

/// One row of a pad table.
#[derive(Debug, Clone)]
pub struct PadEntry {
    pad: Pad,
    effective: Option<EffectiveFlowControl>,
    peer: Option<Peer>,
}

impl PadEntry {
    /// Get the pad declaration.
    pub fn pad(&self) -> &Pad {
        &self.pad
    }

    /// Get the peer this pad is linked to.
    pub fn peer(&self) -> Option<&Peer> {
        self.peer.as_ref()
    }

    /// Check if this pad is linked.
    pub fn is_linked(&self) -> bool {
        self.peer.is_some()
    }

    /// Resolved flow control, if known.
    ///
    /// Fixed pads always report their own mode; auto pads report `None`
    /// until the linking layer resolves them.
    pub fn effective_flow_control(&self) -> Option<EffectiveFlowControl> {
        self.pad.flow_control.fixed().or(self.effective)
    }

    /// Check if this pad operates in pull mode (manual, or auto resolved to pull).
    pub fn is_pull(&self) -> bool {
        match self.pad.flow_control {
            FlowControl::Manual => true,
            FlowControl::Auto => self.effective == Some(EffectiveFlowControl::Pull),
            FlowControl::Push => false,
        }
    }
}

/// Pad table of a single element.
///
/// Iteration follows insertion order.
#[derive(Debug, Default, Clone)]
pub struct PadTable {
    entries: Vec<PadEntry>,
}

impl PadTable {
    /// Create an empty pad table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a pad to the table.
    ///
    /// Returns `false` (and leaves the table unchanged) if a pad with the
    /// same id already exists.
    pub fn add(&mut self, pad: Pad) -> bool {
        if self.get(pad.id()).is_some() {
            return false;
        }
        self.entries.push(PadEntry {
            pad,
            effective: None,
            peer: None,
        });
        true
    }

    /// Get a pad entry by id.
    pub fn get(&self, id: &PadId) -> Option<&PadEntry> {
        self.entries.iter().find(|e| e.pad.id() == id)
    }

    fn get_mut(&mut self, id: &PadId) -> Option<&mut PadEntry> {
        self.entries.iter_mut().find(|e| e.pad.id() == id)
    }

    /// Record that `id` is now linked to `peer`.
    ///
    /// Returns `false` if the pad does not exist.
    pub fn link(&mut self, id: &PadId, peer: Peer, effective: EffectiveFlowControl) -> bool {
        match self.get_mut(id) {
            Some(entry) => {
                entry.peer = Some(peer);
                entry.effective = Some(effective);
                true
            }
            None => false,
        }
    }

    /// Remove the link on `id`, returning the previous peer.
    pub fn unlink(&mut self, id: &PadId) -> Option<Peer> {
        let entry = self.get_mut(id)?;
        entry.effective = None;
        entry.peer.take()
    }

    /// Override the effective flow control of a pad.
    ///
    /// Returns `false` if the pad does not exist.
    pub fn set_effective_flow_control(&mut self, id: &PadId, mode: EffectiveFlowControl) -> bool {
        match self.get_mut(id) {
            Some(entry) => {
                entry.effective = Some(mode);
                true
            }
            None => false,
        }
    }

    /// Get all input pads.
    pub fn inputs(&self) -> impl Iterator<Item = &PadEntry> {
        self.entries.iter().filter(|e| e.pad.is_input())
    }

    /// Get all output pads.
    pub fn outputs(&self) -> impl Iterator<Item = &PadEntry> {
        self.entries.iter().filter(|e| e.pad.is_output())
    }

    /// Linked output pads operating in pull mode, with their peers.
    pub fn pull_outputs(&self) -> impl Iterator<Item = (&PadId, &Peer)> {
        self.outputs()
            .filter(|e| e.is_pull())
            .filter_map(|e| e.peer.as_ref().map(|peer| (e.pad.id(), peer)))
    }

    /// Linked input pads whose declared mode is not push (manual or auto).
    pub fn non_push_inputs(&self) -> impl Iterator<Item = (&PadId, &Peer)> {
        self.inputs()
            .filter(|e| !e.pad.flow_control.is_push())
            .filter_map(|e| e.peer.as_ref().map(|peer| (e.pad.id(), peer)))
    }

    /// Get all pads.
    pub fn iter(&self) -> impl Iterator<Item = &PadEntry> {
        self.entries.iter()
    }

    /// Get the number of pads.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the pad table is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pad_creation() {
        let input = Pad::sink();
        assert_eq!(input.id().as_str(), "sink");
        assert!(input.is_input());
        assert!(!input.is_output());
        assert_eq!(input.flow_control(), FlowControl::Auto);

        let output = Pad::src();
        assert_eq!(output.id().as_str(), "src");
        assert!(output.is_output());
        assert!(!output.is_input());
    }

    #[test]
    fn test_pad_table_rejects_duplicates() {
        let mut table = PadTable::new();
        assert!(table.add(Pad::sink()));
        assert!(!table.add(Pad::input("sink", FlowControl::Manual)));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_pull_outputs() {
        let mut table = PadTable::new();
        table.add(Pad::output("manual", FlowControl::Manual));
        table.add(Pad::output("push", FlowControl::Push));
        table.add(Pad::output("auto_pull", FlowControl::Auto));
        table.add(Pad::output("auto_push", FlowControl::Auto));
        table.add(Pad::output("unlinked", FlowControl::Manual));

        let peer = ElementId::from_raw(1);
        table.link(&"manual".into(), Peer::new(peer, "a"), EffectiveFlowControl::Pull);
        table.link(&"push".into(), Peer::new(peer, "b"), EffectiveFlowControl::Push);
        table.link(&"auto_pull".into(), Peer::new(peer, "c"), EffectiveFlowControl::Pull);
        table.link(&"auto_push".into(), Peer::new(peer, "d"), EffectiveFlowControl::Push);

        let pull: Vec<&str> = table.pull_outputs().map(|(id, _)| id.as_str()).collect();
        assert_eq!(pull, vec!["manual", "auto_pull"]);
    }

    #[test]
    fn test_non_push_inputs_ignore_effective_mode() {
        let mut table = PadTable::new();
        table.add(Pad::input("manual", FlowControl::Manual));
        table.add(Pad::input("push", FlowControl::Push));
        table.add(Pad::input("auto", FlowControl::Auto));

        let peer = ElementId::from_raw(3);
        table.link(&"manual".into(), Peer::new(peer, "x"), EffectiveFlowControl::Pull);
        table.link(&"push".into(), Peer::new(peer, "y"), EffectiveFlowControl::Push);
        // Auto input resolved to push still counts as non-push
        table.link(&"auto".into(), Peer::new(peer, "z"), EffectiveFlowControl::Push);

        let inputs: Vec<&str> = table.non_push_inputs().map(|(id, _)| id.as_str()).collect();
        assert_eq!(inputs, vec!["manual", "auto"]);
    }

    #[test]
    fn test_unlink_clears_effective_mode() {
        let mut table = PadTable::new();
        table.add(Pad::src());
        let id = PadId::from("src");
        table.link(&id, Peer::new(ElementId::from_raw(2), "sink"), EffectiveFlowControl::Pull);
        assert!(table.get(&id).unwrap().is_pull());

        let peer = table.unlink(&id).unwrap();
        assert_eq!(peer.element, ElementId::from_raw(2));
        assert!(!table.get(&id).unwrap().is_linked());
        assert!(!table.get(&id).unwrap().is_pull());
        assert!(table.unlink(&id).is_none());
    }

    #[test]
    fn test_effective_override() {
        let mut table = PadTable::new();
        table.add(Pad::src());
        let id = PadId::from("src");
        assert_eq!(table.get(&id).unwrap().effective_flow_control(), None);

        assert!(table.set_effective_flow_control(&id, EffectiveFlowControl::Pull));
        assert_eq!(
            table.get(&id).unwrap().effective_flow_control(),
            Some(EffectiveFlowControl::Pull)
        );
        assert!(!table.set_effective_flow_control(&"missing".into(), EffectiveFlowControl::Pull));
    }
}
