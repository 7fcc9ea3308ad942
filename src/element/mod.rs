//! Element system for Lattice pipelines.
//!
//! Every element in a pipeline is identified by an [`ElementId`], has an
//! [`ElementKind`], and owns a [`PadTable`] describing its [`Pad`]s:
//!
//! - direction ([`PadDirection`]): input or output
//! - declared flow control ([`FlowControl`]): push, manual or auto
//! - the [`Peer`] it is linked to, if any
//! - the effective (resolved) flow control of auto pads
//!
//! At runtime each element is hosted by its own task (see
//! [`pipeline`](crate::pipeline)); the pad table is the only view of the
//! graph that an element ever has.
//!
//! [`FlowControl`]: crate::pipeline::flow::FlowControl

mod kind;
mod pad;

pub use kind::{ElementId, ElementKind};
pub use pad::{Pad, PadDirection, PadEntry, PadId, PadTable, Peer};
