//! Pipeline construction and execution.
//!
//! This module provides the host runtime for diamond detection:
//!
//! - [`Pipeline`]: The element graph, used to build a pipeline and by the
//!   link coordinator to validate topology changes
//! - [`Link`]: A request to connect an output pad to an input pad
//! - [`Executor`]: Runs every element as its own tokio task
//! - [`PipelineHandle`]: Links, unlinks and inspects a running pipeline
//! - [`PipelineEvent`]: Async events emitted during execution
//!
//! # Example
//!
//! ```rust,ignore
//! use lattice::prelude::*;
//!
//! let mut pipeline = Pipeline::new();
//! let tee = pipeline.add_element("tee", ElementKind::Filter)?;
//! pipeline.add_pads(tee, [
//!     Pad::sink(),
//!     Pad::output("out_0", FlowControl::Manual),
//!     Pad::output("out_1", FlowControl::Manual),
//! ])?;
//! // ... more elements and links
//!
//! let handle = Executor::new().start(pipeline)?;
//! ```

mod actor;
mod events;
mod executor;
pub mod flow;
mod graph;

pub use events::{EventReceiver, EventSender, EventStream, PipelineEvent};
pub use executor::{Executor, ExecutorConfig, PipelineHandle};
pub use flow::{EffectiveFlowControl, FlowControl};
pub use graph::{Link, LinkInfo, Node, Pipeline};
