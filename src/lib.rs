//! # Lattice
//!
//! A media-pipeline runtime in which every element runs as its own task and
//! elements are connected by directional pads operating in push or pull
//! mode.
//!
//! Lattice watches the live graph for *pull-mode diamonds*: two distinct
//! demand paths that leave one element and meet again at another. Such a
//! topology can deadlock a pull-driven pipeline. Detection is fully
//! distributed: elements only know their own pads and exchange messages with
//! their direct neighbours, and every piece of detection state expires on
//! its own.
//!
//! ## Features
//!
//! - **Actor runtime**: one tokio task and one mailbox per element
//! - **Incremental detection**: link transactions trigger debounced searches
//!   only where new demand paths may have appeared
//! - **Sans-IO core**: [`diamond::DiamondDetector`] returns actions instead of
//!   performing them, so it runs unchanged under the deterministic
//!   [`diamond::simulation::Simulation`]
//! - **Observability**: `tracing` spans and events, `metrics` counters
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use lattice::prelude::*;
//!
//! let mut pipeline = Pipeline::new();
//! let a = pipeline.add_element("a", ElementKind::Source)?;
//! pipeline.add_pads(a, [
//!     Pad::output("out_0", FlowControl::Manual),
//!     Pad::output("out_1", FlowControl::Manual),
//! ])?;
//! let c = pipeline.add_element("c", ElementKind::Sink)?;
//! pipeline.add_pads(c, [
//!     Pad::input("in_0", FlowControl::Manual),
//!     Pad::input("in_1", FlowControl::Manual),
//! ])?;
//!
//! let config = ExecutorConfig::default()
//!     .with_detection(DetectionConfig::default().with_comparison(PathComparison::FullPath));
//! let mut handle = Executor::with_config(config).start(pipeline)?;
//! let mut events = handle.subscribe();
//!
//! handle.link_all([
//!     Link::new(a, "out_0", c, "in_0"),
//!     Link::new(a, "out_1", c, "in_1"),
//! ])?;
//! let report = events.next_diamond().await;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_op_in_unsafe_fn)]

pub mod diamond;
pub mod element;
pub mod error;
pub mod observability;
pub mod pipeline;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::diamond::{
        CollectingSink, DetectionConfig, DiamondReport, DiamondSink, PathComparison,
        PostponePolicy, TracingSink,
    };
    pub use crate::element::{ElementId, ElementKind, Pad, PadDirection, PadId};
    pub use crate::error::{Error, Result};
    pub use crate::pipeline::{
        EffectiveFlowControl, Executor, ExecutorConfig, FlowControl, Link, Pipeline,
        PipelineEvent, PipelineHandle,
    };
}

pub use error::{Error, Result};
