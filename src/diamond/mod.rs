//! Distributed detection of pull-mode diamonds.
//!
//! A diamond is a pair of distinct demand paths that leave one element and
//! converge on another. When every edge on both paths is pull-driven, the
//! converging element may wait for data on one input that the diverging
//! element will only produce once the other input has been served, and the
//! pipeline stalls.
//!
//! Detection runs inside the elements themselves. No element sees the graph;
//! each one only knows its own pads and their peers, and all coordination
//! happens through the messages in [`DetectionMessage`]:
//!
//! 1. A link transaction sends `StartTrigger` to every element whose output
//!    pad was linked.
//! 2. Triggers travel upstream across non-push inputs. An element with at
//!    least two pull outputs schedules a debounced `StartSearch`.
//! 3. A search floods downstream across pull outputs, carrying the path it
//!    has travelled. Each element remembers the first path per search
//!    reference. A second, unrelated path under the same reference is a
//!    diamond and is reported.
//! 4. Every remembered reference is forgotten after a fixed expiry.
//!
//! [`DiamondDetector`] holds the per-element logic and performs no I/O; it
//! returns [`DetectionAction`]s that a host executes. The crate ships two
//! hosts: the asynchronous runtime in [`crate::pipeline`] and the
//! deterministic [`simulation::Simulation`].

mod config;
mod detector;
mod message;
mod path;
mod reference;
mod report;
mod search;
mod state;
mod trigger;

pub mod simulation;

pub use config::{DetectionConfig, PathComparison, PostponePolicy};
pub use detector::{DiamondDetector, ElementView};
pub use message::{DetectionAction, DetectionMessage};
pub use path::{Path, PathIter, Vertex};
pub use reference::{SearchRef, TriggerRef};
pub use report::{CollectingSink, DiamondReport, DiamondSink, TracingSink};
pub use state::{DetectionSnapshot, DetectionState};
