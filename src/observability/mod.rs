//! Observability features: metrics and tracing.
//!
//! - **Metrics**: Counters and gauges via `metrics-rs`
//! - **Tracing**: Structured logging and spans via `tracing`
//!
//! ## Metrics
//!
//! | Metric | Type | Description |
//! |--------|------|-------------|
//! | `lattice_triggers_handled` | Counter | Trigger references processed |
//! | `lattice_searches_started` | Counter | Diamond searches started |
//! | `lattice_search_hops` | Counter | Search messages forwarded |
//! | `lattice_diamonds_detected` | Counter | Diamonds reported |
//! | `lattice_remembered_searches` | Gauge | Search paths held per element |
//! | `lattice_messages_handled` | Counter | Messages processed by element tasks |
//! | `lattice_mailbox_dropped` | Counter | Messages sent to stopped elements |
//! | `lattice_linked_pads` | Gauge | Linked pads per element |
//!
//! Nothing is exported unless the application installs a `metrics` recorder.

mod metrics;
mod tracing_support;

pub use metrics::{
    ElementMetrics, init_metrics, record_diamond_detected, record_mailbox_dropped,
    record_remembered_searches, record_search_hop, record_search_started, record_trigger_handled,
};
pub use tracing_support::{span_element, span_pipeline, trace_link, trace_state_change};
