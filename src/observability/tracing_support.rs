//! Tracing integration for structured logging and spans.

use tracing::{Level, Span, span};

/// Create a span for pipeline execution.
///
/// # Example
///
/// ```rust,ignore
/// use lattice::observability::span_pipeline;
///
/// let span = span_pipeline("my-pipeline");
/// let _guard = span.enter();
/// ```
#[inline]
pub fn span_pipeline(name: &str) -> Span {
    span!(Level::INFO, "pipeline", name = %name)
}

/// Create a span for an element task.
#[inline]
pub fn span_element(pipeline: &str, element: &str, element_kind: &str) -> Span {
    span!(
        Level::DEBUG,
        "element",
        pipeline = %pipeline,
        element = %element,
        element_kind = %element_kind
    )
}

/// Log a link applied by the coordinator.
#[inline]
pub fn trace_link(pipeline: &str, src: &str, src_pad: &str, sink: &str, sink_pad: &str) {
    tracing::debug!(
        pipeline = %pipeline,
        src = %src,
        src_pad = %src_pad,
        sink = %sink,
        sink_pad = %sink_pad,
        "pads linked"
    );
}

/// Log pipeline state change.
#[inline]
pub fn trace_state_change(pipeline: &str, from: &str, to: &str) {
    tracing::info!(
        pipeline = %pipeline,
        from = %from,
        to = %to,
        "pipeline state changed"
    );
}
