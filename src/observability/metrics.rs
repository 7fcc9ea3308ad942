//! Metrics collection using metrics-rs.

use metrics::{Counter, Gauge, Unit, counter, gauge};
use std::sync::atomic::{AtomicBool, Ordering};

/// Whether metrics have been initialized.
static METRICS_INITIALIZED: AtomicBool = AtomicBool::new(false);

// Metric names as constants for consistency
const TRIGGERS_HANDLED: &str = "lattice_triggers_handled";
const SEARCHES_STARTED: &str = "lattice_searches_started";
const SEARCH_HOPS: &str = "lattice_search_hops";
const DIAMONDS_DETECTED: &str = "lattice_diamonds_detected";
const REMEMBERED_SEARCHES: &str = "lattice_remembered_searches";
const MESSAGES_HANDLED: &str = "lattice_messages_handled";
const MAILBOX_DROPPED: &str = "lattice_mailbox_dropped";
const LINKED_PADS: &str = "lattice_linked_pads";

/// Initialize metrics descriptions.
///
/// Call this once at application startup before using any metrics.
/// Safe to call multiple times (subsequent calls are no-ops).
pub fn init_metrics() {
    if METRICS_INITIALIZED.swap(true, Ordering::SeqCst) {
        return;
    }

    metrics::describe_counter!(
        TRIGGERS_HANDLED,
        Unit::Count,
        "Trigger references processed for the first time"
    );
    metrics::describe_counter!(
        SEARCHES_STARTED,
        Unit::Count,
        "Diamond searches started after the debounce elapsed"
    );
    metrics::describe_counter!(
        SEARCH_HOPS,
        Unit::Count,
        "Search messages forwarded across pull-mode output pads"
    );
    metrics::describe_counter!(
        DIAMONDS_DETECTED,
        Unit::Count,
        "Pull-mode diamonds reported"
    );
    metrics::describe_gauge!(
        REMEMBERED_SEARCHES,
        Unit::Count,
        "Search paths currently remembered by an element"
    );
    metrics::describe_counter!(
        MESSAGES_HANDLED,
        Unit::Count,
        "Messages processed by element tasks"
    );
    metrics::describe_counter!(
        MAILBOX_DROPPED,
        Unit::Count,
        "Messages dropped because the receiving element had stopped"
    );
    metrics::describe_gauge!(
        LINKED_PADS,
        Unit::Count,
        "Pads of an element task that currently have a peer"
    );
}

/// Record a trigger reference handled by an element.
#[inline]
pub fn record_trigger_handled(element: &str) {
    counter!(TRIGGERS_HANDLED, "element" => element.to_string()).increment(1);
}

/// Record a search started by an element.
#[inline]
pub fn record_search_started(element: &str) {
    counter!(SEARCHES_STARTED, "element" => element.to_string()).increment(1);
}

/// Record a search forwarded across one output pad.
#[inline]
pub fn record_search_hop(element: &str) {
    counter!(SEARCH_HOPS, "element" => element.to_string()).increment(1);
}

/// Record a diamond reported by an element.
#[inline]
pub fn record_diamond_detected(element: &str) {
    counter!(DIAMONDS_DETECTED, "element" => element.to_string()).increment(1);
}

/// Record how many search paths an element remembers.
#[inline]
pub fn record_remembered_searches(element: &str, count: usize) {
    gauge!(REMEMBERED_SEARCHES, "element" => element.to_string()).set(count as f64);
}

/// Record a message dropped on its way to a stopped element.
#[inline]
pub fn record_mailbox_dropped(pipeline: &str, element: &str) {
    counter!(MAILBOX_DROPPED, "pipeline" => pipeline.to_string(), "element" => element.to_string())
        .increment(1);
}

/// Metrics collector for a running element task.
///
/// Provides a convenient way to record metrics with pre-configured labels.
#[derive(Clone)]
pub struct ElementMetrics {
    pipeline: String,
    element: String,
    messages: Counter,
    dropped: Counter,
    pads: Gauge,
}

impl ElementMetrics {
    /// Create a new element metrics collector.
    pub fn new(pipeline: &str, element: &str) -> Self {
        Self {
            pipeline: pipeline.to_string(),
            element: element.to_string(),
            messages: counter!(
                MESSAGES_HANDLED,
                "pipeline" => pipeline.to_string(),
                "element" => element.to_string()
            ),
            dropped: counter!(
                MAILBOX_DROPPED,
                "pipeline" => pipeline.to_string(),
                "element" => element.to_string()
            ),
            pads: gauge!(
                LINKED_PADS,
                "pipeline" => pipeline.to_string(),
                "element" => element.to_string()
            ),
        }
    }

    /// Record one handled message.
    #[inline]
    pub fn record_message(&self) {
        self.messages.increment(1);
    }

    /// Record a message this element could not deliver.
    #[inline]
    pub fn record_dropped(&self) {
        self.dropped.increment(1);
    }

    /// Record the number of linked pads.
    #[inline]
    pub fn record_linked_pads(&self, count: usize) {
        self.pads.set(count as f64);
    }

    /// Get the pipeline name.
    pub fn pipeline(&self) -> &str {
        &self.pipeline
    }

    /// Get the element name.
    pub fn element(&self) -> &str {
        &self.element
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_metrics() {
        // Should not panic
        init_metrics();
        // Should be idempotent
        init_metrics();
    }

    #[test]
    fn test_metric_names_are_unique() {
        let names = [
            TRIGGERS_HANDLED,
            SEARCHES_STARTED,
            SEARCH_HOPS,
            DIAMONDS_DETECTED,
            REMEMBERED_SEARCHES,
            MESSAGES_HANDLED,
            MAILBOX_DROPPED,
            LINKED_PADS,
        ];
        let unique: std::collections::HashSet<&str> = names.iter().copied().collect();

        assert_eq!(unique.len(), names.len());
        assert!(names.iter().all(|name| name.starts_with("lattice_")));
    }

    #[test]
    fn test_element_metrics() {
        let metrics = ElementMetrics::new("test-pipeline", "tee");

        metrics.record_message();
        metrics.record_dropped();
        metrics.record_linked_pads(3);

        assert_eq!(metrics.pipeline(), "test-pipeline");
        assert_eq!(metrics.element(), "tee");
    }

    #[test]
    fn test_global_recording_functions() {
        // These should not panic even without a recorder installed
        record_trigger_handled("tee");
        record_search_started("tee");
        record_search_hop("tee");
        record_diamond_detected("mixer");
        record_remembered_searches("mixer", 2);
        record_mailbox_dropped("test", "mixer");
    }
}
