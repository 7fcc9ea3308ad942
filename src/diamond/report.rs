//! Diamond reports and reporting sinks.

use crate::diamond::path::{Path, Vertex};
use crate::diamond::reference::SearchRef;
use crate::element::ElementId;
use std::fmt;
use std::sync::{Arc, Mutex};

/// Two paths of one search that converged on the same element.
#[derive(Debug, Clone, PartialEq)]
pub struct DiamondReport {
    element: ElementId,
    label: Arc<str>,
    reference: SearchRef,
    remembered: Path,
    arrived: Path,
}

impl DiamondReport {
    /// Create a report for the element where the paths converged.
    pub fn new(
        element: ElementId,
        label: impl Into<Arc<str>>,
        reference: SearchRef,
        remembered: Path,
        arrived: Path,
    ) -> Self {
        Self {
            element,
            label: label.into(),
            reference,
            remembered,
            arrived,
        }
    }

    /// Element where the two paths converged.
    pub fn element(&self) -> ElementId {
        self.element
    }

    /// Label of the converging element.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Search session that found the diamond.
    pub fn reference(&self) -> SearchRef {
        self.reference
    }

    /// The path that reached the element first.
    pub fn remembered(&self) -> &Path {
        &self.remembered
    }

    /// The path whose arrival closed the diamond.
    pub fn arrived(&self) -> &Path {
        &self.arrived
    }

    /// Origin vertex of the search.
    pub fn origin(&self) -> &Vertex {
        self.remembered.origin()
    }

    /// Last vertex the two paths share when walked from the origin.
    ///
    /// Returns `None` if the paths do not even share their origin.
    pub fn divergence(&self) -> Option<&Vertex> {
        self.remembered
            .from_origin()
            .into_iter()
            .zip(self.arrived.from_origin())
            .take_while(|(a, b)| a == b)
            .last()
            .map(|(a, _)| a)
    }

    /// Check if this report names the same unordered pair of paths as `other`.
    pub fn same_pair(&self, other: &DiamondReport) -> bool {
        self.element == other.element
            && ((self.remembered == other.remembered && self.arrived == other.arrived)
                || (self.remembered == other.arrived && self.arrived == other.remembered))
    }
}

impl fmt::Display for DiamondReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "diamond at {} ({}): [{}] and [{}]",
            self.label, self.reference, self.remembered, self.arrived
        )
    }
}

/// Receiver of completed diamond reports.
///
/// Sinks are called from element tasks and must not block.
pub trait DiamondSink: Send + Sync + 'static {
    /// Handle one report.
    fn report(&self, report: &DiamondReport);
}

impl<S: DiamondSink + ?Sized> DiamondSink for Arc<S> {
    fn report(&self, report: &DiamondReport) {
        (**self).report(report)
    }
}

/// Sink that logs every report as a warning.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl DiamondSink for TracingSink {
    fn report(&self, report: &DiamondReport) {
        tracing::warn!(
            element = %report.label(),
            reference = %report.reference(),
            origin = %report.origin(),
            first = %report.remembered(),
            second = %report.arrived(),
            "pull-mode diamond detected, demand may deadlock"
        );
    }
}

/// Sink that keeps every report in memory.
#[derive(Debug, Default)]
pub struct CollectingSink {
    reports: Mutex<Vec<DiamondReport>>,
}

impl CollectingSink {
    /// Create an empty collecting sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of all reports received so far.
    pub fn reports(&self) -> Vec<DiamondReport> {
        match self.reports.lock() {
            Ok(reports) => reports.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Number of reports received so far.
    pub fn len(&self) -> usize {
        match self.reports.lock() {
            Ok(reports) => reports.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }

    /// Check if no report was received.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl DiamondSink for CollectingSink {
    fn report(&self, report: &DiamondReport) {
        match self.reports.lock() {
            Ok(mut reports) => reports.push(report.clone()),
            Err(poisoned) => poisoned.into_inner().push(report.clone()),
        }
    }
}
