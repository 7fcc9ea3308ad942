//! Element identity and kind.

use std::fmt;

/// Unique identifier for an element in a pipeline.
///
/// Ids are assigned by the pipeline in insertion order and are never reused
/// within one pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ElementId(pub(crate) u32);

impl ElementId {
    /// Create an id from a raw index.
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    /// Get the underlying index.
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The kind of an element in the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ElementKind {
    /// A source element (only output pads).
    Source,
    /// A filter element (inputs and outputs).
    #[default]
    Filter,
    /// A sink element (only input pads).
    Sink,
    /// A terminal element that both consumes and produces on behalf of an
    /// enclosing container (e.g. a bin boundary or an app endpoint).
    ///
    /// Endpoints never originate or forward triggers.
    Endpoint,
}

impl ElementKind {
    /// Check if this kind is a terminal endpoint.
    #[inline]
    pub fn is_endpoint(&self) -> bool {
        matches!(self, ElementKind::Endpoint)
    }

    /// Human-readable name of the kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            ElementKind::Source => "source",
            ElementKind::Filter => "filter",
            ElementKind::Sink => "sink",
            ElementKind::Endpoint => "endpoint",
        }
    }
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
