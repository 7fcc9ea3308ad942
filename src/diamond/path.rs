//! Paths travelled by a search.
//!
//! A [`Path`] is an immutable, prepend-only sequence of [`Vertex`]es. The
//! newest hop is at the head and the origin (the element that started the
//! search) is always the last vertex. Prepending shares the tail, so handing
//! one path to several output pads never copies it.
//!
//! An element contributes up to two vertices to a path: one when a search
//! enters through an input pad, and one when it leaves through an output pad.
//! The origin contributes a pad-less vertex followed by its exit vertices.

use crate::element::{ElementId, PadId};
use std::fmt;
use std::sync::Arc;

/// One hop of a search path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Vertex {
    element: ElementId,
    label: Arc<str>,
    input_pad: Option<PadId>,
    output_pad: Option<PadId>,
}

impl Vertex {
    /// Create a vertex without pads.
    pub fn new(element: ElementId, label: impl Into<Arc<str>>) -> Self {
        Self {
            element,
            label: label.into(),
            input_pad: None,
            output_pad: None,
        }
    }

    /// Set the pad through which the search entered.
    pub fn with_input_pad(mut self, pad: PadId) -> Self {
        self.input_pad = Some(pad);
        self
    }

    /// Set the pad through which the search leaves.
    pub fn with_output_pad(mut self, pad: PadId) -> Self {
        self.output_pad = Some(pad);
        self
    }

    /// Element this vertex belongs to.
    pub fn element(&self) -> ElementId {
        self.element
    }

    /// Human-readable element label.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Pad the search entered through.
    pub fn input_pad(&self) -> Option<&PadId> {
        self.input_pad.as_ref()
    }

    /// Pad the search left through.
    pub fn output_pad(&self) -> Option<&PadId> {
        self.output_pad.as_ref()
    }
}

impl fmt::Display for Vertex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(pad) = &self.input_pad {
            write!(f, "{}:", pad)?;
        }
        f.write_str(&self.label)?;
        if let Some(pad) = &self.output_pad {
            write!(f, ":{}", pad)?;
        }
        Ok(())
    }
}

struct Hop {
    vertex: Vertex,
    next: Option<Arc<Hop>>,
}

impl Drop for Hop {
    // Unlinks the chain one hop at a time so long paths don't recurse.
    fn drop(&mut self) {
        let mut next = self.next.take();
        while let Some(hop) = next {
            match Arc::try_unwrap(hop) {
                Ok(mut hop) => next = hop.next.take(),
                // Still shared with another path
                Err(_) => break,
            }
        }
    }
}

/// An ordered, immutable sequence of vertices ending at the search origin.
#[derive(Clone)]
pub struct Path {
    head: Arc<Hop>,
    len: usize,
}

impl Path {
    /// Create a single-vertex path containing only the origin.
    pub fn new(origin: Vertex) -> Self {
        Self {
            head: Arc::new(Hop {
                vertex: origin,
                next: None,
            }),
            len: 1,
        }
    }

    /// Return a new path with `vertex` as its newest hop.
    #[must_use]
    pub fn prepend(&self, vertex: Vertex) -> Self {
        Self {
            head: Arc::new(Hop {
                vertex,
                next: Some(Arc::clone(&self.head)),
            }),
            len: self.len + 1,
        }
    }

    /// The newest vertex.
    pub fn head(&self) -> &Vertex {
        &self.head.vertex
    }

    /// The vertex the search started from.
    pub fn origin(&self) -> &Vertex {
        let mut hop = self.head.as_ref();
        while let Some(next) = hop.next.as_deref() {
            hop = next;
        }
        &hop.vertex
    }

    /// The vertex right after the origin, if the path has left it.
    ///
    /// For paths built by a search this is the origin's exit vertex, which
    /// names the output pad the search left the origin through.
    pub fn first_hop(&self) -> Option<&Vertex> {
        if self.len < 2 {
            return None;
        }
        self.iter().nth(self.len - 2)
    }

    /// Number of vertices in the path.
    pub fn vertex_count(&self) -> usize {
        self.len
    }

    /// Iterate from the newest vertex to the origin.
    pub fn iter(&self) -> PathIter<'_> {
        PathIter {
            next: Some(self.head.as_ref()),
        }
    }

    /// Vertices ordered from the origin to the newest hop.
    pub fn from_origin(&self) -> Vec<&Vertex> {
        let mut vertices: Vec<&Vertex> = self.iter().collect();
        vertices.reverse();
        vertices
    }

    /// Number of vertices that belong to `element`.
    pub fn visits(&self, element: ElementId) -> usize {
        self.iter().filter(|v| v.element == element).count()
    }

    /// Check if both paths start from the same origin vertex.
    pub fn same_origin(&self, other: &Path) -> bool {
        self.origin() == other.origin()
    }
}

impl PartialEq for Path {
    fn eq(&self, other: &Self) -> bool {
        if Arc::ptr_eq(&self.head, &other.head) {
            return true;
        }
        self.len == other.len && self.iter().eq(other.iter())
    }
}

impl Eq for Path {}

impl fmt::Debug for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.from_origin()).finish()
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, vertex) in self.from_origin().into_iter().enumerate() {
            if i > 0 {
                f.write_str(" -> ")?;
            }
            write!(f, "{}", vertex)?;
        }
        Ok(())
    }
}

/// Iterator over a path, newest vertex first.
pub struct PathIter<'a> {
    next: Option<&'a Hop>,
}

impl<'a> Iterator for PathIter<'a> {
    type Item = &'a Vertex;

    fn next(&mut self) -> Option<Self::Item> {
        let hop = self.next?;
        self.next = hop.next.as_deref();
        Some(&hop.vertex)
    }
}
