//! Error types for Lattice.

use crate::element::{ElementId, PadDirection, PadId};
use thiserror::Error;

/// Result type alias using Lattice's Error.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for Lattice operations.
///
/// Only the pipeline-building and handle APIs return errors. Diamond
/// detection itself never fails: unknown or expired references are handled
/// as fresh sessions.
#[derive(Error, Debug)]
pub enum Error {
    /// No element with this id exists in the pipeline.
    #[error("unknown element {0}")]
    UnknownElement(ElementId),

    /// The element has no pad with this name.
    #[error("element {element} has no pad '{pad}'")]
    UnknownPad {
        /// Element that was queried.
        element: ElementId,
        /// Name of the missing pad.
        pad: PadId,
    },

    /// A pad with this name already exists on the element.
    #[error("element {element} already has a pad named '{pad}'")]
    DuplicatePad {
        /// Element the pad was added to.
        element: ElementId,
        /// Name of the pad.
        pad: PadId,
    },

    /// An element with this name already exists in the pipeline.
    #[error("an element named '{0}' already exists")]
    DuplicateElement(String),

    /// A pad was used in the wrong direction (e.g. linking from an input pad).
    #[error("pad '{pad}' on element {element} is an {actual:?} pad, expected {expected:?}")]
    DirectionMismatch {
        /// Element owning the pad.
        element: ElementId,
        /// Name of the pad.
        pad: PadId,
        /// Direction required by the operation.
        expected: PadDirection,
        /// Direction the pad actually has.
        actual: PadDirection,
    },

    /// The pad is already linked to a peer.
    #[error("pad '{pad}' on element {element} is already linked")]
    PadAlreadyLinked {
        /// Element owning the pad.
        element: ElementId,
        /// Name of the pad.
        pad: PadId,
    },

    /// The pad is not linked to any peer.
    #[error("pad '{pad}' on element {element} is not linked")]
    PadNotLinked {
        /// Element owning the pad.
        element: ElementId,
        /// Name of the pad.
        pad: PadId,
    },

    /// The element task is no longer running.
    #[error("element {0} has stopped")]
    ElementStopped(ElementId),

    /// An element task panicked or was cancelled.
    #[error("element task failed: {0}")]
    TaskFailed(String),

    /// Configuration values are inconsistent.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}
