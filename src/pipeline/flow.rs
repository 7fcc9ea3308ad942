//! Flow-control modes for pads.
//!
//! Every pad declares how data moves across it:
//!
//! ```text
//!  Push:    producer ──buffers──> consumer          (producer-driven)
//!  Manual:  producer <──demand─── consumer          (consumer-driven, "pull")
//!  Auto:    resolved at link time to push or pull
//! ```
//!
//! The resolved mode of an auto pad is its *effective* flow control. Full
//! resolution across chains of auto pads belongs to the linking layer; this
//! module only provides the single-link rule used by the built-in coordinator.
//! Diamond detection consumes the result through [`PadEntry::is_pull`].
//!
//! [`PadEntry::is_pull`]: crate::element::PadEntry::is_pull

use std::fmt;

/// Declared flow-control mode of a pad.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FlowControl {
    /// Producer-driven: buffers are sent without demand.
    Push,
    /// Consumer-driven: buffers are sent only against demand.
    Manual,
    /// Resolved to push or pull once the pad is linked.
    #[default]
    Auto,
}

/// Resolved flow-control mode of a pad.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum EffectiveFlowControl {
    /// Data is pushed downstream.
    #[default]
    Push,
    /// Data is pulled by downstream demand.
    Pull,
}

impl FlowControl {
    /// Check if the declared mode is push.
    #[inline]
    pub fn is_push(&self) -> bool {
        matches!(self, FlowControl::Push)
    }

    /// Check if the declared mode is auto.
    #[inline]
    pub fn is_auto(&self) -> bool {
        matches!(self, FlowControl::Auto)
    }

    /// Effective mode of a pad whose mode is not auto.
    ///
    /// Returns `None` for auto pads, which need a peer to resolve against.
    pub fn fixed(&self) -> Option<EffectiveFlowControl> {
        match self {
            FlowControl::Push => Some(EffectiveFlowControl::Push),
            FlowControl::Manual => Some(EffectiveFlowControl::Pull),
            FlowControl::Auto => None,
        }
    }

    /// Resolve this pad's effective mode against the peer it is linked to.
    ///
    /// Fixed pads keep their own mode. An auto pad adopts the mode of a fixed
    /// peer; two auto pads linked together fall back to `fallback`.
    pub fn resolve_against(
        &self,
        peer: FlowControl,
        fallback: EffectiveFlowControl,
    ) -> EffectiveFlowControl {
        self.fixed()
            .or_else(|| peer.fixed())
            .unwrap_or(fallback)
    }
}

impl EffectiveFlowControl {
    /// Check if this is pull mode.
    #[inline]
    pub fn is_pull(&self) -> bool {
        matches!(self, EffectiveFlowControl::Pull)
    }
}

impl fmt::Display for FlowControl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FlowControl::Push => f.write_str("push"),
            FlowControl::Manual => f.write_str("manual"),
            FlowControl::Auto => f.write_str("auto"),
        }
    }
}

impl fmt::Display for EffectiveFlowControl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EffectiveFlowControl::Push => f.write_str("push"),
            EffectiveFlowControl::Pull => f.write_str("pull"),
        }
    }
}
