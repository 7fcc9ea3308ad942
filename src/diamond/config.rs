//! Diamond-detection configuration.

use crate::error::{Error, Result};
use std::time::Duration;

/// How a second search arrival is compared against the remembered path
/// before deciding whether it closes a diamond.
///
/// A search that reaches an element twice under the same reference is only
/// reported when the two paths do *not* "share a common prefix". What counts
/// as a common prefix is configurable:
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PathComparison {
    /// Paths share a prefix when their origin vertices are equal.
    ///
    /// Every path of a given search starts at the same origin, so under this
    /// rule a second arrival never produces a report.
    #[default]
    Origin,
    /// Paths share a prefix when they left the origin through the same
    /// output pad. Reports only diamonds that fork at the origin itself.
    FirstHop,
    /// Paths share a prefix only when they are identical. Any two distinct,
    /// acyclic paths converging on an element are reported.
    FullPath,
}

/// What happens to the postponed-search flag once the deferred search fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PostponePolicy {
    /// Clear the flag when `start_search` fires, so a later trigger can
    /// schedule another search.
    #[default]
    ResetOnFire,
    /// Never clear the flag: an element schedules at most one search over
    /// its whole lifetime.
    Once,
}

/// Configuration for diamond detection.
#[derive(Debug, Clone)]
pub struct DetectionConfig {
    /// Whether detection runs at all. When disabled every detection message
    /// is ignored.
    pub enabled: bool,

    /// Delay between a trigger and the search it schedules.
    pub search_debounce: Duration,

    /// Lifetime of remembered trigger and search references.
    pub ref_expiry: Duration,

    /// Rule used to decide whether two converging paths form a diamond.
    pub comparison: PathComparison,

    /// Reset behaviour of the postponed-search flag.
    pub postpone_policy: PostponePolicy,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self::with_time_unit(Duration::from_secs(1))
    }
}

impl DetectionConfig {
    /// Debounce length in time units.
    pub const DEBOUNCE_UNITS: u32 = 1;

    /// Reference lifetime in time units.
    pub const EXPIRY_UNITS: u32 = 10;

    /// Create a config whose timers are expressed in multiples of `unit`.
    ///
    /// The debounce is one unit and references expire after ten.
    pub fn with_time_unit(unit: Duration) -> Self {
        Self {
            enabled: true,
            search_debounce: unit * Self::DEBOUNCE_UNITS,
            ref_expiry: unit * Self::EXPIRY_UNITS,
            comparison: PathComparison::default(),
            postpone_policy: PostponePolicy::default(),
        }
    }

    /// Create a disabled config.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    /// Set the path comparison rule.
    pub fn with_comparison(mut self, comparison: PathComparison) -> Self {
        self.comparison = comparison;
        self
    }

    /// Set the postpone policy.
    pub fn with_postpone_policy(mut self, policy: PostponePolicy) -> Self {
        self.postpone_policy = policy;
        self
    }

    /// Set the search debounce.
    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.search_debounce = debounce;
        self
    }

    /// Set the reference expiry.
    pub fn with_expiry(mut self, expiry: Duration) -> Self {
        self.ref_expiry = expiry;
        self
    }

    /// Check that the timers are usable.
    ///
    /// References must live at least as long as the debounce, otherwise a
    /// trigger could be forgotten before the search it scheduled starts.
    pub fn validate(&self) -> Result<()> {
        if self.ref_expiry.is_zero() {
            return Err(Error::InvalidConfig("ref_expiry must be non-zero".into()));
        }
        if self.ref_expiry < self.search_debounce {
            return Err(Error::InvalidConfig(format!(
                "ref_expiry ({:?}) is shorter than search_debounce ({:?})",
                self.ref_expiry, self.search_debounce
            )));
        }
        Ok(())
    }
}
