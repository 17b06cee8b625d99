//! Structural limits protecting against pathological or adversarial inputs.

/// Per-parse structural limits.
///
/// These are the only denial-of-service defenses in the core. They are passed explicitly at
/// construction time; there is no mutable global configuration. Wall-clock timeouts, if desired,
/// must be imposed by the caller around the whole decode call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    /// Maximum combined nesting depth of block constructs and flow collections.
    ///
    /// Exceeding this limit aborts the scan with an `"exceeded max depth"` error. Nesting of
    /// exactly `max_depth` levels is accepted.
    pub max_depth: usize,
    /// Maximum total number of nodes reachable by expanding aliases.
    ///
    /// Each alias traversal counts the full (non-deduplicated) expansion of its target. Exceeding
    /// the budget aborts composition with an `"excessive aliasing"` error. This defends against
    /// quadratic and exponential blowups from nested anchors referencing each other's containers.
    pub max_alias_expansion: u64,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_depth: 10_000,
            max_alias_expansion: 1_000_000,
        }
    }
}

impl Limits {
    /// Limits suitable for trusted input: effectively unbounded.
    #[must_use]
    pub fn unbounded() -> Self {
        Self {
            max_depth: usize::MAX,
            max_alias_expansion: u64::MAX,
        }
    }
}
