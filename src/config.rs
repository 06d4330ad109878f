//! Sizing constants and the tunable bucket thresholds.

use core::fmt;

/// Smallest table capacity; requested capacities are rounded up to it.
pub const MIN_CAPACITY: usize = 16;

/// Largest table capacity. Growth stops here; buckets just get longer.
pub const MAX_CAPACITY: usize = 1 << 30;

/// Capacity used when no hint is given.
pub const DEFAULT_INITIAL_CAPACITY: usize = MIN_CAPACITY;

/// Shrinking needs more slots than this, and never goes below it.
pub(crate) const SHRINK_FLOOR: usize = 64;

/// Chain length at which a bucket is converted to a tree.
pub const DEFAULT_TREEIFY_THRESHOLD: usize = 7;

/// Live count at which a tree bucket is converted back to a chain.
pub const DEFAULT_UNTREEIFY_THRESHOLD: usize = 5;

/// Extra levels a tree insertion may descend beyond `log2(nodes)` before the
/// bucket is rebuilt balanced.
pub(crate) const REBALANCE_SLACK: usize = 7;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Requires `treeify >= 2` and `untreeify < treeify`.
    InvalidThresholds { treeify: usize, untreeify: usize },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidThresholds { treeify, untreeify } => write!(
                f,
                "invalid bucket thresholds: treeify={treeify}, untreeify={untreeify} \
                 (need treeify >= 2 and untreeify < treeify)"
            ),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Construction parameters for a `FlexSet`.
///
/// ```
/// use flex_set::Config;
///
/// let cfg = Config::new().with_initial_capacity(100).with_thresholds(8, 4).unwrap();
/// assert_eq!(cfg.capacity(), 128);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    initial_capacity: usize,
    treeify_threshold: usize,
    untreeify_threshold: usize,
}

impl Config {
    pub const fn new() -> Self {
        Self {
            initial_capacity: DEFAULT_INITIAL_CAPACITY,
            treeify_threshold: DEFAULT_TREEIFY_THRESHOLD,
            untreeify_threshold: DEFAULT_UNTREEIFY_THRESHOLD,
        }
    }

    /// Capacity hint; rounded up to a power of two, at least `MIN_CAPACITY`.
    pub fn with_initial_capacity(mut self, hint: usize) -> Self {
        self.initial_capacity = hint;
        self
    }

    pub fn with_thresholds(mut self, treeify: usize, untreeify: usize) -> Result<Self, ConfigError> {
        if treeify < 2 || untreeify >= treeify {
            return Err(ConfigError::InvalidThresholds { treeify, untreeify });
        }
        self.treeify_threshold = treeify;
        self.untreeify_threshold = untreeify;
        Ok(self)
    }

    pub fn initial_capacity(&self) -> usize {
        self.initial_capacity
    }

    pub fn treeify_threshold(&self) -> usize {
        self.treeify_threshold
    }

    pub fn untreeify_threshold(&self) -> usize {
        self.untreeify_threshold
    }

    /// Slot count a table built from this config starts with.
    pub fn capacity(&self) -> usize {
        round_capacity(self.initial_capacity)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

pub(crate) fn round_capacity(hint: usize) -> usize {
    hint.clamp(MIN_CAPACITY, MAX_CAPACITY).next_power_of_two()
}
