use crate::activity::registry::RequestRegistry;
use crate::activity::tree::ActivityTree;
use crate::config::InspectorConfig;

pub const DEFAULT_MAX_RETAINED: usize = 45;
pub const DEFAULT_BURST_PERCENT: u32 = 20;

/// Bounds how many request rows are kept.
///
/// Rows may grow past `max_retained` by `burst_percent` before a single
/// eviction pass trims them back to exactly `max_retained`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionPolicy {
    pub max_retained: usize,
    pub burst_percent: u32,
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self {
            max_retained: DEFAULT_MAX_RETAINED,
            burst_percent: DEFAULT_BURST_PERCENT,
        }
    }
}

impl RetentionPolicy {
    pub fn new(max_retained: usize, burst_percent: u32) -> Self {
        Self {
            max_retained,
            burst_percent,
        }
    }

    pub fn from_config(config: &InspectorConfig) -> Self {
        Self::new(config.max_retained, config.burst_allowance_percent)
    }

    /// How many of the oldest rows to evict when `count` rows are held.
    pub fn excess(&self, count: usize) -> usize {
        // integer form of count > max * (1 + burst / 100)
        let over = (count as u128) * 100
            > (self.max_retained as u128) * (100 + self.burst_percent as u128);
        if over {
            count - self.max_retained
        } else {
            0
        }
    }

    /// Evict from `tree` and forget the evicted ids in `registry`.
    ///
    /// Returns the number of rows evicted.
    pub fn enforce(&self, tree: &mut ActivityTree, registry: &mut RequestRegistry) -> usize {
        let excess = self.excess(tree.len());
        if excess == 0 {
            return 0;
        }
        log::debug!("[Retention] Removing {} request nodes", excess);
        let evicted = tree.evict_oldest(excess);
        for id in &evicted {
            registry.unregister(id);
        }
        evicted.len()
    }
}
