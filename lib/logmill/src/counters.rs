//! Grouped tally counters for map-only scans.
//!
//! Each task increments its own private `Counters`; the orchestrator
//! merges them once all tasks finish, preserving end-of-run tally
//! semantics without shared mutable state.

use std::collections::BTreeMap;

#[derive(Debug, Clone, Default)]
pub struct Counters {
    counts: BTreeMap<(String, String), u64>,
}

impl Counters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment(&mut self, group: &str, name: &str, by: u64) {
        *self
            .counts
            .entry((group.to_string(), name.to_string()))
            .or_insert(0) += by;
    }

    pub fn get(&self, group: &str, name: &str) -> u64 {
        self.counts
            .get(&(group.to_string(), name.to_string()))
            .copied()
            .unwrap_or(0)
    }

    pub fn merge(&mut self, other: Counters) {
        for ((group, name), count) in other.counts {
            *self.counts.entry((group, name)).or_insert(0) += count;
        }
    }

    /// Tallies in (group, name) order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str, u64)> {
        self.counts
            .iter()
            .map(|((g, n), c)| (g.as_str(), n.as_str(), *c))
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }
}
