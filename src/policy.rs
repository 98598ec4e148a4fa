//! Per-group-type minimum occurrence thresholds.
//!
//! The reducer only emits (and only counts toward the group totals) items
//! whose aggregated count reaches the threshold configured for their group
//! type. Absence of an entry means threshold 1, i.e. no filtering.
//!
//! The policy is built once from configuration at worker startup and never
//! mutated afterward, so the reducer stays free of configuration parsing.

use crate::error::TallyError;
use std::collections::HashMap;

/// Immutable map from group type to minimum occurrence count.
#[derive(Clone, Debug, Default)]
pub struct MinCountPolicy {
    thresholds: HashMap<i32, u64>,
}

impl MinCountPolicy {
    /// A policy with no thresholds configured: every item qualifies.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a policy from `(group_type, threshold)` entries.
    ///
    /// A threshold of 0 is rejected: it would be indistinguishable from "no
    /// filtering" but almost certainly indicates a configuration mistake.
    /// Later entries for the same group type override earlier ones.
    pub fn from_entries(
        entries: impl IntoIterator<Item = (i32, u64)>,
    ) -> Result<Self, TallyError> {
        let mut thresholds = HashMap::new();
        for (group_type, value) in entries {
            if value == 0 {
                return Err(TallyError::InvalidMinimumCount { group_type, value });
            }
            thresholds.insert(group_type, value);
        }
        Ok(Self { thresholds })
    }

    /// The threshold for a group type; 1 when none is configured.
    pub fn threshold(&self, group_type: i32) -> u64 {
        self.thresholds.get(&group_type).copied().unwrap_or(1)
    }

    /// Whether an item with the given aggregated count qualifies.
    pub fn meets(&self, group_type: i32, item_count: u64) -> bool {
        item_count >= self.threshold(group_type)
    }
}
