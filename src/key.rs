//! Sort/partition key and value records for the shuffled count stream.
//!
//! A [`CounterKey`] is the composite `(group_type, group, item)` key the
//! external shuffle sorts and partitions on. Two levels of comparison matter:
//!
//! - **Partitioning and run grouping** use only `(group_type, group)` — every
//!   record of one group lands in one partition, and the reducer sees one run
//!   per group.
//! - **Full ordering** additionally sorts by `item`, so identical items are
//!   contiguous within a run. The reduction algorithm depends on this; it is
//!   a required property of the stream, not an optimization.
//!
//! Keys and values are plain immutable records: each one owns its bytes and
//! lives only from emit to reduce. No holder objects are reused across
//! records.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::hash::{DefaultHasher, Hash, Hasher};

/// Composite sort/partition key: `(group_type, group bytes, item bytes)`.
///
/// `group_type` discriminates the logical schema of group/item for this
/// aggregation, so multiple unrelated countings can share one physical
/// stream. `item` is empty when the key stands for a group-level entry only.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CounterKey {
    pub group_type: i32,
    pub group: Vec<u8>,
    pub item: Vec<u8>,
}

impl CounterKey {
    pub fn new(group_type: i32, group: Vec<u8>, item: Vec<u8>) -> Self {
        Self { group_type, group, item }
    }

    /// Primary comparison: `(group_type, group)`, group bytes lexicographic.
    ///
    /// This is the grouping comparator the runtime uses to delimit runs.
    pub fn group_cmp(&self, other: &Self) -> Ordering {
        self.group_type
            .cmp(&other.group_type)
            .then_with(|| self.group.cmp(&other.group))
    }

    /// Whether two keys belong to the same run.
    pub fn same_group(&self, other: &Self) -> bool {
        self.group_type == other.group_type && self.group == other.group
    }

    /// Deterministic partition assignment on `(group_type, group)` bytes.
    ///
    /// Records sharing a group always map to the same partition; the item
    /// never participates.
    pub fn partition(&self, num_partitions: usize) -> usize {
        debug_assert!(num_partitions > 0);
        let mut h = DefaultHasher::new();
        self.group_type.hash(&mut h);
        self.group.hash(&mut h);
        (h.finish() % num_partitions as u64) as usize
    }
}

/// Full two-level ordering: `(group_type, group)` then `item`, bytes
/// lexicographic. Secondary sort by item is what makes the single-pass
/// boundary-detection reduction possible.
impl Ord for CounterKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.group_cmp(other).then_with(|| self.item.cmp(&other.item))
    }
}

impl PartialOrd for CounterKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Value record for one item occurrence batch.
///
/// `item` is a redundant copy of the key's item bytes, carried so the reducer
/// and combiner never have to re-derive it from the key. `count` is the
/// codec-encoded occurrence count — usually 1, or an arbitrary positive
/// integer for batched emission.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CounterValue {
    pub item: Vec<u8>,
    pub count: Vec<u8>,
}

impl CounterValue {
    pub fn new(item: Vec<u8>, count: Vec<u8>) -> Self {
        Self { item, count }
    }
}
