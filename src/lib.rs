//! # Grouptally
//!
//! A **single-pass grouped counting and distinct-counting engine** for
//! externally sorted, partitioned key-value streams. In one scan it computes,
//! per logical group, the equivalent of two SQL aggregates at once:
//!
//! 1. `SELECT item, count(*) FROM input GROUP BY group_type, group, item`
//! 2. `SELECT count(item), count(DISTINCT item) FROM input GROUP BY group_type, group`
//!
//! without ever materializing a set of seen items: because the upstream
//! shuffle delivers items sorted within each group, distinct counting is a
//! boundary detection problem solvable with O(1) state per run.
//!
//! ## Key Features
//!
//! - **Byte-level key contract** — all equality and ordering on encoded
//!   bytes; typed values pass through a [`ByteCodec`] with a documented,
//!   tested consistency law
//! - **Pre-aggregating combiner** — associative partial sums collapse
//!   same-key records before they cross the shuffle boundary
//! - **Boundary-detection reducer** — per-item totals, group totals, and
//!   distinct counts from one linear scan
//! - **Minimum-count policies** — per-group-type thresholds that filter
//!   items out of both output relations
//! - **Pluggable runtime seam** — the reducer consumes a
//!   [`GroupedRecordSource`], so it runs identically against the bundled
//!   in-memory shuffle or any external sorted-grouped-stream runtime
//! - **Sequential and parallel execution** — disjoint partitions, one rayon
//!   worker per partition
//! - **Run metrics** — per-group-type counters for emitted pairs and
//!   produced rows
//!
//! ## Quick Start
//!
//! ```
//! use grouptally::*;
//! # use anyhow::Result;
//!
//! # fn main() -> Result<()> {
//! let lines = vec!["to be or not to be".to_string()];
//!
//! let run = CountJob::new()
//!     .mode(ExecMode::Sequential)
//!     .add_input(move |emitter| {
//!         for line in &lines {
//!             for word in line.split_whitespace() {
//!                 // group: the whole corpus; item: the word
//!                 emitter.emit(0, &"corpus", &word)?;
//!             }
//!         }
//!         Ok(())
//!     })
//!     .run()?;
//!
//! // Per-item rows: one per distinct word. Group row: (total, distinct).
//! assert_eq!(run.items.len(), 4);
//! assert_eq!(run.groups[0].total_count, 6);
//! assert_eq!(run.groups[0].distinct_count, 4);
//! # Ok(())
//! # }
//! ```
//!
//! ## Core Concepts
//!
//! ### Keys and values
//!
//! A [`CounterKey`] is `(group_type, group bytes, item bytes)`. The
//! `group_type` discriminates unrelated countings sharing one stream; the
//! shuffle partitions and groups on `(group_type, group)` and sorts
//! additionally by `item`. A [`CounterValue`] carries the item bytes and one
//! encoded partial count.
//!
//! ### The serialization contract
//!
//! Two logical values are the same item if and only if they encode to the
//! same bytes. The engine never deserializes to compare, so the codec must
//! guarantee `a == b ⇒ encode(a) == encode(b)`; see [`ByteCodec`]. The
//! default [`PostcardCodec`] satisfies this for plain data types.
//!
//! ### Minimum-count filtering
//!
//! A [`MinCountPolicy`] maps group types to occurrence thresholds. Items
//! below their threshold are excluded from *both* relations: they appear in
//! no per-item row and contribute to neither the group total nor the
//! distinct count.
//!
//! ### Execution
//!
//! [`CountJob`] drives the whole flow locally: mapper closures emit through
//! a [`CountEmitter`], the [`InMemoryShuffle`] partitions and sorts, the
//! [`PreAggregator`] compacts, and the [`GroupedCountReducer`] produces
//! [`ItemCount`] and [`GroupCount`] rows. Against a real distributed
//! runtime, the same reducer runs over whatever implements
//! [`GroupedRecordSource`].
//!
//! ## Module Overview
//!
//! - [`codec`] — typed-value ↔ bytes seam and its consistency law
//! - [`key`] — sort/partition key and value records
//! - [`policy`] — per-group-type minimum-count thresholds
//! - [`emit`] — mapper-side emission of key/value pairs
//! - [`combine`] — the pre-aggregating combiner
//! - [`reduce`] — the boundary-detection reduction algorithm
//! - [`source`] — the sorted-grouped-stream runtime seam
//! - [`shuffle`] — in-memory partition/sort/combine runtime
//! - [`output`] — the two output relations and their sinks
//! - [`job`] — end-to-end local job builder
//! - [`metrics`] — per-group-type run counters

pub mod codec;
pub mod combine;
pub mod emit;
pub mod error;
pub mod job;
pub mod key;
pub mod metrics;
pub mod output;
pub mod policy;
pub mod reduce;
pub mod shuffle;
pub mod source;

pub use codec::{ByteCodec, PostcardCodec};
pub use combine::{PartialSum, PreAggregator};
pub use emit::{CountEmitter, PairBuffer, PairSink};
pub use error::TallyError;
pub use job::{CountJob, CountRun, ExecMode};
pub use key::{CounterKey, CounterValue};
pub use metrics::{CounterMetric, Metric, MetricsCollector};
pub use output::{GroupCount, ItemCount, JsonlSink, MemorySink, OutputSink};
pub use policy::MinCountPolicy;
pub use reduce::GroupedCountReducer;
pub use shuffle::{InMemoryShuffle, PartitionStream};
pub use source::{GroupedRecordSource, RunHeader, VecRunSource};
