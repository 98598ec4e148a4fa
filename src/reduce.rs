//! The core reduction: per-item totals and distinct counts in one pass.
//!
//! For each run — all records of one `(group_type, group)`, secondary-sorted
//! by item — the reducer walks the records once, detecting item boundaries by
//! comparing raw item bytes against the current signature. Because identical
//! items are contiguous, per-item totals and the distinct count fall out of a
//! linear scan with O(1) extra state; no set of seen items is ever built.
//!
//! The minimum-count filter is applied when an item is closed out, *before*
//! its total is added to the group accumulators. A filtered item therefore
//! contributes to neither output relation — it is absent from the per-item
//! rows, from `total_count`, and from `distinct_count` alike.

use crate::codec::ByteCodec;
use crate::error::TallyError;
use crate::metrics::{MetricsCollector, counters};
use crate::output::{GroupCount, ItemCount, OutputSink};
use crate::policy::MinCountPolicy;
use crate::source::{GroupedRecordSource, RunHeader};

/// Single-pass grouped count / distinct-count reducer.
///
/// Stateless across runs; all per-run state lives on the stack of
/// [`reduce_run`](GroupedCountReducer::reduce_run). One reducer instance can
/// therefore process any number of partitions sequentially, and the result
/// is a deterministic function of the sorted input — a clean restart after a
/// failure reproduces it exactly.
pub struct GroupedCountReducer<'a, C: ByteCodec> {
    codec: &'a C,
    policy: &'a MinCountPolicy,
    metrics: &'a MetricsCollector,
}

impl<'a, C: ByteCodec> GroupedCountReducer<'a, C> {
    pub fn new(codec: &'a C, policy: &'a MinCountPolicy, metrics: &'a MetricsCollector) -> Self {
        Self { codec, policy, metrics }
    }

    /// Drain every run from `source` into `sink`.
    pub fn reduce_all<S, O>(&self, source: &mut S, sink: &mut O) -> Result<(), TallyError>
    where
        S: GroupedRecordSource,
        O: OutputSink,
    {
        while let Some(header) = source.begin_run()? {
            self.reduce_run(&header, source, sink)?;
        }
        Ok(())
    }

    /// Reduce one run: emit qualifying per-item rows, then the group row.
    ///
    /// Consumes records from `source` until the current run ends and calls
    /// `end_run` before emitting the group-level row.
    pub fn reduce_run<S, O>(
        &self,
        header: &RunHeader,
        source: &mut S,
        sink: &mut O,
    ) -> Result<(), TallyError>
    where
        S: GroupedRecordSource,
        O: OutputSink,
    {
        let mut signature: Option<Vec<u8>> = None;
        let mut item_count: u64 = 0;
        let mut total_count: u64 = 0;
        let mut distinct_count: u64 = 0;

        while let Some(record) = source.next_record()? {
            let partial: u64 = self.codec.decode(&record.count)?;

            match &signature {
                // First record of the run.
                None => signature = Some(record.item),
                // Item boundary: close out the previous item, start the next.
                Some(current) if record.item != *current => {
                    self.close_item(
                        header,
                        current,
                        item_count,
                        &mut total_count,
                        &mut distinct_count,
                        sink,
                    )?;
                    item_count = 0;
                    signature = Some(record.item);
                }
                // Same item as the current signature.
                Some(_) => {}
            }

            item_count += partial;
        }
        source.end_run()?;

        // The final pending item is closed exactly like a mid-run boundary.
        // Skipping this flush is the classic off-by-one distinct-count bug.
        if let Some(current) = &signature {
            self.close_item(
                header,
                current,
                item_count,
                &mut total_count,
                &mut distinct_count,
                sink,
            )?;
        }

        if total_count > 0 {
            self.metrics
                .increment_scoped(header.group_type, counters::OUT_NUM_GROUPS, 1);
            self.metrics.increment_scoped(
                header.group_type,
                counters::OUT_TOTAL_DISTINCTS,
                distinct_count,
            );
            sink.write_group(GroupCount {
                group_type: header.group_type,
                group: header.group.clone(),
                total_count,
                distinct_count,
            })?;
        }
        Ok(())
    }

    /// Close out one item: if it qualifies, emit its row and fold it into the
    /// group accumulators. Filtered items touch neither.
    fn close_item<O: OutputSink>(
        &self,
        header: &RunHeader,
        item: &[u8],
        item_count: u64,
        total_count: &mut u64,
        distinct_count: &mut u64,
        sink: &mut O,
    ) -> Result<(), TallyError> {
        if !self.policy.meets(header.group_type, item_count) {
            return Ok(());
        }

        *total_count += item_count;
        *distinct_count += 1;
        self.metrics
            .increment_scoped(header.group_type, counters::OUT_NUM_ITEMS, 1);
        self.metrics
            .increment_scoped(header.group_type, counters::OUT_TOTAL_ITEMS, item_count);

        sink.write_item(ItemCount {
            group_type: header.group_type,
            group: header.group.clone(),
            item: item.to_vec(),
            count: item_count,
        })
    }
}
