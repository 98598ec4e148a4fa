//! Local stand-in for the external distributed sort/shuffle runtime.
//!
//! The real system hands the engine pre-partitioned, pre-sorted streams.
//! [`InMemoryShuffle`] reproduces that contract in one process: it buffers
//! emitted pairs, assigns each to a partition by `(group_type, group)`,
//! sorts every partition by full key order, optionally collapses same-key
//! runs through the [`PreAggregator`], and serves each partition as a
//! [`GroupedRecordSource`].
//!
//! It is deliberately nothing more than the contract: no spilling, no
//! retries, no cross-process transfer.

use crate::codec::ByteCodec;
use crate::combine::PreAggregator;
use crate::emit::PairSink;
use crate::error::TallyError;
use crate::key::{CounterKey, CounterValue};
use crate::source::{GroupedRecordSource, RunHeader};

/// Buffer of emitted pairs, partitioned and sorted on demand.
#[derive(Debug)]
pub struct InMemoryShuffle {
    partitions: usize,
    pairs: Vec<(CounterKey, CounterValue)>,
}

impl InMemoryShuffle {
    /// A shuffle that will split its contents into `partitions` streams.
    #[must_use]
    pub fn new(partitions: usize) -> Self {
        Self { partitions: partitions.max(1), pairs: Vec::new() }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Bulk-load pairs produced by a mapper pass.
    pub fn extend(&mut self, pairs: impl IntoIterator<Item = (CounterKey, CounterValue)>) {
        self.pairs.extend(pairs);
    }

    /// Partition, sort, and optionally pre-aggregate the buffered pairs.
    ///
    /// Every partition comes out sorted by the full `(group_type, group,
    /// item)` order, so runs are contiguous and items are contiguous within
    /// runs. With a combiner, each maximal same-full-key run is collapsed to
    /// one summed record first — the reducer cannot tell the difference,
    /// which is the point.
    pub fn into_partitions<C: ByteCodec>(
        self,
        combiner: Option<&PreAggregator<'_, C>>,
    ) -> Result<Vec<PartitionStream>, TallyError> {
        let mut buckets: Vec<Vec<(CounterKey, CounterValue)>> =
            (0..self.partitions).map(|_| Vec::new()).collect();
        for (key, value) in self.pairs {
            let p = key.partition(self.partitions);
            buckets[p].push((key, value));
        }

        let mut streams = Vec::with_capacity(buckets.len());
        for mut bucket in buckets {
            bucket.sort_by(|(a, _), (b, _)| a.cmp(b));
            let records = match combiner {
                Some(pre) => collapse_runs(bucket, pre)?,
                None => bucket,
            };
            streams.push(PartitionStream::new(records));
        }
        Ok(streams)
    }
}

impl PairSink for InMemoryShuffle {
    fn push(&mut self, key: CounterKey, value: CounterValue) -> Result<(), TallyError> {
        self.pairs.push((key, value));
        Ok(())
    }
}

/// Collapse each maximal run of identical full keys into one combined record.
fn collapse_runs<C: ByteCodec>(
    sorted: Vec<(CounterKey, CounterValue)>,
    pre: &PreAggregator<'_, C>,
) -> Result<Vec<(CounterKey, CounterValue)>, TallyError> {
    let mut out: Vec<(CounterKey, CounterValue)> = Vec::new();
    let mut iter = sorted.into_iter();

    let Some((mut run_key, first)) = iter.next() else {
        return Ok(out);
    };
    let mut acc = pre.create();
    pre.add_input(&mut acc, &first)?;

    for (key, value) in iter {
        if key == run_key {
            pre.add_input(&mut acc, &value)?;
        } else {
            let done = std::mem::replace(&mut acc, pre.create());
            if let Some(combined) = pre.finish(done)? {
                out.push((run_key, combined));
            }
            run_key = key;
            pre.add_input(&mut acc, &value)?;
        }
    }
    if let Some(combined) = pre.finish(acc)? {
        out.push((run_key, combined));
    }
    Ok(out)
}

/// One partition's sorted records, served run by run.
#[derive(Debug)]
pub struct PartitionStream {
    records: Vec<(CounterKey, CounterValue)>,
    pos: usize,
    current: Option<RunHeader>,
}

impl PartitionStream {
    fn new(records: Vec<(CounterKey, CounterValue)>) -> Self {
        Self { records, pos: 0, current: None }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn key_in_current_run(&self) -> bool {
        match (&self.current, self.records.get(self.pos)) {
            (Some(h), Some((key, _))) => {
                key.group_type == h.group_type && key.group == h.group
            }
            _ => false,
        }
    }
}

impl GroupedRecordSource for PartitionStream {
    fn begin_run(&mut self) -> Result<Option<RunHeader>, TallyError> {
        // Skip any unconsumed remainder of the previous run.
        while self.key_in_current_run() {
            self.pos += 1;
        }
        self.current = None;

        match self.records.get(self.pos) {
            Some((key, _)) => {
                let header = RunHeader::new(key.group_type, key.group.clone());
                self.current = Some(header.clone());
                Ok(Some(header))
            }
            None => Ok(None),
        }
    }

    fn next_record(&mut self) -> Result<Option<CounterValue>, TallyError> {
        if self.key_in_current_run() {
            let value = self.records[self.pos].1.clone();
            self.pos += 1;
            Ok(Some(value))
        } else {
            Ok(None)
        }
    }

    fn end_run(&mut self) -> Result<(), TallyError> {
        self.current = None;
        Ok(())
    }
}
