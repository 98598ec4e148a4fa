//! End-to-end local count jobs: map, shuffle, combine, reduce, collect.
//!
//! [`CountJob`] is the builder that wires the engine's pieces together over
//! the in-memory runtime. Inputs are mapper closures that drive a
//! [`CountEmitter`]; the job partitions and sorts what they emit, optionally
//! pre-aggregates, reduces every partition, and returns both output
//! relations (deterministically sorted) plus the metrics snapshot.
//!
//! Partitions are disjoint by construction, so parallel mode hands each one
//! to a rayon worker; nothing inside a single run is ever parallelized. A
//! partition whose reduce pass fails contributes no rows at all — its sink
//! is discarded with the error.

use crate::codec::{ByteCodec, PostcardCodec};
use crate::combine::PreAggregator;
use crate::emit::{CountEmitter, PairBuffer};
use crate::error::TallyError;
use crate::metrics::MetricsCollector;
use crate::output::{GroupCount, ItemCount, JsonlSink, MemorySink, OutputSink};
use crate::policy::MinCountPolicy;
use crate::reduce::GroupedCountReducer;
use crate::shuffle::InMemoryShuffle;
use anyhow::{Context, Result};
use rayon::prelude::*;
use std::path::Path;

/// How the map and reduce phases are executed.
#[derive(Clone, Copy, Debug)]
pub enum ExecMode {
    /// Single-threaded, inputs and partitions processed in order.
    Sequential,
    /// One rayon worker per input / per partition.
    Parallel { threads: Option<usize> },
}

type InputFn<C> =
    Box<dyn Fn(&mut CountEmitter<'_, C, PairBuffer>) -> Result<(), TallyError> + Send + Sync>;

/// Builder for a local counting job.
pub struct CountJob<C: ByteCodec = PostcardCodec> {
    codec: C,
    min_counts: Vec<(i32, u64)>,
    partitions: usize,
    mode: ExecMode,
    combiner_enabled: bool,
    inputs: Vec<InputFn<C>>,
}

impl CountJob<PostcardCodec> {
    /// A job on the default postcard codec.
    #[must_use]
    pub fn new() -> Self {
        Self::with_codec(PostcardCodec)
    }
}

impl Default for CountJob<PostcardCodec> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: ByteCodec> CountJob<C> {
    /// A job on a caller-provided codec.
    pub fn with_codec(codec: C) -> Self {
        Self {
            codec,
            min_counts: Vec::new(),
            partitions: 2 * num_cpus::get().max(2),
            mode: ExecMode::Parallel { threads: None },
            combiner_enabled: true,
            inputs: Vec::new(),
        }
    }

    /// Require at least `threshold` occurrences per item for `group_type`.
    /// Validated when the job runs, before any records are processed.
    #[must_use]
    pub fn min_count(mut self, group_type: i32, threshold: u64) -> Self {
        self.min_counts.push((group_type, threshold));
        self
    }

    /// Number of shuffle partitions.
    #[must_use]
    pub fn partitions(mut self, n: usize) -> Self {
        self.partitions = n.max(1);
        self
    }

    #[must_use]
    pub fn mode(mut self, mode: ExecMode) -> Self {
        self.mode = mode;
        self
    }

    /// Disable the pre-aggregating combiner. The results must not change;
    /// only the volume crossing the (simulated) shuffle does.
    #[must_use]
    pub fn without_combiner(mut self) -> Self {
        self.combiner_enabled = false;
        self
    }

    /// Add one input: a mapper closure that emits every occurrence batch for
    /// the records it owns.
    #[must_use]
    pub fn add_input<F>(mut self, mapper: F) -> Self
    where
        F: Fn(&mut CountEmitter<'_, C, PairBuffer>) -> Result<(), TallyError>
            + Send
            + Sync
            + 'static,
    {
        self.inputs.push(Box::new(mapper));
        self
    }

    /// Execute the job and collect both relations.
    pub fn run(self) -> Result<CountRun> {
        let policy = MinCountPolicy::from_entries(self.min_counts.iter().copied())
            .context("building minimum-count policy")?;
        let metrics = MetricsCollector::new();

        // Map phase: each input fills its own pair buffer.
        let buffers: Vec<PairBuffer> = match self.mode {
            ExecMode::Sequential => {
                let mut out = Vec::with_capacity(self.inputs.len());
                for input in &self.inputs {
                    let mut buf = PairBuffer::new();
                    let mut emitter = CountEmitter::new(&self.codec, &mut buf, &metrics);
                    input(&mut emitter)?;
                    out.push(buf);
                }
                out
            }
            ExecMode::Parallel { threads } => {
                if let Some(t) = threads {
                    // ok() to ignore "already built" on repeated calls in tests
                    rayon::ThreadPoolBuilder::new().num_threads(t).build_global().ok();
                }
                self.inputs
                    .par_iter()
                    .map(|input| {
                        let mut buf = PairBuffer::new();
                        let mut emitter = CountEmitter::new(&self.codec, &mut buf, &metrics);
                        input(&mut emitter)?;
                        Ok(buf)
                    })
                    .collect::<Result<Vec<_>, TallyError>>()?
            }
        };

        let mut shuffle = InMemoryShuffle::new(self.partitions);
        for buf in buffers {
            shuffle.extend(buf);
        }

        // Shuffle phase: partition, sort, pre-aggregate.
        let pre = PreAggregator::new(&self.codec);
        let combiner = self.combiner_enabled.then_some(&pre);
        let streams = shuffle.into_partitions(combiner)?;

        // Reduce phase: one sink per partition, merged afterwards. A failed
        // partition surfaces its error and contributes nothing.
        let reducer = GroupedCountReducer::new(&self.codec, &policy, &metrics);
        let sinks: Vec<MemorySink> = match self.mode {
            ExecMode::Sequential => {
                let mut out = Vec::with_capacity(streams.len());
                for mut stream in streams {
                    let mut sink = MemorySink::new();
                    reducer.reduce_all(&mut stream, &mut sink)?;
                    out.push(sink);
                }
                out
            }
            ExecMode::Parallel { .. } => streams
                .into_par_iter()
                .map(|mut stream| {
                    let mut sink = MemorySink::new();
                    reducer.reduce_all(&mut stream, &mut sink)?;
                    Ok(sink)
                })
                .collect::<Result<Vec<_>, TallyError>>()?,
        };

        let mut items: Vec<ItemCount> = Vec::new();
        let mut groups: Vec<GroupCount> = Vec::new();
        for sink in sinks {
            items.extend(sink.items);
            groups.extend(sink.groups);
        }

        // Deterministic output order regardless of partition assignment.
        items.sort_by(|a, b| {
            (a.group_type, &a.group, &a.item).cmp(&(b.group_type, &b.group, &b.item))
        });
        groups.sort_by(|a, b| (a.group_type, &a.group).cmp(&(b.group_type, &b.group)));

        Ok(CountRun { items, groups, metrics })
    }
}

/// Collected results of one job run.
#[derive(Debug)]
pub struct CountRun {
    /// Per-item relation, sorted by `(group_type, group, item)`.
    pub items: Vec<ItemCount>,
    /// Group-level relation, sorted by `(group_type, group)`.
    pub groups: Vec<GroupCount>,
    /// Counters accumulated during the run.
    pub metrics: MetricsCollector,
}

impl CountRun {
    /// Write both relations as JSON Lines files.
    pub fn write_jsonl(
        &self,
        items_path: impl AsRef<Path>,
        groups_path: impl AsRef<Path>,
    ) -> Result<(), TallyError> {
        let mut sink = JsonlSink::create(items_path, groups_path)?;
        for row in &self.items {
            sink.write_item(row.clone())?;
        }
        for row in &self.groups {
            sink.write_group(row.clone())?;
        }
        sink.flush()
    }
}
