//! Turning user records into `(CounterKey, CounterValue)` pairs.
//!
//! Mapper code calls [`CountEmitter::emit`] once per observed item occurrence
//! batch. Each call encodes the group and item exactly once, produces exactly
//! one pair, and bumps the per-group-type input counters. Callers that need
//! to count an item `n` times use [`CountEmitter::emit_times`] — never a loop
//! of single emits, which would grow the shuffled volume linearly with the
//! repeat count.

use crate::codec::ByteCodec;
use crate::error::TallyError;
use crate::key::{CounterKey, CounterValue};
use crate::metrics::{MetricsCollector, counters};
use serde::Serialize;

/// Destination for emitted pairs: the shuffle, or any buffer standing in for
/// it.
pub trait PairSink {
    fn push(&mut self, key: CounterKey, value: CounterValue) -> Result<(), TallyError>;
}

/// Plain buffer sink, used by mappers that run before the shuffle is fed.
pub type PairBuffer = Vec<(CounterKey, CounterValue)>;

impl PairSink for PairBuffer {
    fn push(&mut self, key: CounterKey, value: CounterValue) -> Result<(), TallyError> {
        Vec::push(self, (key, value));
        Ok(())
    }
}

/// Per-mapper emit handle. Borrows the codec, a pair sink, and the shared
/// metrics collector for the duration of one map pass.
pub struct CountEmitter<'a, C: ByteCodec, S: PairSink> {
    codec: &'a C,
    sink: &'a mut S,
    metrics: &'a MetricsCollector,
}

impl<'a, C: ByteCodec, S: PairSink> CountEmitter<'a, C, S> {
    pub fn new(codec: &'a C, sink: &'a mut S, metrics: &'a MetricsCollector) -> Self {
        Self { codec, sink, metrics }
    }

    /// Count one occurrence of `item` within `group`.
    pub fn emit<G: Serialize, I: Serialize>(
        &mut self,
        group_type: i32,
        group: &G,
        item: &I,
    ) -> Result<(), TallyError> {
        self.emit_times(group_type, group, item, 1)
    }

    /// Count `times` occurrences of `item` within `group` with a single
    /// emitted pair. `times` must be positive.
    pub fn emit_times<G: Serialize, I: Serialize>(
        &mut self,
        group_type: i32,
        group: &G,
        item: &I,
        times: u64,
    ) -> Result<(), TallyError> {
        if times == 0 {
            return Err(TallyError::ZeroTimes { group_type });
        }
        let group = self.codec.encode(group)?;
        let item = self.codec.encode(item)?;
        let count = self.codec.encode(&times)?;

        self.metrics.increment_scoped(group_type, counters::INPUT_PAIRS, 1);
        self.metrics
            .increment_scoped(group_type, counters::INPUT_PAIRS_TOTAL_COUNT, times);

        let key = CounterKey::new(group_type, group, item.clone());
        self.sink.push(key, CounterValue::new(item, count))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::PostcardCodec;

    #[test]
    fn emit_produces_one_pair_with_matching_item_bytes() -> anyhow::Result<()> {
        let codec = PostcardCodec;
        let metrics = MetricsCollector::new();
        let mut buf = PairBuffer::new();

        let mut emitter = CountEmitter::new(&codec, &mut buf, &metrics);
        emitter.emit(3, &"group-a", &"item-x")?;

        assert_eq!(buf.len(), 1);
        let (key, value) = &buf[0];
        assert_eq!(key.group_type, 3);
        assert_eq!(key.item, value.item);
        let count: u64 = codec.decode(&value.count)?;
        assert_eq!(count, 1);
        Ok(())
    }

    #[test]
    fn emit_times_stays_one_pair_and_counts_stats() -> anyhow::Result<()> {
        let codec = PostcardCodec;
        let metrics = MetricsCollector::new();
        let mut buf = PairBuffer::new();

        let mut emitter = CountEmitter::new(&codec, &mut buf, &metrics);
        emitter.emit_times(7, &"g", &"i", 500)?;
        emitter.emit(7, &"g", &"j")?;

        assert_eq!(buf.len(), 2);
        assert_eq!(metrics.scoped_counter(7, counters::INPUT_PAIRS), 2);
        assert_eq!(metrics.scoped_counter(7, counters::INPUT_PAIRS_TOTAL_COUNT), 501);
        Ok(())
    }

    #[test]
    fn zero_times_is_rejected() {
        let codec = PostcardCodec;
        let metrics = MetricsCollector::new();
        let mut buf = PairBuffer::new();

        let mut emitter = CountEmitter::new(&codec, &mut buf, &metrics);
        let err = emitter.emit_times(1, &"g", &"i", 0).unwrap_err();
        assert!(matches!(err, TallyError::ZeroTimes { group_type: 1 }));
        assert!(buf.is_empty());
    }
}
