//! Pre-aggregating combiner: local partial reduction before the shuffle.
//!
//! Given a run of values that all share one identical full key, the
//! [`PreAggregator`] collapses them into a single value whose count is the
//! sum of the inputs. It is associative and commutative, so the runtime may
//! apply it zero, one, or many times over arbitrary sub-partitions of the
//! data without changing the final reduction result — that is the combiner
//! contract, and the property the idempotence test below pins down.
//!
//! A count that fails to decode is fatal: it means the serialization
//! contract was violated, and summing around it would silently corrupt the
//! aggregate.

use crate::codec::ByteCodec;
use crate::error::TallyError;
use crate::key::CounterValue;

/// Running partial sum for one full key.
#[derive(Debug, Default)]
pub struct PartialSum {
    item: Option<Vec<u8>>,
    sum: u64,
}

/// Combiner over same-key [`CounterValue`] runs.
pub struct PreAggregator<'a, C: ByteCodec> {
    codec: &'a C,
}

impl<'a, C: ByteCodec> PreAggregator<'a, C> {
    pub fn new(codec: &'a C) -> Self {
        Self { codec }
    }

    /// Fresh accumulator.
    pub fn create(&self) -> PartialSum {
        PartialSum::default()
    }

    /// Fold one value into the accumulator.
    pub fn add_input(&self, acc: &mut PartialSum, value: &CounterValue) -> Result<(), TallyError> {
        let n: u64 = self.codec.decode(&value.count)?;
        if acc.item.is_none() {
            acc.item = Some(value.item.clone());
        }
        acc.sum += n;
        Ok(())
    }

    /// Merge two accumulators built over sub-batches of the same key.
    pub fn merge(&self, acc: &mut PartialSum, other: PartialSum) {
        if acc.item.is_none() {
            acc.item = other.item;
        }
        acc.sum += other.sum;
    }

    /// Produce the single summed value; `None` for an empty accumulator.
    pub fn finish(&self, acc: PartialSum) -> Result<Option<CounterValue>, TallyError> {
        match acc.item {
            Some(item) => Ok(Some(CounterValue::new(item, self.codec.encode(&acc.sum)?))),
            None => Ok(None),
        }
    }

    /// Collapse a same-key run into one value in a single call.
    pub fn combine<'v>(
        &self,
        values: impl IntoIterator<Item = &'v CounterValue>,
    ) -> Result<Option<CounterValue>, TallyError> {
        let mut acc = self.create();
        for v in values {
            self.add_input(&mut acc, v)?;
        }
        self.finish(acc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::PostcardCodec;

    fn value(codec: &PostcardCodec, item: &[u8], n: u64) -> CounterValue {
        CounterValue::new(item.to_vec(), codec.encode(&n).unwrap())
    }

    #[test]
    fn sums_partial_counts_and_keeps_item() -> anyhow::Result<()> {
        let codec = PostcardCodec;
        let pre = PreAggregator::new(&codec);
        let values = vec![
            value(&codec, b"it", 1),
            value(&codec, b"it", 4),
            value(&codec, b"it", 2),
        ];

        let out = pre.combine(&values)?.expect("non-empty run");
        assert_eq!(out.item, b"it".to_vec());
        let sum: u64 = codec.decode(&out.count)?;
        assert_eq!(sum, 7);
        Ok(())
    }

    #[test]
    fn idempotent_under_arbitrary_re_combination() -> anyhow::Result<()> {
        let codec = PostcardCodec;
        let pre = PreAggregator::new(&codec);
        let values: Vec<CounterValue> =
            (1..=10u64).map(|n| value(&codec, b"it", n)).collect();

        let whole = pre.combine(&values)?.unwrap();

        // Split into uneven sub-batches, combine each, combine the results.
        for split in [1usize, 3, 4, 9] {
            let (a, b) = values.split_at(split);
            let first = pre.combine(a)?.unwrap();
            let second = pre.combine(b)?.unwrap();
            let recombined = pre.combine([&first, &second])?.unwrap();
            assert_eq!(recombined, whole);
        }
        Ok(())
    }

    #[test]
    fn empty_run_produces_nothing() -> anyhow::Result<()> {
        let codec = PostcardCodec;
        let pre = PreAggregator::new(&codec);
        assert!(pre.combine(std::iter::empty::<&CounterValue>())?.is_none());
        Ok(())
    }

    #[test]
    fn corrupt_count_is_fatal() {
        let codec = PostcardCodec;
        let pre = PreAggregator::new(&codec);
        let bad = CounterValue::new(b"it".to_vec(), vec![0xFF]);
        let err = pre.combine([&bad]).unwrap_err();
        assert!(matches!(err, TallyError::ContractViolation { .. }));
    }
}
