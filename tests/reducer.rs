//! Tests for the boundary-detection reduction algorithm, driven through the
//! in-memory run source so the reducer sees exactly the stream contract the
//! external runtime promises.

use anyhow::Result;
use grouptally::metrics::counters;
use grouptally::{
    ByteCodec, CounterValue, GroupedCountReducer, MemorySink, MetricsCollector, MinCountPolicy,
    PostcardCodec, RunHeader, VecRunSource,
};

fn record(codec: &PostcardCodec, item: &[u8], count: u64) -> CounterValue {
    CounterValue::new(item.to_vec(), codec.encode(&count).unwrap())
}

fn reduce(
    policy: &MinCountPolicy,
    runs: Vec<(RunHeader, Vec<CounterValue>)>,
) -> Result<(MemorySink, MetricsCollector)> {
    let codec = PostcardCodec;
    let metrics = MetricsCollector::new();
    let mut source = VecRunSource::new();
    for (header, records) in runs {
        source.push_run(header, records);
    }

    let reducer = GroupedCountReducer::new(&codec, policy, &metrics);
    let mut sink = MemorySink::new();
    reducer.reduce_all(&mut source, &mut sink)?;
    Ok((sink, metrics))
}

#[test]
fn distinct_count_correctness() -> Result<()> {
    let codec = PostcardCodec;
    let run = vec![
        record(&codec, b"itemA", 1),
        record(&codec, b"itemA", 2),
        record(&codec, b"itemB", 1),
        record(&codec, b"itemC", 5),
        record(&codec, b"itemC", 1),
    ];
    let (sink, _) = reduce(
        &MinCountPolicy::new(),
        vec![(RunHeader::new(1, b"G".to_vec()), run)],
    )?;

    let rows: Vec<(&[u8], u64)> = sink
        .items
        .iter()
        .map(|r| (r.item.as_slice(), r.count))
        .collect();
    assert_eq!(
        rows,
        vec![(b"itemA".as_slice(), 3), (b"itemB".as_slice(), 1), (b"itemC".as_slice(), 6)]
    );

    assert_eq!(sink.groups.len(), 1);
    assert_eq!(sink.groups[0].total_count, 10);
    assert_eq!(sink.groups[0].distinct_count, 3);
    Ok(())
}

#[test]
fn threshold_filters_items_out_of_both_relations() -> Result<()> {
    let codec = PostcardCodec;
    let run = vec![
        record(&codec, b"itemA", 1),
        record(&codec, b"itemA", 2),
        record(&codec, b"itemB", 1),
        record(&codec, b"itemC", 5),
        record(&codec, b"itemC", 1),
    ];
    let policy = MinCountPolicy::from_entries([(1, 4)])?;
    let (sink, _) = reduce(&policy, vec![(RunHeader::new(1, b"G".to_vec()), run)])?;

    // Only itemC (6 >= 4) survives; filtered items are absent from the
    // per-item rows AND excluded from the group totals.
    assert_eq!(sink.items.len(), 1);
    assert_eq!(sink.items[0].item, b"itemC".to_vec());
    assert_eq!(sink.items[0].count, 6);

    assert_eq!(sink.groups.len(), 1);
    assert_eq!(sink.groups[0].total_count, 6);
    assert_eq!(sink.groups[0].distinct_count, 1);
    Ok(())
}

#[test]
fn exact_threshold_is_counted() -> Result<()> {
    let codec = PostcardCodec;
    let run = vec![record(&codec, b"item", 2), record(&codec, b"item", 2)];
    let policy = MinCountPolicy::from_entries([(5, 4)])?;
    let (sink, _) = reduce(&policy, vec![(RunHeader::new(5, b"G".to_vec()), run)])?;

    assert_eq!(sink.items.len(), 1);
    assert_eq!(sink.items[0].count, 4);
    assert_eq!(sink.groups[0].distinct_count, 1);
    Ok(())
}

#[test]
fn end_of_run_flush_closes_the_final_item() -> Result<()> {
    // A run of one item with two partials exercises only the flush path:
    // no mid-run boundary ever fires.
    let codec = PostcardCodec;
    let run = vec![record(&codec, b"itemX", 3), record(&codec, b"itemX", 4)];
    let (sink, _) = reduce(
        &MinCountPolicy::new(),
        vec![(RunHeader::new(1, b"G".to_vec()), run)],
    )?;

    assert_eq!(sink.items.len(), 1);
    assert_eq!(sink.items[0].item, b"itemX".to_vec());
    assert_eq!(sink.items[0].count, 7);
    assert_eq!(sink.groups[0].total_count, 7);
    assert_eq!(sink.groups[0].distinct_count, 1);
    Ok(())
}

#[test]
fn fully_filtered_group_emits_nothing() -> Result<()> {
    let codec = PostcardCodec;
    let run = vec![
        record(&codec, b"a", 1),
        record(&codec, b"b", 2),
        record(&codec, b"c", 3),
    ];
    let policy = MinCountPolicy::from_entries([(1, 100)])?;
    let (sink, metrics) = reduce(&policy, vec![(RunHeader::new(1, b"G".to_vec()), run)])?;

    // Not even a zero-count group row.
    assert!(sink.items.is_empty());
    assert!(sink.groups.is_empty());
    assert_eq!(metrics.scoped_counter(1, counters::OUT_NUM_GROUPS), 0);
    Ok(())
}

#[test]
fn empty_run_emits_nothing() -> Result<()> {
    let (sink, _) = reduce(
        &MinCountPolicy::new(),
        vec![(RunHeader::new(1, b"G".to_vec()), vec![])],
    )?;
    assert!(sink.items.is_empty());
    assert!(sink.groups.is_empty());
    Ok(())
}

#[test]
fn out_of_order_items_become_separate_signatures() -> Result<()> {
    // The reducer trusts the upstream sort: if itemB reappears after itemA,
    // it is treated as a new signature, not merged with the earlier itemB.
    let codec = PostcardCodec;
    let run = vec![
        record(&codec, b"itemB", 1),
        record(&codec, b"itemA", 1),
        record(&codec, b"itemB", 1),
    ];
    let (sink, _) = reduce(
        &MinCountPolicy::new(),
        vec![(RunHeader::new(1, b"G".to_vec()), run)],
    )?;

    let rows: Vec<(&[u8], u64)> = sink
        .items
        .iter()
        .map(|r| (r.item.as_slice(), r.count))
        .collect();
    assert_eq!(
        rows,
        vec![(b"itemB".as_slice(), 1), (b"itemA".as_slice(), 1), (b"itemB".as_slice(), 1)]
    );
    assert_eq!(sink.groups[0].distinct_count, 3);
    Ok(())
}

#[test]
fn runs_are_independent() -> Result<()> {
    let codec = PostcardCodec;
    let (sink, _) = reduce(
        &MinCountPolicy::new(),
        vec![
            (
                RunHeader::new(1, b"G1".to_vec()),
                vec![record(&codec, b"x", 2), record(&codec, b"y", 1)],
            ),
            (RunHeader::new(1, b"G2".to_vec()), vec![record(&codec, b"x", 5)]),
            (RunHeader::new(2, b"G1".to_vec()), vec![record(&codec, b"z", 1)]),
        ],
    )?;

    assert_eq!(sink.items.len(), 4);
    assert_eq!(sink.groups.len(), 3);
    let totals: Vec<(i32, u64, u64)> = sink
        .groups
        .iter()
        .map(|g| (g.group_type, g.total_count, g.distinct_count))
        .collect();
    assert_eq!(totals, vec![(1, 3, 2), (1, 5, 1), (2, 1, 1)]);
    Ok(())
}

#[test]
fn reducer_updates_output_counters() -> Result<()> {
    let codec = PostcardCodec;
    let run = vec![
        record(&codec, b"a", 2),
        record(&codec, b"b", 3),
    ];
    let (_, metrics) = reduce(
        &MinCountPolicy::new(),
        vec![(RunHeader::new(9, b"G".to_vec()), run)],
    )?;

    assert_eq!(metrics.scoped_counter(9, counters::OUT_NUM_ITEMS), 2);
    assert_eq!(metrics.scoped_counter(9, counters::OUT_TOTAL_ITEMS), 5);
    assert_eq!(metrics.scoped_counter(9, counters::OUT_NUM_GROUPS), 1);
    assert_eq!(metrics.scoped_counter(9, counters::OUT_TOTAL_DISTINCTS), 2);
    Ok(())
}

#[test]
fn corrupt_partial_count_aborts_the_partition() {
    let metrics = MetricsCollector::new();
    let codec = PostcardCodec;
    let policy = MinCountPolicy::new();
    let mut source = VecRunSource::new();
    source.push_run(
        RunHeader::new(1, b"G".to_vec()),
        vec![CounterValue::new(b"item".to_vec(), vec![0xFF])],
    );

    let reducer = GroupedCountReducer::new(&codec, &policy, &metrics);
    let mut sink = MemorySink::new();
    let err = reducer.reduce_all(&mut source, &mut sink).unwrap_err();
    assert!(matches!(err, grouptally::TallyError::ContractViolation { .. }));
    assert!(sink.items.is_empty());
}
