//! The seam between the reducer and the runtime that owns the sorted stream.
//!
//! The external runtime (or its local stand-in) delivers one run per
//! `(group_type, group)`, with records inside each run already in item order.
//! Modeling that delivery as a trait keeps the reduction algorithm testable
//! against an in-memory fake instead of a cluster runtime.

use crate::error::TallyError;
use crate::key::CounterValue;
use std::collections::VecDeque;

/// Header of one run: the `(group_type, group)` shared by all its records.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RunHeader {
    pub group_type: i32,
    pub group: Vec<u8>,
}

impl RunHeader {
    pub fn new(group_type: i32, group: Vec<u8>) -> Self {
        Self { group_type, group }
    }
}

/// A partition's worth of sorted, grouped records.
///
/// Usage is strictly `begin_run` / repeated `next_record` until `None` /
/// `end_run`, then the next `begin_run`. Calling `begin_run` with records of
/// the current run unconsumed skips the remainder of that run.
pub trait GroupedRecordSource {
    /// Advance to the next run; `None` once the partition is exhausted.
    fn begin_run(&mut self) -> Result<Option<RunHeader>, TallyError>;

    /// Next record within the current run, in item order; `None` at run end.
    fn next_record(&mut self) -> Result<Option<CounterValue>, TallyError>;

    /// Release per-run resources after the run's records are consumed.
    fn end_run(&mut self) -> Result<(), TallyError>;
}

/// In-memory source built directly from pre-grouped runs.
///
/// This is the test fake: it performs no sorting or validation of its own,
/// which is exactly what makes it useful for demonstrating that the reducer
/// depends on the upstream sort contract.
#[derive(Debug, Default)]
pub struct VecRunSource {
    runs: VecDeque<(RunHeader, VecDeque<CounterValue>)>,
    current: Option<VecDeque<CounterValue>>,
}

impl VecRunSource {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one run in delivery order.
    pub fn push_run(
        &mut self,
        header: RunHeader,
        records: impl IntoIterator<Item = CounterValue>,
    ) {
        self.runs.push_back((header, records.into_iter().collect()));
    }
}

impl GroupedRecordSource for VecRunSource {
    fn begin_run(&mut self) -> Result<Option<RunHeader>, TallyError> {
        match self.runs.pop_front() {
            Some((header, records)) => {
                self.current = Some(records);
                Ok(Some(header))
            }
            None => {
                self.current = None;
                Ok(None)
            }
        }
    }

    fn next_record(&mut self) -> Result<Option<CounterValue>, TallyError> {
        Ok(self.current.as_mut().and_then(VecDeque::pop_front))
    }

    fn end_run(&mut self) -> Result<(), TallyError> {
        self.current = None;
        Ok(())
    }
}
