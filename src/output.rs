//! The two output relations and the sinks they are written to.
//!
//! A run of the engine produces:
//!
//! - the **per-item relation**: `(group_type, group, item) -> count`, one row
//!   per qualifying distinct item — also the list of distinct items per
//!   group;
//! - the **group-level relation**: `(group_type, group) ->
//!   (total_count, distinct_count)`, one row per group with at least one
//!   qualifying item.
//!
//! Sinks are opened once per worker before any record is processed and
//! released when the worker finishes, whether it completes or fails.

use crate::codec::ByteCodec;
use crate::error::TallyError;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// One row of the per-item relation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemCount {
    pub group_type: i32,
    pub group: Vec<u8>,
    pub item: Vec<u8>,
    pub count: u64,
}

impl ItemCount {
    /// Decode the group and item back to their typed form.
    pub fn decode<G, I, C>(&self, codec: &C) -> Result<(G, I), TallyError>
    where
        G: DeserializeOwned,
        I: DeserializeOwned,
        C: ByteCodec,
    {
        Ok((codec.decode(&self.group)?, codec.decode(&self.item)?))
    }
}

/// One row of the group-level relation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupCount {
    pub group_type: i32,
    pub group: Vec<u8>,
    pub total_count: u64,
    pub distinct_count: u64,
}

impl GroupCount {
    /// Decode the group back to its typed form.
    pub fn decode_group<G, C>(&self, codec: &C) -> Result<G, TallyError>
    where
        G: DeserializeOwned,
        C: ByteCodec,
    {
        codec.decode(&self.group)
    }
}

/// Destination for the two output relations.
pub trait OutputSink {
    fn write_item(&mut self, row: ItemCount) -> Result<(), TallyError>;
    fn write_group(&mut self, row: GroupCount) -> Result<(), TallyError>;
}

/// In-memory sink; the default for local runs and tests.
#[derive(Debug, Default)]
pub struct MemorySink {
    pub items: Vec<ItemCount>,
    pub groups: Vec<GroupCount>,
}

impl MemorySink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl OutputSink for MemorySink {
    fn write_item(&mut self, row: ItemCount) -> Result<(), TallyError> {
        self.items.push(row);
        Ok(())
    }

    fn write_group(&mut self, row: GroupCount) -> Result<(), TallyError> {
        self.groups.push(row);
        Ok(())
    }
}

/// JSON Lines sink: one file per relation, one row per line.
pub struct JsonlSink {
    items: BufWriter<File>,
    groups: BufWriter<File>,
}

impl JsonlSink {
    /// Create (truncating) both relation files.
    pub fn create(
        items_path: impl AsRef<Path>,
        groups_path: impl AsRef<Path>,
    ) -> Result<Self, TallyError> {
        Ok(Self {
            items: BufWriter::new(File::create(items_path)?),
            groups: BufWriter::new(File::create(groups_path)?),
        })
    }

    /// Flush both writers; also performed on drop.
    pub fn flush(&mut self) -> Result<(), TallyError> {
        self.items.flush()?;
        self.groups.flush()?;
        Ok(())
    }
}

impl OutputSink for JsonlSink {
    fn write_item(&mut self, row: ItemCount) -> Result<(), TallyError> {
        serde_json::to_writer(&mut self.items, &row)?;
        self.items.write_all(b"\n")?;
        Ok(())
    }

    fn write_group(&mut self, row: GroupCount) -> Result<(), TallyError> {
        serde_json::to_writer(&mut self.groups, &row)?;
        self.groups.write_all(b"\n")?;
        Ok(())
    }
}

impl Drop for JsonlSink {
    fn drop(&mut self) {
        let _ = self.flush();
    }
}
