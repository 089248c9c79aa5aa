//! Rotating batch selection for per-block reconciliation.

use crate::domain::{Address, Position};
use serde::{Deserialize, Serialize};

/// How open positions are split into `batch_size` partitions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchPartition {
    /// Leading owner byte modulo the batch size. With a power-of-two shard
    /// count, shard admission never depends on byte 0, so every partition
    /// of a sharded deployment still holds owners.
    #[default]
    Owner,
    /// Position order (by id) modulo the batch size.
    Ordinal,
}

pub fn normalize_cursor(cursor: u32, batch_size: u32) -> u32 {
    cursor % batch_size.max(1)
}

pub fn advance_cursor(cursor: u32, batch_size: u32) -> u32 {
    (normalize_cursor(cursor, batch_size) + 1) % batch_size.max(1)
}

/// Partition of `owner` in `[0, batch_size)`.
pub fn owner_partition(owner: &Address, batch_size: u32) -> u32 {
    u32::from(owner.as_bytes()[0]) % batch_size.max(1)
}

/// Positions belonging to partition `cursor`.
///
/// `positions` must already be in id order for `Ordinal` to be stable
/// across runs.
pub fn select_batch<'a>(
    positions: &'a [Position],
    cursor: u32,
    batch_size: u32,
    partition: BatchPartition,
) -> Vec<&'a Position> {
    let size = batch_size.max(1);
    let cursor = normalize_cursor(cursor, size);
    match partition {
        BatchPartition::Owner => positions
            .iter()
            .filter(|p| owner_partition(&p.owner, size) == cursor)
            .collect(),
        BatchPartition::Ordinal => positions
            .iter()
            .enumerate()
            .filter(|(i, _)| (*i as u64) % u64::from(size) == u64::from(cursor))
            .map(|(_, p)| p)
            .collect(),
    }
}
