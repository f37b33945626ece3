//! Core traits for event log operations.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Offset of an event within a single partition.
pub type Offset = u64;

/// Where an event lives in the log.
///
/// Offsets are partition-local: two events in different partitions may share
/// an offset and carry no ordering relative to each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    pub partition: u32,
    pub offset: Offset,
}

impl Position {
    #[must_use]
    pub fn new(partition: u32, offset: Offset) -> Self {
        Self { partition, offset }
    }
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}", self.partition, self.offset)
    }
}

/// Position to seek to when (re)starting a consumer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeekPosition {
    /// Start from the beginning of every partition.
    Beginning,
    /// Start from the end (new events only).
    End,
    /// Resume from the offsets last committed by the group.
    #[default]
    Committed,
}

/// Events that know which partition they belong to.
pub trait Partitionable {
    /// Key used to pick a partition. Events without a key go to partition 0.
    fn partition_key(&self) -> Option<&str>;
}

/// Pick the partition for a key.
///
/// Uses 32-bit FNV-1a so the mapping is stable across processes and builds.
#[must_use]
pub fn partition_for_key(key: Option<&str>, partition_count: u32) -> u32 {
    const FNV_OFFSET: u32 = 0x811c_9dc5;
    const FNV_PRIME: u32 = 0x0100_0193;

    let Some(key) = key else {
        return 0;
    };
    if partition_count <= 1 {
        return 0;
    }
    let hash = key.bytes().fold(FNV_OFFSET, |hash, byte| {
        (hash ^ u32::from(byte)).wrapping_mul(FNV_PRIME)
    });
    hash % partition_count
}

/// A batch of events returned from polling.
///
/// Events of one partition appear in offset order; partitions are not
/// interleaved.
#[derive(Debug)]
pub struct EventBatch<E> {
    pub events: Vec<(Position, E)>,
}

impl<E> EventBatch<E> {
    #[must_use]
    pub fn new(events: Vec<(Position, E)>) -> Self {
        Self { events }
    }

    #[must_use]
    pub fn empty() -> Self {
        Self { events: Vec::new() }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

impl<E> IntoIterator for EventBatch<E> {
    type Item = (Position, E);
    type IntoIter = std::vec::IntoIter<(Position, E)>;

    fn into_iter(self) -> Self::IntoIter {
        self.events.into_iter()
    }
}

/// Trait for appending events and creating consumers.
#[async_trait]
pub trait EventLog<E>: Send + Sync {
    /// Append an event and return where it was stored.
    async fn append(&self, event: E) -> crate::Result<Position>;

    /// Append several events, returning one position per event in input order.
    async fn append_batch(&self, events: Vec<E>) -> crate::Result<Vec<Position>>;

    /// Join a consumer group. The consumer starts at the group's committed offsets.
    async fn consumer(&self, group: &str) -> crate::Result<Box<dyn EventConsumer<E>>>;

    /// Number of partitions in the underlying topic.
    fn partition_count(&self) -> u32;
}

/// Trait for polling events with offset tracking.
///
/// Offsets follow the "next offset to read" convention: marking the event at
/// offset 4 records 5 for its partition.
#[async_trait]
pub trait EventConsumer<E>: Send {
    /// Poll for new events, waiting up to `timeout` when none are available.
    async fn poll(&mut self, max_count: usize, timeout: Duration) -> crate::Result<EventBatch<E>>;

    /// Record that the event at `position` has been handled.
    fn mark(&mut self, position: Position);

    /// Persist marked offsets for the group.
    async fn commit(&mut self) -> crate::Result<()>;

    /// Move the read cursor of every partition.
    async fn seek(&mut self, position: SeekPosition) -> crate::Result<()>;

    /// Whether the group had committed offsets when this consumer joined.
    fn has_committed(&self) -> bool;

    /// Consumer group name.
    fn group(&self) -> &str;
}
