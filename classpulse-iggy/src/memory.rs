//! Partitioned in-memory EventLog.
//!
//! Mirrors the Iggy topic layout without a server:
//! - Events are routed to partitions by partition key hash
//! - Each partition has its own offset sequence
//! - Consumer groups share committed offsets, so a consumer that rejoins
//!   resumes where the group last committed
//!
//! Used by tests and by single-process deployments that do not need durability.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{Notify, RwLock};
use tracing::debug;

use crate::error::{Error, Result};
use crate::traits::{
    EventBatch, EventConsumer, EventLog, Offset, Partitionable, Position, SeekPosition,
    partition_for_key,
};

/// Default number of partitions (matches the Iggy topic default).
const DEFAULT_PARTITION_COUNT: u32 = 8;

/// Shared state between the log and its consumers.
struct SharedState<E> {
    partitions: RwLock<Vec<Vec<E>>>,
    committed: RwLock<HashMap<String, Vec<Offset>>>,
    /// Bumped per group on rebalance; consumers holding an older value must rejoin.
    generations: RwLock<HashMap<String, u64>>,
    /// Number of upcoming appends that fail with a connection error.
    failing_appends: AtomicU32,
    notify: Notify,
}

/// Partitioned in-memory implementation of [`EventLog`].
pub struct InMemoryEventLog<E> {
    shared: Arc<SharedState<E>>,
    partition_count: u32,
}

impl<E> InMemoryEventLog<E>
where
    E: Clone + Send + Sync + Partitionable + 'static,
{
    /// Create a log with the default partition count.
    #[must_use]
    pub fn new() -> Self {
        Self::with_partitions(DEFAULT_PARTITION_COUNT)
    }

    /// Create a log with a specific partition count (at least one).
    #[must_use]
    pub fn with_partitions(partition_count: u32) -> Self {
        let partition_count = partition_count.max(1);
        Self {
            shared: Arc::new(SharedState {
                partitions: RwLock::new((0..partition_count).map(|_| Vec::new()).collect()),
                committed: RwLock::new(HashMap::new()),
                generations: RwLock::new(HashMap::new()),
                failing_appends: AtomicU32::new(0),
                notify: Notify::new(),
            }),
            partition_count,
        }
    }

    /// Total number of events across all partitions.
    pub async fn len(&self) -> usize {
        self.shared.partitions.read().await.iter().map(Vec::len).sum()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Events stored in one partition, in offset order.
    pub async fn partition_events(&self, partition: u32) -> Vec<E> {
        self.shared
            .partitions
            .read()
            .await
            .get(partition as usize)
            .cloned()
            .unwrap_or_default()
    }

    /// Offsets committed by a group, one per partition.
    pub async fn committed_offsets(&self, group: &str) -> Vec<Offset> {
        self.shared
            .committed
            .read()
            .await
            .get(group)
            .cloned()
            .unwrap_or_else(|| vec![0; self.partition_count as usize])
    }

    /// Revoke the partition assignment of every consumer in `group`.
    ///
    /// Their next poll fails with [`Error::Rebalanced`]; uncommitted events are
    /// redelivered to whichever consumer joins next.
    pub async fn trigger_rebalance(&self, group: &str) {
        *self
            .shared
            .generations
            .write()
            .await
            .entry(group.to_string())
            .or_insert(0) += 1;
        debug!(group, "Triggered rebalance");
        self.shared.notify.notify_waiters();
    }

    /// Make the next `count` appends fail with a connection error.
    pub fn fail_next_appends(&self, count: u32) {
        self.shared.failing_appends.store(count, Ordering::SeqCst);
    }

    fn take_injected_failure(&self) -> bool {
        self.shared
            .failing_appends
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

impl<E> Default for InMemoryEventLog<E>
where
    E: Clone + Send + Sync + Partitionable + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<E> EventLog<E> for InMemoryEventLog<E>
where
    E: Clone + Send + Sync + Partitionable + 'static,
{
    async fn append(&self, event: E) -> Result<Position> {
        if self.take_injected_failure() {
            return Err(Error::Connection("injected append failure".to_string()));
        }

        let partition = partition_for_key(event.partition_key(), self.partition_count);
        let offset = {
            let mut partitions = self.shared.partitions.write().await;
            let events = &mut partitions[partition as usize];
            events.push(event);
            (events.len() - 1) as Offset
        };

        self.shared.notify.notify_waiters();
        Ok(Position::new(partition, offset))
    }

    async fn append_batch(&self, events: Vec<E>) -> Result<Vec<Position>> {
        if self.take_injected_failure() {
            return Err(Error::Connection("injected append failure".to_string()));
        }

        let mut positions = Vec::with_capacity(events.len());
        {
            let mut partitions = self.shared.partitions.write().await;
            for event in events {
                let partition = partition_for_key(event.partition_key(), self.partition_count);
                let stored = &mut partitions[partition as usize];
                stored.push(event);
                positions.push(Position::new(partition, (stored.len() - 1) as Offset));
            }
        }

        self.shared.notify.notify_waiters();
        Ok(positions)
    }

    async fn consumer(&self, group: &str) -> Result<Box<dyn EventConsumer<E>>> {
        let has_committed = self.shared.committed.read().await.contains_key(group);
        let offsets = self.committed_offsets(group).await;
        let generation = self
            .shared
            .generations
            .read()
            .await
            .get(group)
            .copied()
            .unwrap_or(0);

        debug!(group, ?offsets, "Consumer joined");
        Ok(Box::new(InMemoryConsumer {
            group: group.to_string(),
            shared: Arc::clone(&self.shared),
            current: offsets.clone(),
            marked: offsets,
            generation,
            has_committed,
        }))
    }

    fn partition_count(&self) -> u32 {
        self.partition_count
    }
}

/// Consumer over an [`InMemoryEventLog`].
struct InMemoryConsumer<E> {
    group: String,
    shared: Arc<SharedState<E>>,
    current: Vec<Offset>,
    marked: Vec<Offset>,
    generation: u64,
    has_committed: bool,
}

impl<E> InMemoryConsumer<E>
where
    E: Clone + Send + Sync + 'static,
{
    async fn ensure_assignment(&self) -> Result<()> {
        let generation = self
            .shared
            .generations
            .read()
            .await
            .get(&self.group)
            .copied()
            .unwrap_or(0);
        if generation != self.generation {
            return Err(Error::Rebalanced(self.group.clone()));
        }
        Ok(())
    }

    async fn read_available(&mut self, max_count: usize) -> EventBatch<E> {
        let partitions = self.shared.partitions.read().await;
        let per_partition = (max_count / partitions.len().max(1)).max(1);
        let mut events = Vec::new();

        for (idx, stored) in partitions.iter().enumerate() {
            if events.len() >= max_count {
                break;
            }
            let start = self.current[idx] as usize;
            let end = stored.len().min(start + per_partition);
            for (offset, event) in stored.iter().enumerate().take(end).skip(start) {
                events.push((Position::new(idx as u32, offset as Offset), event.clone()));
            }
            if end > start {
                self.current[idx] = end as Offset;
            }
        }

        EventBatch::new(events)
    }
}

#[async_trait]
impl<E> EventConsumer<E> for InMemoryConsumer<E>
where
    E: Clone + Send + Sync + 'static,
{
    async fn poll(&mut self, max_count: usize, timeout: Duration) -> Result<EventBatch<E>> {
        let deadline = tokio::time::Instant::now() + timeout;

        loop {
            // Register before checking so an append between the check and the
            // wait is not missed.
            let shared = Arc::clone(&self.shared);
            let notified = shared.notify.notified();

            self.ensure_assignment().await?;
            let batch = self.read_available(max_count).await;
            if !batch.is_empty() {
                return Ok(batch);
            }

            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                return Ok(EventBatch::empty());
            }
        }
    }

    fn mark(&mut self, position: Position) {
        if let Some(next) = self.marked.get_mut(position.partition as usize) {
            *next = (*next).max(position.offset + 1);
        }
    }

    async fn commit(&mut self) -> Result<()> {
        let mut committed = self.shared.committed.write().await;
        let stored = committed
            .entry(self.group.clone())
            .or_insert_with(|| vec![0; self.marked.len()]);
        for (stored, marked) in stored.iter_mut().zip(&self.marked) {
            *stored = (*stored).max(*marked);
        }
        Ok(())
    }

    async fn seek(&mut self, position: SeekPosition) -> Result<()> {
        match position {
            SeekPosition::Beginning => self.current.iter_mut().for_each(|o| *o = 0),
            SeekPosition::End => {
                let partitions = self.shared.partitions.read().await;
                for (current, stored) in self.current.iter_mut().zip(partitions.iter()) {
                    *current = stored.len() as Offset;
                }
            }
            SeekPosition::Committed => {
                if let Some(offsets) = self.shared.committed.read().await.get(&self.group) {
                    self.current.clone_from(offsets);
                } else {
                    self.current.iter_mut().for_each(|o| *o = 0);
                }
            }
        }
        Ok(())
    }

    fn has_committed(&self) -> bool {
        self.has_committed
    }

    fn group(&self) -> &str {
        &self.group
    }
}
