//! Iggy-backed EventLog implementation.
//!
//! Events are serialized as JSON and written to a single Iggy topic. The
//! partition is computed client-side with [`partition_for_key`] so the
//! in-memory and Iggy logs agree on where a key lives.
//!
//! # Offsets
//!
//! Iggy does not report the offset assigned to a sent message. The position
//! returned by `append` carries a per-partition sequence counted by this
//! producer instance; it equals the server offset only when this instance is
//! the sole writer of a fresh topic. Consumers always see server offsets.
//!
//! # Consumer groups
//!
//! Consumers poll every partition explicitly and store offsets under the
//! group name, so committed progress is shared by every consumer created
//! with the same group. Iggy never revokes partitions from such a consumer,
//! so `poll` does not report rebalances.

use std::collections::BTreeMap;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use iggy::prelude::*;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use crate::config::{Compression, IggyConfig};
use crate::error::{Error, Result};
use crate::traits::{
    EventBatch, EventConsumer, EventLog, Offset, Partitionable, Position, SeekPosition,
    partition_for_key,
};

/// Delay between empty polls while waiting for the poll timeout.
const EMPTY_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Check if an Iggy error indicates a resource already exists.
fn is_already_exists_error(e: &IggyError) -> bool {
    let err_str = e.to_string();
    err_str.contains("already exists")
        || err_str.contains("already_exists")
        || err_str.contains("AlreadyExists")
}

fn named(name: &str) -> Result<Identifier> {
    Identifier::named(name).map_err(|e| Error::Iggy(format!("invalid name '{name}': {e}")))
}

fn compression_algorithm(compression: Compression) -> CompressionAlgorithm {
    match compression {
        Compression::None => CompressionAlgorithm::None,
        Compression::Gzip => CompressionAlgorithm::Gzip,
    }
}

fn build_client(config: &IggyConfig) -> Result<IggyClient> {
    IggyClient::builder()
        .with_tcp()
        .with_server_address(config.address.clone())
        .build()
        .map_err(|e| Error::Connection(e.to_string()))
}

/// Iggy-backed implementation of [`EventLog`].
pub struct IggyEventLog<E> {
    config: IggyConfig,
    client: IggyClient,
    stream_id: Identifier,
    topic_id: Identifier,
    /// Producer-local sequence per partition.
    sequences: Vec<AtomicU64>,
    _phantom: PhantomData<E>,
}

impl<E> IggyEventLog<E>
where
    E: Serialize + DeserializeOwned + Send + Sync + Partitionable + 'static,
{
    /// Create a log for the configured stream and topic.
    ///
    /// No connection is made until [`connect`](Self::connect) is called.
    pub fn new(config: IggyConfig) -> Result<Self> {
        let client = build_client(&config)?;
        let stream_id = named(&config.stream)?;
        let topic_id = named(&config.topic)?;
        let sequences = (0..config.partitions.max(1))
            .map(|_| AtomicU64::new(0))
            .collect();

        Ok(Self {
            config,
            client,
            stream_id,
            topic_id,
            sequences,
            _phantom: PhantomData,
        })
    }

    /// Connect, authenticate and create the stream and topic if missing.
    pub async fn connect(&self) -> Result<()> {
        self.client.connect().await?;
        info!(address = %self.config.address, "Connected to Iggy server");

        self.client
            .login_user(&self.config.username, &self.config.password)
            .await?;
        debug!(user = %self.config.username, "Logged in to Iggy");

        let streams = self.client.get_streams().await?;
        if streams.iter().any(|s| s.name == self.config.stream) {
            debug!(stream = %self.config.stream, "Stream already exists");
        } else {
            match self.client.create_stream(&self.config.stream).await {
                Ok(_) => info!(stream = %self.config.stream, "Created stream"),
                Err(e) if is_already_exists_error(&e) => {
                    debug!("Stream already exists (concurrent creation)");
                }
                Err(e) => return Err(e.into()),
            }
        }

        match self
            .client
            .create_topic(
                &self.stream_id,
                &self.config.topic,
                self.partition_count(),
                compression_algorithm(self.config.compression),
                None,
                IggyExpiry::NeverExpire,
                MaxTopicSize::ServerDefault,
            )
            .await
        {
            Ok(_) => info!(
                topic = %self.config.topic,
                partitions = self.partition_count(),
                "Created topic"
            ),
            Err(e) if is_already_exists_error(&e) => {
                debug!(topic = %self.config.topic, "Topic already exists");
            }
            Err(e) => return Err(e.into()),
        }

        Ok(())
    }

    fn encode(event: &E) -> Result<IggyMessage> {
        let payload = serde_json::to_vec(event)?;
        IggyMessage::builder()
            .payload(payload.into())
            .build()
            .map_err(|e| Error::Iggy(e.to_string()))
    }

    async fn send_to_partition(
        &self,
        partition: u32,
        messages: &mut [IggyMessage],
    ) -> Result<Offset> {
        let partitioning = Partitioning::partition_id(partition);
        self.client
            .send_messages(&self.stream_id, &self.topic_id, &partitioning, messages)
            .await?;

        let first = self.sequences[partition as usize]
            .fetch_add(messages.len() as u64, Ordering::SeqCst);
        Ok(first)
    }
}

#[async_trait]
impl<E> EventLog<E> for IggyEventLog<E>
where
    E: Serialize + DeserializeOwned + Send + Sync + Partitionable + 'static,
{
    async fn append(&self, event: E) -> Result<Position> {
        let partition = partition_for_key(event.partition_key(), self.partition_count());
        let mut messages = [Self::encode(&event)?];
        let offset = self.send_to_partition(partition, &mut messages).await?;

        debug!(partition, offset, "Appended event to Iggy");
        Ok(Position::new(partition, offset))
    }

    async fn append_batch(&self, events: Vec<E>) -> Result<Vec<Position>> {
        let count = self.partition_count();
        let mut by_partition: BTreeMap<u32, (Vec<usize>, Vec<IggyMessage>)> = BTreeMap::new();

        for (idx, event) in events.iter().enumerate() {
            let partition = partition_for_key(event.partition_key(), count);
            let entry = by_partition.entry(partition).or_default();
            entry.0.push(idx);
            entry.1.push(Self::encode(event)?);
        }

        let mut positions = vec![Position::new(0, 0); events.len()];
        for (partition, (indices, mut messages)) in by_partition {
            let first = self.send_to_partition(partition, &mut messages).await?;
            for (n, idx) in indices.into_iter().enumerate() {
                positions[idx] = Position::new(partition, first + n as u64);
            }
        }

        debug!(count = positions.len(), "Appended batch to Iggy");
        Ok(positions)
    }

    async fn consumer(&self, group: &str) -> Result<Box<dyn EventConsumer<E>>> {
        // Each consumer needs its own connection.
        let client = build_client(&self.config)?;
        client.connect().await?;
        client
            .login_user(&self.config.username, &self.config.password)
            .await?;

        let mut consumer = IggyEventConsumer {
            client,
            consumer: Consumer::new(named(group)?),
            group: group.to_string(),
            stream_id: self.stream_id.clone(),
            topic_id: self.topic_id.clone(),
            offsets: vec![0; self.partition_count() as usize],
            marked: vec![None; self.partition_count() as usize],
            has_committed: false,
            _phantom: PhantomData,
        };
        consumer.seek(SeekPosition::Committed).await?;

        Ok(Box::new(consumer))
    }

    fn partition_count(&self) -> u32 {
        self.sequences.len() as u32
    }
}

/// Iggy-backed consumer implementation.
///
/// Polls every partition and tracks read and marked offsets per partition.
pub struct IggyEventConsumer<E> {
    client: IggyClient,
    consumer: Consumer,
    group: String,
    stream_id: Identifier,
    topic_id: Identifier,
    /// Next offset to read, per partition.
    offsets: Vec<Offset>,
    /// Next offset to commit, per partition. `None` until something is marked.
    marked: Vec<Option<Offset>>,
    /// Set when any partition had a stored offset at the last committed seek.
    has_committed: bool,
    _phantom: PhantomData<E>,
}

impl<E> IggyEventConsumer<E>
where
    E: DeserializeOwned + Send + 'static,
{
    async fn poll_once(&mut self, max_count: usize) -> Result<Vec<(Position, E)>> {
        let mut events = Vec::new();
        let per_partition = (max_count / self.offsets.len().max(1)).max(1);

        for idx in 0..self.offsets.len() {
            let partition = idx as u32;
            let strategy = PollingStrategy::offset(self.offsets[idx]);

            let polled = match self
                .client
                .poll_messages(
                    &self.stream_id,
                    &self.topic_id,
                    Some(partition),
                    &self.consumer,
                    &strategy,
                    per_partition as u32,
                    false,
                )
                .await
            {
                Ok(polled) => polled,
                Err(e) => {
                    let err_str = e.to_string().to_lowercase();
                    if err_str.contains("offset") || err_str.contains("not found") {
                        warn!(
                            partition,
                            offset = self.offsets[idx],
                            error = %e,
                            "Invalid offset, resetting to beginning of partition"
                        );
                        self.offsets[idx] = 0;
                        continue;
                    }
                    return Err(e.into());
                }
            };

            for msg in polled.messages {
                let event: E = serde_json::from_slice(&msg.payload)?;
                events.push((Position::new(partition, msg.header.offset), event));
                self.offsets[idx] = msg.header.offset + 1;
            }
        }

        Ok(events)
    }

    async fn stored_offset(&self, partition: u32) -> Result<Option<Offset>> {
        let stored = self
            .client
            .get_consumer_offset(
                &self.consumer,
                &self.stream_id,
                &self.topic_id,
                Some(partition),
            )
            .await?;
        Ok(stored.map(|info| info.stored_offset))
    }
}

#[async_trait]
impl<E> EventConsumer<E> for IggyEventConsumer<E>
where
    E: DeserializeOwned + Send + Sync + 'static,
{
    async fn poll(&mut self, max_count: usize, timeout: Duration) -> Result<EventBatch<E>> {
        let deadline = tokio::time::Instant::now() + timeout;

        loop {
            let events = self.poll_once(max_count).await?;
            if !events.is_empty() {
                return Ok(EventBatch::new(events));
            }

            let now = tokio::time::Instant::now();
            if now >= deadline {
                return Ok(EventBatch::empty());
            }
            tokio::time::sleep(EMPTY_POLL_INTERVAL.min(deadline - now)).await;
        }
    }

    fn mark(&mut self, position: Position) {
        if let Some(slot) = self.marked.get_mut(position.partition as usize) {
            let next = position.offset + 1;
            *slot = Some(slot.map_or(next, |current| current.max(next)));
        }
    }

    async fn commit(&mut self) -> Result<()> {
        for (idx, marked) in self.marked.iter().enumerate() {
            let Some(offset) = marked else {
                continue;
            };
            self.client
                .store_consumer_offset(
                    &self.consumer,
                    &self.stream_id,
                    &self.topic_id,
                    Some(idx as u32),
                    *offset,
                )
                .await?;
        }

        debug!(group = %self.group, "Committed offsets to Iggy");
        Ok(())
    }

    async fn seek(&mut self, position: SeekPosition) -> Result<()> {
        match position {
            SeekPosition::Beginning => self.offsets.iter_mut().for_each(|o| *o = 0),
            SeekPosition::End => {
                let topic = self
                    .client
                    .get_topic(&self.stream_id, &self.topic_id)
                    .await?
                    .ok_or_else(|| Error::Iggy("topic not found".to_string()))?;
                for (offset, partition) in self.offsets.iter_mut().zip(topic.partitions.iter()) {
                    *offset = if partition.messages_count == 0 {
                        0
                    } else {
                        partition.current_offset + 1
                    };
                }
            }
            SeekPosition::Committed => {
                let mut any_stored = false;
                for idx in 0..self.offsets.len() {
                    let stored = self.stored_offset(idx as u32).await?;
                    any_stored |= stored.is_some();
                    self.offsets[idx] = stored.unwrap_or(0);
                }
                self.has_committed = any_stored;
            }
        }

        debug!(group = %self.group, ?position, offsets = ?self.offsets, "Seeked consumer");
        Ok(())
    }

    fn has_committed(&self) -> bool {
        self.has_committed
    }

    fn group(&self) -> &str {
        &self.group
    }
}
