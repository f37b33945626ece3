//! Queue consumer feeding envelopes to a [`Dispatcher`].
//!
//! The consumer moves through an explicit lifecycle:
//!
//! ```text
//! Joining ──► Ready ──► Consuming ──► ShuttingDown ──► Stopped
//!    ▲                      │
//!    └──── rebalanced ──────┘
//! ```
//!
//! Offsets are marked once an envelope has been handled, successfully or
//! not, and committed on an interval and once more on shutdown. A crash
//! between handling and commit redelivers; dispatch is idempotent on the
//! event id so redelivery is harmless.

use std::sync::Arc;

use classpulse_iggy::{EventConsumer, EventLog, SeekPosition};
use serde::Serialize;
use tokio::sync::watch;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, trace, warn};

use super::config::ConsumerConfig;
use super::envelope::{DeadLetter, EventEnvelope};
use crate::error::ErrorKind;
use crate::processor::Dispatcher;

/// Lifecycle state of a [`QueueConsumer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsumerState {
    Joining,
    Ready,
    Consuming,
    ShuttingDown,
    Stopped,
}

/// One-shot readiness signal. Firing it more than once has no effect.
#[derive(Debug, Clone)]
pub struct ReadyLatch {
    tx: Arc<watch::Sender<bool>>,
}

impl ReadyLatch {
    #[must_use]
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// Open the latch. Returns `true` only for the call that opened it.
    pub fn fire(&self) -> bool {
        self.tx.send_if_modified(|ready| {
            if *ready {
                false
            } else {
                *ready = true;
                true
            }
        })
    }

    #[must_use]
    pub fn is_fired(&self) -> bool {
        *self.tx.borrow()
    }

    /// Wait until the latch has been opened.
    pub async fn wait(&self) {
        let mut rx = self.tx.subscribe();
        // The sender lives in `self`, so the channel cannot close while waiting.
        let _ = rx.wait_for(|ready| *ready).await;
    }
}

impl Default for ReadyLatch {
    fn default() -> Self {
        Self::new()
    }
}

/// Counters returned when the consumer stops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ConsumerStats {
    pub processed: u64,
    pub failed: u64,
    pub dead_lettered: u64,
    pub rebalances: u64,
}

enum SessionEnd {
    Shutdown,
    Rebalanced,
}

/// Long-running subscription that dispatches every envelope of a log.
pub struct QueueConsumer {
    log: Arc<dyn EventLog<EventEnvelope>>,
    dispatcher: Arc<dyn Dispatcher>,
    dead_letters: Option<Arc<dyn EventLog<DeadLetter>>>,
    config: ConsumerConfig,
    state: watch::Sender<ConsumerState>,
    ready: ReadyLatch,
}

impl QueueConsumer {
    pub fn new(
        log: Arc<dyn EventLog<EventEnvelope>>,
        dispatcher: Arc<dyn Dispatcher>,
        config: ConsumerConfig,
    ) -> Self {
        let (state, _) = watch::channel(ConsumerState::Joining);
        Self {
            log,
            dispatcher,
            dead_letters: None,
            config,
            state,
            ready: ReadyLatch::new(),
        }
    }

    /// Append envelopes that fail processing to `log` before marking them.
    #[must_use]
    pub fn with_dead_letters(mut self, log: Arc<dyn EventLog<DeadLetter>>) -> Self {
        self.dead_letters = Some(log);
        self
    }

    /// Opens after the first successful group join.
    #[must_use]
    pub fn ready(&self) -> ReadyLatch {
        self.ready.clone()
    }

    #[must_use]
    pub fn state(&self) -> watch::Receiver<ConsumerState> {
        self.state.subscribe()
    }

    #[must_use]
    pub fn group(&self) -> &str {
        &self.config.group
    }

    fn transition(&self, next: ConsumerState) {
        let previous = self.state.send_replace(next);
        if previous != next {
            info!(group = %self.config.group, from = ?previous, to = ?next, "consumer state changed");
        }
    }

    /// Consume until `shutdown` is cancelled.
    ///
    /// Cancellation interrupts a pending poll or backoff, but an envelope
    /// already being dispatched is finished and marked first.
    #[instrument(skip(self, shutdown), fields(group = %self.config.group), level = "debug")]
    pub async fn run(&self, shutdown: CancellationToken) -> ConsumerStats {
        let mut stats = ConsumerStats::default();
        let mut joined_before = false;

        loop {
            self.transition(ConsumerState::Joining);

            let joined = tokio::select! {
                () = shutdown.cancelled() => break,
                result = self.log.consumer(&self.config.group) => result,
            };
            let mut consumer = match joined {
                Ok(consumer) => consumer,
                Err(e) => {
                    error!(error = %e, "failed to join consumer group");
                    if self.backoff(&shutdown).await {
                        break;
                    }
                    continue;
                }
            };

            if !joined_before
                && !consumer.has_committed()
                && self.config.start_position != SeekPosition::Committed
                && let Err(e) = consumer.seek(self.config.start_position).await
            {
                error!(error = %e, "failed to seek to start position");
                if self.backoff(&shutdown).await {
                    break;
                }
                continue;
            }
            joined_before = true;

            self.transition(ConsumerState::Ready);
            if self.ready.fire() {
                info!("consumer ready");
            }

            match self.consume(consumer.as_mut(), &shutdown, &mut stats).await {
                SessionEnd::Shutdown => break,
                SessionEnd::Rebalanced => {
                    stats.rebalances += 1;
                    info!("consumer group rebalanced, rejoining");
                }
            }
        }

        self.transition(ConsumerState::ShuttingDown);
        info!(
            processed = stats.processed,
            failed = stats.failed,
            dead_lettered = stats.dead_lettered,
            "consumer stopped"
        );
        self.transition(ConsumerState::Stopped);
        stats
    }

    /// Claim loop for one group membership.
    ///
    /// Only the poll races against shutdown; commits happen between polls so
    /// a fetched batch is never abandoned halfway.
    async fn consume(
        &self,
        consumer: &mut dyn EventConsumer<EventEnvelope>,
        shutdown: &CancellationToken,
        stats: &mut ConsumerStats,
    ) -> SessionEnd {
        self.transition(ConsumerState::Consuming);
        let mut last_commit = Instant::now();

        loop {
            let result = tokio::select! {
                biased;

                () = shutdown.cancelled() => {
                    self.commit(consumer).await;
                    return SessionEnd::Shutdown;
                }
                result = consumer.poll(self.config.batch_size, self.config.poll_timeout) => result,
            };

            match result {
                Ok(batch) if batch.is_empty() => trace!("empty batch"),
                Ok(batch) => {
                    debug!(count = batch.len(), "processing batch");
                    for (position, envelope) in batch {
                        self.handle(envelope, stats).await;
                        consumer.mark(position);
                    }
                }
                Err(classpulse_iggy::Error::Rebalanced(_)) => {
                    self.commit(consumer).await;
                    return SessionEnd::Rebalanced;
                }
                Err(e) => {
                    error!(error = %e, "poll failed");
                    if self.backoff(shutdown).await {
                        self.commit(consumer).await;
                        return SessionEnd::Shutdown;
                    }
                }
            }

            if last_commit.elapsed() >= self.config.auto_commit_interval {
                self.commit(consumer).await;
                last_commit = Instant::now();
            }
        }
    }

    async fn handle(&self, envelope: EventEnvelope, stats: &mut ConsumerStats) {
        match self.dispatcher.dispatch_payload(&envelope.payload, None).await {
            Ok(outcome) => {
                stats.processed += 1;
                debug!(
                    event_id = %envelope.event_id,
                    persisted = ?outcome.persisted,
                    "envelope processed"
                );
            }
            Err(e) => {
                stats.failed += 1;
                if e.kind() == ErrorKind::TransientInfra {
                    error!(event_id = %envelope.event_id, error = %e, "failed to process envelope");
                } else {
                    warn!(event_id = %envelope.event_id, error = %e, "rejected envelope");
                }
                if self.dead_letter(envelope, &e).await {
                    stats.dead_lettered += 1;
                }
            }
        }
    }

    async fn dead_letter(&self, envelope: EventEnvelope, error: &impl ToString) -> bool {
        let Some(dead_letters) = &self.dead_letters else {
            return false;
        };
        let event_id = envelope.event_id.clone();
        match dead_letters.append(DeadLetter::new(envelope, error.to_string())).await {
            Ok(position) => {
                debug!(event_id = %event_id, %position, "envelope dead-lettered");
                true
            }
            Err(e) => {
                error!(event_id = %event_id, error = %e, "failed to dead-letter envelope");
                false
            }
        }
    }

    async fn commit(&self, consumer: &mut dyn EventConsumer<EventEnvelope>) {
        if let Err(e) = consumer.commit().await {
            error!(error = %e, "failed to commit offsets");
        }
    }

    /// Sleep for the rejoin backoff. Returns `true` if cancelled meanwhile.
    async fn backoff(&self, shutdown: &CancellationToken) -> bool {
        tokio::select! {
            () = shutdown.cancelled() => true,
            () = tokio::time::sleep(self.config.rejoin_backoff) => false,
        }
    }
}

/// Task running a [`QueueConsumer`]; resolves to its final counters.
pub type ConsumerHandle = tokio::task::JoinHandle<ConsumerStats>;

/// Spawn `consumer` on the runtime.
pub fn spawn(consumer: Arc<QueueConsumer>, shutdown: CancellationToken) -> ConsumerHandle {
    tokio::spawn(async move { consumer.run(shutdown).await })
}
