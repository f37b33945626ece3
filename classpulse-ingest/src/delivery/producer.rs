//! Batching producer.
//!
//! Publishes are queued to a background flusher that sends a batch when it
//! reaches `flush_messages` or when `flush_interval` has passed since the
//! first queued publish, whichever comes first. Every caller waits for the
//! acknowledgement of its own envelope.

use std::sync::Arc;

use classpulse_iggy::{EventLog, Position};
use tokio::sync::{Mutex, mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use super::config::ProducerConfig;
use super::envelope::EventEnvelope;
use crate::error::DeliveryError;
use crate::event::EventPayload;

type Ack = oneshot::Sender<Result<Position, DeliveryError>>;

struct PublishRequest {
    envelope: EventEnvelope,
    ack: Ack,
}

/// Publishes event envelopes to an [`EventLog`], keyed by session.
pub struct Producer {
    tx: mpsc::Sender<PublishRequest>,
    flusher: Mutex<Option<JoinHandle<()>>>,
    shutdown: CancellationToken,
}

impl Producer {
    /// Start a producer and its flusher task.
    pub fn new(log: Arc<dyn EventLog<EventEnvelope>>, config: ProducerConfig) -> Self {
        let capacity = config.flush_messages.max(1) * 4;
        let (tx, rx) = mpsc::channel(capacity);
        let shutdown = CancellationToken::new();
        let flusher = tokio::spawn(run_flusher(log, config, rx, shutdown.clone()));
        Self {
            tx,
            flusher: Mutex::new(Some(flusher)),
            shutdown,
        }
    }

    /// Publish one event and wait until the log has stored it.
    #[instrument(skip(self, payload), level = "debug")]
    pub async fn publish(
        &self,
        event_id: &str,
        event_type: &str,
        session_id: &str,
        payload: EventPayload,
    ) -> Result<Position, DeliveryError> {
        self.send(EventEnvelope::new(event_id, event_type, session_id, payload))
            .await
    }

    /// Publish a payload, taking the envelope headers from the payload.
    pub async fn publish_payload(&self, payload: EventPayload) -> Result<Position, DeliveryError> {
        self.send(EventEnvelope::for_payload(payload)).await
    }

    async fn send(&self, envelope: EventEnvelope) -> Result<Position, DeliveryError> {
        let event_id = envelope.event_id.clone();
        let (ack, rx) = oneshot::channel();
        self.tx
            .send(PublishRequest { envelope, ack })
            .await
            .map_err(|_| DeliveryError::Closed)?;

        let position = rx.await.map_err(|_| DeliveryError::Closed)??;
        debug!(
            event_id = %event_id,
            partition = position.partition,
            offset = position.offset,
            "event published"
        );
        Ok(position)
    }

    /// Flush pending publishes and stop the flusher.
    ///
    /// Publishes issued after `close` fail with [`DeliveryError::Closed`].
    pub async fn close(&self) {
        self.shutdown.cancel();
        let handle = self.flusher.lock().await.take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                warn!(error = %e, "producer flusher panicked");
            }
            info!("producer closed");
        }
    }
}

async fn run_flusher(
    log: Arc<dyn EventLog<EventEnvelope>>,
    config: ProducerConfig,
    mut rx: mpsc::Receiver<PublishRequest>,
    shutdown: CancellationToken,
) {
    let mut pending: Vec<PublishRequest> = Vec::with_capacity(config.flush_messages);
    let flush_timer = tokio::time::sleep(config.flush_interval);
    tokio::pin!(flush_timer);

    loop {
        tokio::select! {
            () = shutdown.cancelled() => {
                rx.close();
                while let Some(request) = rx.recv().await {
                    pending.push(request);
                }
                flush(log.as_ref(), &config, &mut pending).await;
                break;
            }
            request = rx.recv() => match request {
                Some(request) => {
                    if pending.is_empty() {
                        flush_timer.as_mut().reset(Instant::now() + config.flush_interval);
                    }
                    pending.push(request);
                    if pending.len() >= config.flush_messages {
                        flush(log.as_ref(), &config, &mut pending).await;
                    }
                }
                None => {
                    flush(log.as_ref(), &config, &mut pending).await;
                    break;
                }
            },
            () = &mut flush_timer, if !pending.is_empty() => {
                flush(log.as_ref(), &config, &mut pending).await;
            }
        }
    }

    debug!("producer flusher stopped");
}

/// Send every pending envelope as one batch and acknowledge each caller.
async fn flush(
    log: &dyn EventLog<EventEnvelope>,
    config: &ProducerConfig,
    pending: &mut Vec<PublishRequest>,
) {
    if pending.is_empty() {
        return;
    }

    let (envelopes, acks): (Vec<EventEnvelope>, Vec<Ack>) = pending
        .drain(..)
        .map(|request| (request.envelope, request.ack))
        .unzip();
    let count = envelopes.len();

    match send_with_retries(log, config, envelopes).await {
        Ok(positions) => {
            debug!(count, "batch flushed");
            for (ack, position) in acks.into_iter().zip(positions) {
                // The caller may have given up waiting.
                let _ = ack.send(Ok(position));
            }
        }
        Err((attempts, source)) => {
            error!(count, attempts, error = %source, "batch send failed");
            let reason = source.to_string();
            for ack in acks {
                let _ = ack.send(Err(DeliveryError::RetriesExhausted {
                    attempts,
                    reason: reason.clone(),
                }));
            }
        }
    }
}

async fn send_with_retries(
    log: &dyn EventLog<EventEnvelope>,
    config: &ProducerConfig,
    envelopes: Vec<EventEnvelope>,
) -> Result<Vec<Position>, (u32, classpulse_iggy::Error)> {
    let mut attempt = 0u32;
    loop {
        attempt += 1;
        match log.append_batch(envelopes.clone()).await {
            Ok(positions) => return Ok(positions),
            Err(e) if e.is_transient() && attempt <= config.max_retries => {
                warn!(attempt, error = %e, "send failed, retrying");
                tokio::time::sleep(config.retry_backoff).await;
            }
            Err(e) => return Err((attempt, e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventType;
    use chrono::Utc;
    use classpulse_iggy::{InMemoryEventLog, partition_for_key};
    use std::time::Duration;

    fn payload(session: &str, n: u32) -> EventPayload {
        EventPayload::new(
            EventType::QuestionPublished,
            format!("evt-{n}"),
            session,
            Utc::now(),
        )
    }

    fn fast_config() -> ProducerConfig {
        ProducerConfig::default()
            .with_flush_interval(Duration::from_millis(10))
            .with_retry_backoff(Duration::from_millis(1))
    }

    #[tokio::test]
    async fn publish_routes_by_session() {
        let log = Arc::new(InMemoryEventLog::<EventEnvelope>::with_partitions(4));
        let producer = Producer::new(log.clone(), fast_config());

        let position = producer
            .publish("evt-1", "QUESTION_PUBLISHED", "session-7", payload("session-7", 1))
            .await
            .unwrap();

        assert_eq!(position.partition, partition_for_key(Some("session-7"), 4));
        assert_eq!(position.offset, 0);
        let stored = log.partition_events(position.partition).await;
        assert_eq!(stored[0].event_id, "evt-1");
        assert_eq!(stored[0].event_type, "QUESTION_PUBLISHED");
    }

    #[tokio::test]
    async fn full_batch_flushes_without_waiting_for_interval() {
        let log = Arc::new(InMemoryEventLog::<EventEnvelope>::with_partitions(1));
        let config = ProducerConfig::default()
            .with_flush_interval(Duration::from_secs(3600))
            .with_flush_messages(3);
        let producer = Arc::new(Producer::new(log.clone(), config));

        let publishes = (0..3).map(|n| {
            let producer = Arc::clone(&producer);
            tokio::spawn(async move { producer.publish_payload(payload("s", n)).await })
        });
        let mut offsets = Vec::new();
        for handle in publishes {
            let position = tokio::time::timeout(Duration::from_secs(5), handle)
                .await
                .expect("batch should flush on size")
                .unwrap()
                .unwrap();
            offsets.push(position.offset);
        }

        offsets.sort_unstable();
        assert_eq!(offsets, vec![0, 1, 2]);
    }

    #[tokio::test]
    async fn one_session_keeps_publish_order() {
        let log = Arc::new(InMemoryEventLog::<EventEnvelope>::with_partitions(4));
        let producer = Producer::new(log.clone(), fast_config());

        let mut last = None;
        for n in 0..5 {
            let position = producer.publish_payload(payload("ordered", n)).await.unwrap();
            if let Some(previous) = last {
                assert!(position.offset > previous);
            }
            last = Some(position.offset);
        }

        let partition = partition_for_key(Some("ordered"), 4);
        let ids: Vec<String> = log
            .partition_events(partition)
            .await
            .into_iter()
            .map(|e| e.event_id)
            .collect();
        assert_eq!(ids, vec!["evt-0", "evt-1", "evt-2", "evt-3", "evt-4"]);
    }

    #[tokio::test]
    async fn transient_failures_are_retried() {
        let log = Arc::new(InMemoryEventLog::<EventEnvelope>::new());
        log.fail_next_appends(2);
        let producer = Producer::new(log.clone(), fast_config());

        producer.publish_payload(payload("s", 1)).await.unwrap();
        assert_eq!(log.len().await, 1);
    }

    #[tokio::test]
    async fn exhausted_retries_surface_to_the_caller() {
        let log = Arc::new(InMemoryEventLog::<EventEnvelope>::new());
        log.fail_next_appends(10);
        let producer = Producer::new(log.clone(), fast_config().with_max_retries(2));

        let err = producer.publish_payload(payload("s", 1)).await.unwrap_err();
        assert!(matches!(
            err,
            DeliveryError::RetriesExhausted { attempts: 3, .. }
        ));
        assert!(log.is_empty().await);
    }

    #[tokio::test]
    async fn publish_after_close_fails() {
        let log = Arc::new(InMemoryEventLog::<EventEnvelope>::new());
        let producer = Producer::new(log, fast_config());
        producer.close().await;

        let err = producer.publish_payload(payload("s", 1)).await.unwrap_err();
        assert!(matches!(err, DeliveryError::Closed));
    }
}
