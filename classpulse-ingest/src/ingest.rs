//! Ingest strategies: process inline, or queue with a direct fallback.

use std::sync::Arc;

use async_trait::async_trait;
use classpulse_iggy::Position;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::delivery::Producer;
use crate::error::ProcessError;
use crate::event::EventPayload;
use crate::processor::{Actor, BatchFailure, BatchReport, DispatchOutcome, Dispatcher};

/// Which path ingested an event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IngestMode {
    /// Validated and stored before returning.
    #[default]
    Direct,
    /// Published to the queue; a consumer stores it later.
    Queued,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestConfig {
    #[serde(default)]
    pub mode: IngestMode,
}

impl IngestConfig {
    #[must_use]
    pub fn with_mode(mut self, mode: IngestMode) -> Self {
        self.mode = mode;
        self
    }
}

/// Acknowledgement returned to the caller of [`Ingestor::ingest`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IngestReceipt {
    pub event_id: String,
    pub mode: IngestMode,
    /// Set when queued.
    pub position: Option<Position>,
    /// Set when processed inline.
    pub outcome: Option<DispatchOutcome>,
    /// The queue was configured but publishing failed.
    pub fell_back: bool,
}

impl IngestReceipt {
    fn direct(event_id: String, outcome: DispatchOutcome, fell_back: bool) -> Self {
        Self {
            event_id,
            mode: IngestMode::Direct,
            position: None,
            outcome: Some(outcome),
            fell_back,
        }
    }

    fn queued(event_id: String, position: Position) -> Self {
        Self {
            event_id,
            mode: IngestMode::Queued,
            position: Some(position),
            outcome: None,
            fell_back: false,
        }
    }
}

/// Entry point for events arriving from clients.
#[async_trait]
pub trait Ingestor: Send + Sync {
    async fn ingest(
        &self,
        payload: EventPayload,
        actor: Option<&Actor>,
    ) -> Result<IngestReceipt, ProcessError>;

    /// Ingest each payload independently; failures do not stop the batch.
    async fn ingest_batch(
        &self,
        payloads: Vec<EventPayload>,
        actor: Option<&Actor>,
    ) -> BatchReport<IngestReceipt> {
        let mut report = BatchReport::with_capacity(payloads.len());
        for (index, payload) in payloads.into_iter().enumerate() {
            let event_id = payload.event_id.clone();
            match self.ingest(payload, actor).await {
                Ok(receipt) => report.succeeded.push(receipt),
                Err(error) => report.failures.push(BatchFailure {
                    index,
                    event_id,
                    error,
                }),
            }
        }
        report
    }

    fn mode(&self) -> IngestMode;
}

/// Validates and stores every event before acknowledging it.
pub struct DirectIngestor {
    dispatcher: Arc<dyn Dispatcher>,
}

impl DirectIngestor {
    pub fn new(dispatcher: Arc<dyn Dispatcher>) -> Self {
        Self { dispatcher }
    }
}

#[async_trait]
impl Ingestor for DirectIngestor {
    async fn ingest(
        &self,
        payload: EventPayload,
        actor: Option<&Actor>,
    ) -> Result<IngestReceipt, ProcessError> {
        let outcome = self.dispatcher.dispatch_payload(&payload, actor).await?;
        Ok(IngestReceipt::direct(payload.event_id, outcome, false))
    }

    fn mode(&self) -> IngestMode {
        IngestMode::Direct
    }
}

/// Publishes events to the queue, processing inline when publishing fails.
///
/// The fallback is best-effort: an event whose publish failed after the log
/// stored it may be processed twice, which dispatch tolerates.
pub struct QueuedIngestor {
    producer: Arc<Producer>,
    fallback: Arc<dyn Dispatcher>,
}

impl QueuedIngestor {
    pub fn new(producer: Arc<Producer>, fallback: Arc<dyn Dispatcher>) -> Self {
        Self { producer, fallback }
    }
}

#[async_trait]
impl Ingestor for QueuedIngestor {
    async fn ingest(
        &self,
        payload: EventPayload,
        actor: Option<&Actor>,
    ) -> Result<IngestReceipt, ProcessError> {
        let event_id = payload.event_id.clone();
        match self.producer.publish_payload(payload.clone()).await {
            Ok(position) => {
                debug!(event_id = %event_id, %position, "event queued");
                Ok(IngestReceipt::queued(event_id, position))
            }
            Err(e) => {
                warn!(event_id = %event_id, error = %e, "publish failed, processing directly");
                let outcome = self.fallback.dispatch_payload(&payload, actor).await?;
                Ok(IngestReceipt::direct(event_id, outcome, true))
            }
        }
    }

    fn mode(&self) -> IngestMode {
        IngestMode::Queued
    }
}

/// Build the ingestor selected by `config`.
///
/// Queued mode without a producer degrades to direct ingestion.
pub fn build_ingestor(
    config: &IngestConfig,
    dispatcher: Arc<dyn Dispatcher>,
    producer: Option<Arc<Producer>>,
) -> Arc<dyn Ingestor> {
    match (config.mode, producer) {
        (IngestMode::Queued, Some(producer)) => Arc::new(QueuedIngestor::new(producer, dispatcher)),
        (IngestMode::Queued, None) => {
            warn!("queued ingestion configured without a producer, using direct mode");
            Arc::new(DirectIngestor::new(dispatcher))
        }
        (IngestMode::Direct, _) => Arc::new(DirectIngestor::new(dispatcher)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_parses_lowercase() {
        let config: IngestConfig = toml::from_str("mode = \"queued\"").unwrap();
        assert_eq!(config.mode, IngestMode::Queued);

        let config: IngestConfig = toml::from_str("").unwrap();
        assert_eq!(config.mode, IngestMode::Direct);
    }
}
