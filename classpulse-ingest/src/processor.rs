//! Event dispatch: validation, derived fields and persistence.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use classpulse_store::{AnswerSubmitted, EventId, EventStore, InsertOutcome};
use serde::Serialize;
use tracing::{debug, instrument, warn};

use crate::answer_key::{AnswerKey, DefaultAnswerKey};
use crate::error::ProcessError;
use crate::event::{AnswerSubmission, Event, EventPayload, EventType};
use crate::timing::TimingValidator;

/// Opaque identity of whoever submitted an event. Only logged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Actor(pub String);

impl fmt::Display for Actor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// What happened to an accepted event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DispatchOutcome {
    pub event_id: EventId,
    pub event_type: EventType,
    /// `Duplicate` when the event had already been stored.
    pub persisted: InsertOutcome,
    /// Derived correctness, for answers.
    pub is_correct: Option<bool>,
}

/// One rejected item of a batch.
#[derive(Debug)]
pub struct BatchFailure {
    pub index: usize,
    /// Raw event id as received; it may not be a valid UUID.
    pub event_id: String,
    pub error: ProcessError,
}

impl fmt::Display for BatchFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Event {}: {}", self.event_id, self.error)
    }
}

/// Per-item results of a batch. A batch never fails as a whole.
#[derive(Debug)]
pub struct BatchReport<T> {
    pub total: usize,
    pub succeeded: Vec<T>,
    pub failures: Vec<BatchFailure>,
}

impl<T> BatchReport<T> {
    pub(crate) fn with_capacity(total: usize) -> Self {
        Self {
            total,
            succeeded: Vec::with_capacity(total),
            failures: Vec::new(),
        }
    }

    #[must_use]
    pub fn processed(&self) -> usize {
        self.succeeded.len()
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    /// `Event {id}: {error}` for every failure.
    #[must_use]
    pub fn error_messages(&self) -> Vec<String> {
        self.failures.iter().map(ToString::to_string).collect()
    }
}

/// Anything that can take a wire payload through validation and storage.
///
/// The queue consumer and the ingest strategies depend on this rather than on
/// [`EventProcessor`] directly.
#[async_trait]
pub trait Dispatcher: Send + Sync {
    async fn dispatch_payload(
        &self,
        payload: &EventPayload,
        actor: Option<&Actor>,
    ) -> Result<DispatchOutcome, ProcessError>;

    /// Dispatch every payload independently, collecting per-item results.
    async fn dispatch_batch(
        &self,
        payloads: &[EventPayload],
        actor: Option<&Actor>,
    ) -> BatchReport<DispatchOutcome> {
        let mut report = BatchReport::with_capacity(payloads.len());
        for (index, payload) in payloads.iter().enumerate() {
            match self.dispatch_payload(payload, actor).await {
                Ok(outcome) => report.succeeded.push(outcome),
                Err(error) => report.failures.push(BatchFailure {
                    index,
                    event_id: payload.event_id.clone(),
                    error,
                }),
            }
        }
        report
    }
}

/// Validates events and writes them through an [`EventStore`].
///
/// Safe to share across tasks; the store's idempotent inserts are the only
/// synchronization.
#[derive(Clone)]
pub struct EventProcessor {
    store: Arc<dyn EventStore>,
    timing: TimingValidator,
    answer_key: Arc<dyn AnswerKey>,
}

impl EventProcessor {
    pub fn new(store: Arc<dyn EventStore>) -> Self {
        Self {
            timing: TimingValidator::new(Arc::clone(&store)),
            store,
            answer_key: Arc::new(DefaultAnswerKey),
        }
    }

    #[must_use]
    pub fn with_answer_key(mut self, answer_key: Arc<dyn AnswerKey>) -> Self {
        self.answer_key = answer_key;
        self
    }

    /// Validate and persist one decoded event. Nothing is written when
    /// validation fails.
    #[instrument(
        skip(self, event, actor),
        fields(event_id = %event.event_id(), event_type = %event.event_type(), actor = tracing::field::Empty),
        level = "debug"
    )]
    pub async fn dispatch(
        &self,
        event: Event,
        actor: Option<&Actor>,
    ) -> Result<DispatchOutcome, ProcessError> {
        if let Some(actor) = actor {
            tracing::Span::current().record("actor", tracing::field::display(actor));
        }

        let event_id = event.event_id();
        let event_type = event.event_type();
        let (persisted, is_correct) = match event {
            Event::QuestionPublished(published) => {
                (self.store.insert_question_published(&published).await?, None)
            }
            Event::AnswerSubmitted(submission) => {
                let (persisted, is_correct) = self.record_answer(submission).await?;
                (persisted, Some(is_correct))
            }
            Event::SessionStarted { session, .. } => {
                self.store.upsert_session(&session).await?;
                (InsertOutcome::Inserted, None)
            }
        };

        debug!(?persisted, "event dispatched");
        Ok(DispatchOutcome {
            event_id,
            event_type,
            persisted,
            is_correct,
        })
    }

    async fn record_answer(
        &self,
        submission: AnswerSubmission,
    ) -> Result<(InsertOutcome, bool), ProcessError> {
        self.timing
            .check_deadline(
                submission.session_id,
                submission.question_id,
                submission.submitted_at,
            )
            .await?;

        let is_correct = self
            .answer_key
            .is_correct(submission.question_id, submission.answer);
        let record = AnswerSubmitted {
            event_id: submission.event_id,
            session_id: submission.session_id,
            question_id: submission.question_id,
            student_id: submission.student_id,
            answer: submission.answer.to_string(),
            is_correct,
            submitted_at: submission.submitted_at,
        };

        Ok((self.store.insert_answer_submitted(&record).await?, is_correct))
    }
}

#[async_trait]
impl Dispatcher for EventProcessor {
    async fn dispatch_payload(
        &self,
        payload: &EventPayload,
        actor: Option<&Actor>,
    ) -> Result<DispatchOutcome, ProcessError> {
        let event = Event::decode(payload).inspect_err(|e| {
            warn!(event_id = %payload.event_id, error = %e, "rejected undecodable event");
        })?;
        self.dispatch(event, actor).await
    }
}
