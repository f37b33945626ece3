//! Deadline checks for submitted answers.

use std::sync::Arc;

use chrono::{DateTime, SubsecRound, Utc};
use classpulse_store::{EventStore, QuestionId, SessionId};
use tracing::{debug, instrument};

use crate::error::ProcessError;

/// Checks answers against the most recent publication of their question.
#[derive(Clone)]
pub struct TimingValidator {
    store: Arc<dyn EventStore>,
}

impl TimingValidator {
    pub fn new(store: Arc<dyn EventStore>) -> Self {
        Self { store }
    }

    /// Accepts an answer submitted at or before `published_at + timer`.
    ///
    /// A question published with a zero timer has no deadline, but still has
    /// to have been published in the session. Publication times are stored
    /// at millisecond precision, so the submission is compared at the same
    /// precision.
    #[instrument(skip(self), level = "debug")]
    pub async fn check_deadline(
        &self,
        session_id: SessionId,
        question_id: QuestionId,
        submitted_at: DateTime<Utc>,
    ) -> Result<(), ProcessError> {
        let submitted_at = submitted_at.trunc_subsecs(3);
        let publication = self
            .store
            .latest_publication(session_id, question_id)
            .await?
            .ok_or(ProcessError::NotFound {
                session_id,
                question_id,
            })?;

        match publication.deadline() {
            Some(deadline) if submitted_at > deadline => Err(ProcessError::DeadlineExceeded {
                submitted_at,
                deadline,
            }),
            deadline => {
                debug!(?deadline, "answer within deadline");
                Ok(())
            }
        }
    }
}
