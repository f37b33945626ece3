//! [`EventStore`] on libSQL.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::{debug, instrument};

use super::{TursoStore, from_millis, parse_id, to_millis};
use crate::error::Result;
use crate::ids::{QuestionId, SessionId};
use crate::records::{AnswerSubmitted, InsertOutcome, QuestionPublished, QuizSession};
use crate::traits::EventStore;

fn outcome(rows_affected: u64) -> InsertOutcome {
    if rows_affected == 0 {
        InsertOutcome::Duplicate
    } else {
        InsertOutcome::Inserted
    }
}

impl TursoStore {
    fn parse_publication(row: &libsql::Row) -> Result<QuestionPublished> {
        let event_id: String = row.get(0)?;
        let session_id: String = row.get(1)?;
        let question_id: String = row.get(2)?;
        let teacher_id: Option<String> = row.get(3)?;
        let published_at: i64 = row.get(4)?;
        let timer: i64 = row.get(5)?;

        Ok(QuestionPublished {
            event_id: parse_id(&event_id, "event_id")?,
            session_id: parse_id(&session_id, "session_id")?,
            question_id: parse_id(&question_id, "question_id")?,
            teacher_id: teacher_id
                .as_deref()
                .map(|t| parse_id(t, "teacher_id"))
                .transpose()?,
            published_at: from_millis(published_at)?,
            timer_duration_secs: timer.clamp(0, i64::from(u32::MAX)) as u32,
        })
    }

    fn parse_session(row: &libsql::Row) -> Result<QuizSession> {
        let session_id: String = row.get(0)?;
        let quiz_id: String = row.get(1)?;
        let classroom_id: String = row.get(2)?;
        let started_at: i64 = row.get(3)?;
        let ended_at: Option<i64> = row.get(4)?;

        Ok(QuizSession {
            session_id: parse_id(&session_id, "session_id")?,
            quiz_id: parse_id(&quiz_id, "quiz_id")?,
            classroom_id: parse_id(&classroom_id, "classroom_id")?,
            started_at: from_millis(started_at)?,
            ended_at: ended_at.map(from_millis).transpose()?,
        })
    }
}

#[async_trait]
impl EventStore for TursoStore {
    #[instrument(skip(self, event), fields(event_id = %event.event_id), level = "debug")]
    async fn insert_question_published(&self, event: &QuestionPublished) -> Result<InsertOutcome> {
        let affected = self
            .conn()
            .execute(
                "INSERT OR IGNORE INTO question_published_events (event_id, session_id, question_id, teacher_id, published_at, timer_duration_sec) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                libsql::params![
                    event.event_id.to_string(),
                    event.session_id.to_string(),
                    event.question_id.to_string(),
                    event.teacher_id.map(|t| t.to_string()),
                    to_millis(event.published_at),
                    i64::from(event.timer_duration_secs)
                ],
            )
            .await?;

        let outcome = outcome(affected);
        debug!(?outcome, "stored question publication");
        Ok(outcome)
    }

    #[instrument(skip(self, event), fields(event_id = %event.event_id), level = "debug")]
    async fn insert_answer_submitted(&self, event: &AnswerSubmitted) -> Result<InsertOutcome> {
        let affected = self
            .conn()
            .execute(
                "INSERT OR IGNORE INTO answer_submitted_events (event_id, session_id, question_id, student_id, answer, is_correct, submitted_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                libsql::params![
                    event.event_id.to_string(),
                    event.session_id.to_string(),
                    event.question_id.to_string(),
                    event.student_id.to_string(),
                    event.answer.clone(),
                    i64::from(event.is_correct),
                    to_millis(event.submitted_at)
                ],
            )
            .await?;

        let outcome = outcome(affected);
        debug!(?outcome, "stored answer");
        Ok(outcome)
    }

    #[instrument(skip(self, session), fields(session_id = %session.session_id), level = "debug")]
    async fn upsert_session(&self, session: &QuizSession) -> Result<()> {
        self.conn()
            .execute(
                "INSERT INTO quiz_sessions (session_id, quiz_id, classroom_id, started_at, ended_at) VALUES (?1, ?2, ?3, ?4, ?5) \
                 ON CONFLICT(session_id) DO UPDATE SET quiz_id = excluded.quiz_id, classroom_id = excluded.classroom_id, started_at = excluded.started_at",
                libsql::params![
                    session.session_id.to_string(),
                    session.quiz_id.to_string(),
                    session.classroom_id.to_string(),
                    to_millis(session.started_at),
                    session.ended_at.map(to_millis)
                ],
            )
            .await?;
        Ok(())
    }

    #[instrument(skip(self), level = "debug")]
    async fn end_session(&self, session_id: SessionId, ended_at: DateTime<Utc>) -> Result<bool> {
        let affected = self
            .conn()
            .execute(
                "UPDATE quiz_sessions SET ended_at = ?1 WHERE session_id = ?2",
                libsql::params![to_millis(ended_at), session_id.to_string()],
            )
            .await?;
        Ok(affected > 0)
    }

    #[instrument(skip(self), level = "debug")]
    async fn latest_publication(
        &self,
        session_id: SessionId,
        question_id: QuestionId,
    ) -> Result<Option<QuestionPublished>> {
        let mut rows = self
            .conn()
            .query(
                "SELECT event_id, session_id, question_id, teacher_id, published_at, timer_duration_sec FROM question_published_events WHERE session_id = ?1 AND question_id = ?2 ORDER BY published_at DESC, event_id DESC LIMIT 1",
                libsql::params![session_id.to_string(), question_id.to_string()],
            )
            .await?;

        if let Some(row) = rows.next().await? {
            Ok(Some(Self::parse_publication(&row)?))
        } else {
            Ok(None)
        }
    }

    #[instrument(skip(self), level = "debug")]
    async fn get_session(&self, session_id: SessionId) -> Result<Option<QuizSession>> {
        let mut rows = self
            .conn()
            .query(
                "SELECT session_id, quiz_id, classroom_id, started_at, ended_at FROM quiz_sessions WHERE session_id = ?1",
                [session_id.to_string()],
            )
            .await?;

        if let Some(row) = rows.next().await? {
            Ok(Some(Self::parse_session(&row)?))
        } else {
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::{ClassroomId, EventId, QuizId, StudentId, TeacherId};
    use chrono::{Duration, TimeZone};

    async fn create_test_store() -> TursoStore {
        TursoStore::new_memory().await.unwrap()
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap()
    }

    fn publication(session_id: SessionId, question_id: QuestionId, at: DateTime<Utc>) -> QuestionPublished {
        QuestionPublished {
            event_id: EventId::new(),
            session_id,
            question_id,
            teacher_id: Some(TeacherId::new()),
            published_at: at,
            timer_duration_secs: 30,
        }
    }

    #[tokio::test]
    async fn duplicate_publication_is_ignored() {
        let store = create_test_store().await;
        let event = publication(SessionId::new(), QuestionId::new(), t0());

        assert_eq!(
            store.insert_question_published(&event).await.unwrap(),
            InsertOutcome::Inserted
        );
        assert_eq!(
            store.insert_question_published(&event).await.unwrap(),
            InsertOutcome::Duplicate
        );

        let mut rows = store
            .conn()
            .query("SELECT COUNT(*) FROM question_published_events", ())
            .await
            .unwrap();
        let count: i64 = rows.next().await.unwrap().unwrap().get(0).unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn duplicate_answer_is_ignored() {
        let store = create_test_store().await;
        let answer = AnswerSubmitted {
            event_id: EventId::new(),
            session_id: SessionId::new(),
            question_id: QuestionId::new(),
            student_id: StudentId::new(),
            answer: "C".to_string(),
            is_correct: true,
            submitted_at: t0(),
        };

        store.insert_answer_submitted(&answer).await.unwrap();
        let second = store.insert_answer_submitted(&answer).await.unwrap();

        assert!(second.is_duplicate());
    }

    #[tokio::test]
    async fn latest_publication_picks_most_recent() {
        let store = create_test_store().await;
        let session = SessionId::new();
        let question = QuestionId::new();

        let first = publication(session, question, t0());
        let mut second = publication(session, question, t0() + Duration::seconds(90));
        second.timer_duration_secs = 45;
        store.insert_question_published(&first).await.unwrap();
        store.insert_question_published(&second).await.unwrap();

        let latest = store
            .latest_publication(session, question)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(latest, second);
    }

    #[tokio::test]
    async fn latest_publication_is_scoped_to_session() {
        let store = create_test_store().await;
        let question = QuestionId::new();
        store
            .insert_question_published(&publication(SessionId::new(), question, t0()))
            .await
            .unwrap();

        let other = store
            .latest_publication(SessionId::new(), question)
            .await
            .unwrap();
        assert!(other.is_none());
    }

    #[tokio::test]
    async fn upsert_session_replaces_start_but_keeps_end() {
        let store = create_test_store().await;
        let session = QuizSession {
            session_id: SessionId::new(),
            quiz_id: QuizId::new(),
            classroom_id: ClassroomId::new(),
            started_at: t0(),
            ended_at: None,
        };
        store.upsert_session(&session).await.unwrap();
        assert!(
            store
                .end_session(session.session_id, t0() + Duration::minutes(20))
                .await
                .unwrap()
        );

        let restarted = QuizSession {
            started_at: t0() + Duration::minutes(1),
            ..session.clone()
        };
        store.upsert_session(&restarted).await.unwrap();

        let stored = store.get_session(session.session_id).await.unwrap().unwrap();
        assert_eq!(stored.started_at, t0() + Duration::minutes(1));
        assert_eq!(stored.ended_at, Some(t0() + Duration::minutes(20)));
    }

    #[tokio::test]
    async fn end_unknown_session_reports_false() {
        let store = create_test_store().await;
        assert!(!store.end_session(SessionId::new(), t0()).await.unwrap());
    }
}
