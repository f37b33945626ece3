//! Stored entities.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{ClassroomId, EventId, QuestionId, QuizId, SessionId, StudentId, TeacherId};

/// A teacher publishing a question to a running session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionPublished {
    pub event_id: EventId,
    pub session_id: SessionId,
    pub question_id: QuestionId,
    pub teacher_id: Option<TeacherId>,
    pub published_at: DateTime<Utc>,
    /// Zero means the question has no deadline.
    pub timer_duration_secs: u32,
}

impl QuestionPublished {
    /// Latest accepted submission time, or `None` when no timer is set.
    #[must_use]
    pub fn deadline(&self) -> Option<DateTime<Utc>> {
        (self.timer_duration_secs > 0).then(|| {
            self.published_at + chrono::Duration::seconds(i64::from(self.timer_duration_secs))
        })
    }
}

/// A student's answer. `is_correct` is derived at ingestion time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerSubmitted {
    pub event_id: EventId,
    pub session_id: SessionId,
    pub question_id: QuestionId,
    pub student_id: StudentId,
    pub answer: String,
    pub is_correct: bool,
    pub submitted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizSession {
    pub session_id: SessionId,
    pub quiz_id: QuizId,
    pub classroom_id: ClassroomId,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quiz {
    pub quiz_id: QuizId,
    pub title: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub question_id: QuestionId,
    pub quiz_id: QuizId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classroom {
    pub classroom_id: ClassroomId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Student {
    pub student_id: StudentId,
    pub name: Option<String>,
}

/// Result of an idempotent insert keyed by event id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsertOutcome {
    Inserted,
    /// A row with the same event id already existed; nothing was written.
    Duplicate,
}

impl InsertOutcome {
    #[must_use]
    pub fn is_duplicate(self) -> bool {
        matches!(self, Self::Duplicate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn publication(timer: u32) -> QuestionPublished {
        QuestionPublished {
            event_id: EventId::new(),
            session_id: SessionId::new(),
            question_id: QuestionId::new(),
            teacher_id: None,
            published_at: Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap(),
            timer_duration_secs: timer,
        }
    }

    #[test]
    fn deadline_adds_timer_to_publish_time() {
        let p = publication(30);
        assert_eq!(
            p.deadline(),
            Some(Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 30).unwrap())
        );
    }

    #[test]
    fn zero_timer_has_no_deadline() {
        assert_eq!(publication(0).deadline(), None);
    }
}
