//! Raw rows returned by [`ReportStore`](crate::ReportStore) queries.
//!
//! These carry counts, not rates. Percentages and ratings are derived by the
//! analytics layer so the clamping rules live in one place.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{ClassroomId, QuestionId, QuizId, SessionId, StudentId};

/// Population a ranking is computed over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "scope", content = "id", rename_all = "snake_case")]
pub enum RankingScope {
    Classroom(ClassroomId),
    Session(SessionId),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantRow {
    pub student_id: StudentId,
    pub student_name: Option<String>,
    pub last_activity: DateTime<Utc>,
    pub answers_submitted: u64,
    pub correct_answers: u64,
}

/// Per-session counts behind the completion rate.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionProgress {
    /// Students enrolled in the session's classroom.
    pub roster_size: u64,
    /// Distinct questions published in the session.
    pub questions_published: u64,
    /// Distinct questions answered, one entry per answering student.
    pub answered_per_student: Vec<u64>,
}

/// Answer counts for one question of a session, in publish order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionParticipation {
    pub question_id: QuestionId,
    /// 1-based position by first publish time.
    pub order: u32,
    pub first_published_at: DateTime<Utc>,
    pub answerers: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StudentSummary {
    pub questions_attempted: u64,
    pub correct_answers: u64,
    /// Mean time from publish to answer, when any answer has a publication.
    pub average_latency_ms: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassroomActivity {
    pub total_students: u64,
    pub active_students: u64,
    pub total_questions: u64,
    pub total_answers: u64,
    pub correct_answers: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizContent {
    pub total_questions: u64,
    pub total_answers: u64,
    pub correct_answers: u64,
    pub active_students: u64,
    pub roster_students: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentAccuracyRow {
    pub student_id: StudentId,
    pub student_name: Option<String>,
    pub answers_submitted: u64,
    pub correct_answers: u64,
    pub sessions_participated: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSummaryRow {
    pub session_id: SessionId,
    pub quiz_id: QuizId,
    pub classroom_id: ClassroomId,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub questions_published: u64,
    pub answers_submitted: u64,
    pub participants: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankingRow {
    pub student_id: StudentId,
    pub student_name: Option<String>,
    pub answers_submitted: u64,
    pub correct_answers: u64,
    /// Percentage, rounded to two decimals.
    pub accuracy_rate: f64,
    /// 1-based; tied students share a rank.
    pub rank: u64,
}

/// Reach and results of one quiz across every session that ran it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizUsage {
    pub title: Option<String>,
    pub total_sessions: u64,
    pub total_classrooms: u64,
    /// Distinct students who answered in any session of the quiz.
    pub active_students: u64,
    /// Distinct students enrolled in the classrooms that ran the quiz.
    pub roster_students: u64,
    pub total_questions: u64,
    pub total_answers: u64,
    pub correct_answers: u64,
    /// Distinct (session, student, question) answers to published questions.
    pub answered_questions: u64,
    /// Sum over sessions of answering students × published questions.
    pub possible_answers: u64,
    pub first_used: Option<DateTime<Utc>>,
    pub last_used: Option<DateTime<Utc>>,
}

/// Answers to one question across every session that published it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QuestionStats {
    pub quiz_id: Option<QuizId>,
    pub total_attempts: u64,
    pub correct_attempts: u64,
    /// Sessions that published the question.
    pub usage_count: u64,
    pub average_latency_ms: Option<f64>,
    /// Submissions per answer choice.
    pub answer_distribution: BTreeMap<String, u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizQuestionRow {
    pub question_id: QuestionId,
    /// `None` for a catalogued question no session has published yet.
    pub first_published_at: Option<DateTime<Utc>>,
    pub sessions_used: u64,
    pub total_attempts: u64,
    pub correct_attempts: u64,
}

/// Activity of a classroom on one calendar day (UTC) of session starts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngagementPeriodRow {
    pub date: NaiveDate,
    pub sessions: u64,
    pub questions_published: u64,
    pub active_students: u64,
    pub total_answers: u64,
    pub correct_answers: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassroomOverviewRow {
    pub name: Option<String>,
    pub total_students: u64,
    /// Enrolled students who answered in any session of the classroom.
    pub active_students: u64,
    pub total_sessions: u64,
    /// Sessions started since the cutoff passed to the query.
    pub recent_sessions: u64,
    pub total_quizzes: u64,
    pub last_session_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClassPerformanceRow {
    pub total_students: u64,
    pub participating_students: u64,
    pub total_sessions: u64,
    pub total_answers: u64,
    pub correct_answers: u64,
    pub average_latency_ms: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StudentActivityRow {
    pub sessions_participated: u64,
    pub unique_quizzes: u64,
    pub questions_answered: u64,
    pub correct_answers: u64,
    pub average_latency_ms: Option<f64>,
    pub first_activity: Option<DateTime<Utc>>,
    pub last_activity: Option<DateTime<Utc>>,
}
