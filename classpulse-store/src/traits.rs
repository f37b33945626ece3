//! Storage contracts consumed by ingestion and analytics.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::ids::{ClassroomId, QuestionId, QuizId, SessionId, StudentId};
use crate::pagination::{PaginatedResponse, PaginationParams};
use crate::records::{
    AnswerSubmitted, Classroom, InsertOutcome, Question, QuestionPublished, Quiz, QuizSession,
    Student,
};
use crate::reports::{
    ClassPerformanceRow, ClassroomActivity, ClassroomOverviewRow, EngagementPeriodRow,
    ParticipantRow, QuestionParticipation, QuestionStats, QuizContent, QuizQuestionRow, QuizUsage,
    RankingRow, RankingScope, SessionProgress, SessionSummaryRow, StudentAccuracyRow,
    StudentActivityRow, StudentSummary,
};
use crate::value::{Row, SqlValue};

/// Write side for quiz events.
///
/// Event inserts are idempotent on `event_id`: writing the same event twice
/// stores one row and reports [`InsertOutcome::Duplicate`] the second time.
#[async_trait]
pub trait EventStore: Send + Sync {
    async fn insert_question_published(&self, event: &QuestionPublished) -> Result<InsertOutcome>;

    async fn insert_answer_submitted(&self, event: &AnswerSubmitted) -> Result<InsertOutcome>;

    /// Create the session, or overwrite its quiz, classroom and start time.
    async fn upsert_session(&self, session: &QuizSession) -> Result<()>;

    /// Mark a session as ended. Returns `false` when the session is unknown.
    async fn end_session(&self, session_id: SessionId, ended_at: DateTime<Utc>) -> Result<bool>;

    /// Most recent publication of a question within a session.
    async fn latest_publication(
        &self,
        session_id: SessionId,
        question_id: QuestionId,
    ) -> Result<Option<QuestionPublished>>;

    async fn get_session(&self, session_id: SessionId) -> Result<Option<QuizSession>>;
}

/// Catalog of quizzes, classrooms and enrolments.
#[async_trait]
pub trait RosterStore: Send + Sync {
    async fn create_quiz(&self, quiz: &Quiz) -> Result<()>;

    async fn get_quiz(&self, quiz_id: QuizId) -> Result<Option<Quiz>>;

    async fn create_question(&self, question: &Question) -> Result<()>;

    async fn get_question(&self, question_id: QuestionId) -> Result<Option<Question>>;

    async fn create_classroom(&self, classroom: &Classroom) -> Result<()>;

    async fn create_student(&self, student: &Student) -> Result<()>;

    /// Enrol a student. Enrolling twice is a no-op.
    async fn enroll_student(&self, classroom_id: ClassroomId, student_id: StudentId) -> Result<()>;

    async fn classroom_students(&self, classroom_id: ClassroomId) -> Result<Vec<Student>>;
}

/// Aggregate reads behind the analytics reports.
#[async_trait]
pub trait ReportStore: Send + Sync {
    /// Students who answered in the session since `since`, most recent first.
    async fn active_participants(
        &self,
        session_id: SessionId,
        since: DateTime<Utc>,
        pagination: PaginationParams,
    ) -> Result<PaginatedResponse<ParticipantRow>>;

    /// Every publish time in the session, oldest first.
    async fn publication_times(&self, session_id: SessionId) -> Result<Vec<DateTime<Utc>>>;

    /// Students enrolled in the classroom the session ran in.
    async fn session_roster_size(&self, session_id: SessionId) -> Result<u64>;

    /// Distinct students who answered a question in a session.
    async fn question_answerers(&self, session_id: SessionId, question_id: QuestionId)
    -> Result<u64>;

    /// Milliseconds from the latest publication to each answer, ascending.
    async fn answer_latencies_ms(
        &self,
        session_id: SessionId,
        question_id: QuestionId,
    ) -> Result<Vec<i64>>;

    async fn session_progress(&self, session_id: SessionId) -> Result<SessionProgress>;

    /// Answerers per question, ordered by first publish time.
    async fn question_participation(
        &self,
        session_id: SessionId,
    ) -> Result<Vec<QuestionParticipation>>;

    async fn student_summary(
        &self,
        student_id: StudentId,
        classroom_id: ClassroomId,
    ) -> Result<StudentSummary>;

    /// Activity in sessions of the classroom started since `since`.
    async fn classroom_activity(
        &self,
        classroom_id: ClassroomId,
        since: DateTime<Utc>,
    ) -> Result<ClassroomActivity>;

    async fn quiz_content(&self, quiz_id: QuizId) -> Result<QuizContent>;

    /// Every enrolled student with their answer totals in the classroom.
    async fn student_accuracy_list(
        &self,
        classroom_id: ClassroomId,
        pagination: PaginationParams,
    ) -> Result<PaginatedResponse<StudentAccuracyRow>>;

    /// Sessions of a classroom, newest first.
    async fn classroom_sessions(
        &self,
        classroom_id: ClassroomId,
        pagination: PaginationParams,
    ) -> Result<PaginatedResponse<SessionSummaryRow>>;

    /// Students ranked by accuracy, then by answer volume.
    async fn student_rankings(
        &self,
        scope: RankingScope,
        pagination: PaginationParams,
    ) -> Result<PaginatedResponse<RankingRow>>;

    async fn quiz_usage(&self, quiz_id: QuizId) -> Result<QuizUsage>;

    async fn question_stats(&self, question_id: QuestionId) -> Result<QuestionStats>;

    /// Questions of a quiz, catalogued or published, in first-publish order.
    async fn quiz_questions(
        &self,
        quiz_id: QuizId,
        pagination: PaginationParams,
    ) -> Result<PaginatedResponse<QuizQuestionRow>>;

    /// Sessions that ran a quiz, newest first.
    async fn quiz_sessions(
        &self,
        quiz_id: QuizId,
        pagination: PaginationParams,
    ) -> Result<PaginatedResponse<SessionSummaryRow>>;

    /// One row per day with a session start since `since`, newest first.
    async fn classroom_engagement_history(
        &self,
        classroom_id: ClassroomId,
        since: DateTime<Utc>,
        pagination: PaginationParams,
    ) -> Result<PaginatedResponse<EngagementPeriodRow>>;

    /// Roster and session totals; sessions started since `recent_since` count as recent.
    async fn classroom_overview(
        &self,
        classroom_id: ClassroomId,
        recent_since: DateTime<Utc>,
    ) -> Result<ClassroomOverviewRow>;

    async fn class_performance(&self, classroom_id: ClassroomId) -> Result<ClassPerformanceRow>;

    async fn student_activity(
        &self,
        student_id: StudentId,
        classroom_id: ClassroomId,
    ) -> Result<StudentActivityRow>;
}

/// Executes compiled, parameterized read queries.
#[async_trait]
pub trait QueryExecutor: Send + Sync {
    async fn execute(&self, sql: &str, params: Vec<SqlValue>) -> Result<Vec<Row>>;
}
