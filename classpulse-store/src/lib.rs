//! Relational storage for classpulse.
//!
//! This crate owns the durable side of the system:
//! - [`EventStore`] - Append-only event tables with idempotent inserts
//! - [`RosterStore`] - Quizzes, questions, classrooms and enrolments
//! - [`ReportStore`] - Raw aggregate queries behind the analytics reports
//! - [`QueryExecutor`] - Parameterized ad-hoc SQL for compiled cube queries
//!
//! [`TursoStore`] implements all four on libSQL, either as an embedded file,
//! in memory, or against a remote Turso database.

pub mod error;
pub mod ids;
pub mod pagination;
pub mod records;
pub mod reports;
pub mod traits;
pub mod turso;
pub mod value;

pub use error::{Error, Result};
pub use ids::{ClassroomId, EventId, QuestionId, QuizId, SessionId, StudentId, TeacherId};
pub use pagination::{PaginatedResponse, PaginationParams};
pub use records::{
    AnswerSubmitted, Classroom, InsertOutcome, Question, QuestionPublished, Quiz, QuizSession,
    Student,
};
pub use reports::{
    ClassPerformanceRow, ClassroomActivity, ClassroomOverviewRow, EngagementPeriodRow,
    ParticipantRow, QuestionParticipation, QuestionStats, QuizContent, QuizQuestionRow, QuizUsage,
    RankingRow, RankingScope, SessionProgress, SessionSummaryRow, StudentAccuracyRow,
    StudentActivityRow, StudentSummary,
};
pub use traits::{EventStore, QueryExecutor, ReportStore, RosterStore};
pub use turso::TursoStore;
pub use value::{Row, SqlValue};
