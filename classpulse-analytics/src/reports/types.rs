//! Report results. All serialize to JSON for the outbound boundary.

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};
use classpulse_store::{
    ClassroomId, PaginatedResponse, QuestionId, QuizId, QuizQuestionRow, SessionId,
    SessionSummaryRow, StudentId,
};
use serde::{Deserialize, Serialize};

use super::insights::{
    ActivityLevel, DifficultyIndicator, EngagementConsistency, EngagementLevel, EngagementQuality,
    EngagementStatus, GrowthTrend, ParticipationLevel, PerformanceLevel, PerformanceRating,
    QuestionDifficulty, QuestionEffectiveness, Reach, ResponseQuality, ResponseSpeed,
    RetentionLevel, SessionActivity, SpeedRating, UsageFrequency,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParticipantMetrics {
    pub student_id: StudentId,
    pub student_name: Option<String>,
    pub last_activity: DateTime<Utc>,
    pub answers_submitted: u64,
    pub correct_answers: u64,
    /// Percentage of this student's answers that were correct.
    pub accuracy: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActiveParticipantsReport {
    pub session_id: SessionId,
    #[serde(with = "humantime_serde")]
    pub window: Duration,
    pub participants: PaginatedResponse<ParticipantMetrics>,
    /// Mean accuracy over the participants on this page.
    pub average_accuracy_percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseAnalysis {
    pub engagement_level: EngagementLevel,
    pub benchmark: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseRate {
    pub session_id: SessionId,
    pub question_id: QuestionId,
    pub students_received: u64,
    pub students_answered: u64,
    pub response_rate: f64,
    pub analysis: ResponseAnalysis,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LatencyAnalysis {
    pub speed_rating: SpeedRating,
    pub benchmark: String,
}

/// Publish-to-answer durations for one question. Zero when unanswered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Latency {
    pub session_id: SessionId,
    pub question_id: QuestionId,
    pub answers: u64,
    #[serde(with = "humantime_serde")]
    pub first_answer_latency: Duration,
    #[serde(with = "humantime_serde")]
    pub average_latency: Duration,
    #[serde(with = "humantime_serde")]
    pub median_latency: Duration,
    pub analysis: LatencyAnalysis,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeoutAnalysis {
    pub difficulty_indicator: DifficultyIndicator,
    pub recommendation: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeoutAndSkipped {
    pub session_id: SessionId,
    pub question_id: QuestionId,
    pub total_students: u64,
    pub timeout_count: u64,
    /// No event marks a question as skipped, so this stays zero.
    pub skipped_count: u64,
    pub timeout_rate: f64,
    pub skipped_rate: f64,
    pub analysis: TimeoutAnalysis,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionAnalysis {
    pub retention_level: RetentionLevel,
    pub benchmark: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionRate {
    pub session_id: SessionId,
    pub total_students: u64,
    /// Students who answered every published question.
    pub completed_students: u64,
    pub completion_rate: f64,
    pub total_questions: u64,
    /// Mean share of questions answered, over students who answered any.
    pub average_completion: f64,
    pub analysis: CompletionAnalysis,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DropoffPoint {
    pub question_id: QuestionId,
    /// 1-based position by first publish time.
    pub question_order: u32,
    pub students_at_start: u64,
    pub students_at_end: u64,
    pub dropoff_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DropoffAnalysis {
    pub critical_points: Vec<DropoffPoint>,
    pub recommendations: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DropoffReport {
    pub session_id: SessionId,
    pub dropoff_points: Vec<DropoffPoint>,
    pub analysis: DropoffAnalysis,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentRanking {
    pub student_id: StudentId,
    pub student_name: Option<String>,
    pub answers_submitted: u64,
    pub correct_answers: u64,
    pub accuracy_rate: f64,
    pub rank: u64,
    pub percentile: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionsPerMinute {
    pub session_id: SessionId,
    pub total_questions: u64,
    /// Publications per minute over the publishing span, at least one minute.
    pub average_qpm: f64,
    /// Most publications within any one-minute window.
    pub peak_qpm: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentPerformance {
    pub student_id: StudentId,
    pub classroom_id: ClassroomId,
    pub questions_attempted: u64,
    pub correct_answers: u64,
    pub overall_accuracy_percent: f64,
    #[serde(default, with = "humantime_serde")]
    pub average_response_time: Option<Duration>,
    pub performance_level: PerformanceLevel,
    pub response_speed: Option<ResponseSpeed>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassroomEngagement {
    pub classroom_id: ClassroomId,
    #[serde(with = "humantime_serde")]
    pub window: Duration,
    pub total_students: u64,
    pub active_students: u64,
    pub engagement_rate_percent: f64,
    pub average_accuracy_percent: f64,
    pub total_questions: u64,
    /// Answers over the answers active students could have given.
    pub response_rate_percent: f64,
    pub participation_level: ParticipationLevel,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentEffectiveness {
    pub quiz_id: QuizId,
    pub total_questions: u64,
    pub average_accuracy: f64,
    pub overall_engagement: f64,
    /// Mean of accuracy and engagement.
    pub effectiveness_score: f64,
    pub recommendations: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentPerformanceSummary {
    pub student_id: StudentId,
    pub student_name: Option<String>,
    pub answers_submitted: u64,
    pub correct_answers: u64,
    pub accuracy_rate: f64,
    pub sessions_participated: u64,
    pub performance_level: PerformanceLevel,
    pub activity_level: ActivityLevel,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentPerformanceList {
    pub classroom_id: ClassroomId,
    pub students: PaginatedResponse<StudentPerformanceSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionOverview {
    #[serde(flatten)]
    pub session: SessionSummaryRow,
    #[serde(default, with = "humantime_serde")]
    pub duration: Option<Duration>,
    /// Answers over participants × questions.
    pub response_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassroomSessions {
    pub classroom_id: ClassroomId,
    pub sessions: PaginatedResponse<SessionOverview>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizSessions {
    pub quiz_id: QuizId,
    pub sessions: PaginatedResponse<SessionOverview>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizUsageStatistics {
    pub total_sessions: u64,
    pub total_classrooms: u64,
    /// Students who answered in any session of the quiz.
    pub total_students: u64,
    pub total_questions: u64,
    pub first_used: Option<DateTime<Utc>>,
    pub last_used: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizPerformanceMetrics {
    pub average_accuracy: f64,
    /// Published questions answered over those answerable by participants.
    pub average_completion: f64,
    pub overall_engagement: f64,
    pub effectiveness_score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizInsights {
    pub performance_rating: PerformanceRating,
    pub usage_frequency: UsageFrequency,
    pub reach: Reach,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizSummary {
    pub quiz_id: QuizId,
    pub title: Option<String>,
    pub usage_statistics: QuizUsageStatistics,
    pub performance_metrics: QuizPerformanceMetrics,
    pub insights: QuizInsights,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionUsage {
    pub total_attempts: u64,
    pub correct_attempts: u64,
    /// Sessions that published the question.
    pub usage_count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionInsights {
    pub difficulty_level: QuestionDifficulty,
    pub response_quality: Option<ResponseQuality>,
    pub effectiveness: QuestionEffectiveness,
}

/// One question across every session that asked it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionAnalysis {
    pub question_id: QuestionId,
    pub quiz_id: Option<QuizId>,
    pub usage_stats: QuestionUsage,
    pub accuracy_rate: f64,
    #[serde(default, with = "humantime_serde")]
    pub average_response_time: Option<Duration>,
    pub answer_distribution: BTreeMap<String, u64>,
    pub insights: QuestionInsights,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizQuestionSummary {
    #[serde(flatten)]
    pub question: QuizQuestionRow,
    pub accuracy_rate: f64,
    /// `None` until the question has been answered.
    pub difficulty: Option<QuestionDifficulty>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizQuestions {
    pub quiz_id: QuizId,
    pub questions: PaginatedResponse<QuizQuestionSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngagementPeriod {
    pub date: NaiveDate,
    pub sessions: u64,
    pub questions_published: u64,
    pub active_students: u64,
    pub total_answers: u64,
    /// Active students over the classroom roster.
    pub engagement_rate: f64,
    pub accuracy_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngagementHistory {
    pub classroom_id: ClassroomId,
    #[serde(with = "humantime_serde")]
    pub window: Duration,
    pub total_students: u64,
    pub periods: PaginatedResponse<EngagementPeriod>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassroomInsights {
    pub activity_level: SessionActivity,
    pub engagement_status: EngagementStatus,
    pub growth_trend: GrowthTrend,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassroomOverview {
    pub classroom_id: ClassroomId,
    pub name: Option<String>,
    pub total_students: u64,
    pub active_students: u64,
    pub total_sessions: u64,
    pub recent_sessions: u64,
    pub total_quizzes: u64,
    pub last_session_at: Option<DateTime<Utc>>,
    pub participation_rate: f64,
    /// Recent sessions as a percentage of all sessions.
    pub activity_score: f64,
    pub insights: ClassroomInsights,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassPerformanceInsights {
    pub performance_level: PerformanceLevel,
    pub participation_level: ParticipationLevel,
    pub engagement_quality: EngagementQuality,
    pub response_speed: Option<ResponseSpeed>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceBenchmarks {
    pub target_accuracy: f64,
    pub target_participation: f64,
    #[serde(with = "humantime_serde")]
    pub optimal_response_time: Duration,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassPerformanceSummary {
    pub classroom_id: ClassroomId,
    pub total_students: u64,
    pub participating_students: u64,
    pub total_sessions: u64,
    pub total_questions_answered: u64,
    pub overall_accuracy: f64,
    pub overall_participation: f64,
    #[serde(default, with = "humantime_serde")]
    pub average_response_time: Option<Duration>,
    pub insights: ClassPerformanceInsights,
    pub benchmarks: PerformanceBenchmarks,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentActivityInsights {
    pub activity_level: ActivityLevel,
    pub performance_trend: PerformanceLevel,
    pub engagement_consistency: EngagementConsistency,
    pub response_efficiency: Option<ResponseSpeed>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentActivitySummary {
    pub student_id: StudentId,
    pub classroom_id: ClassroomId,
    pub sessions_participated: u64,
    pub unique_quizzes: u64,
    pub questions_answered: u64,
    pub correct_answers: u64,
    pub overall_accuracy: f64,
    #[serde(default, with = "humantime_serde")]
    pub average_response_time: Option<Duration>,
    pub first_activity: Option<DateTime<Utc>>,
    pub last_activity: Option<DateTime<Utc>>,
    pub questions_per_session: f64,
    /// Distinct quizzes per session as a percentage, capped at 100.
    pub quiz_variety_score: f64,
    pub insights: StudentActivityInsights,
}
