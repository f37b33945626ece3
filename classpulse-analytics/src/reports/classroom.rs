//! Reports scoped to a student or classroom, and quiz content effectiveness.

use std::time::Duration;

use classpulse_store::{ClassroomId, PaginationParams, QuizId, SessionSummaryRow, StudentId};
use tracing::instrument;

use super::insights::{
    ActivityLevel, EngagementConsistency, EngagementQuality, EngagementStatus, GrowthTrend,
    OPTIMAL_RESPONSE_TIME, ParticipationLevel, PerformanceLevel, ResponseSpeed, SessionActivity,
    TARGET_ACCURACY, TARGET_PARTICIPATION, effectiveness_recommendation,
};
use super::stats::{millis, percentage, round2};
use super::types::{
    ClassPerformanceInsights, ClassPerformanceSummary, ClassroomEngagement, ClassroomInsights,
    ClassroomOverview, ClassroomSessions, ContentEffectiveness, EngagementHistory,
    EngagementPeriod, PerformanceBenchmarks, SessionOverview, StudentActivityInsights,
    StudentActivitySummary, StudentPerformance, StudentPerformanceList,
    StudentPerformanceSummary,
};
use super::{ReportAggregator, window_start};
use crate::error::Result;

/// Sessions started this recently count as recent in a classroom overview.
pub const RECENT_SESSION_WINDOW: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Duration and response rate of a listed session.
pub(super) fn session_overview(session: SessionSummaryRow) -> SessionOverview {
    let duration = session
        .ended_at
        .and_then(|ended| (ended - session.started_at).to_std().ok());
    let possible_answers = session.participants * session.questions_published;
    SessionOverview {
        response_rate: percentage(session.answers_submitted, possible_answers),
        duration,
        session,
    }
}

impl ReportAggregator {
    /// A student's answers across every session of a classroom.
    #[instrument(skip(self), level = "debug")]
    pub async fn student_performance(
        &self,
        student_id: StudentId,
        classroom_id: ClassroomId,
    ) -> Result<StudentPerformance> {
        let summary = self.store.student_summary(student_id, classroom_id).await?;
        let accuracy = percentage(summary.correct_answers, summary.questions_attempted);
        let average_response_time = summary.average_latency_ms.map(millis);

        Ok(StudentPerformance {
            student_id,
            classroom_id,
            questions_attempted: summary.questions_attempted,
            correct_answers: summary.correct_answers,
            overall_accuracy_percent: accuracy,
            average_response_time,
            performance_level: PerformanceLevel::from_accuracy(accuracy),
            response_speed: average_response_time.map(ResponseSpeed::from_average),
        })
    }

    /// Activity in sessions of the classroom started within `window`.
    #[instrument(skip(self), level = "debug")]
    pub async fn classroom_engagement(
        &self,
        classroom_id: ClassroomId,
        window: Duration,
    ) -> Result<ClassroomEngagement> {
        let activity = self
            .store
            .classroom_activity(classroom_id, window_start(window))
            .await?;
        let engagement_rate = percentage(activity.active_students, activity.total_students);
        let possible_answers = activity.active_students * activity.total_questions;

        Ok(ClassroomEngagement {
            classroom_id,
            window,
            total_students: activity.total_students,
            active_students: activity.active_students,
            engagement_rate_percent: engagement_rate,
            average_accuracy_percent: percentage(activity.correct_answers, activity.total_answers),
            total_questions: activity.total_questions,
            response_rate_percent: percentage(activity.total_answers, possible_answers),
            participation_level: ParticipationLevel::from_rate(engagement_rate),
        })
    }

    /// How well a quiz's questions land, across every session that ran it.
    #[instrument(skip(self), level = "debug")]
    pub async fn content_effectiveness(&self, quiz_id: QuizId) -> Result<ContentEffectiveness> {
        let content = self.store.quiz_content(quiz_id).await?;
        let average_accuracy = percentage(content.correct_answers, content.total_answers);
        let overall_engagement = percentage(content.active_students, content.roster_students);
        let effectiveness_score = round2((average_accuracy + overall_engagement) / 2.0);

        Ok(ContentEffectiveness {
            quiz_id,
            total_questions: content.total_questions,
            average_accuracy,
            overall_engagement,
            effectiveness_score,
            recommendations: effectiveness_recommendation(effectiveness_score).to_string(),
        })
    }

    /// Every enrolled student with accuracy and activity bands.
    #[instrument(skip(self), level = "debug")]
    pub async fn student_performance_list(
        &self,
        classroom_id: ClassroomId,
        pagination: PaginationParams,
    ) -> Result<StudentPerformanceList> {
        let page = self
            .store
            .student_accuracy_list(classroom_id, pagination)
            .await?;

        let students = page.map(|row| {
            let accuracy_rate = percentage(row.correct_answers, row.answers_submitted);
            StudentPerformanceSummary {
                student_id: row.student_id,
                student_name: row.student_name,
                answers_submitted: row.answers_submitted,
                correct_answers: row.correct_answers,
                accuracy_rate,
                sessions_participated: row.sessions_participated,
                performance_level: PerformanceLevel::from_accuracy(accuracy_rate),
                activity_level: ActivityLevel::from_sessions(row.sessions_participated),
            }
        });

        Ok(StudentPerformanceList {
            classroom_id,
            students,
        })
    }

    /// Sessions of a classroom, newest first, with duration and response rate.
    #[instrument(skip(self), level = "debug")]
    pub async fn classroom_sessions(
        &self,
        classroom_id: ClassroomId,
        pagination: PaginationParams,
    ) -> Result<ClassroomSessions> {
        let page = self
            .store
            .classroom_sessions(classroom_id, pagination)
            .await?;

        Ok(ClassroomSessions {
            classroom_id,
            sessions: page.map(session_overview),
        })
    }

    /// Day-by-day activity for sessions started within `window`, newest first.
    #[instrument(skip(self), level = "debug")]
    pub async fn classroom_engagement_history(
        &self,
        classroom_id: ClassroomId,
        window: Duration,
        pagination: PaginationParams,
    ) -> Result<EngagementHistory> {
        let total_students = self.store.class_performance(classroom_id).await?.total_students;
        let page = self
            .store
            .classroom_engagement_history(classroom_id, window_start(window), pagination)
            .await?;

        let periods = page.map(|period| EngagementPeriod {
            date: period.date,
            sessions: period.sessions,
            questions_published: period.questions_published,
            active_students: period.active_students,
            total_answers: period.total_answers,
            engagement_rate: percentage(period.active_students, total_students),
            accuracy_rate: percentage(period.correct_answers, period.total_answers),
        });

        Ok(EngagementHistory {
            classroom_id,
            window,
            total_students,
            periods,
        })
    }

    /// Roster, session totals and how lively the classroom has been lately.
    #[instrument(skip(self), level = "debug")]
    pub async fn classroom_overview(&self, classroom_id: ClassroomId) -> Result<ClassroomOverview> {
        let row = self
            .store
            .classroom_overview(classroom_id, window_start(RECENT_SESSION_WINDOW))
            .await?;

        Ok(ClassroomOverview {
            classroom_id,
            participation_rate: percentage(row.active_students, row.total_students),
            activity_score: percentage(row.recent_sessions, row.total_sessions),
            insights: ClassroomInsights {
                activity_level: SessionActivity::from_sessions(
                    row.recent_sessions,
                    row.total_sessions,
                ),
                engagement_status: EngagementStatus::from_students(
                    row.active_students,
                    row.total_students,
                ),
                growth_trend: GrowthTrend::from_recent_sessions(row.recent_sessions),
            },
            name: row.name,
            total_students: row.total_students,
            active_students: row.active_students,
            total_sessions: row.total_sessions,
            recent_sessions: row.recent_sessions,
            total_quizzes: row.total_quizzes,
            last_session_at: row.last_session_at,
        })
    }

    /// Whole-class accuracy, participation and speed against fixed targets.
    #[instrument(skip(self), level = "debug")]
    pub async fn class_performance_summary(
        &self,
        classroom_id: ClassroomId,
    ) -> Result<ClassPerformanceSummary> {
        let row = self.store.class_performance(classroom_id).await?;
        let overall_accuracy = percentage(row.correct_answers, row.total_answers);
        let overall_participation = percentage(row.participating_students, row.total_students);
        let average_response_time = row.average_latency_ms.map(millis);

        Ok(ClassPerformanceSummary {
            classroom_id,
            total_students: row.total_students,
            participating_students: row.participating_students,
            total_sessions: row.total_sessions,
            total_questions_answered: row.total_answers,
            overall_accuracy,
            overall_participation,
            average_response_time,
            insights: ClassPerformanceInsights {
                performance_level: PerformanceLevel::from_accuracy(overall_accuracy),
                participation_level: ParticipationLevel::from_rate(overall_participation),
                engagement_quality: EngagementQuality::from_answers(
                    row.total_answers,
                    row.participating_students,
                ),
                response_speed: average_response_time.map(ResponseSpeed::from_average),
            },
            benchmarks: PerformanceBenchmarks {
                target_accuracy: TARGET_ACCURACY,
                target_participation: TARGET_PARTICIPATION,
                optimal_response_time: OPTIMAL_RESPONSE_TIME,
            },
        })
    }

    /// How often and how broadly a student takes part in a classroom.
    #[instrument(skip(self), level = "debug")]
    pub async fn student_activity_summary(
        &self,
        student_id: StudentId,
        classroom_id: ClassroomId,
    ) -> Result<StudentActivitySummary> {
        let row = self.store.student_activity(student_id, classroom_id).await?;
        let overall_accuracy = percentage(row.correct_answers, row.questions_answered);
        let average_response_time = row.average_latency_ms.map(millis);
        let sessions = row.sessions_participated;

        let (questions_per_session, quiz_variety_score) = if sessions == 0 {
            (0.0, 0.0)
        } else {
            (
                round2(row.questions_answered as f64 / sessions as f64),
                round2((row.unique_quizzes as f64 * 100.0 / sessions as f64).min(100.0)),
            )
        };

        Ok(StudentActivitySummary {
            student_id,
            classroom_id,
            sessions_participated: sessions,
            unique_quizzes: row.unique_quizzes,
            questions_answered: row.questions_answered,
            correct_answers: row.correct_answers,
            overall_accuracy,
            average_response_time,
            first_activity: row.first_activity,
            last_activity: row.last_activity,
            questions_per_session,
            quiz_variety_score,
            insights: StudentActivityInsights {
                activity_level: ActivityLevel::from_sessions(sessions),
                performance_trend: PerformanceLevel::from_accuracy(overall_accuracy),
                engagement_consistency: EngagementConsistency::from_counts(
                    sessions,
                    row.unique_quizzes,
                ),
                response_efficiency: average_response_time.map(ResponseSpeed::from_average),
            },
        })
    }
}
