//! Reports scoped to one quiz session or question.

use std::time::Duration;

use chrono::TimeDelta;
use classpulse_store::{
    PaginatedResponse, PaginationParams, QuestionId, RankingScope, SessionId,
};
use tracing::{debug, instrument};

use super::insights::{
    COMPLETION_BENCHMARK, DifficultyIndicator, EngagementLevel, LATENCY_BENCHMARK,
    RESPONSE_RATE_BENCHMARK, RetentionLevel, SpeedRating, critical_dropoff_points,
    dropoff_recommendations, timeout_recommendation,
};
use super::stats::{mean, millis, peak_in_window, percentage, percentile, rank_percentile, round2};
use super::types::{
    ActiveParticipantsReport, CompletionAnalysis, CompletionRate, DropoffAnalysis, DropoffPoint,
    DropoffReport, Latency, LatencyAnalysis, ParticipantMetrics, QuestionsPerMinute,
    ResponseAnalysis, ResponseRate, StudentRanking, TimeoutAnalysis, TimeoutAndSkipped,
};
use super::{ReportAggregator, window_start};
use crate::error::Result;

impl ReportAggregator {
    /// Students who answered within the last `window`, most recent first.
    #[instrument(skip(self), level = "debug")]
    pub async fn active_participants(
        &self,
        session_id: SessionId,
        window: Duration,
        pagination: PaginationParams,
    ) -> Result<ActiveParticipantsReport> {
        let page = self
            .store
            .active_participants(session_id, window_start(window), pagination)
            .await?;

        let participants = page.map(|row| ParticipantMetrics {
            accuracy: percentage(row.correct_answers, row.answers_submitted),
            student_id: row.student_id,
            student_name: row.student_name,
            last_activity: row.last_activity,
            answers_submitted: row.answers_submitted,
            correct_answers: row.correct_answers,
        });
        let accuracies: Vec<f64> = participants.data.iter().map(|p| p.accuracy).collect();
        let average_accuracy_percent = if accuracies.is_empty() {
            0.0
        } else {
            round2(accuracies.iter().sum::<f64>() / accuracies.len() as f64)
        };

        Ok(ActiveParticipantsReport {
            session_id,
            window,
            participants,
            average_accuracy_percent,
        })
    }

    /// Share of the classroom roster that answered a question.
    #[instrument(skip(self), level = "debug")]
    pub async fn response_rate(
        &self,
        session_id: SessionId,
        question_id: QuestionId,
    ) -> Result<ResponseRate> {
        let students_received = self.store.session_roster_size(session_id).await?;
        let students_answered = self
            .store
            .question_answerers(session_id, question_id)
            .await?;
        let response_rate = percentage(students_answered, students_received);

        Ok(ResponseRate {
            session_id,
            question_id,
            students_received,
            students_answered,
            response_rate,
            analysis: ResponseAnalysis {
                engagement_level: EngagementLevel::from_response_rate(response_rate),
                benchmark: RESPONSE_RATE_BENCHMARK.to_string(),
            },
        })
    }

    /// First, mean and median time from publication to answer.
    #[instrument(skip(self), level = "debug")]
    pub async fn latency(&self, session_id: SessionId, question_id: QuestionId) -> Result<Latency> {
        let latencies = self
            .store
            .answer_latencies_ms(session_id, question_id)
            .await?;

        let first = latencies.first().map_or(0.0, |ms| *ms as f64);
        let average_latency = millis(mean(&latencies).unwrap_or_default());
        let median = percentile(&latencies, 0.5).unwrap_or_default();

        Ok(Latency {
            session_id,
            question_id,
            answers: latencies.len() as u64,
            first_answer_latency: millis(first),
            average_latency,
            median_latency: millis(median),
            analysis: LatencyAnalysis {
                speed_rating: SpeedRating::from_average(average_latency),
                benchmark: LATENCY_BENCHMARK.to_string(),
            },
        })
    }

    /// Roster members who never answered a question count as timed out.
    #[instrument(skip(self), level = "debug")]
    pub async fn timeout_and_skipped(
        &self,
        session_id: SessionId,
        question_id: QuestionId,
    ) -> Result<TimeoutAndSkipped> {
        let total_students = self.store.session_roster_size(session_id).await?;
        let answered = self
            .store
            .question_answerers(session_id, question_id)
            .await?;
        let timeout_count = total_students.saturating_sub(answered);
        let skipped_count = 0;
        let timeout_rate = percentage(timeout_count, total_students);
        let skipped_rate = percentage(skipped_count, total_students);

        Ok(TimeoutAndSkipped {
            session_id,
            question_id,
            total_students,
            timeout_count,
            skipped_count,
            timeout_rate,
            skipped_rate,
            analysis: TimeoutAnalysis {
                difficulty_indicator: DifficultyIndicator::from_rates(timeout_rate, skipped_rate),
                recommendation: timeout_recommendation(timeout_rate).to_string(),
            },
        })
    }

    /// Share of the roster that answered every published question.
    #[instrument(skip(self), level = "debug")]
    pub async fn completion_rate(&self, session_id: SessionId) -> Result<CompletionRate> {
        let progress = self.store.session_progress(session_id).await?;
        let total_questions = progress.questions_published;

        let completed_students = if total_questions == 0 {
            0
        } else {
            progress
                .answered_per_student
                .iter()
                .filter(|answered| **answered >= total_questions)
                .count() as u64
        };
        let completion_rate = percentage(completed_students, progress.roster_size);

        let shares: Vec<f64> = progress
            .answered_per_student
            .iter()
            .map(|answered| *answered as f64 * 100.0 / total_questions.max(1) as f64)
            .collect();
        let average_completion = if shares.is_empty() {
            0.0
        } else {
            round2(shares.iter().sum::<f64>() / shares.len() as f64)
        };

        Ok(CompletionRate {
            session_id,
            total_students: progress.roster_size,
            completed_students,
            completion_rate,
            total_questions,
            average_completion,
            analysis: CompletionAnalysis {
                retention_level: RetentionLevel::from_completion_rate(completion_rate),
                benchmark: COMPLETION_BENCHMARK.to_string(),
            },
        })
    }

    /// Per-question funnel against the session's starting roster, in publish
    /// order.
    #[instrument(skip(self), level = "debug")]
    pub async fn dropoff_points(&self, session_id: SessionId) -> Result<DropoffReport> {
        let students_at_start = self.store.session_roster_size(session_id).await?;
        let participation = self.store.question_participation(session_id).await?;

        let dropoff_points: Vec<DropoffPoint> = participation
            .into_iter()
            .map(|question| DropoffPoint {
                question_id: question.question_id,
                question_order: question.order,
                students_at_start,
                students_at_end: question.answerers,
                dropoff_rate: percentage(
                    students_at_start.saturating_sub(question.answerers),
                    students_at_start,
                ),
            })
            .collect();
        debug!(questions = dropoff_points.len(), "dropoff computed");

        Ok(DropoffReport {
            session_id,
            analysis: DropoffAnalysis {
                critical_points: critical_dropoff_points(&dropoff_points),
                recommendations: dropoff_recommendations(&dropoff_points),
            },
            dropoff_points,
        })
    }

    /// Students ranked by accuracy, then by answer volume. Tied students share
    /// a rank and a percentile.
    #[instrument(skip(self), level = "debug")]
    pub async fn student_rankings(
        &self,
        scope: RankingScope,
        pagination: PaginationParams,
    ) -> Result<PaginatedResponse<StudentRanking>> {
        let page = self.store.student_rankings(scope, pagination).await?;
        let population = page.total_count;

        Ok(page.map(|row| StudentRanking {
            percentile: rank_percentile(row.rank, population),
            student_id: row.student_id,
            student_name: row.student_name,
            answers_submitted: row.answers_submitted,
            correct_answers: row.correct_answers,
            accuracy_rate: row.accuracy_rate,
            rank: row.rank,
        }))
    }

    /// Publishing pace over the session.
    #[instrument(skip(self), level = "debug")]
    pub async fn questions_per_minute(&self, session_id: SessionId) -> Result<QuestionsPerMinute> {
        let times = self.store.publication_times(session_id).await?;
        let total_questions = times.len() as u64;

        let span_minutes = match (times.first(), times.last()) {
            (Some(first), Some(last)) => (*last - *first).num_milliseconds() as f64 / 60_000.0,
            _ => 0.0,
        };
        let average_qpm = round2(total_questions as f64 / span_minutes.max(1.0));
        let peak_qpm = peak_in_window(&times, TimeDelta::minutes(1)) as f64;

        debug!(total_questions, average_qpm, "questions per minute computed");
        Ok(QuestionsPerMinute {
            session_id,
            total_questions,
            average_qpm,
            peak_qpm,
        })
    }
}
