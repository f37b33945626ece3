//! Reports scoped to a quiz or one of its questions.

use classpulse_store::{PaginationParams, QuestionId, QuizId};
use tracing::instrument;

use super::classroom::session_overview;
use super::insights::{
    PerformanceRating, QuestionDifficulty, QuestionEffectiveness, Reach, ResponseQuality,
    UsageFrequency,
};
use super::stats::{millis, percentage, round2};
use super::types::{
    QuestionAnalysis, QuestionInsights, QuestionUsage, QuizInsights, QuizPerformanceMetrics,
    QuizQuestionSummary, QuizQuestions, QuizSessions, QuizSummary, QuizUsageStatistics,
};
use super::ReportAggregator;
use crate::error::Result;

impl ReportAggregator {
    /// Usage, results and reach of a quiz across every session that ran it.
    #[instrument(skip(self), level = "debug")]
    pub async fn quiz_summary(&self, quiz_id: QuizId) -> Result<QuizSummary> {
        let usage = self.store.quiz_usage(quiz_id).await?;
        let average_accuracy = percentage(usage.correct_answers, usage.total_answers);
        let overall_engagement = percentage(usage.active_students, usage.roster_students);
        let effectiveness_score = round2((average_accuracy + overall_engagement) / 2.0);

        Ok(QuizSummary {
            quiz_id,
            title: usage.title,
            usage_statistics: QuizUsageStatistics {
                total_sessions: usage.total_sessions,
                total_classrooms: usage.total_classrooms,
                total_students: usage.active_students,
                total_questions: usage.total_questions,
                first_used: usage.first_used,
                last_used: usage.last_used,
            },
            performance_metrics: QuizPerformanceMetrics {
                average_accuracy,
                average_completion: percentage(usage.answered_questions, usage.possible_answers),
                overall_engagement,
                effectiveness_score,
            },
            insights: QuizInsights {
                performance_rating: PerformanceRating::from_score(effectiveness_score),
                usage_frequency: UsageFrequency::from_sessions(usage.total_sessions),
                reach: Reach::from_classrooms(usage.total_classrooms),
            },
        })
    }

    /// Accuracy, speed and answer spread of one question over all its sessions.
    #[instrument(skip(self), level = "debug")]
    pub async fn question_analysis(&self, question_id: QuestionId) -> Result<QuestionAnalysis> {
        let stats = self.store.question_stats(question_id).await?;
        let accuracy_rate = percentage(stats.correct_attempts, stats.total_attempts);
        let average_response_time = stats.average_latency_ms.map(millis);

        Ok(QuestionAnalysis {
            question_id,
            quiz_id: stats.quiz_id,
            usage_stats: QuestionUsage {
                total_attempts: stats.total_attempts,
                correct_attempts: stats.correct_attempts,
                usage_count: stats.usage_count,
            },
            accuracy_rate,
            average_response_time,
            answer_distribution: stats.answer_distribution,
            insights: QuestionInsights {
                difficulty_level: QuestionDifficulty::from_accuracy(accuracy_rate),
                response_quality: average_response_time.map(ResponseQuality::from_average),
                effectiveness: QuestionEffectiveness::from_results(
                    accuracy_rate,
                    stats.total_attempts,
                ),
            },
        })
    }

    #[instrument(skip(self), level = "debug")]
    pub async fn quiz_questions(
        &self,
        quiz_id: QuizId,
        pagination: PaginationParams,
    ) -> Result<QuizQuestions> {
        let page = self.store.quiz_questions(quiz_id, pagination).await?;

        let questions = page.map(|question| {
            let accuracy_rate = percentage(question.correct_attempts, question.total_attempts);
            let difficulty = (question.total_attempts > 0)
                .then(|| QuestionDifficulty::from_accuracy(accuracy_rate));
            QuizQuestionSummary {
                question,
                accuracy_rate,
                difficulty,
            }
        });

        Ok(QuizQuestions { quiz_id, questions })
    }

    /// Sessions that ran a quiz, newest first.
    #[instrument(skip(self), level = "debug")]
    pub async fn quiz_sessions(
        &self,
        quiz_id: QuizId,
        pagination: PaginationParams,
    ) -> Result<QuizSessions> {
        let page = self.store.quiz_sessions(quiz_id, pagination).await?;
        Ok(QuizSessions {
            quiz_id,
            sessions: page.map(session_overview),
        })
    }
}
