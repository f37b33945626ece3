//! Named, parameterized analytics reports.
//!
//! [`ReportAggregator`] turns the raw counts of a [`ReportStore`] into rates,
//! percentiles, rankings and funnels, each annotated with a qualitative
//! analysis. Every division clamps its denominator to at least one, so empty
//! sessions and classrooms produce zeroes rather than errors.

mod classroom;
pub mod insights;
mod quiz;
mod session;
pub mod stats;
mod types;

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use classpulse_store::ReportStore;

pub use classroom::RECENT_SESSION_WINDOW;
pub use types::{
    ActiveParticipantsReport, ClassPerformanceInsights, ClassPerformanceSummary,
    ClassroomEngagement, ClassroomInsights, ClassroomOverview, ClassroomSessions,
    CompletionAnalysis, CompletionRate, ContentEffectiveness, DropoffAnalysis, DropoffPoint,
    DropoffReport, EngagementHistory, EngagementPeriod, Latency, LatencyAnalysis,
    ParticipantMetrics, PerformanceBenchmarks, QuestionAnalysis, QuestionInsights, QuestionUsage,
    QuestionsPerMinute, QuizInsights, QuizPerformanceMetrics, QuizQuestionSummary, QuizQuestions,
    QuizSessions, QuizSummary, QuizUsageStatistics, ResponseAnalysis, ResponseRate,
    SessionOverview, StudentActivityInsights, StudentActivitySummary, StudentPerformance,
    StudentPerformanceList, StudentPerformanceSummary, StudentRanking, TimeoutAnalysis,
    TimeoutAndSkipped,
};

/// Computes reports from a [`ReportStore`]. Read-only; share freely.
#[derive(Clone)]
pub struct ReportAggregator {
    store: Arc<dyn ReportStore>,
}

impl ReportAggregator {
    pub fn new(store: Arc<dyn ReportStore>) -> Self {
        Self { store }
    }
}

/// Start of a lookback window ending now.
fn window_start(window: Duration) -> DateTime<Utc> {
    let now = Utc::now();
    chrono::Duration::from_std(window)
        .ok()
        .and_then(|delta| now.checked_sub_signed(delta))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn huge_windows_reach_back_to_the_beginning() {
        assert_eq!(window_start(Duration::MAX), DateTime::<Utc>::MIN_UTC);
        assert!(window_start(Duration::from_secs(60)) < Utc::now());
    }
}
