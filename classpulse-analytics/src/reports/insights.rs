//! Qualitative ratings attached to report results.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::types::DropoffPoint;

pub const RESPONSE_RATE_BENCHMARK: &str = "Industry average: 85%";
pub const LATENCY_BENCHMARK: &str = "Target: <30s for optimal engagement";
pub const COMPLETION_BENCHMARK: &str = "Target completion rate: >80%";

/// Class accuracy, in percent, a classroom is measured against.
pub const TARGET_ACCURACY: f64 = 75.0;
/// Class participation, in percent, a classroom is measured against.
pub const TARGET_PARTICIPATION: f64 = 80.0;
/// Average response time a classroom is measured against.
pub const OPTIMAL_RESPONSE_TIME: Duration = Duration::from_secs(30);

/// Dropoff rate from which a question is flagged.
pub const CRITICAL_DROPOFF_RATE: f64 = 25.0;
const HIGH_DROPOFF_RATE: f64 = 30.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngagementLevel {
    Excellent,
    Good,
    Moderate,
    Low,
}

impl EngagementLevel {
    #[must_use]
    pub fn from_response_rate(rate: f64) -> Self {
        match rate {
            r if r >= 90.0 => Self::Excellent,
            r if r >= 75.0 => Self::Good,
            r if r >= 60.0 => Self::Moderate,
            _ => Self::Low,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpeedRating {
    Fast,
    Moderate,
    Slow,
}

impl SpeedRating {
    #[must_use]
    pub fn from_average(latency: Duration) -> Self {
        if latency <= Duration::from_secs(15) {
            Self::Fast
        } else if latency <= Duration::from_secs(30) {
            Self::Moderate
        } else {
            Self::Slow
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DifficultyIndicator {
    HighDifficulty,
    ModerateDifficulty,
    AppropriateDifficulty,
}

impl DifficultyIndicator {
    #[must_use]
    pub fn from_rates(timeout_rate: f64, skipped_rate: f64) -> Self {
        let combined = timeout_rate + skipped_rate;
        if combined >= 30.0 {
            Self::HighDifficulty
        } else if combined >= 15.0 {
            Self::ModerateDifficulty
        } else {
            Self::AppropriateDifficulty
        }
    }
}

#[must_use]
pub fn timeout_recommendation(timeout_rate: f64) -> &'static str {
    if timeout_rate >= 20.0 {
        "Consider increasing time limit or simplifying question"
    } else if timeout_rate >= 10.0 {
        "Monitor question difficulty and time allocation"
    } else {
        "Time allocation appears appropriate"
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetentionLevel {
    Excellent,
    Good,
    Moderate,
    Concerning,
}

impl RetentionLevel {
    #[must_use]
    pub fn from_completion_rate(rate: f64) -> Self {
        match rate {
            r if r >= 85.0 => Self::Excellent,
            r if r >= 70.0 => Self::Good,
            r if r >= 50.0 => Self::Moderate,
            _ => Self::Concerning,
        }
    }
}

/// Questions whose dropoff reaches [`CRITICAL_DROPOFF_RATE`].
#[must_use]
pub fn critical_dropoff_points(points: &[DropoffPoint]) -> Vec<DropoffPoint> {
    points
        .iter()
        .filter(|p| p.dropoff_rate >= CRITICAL_DROPOFF_RATE)
        .cloned()
        .collect()
}

#[must_use]
pub fn dropoff_recommendations(points: &[DropoffPoint]) -> Vec<String> {
    let recommendation = if points.iter().any(|p| p.dropoff_rate >= HIGH_DROPOFF_RATE) {
        "Review question difficulty and clarity for high drop-off points"
    } else {
        "Retention rates are healthy"
    };
    vec![recommendation.to_string()]
}

/// Accuracy band of a student or class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PerformanceLevel {
    Excellent,
    Good,
    Satisfactory,
    NeedsImprovement,
    Poor,
}

impl PerformanceLevel {
    #[must_use]
    pub fn from_accuracy(accuracy: f64) -> Self {
        match accuracy {
            a if a >= 90.0 => Self::Excellent,
            a if a >= 75.0 => Self::Good,
            a if a >= 60.0 => Self::Satisfactory,
            a if a >= 40.0 => Self::NeedsImprovement,
            _ => Self::Poor,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseSpeed {
    VeryFast,
    Fast,
    Moderate,
    Slow,
    VerySlow,
}

impl ResponseSpeed {
    #[must_use]
    pub fn from_average(latency: Duration) -> Self {
        match latency.as_secs_f64() {
            s if s <= 10.0 => Self::VeryFast,
            s if s <= 30.0 => Self::Fast,
            s if s <= 60.0 => Self::Moderate,
            s if s <= 120.0 => Self::Slow,
            _ => Self::VerySlow,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParticipationLevel {
    Outstanding,
    Strong,
    Moderate,
    Weak,
    VeryLow,
}

impl ParticipationLevel {
    #[must_use]
    pub fn from_rate(rate: f64) -> Self {
        match rate {
            r if r >= 90.0 => Self::Outstanding,
            r if r >= 75.0 => Self::Strong,
            r if r >= 50.0 => Self::Moderate,
            r if r >= 25.0 => Self::Weak,
            _ => Self::VeryLow,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityLevel {
    HighlyActive,
    Active,
    ModeratelyActive,
    MinimallyActive,
    Inactive,
}

impl ActivityLevel {
    #[must_use]
    pub fn from_sessions(sessions: u64) -> Self {
        match sessions {
            10.. => Self::HighlyActive,
            5..=9 => Self::Active,
            2..=4 => Self::ModeratelyActive,
            1 => Self::MinimallyActive,
            0 => Self::Inactive,
        }
    }
}

#[must_use]
pub fn effectiveness_recommendation(score: f64) -> &'static str {
    if score >= 80.0 {
        "Quiz is performing well. Consider similar content."
    } else if score >= 60.0 {
        "Quiz has moderate effectiveness. Review difficult questions."
    } else {
        "Quiz needs improvement. Consider revising content and delivery."
    }
}

/// Overall rating of a quiz from its effectiveness score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PerformanceRating {
    Excellent,
    Good,
    Average,
    BelowAverage,
    NeedsImprovement,
}

impl PerformanceRating {
    #[must_use]
    pub fn from_score(score: f64) -> Self {
        match score {
            s if s >= 90.0 => Self::Excellent,
            s if s >= 75.0 => Self::Good,
            s if s >= 60.0 => Self::Average,
            s if s >= 40.0 => Self::BelowAverage,
            _ => Self::NeedsImprovement,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UsageFrequency {
    High,
    Moderate,
    Low,
    Minimal,
}

impl UsageFrequency {
    #[must_use]
    pub fn from_sessions(sessions: u64) -> Self {
        match sessions {
            20.. => Self::High,
            10..=19 => Self::Moderate,
            5..=9 => Self::Low,
            _ => Self::Minimal,
        }
    }
}

/// How many classrooms a quiz has been run in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Reach {
    Wide,
    Moderate,
    Limited,
    SingleClassroom,
}

impl Reach {
    #[must_use]
    pub fn from_classrooms(classrooms: u64) -> Self {
        match classrooms {
            10.. => Self::Wide,
            5..=9 => Self::Moderate,
            2..=4 => Self::Limited,
            _ => Self::SingleClassroom,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionDifficulty {
    TooEasy,
    Appropriate,
    Challenging,
    TooDifficult,
}

impl QuestionDifficulty {
    #[must_use]
    pub fn from_accuracy(accuracy: f64) -> Self {
        match accuracy {
            a if a >= 90.0 => Self::TooEasy,
            a if a >= 70.0 => Self::Appropriate,
            a if a >= 50.0 => Self::Challenging,
            _ => Self::TooDifficult,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseQuality {
    Quick,
    Moderate,
    Slow,
    VerySlow,
}

impl ResponseQuality {
    #[must_use]
    pub fn from_average(latency: Duration) -> Self {
        match latency.as_secs_f64() {
            s if s <= 10.0 => Self::Quick,
            s if s <= 30.0 => Self::Moderate,
            s if s <= 60.0 => Self::Slow,
            _ => Self::VerySlow,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionEffectiveness {
    HighlyEffective,
    Effective,
    NeedsMoreData,
    NeedsImprovement,
}

impl QuestionEffectiveness {
    #[must_use]
    pub fn from_results(accuracy: f64, attempts: u64) -> Self {
        if accuracy >= 70.0 && attempts >= 10 {
            Self::HighlyEffective
        } else if accuracy >= 50.0 && attempts >= 5 {
            Self::Effective
        } else if attempts < 5 {
            Self::NeedsMoreData
        } else {
            Self::NeedsImprovement
        }
    }
}

/// Share of a classroom's sessions that are recent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionActivity {
    High,
    Moderate,
    Low,
    Inactive,
    NoActivity,
}

impl SessionActivity {
    #[must_use]
    pub fn from_sessions(recent: u64, total: u64) -> Self {
        if total == 0 {
            return Self::NoActivity;
        }
        match recent as f64 * 100.0 / total as f64 {
            r if r >= 50.0 => Self::High,
            r if r >= 25.0 => Self::Moderate,
            r if r > 0.0 => Self::Low,
            _ => Self::Inactive,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngagementStatus {
    HighlyEngaged,
    WellEngaged,
    ModeratelyEngaged,
    LowEngagement,
    NoEngagement,
    NoStudents,
}

impl EngagementStatus {
    #[must_use]
    pub fn from_students(active: u64, total: u64) -> Self {
        if total == 0 {
            return Self::NoStudents;
        }
        match active as f64 * 100.0 / total as f64 {
            r if r >= 80.0 => Self::HighlyEngaged,
            r if r >= 60.0 => Self::WellEngaged,
            r if r >= 40.0 => Self::ModeratelyEngaged,
            r if r > 0.0 => Self::LowEngagement,
            _ => Self::NoEngagement,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrowthTrend {
    Accelerating,
    Growing,
    Steady,
    Stagnant,
}

impl GrowthTrend {
    #[must_use]
    pub fn from_recent_sessions(recent: u64) -> Self {
        match recent {
            5.. => Self::Accelerating,
            3..=4 => Self::Growing,
            1..=2 => Self::Steady,
            0 => Self::Stagnant,
        }
    }
}

/// Depth of engagement from answers per participating student.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngagementQuality {
    DeepEngagement,
    GoodEngagement,
    ModerateEngagement,
    LightEngagement,
    MinimalEngagement,
    NoEngagement,
}

impl EngagementQuality {
    #[must_use]
    pub fn from_answers(answers: u64, participants: u64) -> Self {
        if participants == 0 {
            return Self::NoEngagement;
        }
        match answers as f64 / participants as f64 {
            r if r >= 20.0 => Self::DeepEngagement,
            r if r >= 10.0 => Self::GoodEngagement,
            r if r >= 5.0 => Self::ModerateEngagement,
            r if r >= 1.0 => Self::LightEngagement,
            _ => Self::MinimalEngagement,
        }
    }
}

/// How evenly a student's sessions spread over distinct quizzes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngagementConsistency {
    VeryConsistent,
    Consistent,
    SomewhatConsistent,
    Inconsistent,
    VeryInconsistent,
    NoData,
}

impl EngagementConsistency {
    #[must_use]
    pub fn from_counts(sessions: u64, quizzes: u64) -> Self {
        if sessions == 0 {
            return Self::NoData;
        }
        match quizzes as f64 / sessions as f64 {
            r if r >= 0.8 => Self::VeryConsistent,
            r if r >= 0.6 => Self::Consistent,
            r if r >= 0.4 => Self::SomewhatConsistent,
            r if r >= 0.2 => Self::Inconsistent,
            _ => Self::VeryInconsistent,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use classpulse_store::QuestionId;

    fn point(rate: f64) -> DropoffPoint {
        DropoffPoint {
            question_id: QuestionId::new(),
            question_order: 1,
            students_at_start: 10,
            students_at_end: 10,
            dropoff_rate: rate,
        }
    }

    #[test]
    fn engagement_thresholds_are_inclusive() {
        assert_eq!(EngagementLevel::from_response_rate(90.0), EngagementLevel::Excellent);
        assert_eq!(EngagementLevel::from_response_rate(75.0), EngagementLevel::Good);
        assert_eq!(EngagementLevel::from_response_rate(60.0), EngagementLevel::Moderate);
        assert_eq!(EngagementLevel::from_response_rate(40.0), EngagementLevel::Low);
    }

    #[test]
    fn speed_rating_uses_average_latency() {
        assert_eq!(SpeedRating::from_average(Duration::from_secs(15)), SpeedRating::Fast);
        assert_eq!(SpeedRating::from_average(Duration::from_secs(20)), SpeedRating::Moderate);
        assert_eq!(SpeedRating::from_average(Duration::from_secs(31)), SpeedRating::Slow);
    }

    #[test]
    fn difficulty_combines_timeout_and_skips() {
        assert_eq!(
            DifficultyIndicator::from_rates(20.0, 10.0),
            DifficultyIndicator::HighDifficulty
        );
        assert_eq!(
            DifficultyIndicator::from_rates(15.0, 0.0),
            DifficultyIndicator::ModerateDifficulty
        );
        assert_eq!(timeout_recommendation(60.0), "Consider increasing time limit or simplifying question");
        assert_eq!(timeout_recommendation(5.0), "Time allocation appears appropriate");
    }

    #[test]
    fn dropoff_analysis_flags_steep_questions() {
        let points = [point(0.0), point(25.0), point(40.0)];
        assert_eq!(critical_dropoff_points(&points).len(), 2);
        assert_eq!(
            dropoff_recommendations(&points),
            vec!["Review question difficulty and clarity for high drop-off points"]
        );
        assert_eq!(
            dropoff_recommendations(&[point(26.0)]),
            vec!["Retention rates are healthy"]
        );
    }

    #[test]
    fn quiz_and_question_bands() {
        assert_eq!(PerformanceRating::from_score(65.0), PerformanceRating::Average);
        assert_eq!(PerformanceRating::from_score(39.9), PerformanceRating::NeedsImprovement);
        assert_eq!(UsageFrequency::from_sessions(10), UsageFrequency::Moderate);
        assert_eq!(UsageFrequency::from_sessions(4), UsageFrequency::Minimal);
        assert_eq!(Reach::from_classrooms(1), Reach::SingleClassroom);
        assert_eq!(Reach::from_classrooms(2), Reach::Limited);
        assert_eq!(QuestionDifficulty::from_accuracy(66.67), QuestionDifficulty::Challenging);
        assert_eq!(
            ResponseQuality::from_average(Duration::from_secs(10)),
            ResponseQuality::Quick
        );
        assert_eq!(
            QuestionEffectiveness::from_results(100.0, 4),
            QuestionEffectiveness::NeedsMoreData
        );
        assert_eq!(
            QuestionEffectiveness::from_results(40.0, 12),
            QuestionEffectiveness::NeedsImprovement
        );
    }

    #[test]
    fn classroom_bands_handle_empty_populations() {
        assert_eq!(SessionActivity::from_sessions(0, 0), SessionActivity::NoActivity);
        assert_eq!(SessionActivity::from_sessions(0, 4), SessionActivity::Inactive);
        assert_eq!(SessionActivity::from_sessions(1, 4), SessionActivity::Moderate);
        assert_eq!(EngagementStatus::from_students(0, 0), EngagementStatus::NoStudents);
        assert_eq!(EngagementStatus::from_students(8, 10), EngagementStatus::HighlyEngaged);
        assert_eq!(GrowthTrend::from_recent_sessions(0), GrowthTrend::Stagnant);
        assert_eq!(EngagementQuality::from_answers(3, 0), EngagementQuality::NoEngagement);
        assert_eq!(EngagementQuality::from_answers(3, 2), EngagementQuality::LightEngagement);
        assert_eq!(EngagementConsistency::from_counts(0, 0), EngagementConsistency::NoData);
        assert_eq!(
            EngagementConsistency::from_counts(5, 1),
            EngagementConsistency::Inconsistent
        );
    }

    #[test]
    fn ratings_serialize_snake_case() {
        assert_eq!(
            serde_json::to_value(DifficultyIndicator::AppropriateDifficulty).unwrap(),
            "appropriate_difficulty"
        );
        assert_eq!(
            serde_json::to_value(ActivityLevel::from_sessions(3)).unwrap(),
            "moderately_active"
        );
    }
}
