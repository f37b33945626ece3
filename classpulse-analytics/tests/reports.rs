//! Reports and compiled queries over an in-memory store.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, NaiveDate, TimeDelta, TimeZone, Utc};
use classpulse_analytics::reports::insights::{
    ActivityLevel, DifficultyIndicator, EngagementConsistency, EngagementLevel, EngagementQuality,
    EngagementStatus, GrowthTrend, ParticipationLevel, PerformanceLevel, PerformanceRating,
    QuestionDifficulty, QuestionEffectiveness, Reach, ResponseQuality, ResponseSpeed,
    RetentionLevel, SessionActivity, SpeedRating, UsageFrequency,
};
use classpulse_analytics::{QueryCompiler, QueryRequest, ReportAggregator};
use classpulse_store::{
    AnswerSubmitted, Classroom, ClassroomId, EventId, EventStore, PaginationParams,
    QuestionId, QuestionPublished, Quiz, QuizId, QuizSession, RankingScope, RosterStore,
    SessionId, Student, StudentId, TursoStore,
};

const ALL_TIME: Duration = Duration::from_secs(100 * 365 * 24 * 3600);

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap()
}

struct Classroom10 {
    store: Arc<TursoStore>,
    reports: ReportAggregator,
    classroom_id: ClassroomId,
    quiz_id: QuizId,
    session_id: SessionId,
    students: Vec<StudentId>,
}

impl Classroom10 {
    async fn with_roster(roster: usize) -> Self {
        let store = Arc::new(TursoStore::new_memory().await.unwrap());
        let classroom_id = ClassroomId::new();
        store
            .create_classroom(&Classroom {
                classroom_id,
                name: "Year 8 Science".to_string(),
            })
            .await
            .unwrap();

        let mut students = Vec::new();
        for i in 0..roster {
            let student_id = StudentId::new();
            store
                .create_student(&Student {
                    student_id,
                    name: Some(format!("pupil-{i:02}")),
                })
                .await
                .unwrap();
            store.enroll_student(classroom_id, student_id).await.unwrap();
            students.push(student_id);
        }

        let quiz_id = QuizId::new();
        store
            .create_quiz(&Quiz {
                quiz_id,
                title: "Photosynthesis".to_string(),
                description: None,
            })
            .await
            .unwrap();
        let session_id = SessionId::new();
        store
            .upsert_session(&QuizSession {
                session_id,
                quiz_id,
                classroom_id,
                started_at: t0(),
                ended_at: None,
            })
            .await
            .unwrap();

        Self {
            reports: ReportAggregator::new(store.clone()),
            store,
            classroom_id,
            quiz_id,
            session_id,
            students,
        }
    }

    async fn new() -> Self {
        Self::with_roster(10).await
    }

    async fn publish(&self, at: DateTime<Utc>) -> QuestionId {
        let question_id = QuestionId::new();
        self.store
            .insert_question_published(&QuestionPublished {
                event_id: EventId::new(),
                session_id: self.session_id,
                question_id,
                teacher_id: None,
                published_at: at,
                timer_duration_secs: 30,
            })
            .await
            .unwrap();
        question_id
    }

    async fn answer(&self, student: usize, question_id: QuestionId, answer: &str, at: DateTime<Utc>) {
        self.store
            .insert_answer_submitted(&AnswerSubmitted {
                event_id: EventId::new(),
                session_id: self.session_id,
                question_id,
                student_id: self.students[student],
                answer: answer.to_string(),
                is_correct: matches!(answer, "A" | "C"),
                submitted_at: at,
            })
            .await
            .unwrap();
    }

    /// The first `count` students answer `question_id` five seconds in.
    async fn answer_first(&self, count: usize, question_id: QuestionId, published_at: DateTime<Utc>) {
        for student in 0..count {
            self.answer(student, question_id, "A", published_at + TimeDelta::seconds(5))
                .await;
        }
    }
}

#[tokio::test]
async fn four_of_ten_answering_is_a_forty_percent_response_rate() {
    let class = Classroom10::new().await;
    let question = class.publish(t0()).await;
    class.answer_first(4, question, t0()).await;

    let rate = class
        .reports
        .response_rate(class.session_id, question)
        .await
        .unwrap();

    assert_eq!(rate.students_received, 10);
    assert_eq!(rate.students_answered, 4);
    assert_eq!(rate.response_rate, 40.0);
    assert_eq!(rate.analysis.engagement_level, EngagementLevel::Low);
    assert_eq!(rate.analysis.benchmark, "Industry average: 85%");
}

#[tokio::test]
async fn dropoff_is_measured_against_the_starting_roster() {
    let class = Classroom10::new().await;
    let counts = [10, 6, 4];
    for (i, count) in counts.iter().enumerate() {
        let at = t0() + TimeDelta::minutes(i as i64);
        let question = class.publish(at).await;
        class.answer_first(*count, question, at).await;
    }

    let report = class.reports.dropoff_points(class.session_id).await.unwrap();

    let rates: Vec<f64> = report.dropoff_points.iter().map(|p| p.dropoff_rate).collect();
    assert_eq!(rates, vec![0.0, 40.0, 60.0]);
    let orders: Vec<u32> = report.dropoff_points.iter().map(|p| p.question_order).collect();
    assert_eq!(orders, vec![1, 2, 3]);
    assert!(report.dropoff_points.iter().all(|p| p.students_at_start == 10));

    assert_eq!(report.analysis.critical_points.len(), 2);
    assert_eq!(
        report.analysis.recommendations,
        vec!["Review question difficulty and clarity for high drop-off points"]
    );
}

#[tokio::test]
async fn timeouts_are_roster_members_without_an_answer() {
    let class = Classroom10::new().await;
    let question = class.publish(t0()).await;
    class.answer_first(4, question, t0()).await;

    let report = class
        .reports
        .timeout_and_skipped(class.session_id, question)
        .await
        .unwrap();

    assert_eq!(report.timeout_count, 6);
    assert_eq!(report.timeout_rate, 60.0);
    assert_eq!(report.skipped_rate, 0.0);
    assert_eq!(
        report.analysis.difficulty_indicator,
        DifficultyIndicator::HighDifficulty
    );
}

#[tokio::test]
async fn latency_median_interpolates_between_answers() {
    let class = Classroom10::new().await;
    let question = class.publish(t0()).await;
    for (student, secs) in [(0, 10), (1, 20), (2, 30), (3, 40)] {
        class
            .answer(student, question, "B", t0() + TimeDelta::seconds(secs))
            .await;
    }

    let latency = class
        .reports
        .latency(class.session_id, question)
        .await
        .unwrap();

    assert_eq!(latency.answers, 4);
    assert_eq!(latency.first_answer_latency, Duration::from_secs(10));
    assert_eq!(latency.average_latency, Duration::from_secs(25));
    assert_eq!(latency.median_latency, Duration::from_secs(25));
    assert_eq!(latency.analysis.speed_rating, SpeedRating::Moderate);
}

#[tokio::test]
async fn completion_counts_students_who_answered_everything() {
    let class = Classroom10::with_roster(4).await;
    let q1 = class.publish(t0()).await;
    let q2 = class.publish(t0() + TimeDelta::minutes(1)).await;
    class.answer(0, q1, "A", t0() + TimeDelta::seconds(5)).await;
    class.answer(0, q2, "C", t0() + TimeDelta::seconds(65)).await;
    class.answer(1, q1, "A", t0() + TimeDelta::seconds(5)).await;

    let completion = class
        .reports
        .completion_rate(class.session_id)
        .await
        .unwrap();

    assert_eq!(completion.total_students, 4);
    assert_eq!(completion.total_questions, 2);
    assert_eq!(completion.completed_students, 1);
    assert_eq!(completion.completion_rate, 25.0);
    assert_eq!(completion.average_completion, 75.0);
    assert_eq!(
        completion.analysis.retention_level,
        RetentionLevel::Concerning
    );
}

#[tokio::test]
async fn rankings_share_ranks_and_percentiles_on_ties() {
    let class = Classroom10::with_roster(3).await;
    let q1 = class.publish(t0()).await;
    let q2 = class.publish(t0() + TimeDelta::minutes(1)).await;
    for student in 0..2 {
        class.answer(student, q1, "A", t0() + TimeDelta::seconds(5)).await;
        class.answer(student, q2, "C", t0() + TimeDelta::seconds(65)).await;
    }
    class.answer(2, q1, "A", t0() + TimeDelta::seconds(5)).await;
    class.answer(2, q2, "D", t0() + TimeDelta::seconds(65)).await;

    let rankings = class
        .reports
        .student_rankings(
            RankingScope::Classroom(class.classroom_id),
            PaginationParams::default(),
        )
        .await
        .unwrap();

    let ranks: Vec<u64> = rankings.data.iter().map(|r| r.rank).collect();
    assert_eq!(ranks, vec![1, 1, 3]);
    let percentiles: Vec<f64> = rankings.data.iter().map(|r| r.percentile).collect();
    assert_eq!(percentiles, vec![0.0, 0.0, 100.0]);
    assert_eq!(rankings.data[2].student_id, class.students[2]);
    assert_eq!(rankings.data[2].accuracy_rate, 50.0);
}

#[tokio::test]
async fn active_participants_carry_accuracy_and_page_average() {
    let class = Classroom10::with_roster(3).await;
    let q1 = class.publish(t0()).await;
    class.answer(0, q1, "A", t0() + TimeDelta::seconds(5)).await;
    class.answer(1, q1, "B", t0() + TimeDelta::seconds(6)).await;

    let report = class
        .reports
        .active_participants(class.session_id, ALL_TIME, PaginationParams::default())
        .await
        .unwrap();

    assert_eq!(report.participants.total_count, 2);
    assert_eq!(report.participants.data[0].student_id, class.students[1]);
    assert_eq!(report.participants.data[0].accuracy, 0.0);
    assert_eq!(report.participants.data[1].accuracy, 100.0);
    assert_eq!(report.average_accuracy_percent, 50.0);

    let recent = class
        .reports
        .active_participants(class.session_id, Duration::from_secs(60), PaginationParams::default())
        .await
        .unwrap();
    assert_eq!(recent.participants.total_count, 0);
    assert_eq!(recent.participants.total_pages, 1);
}

#[tokio::test]
async fn questions_per_minute_uses_span_and_densest_minute() {
    let class = Classroom10::new().await;
    class.publish(t0()).await;
    class.publish(t0() + TimeDelta::seconds(30)).await;
    class.publish(t0() + TimeDelta::minutes(2)).await;

    let qpm = class
        .reports
        .questions_per_minute(class.session_id)
        .await
        .unwrap();

    assert_eq!(qpm.total_questions, 3);
    assert_eq!(qpm.average_qpm, 1.5);
    assert_eq!(qpm.peak_qpm, 2.0);
}

#[tokio::test]
async fn classroom_and_quiz_reports_combine_accuracy_and_reach() {
    let class = Classroom10::new().await;
    let question = class.publish(t0()).await;
    class.answer_first(4, question, t0()).await;
    class
        .answer(4, question, "B", t0() + TimeDelta::seconds(12))
        .await;

    let engagement = class
        .reports
        .classroom_engagement(class.classroom_id, ALL_TIME)
        .await
        .unwrap();
    assert_eq!(engagement.active_students, 5);
    assert_eq!(engagement.engagement_rate_percent, 50.0);
    assert_eq!(engagement.average_accuracy_percent, 80.0);
    assert_eq!(engagement.response_rate_percent, 100.0);

    let content = class
        .reports
        .content_effectiveness(class.quiz_id)
        .await
        .unwrap();
    assert_eq!(content.average_accuracy, 80.0);
    assert_eq!(content.overall_engagement, 50.0);
    assert_eq!(content.effectiveness_score, 65.0);
    assert_eq!(
        content.recommendations,
        "Quiz has moderate effectiveness. Review difficult questions."
    );

    let performance = class
        .reports
        .student_performance(class.students[4], class.classroom_id)
        .await
        .unwrap();
    assert_eq!(performance.questions_attempted, 1);
    assert_eq!(performance.overall_accuracy_percent, 0.0);
    assert_eq!(performance.average_response_time, Some(Duration::from_secs(12)));
    assert_eq!(performance.performance_level, PerformanceLevel::Poor);

    let list = class
        .reports
        .student_performance_list(class.classroom_id, PaginationParams::new(1, 3))
        .await
        .unwrap();
    assert_eq!(list.students.total_count, 10);
    assert_eq!(list.students.total_pages, 4);
    assert_eq!(list.students.data[0].accuracy_rate, 100.0);

    let sessions = class
        .reports
        .classroom_sessions(class.classroom_id, PaginationParams::default())
        .await
        .unwrap();
    assert_eq!(sessions.sessions.data.len(), 1);
    assert_eq!(sessions.sessions.data[0].response_rate, 100.0);
    assert_eq!(sessions.sessions.data[0].duration, None);
}

#[tokio::test]
async fn empty_session_reports_neutral_values() {
    let class = Classroom10::with_roster(0).await;
    let question = QuestionId::new();

    let rate = class
        .reports
        .response_rate(class.session_id, question)
        .await
        .unwrap();
    assert_eq!(rate.response_rate, 0.0);

    let latency = class
        .reports
        .latency(class.session_id, question)
        .await
        .unwrap();
    assert_eq!(latency.answers, 0);
    assert_eq!(latency.median_latency, Duration::ZERO);

    let completion = class
        .reports
        .completion_rate(class.session_id)
        .await
        .unwrap();
    assert_eq!(completion.completion_rate, 0.0);
    assert_eq!(completion.average_completion, 0.0);

    let dropoff = class.reports.dropoff_points(class.session_id).await.unwrap();
    assert!(dropoff.dropoff_points.is_empty());
    assert_eq!(dropoff.analysis.recommendations, vec!["Retention rates are healthy"]);

    let qpm = class
        .reports
        .questions_per_minute(class.session_id)
        .await
        .unwrap();
    assert_eq!(qpm.average_qpm, 0.0);
    assert_eq!(qpm.peak_qpm, 0.0);
}

#[tokio::test]
async fn compiled_queries_group_by_dimension() {
    let class = Classroom10::new().await;
    let question = class.publish(t0()).await;
    class.answer_first(3, question, t0()).await;
    class.answer(3, question, "B", t0() + TimeDelta::seconds(40)).await;

    let compiler = QueryCompiler::new(class.store.clone());
    let request = QueryRequest::default()
        .with_measure("total_answers")
        .with_measure("accuracy_rate")
        .with_dimension("performance_level")
        .with_dimension("quiz_title")
        .with_order("total_answers", "DESC");
    let rows = compiler.execute(&request).await.unwrap();

    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["performance_level"], "Correct");
    assert_eq!(rows[0]["total_answers"], 3);
    assert_eq!(rows[0]["accuracy_rate"], 100.0);
    assert_eq!(rows[0]["quiz_title"], "Photosynthesis");
    assert_eq!(rows[1]["performance_level"], "Incorrect");

    let slow = QueryRequest::default()
        .with_measure("active_students")
        .with_filter("response_speed_category", "Medium")
        .with_filter("classroom_name", "Year 8 Science");
    let rows = compiler.execute(&slow).await.unwrap();
    assert_eq!(rows[0]["active_students"], 1);

    let outside = QueryRequest::default()
        .with_measure("total_answers")
        .with_time_range(t0() + TimeDelta::hours(1), t0() + TimeDelta::hours(2));
    let rows = compiler.execute(&outside).await.unwrap();
    assert_eq!(rows[0]["total_answers"], 0);
}

/// Four correct answers at 5s and one wrong answer at 15s to a single question.
async fn class_with_one_answered_question() -> (Classroom10, QuestionId) {
    let class = Classroom10::new().await;
    let question = class.publish(t0()).await;
    class.answer_first(4, question, t0()).await;
    class
        .answer(4, question, "B", t0() + TimeDelta::seconds(15))
        .await;
    (class, question)
}

#[tokio::test]
async fn quiz_summary_and_question_analysis_cover_every_answer() {
    let (class, question) = class_with_one_answered_question().await;
    let unanswered = class.publish(t0() + TimeDelta::minutes(1)).await;

    let summary = class.reports.quiz_summary(class.quiz_id).await.unwrap();
    assert_eq!(summary.title.as_deref(), Some("Photosynthesis"));
    assert_eq!(summary.usage_statistics.total_sessions, 1);
    assert_eq!(summary.usage_statistics.total_students, 5);
    assert_eq!(summary.usage_statistics.total_questions, 2);
    assert_eq!(summary.usage_statistics.first_used, Some(t0()));
    assert_eq!(summary.performance_metrics.average_accuracy, 80.0);
    assert_eq!(summary.performance_metrics.average_completion, 50.0);
    assert_eq!(summary.performance_metrics.overall_engagement, 50.0);
    assert_eq!(summary.performance_metrics.effectiveness_score, 65.0);
    assert_eq!(summary.insights.performance_rating, PerformanceRating::Average);
    assert_eq!(summary.insights.usage_frequency, UsageFrequency::Minimal);
    assert_eq!(summary.insights.reach, Reach::SingleClassroom);

    let analysis = class.reports.question_analysis(question).await.unwrap();
    assert_eq!(analysis.quiz_id, Some(class.quiz_id));
    assert_eq!(analysis.usage_stats.total_attempts, 5);
    assert_eq!(analysis.usage_stats.correct_attempts, 4);
    assert_eq!(analysis.usage_stats.usage_count, 1);
    assert_eq!(analysis.accuracy_rate, 80.0);
    assert_eq!(analysis.average_response_time, Some(Duration::from_secs(7)));
    assert_eq!(
        analysis.answer_distribution,
        BTreeMap::from([("A".to_string(), 4), ("B".to_string(), 1)])
    );
    assert_eq!(analysis.insights.difficulty_level, QuestionDifficulty::Appropriate);
    assert_eq!(analysis.insights.response_quality, Some(ResponseQuality::Quick));
    assert_eq!(analysis.insights.effectiveness, QuestionEffectiveness::Effective);

    let idle = class.reports.question_analysis(unanswered).await.unwrap();
    assert_eq!(idle.usage_stats.total_attempts, 0);
    assert_eq!(idle.average_response_time, None);
    assert!(idle.answer_distribution.is_empty());
    assert_eq!(idle.insights.effectiveness, QuestionEffectiveness::NeedsMoreData);

    let questions = class
        .reports
        .quiz_questions(class.quiz_id, PaginationParams::default())
        .await
        .unwrap();
    assert_eq!(questions.questions.total_count, 2);
    assert_eq!(questions.questions.data[0].question.question_id, question);
    assert_eq!(questions.questions.data[0].accuracy_rate, 80.0);
    assert_eq!(
        questions.questions.data[0].difficulty,
        Some(QuestionDifficulty::Appropriate)
    );
    assert_eq!(questions.questions.data[1].question.question_id, unanswered);
    assert_eq!(questions.questions.data[1].difficulty, None);

    let sessions = class
        .reports
        .quiz_sessions(class.quiz_id, PaginationParams::default())
        .await
        .unwrap();
    assert_eq!(sessions.sessions.total_count, 1);
    assert_eq!(sessions.sessions.data[0].session.session_id, class.session_id);
    assert_eq!(sessions.sessions.data[0].session.classroom_id, class.classroom_id);
    assert_eq!(sessions.sessions.data[0].response_rate, 50.0);
}

#[tokio::test]
async fn classroom_history_overview_and_performance() {
    let (class, _) = class_with_one_answered_question().await;

    let history = class
        .reports
        .classroom_engagement_history(class.classroom_id, ALL_TIME, PaginationParams::default())
        .await
        .unwrap();
    assert_eq!(history.total_students, 10);
    assert_eq!(history.periods.total_count, 1);
    let day = &history.periods.data[0];
    assert_eq!(day.date, NaiveDate::from_ymd_opt(2025, 3, 1).unwrap());
    assert_eq!(day.sessions, 1);
    assert_eq!(day.questions_published, 1);
    assert_eq!(day.active_students, 5);
    assert_eq!(day.engagement_rate, 50.0);
    assert_eq!(day.accuracy_rate, 80.0);

    let overview = class
        .reports
        .classroom_overview(class.classroom_id)
        .await
        .unwrap();
    assert_eq!(overview.name.as_deref(), Some("Year 8 Science"));
    assert_eq!(overview.total_sessions, 1);
    assert_eq!(overview.recent_sessions, 0);
    assert_eq!(overview.total_quizzes, 1);
    assert_eq!(overview.participation_rate, 50.0);
    assert_eq!(overview.activity_score, 0.0);
    assert_eq!(overview.insights.activity_level, SessionActivity::Inactive);
    assert_eq!(
        overview.insights.engagement_status,
        EngagementStatus::ModeratelyEngaged
    );
    assert_eq!(overview.insights.growth_trend, GrowthTrend::Stagnant);

    class
        .store
        .upsert_session(&QuizSession {
            session_id: SessionId::new(),
            quiz_id: class.quiz_id,
            classroom_id: class.classroom_id,
            started_at: Utc::now() - TimeDelta::days(1),
            ended_at: None,
        })
        .await
        .unwrap();
    let overview = class
        .reports
        .classroom_overview(class.classroom_id)
        .await
        .unwrap();
    assert_eq!(overview.recent_sessions, 1);
    assert_eq!(overview.activity_score, 50.0);
    assert_eq!(overview.insights.activity_level, SessionActivity::High);
    assert_eq!(overview.insights.growth_trend, GrowthTrend::Steady);

    let performance = class
        .reports
        .class_performance_summary(class.classroom_id)
        .await
        .unwrap();
    assert_eq!(performance.total_students, 10);
    assert_eq!(performance.participating_students, 5);
    assert_eq!(performance.total_sessions, 2);
    assert_eq!(performance.total_questions_answered, 5);
    assert_eq!(performance.overall_accuracy, 80.0);
    assert_eq!(performance.overall_participation, 50.0);
    assert_eq!(performance.average_response_time, Some(Duration::from_secs(7)));
    assert_eq!(performance.insights.performance_level, PerformanceLevel::Good);
    assert_eq!(
        performance.insights.participation_level,
        ParticipationLevel::Moderate
    );
    assert_eq!(
        performance.insights.engagement_quality,
        EngagementQuality::LightEngagement
    );
    assert_eq!(performance.insights.response_speed, Some(ResponseSpeed::VeryFast));
    assert_eq!(performance.benchmarks.target_accuracy, 75.0);
    assert_eq!(performance.benchmarks.optimal_response_time, Duration::from_secs(30));
}

#[tokio::test]
async fn student_activity_summarises_sessions_and_quizzes() {
    let (class, _) = class_with_one_answered_question().await;

    let activity = class
        .reports
        .student_activity_summary(class.students[0], class.classroom_id)
        .await
        .unwrap();
    assert_eq!(activity.sessions_participated, 1);
    assert_eq!(activity.unique_quizzes, 1);
    assert_eq!(activity.questions_answered, 1);
    assert_eq!(activity.overall_accuracy, 100.0);
    assert_eq!(activity.average_response_time, Some(Duration::from_secs(5)));
    assert_eq!(activity.first_activity, Some(t0() + TimeDelta::seconds(5)));
    assert_eq!(activity.questions_per_session, 1.0);
    assert_eq!(activity.quiz_variety_score, 100.0);
    assert_eq!(activity.insights.activity_level, ActivityLevel::MinimallyActive);
    assert_eq!(activity.insights.performance_trend, PerformanceLevel::Excellent);
    assert_eq!(
        activity.insights.engagement_consistency,
        EngagementConsistency::VeryConsistent
    );

    let absent = class
        .reports
        .student_activity_summary(class.students[9], class.classroom_id)
        .await
        .unwrap();
    assert_eq!(absent.sessions_participated, 0);
    assert_eq!(absent.questions_per_session, 0.0);
    assert_eq!(absent.quiz_variety_score, 0.0);
    assert_eq!(absent.average_response_time, None);
    assert_eq!(absent.insights.activity_level, ActivityLevel::Inactive);
    assert_eq!(
        absent.insights.engagement_consistency,
        EngagementConsistency::NoData
    );
}
