//! The quiz analytics cube: named measures and dimensions over answer events.
//!
//! Every expression is SQLite over a fixed join rooted at
//! `answer_submitted_events`. Timestamps are epoch milliseconds, so time
//! arithmetic divides by 1000 and date parts go through `strftime` with the
//! `unixepoch` modifier.

use std::fmt;

use serde::Serialize;

/// The relations every compiled query selects from.
pub(crate) const BASE_RELATION: &str = "FROM answer_submitted_events ase \
LEFT JOIN quiz_sessions qs ON ase.session_id = qs.session_id \
LEFT JOIN quizzes q ON qs.quiz_id = q.quiz_id \
LEFT JOIN classrooms c ON qs.classroom_id = c.classroom_id \
LEFT JOIN students s ON ase.student_id = s.student_id \
LEFT JOIN question_published_events qpe ON ase.question_id = qpe.question_id AND ase.session_id = qpe.session_id";

/// Column the time range of a request applies to.
pub(crate) const TIME_COLUMN: &str = "ase.submitted_at";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MeasureKind {
    Count,
    Avg,
    Sum,
    Variance,
    Percentage,
    Calculated,
}

/// Type of the values a dimension groups by. Decides how filter literals bind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueType {
    String,
    Number,
    Time,
    Boolean,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DisplayFormat {
    Percentage,
    Seconds,
    Date,
    Hour,
    Week,
    Month,
    Weekday,
}

/// A quantitative, aggregatable metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Measure {
    pub name: &'static str,
    pub display_name: &'static str,
    pub kind: MeasureKind,
    pub sql: &'static str,
    pub format: Option<DisplayFormat>,
}

/// A categorical or temporal attribute to group and filter by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimension {
    pub name: &'static str,
    pub display_name: &'static str,
    pub value_type: ValueType,
    pub sql: &'static str,
    pub format: Option<DisplayFormat>,
}

/// A read-only catalog of measures and dimensions.
#[derive(Debug)]
pub struct Cube {
    measures: &'static [Measure],
    dimensions: &'static [Dimension],
}

/// One catalog entry, as listed by [`Cube::describe`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldDescription {
    pub name: &'static str,
    pub display_name: &'static str,
    /// Measure kind or dimension value type.
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<DisplayFormat>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CubeDescription {
    pub measures: Vec<FieldDescription>,
    pub dimensions: Vec<FieldDescription>,
}

impl Cube {
    /// The quiz analytics cube.
    #[must_use]
    pub fn standard() -> &'static Cube {
        &STANDARD
    }

    #[must_use]
    pub fn measure(&self, name: &str) -> Option<&Measure> {
        self.measures.iter().find(|m| m.name == name)
    }

    #[must_use]
    pub fn dimension(&self, name: &str) -> Option<&Dimension> {
        self.dimensions.iter().find(|d| d.name == name)
    }

    pub fn measures(&self) -> &[Measure] {
        self.measures
    }

    pub fn dimensions(&self) -> &[Dimension] {
        self.dimensions
    }

    /// List the catalog for discovery, in definition order.
    #[must_use]
    pub fn describe(&self) -> CubeDescription {
        CubeDescription {
            measures: self
                .measures
                .iter()
                .map(|m| FieldDescription {
                    name: m.name,
                    display_name: m.display_name,
                    kind: m.kind.to_string(),
                    format: m.format,
                })
                .collect(),
            dimensions: self
                .dimensions
                .iter()
                .map(|d| FieldDescription {
                    name: d.name,
                    display_name: d.display_name,
                    kind: d.value_type.to_string(),
                    format: d.format,
                })
                .collect(),
        }
    }
}

impl fmt::Display for MeasureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Count => "count",
            Self::Avg => "avg",
            Self::Sum => "sum",
            Self::Variance => "variance",
            Self::Percentage => "percentage",
            Self::Calculated => "calculated",
        };
        f.write_str(s)
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Time => "time",
            Self::Boolean => "boolean",
        };
        f.write_str(s)
    }
}

static STANDARD: Cube = Cube {
    measures: MEASURES,
    dimensions: DIMENSIONS,
};

const fn measure(
    name: &'static str,
    display_name: &'static str,
    kind: MeasureKind,
    sql: &'static str,
    format: Option<DisplayFormat>,
) -> Measure {
    Measure {
        name,
        display_name,
        kind,
        sql,
        format,
    }
}

const fn dimension(
    name: &'static str,
    display_name: &'static str,
    value_type: ValueType,
    sql: &'static str,
    format: Option<DisplayFormat>,
) -> Dimension {
    Dimension {
        name,
        display_name,
        value_type,
        sql,
        format,
    }
}

const PCT: Option<DisplayFormat> = Some(DisplayFormat::Percentage);
const SECS: Option<DisplayFormat> = Some(DisplayFormat::Seconds);

const MEASURES: &[Measure] = &[
    measure(
        "total_answers",
        "Total Answers",
        MeasureKind::Count,
        "COUNT(ase.event_id)",
        None,
    ),
    measure(
        "correct_answers",
        "Correct Answers",
        MeasureKind::Count,
        "COUNT(CASE WHEN ase.is_correct = 1 THEN 1 END)",
        None,
    ),
    measure(
        "accuracy_rate",
        "Accuracy Rate",
        MeasureKind::Avg,
        "ROUND(AVG(CASE WHEN ase.is_correct = 1 THEN 100.0 ELSE 0.0 END), 2)",
        PCT,
    ),
    measure(
        "active_students",
        "Active Students",
        MeasureKind::Count,
        "COUNT(DISTINCT ase.student_id)",
        None,
    ),
    measure(
        "questions_published",
        "Questions Published",
        MeasureKind::Count,
        "COUNT(DISTINCT qpe.question_id)",
        None,
    ),
    measure(
        "wrong_answers",
        "Wrong Answers",
        MeasureKind::Count,
        "COUNT(CASE WHEN ase.is_correct = 0 THEN 1 END)",
        None,
    ),
    // Sample variance of the per-answer score (100 correct, 0 wrong).
    measure(
        "performance_variance",
        "Performance Variance",
        MeasureKind::Variance,
        "CASE WHEN COUNT(ase.event_id) > 1 THEN ROUND(\
(SUM(CASE WHEN ase.is_correct = 1 THEN 10000.0 ELSE 0.0 END) \
- SUM(CASE WHEN ase.is_correct = 1 THEN 100.0 ELSE 0.0 END) * SUM(CASE WHEN ase.is_correct = 1 THEN 100.0 ELSE 0.0 END) / COUNT(ase.event_id)) \
/ (COUNT(ase.event_id) - 1), 2) END",
        None,
    ),
    measure(
        "student_attempts_per_question",
        "Avg Attempts Per Question",
        MeasureKind::Avg,
        "ROUND(COUNT(ase.event_id) * 1.0 / MAX(COUNT(DISTINCT qpe.question_id), 1), 2)",
        None,
    ),
    measure(
        "participation_rate",
        "Participation Rate",
        MeasureKind::Percentage,
        "ROUND(COUNT(DISTINCT ase.student_id) * 100.0 / MAX(COUNT(DISTINCT s.student_id), 1), 2)",
        PCT,
    ),
    measure(
        "engagement_score",
        "Engagement Score",
        MeasureKind::Calculated,
        "ROUND((COUNT(DISTINCT ase.student_id) * 100.0 / MAX(COUNT(DISTINCT s.student_id), 1) \
+ AVG(CASE WHEN ase.is_correct = 1 THEN 100.0 ELSE 0.0 END)) / 2, 2)",
        PCT,
    ),
    measure(
        "session_completion_rate",
        "Session Completion Rate",
        MeasureKind::Percentage,
        "ROUND(COUNT(ase.event_id) * 100.0 / MAX(COUNT(DISTINCT ase.student_id) * COUNT(DISTINCT qpe.question_id), 1), 2)",
        PCT,
    ),
    measure(
        "unique_sessions",
        "Unique Sessions",
        MeasureKind::Count,
        "COUNT(DISTINCT qs.session_id)",
        None,
    ),
    measure(
        "average_session_duration",
        "Average Session Duration",
        MeasureKind::Avg,
        "ROUND(AVG((qs.ended_at - qs.started_at) / 1000.0), 2)",
        SECS,
    ),
    measure(
        "questions_per_minute",
        "Questions Per Minute",
        MeasureKind::Calculated,
        "ROUND(COUNT(DISTINCT qpe.question_id) / MAX((MAX(qpe.published_at) - MIN(qpe.published_at)) / 60000.0, 1), 2)",
        None,
    ),
    measure(
        "question_difficulty_score",
        "Question Difficulty Score",
        MeasureKind::Calculated,
        "ROUND(100 - AVG(CASE WHEN ase.is_correct = 1 THEN 100.0 ELSE 0.0 END), 2)",
        PCT,
    ),
    measure(
        "content_effectiveness_score",
        "Content Effectiveness Score",
        MeasureKind::Calculated,
        "ROUND((AVG(CASE WHEN ase.is_correct = 1 THEN 100.0 ELSE 0.0 END) \
+ COUNT(DISTINCT ase.student_id) * 100.0 / MAX(COUNT(DISTINCT s.student_id), 1)) / 2, 2)",
        PCT,
    ),
    measure(
        "time_to_first_answer",
        "Time to First Answer",
        MeasureKind::Avg,
        "ROUND(AVG((ase.submitted_at - qpe.published_at) / 1000.0), 2)",
        SECS,
    ),
    measure(
        "question_engagement_rate",
        "Question Engagement Rate",
        MeasureKind::Percentage,
        "ROUND(COUNT(ase.event_id) * 100.0 / MAX(COUNT(DISTINCT s.student_id), 1), 2)",
        PCT,
    ),
    measure(
        "quiz_completion_rate",
        "Quiz Completion Rate",
        MeasureKind::Percentage,
        "ROUND(COUNT(DISTINCT CASE WHEN ase.is_correct IS NOT NULL THEN ase.student_id END) * 100.0 \
/ MAX(COUNT(DISTINCT s.student_id), 1), 2)",
        PCT,
    ),
    measure(
        "response_speed_score",
        "Response Speed Score",
        MeasureKind::Calculated,
        "ROUND(AVG((ase.submitted_at - qpe.published_at) / 1000.0), 2)",
        SECS,
    ),
];

const DIMENSIONS: &[Dimension] = &[
    dimension(
        "session_id",
        "Quiz Session",
        ValueType::String,
        "ase.session_id",
        None,
    ),
    dimension(
        "classroom_name",
        "Classroom",
        ValueType::String,
        "c.name",
        None,
    ),
    dimension("student_name", "Student", ValueType::String, "s.name", None),
    dimension(
        "question_id",
        "Question",
        ValueType::String,
        "ase.question_id",
        None,
    ),
    dimension(
        "answer_option",
        "Answer Choice",
        ValueType::String,
        "ase.answer",
        None,
    ),
    dimension(
        "event_date",
        "Date",
        ValueType::Time,
        "strftime('%Y-%m-%d', ase.submitted_at / 1000, 'unixepoch')",
        Some(DisplayFormat::Date),
    ),
    dimension(
        "event_hour",
        "Hour",
        ValueType::Time,
        "CAST(strftime('%H', ase.submitted_at / 1000, 'unixepoch') AS INTEGER)",
        Some(DisplayFormat::Hour),
    ),
    dimension(
        "performance_level",
        "Performance Level",
        ValueType::String,
        "CASE WHEN ase.is_correct = 1 THEN 'Correct' ELSE 'Incorrect' END",
        None,
    ),
    dimension(
        "response_speed_category",
        "Response Speed Category",
        ValueType::String,
        "CASE WHEN (ase.submitted_at - qpe.published_at) < 30000 THEN 'Fast' \
WHEN (ase.submitted_at - qpe.published_at) < 60000 THEN 'Medium' ELSE 'Slow' END",
        None,
    ),
    dimension(
        "correctness_flag",
        "Answer Correctness",
        ValueType::Boolean,
        "ase.is_correct",
        None,
    ),
    dimension(
        "engagement_level",
        "Engagement Level",
        ValueType::String,
        "CASE WHEN ase.student_id IS NOT NULL THEN 'Active' ELSE 'Inactive' END",
        None,
    ),
    dimension(
        "session_duration_category",
        "Session Length",
        ValueType::String,
        "CASE WHEN (qs.ended_at - qs.started_at) < 1800000 THEN 'Short' \
WHEN (qs.ended_at - qs.started_at) < 3600000 THEN 'Medium' ELSE 'Long' END",
        None,
    ),
    dimension("quiz_title", "Quiz Name", ValueType::String, "q.title", None),
    dimension(
        "difficulty_level",
        "Difficulty Level",
        ValueType::String,
        "CASE WHEN qpe.timer_duration_sec < 30 THEN 'Hard' \
WHEN qpe.timer_duration_sec < 60 THEN 'Medium' ELSE 'Easy' END",
        None,
    ),
    dimension(
        "timer_duration_category",
        "Question Timer",
        ValueType::String,
        "CASE WHEN qpe.timer_duration_sec < 30 THEN 'Fast' \
WHEN qpe.timer_duration_sec < 60 THEN 'Medium' ELSE 'Slow' END",
        None,
    ),
    dimension(
        "teacher_id",
        "Teacher",
        ValueType::String,
        "qpe.teacher_id",
        None,
    ),
    dimension(
        "event_week",
        "Week",
        ValueType::Time,
        "CAST(strftime('%W', ase.submitted_at / 1000, 'unixepoch') AS INTEGER)",
        Some(DisplayFormat::Week),
    ),
    dimension(
        "event_month",
        "Month",
        ValueType::Time,
        "CAST(strftime('%m', ase.submitted_at / 1000, 'unixepoch') AS INTEGER)",
        Some(DisplayFormat::Month),
    ),
    dimension(
        "event_day_of_week",
        "Day of Week",
        ValueType::Time,
        "CASE strftime('%w', ase.submitted_at / 1000, 'unixepoch') \
WHEN '0' THEN 'Sunday' WHEN '1' THEN 'Monday' WHEN '2' THEN 'Tuesday' \
WHEN '3' THEN 'Wednesday' WHEN '4' THEN 'Thursday' WHEN '5' THEN 'Friday' ELSE 'Saturday' END",
        Some(DisplayFormat::Weekday),
    ),
    dimension(
        "time_bucket",
        "Time Bucket",
        ValueType::Time,
        "CASE WHEN CAST(strftime('%H', ase.submitted_at / 1000, 'unixepoch') AS INTEGER) < 12 THEN 'Morning' \
WHEN CAST(strftime('%H', ase.submitted_at / 1000, 'unixepoch') AS INTEGER) < 18 THEN 'Afternoon' ELSE 'Evening' END",
        None,
    ),
];

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn standard_cube_has_unique_names() {
        let cube = Cube::standard();
        assert_eq!(cube.measures().len(), 20);
        assert_eq!(cube.dimensions().len(), 20);

        let names: HashSet<&str> = cube
            .measures()
            .iter()
            .map(|m| m.name)
            .chain(cube.dimensions().iter().map(|d| d.name))
            .collect();
        assert_eq!(names.len(), 40);
    }

    #[test]
    fn lookup_by_name() {
        let cube = Cube::standard();
        assert_eq!(cube.measure("accuracy_rate").unwrap().kind, MeasureKind::Avg);
        assert_eq!(
            cube.dimension("correctness_flag").unwrap().value_type,
            ValueType::Boolean
        );
        assert!(cube.measure("classroom_name").is_none());
        assert!(cube.dimension("nope").is_none());
    }

    #[test]
    fn describe_lists_kinds_and_formats() {
        let description = Cube::standard().describe();
        let json = serde_json::to_value(&description).unwrap();

        assert_eq!(json["measures"][2]["name"], "accuracy_rate");
        assert_eq!(json["measures"][2]["type"], "avg");
        assert_eq!(json["measures"][2]["format"], "percentage");
        assert!(json["measures"][0].get("format").is_none());
        assert_eq!(json["dimensions"][5]["type"], "time");
    }
}
