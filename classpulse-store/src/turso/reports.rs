//! [`ReportStore`] on libSQL.
//!
//! Queries return raw counts; rates are derived by the caller.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use libsql::params::IntoParams;
use tracing::instrument;

use super::{TursoStore, count, from_millis, parse_id, to_millis};
use crate::error::{Error, Result};
use crate::ids::{ClassroomId, QuestionId, QuizId, SessionId, StudentId};
use crate::pagination::{PaginatedResponse, PaginationParams};
use crate::reports::{
    ClassPerformanceRow, ClassroomActivity, ClassroomOverviewRow, EngagementPeriodRow,
    ParticipantRow, QuestionParticipation, QuestionStats, QuizContent, QuizQuestionRow, QuizUsage,
    RankingRow, RankingScope, SessionProgress, SessionSummaryRow, StudentAccuracyRow,
    StudentActivityRow, StudentSummary,
};
use crate::traits::ReportStore;

const ACTIVE_PARTICIPANTS: &str = r#"
SELECT ase.student_id, s.name, MAX(ase.submitted_at) AS last_activity,
       COUNT(ase.event_id), SUM(ase.is_correct)
FROM answer_submitted_events ase
LEFT JOIN students s ON s.student_id = ase.student_id
WHERE ase.session_id = ?1 AND ase.submitted_at >= ?2
GROUP BY ase.student_id, s.name
ORDER BY last_activity DESC, ase.student_id
LIMIT ?3 OFFSET ?4
"#;

const QUESTION_PARTICIPATION: &str = r#"
SELECT p.question_id, p.first_published_at,
       (SELECT COUNT(DISTINCT ase.student_id)
        FROM answer_submitted_events ase
        WHERE ase.session_id = ?1 AND ase.question_id = p.question_id) AS answerers
FROM (SELECT question_id, MIN(published_at) AS first_published_at
      FROM question_published_events
      WHERE session_id = ?1
      GROUP BY question_id) p
ORDER BY p.first_published_at, p.question_id
"#;

const STUDENT_SUMMARY: &str = r#"
SELECT COUNT(ase.event_id), SUM(ase.is_correct),
       AVG(ase.submitted_at - (SELECT MAX(qpe.published_at)
                               FROM question_published_events qpe
                               WHERE qpe.session_id = ase.session_id
                                 AND qpe.question_id = ase.question_id))
FROM answer_submitted_events ase
JOIN quiz_sessions qs ON qs.session_id = ase.session_id
WHERE ase.student_id = ?1 AND qs.classroom_id = ?2
"#;

const STUDENT_ACCURACY_LIST: &str = r#"
SELECT cs.student_id, s.name, COUNT(ase.event_id), COALESCE(SUM(ase.is_correct), 0),
       COUNT(DISTINCT ase.session_id)
FROM classroom_students cs
LEFT JOIN students s ON s.student_id = cs.student_id
LEFT JOIN answer_submitted_events ase ON ase.student_id = cs.student_id
     AND ase.session_id IN (SELECT session_id FROM quiz_sessions WHERE classroom_id = ?1)
WHERE cs.classroom_id = ?1
GROUP BY cs.student_id, s.name
ORDER BY COALESCE(SUM(ase.is_correct), 0) * 1.0 / MAX(COUNT(ase.event_id), 1) DESC,
         COUNT(ase.event_id) DESC, cs.student_id
LIMIT ?2 OFFSET ?3
"#;

/// Session listing; `{scope}` is a static filter on `qs`.
const SESSION_SUMMARIES: &str = r#"
SELECT qs.session_id, qs.quiz_id, qs.classroom_id, qs.started_at, qs.ended_at,
       (SELECT COUNT(DISTINCT question_id) FROM question_published_events WHERE session_id = qs.session_id),
       (SELECT COUNT(*) FROM answer_submitted_events WHERE session_id = qs.session_id),
       (SELECT COUNT(DISTINCT student_id) FROM answer_submitted_events WHERE session_id = qs.session_id)
FROM quiz_sessions qs
WHERE {scope}
ORDER BY qs.started_at DESC, qs.session_id
LIMIT ?2 OFFSET ?3
"#;

/// Latency of answer `ase` from the latest publication of its question.
const ANSWER_LATENCY: &str = "ase.submitted_at - (SELECT MAX(qpe.published_at) \
     FROM question_published_events qpe \
     WHERE qpe.session_id = ase.session_id AND qpe.question_id = ase.question_id)";

const QUIZ_ANSWERED_QUESTIONS: &str = r#"
SELECT COUNT(*) FROM (
    SELECT DISTINCT ase.session_id, ase.student_id, ase.question_id
    FROM answer_submitted_events ase
    JOIN quiz_sessions qs ON qs.session_id = ase.session_id
    WHERE qs.quiz_id = ?1
      AND EXISTS (SELECT 1 FROM question_published_events qpe
                  WHERE qpe.session_id = ase.session_id AND qpe.question_id = ase.question_id)
)
"#;

const QUIZ_POSSIBLE_ANSWERS: &str = r#"
SELECT COALESCE(SUM(
    (SELECT COUNT(DISTINCT student_id) FROM answer_submitted_events WHERE session_id = qs.session_id)
    * (SELECT COUNT(DISTINCT question_id) FROM question_published_events WHERE session_id = qs.session_id)
), 0)
FROM quiz_sessions qs
WHERE qs.quiz_id = ?1
"#;

const QUESTION_QUIZ: &str = r#"
SELECT COALESCE(
    (SELECT quiz_id FROM questions WHERE question_id = ?1),
    (SELECT qs.quiz_id FROM question_published_events qpe
     JOIN quiz_sessions qs ON qs.session_id = qpe.session_id
     WHERE qpe.question_id = ?1
     ORDER BY qpe.published_at
     LIMIT 1)
)
"#;

/// Catalogued questions of quiz `?1` plus any published in its sessions.
const QUIZ_QUESTION_IDS: &str = r#"
SELECT question_id FROM questions WHERE quiz_id = ?1
UNION
SELECT qpe.question_id FROM question_published_events qpe
JOIN quiz_sessions qs ON qs.session_id = qpe.session_id
WHERE qs.quiz_id = ?1
"#;

const QUIZ_QUESTIONS: &str = r#"
WITH quiz_questions AS ({ids}),
published AS (
    SELECT qpe.question_id, MIN(qpe.published_at) AS first_published_at,
           COUNT(DISTINCT qpe.session_id) AS sessions_used
    FROM question_published_events qpe
    JOIN quiz_sessions qs ON qs.session_id = qpe.session_id
    WHERE qs.quiz_id = ?1
    GROUP BY qpe.question_id
),
answered AS (
    SELECT ase.question_id, COUNT(ase.event_id) AS attempts, SUM(ase.is_correct) AS correct
    FROM answer_submitted_events ase
    JOIN quiz_sessions qs ON qs.session_id = ase.session_id
    WHERE qs.quiz_id = ?1
    GROUP BY ase.question_id
)
SELECT qq.question_id, p.first_published_at, COALESCE(p.sessions_used, 0),
       COALESCE(a.attempts, 0), COALESCE(a.correct, 0)
FROM quiz_questions qq
LEFT JOIN published p ON p.question_id = qq.question_id
LEFT JOIN answered a ON a.question_id = qq.question_id
ORDER BY p.first_published_at IS NULL, p.first_published_at, qq.question_id
LIMIT ?2 OFFSET ?3
"#;

const ENGAGEMENT_HISTORY: &str = r#"
WITH sessions AS (
    SELECT session_id, date(started_at / 1000, 'unixepoch') AS day
    FROM quiz_sessions
    WHERE classroom_id = ?1 AND started_at >= ?2
),
days AS (
    SELECT day, COUNT(*) AS sessions FROM sessions GROUP BY day
),
published AS (
    SELECT day, COUNT(*) AS questions
    FROM (SELECT DISTINCT s.day, qpe.session_id, qpe.question_id
          FROM sessions s
          JOIN question_published_events qpe ON qpe.session_id = s.session_id)
    GROUP BY day
),
answered AS (
    SELECT s.day, COUNT(DISTINCT ase.student_id) AS active, COUNT(ase.event_id) AS answers,
           SUM(ase.is_correct) AS correct
    FROM sessions s
    JOIN answer_submitted_events ase ON ase.session_id = s.session_id
    GROUP BY s.day
)
SELECT d.day, d.sessions, COALESCE(p.questions, 0), COALESCE(a.active, 0),
       COALESCE(a.answers, 0), COALESCE(a.correct, 0)
FROM days d
LEFT JOIN published p ON p.day = d.day
LEFT JOIN answered a ON a.day = d.day
ORDER BY d.day DESC
LIMIT ?3 OFFSET ?4
"#;

/// Ranking query; `{scope}` is one of the static scope filters below.
const STUDENT_RANKINGS: &str = r#"
WITH scoped AS (
    SELECT ase.student_id, COUNT(ase.event_id) AS answers, SUM(ase.is_correct) AS correct
    FROM answer_submitted_events ase
    LEFT JOIN quiz_sessions qs ON qs.session_id = ase.session_id
    WHERE {scope}
    GROUP BY ase.student_id
), ranked AS (
    SELECT student_id, answers, correct,
           ROUND(correct * 100.0 / MAX(answers, 1), 2) AS accuracy_rate,
           RANK() OVER (ORDER BY correct * 1.0 / MAX(answers, 1) DESC, answers DESC) AS student_rank
    FROM scoped
)
SELECT r.student_id, s.name, r.answers, r.correct, r.accuracy_rate, r.student_rank
FROM ranked r
LEFT JOIN students s ON s.student_id = r.student_id
ORDER BY r.student_rank, r.student_id
LIMIT ?2 OFFSET ?3
"#;

const CLASSROOM_SCOPE: &str = "qs.classroom_id = ?1";
const SESSION_SCOPE: &str = "ase.session_id = ?1";
const QUIZ_SCOPE: &str = "qs.quiz_id = ?1";

fn scope_filter(scope: RankingScope) -> (&'static str, String) {
    match scope {
        RankingScope::Classroom(id) => (CLASSROOM_SCOPE, id.to_string()),
        RankingScope::Session(id) => (SESSION_SCOPE, id.to_string()),
    }
}

/// `LIMIT` and `OFFSET` bind values.
fn page_bounds(pagination: PaginationParams) -> (i64, i64) {
    (
        i64::try_from(pagination.limit()).unwrap_or(i64::MAX),
        i64::try_from(pagination.offset()).unwrap_or(i64::MAX),
    )
}

/// Nullable epoch-millisecond column.
fn optional_time(row: &libsql::Row, idx: i32) -> Result<Option<DateTime<Utc>>> {
    let value: Option<i64> = row.get(idx)?;
    value.map(from_millis).transpose()
}

impl TursoStore {
    /// Run a query whose first column of the first row is a count.
    async fn scalar_count(&self, sql: &str, params: impl IntoParams + Send) -> Result<u64> {
        let mut rows = self.conn().query(sql, params).await?;
        match rows.next().await? {
            Some(row) => count(&row, 0),
            None => Ok(0),
        }
    }

    /// Run a query whose first column of the first row is nullable text.
    async fn scalar_text(
        &self,
        sql: &str,
        params: impl IntoParams + Send,
    ) -> Result<Option<String>> {
        let mut rows = self.conn().query(sql, params).await?;
        match rows.next().await? {
            Some(row) => Ok(row.get(0)?),
            None => Ok(None),
        }
    }

    async fn classroom_roster_size(&self, classroom_id: ClassroomId) -> Result<u64> {
        self.scalar_count(
            "SELECT COUNT(*) FROM classroom_students WHERE classroom_id = ?1",
            [classroom_id.to_string()],
        )
        .await
    }

    /// Page of [`SESSION_SUMMARIES`] under a static scope filter.
    async fn session_summaries(
        &self,
        filter: &'static str,
        scope_id: String,
        pagination: PaginationParams,
    ) -> Result<PaginatedResponse<SessionSummaryRow>> {
        let total = self
            .scalar_count(
                &format!("SELECT COUNT(*) FROM quiz_sessions qs WHERE {filter}"),
                [scope_id.clone()],
            )
            .await?;

        let (limit, offset) = page_bounds(pagination);
        let sql = SESSION_SUMMARIES.replace("{scope}", filter);
        let mut rows = self
            .conn()
            .query(&sql, libsql::params![scope_id, limit, offset])
            .await?;

        let mut data = Vec::new();
        while let Some(row) = rows.next().await? {
            let session_id: String = row.get(0)?;
            let quiz_id: String = row.get(1)?;
            let classroom_id: String = row.get(2)?;
            let started_at: i64 = row.get(3)?;
            data.push(SessionSummaryRow {
                session_id: parse_id(&session_id, "session_id")?,
                quiz_id: parse_id(&quiz_id, "quiz_id")?,
                classroom_id: parse_id(&classroom_id, "classroom_id")?,
                started_at: from_millis(started_at)?,
                ended_at: optional_time(&row, 4)?,
                questions_published: count(&row, 5)?,
                answers_submitted: count(&row, 6)?,
                participants: count(&row, 7)?,
            });
        }

        Ok(PaginatedResponse::new(data, pagination, total))
    }
}

#[async_trait]
impl ReportStore for TursoStore {
    #[instrument(skip(self), level = "debug")]
    async fn active_participants(
        &self,
        session_id: SessionId,
        since: DateTime<Utc>,
        pagination: PaginationParams,
    ) -> Result<PaginatedResponse<ParticipantRow>> {
        let total = self
            .scalar_count(
                "SELECT COUNT(DISTINCT student_id) FROM answer_submitted_events WHERE session_id = ?1 AND submitted_at >= ?2",
                libsql::params![session_id.to_string(), to_millis(since)],
            )
            .await?;

        let (limit, offset) = page_bounds(pagination);
        let mut rows = self
            .conn()
            .query(
                ACTIVE_PARTICIPANTS,
                libsql::params![session_id.to_string(), to_millis(since), limit, offset],
            )
            .await?;

        let mut data = Vec::new();
        while let Some(row) = rows.next().await? {
            let student_id: String = row.get(0)?;
            let last_activity: i64 = row.get(2)?;
            data.push(ParticipantRow {
                student_id: parse_id(&student_id, "student_id")?,
                student_name: row.get(1)?,
                last_activity: from_millis(last_activity)?,
                answers_submitted: count(&row, 3)?,
                correct_answers: count(&row, 4)?,
            });
        }

        Ok(PaginatedResponse::new(data, pagination, total))
    }

    #[instrument(skip(self), level = "debug")]
    async fn publication_times(&self, session_id: SessionId) -> Result<Vec<DateTime<Utc>>> {
        let mut rows = self
            .conn()
            .query(
                "SELECT published_at FROM question_published_events WHERE session_id = ?1 ORDER BY published_at",
                [session_id.to_string()],
            )
            .await?;

        let mut times = Vec::new();
        while let Some(row) = rows.next().await? {
            let published_at: i64 = row.get(0)?;
            times.push(from_millis(published_at)?);
        }
        Ok(times)
    }

    #[instrument(skip(self), level = "debug")]
    async fn session_roster_size(&self, session_id: SessionId) -> Result<u64> {
        self.scalar_count(
            "SELECT COUNT(DISTINCT cs.student_id) FROM quiz_sessions qs JOIN classroom_students cs ON cs.classroom_id = qs.classroom_id WHERE qs.session_id = ?1",
            [session_id.to_string()],
        )
        .await
    }

    #[instrument(skip(self), level = "debug")]
    async fn question_answerers(
        &self,
        session_id: SessionId,
        question_id: QuestionId,
    ) -> Result<u64> {
        self.scalar_count(
            "SELECT COUNT(DISTINCT student_id) FROM answer_submitted_events WHERE session_id = ?1 AND question_id = ?2",
            libsql::params![session_id.to_string(), question_id.to_string()],
        )
        .await
    }

    #[instrument(skip(self), level = "debug")]
    async fn answer_latencies_ms(
        &self,
        session_id: SessionId,
        question_id: QuestionId,
    ) -> Result<Vec<i64>> {
        let mut rows = self
            .conn()
            .query(
                "SELECT ase.submitted_at - (SELECT MAX(published_at) FROM question_published_events WHERE session_id = ?1 AND question_id = ?2) AS latency \
                 FROM answer_submitted_events ase WHERE ase.session_id = ?1 AND ase.question_id = ?2 ORDER BY latency",
                libsql::params![session_id.to_string(), question_id.to_string()],
            )
            .await?;

        let mut latencies = Vec::new();
        while let Some(row) = rows.next().await? {
            let latency: Option<i64> = row.get(0)?;
            latencies.extend(latency);
        }
        Ok(latencies)
    }

    #[instrument(skip(self), level = "debug")]
    async fn session_progress(&self, session_id: SessionId) -> Result<SessionProgress> {
        let roster_size = self.session_roster_size(session_id).await?;
        let questions_published = self
            .scalar_count(
                "SELECT COUNT(DISTINCT question_id) FROM question_published_events WHERE session_id = ?1",
                [session_id.to_string()],
            )
            .await?;

        let mut rows = self
            .conn()
            .query(
                "SELECT COUNT(DISTINCT question_id) FROM answer_submitted_events \
                 WHERE session_id = ?1 AND question_id IN (SELECT question_id FROM question_published_events WHERE session_id = ?1) \
                 GROUP BY student_id",
                [session_id.to_string()],
            )
            .await?;

        let mut answered_per_student = Vec::new();
        while let Some(row) = rows.next().await? {
            answered_per_student.push(count(&row, 0)?);
        }

        Ok(SessionProgress {
            roster_size,
            questions_published,
            answered_per_student,
        })
    }

    #[instrument(skip(self), level = "debug")]
    async fn question_participation(
        &self,
        session_id: SessionId,
    ) -> Result<Vec<QuestionParticipation>> {
        let mut rows = self
            .conn()
            .query(QUESTION_PARTICIPATION, [session_id.to_string()])
            .await?;

        let mut questions = Vec::new();
        let mut order = 0u32;
        while let Some(row) = rows.next().await? {
            order += 1;
            let question_id: String = row.get(0)?;
            let first_published_at: i64 = row.get(1)?;
            questions.push(QuestionParticipation {
                question_id: parse_id(&question_id, "question_id")?,
                order,
                first_published_at: from_millis(first_published_at)?,
                answerers: count(&row, 2)?,
            });
        }
        Ok(questions)
    }

    #[instrument(skip(self), level = "debug")]
    async fn student_summary(
        &self,
        student_id: StudentId,
        classroom_id: ClassroomId,
    ) -> Result<StudentSummary> {
        let mut rows = self
            .conn()
            .query(
                STUDENT_SUMMARY,
                libsql::params![student_id.to_string(), classroom_id.to_string()],
            )
            .await?;

        let Some(row) = rows.next().await? else {
            return Ok(StudentSummary::default());
        };
        Ok(StudentSummary {
            questions_attempted: count(&row, 0)?,
            correct_answers: count(&row, 1)?,
            average_latency_ms: row.get(2)?,
        })
    }

    #[instrument(skip(self), level = "debug")]
    async fn classroom_activity(
        &self,
        classroom_id: ClassroomId,
        since: DateTime<Utc>,
    ) -> Result<ClassroomActivity> {
        let total_students = self.classroom_roster_size(classroom_id).await?;

        let total_questions = self
            .scalar_count(
                "SELECT COUNT(DISTINCT qpe.question_id) FROM quiz_sessions qs \
                 JOIN question_published_events qpe ON qpe.session_id = qs.session_id \
                 WHERE qs.classroom_id = ?1 AND qs.started_at >= ?2",
                libsql::params![classroom_id.to_string(), to_millis(since)],
            )
            .await?;

        let mut rows = self
            .conn()
            .query(
                "SELECT COUNT(DISTINCT ase.student_id), COUNT(ase.event_id), SUM(ase.is_correct) \
                 FROM quiz_sessions qs JOIN answer_submitted_events ase ON ase.session_id = qs.session_id \
                 WHERE qs.classroom_id = ?1 AND qs.started_at >= ?2 AND ase.submitted_at >= ?2",
                libsql::params![classroom_id.to_string(), to_millis(since)],
            )
            .await?;

        let mut activity = ClassroomActivity {
            total_students,
            total_questions,
            ..ClassroomActivity::default()
        };
        if let Some(row) = rows.next().await? {
            activity.active_students = count(&row, 0)?;
            activity.total_answers = count(&row, 1)?;
            activity.correct_answers = count(&row, 2)?;
        }
        Ok(activity)
    }

    #[instrument(skip(self), level = "debug")]
    async fn quiz_content(&self, quiz_id: QuizId) -> Result<QuizContent> {
        let total_questions = self
            .scalar_count(
                "SELECT COUNT(DISTINCT qpe.question_id) FROM quiz_sessions qs \
                 JOIN question_published_events qpe ON qpe.session_id = qs.session_id \
                 WHERE qs.quiz_id = ?1",
                [quiz_id.to_string()],
            )
            .await?;

        let roster_students = self
            .scalar_count(
                "SELECT COUNT(DISTINCT cs.student_id) FROM quiz_sessions qs \
                 JOIN classroom_students cs ON cs.classroom_id = qs.classroom_id \
                 WHERE qs.quiz_id = ?1",
                [quiz_id.to_string()],
            )
            .await?;

        let mut rows = self
            .conn()
            .query(
                "SELECT COUNT(ase.event_id), SUM(ase.is_correct), COUNT(DISTINCT ase.student_id) \
                 FROM quiz_sessions qs JOIN answer_submitted_events ase ON ase.session_id = qs.session_id \
                 WHERE qs.quiz_id = ?1",
                [quiz_id.to_string()],
            )
            .await?;

        let mut content = QuizContent {
            total_questions,
            roster_students,
            ..QuizContent::default()
        };
        if let Some(row) = rows.next().await? {
            content.total_answers = count(&row, 0)?;
            content.correct_answers = count(&row, 1)?;
            content.active_students = count(&row, 2)?;
        }
        Ok(content)
    }

    #[instrument(skip(self), level = "debug")]
    async fn student_accuracy_list(
        &self,
        classroom_id: ClassroomId,
        pagination: PaginationParams,
    ) -> Result<PaginatedResponse<StudentAccuracyRow>> {
        let total = self.classroom_roster_size(classroom_id).await?;

        let (limit, offset) = page_bounds(pagination);
        let mut rows = self
            .conn()
            .query(
                STUDENT_ACCURACY_LIST,
                libsql::params![classroom_id.to_string(), limit, offset],
            )
            .await?;

        let mut data = Vec::new();
        while let Some(row) = rows.next().await? {
            let student_id: String = row.get(0)?;
            data.push(StudentAccuracyRow {
                student_id: parse_id(&student_id, "student_id")?,
                student_name: row.get(1)?,
                answers_submitted: count(&row, 2)?,
                correct_answers: count(&row, 3)?,
                sessions_participated: count(&row, 4)?,
            });
        }

        Ok(PaginatedResponse::new(data, pagination, total))
    }

    #[instrument(skip(self), level = "debug")]
    async fn classroom_sessions(
        &self,
        classroom_id: ClassroomId,
        pagination: PaginationParams,
    ) -> Result<PaginatedResponse<SessionSummaryRow>> {
        self.session_summaries(CLASSROOM_SCOPE, classroom_id.to_string(), pagination)
            .await
    }

    #[instrument(skip(self), level = "debug")]
    async fn student_rankings(
        &self,
        scope: RankingScope,
        pagination: PaginationParams,
    ) -> Result<PaginatedResponse<RankingRow>> {
        let (filter, scope_id) = scope_filter(scope);

        let total = self
            .scalar_count(
                &format!(
                    "SELECT COUNT(DISTINCT ase.student_id) FROM answer_submitted_events ase \
                     LEFT JOIN quiz_sessions qs ON qs.session_id = ase.session_id WHERE {filter}"
                ),
                [scope_id.clone()],
            )
            .await?;

        let (limit, offset) = page_bounds(pagination);
        let sql = STUDENT_RANKINGS.replace("{scope}", filter);
        let mut rows = self
            .conn()
            .query(&sql, libsql::params![scope_id, limit, offset])
            .await?;

        let mut data = Vec::new();
        while let Some(row) = rows.next().await? {
            let student_id: String = row.get(0)?;
            let accuracy_rate: Option<f64> = row.get(4)?;
            data.push(RankingRow {
                student_id: parse_id(&student_id, "student_id")?,
                student_name: row.get(1)?,
                answers_submitted: count(&row, 2)?,
                correct_answers: count(&row, 3)?,
                accuracy_rate: accuracy_rate.unwrap_or(0.0),
                rank: count(&row, 5)?,
            });
        }

        Ok(PaginatedResponse::new(data, pagination, total))
    }

    #[instrument(skip(self), level = "debug")]
    async fn quiz_usage(&self, quiz_id: QuizId) -> Result<QuizUsage> {
        let content = self.quiz_content(quiz_id).await?;
        let title = self
            .scalar_text(
                "SELECT title FROM quizzes WHERE quiz_id = ?1",
                [quiz_id.to_string()],
            )
            .await?;
        let answered_questions = self
            .scalar_count(QUIZ_ANSWERED_QUESTIONS, [quiz_id.to_string()])
            .await?;
        let possible_answers = self
            .scalar_count(QUIZ_POSSIBLE_ANSWERS, [quiz_id.to_string()])
            .await?;

        let mut usage = QuizUsage {
            title,
            active_students: content.active_students,
            roster_students: content.roster_students,
            total_questions: content.total_questions,
            total_answers: content.total_answers,
            correct_answers: content.correct_answers,
            answered_questions,
            possible_answers,
            ..QuizUsage::default()
        };

        let mut rows = self
            .conn()
            .query(
                "SELECT COUNT(*), COUNT(DISTINCT classroom_id), MIN(started_at), MAX(started_at) \
                 FROM quiz_sessions WHERE quiz_id = ?1",
                [quiz_id.to_string()],
            )
            .await?;
        if let Some(row) = rows.next().await? {
            usage.total_sessions = count(&row, 0)?;
            usage.total_classrooms = count(&row, 1)?;
            usage.first_used = optional_time(&row, 2)?;
            usage.last_used = optional_time(&row, 3)?;
        }
        Ok(usage)
    }

    #[instrument(skip(self), level = "debug")]
    async fn question_stats(&self, question_id: QuestionId) -> Result<QuestionStats> {
        let quiz_id = self
            .scalar_text(QUESTION_QUIZ, [question_id.to_string()])
            .await?
            .map(|raw| parse_id(&raw, "quiz_id"))
            .transpose()?;
        let usage_count = self
            .scalar_count(
                "SELECT COUNT(DISTINCT session_id) FROM question_published_events WHERE question_id = ?1",
                [question_id.to_string()],
            )
            .await?;

        let mut stats = QuestionStats {
            quiz_id,
            usage_count,
            ..QuestionStats::default()
        };

        let mut rows = self
            .conn()
            .query(
                &format!(
                    "SELECT COUNT(ase.event_id), SUM(ase.is_correct), AVG({ANSWER_LATENCY}) \
                     FROM answer_submitted_events ase WHERE ase.question_id = ?1"
                ),
                [question_id.to_string()],
            )
            .await?;
        if let Some(row) = rows.next().await? {
            stats.total_attempts = count(&row, 0)?;
            stats.correct_attempts = count(&row, 1)?;
            stats.average_latency_ms = row.get(2)?;
        }

        let mut rows = self
            .conn()
            .query(
                "SELECT answer, COUNT(*) FROM answer_submitted_events \
                 WHERE question_id = ?1 GROUP BY answer",
                [question_id.to_string()],
            )
            .await?;
        let mut answer_distribution = BTreeMap::new();
        while let Some(row) = rows.next().await? {
            let answer: String = row.get(0)?;
            answer_distribution.insert(answer, count(&row, 1)?);
        }
        stats.answer_distribution = answer_distribution;

        Ok(stats)
    }

    #[instrument(skip(self), level = "debug")]
    async fn quiz_questions(
        &self,
        quiz_id: QuizId,
        pagination: PaginationParams,
    ) -> Result<PaginatedResponse<QuizQuestionRow>> {
        let total = self
            .scalar_count(
                &format!("SELECT COUNT(*) FROM ({QUIZ_QUESTION_IDS})"),
                [quiz_id.to_string()],
            )
            .await?;

        let (limit, offset) = page_bounds(pagination);
        let sql = QUIZ_QUESTIONS.replace("{ids}", QUIZ_QUESTION_IDS);
        let mut rows = self
            .conn()
            .query(&sql, libsql::params![quiz_id.to_string(), limit, offset])
            .await?;

        let mut data = Vec::new();
        while let Some(row) = rows.next().await? {
            let question_id: String = row.get(0)?;
            data.push(QuizQuestionRow {
                question_id: parse_id(&question_id, "question_id")?,
                first_published_at: optional_time(&row, 1)?,
                sessions_used: count(&row, 2)?,
                total_attempts: count(&row, 3)?,
                correct_attempts: count(&row, 4)?,
            });
        }

        Ok(PaginatedResponse::new(data, pagination, total))
    }

    #[instrument(skip(self), level = "debug")]
    async fn quiz_sessions(
        &self,
        quiz_id: QuizId,
        pagination: PaginationParams,
    ) -> Result<PaginatedResponse<SessionSummaryRow>> {
        self.session_summaries(QUIZ_SCOPE, quiz_id.to_string(), pagination)
            .await
    }

    #[instrument(skip(self), level = "debug")]
    async fn classroom_engagement_history(
        &self,
        classroom_id: ClassroomId,
        since: DateTime<Utc>,
        pagination: PaginationParams,
    ) -> Result<PaginatedResponse<EngagementPeriodRow>> {
        let total = self
            .scalar_count(
                "SELECT COUNT(DISTINCT date(started_at / 1000, 'unixepoch')) \
                 FROM quiz_sessions WHERE classroom_id = ?1 AND started_at >= ?2",
                libsql::params![classroom_id.to_string(), to_millis(since)],
            )
            .await?;

        let (limit, offset) = page_bounds(pagination);
        let mut rows = self
            .conn()
            .query(
                ENGAGEMENT_HISTORY,
                libsql::params![classroom_id.to_string(), to_millis(since), limit, offset],
            )
            .await?;

        let mut data = Vec::new();
        while let Some(row) = rows.next().await? {
            let day: String = row.get(0)?;
            let date = NaiveDate::parse_from_str(&day, "%Y-%m-%d")
                .map_err(|_| Error::InvalidDate(day.clone()))?;
            data.push(EngagementPeriodRow {
                date,
                sessions: count(&row, 1)?,
                questions_published: count(&row, 2)?,
                active_students: count(&row, 3)?,
                total_answers: count(&row, 4)?,
                correct_answers: count(&row, 5)?,
            });
        }

        Ok(PaginatedResponse::new(data, pagination, total))
    }

    #[instrument(skip(self), level = "debug")]
    async fn classroom_overview(
        &self,
        classroom_id: ClassroomId,
        recent_since: DateTime<Utc>,
    ) -> Result<ClassroomOverviewRow> {
        let name = self
            .scalar_text(
                "SELECT name FROM classrooms WHERE classroom_id = ?1",
                [classroom_id.to_string()],
            )
            .await?;
        let total_students = self.classroom_roster_size(classroom_id).await?;
        let active_students = self
            .scalar_count(
                "SELECT COUNT(DISTINCT ase.student_id) FROM answer_submitted_events ase \
                 JOIN quiz_sessions qs ON qs.session_id = ase.session_id \
                 JOIN classroom_students cs ON cs.classroom_id = qs.classroom_id AND cs.student_id = ase.student_id \
                 WHERE qs.classroom_id = ?1",
                [classroom_id.to_string()],
            )
            .await?;

        let mut overview = ClassroomOverviewRow {
            name,
            total_students,
            active_students,
            ..ClassroomOverviewRow::default()
        };

        let mut rows = self
            .conn()
            .query(
                "SELECT COUNT(*), COALESCE(SUM(started_at >= ?2), 0), COUNT(DISTINCT quiz_id), MAX(started_at) \
                 FROM quiz_sessions WHERE classroom_id = ?1",
                libsql::params![classroom_id.to_string(), to_millis(recent_since)],
            )
            .await?;
        if let Some(row) = rows.next().await? {
            overview.total_sessions = count(&row, 0)?;
            overview.recent_sessions = count(&row, 1)?;
            overview.total_quizzes = count(&row, 2)?;
            overview.last_session_at = optional_time(&row, 3)?;
        }
        Ok(overview)
    }

    #[instrument(skip(self), level = "debug")]
    async fn class_performance(&self, classroom_id: ClassroomId) -> Result<ClassPerformanceRow> {
        let total_students = self.classroom_roster_size(classroom_id).await?;
        let total_sessions = self
            .scalar_count(
                "SELECT COUNT(*) FROM quiz_sessions WHERE classroom_id = ?1",
                [classroom_id.to_string()],
            )
            .await?;

        let mut performance = ClassPerformanceRow {
            total_students,
            total_sessions,
            ..ClassPerformanceRow::default()
        };

        let mut rows = self
            .conn()
            .query(
                &format!(
                    "SELECT COUNT(DISTINCT ase.student_id), COUNT(ase.event_id), SUM(ase.is_correct), AVG({ANSWER_LATENCY}) \
                     FROM quiz_sessions qs JOIN answer_submitted_events ase ON ase.session_id = qs.session_id \
                     WHERE qs.classroom_id = ?1"
                ),
                [classroom_id.to_string()],
            )
            .await?;
        if let Some(row) = rows.next().await? {
            performance.participating_students = count(&row, 0)?;
            performance.total_answers = count(&row, 1)?;
            performance.correct_answers = count(&row, 2)?;
            performance.average_latency_ms = row.get(3)?;
        }
        Ok(performance)
    }

    #[instrument(skip(self), level = "debug")]
    async fn student_activity(
        &self,
        student_id: StudentId,
        classroom_id: ClassroomId,
    ) -> Result<StudentActivityRow> {
        let mut rows = self
            .conn()
            .query(
                &format!(
                    "SELECT COUNT(DISTINCT ase.session_id), COUNT(DISTINCT qs.quiz_id), COUNT(ase.event_id), \
                     SUM(ase.is_correct), AVG({ANSWER_LATENCY}), MIN(ase.submitted_at), MAX(ase.submitted_at) \
                     FROM answer_submitted_events ase JOIN quiz_sessions qs ON qs.session_id = ase.session_id \
                     WHERE ase.student_id = ?1 AND qs.classroom_id = ?2"
                ),
                libsql::params![student_id.to_string(), classroom_id.to_string()],
            )
            .await?;

        let Some(row) = rows.next().await? else {
            return Ok(StudentActivityRow::default());
        };
        Ok(StudentActivityRow {
            sessions_participated: count(&row, 0)?,
            unique_quizzes: count(&row, 1)?,
            questions_answered: count(&row, 2)?,
            correct_answers: count(&row, 3)?,
            average_latency_ms: row.get(4)?,
            first_activity: optional_time(&row, 5)?,
            last_activity: optional_time(&row, 6)?,
        })
    }
}
