//! Table definitions.
//!
//! Timestamps are INTEGER milliseconds since the Unix epoch; identifiers are
//! canonical hyphenated UUID text.

pub(super) const QUIZZES: &str = r#"
CREATE TABLE IF NOT EXISTS quizzes (
    quiz_id TEXT PRIMARY KEY,
    title TEXT NOT NULL,
    description TEXT
)
"#;

pub(super) const CLASSROOMS: &str = r#"
CREATE TABLE IF NOT EXISTS classrooms (
    classroom_id TEXT PRIMARY KEY,
    name TEXT NOT NULL
)
"#;

pub(super) const STUDENTS: &str = r#"
CREATE TABLE IF NOT EXISTS students (
    student_id TEXT PRIMARY KEY,
    name TEXT
)
"#;

pub(super) const CLASSROOM_STUDENTS: &str = r#"
CREATE TABLE IF NOT EXISTS classroom_students (
    classroom_id TEXT NOT NULL,
    student_id TEXT NOT NULL,
    PRIMARY KEY (classroom_id, student_id)
)
"#;

pub(super) const QUESTIONS: &str = r#"
CREATE TABLE IF NOT EXISTS questions (
    question_id TEXT PRIMARY KEY,
    quiz_id TEXT NOT NULL
)
"#;

pub(super) const QUIZ_SESSIONS: &str = r#"
CREATE TABLE IF NOT EXISTS quiz_sessions (
    session_id TEXT PRIMARY KEY,
    quiz_id TEXT NOT NULL,
    classroom_id TEXT NOT NULL,
    started_at INTEGER NOT NULL,
    ended_at INTEGER
)
"#;

pub(super) const QUESTION_PUBLISHED_EVENTS: &str = r#"
CREATE TABLE IF NOT EXISTS question_published_events (
    event_id TEXT PRIMARY KEY,
    session_id TEXT NOT NULL,
    question_id TEXT NOT NULL,
    teacher_id TEXT,
    published_at INTEGER NOT NULL,
    timer_duration_sec INTEGER NOT NULL
)
"#;

pub(super) const ANSWER_SUBMITTED_EVENTS: &str = r#"
CREATE TABLE IF NOT EXISTS answer_submitted_events (
    event_id TEXT PRIMARY KEY,
    session_id TEXT NOT NULL,
    question_id TEXT NOT NULL,
    student_id TEXT NOT NULL,
    answer TEXT NOT NULL,
    is_correct INTEGER NOT NULL,
    submitted_at INTEGER NOT NULL
)
"#;

pub(super) const INDEXES: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS idx_qpe_session_question ON question_published_events(session_id, question_id, published_at)",
    "CREATE INDEX IF NOT EXISTS idx_ase_session_question ON answer_submitted_events(session_id, question_id)",
    "CREATE INDEX IF NOT EXISTS idx_ase_student ON answer_submitted_events(student_id)",
    "CREATE INDEX IF NOT EXISTS idx_sessions_classroom ON quiz_sessions(classroom_id, started_at)",
    "CREATE INDEX IF NOT EXISTS idx_sessions_quiz ON quiz_sessions(quiz_id)",
];

pub(super) const TABLES: &[&str] = &[
    QUIZZES,
    CLASSROOMS,
    STUDENTS,
    CLASSROOM_STUDENTS,
    QUESTIONS,
    QUIZ_SESSIONS,
    QUESTION_PUBLISHED_EVENTS,
    ANSWER_SUBMITTED_EVENTS,
];
