//! Inbound event payloads and the typed events decoded from them.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use classpulse_store::{
    ClassroomId, EventId, QuestionId, QuestionPublished, QuizId, QuizSession, SessionId, StudentId,
};
use serde::{Deserialize, Serialize};

use crate::error::ProcessError;

/// Event discriminator as it appears on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventType {
    QuestionPublished,
    AnswerSubmitted,
    SessionStarted,
}

impl EventType {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::QuestionPublished => "QUESTION_PUBLISHED",
            Self::AnswerSubmitted => "ANSWER_SUBMITTED",
            Self::SessionStarted => "SESSION_STARTED",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventType {
    type Err = ProcessError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "QUESTION_PUBLISHED" => Ok(Self::QuestionPublished),
            "ANSWER_SUBMITTED" => Ok(Self::AnswerSubmitted),
            "SESSION_STARTED" => Ok(Self::SessionStarted),
            other => Err(ProcessError::UnknownEventType(other.to_string())),
        }
    }
}

/// A student's answer to a multiple-choice question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AnswerChoice {
    A,
    B,
    C,
    D,
}

impl AnswerChoice {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::A => "A",
            Self::B => "B",
            Self::C => "C",
            Self::D => "D",
        }
    }
}

impl fmt::Display for AnswerChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AnswerChoice {
    type Err = ProcessError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "A" => Ok(Self::A),
            "B" => Ok(Self::B),
            "C" => Ok(Self::C),
            "D" => Ok(Self::D),
            other => Err(ProcessError::invalid(format!("unrecognized answer: {other:?}"))),
        }
    }
}

/// Event as received from a client or read off the queue.
///
/// Identifiers are kept as strings so malformed values reach [`Event::decode`]
/// and are rejected there with a precise message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventPayload {
    pub event_id: String,
    pub event_type: String,
    pub timestamp: DateTime<Utc>,
    pub session_id: String,
    #[serde(default)]
    pub quiz_id: String,
    #[serde(default)]
    pub classroom_id: String,
    #[serde(default)]
    pub question_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub teacher_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timer_sec: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub student_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_time_ms: Option<i64>,
}

impl EventPayload {
    pub fn new(
        event_type: EventType,
        event_id: impl fmt::Display,
        session_id: impl fmt::Display,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            event_id: event_id.to_string(),
            event_type: event_type.to_string(),
            timestamp,
            session_id: session_id.to_string(),
            quiz_id: String::new(),
            classroom_id: String::new(),
            question_id: String::new(),
            teacher_id: None,
            timer_sec: None,
            student_id: None,
            answer: None,
            response_time_ms: None,
        }
    }

    /// Payload for a teacher publishing a question.
    pub fn question_published(
        session_id: SessionId,
        question_id: QuestionId,
        published_at: DateTime<Utc>,
        timer_sec: i64,
    ) -> Self {
        Self::new(EventType::QuestionPublished, EventId::new(), session_id, published_at)
            .with_question(question_id)
            .with_timer(timer_sec)
    }

    /// Payload for a student answering a question.
    pub fn answer_submitted(
        session_id: SessionId,
        question_id: QuestionId,
        student_id: StudentId,
        answer: &str,
        submitted_at: DateTime<Utc>,
    ) -> Self {
        Self::new(EventType::AnswerSubmitted, EventId::new(), session_id, submitted_at)
            .with_question(question_id)
            .with_student(student_id)
            .with_answer(answer)
    }

    /// Payload for a session starting in a classroom.
    pub fn session_started(
        session_id: SessionId,
        quiz_id: QuizId,
        classroom_id: ClassroomId,
        started_at: DateTime<Utc>,
    ) -> Self {
        let mut payload =
            Self::new(EventType::SessionStarted, EventId::new(), session_id, started_at);
        payload.quiz_id = quiz_id.to_string();
        payload.classroom_id = classroom_id.to_string();
        payload
    }

    #[must_use]
    pub fn with_question(mut self, question_id: impl fmt::Display) -> Self {
        self.question_id = question_id.to_string();
        self
    }

    #[must_use]
    pub fn with_teacher(mut self, teacher_id: impl fmt::Display) -> Self {
        self.teacher_id = Some(teacher_id.to_string());
        self
    }

    #[must_use]
    pub fn with_timer(mut self, timer_sec: i64) -> Self {
        self.timer_sec = Some(timer_sec);
        self
    }

    #[must_use]
    pub fn with_student(mut self, student_id: impl fmt::Display) -> Self {
        self.student_id = Some(student_id.to_string());
        self
    }

    #[must_use]
    pub fn with_answer(mut self, answer: impl Into<String>) -> Self {
        self.answer = Some(answer.into());
        self
    }
}

/// A validated answer, before correctness is derived.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerSubmission {
    pub event_id: EventId,
    pub session_id: SessionId,
    pub question_id: QuestionId,
    pub student_id: StudentId,
    pub answer: AnswerChoice,
    pub submitted_at: DateTime<Utc>,
    /// Client-measured response time; informational only.
    pub response_time_ms: Option<i64>,
}

/// A decoded domain event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    QuestionPublished(QuestionPublished),
    AnswerSubmitted(AnswerSubmission),
    SessionStarted { event_id: EventId, session: QuizSession },
}

impl Event {
    /// Decode a wire payload, validating every identifier it needs.
    pub fn decode(payload: &EventPayload) -> Result<Self, ProcessError> {
        let event_type: EventType = payload.event_type.parse()?;
        let event_id: EventId = parse_field("event_id", &payload.event_id)?;
        let session_id: SessionId = parse_field("session_id", &payload.session_id)?;

        match event_type {
            EventType::QuestionPublished => {
                let timer = payload.timer_sec.unwrap_or(0);
                let timer_duration_secs = u32::try_from(timer).map_err(|_| {
                    ProcessError::invalid(format!("invalid timer_sec: {timer}"))
                })?;
                Ok(Self::QuestionPublished(QuestionPublished {
                    event_id,
                    session_id,
                    question_id: parse_field("question_id", &payload.question_id)?,
                    teacher_id: payload
                        .teacher_id
                        .as_deref()
                        .map(|t| parse_field("teacher_id", t))
                        .transpose()?,
                    published_at: payload.timestamp,
                    timer_duration_secs,
                }))
            }
            EventType::AnswerSubmitted => {
                let (Some(student_id), Some(answer)) = (&payload.student_id, &payload.answer)
                else {
                    return Err(ProcessError::invalid(
                        "student_id and answer are required for ANSWER_SUBMITTED events",
                    ));
                };
                Ok(Self::AnswerSubmitted(AnswerSubmission {
                    event_id,
                    session_id,
                    question_id: parse_field("question_id", &payload.question_id)?,
                    student_id: parse_field("student_id", student_id)?,
                    answer: answer.parse()?,
                    submitted_at: payload.timestamp,
                    response_time_ms: payload.response_time_ms,
                }))
            }
            EventType::SessionStarted => Ok(Self::SessionStarted {
                event_id,
                session: QuizSession {
                    session_id,
                    quiz_id: parse_field("quiz_id", &payload.quiz_id)?,
                    classroom_id: parse_field("classroom_id", &payload.classroom_id)?,
                    started_at: payload.timestamp,
                    ended_at: None,
                },
            }),
        }
    }

    #[must_use]
    pub fn event_type(&self) -> EventType {
        match self {
            Self::QuestionPublished(_) => EventType::QuestionPublished,
            Self::AnswerSubmitted(_) => EventType::AnswerSubmitted,
            Self::SessionStarted { .. } => EventType::SessionStarted,
        }
    }

    #[must_use]
    pub fn event_id(&self) -> EventId {
        match self {
            Self::QuestionPublished(e) => e.event_id,
            Self::AnswerSubmitted(e) => e.event_id,
            Self::SessionStarted { event_id, .. } => *event_id,
        }
    }

    #[must_use]
    pub fn session_id(&self) -> SessionId {
        match self {
            Self::QuestionPublished(e) => e.session_id,
            Self::AnswerSubmitted(e) => e.session_id,
            Self::SessionStarted { session, .. } => session.session_id,
        }
    }
}

fn parse_field<T: FromStr>(field: &str, raw: &str) -> Result<T, ProcessError> {
    if raw.is_empty() {
        return Err(ProcessError::invalid(format!("{field} is required")));
    }
    raw.parse()
        .map_err(|_| ProcessError::invalid(format!("invalid {field}: {raw:?}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap()
    }

    #[test]
    fn payload_deserializes_from_client_json() {
        let json = r#"{
            "event_id": "0195a1b2-0000-7000-8000-000000000001",
            "event_type": "ANSWER_SUBMITTED",
            "timestamp": "2025-03-01T09:00:10Z",
            "session_id": "0195a1b2-0000-7000-8000-000000000002",
            "quiz_id": "0195a1b2-0000-7000-8000-000000000003",
            "classroom_id": "0195a1b2-0000-7000-8000-000000000004",
            "question_id": "0195a1b2-0000-7000-8000-000000000005",
            "student_id": "0195a1b2-0000-7000-8000-000000000006",
            "answer": "C",
            "response_time_ms": 9500
        }"#;

        let payload: EventPayload = serde_json::from_str(json).unwrap();
        let Event::AnswerSubmitted(answer) = Event::decode(&payload).unwrap() else {
            panic!("expected an answer");
        };
        assert_eq!(answer.answer, AnswerChoice::C);
        assert_eq!(answer.response_time_ms, Some(9500));
        assert_eq!(answer.submitted_at, t0() + chrono::Duration::seconds(10));
    }

    #[test]
    fn missing_timer_means_no_deadline() {
        let mut payload =
            EventPayload::question_published(SessionId::new(), QuestionId::new(), t0(), 30);
        payload.timer_sec = None;

        let Event::QuestionPublished(published) = Event::decode(&payload).unwrap() else {
            panic!("expected a publication");
        };
        assert_eq!(published.timer_duration_secs, 0);
        assert!(published.deadline().is_none());
    }

    #[test]
    fn negative_timer_is_rejected() {
        let payload =
            EventPayload::question_published(SessionId::new(), QuestionId::new(), t0(), -5);
        let err = Event::decode(&payload).unwrap_err();
        assert!(matches!(err, ProcessError::InvalidInput(_)));
    }

    #[test]
    fn unknown_event_type_is_reported() {
        let payload = EventPayload {
            event_type: "QUIZ_ENDED".to_string(),
            ..EventPayload::session_started(SessionId::new(), QuizId::new(), ClassroomId::new(), t0())
        };
        let err = Event::decode(&payload).unwrap_err();
        assert!(matches!(err, ProcessError::UnknownEventType(t) if t == "QUIZ_ENDED"));
    }

    #[test]
    fn malformed_uuid_names_the_field() {
        let payload = EventPayload::question_published(SessionId::new(), QuestionId::new(), t0(), 30)
            .with_teacher("not-a-uuid");
        let err = Event::decode(&payload).unwrap_err();
        assert_eq!(err.to_string(), "invalid input: invalid teacher_id: \"not-a-uuid\"");
    }

    #[test]
    fn answer_requires_student_and_choice() {
        let mut payload = EventPayload::answer_submitted(
            SessionId::new(),
            QuestionId::new(),
            StudentId::new(),
            "A",
            t0(),
        );
        payload.student_id = None;
        assert!(matches!(
            Event::decode(&payload),
            Err(ProcessError::InvalidInput(_))
        ));
    }

    #[test]
    fn answer_literal_must_be_a_known_choice() {
        for literal in ["E", "a", "", "AB"] {
            let payload = EventPayload::answer_submitted(
                SessionId::new(),
                QuestionId::new(),
                StudentId::new(),
                literal,
                t0(),
            );
            assert!(
                matches!(Event::decode(&payload), Err(ProcessError::InvalidInput(_))),
                "{literal:?} should be rejected"
            );
        }
    }

    #[test]
    fn session_start_requires_quiz_and_classroom() {
        let mut payload =
            EventPayload::session_started(SessionId::new(), QuizId::new(), ClassroomId::new(), t0());
        payload.classroom_id.clear();
        let err = Event::decode(&payload).unwrap_err();
        assert_eq!(err.to_string(), "invalid input: classroom_id is required");
    }

    #[test]
    fn event_type_round_trips_through_its_wire_name() {
        for event_type in [
            EventType::QuestionPublished,
            EventType::AnswerSubmitted,
            EventType::SessionStarted,
        ] {
            assert_eq!(event_type.as_str().parse::<EventType>().unwrap(), event_type);
        }
    }
}
