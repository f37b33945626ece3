//! Answer correctness.

use std::collections::HashMap;

use classpulse_store::QuestionId;

use crate::event::AnswerChoice;

/// Decides whether an answer to a question is correct.
pub trait AnswerKey: Send + Sync {
    fn is_correct(&self, question_id: QuestionId, answer: AnswerChoice) -> bool;
}

/// Fixed rule used when no per-question key is known: A and C are correct.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultAnswerKey;

impl AnswerKey for DefaultAnswerKey {
    fn is_correct(&self, _question_id: QuestionId, answer: AnswerChoice) -> bool {
        matches!(answer, AnswerChoice::A | AnswerChoice::C)
    }
}

/// Correct choice per question, falling back to [`DefaultAnswerKey`] for
/// questions it does not know.
#[derive(Debug, Clone, Default)]
pub struct PerQuestionAnswerKey {
    correct: HashMap<QuestionId, AnswerChoice>,
}

impl PerQuestionAnswerKey {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_answer(mut self, question_id: QuestionId, correct: AnswerChoice) -> Self {
        self.correct.insert(question_id, correct);
        self
    }

    pub fn insert(&mut self, question_id: QuestionId, correct: AnswerChoice) {
        self.correct.insert(question_id, correct);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.correct.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.correct.is_empty()
    }
}

impl AnswerKey for PerQuestionAnswerKey {
    fn is_correct(&self, question_id: QuestionId, answer: AnswerChoice) -> bool {
        match self.correct.get(&question_id) {
            Some(correct) => *correct == answer,
            None => DefaultAnswerKey.is_correct(question_id, answer),
        }
    }
}
