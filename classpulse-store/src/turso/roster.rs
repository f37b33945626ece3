//! [`RosterStore`] on libSQL.

use async_trait::async_trait;
use tracing::instrument;

use super::{TursoStore, parse_id};
use crate::error::Result;
use crate::ids::{ClassroomId, QuestionId, QuizId, StudentId};
use crate::records::{Classroom, Question, Quiz, Student};
use crate::traits::RosterStore;

#[async_trait]
impl RosterStore for TursoStore {
    #[instrument(skip(self, quiz), fields(quiz_id = %quiz.quiz_id), level = "debug")]
    async fn create_quiz(&self, quiz: &Quiz) -> Result<()> {
        self.conn()
            .execute(
                "INSERT INTO quizzes (quiz_id, title, description) VALUES (?1, ?2, ?3)",
                libsql::params![
                    quiz.quiz_id.to_string(),
                    quiz.title.clone(),
                    quiz.description.clone()
                ],
            )
            .await?;
        Ok(())
    }

    #[instrument(skip(self), level = "debug")]
    async fn get_quiz(&self, quiz_id: QuizId) -> Result<Option<Quiz>> {
        let mut rows = self
            .conn()
            .query(
                "SELECT quiz_id, title, description FROM quizzes WHERE quiz_id = ?1",
                [quiz_id.to_string()],
            )
            .await?;

        let Some(row) = rows.next().await? else {
            return Ok(None);
        };
        let id: String = row.get(0)?;
        Ok(Some(Quiz {
            quiz_id: parse_id(&id, "quiz_id")?,
            title: row.get(1)?,
            description: row.get(2)?,
        }))
    }

    #[instrument(skip(self, question), fields(question_id = %question.question_id), level = "debug")]
    async fn create_question(&self, question: &Question) -> Result<()> {
        self.conn()
            .execute(
                "INSERT INTO questions (question_id, quiz_id) VALUES (?1, ?2)",
                libsql::params![question.question_id.to_string(), question.quiz_id.to_string()],
            )
            .await?;
        Ok(())
    }

    #[instrument(skip(self), level = "debug")]
    async fn get_question(&self, question_id: QuestionId) -> Result<Option<Question>> {
        let mut rows = self
            .conn()
            .query(
                "SELECT question_id, quiz_id FROM questions WHERE question_id = ?1",
                [question_id.to_string()],
            )
            .await?;

        let Some(row) = rows.next().await? else {
            return Ok(None);
        };
        let id: String = row.get(0)?;
        let quiz_id: String = row.get(1)?;
        Ok(Some(Question {
            question_id: parse_id(&id, "question_id")?,
            quiz_id: parse_id(&quiz_id, "quiz_id")?,
        }))
    }

    #[instrument(skip(self, classroom), fields(classroom_id = %classroom.classroom_id), level = "debug")]
    async fn create_classroom(&self, classroom: &Classroom) -> Result<()> {
        self.conn()
            .execute(
                "INSERT INTO classrooms (classroom_id, name) VALUES (?1, ?2)",
                libsql::params![classroom.classroom_id.to_string(), classroom.name.clone()],
            )
            .await?;
        Ok(())
    }

    #[instrument(skip(self, student), fields(student_id = %student.student_id), level = "debug")]
    async fn create_student(&self, student: &Student) -> Result<()> {
        self.conn()
            .execute(
                "INSERT INTO students (student_id, name) VALUES (?1, ?2)",
                libsql::params![student.student_id.to_string(), student.name.clone()],
            )
            .await?;
        Ok(())
    }

    #[instrument(skip(self), level = "debug")]
    async fn enroll_student(&self, classroom_id: ClassroomId, student_id: StudentId) -> Result<()> {
        self.conn()
            .execute(
                "INSERT OR IGNORE INTO classroom_students (classroom_id, student_id) VALUES (?1, ?2)",
                libsql::params![classroom_id.to_string(), student_id.to_string()],
            )
            .await?;
        Ok(())
    }

    #[instrument(skip(self), level = "debug")]
    async fn classroom_students(&self, classroom_id: ClassroomId) -> Result<Vec<Student>> {
        let mut rows = self
            .conn()
            .query(
                "SELECT cs.student_id, s.name FROM classroom_students cs LEFT JOIN students s ON s.student_id = cs.student_id WHERE cs.classroom_id = ?1 ORDER BY cs.student_id",
                [classroom_id.to_string()],
            )
            .await?;

        let mut students = Vec::new();
        while let Some(row) = rows.next().await? {
            let id: String = row.get(0)?;
            students.push(Student {
                student_id: parse_id(&id, "student_id")?,
                name: row.get(1)?,
            });
        }
        Ok(students)
    }
}
