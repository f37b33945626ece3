//! Named reports, printed as JSON.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::{Args, Subcommand};
use classpulse_analytics::ReportAggregator;
use classpulse_store::{
    ClassroomId, PaginationParams, QuestionId, QuizId, RankingScope, SessionId, StudentId,
};
use humantime_serde::re::humantime;

use super::{open_store, print_json};
use crate::config::ClasspulseConfig;

#[derive(Debug, Args)]
pub struct ReportArgs {
    #[command(subcommand)]
    pub command: ReportCommand,
}

#[derive(Debug, Args)]
pub struct QuestionArgs {
    #[arg(long)]
    pub session: SessionId,
    #[arg(long)]
    pub question: QuestionId,
}

#[derive(Debug, Clone, Copy, Args)]
pub struct PageArgs {
    /// 1-based page number
    #[arg(long, default_value_t = 1)]
    pub page: i64,
    #[arg(long, default_value_t = 50)]
    pub page_size: i64,
}

impl From<PageArgs> for PaginationParams {
    fn from(args: PageArgs) -> Self {
        PaginationParams::new(args.page, args.page_size)
    }
}

#[derive(Debug, Subcommand)]
pub enum ReportCommand {
    /// Students who answered recently in a session
    Participants {
        #[arg(long)]
        session: SessionId,
        /// How far back to look, e.g. 5m or 1h
        #[arg(long, default_value = "5m", value_parser = humantime::parse_duration)]
        window: Duration,
        #[command(flatten)]
        page: PageArgs,
    },
    /// Share of the roster that answered a question
    ResponseRate(QuestionArgs),
    /// Publish-to-answer latency of a question
    Latency(QuestionArgs),
    /// Students who let a question time out
    Timeouts(QuestionArgs),
    /// Students who answered every question of a session
    Completion {
        #[arg(long)]
        session: SessionId,
    },
    /// Per-question dropoff through a session
    Dropoff {
        #[arg(long)]
        session: SessionId,
    },
    /// Students ranked by accuracy within a classroom or session
    Rankings {
        #[arg(long, conflicts_with = "session", required_unless_present = "session")]
        classroom: Option<ClassroomId>,
        #[arg(long)]
        session: Option<SessionId>,
        #[command(flatten)]
        page: PageArgs,
    },
    /// Question publishing pace of a session
    Pace {
        #[arg(long)]
        session: SessionId,
    },
    /// One student's results in a classroom
    Student {
        #[arg(long)]
        student: StudentId,
        #[arg(long)]
        classroom: ClassroomId,
    },
    /// Classroom engagement over a window
    Engagement {
        #[arg(long)]
        classroom: ClassroomId,
        /// How far back to look, e.g. 7days
        #[arg(long, default_value = "30days", value_parser = humantime::parse_duration)]
        window: Duration,
    },
    /// How well a quiz performs across its sessions
    Content {
        #[arg(long)]
        quiz: QuizId,
    },
    /// Every student of a classroom with accuracy and activity
    Students {
        #[arg(long)]
        classroom: ClassroomId,
        #[command(flatten)]
        page: PageArgs,
    },
    /// Sessions of a classroom, newest first
    Sessions {
        #[arg(long)]
        classroom: ClassroomId,
        #[command(flatten)]
        page: PageArgs,
    },
    /// Usage, results and reach of a quiz
    QuizSummary {
        #[arg(long)]
        quiz: QuizId,
    },
    /// Accuracy, speed and answer spread of a question across sessions
    Question {
        #[arg(long)]
        question: QuestionId,
    },
    /// Questions of a quiz in first-publish order
    QuizQuestions {
        #[arg(long)]
        quiz: QuizId,
        #[command(flatten)]
        page: PageArgs,
    },
    /// Sessions that ran a quiz, newest first
    QuizSessions {
        #[arg(long)]
        quiz: QuizId,
        #[command(flatten)]
        page: PageArgs,
    },
    /// Day-by-day classroom activity over a window
    EngagementHistory {
        #[arg(long)]
        classroom: ClassroomId,
        #[arg(long, default_value = "30days", value_parser = humantime::parse_duration)]
        window: Duration,
        #[command(flatten)]
        page: PageArgs,
    },
    /// Roster, sessions and recent activity of a classroom
    Overview {
        #[arg(long)]
        classroom: ClassroomId,
    },
    /// Whole-class accuracy and participation against targets
    ClassPerformance {
        #[arg(long)]
        classroom: ClassroomId,
    },
    /// How often and how broadly a student takes part
    StudentActivity {
        #[arg(long)]
        student: StudentId,
        #[arg(long)]
        classroom: ClassroomId,
    },
}

pub async fn run(args: ReportArgs, config: ClasspulseConfig) -> Result<()> {
    let store = Arc::new(open_store(&config.storage).await?);
    let reports = ReportAggregator::new(store);

    match args.command {
        ReportCommand::Participants {
            session,
            window,
            page,
        } => print_json(
            &reports
                .active_participants(session, window, page.into())
                .await?,
        ),
        ReportCommand::ResponseRate(q) => {
            print_json(&reports.response_rate(q.session, q.question).await?)
        }
        ReportCommand::Latency(q) => print_json(&reports.latency(q.session, q.question).await?),
        ReportCommand::Timeouts(q) => {
            print_json(&reports.timeout_and_skipped(q.session, q.question).await?)
        }
        ReportCommand::Completion { session } => {
            print_json(&reports.completion_rate(session).await?)
        }
        ReportCommand::Dropoff { session } => print_json(&reports.dropoff_points(session).await?),
        ReportCommand::Rankings {
            classroom,
            session,
            page,
        } => {
            let scope = match (classroom, session) {
                (Some(classroom), _) => RankingScope::Classroom(classroom),
                (None, Some(session)) => RankingScope::Session(session),
                (None, None) => anyhow::bail!("either --classroom or --session is required"),
            };
            print_json(&reports.student_rankings(scope, page.into()).await?)
        }
        ReportCommand::Pace { session } => {
            print_json(&reports.questions_per_minute(session).await?)
        }
        ReportCommand::Student { student, classroom } => {
            print_json(&reports.student_performance(student, classroom).await?)
        }
        ReportCommand::Engagement { classroom, window } => {
            print_json(&reports.classroom_engagement(classroom, window).await?)
        }
        ReportCommand::Content { quiz } => {
            print_json(&reports.content_effectiveness(quiz).await?)
        }
        ReportCommand::Students { classroom, page } => print_json(
            &reports
                .student_performance_list(classroom, page.into())
                .await?,
        ),
        ReportCommand::Sessions { classroom, page } => {
            print_json(&reports.classroom_sessions(classroom, page.into()).await?)
        }
        ReportCommand::QuizSummary { quiz } => print_json(&reports.quiz_summary(quiz).await?),
        ReportCommand::Question { question } => {
            print_json(&reports.question_analysis(question).await?)
        }
        ReportCommand::QuizQuestions { quiz, page } => {
            print_json(&reports.quiz_questions(quiz, page.into()).await?)
        }
        ReportCommand::QuizSessions { quiz, page } => {
            print_json(&reports.quiz_sessions(quiz, page.into()).await?)
        }
        ReportCommand::EngagementHistory {
            classroom,
            window,
            page,
        } => print_json(
            &reports
                .classroom_engagement_history(classroom, window, page.into())
                .await?,
        ),
        ReportCommand::Overview { classroom } => {
            print_json(&reports.classroom_overview(classroom).await?)
        }
        ReportCommand::ClassPerformance { classroom } => {
            print_json(&reports.class_performance_summary(classroom).await?)
        }
        ReportCommand::StudentActivity { student, classroom } => {
            print_json(&reports.student_activity_summary(student, classroom).await?)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct TestCli {
        #[command(subcommand)]
        command: ReportCommand,
    }

    const SESSION: &str = "0195d1a2-0000-7000-8000-0000000000aa";
    const CLASSROOM: &str = "0195d1a2-0000-7000-8000-0000000000cc";
    const STUDENT: &str = "0195d1a2-0000-7000-8000-0000000000dd";
    const QUIZ: &str = "0195d1a2-0000-7000-8000-0000000000ee";

    #[test]
    fn test_participants_window_parses_humantime() {
        let cli = TestCli::parse_from(["test", "participants", "--session", SESSION, "--window", "90s"]);
        match cli.command {
            ReportCommand::Participants { window, page, .. } => {
                assert_eq!(window, Duration::from_secs(90));
                assert_eq!(PaginationParams::from(page), PaginationParams::default());
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_rankings_scope_is_exclusive() {
        assert!(TestCli::try_parse_from(["test", "rankings"]).is_err());
        assert!(
            TestCli::try_parse_from([
                "test",
                "rankings",
                "--classroom",
                CLASSROOM,
                "--session",
                SESSION
            ])
            .is_err()
        );
        assert!(TestCli::try_parse_from(["test", "rankings", "--session", SESSION]).is_ok());
    }

    #[test]
    fn test_engagement_history_defaults() {
        let cli = TestCli::parse_from([
            "test",
            "engagement-history",
            "--classroom",
            CLASSROOM,
            "--page",
            "2",
        ]);
        match cli.command {
            ReportCommand::EngagementHistory { window, page, .. } => {
                assert_eq!(window, Duration::from_secs(30 * 24 * 60 * 60));
                assert_eq!(PaginationParams::from(page).offset(), 50);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_student_activity_needs_both_ids() {
        assert!(
            TestCli::try_parse_from(["test", "student-activity", "--classroom", CLASSROOM])
                .is_err()
        );
        assert!(
            TestCli::try_parse_from([
                "test",
                "student-activity",
                "--classroom",
                CLASSROOM,
                "--student",
                STUDENT
            ])
            .is_ok()
        );
    }

    #[test]
    fn test_malformed_ids_are_rejected() {
        assert!(TestCli::try_parse_from(["test", "completion", "--session", "nope"]).is_err());
    }

    #[tokio::test]
    async fn test_reports_run_against_empty_store() {
        let mut config = ClasspulseConfig::default();
        config.storage.path = ":memory:".into();

        let args = ReportArgs {
            command: TestCli::parse_from(["test", "dropoff", "--session", SESSION]).command,
        };
        run(args, config).await.unwrap();
    }

    #[tokio::test]
    async fn test_quiz_and_classroom_reports_run_against_empty_store() {
        for command in [
            vec!["test", "quiz-summary", "--quiz", QUIZ],
            vec!["test", "quiz-sessions", "--quiz", QUIZ],
            vec!["test", "overview", "--classroom", CLASSROOM],
            vec!["test", "class-performance", "--classroom", CLASSROOM],
        ] {
            let mut config = ClasspulseConfig::default();
            config.storage.path = ":memory:".into();
            let args = ReportArgs {
                command: TestCli::parse_from(command).command,
            };
            run(args, config).await.unwrap();
        }
    }
}
