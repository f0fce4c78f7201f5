// src/store/mod.rs

//! Storage boundary for quizzes, users and the attempt ledger.

pub mod postgres;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{
    error::AppError,
    models::{
        answer_option::{AnswerOption, NewOption},
        attempt::{Attempt, Submission},
        question::Question,
        quiz::{NewQuiz, Quiz, QuizSnapshot},
        user::{Role, User},
    },
};

pub use postgres::PgStore;

/// Shared handle used by handlers and services.
pub type DynStore = Arc<dyn QuizStore>;

#[async_trait]
pub trait QuizStore: Send + Sync {
    /// Fails with `Conflict` when the username is taken.
    async fn create_user(&self, username: &str, password_hash: &str, role: Role)
    -> Result<User, AppError>;
    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, AppError>;
    async fn find_user(&self, id: i64) -> Result<Option<User>, AppError>;
    async fn list_users(&self) -> Result<Vec<User>, AppError>;
    async fn update_user_role(&self, id: i64, role: Role) -> Result<Option<User>, AppError>;

    /// Every quiz, newest first.
    async fn list_quizzes(&self) -> Result<Vec<Quiz>, AppError>;
    async fn find_quiz(&self, id: i64) -> Result<Option<Quiz>, AppError>;
    /// Quiz, questions and options read together.
    async fn load_snapshot(&self, quiz_id: i64) -> Result<Option<QuizSnapshot>, AppError>;
    async fn insert_quiz(&self, quiz: NewQuiz) -> Result<Quiz, AppError>;
    /// Writes every mutable field of `quiz`.
    async fn update_quiz(&self, quiz: &Quiz) -> Result<Quiz, AppError>;
    /// Cascades to questions, options and attempts.
    async fn delete_quiz(&self, id: i64) -> Result<bool, AppError>;

    async fn find_question(&self, id: i64) -> Result<Option<Question>, AppError>;
    async fn insert_question(&self, quiz_id: i64, text: &str, order: i32)
    -> Result<Question, AppError>;
    async fn update_question(&self, question: &Question) -> Result<Question, AppError>;
    async fn delete_question(&self, id: i64) -> Result<bool, AppError>;

    async fn find_option(&self, id: i64) -> Result<Option<AnswerOption>, AppError>;
    async fn insert_option(&self, option: NewOption) -> Result<AnswerOption, AppError>;
    async fn update_option(&self, option: &AnswerOption) -> Result<AnswerOption, AppError>;
    async fn delete_option(&self, id: i64) -> Result<bool, AppError>;

    /// Fetch-or-create the (user, quiz) attempt and apply the start transition.
    /// Atomic per (user, quiz).
    async fn start_attempt(
        &self,
        user_id: i64,
        quiz_id: i64,
        now: DateTime<Utc>,
    ) -> Result<Attempt, AppError>;
    async fn find_attempt(&self, id: i64) -> Result<Option<Attempt>, AppError>;
    /// Sets score, answers and completion time in one write, only if the
    /// attempt is still in progress. `None` means it was not.
    async fn complete_attempt(
        &self,
        id: i64,
        score: i32,
        answers: &Submission,
        completed_at: DateTime<Utc>,
    ) -> Result<Option<Attempt>, AppError>;
    async fn list_attempts_for_quiz(&self, quiz_id: i64) -> Result<Vec<Attempt>, AppError>;
    async fn list_attempts_for_user(&self, user_id: i64) -> Result<Vec<Attempt>, AppError>;
}
