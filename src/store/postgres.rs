// src/store/postgres.rs

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, types::Json};

use crate::{
    error::AppError,
    models::{
        answer_option::{AnswerOption, NewOption},
        attempt::{Attempt, Submission},
        question::Question,
        quiz::{NewQuiz, Quiz, QuizRow, QuizSnapshot},
        user::{Role, User},
    },
    services::attempts::restart_attempt,
    store::QuizStore,
};

const USER_COLUMNS: &str = "id, username, password, role, created_at";
const QUIZ_COLUMNS: &str = "id, title, description, created_by, created_at, duration_minutes, \
                            difficulty, is_active, available_until";
const QUESTION_COLUMNS: &str = "id, quiz_id, text, display_order";
const OPTION_COLUMNS: &str = "id, question_id, text, is_correct, feedback";
const ATTEMPT_COLUMNS: &str =
    "id, user_id, quiz_id, score, started_at, completed_at, answers, attempt_number";

/// PostgreSQL-backed store.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .is_some_and(|db| db.is_unique_violation())
}

#[async_trait]
impl QuizStore for PgStore {
    async fn create_user(
        &self,
        username: &str,
        password_hash: &str,
        role: Role,
    ) -> Result<User, AppError> {
        let sql = format!(
            "INSERT INTO users (username, password, role) VALUES ($1, $2, $3) RETURNING {USER_COLUMNS}"
        );
        sqlx::query_as::<_, User>(&sql)
            .bind(username)
            .bind(password_hash)
            .bind(role.as_str())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    AppError::Conflict(format!("Username '{}' already exists", username))
                } else {
                    tracing::error!("Failed to create user: {:?}", e);
                    AppError::from(e)
                }
            })
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE username = $1");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn find_user(&self, id: i64) -> Result<Option<User>, AppError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn list_users(&self) -> Result<Vec<User>, AppError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users ORDER BY id DESC");
        let users = sqlx::query_as::<_, User>(&sql)
            .fetch_all(&self.pool)
            .await?;
        Ok(users)
    }

    async fn update_user_role(&self, id: i64, role: Role) -> Result<Option<User>, AppError> {
        let sql = format!("UPDATE users SET role = $1 WHERE id = $2 RETURNING {USER_COLUMNS}");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(role.as_str())
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn list_quizzes(&self) -> Result<Vec<Quiz>, AppError> {
        let sql = format!("SELECT {QUIZ_COLUMNS} FROM quizzes ORDER BY created_at DESC, id DESC");
        sqlx::query_as::<_, QuizRow>(&sql)
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(Quiz::try_from)
            .collect()
    }

    async fn find_quiz(&self, id: i64) -> Result<Option<Quiz>, AppError> {
        let sql = format!("SELECT {QUIZ_COLUMNS} FROM quizzes WHERE id = $1");
        sqlx::query_as::<_, QuizRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(Quiz::try_from)
            .transpose()
    }

    async fn load_snapshot(&self, quiz_id: i64) -> Result<Option<QuizSnapshot>, AppError> {
        let mut tx = self.pool.begin().await?;

        let sql = format!("SELECT {QUIZ_COLUMNS} FROM quizzes WHERE id = $1");
        let Some(row) = sqlx::query_as::<_, QuizRow>(&sql)
            .bind(quiz_id)
            .fetch_optional(&mut *tx)
            .await?
        else {
            return Ok(None);
        };
        let quiz = Quiz::try_from(row)?;

        let sql = format!("SELECT {QUESTION_COLUMNS} FROM questions WHERE quiz_id = $1");
        let questions = sqlx::query_as::<_, Question>(&sql)
            .bind(quiz_id)
            .fetch_all(&mut *tx)
            .await?;

        let options = sqlx::query_as::<_, AnswerOption>(
            r#"
            SELECT o.id, o.question_id, o.text, o.is_correct, o.feedback
            FROM options o
            JOIN questions q ON q.id = o.question_id
            WHERE q.quiz_id = $1
            "#,
        )
        .bind(quiz_id)
        .fetch_all(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(Some(QuizSnapshot::assemble(quiz, questions, options)))
    }

    async fn insert_quiz(&self, quiz: NewQuiz) -> Result<Quiz, AppError> {
        let sql = format!(
            r#"
            INSERT INTO quizzes
            (title, description, created_by, duration_minutes, difficulty, is_active, available_until)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {QUIZ_COLUMNS}
            "#
        );
        let row = sqlx::query_as::<_, QuizRow>(&sql)
            .bind(&quiz.title)
            .bind(&quiz.description)
            .bind(quiz.created_by)
            .bind(quiz.duration_minutes)
            .bind(quiz.difficulty.code())
            .bind(quiz.is_active)
            .bind(quiz.available_until)
            .fetch_one(&self.pool)
            .await?;
        Quiz::try_from(row)
    }

    async fn update_quiz(&self, quiz: &Quiz) -> Result<Quiz, AppError> {
        let sql = format!(
            r#"
            UPDATE quizzes SET
                title = $1,
                description = $2,
                duration_minutes = $3,
                difficulty = $4,
                is_active = $5,
                available_until = $6
            WHERE id = $7
            RETURNING {QUIZ_COLUMNS}
            "#
        );
        let row = sqlx::query_as::<_, QuizRow>(&sql)
            .bind(&quiz.title)
            .bind(&quiz.description)
            .bind(quiz.duration_minutes)
            .bind(quiz.difficulty.code())
            .bind(quiz.is_active)
            .bind(quiz.available_until)
            .bind(quiz.id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(AppError::NotFound("Quiz not found".to_string()))?;
        Quiz::try_from(row)
    }

    async fn delete_quiz(&self, id: i64) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM quizzes WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn find_question(&self, id: i64) -> Result<Option<Question>, AppError> {
        let sql = format!("SELECT {QUESTION_COLUMNS} FROM questions WHERE id = $1");
        let question = sqlx::query_as::<_, Question>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(question)
    }

    async fn insert_question(
        &self,
        quiz_id: i64,
        text: &str,
        order: i32,
    ) -> Result<Question, AppError> {
        let sql = format!(
            "INSERT INTO questions (quiz_id, text, display_order) VALUES ($1, $2, $3) \
             RETURNING {QUESTION_COLUMNS}"
        );
        let question = sqlx::query_as::<_, Question>(&sql)
            .bind(quiz_id)
            .bind(text)
            .bind(order)
            .fetch_one(&self.pool)
            .await?;
        Ok(question)
    }

    async fn update_question(&self, question: &Question) -> Result<Question, AppError> {
        let sql = format!(
            "UPDATE questions SET text = $1, display_order = $2 WHERE id = $3 \
             RETURNING {QUESTION_COLUMNS}"
        );
        sqlx::query_as::<_, Question>(&sql)
            .bind(&question.text)
            .bind(question.order)
            .bind(question.id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(AppError::NotFound("Question not found".to_string()))
    }

    async fn delete_question(&self, id: i64) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM questions WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn find_option(&self, id: i64) -> Result<Option<AnswerOption>, AppError> {
        let sql = format!("SELECT {OPTION_COLUMNS} FROM options WHERE id = $1");
        let option = sqlx::query_as::<_, AnswerOption>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(option)
    }

    async fn insert_option(&self, option: NewOption) -> Result<AnswerOption, AppError> {
        let sql = format!(
            "INSERT INTO options (question_id, text, is_correct, feedback) VALUES ($1, $2, $3, $4) \
             RETURNING {OPTION_COLUMNS}"
        );
        let option = sqlx::query_as::<_, AnswerOption>(&sql)
            .bind(option.question_id)
            .bind(&option.text)
            .bind(option.is_correct)
            .bind(&option.feedback)
            .fetch_one(&self.pool)
            .await?;
        Ok(option)
    }

    async fn update_option(&self, option: &AnswerOption) -> Result<AnswerOption, AppError> {
        let sql = format!(
            "UPDATE options SET text = $1, is_correct = $2, feedback = $3 WHERE id = $4 \
             RETURNING {OPTION_COLUMNS}"
        );
        sqlx::query_as::<_, AnswerOption>(&sql)
            .bind(&option.text)
            .bind(option.is_correct)
            .bind(&option.feedback)
            .bind(option.id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(AppError::NotFound("Option not found".to_string()))
    }

    async fn delete_option(&self, id: i64) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM options WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn start_attempt(
        &self,
        user_id: i64,
        quiz_id: i64,
        now: DateTime<Utc>,
    ) -> Result<Attempt, AppError> {
        let mut tx = self.pool.begin().await?;

        // A concurrent first start blocks here until the other insert commits,
        // then falls through to the locked re-entry path.
        let sql = format!(
            "INSERT INTO attempts (user_id, quiz_id, started_at) VALUES ($1, $2, $3) \
             ON CONFLICT (user_id, quiz_id) DO NOTHING RETURNING {ATTEMPT_COLUMNS}"
        );
        let inserted = sqlx::query_as::<_, Attempt>(&sql)
            .bind(user_id)
            .bind(quiz_id)
            .bind(now)
            .fetch_optional(&mut *tx)
            .await?;

        if let Some(attempt) = inserted {
            tx.commit().await?;
            return Ok(attempt);
        }

        let sql = format!(
            "SELECT {ATTEMPT_COLUMNS} FROM attempts WHERE user_id = $1 AND quiz_id = $2 FOR UPDATE"
        );
        let existing = sqlx::query_as::<_, Attempt>(&sql)
            .bind(user_id)
            .bind(quiz_id)
            .fetch_one(&mut *tx)
            .await?;

        let next = restart_attempt(existing, now);

        let sql = format!(
            r#"
            UPDATE attempts SET
                score = $1,
                started_at = $2,
                completed_at = $3,
                answers = $4,
                attempt_number = $5
            WHERE id = $6
            RETURNING {ATTEMPT_COLUMNS}
            "#
        );
        let attempt = sqlx::query_as::<_, Attempt>(&sql)
            .bind(next.score)
            .bind(next.started_at)
            .bind(next.completed_at)
            .bind(&next.answers)
            .bind(next.attempt_number)
            .bind(next.id)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(attempt)
    }

    async fn find_attempt(&self, id: i64) -> Result<Option<Attempt>, AppError> {
        let sql = format!("SELECT {ATTEMPT_COLUMNS} FROM attempts WHERE id = $1");
        let attempt = sqlx::query_as::<_, Attempt>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(attempt)
    }

    async fn complete_attempt(
        &self,
        id: i64,
        score: i32,
        answers: &Submission,
        completed_at: DateTime<Utc>,
    ) -> Result<Option<Attempt>, AppError> {
        let sql = format!(
            r#"
            UPDATE attempts SET
                score = $1,
                answers = $2,
                completed_at = $3
            WHERE id = $4 AND completed_at IS NULL
            RETURNING {ATTEMPT_COLUMNS}
            "#
        );
        let attempt = sqlx::query_as::<_, Attempt>(&sql)
            .bind(score)
            .bind(Json(answers))
            .bind(completed_at)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(attempt)
    }

    async fn list_attempts_for_quiz(&self, quiz_id: i64) -> Result<Vec<Attempt>, AppError> {
        let sql = format!(
            "SELECT {ATTEMPT_COLUMNS} FROM attempts WHERE quiz_id = $1 ORDER BY started_at DESC, id DESC"
        );
        let attempts = sqlx::query_as::<_, Attempt>(&sql)
            .bind(quiz_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(attempts)
    }

    async fn list_attempts_for_user(&self, user_id: i64) -> Result<Vec<Attempt>, AppError> {
        let sql = format!(
            "SELECT {ATTEMPT_COLUMNS} FROM attempts WHERE user_id = $1 ORDER BY started_at DESC, id DESC"
        );
        let attempts = sqlx::query_as::<_, Attempt>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(attempts)
    }
}
