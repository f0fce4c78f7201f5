// src/test_support.rs

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Method, Request, header},
};
use chrono::{DateTime, Utc};
use sqlx::types::Json;

use crate::{
    config::Config,
    error::AppError,
    models::{
        answer_option::{AnswerOption, NewOption},
        attempt::{Attempt, Submission},
        question::Question,
        quiz::{Difficulty, NewQuiz, Quiz, QuizSnapshot},
        user::{Role, User},
    },
    routes,
    services::attempts::restart_attempt,
    state::AppState,
    store::QuizStore,
    utils::jwt::sign_jwt,
};

const TEST_SECRET: &str = "test_secret_for_router_tests";

#[derive(Default)]
struct Tables {
    next_id: i64,
    users: Vec<User>,
    quizzes: Vec<Quiz>,
    questions: Vec<Question>,
    options: Vec<AnswerOption>,
    attempts: Vec<Attempt>,
}

impl Tables {
    fn id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

/// In-memory `QuizStore`. One mutex serializes every operation, which
/// gives the same per-(user, quiz) atomicity the Postgres store has.
#[derive(Default)]
pub(crate) struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    fn tables(&self) -> std::sync::MutexGuard<'_, Tables> {
        self.tables.lock().expect("memory store lock")
    }

    pub(crate) fn attempt_rows(&self, user_id: i64, quiz_id: i64) -> Vec<Attempt> {
        self.tables()
            .attempts
            .iter()
            .filter(|a| a.user_id == user_id && a.quiz_id == quiz_id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl QuizStore for MemoryStore {
    async fn create_user(
        &self,
        username: &str,
        password_hash: &str,
        role: Role,
    ) -> Result<User, AppError> {
        let mut t = self.tables();
        if t.users.iter().any(|u| u.username == username) {
            return Err(AppError::Conflict(format!("Username '{}' already exists", username)));
        }
        let user = User {
            id: t.id(),
            username: username.to_string(),
            password: password_hash.to_string(),
            role: role.as_str().to_string(),
            created_at: Utc::now(),
        };
        t.users.push(user.clone());
        Ok(user)
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        Ok(self.tables().users.iter().find(|u| u.username == username).cloned())
    }

    async fn find_user(&self, id: i64) -> Result<Option<User>, AppError> {
        Ok(self.tables().users.iter().find(|u| u.id == id).cloned())
    }

    async fn list_users(&self) -> Result<Vec<User>, AppError> {
        let mut users = self.tables().users.clone();
        users.sort_by_key(|u| std::cmp::Reverse(u.id));
        Ok(users)
    }

    async fn update_user_role(&self, id: i64, role: Role) -> Result<Option<User>, AppError> {
        let mut t = self.tables();
        Ok(t.users.iter_mut().find(|u| u.id == id).map(|u| {
            u.role = role.as_str().to_string();
            u.clone()
        }))
    }

    async fn list_quizzes(&self) -> Result<Vec<Quiz>, AppError> {
        let mut quizzes = self.tables().quizzes.clone();
        quizzes.sort_by_key(|q| std::cmp::Reverse((q.created_at, q.id)));
        Ok(quizzes)
    }

    async fn find_quiz(&self, id: i64) -> Result<Option<Quiz>, AppError> {
        Ok(self.tables().quizzes.iter().find(|q| q.id == id).cloned())
    }

    async fn load_snapshot(&self, quiz_id: i64) -> Result<Option<QuizSnapshot>, AppError> {
        let t = self.tables();
        let Some(quiz) = t.quizzes.iter().find(|q| q.id == quiz_id).cloned() else {
            return Ok(None);
        };
        let questions: Vec<Question> = t
            .questions
            .iter()
            .filter(|q| q.quiz_id == quiz_id)
            .cloned()
            .collect();
        let options = t
            .options
            .iter()
            .filter(|o| questions.iter().any(|q| q.id == o.question_id))
            .cloned()
            .collect();
        Ok(Some(QuizSnapshot::assemble(quiz, questions, options)))
    }

    async fn insert_quiz(&self, quiz: NewQuiz) -> Result<Quiz, AppError> {
        let mut t = self.tables();
        let quiz = Quiz {
            id: t.id(),
            title: quiz.title,
            description: quiz.description,
            created_by: Some(quiz.created_by),
            created_at: Utc::now(),
            duration_minutes: quiz.duration_minutes,
            difficulty: quiz.difficulty,
            is_active: quiz.is_active,
            available_until: quiz.available_until,
        };
        t.quizzes.push(quiz.clone());
        Ok(quiz)
    }

    async fn update_quiz(&self, quiz: &Quiz) -> Result<Quiz, AppError> {
        let mut t = self.tables();
        let stored = t
            .quizzes
            .iter_mut()
            .find(|q| q.id == quiz.id)
            .ok_or(AppError::NotFound("Quiz not found".to_string()))?;
        *stored = Quiz {
            created_by: stored.created_by,
            created_at: stored.created_at,
            ..quiz.clone()
        };
        Ok(stored.clone())
    }

    async fn delete_quiz(&self, id: i64) -> Result<bool, AppError> {
        let mut t = self.tables();
        let before = t.quizzes.len();
        t.quizzes.retain(|q| q.id != id);
        if t.quizzes.len() == before {
            return Ok(false);
        }
        let question_ids: Vec<i64> = t
            .questions
            .iter()
            .filter(|q| q.quiz_id == id)
            .map(|q| q.id)
            .collect();
        t.questions.retain(|q| q.quiz_id != id);
        t.options.retain(|o| !question_ids.contains(&o.question_id));
        t.attempts.retain(|a| a.quiz_id != id);
        Ok(true)
    }

    async fn find_question(&self, id: i64) -> Result<Option<Question>, AppError> {
        Ok(self.tables().questions.iter().find(|q| q.id == id).cloned())
    }

    async fn insert_question(
        &self,
        quiz_id: i64,
        text: &str,
        order: i32,
    ) -> Result<Question, AppError> {
        let mut t = self.tables();
        let question = Question {
            id: t.id(),
            quiz_id,
            text: text.to_string(),
            order,
        };
        t.questions.push(question.clone());
        Ok(question)
    }

    async fn update_question(&self, question: &Question) -> Result<Question, AppError> {
        let mut t = self.tables();
        let stored = t
            .questions
            .iter_mut()
            .find(|q| q.id == question.id)
            .ok_or(AppError::NotFound("Question not found".to_string()))?;
        stored.text = question.text.clone();
        stored.order = question.order;
        Ok(stored.clone())
    }

    async fn delete_question(&self, id: i64) -> Result<bool, AppError> {
        let mut t = self.tables();
        let before = t.questions.len();
        t.questions.retain(|q| q.id != id);
        t.options.retain(|o| o.question_id != id);
        Ok(t.questions.len() != before)
    }

    async fn find_option(&self, id: i64) -> Result<Option<AnswerOption>, AppError> {
        Ok(self.tables().options.iter().find(|o| o.id == id).cloned())
    }

    async fn insert_option(&self, option: NewOption) -> Result<AnswerOption, AppError> {
        let mut t = self.tables();
        let option = AnswerOption {
            id: t.id(),
            question_id: option.question_id,
            text: option.text,
            is_correct: option.is_correct,
            feedback: option.feedback,
        };
        t.options.push(option.clone());
        Ok(option)
    }

    async fn update_option(&self, option: &AnswerOption) -> Result<AnswerOption, AppError> {
        let mut t = self.tables();
        let stored = t
            .options
            .iter_mut()
            .find(|o| o.id == option.id)
            .ok_or(AppError::NotFound("Option not found".to_string()))?;
        stored.text = option.text.clone();
        stored.is_correct = option.is_correct;
        stored.feedback = option.feedback.clone();
        Ok(stored.clone())
    }

    async fn delete_option(&self, id: i64) -> Result<bool, AppError> {
        let mut t = self.tables();
        let before = t.options.len();
        t.options.retain(|o| o.id != id);
        Ok(t.options.len() != before)
    }

    async fn start_attempt(
        &self,
        user_id: i64,
        quiz_id: i64,
        now: DateTime<Utc>,
    ) -> Result<Attempt, AppError> {
        let mut t = self.tables();
        if let Some(existing) = t
            .attempts
            .iter_mut()
            .find(|a| a.user_id == user_id && a.quiz_id == quiz_id)
        {
            *existing = restart_attempt(existing.clone(), now);
            return Ok(existing.clone());
        }

        let attempt = Attempt {
            id: t.id(),
            user_id,
            quiz_id,
            score: 0,
            started_at: now,
            completed_at: None,
            answers: Json(Submission::new()),
            attempt_number: 1,
        };
        t.attempts.push(attempt.clone());
        Ok(attempt)
    }

    async fn find_attempt(&self, id: i64) -> Result<Option<Attempt>, AppError> {
        Ok(self.tables().attempts.iter().find(|a| a.id == id).cloned())
    }

    async fn complete_attempt(
        &self,
        id: i64,
        score: i32,
        answers: &Submission,
        completed_at: DateTime<Utc>,
    ) -> Result<Option<Attempt>, AppError> {
        let mut t = self.tables();
        let Some(attempt) = t
            .attempts
            .iter_mut()
            .find(|a| a.id == id && a.completed_at.is_none())
        else {
            return Ok(None);
        };
        attempt.score = score;
        attempt.answers = Json(answers.clone());
        attempt.completed_at = Some(completed_at);
        Ok(Some(attempt.clone()))
    }

    async fn list_attempts_for_quiz(&self, quiz_id: i64) -> Result<Vec<Attempt>, AppError> {
        Ok(self
            .tables()
            .attempts
            .iter()
            .filter(|a| a.quiz_id == quiz_id)
            .cloned()
            .collect())
    }

    async fn list_attempts_for_user(&self, user_id: i64) -> Result<Vec<Attempt>, AppError> {
        Ok(self
            .tables()
            .attempts
            .iter()
            .filter(|a| a.user_id == user_id)
            .cloned()
            .collect())
    }
}

pub(crate) struct TestContext {
    pub(crate) store: Arc<MemoryStore>,
    pub(crate) config: Config,
    pub(crate) app: Router,
}

pub(crate) fn test_config() -> Config {
    Config {
        database_url: "postgres://unused".to_string(),
        jwt_secret: TEST_SECRET.to_string(),
        jwt_expiration: 600,
        rust_log: "error".to_string(),
        admin_username: None,
        admin_password: None,
        server_port: 0,
    }
}

pub(crate) fn setup_test_context() -> TestContext {
    let store = Arc::new(MemoryStore::default());
    let config = test_config();
    let state = AppState {
        store: store.clone(),
        config: config.clone(),
    };
    TestContext {
        app: routes::create_router(state),
        store,
        config,
    }
}

/// Inserts a user directly; the password hash is a placeholder.
pub(crate) async fn insert_user(store: &MemoryStore, username: &str, role: Role) -> User {
    store
        .create_user(username, "unused-hash", role)
        .await
        .expect("insert user")
}

pub(crate) fn bearer_token(user: &User, config: &Config) -> String {
    let role = user.role.parse::<Role>().expect("role");
    sign_jwt(user.id, role, &config.jwt_secret, config.jwt_expiration).expect("token")
}

/// Ids of the two-question "Geography" quiz.
pub(crate) struct Geography {
    pub(crate) quiz_id: i64,
    pub(crate) q1: i64,
    pub(crate) q1_correct: i64,
    pub(crate) q1_wrong: [i64; 2],
    pub(crate) q2: i64,
    pub(crate) q2_correct: i64,
    pub(crate) q2_wrong: i64,
}

pub(crate) async fn seed_geography(store: &MemoryStore, creator_id: i64) -> Geography {
    let quiz = store
        .insert_quiz(NewQuiz {
            title: "Geography".to_string(),
            description: Some("Capitals and rivers".to_string()),
            created_by: creator_id,
            duration_minutes: 10,
            difficulty: Difficulty::Easy,
            is_active: true,
            available_until: None,
        })
        .await
        .expect("quiz");

    let q1 = store
        .insert_question(quiz.id, "Capital of France?", 1)
        .await
        .expect("q1");
    let q2 = store
        .insert_question(quiz.id, "Longest river?", 2)
        .await
        .expect("q2");

    let option = |question_id: i64, text: &str, is_correct: bool| NewOption {
        question_id,
        text: text.to_string(),
        is_correct,
        feedback: None,
    };

    let q1_correct = store.insert_option(option(q1.id, "Paris", true)).await.expect("o");
    let q1_wrong_a = store.insert_option(option(q1.id, "Lyon", false)).await.expect("o");
    let q1_wrong_b = store.insert_option(option(q1.id, "Nice", false)).await.expect("o");
    let q2_correct = store.insert_option(option(q2.id, "Nile", true)).await.expect("o");
    let q2_wrong = store.insert_option(option(q2.id, "Seine", false)).await.expect("o");

    Geography {
        quiz_id: quiz.id,
        q1: q1.id,
        q1_correct: q1_correct.id,
        q1_wrong: [q1_wrong_a.id, q1_wrong_b.id],
        q2: q2.id,
        q2_correct: q2_correct.id,
        q2_wrong: q2_wrong.id,
    }
}

pub(crate) fn json_request(
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<serde_json::Value>,
) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);

    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }

    if let Some(body) = body {
        let bytes = serde_json::to_vec(&body).expect("serialize body");
        builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(bytes))
            .expect("request body")
    } else {
        builder.body(Body::empty()).expect("request body")
    }
}

pub(crate) async fn read_json(response: axum::response::Response) -> serde_json::Value {
    let body = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body");
    if body.is_empty() {
        return serde_json::Value::Null;
    }
    serde_json::from_slice(&body).unwrap_or_else(|err| {
        let body_text = String::from_utf8_lossy(&body);
        panic!("json parse: {err}; body: {body_text}");
    })
}
