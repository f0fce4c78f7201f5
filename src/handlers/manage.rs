// src/handlers/manage.rs

//! Quiz authoring: quizzes, questions and options.
//!
//! Routes sit behind `auth_middleware` + `staff_middleware`. Beyond that,
//! everything except creating a quiz requires the caller to be the quiz
//! creator or a superuser.

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use validator::Validate;

use crate::{
    error::AppError,
    models::{
        answer_option::{CreateOptionRequest, NewOption, UpdateOptionRequest},
        attempt::AttemptSummary,
        question::{CreateQuestionRequest, Question, UpdateQuestionRequest},
        quiz::{CreateQuizRequest, DEFAULT_DURATION_MINUTES, NewQuiz, Quiz, UpdateQuizRequest},
    },
    services::access::{Identity, ensure_quiz_manager},
    store::{DynStore, QuizStore},
    utils::html::{clean_optional, clean_text},
};

// Column widths in the schema. Cleaning escapes entities (`&` -> `&amp;`),
// so the stored text is checked again after sanitizing.
const QUIZ_TITLE_MAX: usize = 200;
const QUESTION_TEXT_MAX: usize = 500;
const OPTION_TEXT_MAX: usize = 100;

/// Sanitizes a mandatory text field; blank or over-long after cleaning is a
/// bad request.
fn required_text(input: &str, field: &str, max_chars: usize) -> Result<String, AppError> {
    let cleaned = clean_text(input);
    if cleaned.is_empty() {
        return Err(AppError::BadRequest(format!("{} cannot be empty", field)));
    }
    if cleaned.chars().count() > max_chars {
        return Err(AppError::BadRequest(format!(
            "{} is too long after sanitizing (max {} characters)",
            field, max_chars
        )));
    }
    Ok(cleaned)
}

/// Loads a quiz and checks the caller may manage it.
async fn managed_quiz(
    store: &dyn QuizStore,
    identity: &Identity,
    quiz_id: i64,
) -> Result<Quiz, AppError> {
    let quiz = store
        .find_quiz(quiz_id)
        .await?
        .ok_or(AppError::NotFound("Quiz not found".to_string()))?;
    ensure_quiz_manager(identity, &quiz)?;
    Ok(quiz)
}

/// Loads a question and checks the caller may manage its quiz.
async fn managed_question(
    store: &dyn QuizStore,
    identity: &Identity,
    question_id: i64,
) -> Result<Question, AppError> {
    let question = store
        .find_question(question_id)
        .await?
        .ok_or(AppError::NotFound("Question not found".to_string()))?;
    managed_quiz(store, identity, question.quiz_id).await?;
    Ok(question)
}

/// Creates a quiz owned by the caller.
pub async fn create_quiz(
    State(store): State<DynStore>,
    Extension(identity): Extension<Identity>,
    Json(payload): Json<CreateQuizRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let quiz = store
        .insert_quiz(NewQuiz {
            title: required_text(&payload.title, "title", QUIZ_TITLE_MAX)?,
            description: clean_optional(payload.description.as_deref()),
            created_by: identity.user_id,
            duration_minutes: payload.duration_minutes.unwrap_or(DEFAULT_DURATION_MINUTES),
            difficulty: payload.difficulty,
            is_active: payload.is_active.unwrap_or(true),
            available_until: payload.available_until,
        })
        .await?;

    tracing::info!(quiz_id = quiz.id, user_id = identity.user_id, "Quiz created");

    Ok((StatusCode::CREATED, Json(quiz)))
}

/// Full quiz including correctness flags and feedback.
pub async fn get_managed_quiz(
    State(store): State<DynStore>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let snapshot = store
        .load_snapshot(id)
        .await?
        .ok_or(AppError::NotFound("Quiz not found".to_string()))?;
    ensure_quiz_manager(&identity, &snapshot.quiz)?;

    Ok(Json(snapshot))
}

/// Updates quiz fields. Absent fields are kept.
pub async fn update_quiz(
    State(store): State<DynStore>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateQuizRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let mut quiz = managed_quiz(store.as_ref(), &identity, id).await?;

    if let Some(title) = payload.title.as_deref() {
        quiz.title = required_text(title, "title", QUIZ_TITLE_MAX)?;
    }
    if let Some(description) = payload.description.as_deref() {
        quiz.description = clean_optional(Some(description));
    }
    if let Some(duration) = payload.duration_minutes {
        quiz.duration_minutes = duration;
    }
    if let Some(difficulty) = payload.difficulty {
        quiz.difficulty = difficulty;
    }
    if let Some(is_active) = payload.is_active {
        quiz.is_active = is_active;
    }
    if payload.clear_available_until {
        quiz.available_until = None;
    } else if let Some(until) = payload.available_until {
        quiz.available_until = Some(until);
    }

    let quiz = store.update_quiz(&quiz).await?;
    Ok(Json(quiz))
}

/// Deletes a quiz with its questions, options and attempts.
pub async fn delete_quiz(
    State(store): State<DynStore>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    managed_quiz(store.as_ref(), &identity, id).await?;

    if !store.delete_quiz(id).await? {
        return Err(AppError::NotFound("Quiz not found".to_string()));
    }

    tracing::info!(quiz_id = id, user_id = identity.user_id, "Quiz deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// Every attempt made at a quiz.
pub async fn list_quiz_attempts(
    State(store): State<DynStore>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    managed_quiz(store.as_ref(), &identity, id).await?;

    let attempts: Vec<AttemptSummary> = store
        .list_attempts_for_quiz(id)
        .await?
        .into_iter()
        .map(AttemptSummary::from)
        .collect();

    Ok(Json(attempts))
}

pub async fn create_question(
    State(store): State<DynStore>,
    Extension(identity): Extension<Identity>,
    Path(quiz_id): Path<i64>,
    Json(payload): Json<CreateQuestionRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let quiz = managed_quiz(store.as_ref(), &identity, quiz_id).await?;
    let text = required_text(&payload.text, "text", QUESTION_TEXT_MAX)?;

    let question = store.insert_question(quiz.id, &text, payload.order).await?;

    Ok((StatusCode::CREATED, Json(question)))
}

pub async fn update_question(
    State(store): State<DynStore>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateQuestionRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let mut question = managed_question(store.as_ref(), &identity, id).await?;

    if let Some(text) = payload.text.as_deref() {
        question.text = required_text(text, "text", QUESTION_TEXT_MAX)?;
    }
    if let Some(order) = payload.order {
        question.order = order;
    }

    let question = store.update_question(&question).await?;
    Ok(Json(question))
}

pub async fn delete_question(
    State(store): State<DynStore>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    managed_question(store.as_ref(), &identity, id).await?;

    if !store.delete_question(id).await? {
        return Err(AppError::NotFound("Question not found".to_string()));
    }

    Ok(StatusCode::NO_CONTENT)
}

pub async fn create_option(
    State(store): State<DynStore>,
    Extension(identity): Extension<Identity>,
    Path(question_id): Path<i64>,
    Json(payload): Json<CreateOptionRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let question = managed_question(store.as_ref(), &identity, question_id).await?;

    let option = store
        .insert_option(NewOption {
            question_id: question.id,
            text: required_text(&payload.text, "text", OPTION_TEXT_MAX)?,
            is_correct: payload.is_correct,
            feedback: clean_optional(payload.feedback.as_deref()),
        })
        .await?;

    Ok((StatusCode::CREATED, Json(option)))
}

pub async fn update_option(
    State(store): State<DynStore>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateOptionRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let mut option = store
        .find_option(id)
        .await?
        .ok_or(AppError::NotFound("Option not found".to_string()))?;
    managed_question(store.as_ref(), &identity, option.question_id).await?;

    if let Some(text) = payload.text.as_deref() {
        option.text = required_text(text, "text", OPTION_TEXT_MAX)?;
    }
    if let Some(is_correct) = payload.is_correct {
        option.is_correct = is_correct;
    }
    if let Some(feedback) = payload.feedback.as_deref() {
        option.feedback = clean_optional(Some(feedback));
    }

    let option = store.update_option(&option).await?;
    Ok(Json(option))
}

pub async fn delete_option(
    State(store): State<DynStore>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let option = store
        .find_option(id)
        .await?
        .ok_or(AppError::NotFound("Option not found".to_string()))?;
    managed_question(store.as_ref(), &identity, option.question_id).await?;

    if !store.delete_option(id).await? {
        return Err(AppError::NotFound("Option not found".to_string()));
    }

    Ok(StatusCode::NO_CONTENT)
}
