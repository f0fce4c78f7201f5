// src/handlers/quiz.rs

use axum::{
    Json,
    extract::{Path, Query, State},
    response::IntoResponse,
};
use chrono::Utc;

use crate::{
    error::AppError,
    models::quiz::{QuizDetailResponse, QuizListParams},
    services::visibility::{apply_list_filters, is_attemptable, list_visible_quizzes},
    store::DynStore,
};

/// Lists quizzes open for attempts right now.
///
/// Optional `difficulty` and `search` query parameters narrow the list.
pub async fn list_quizzes(
    State(store): State<DynStore>,
    Query(params): Query<QuizListParams>,
) -> Result<impl IntoResponse, AppError> {
    let quizzes = store.list_quizzes().await?;
    let visible = list_visible_quizzes(quizzes, Utc::now());

    Ok(Json(apply_list_filters(visible, &params)))
}

/// Returns a visible quiz with its question paper (no answer key).
pub async fn get_quiz(
    State(store): State<DynStore>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let snapshot = store
        .load_snapshot(id)
        .await?
        .filter(|s| is_attemptable(&s.quiz, Utc::now()))
        .ok_or(AppError::NotFound("Quiz not found".to_string()))?;

    let questions = snapshot.public_questions();

    Ok(Json(QuizDetailResponse {
        quiz: snapshot.quiz,
        questions,
    }))
}
