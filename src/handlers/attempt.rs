// src/handlers/attempt.rs

use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};
use chrono::Utc;
use validator::Validate;

use crate::{
    error::AppError,
    models::attempt::{
        AttemptSummary, StartAttemptResponse, SubmitAnswersRequest, SubmitAttemptResponse,
        TakeQuizResponse,
    },
    services::{access::Identity, attempts},
    store::DynStore,
};

/// Starts (or resumes) the caller's attempt at a quiz.
///
/// Responds with the location of the question paper for this attempt.
pub async fn start_attempt(
    State(store): State<DynStore>,
    Extension(identity): Extension<Identity>,
    Path(quiz_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let attempt = attempts::start(store.as_ref(), &identity, quiz_id, Utc::now()).await?;

    Ok(Json(StartAttemptResponse {
        quiz_id: attempt.quiz_id,
        attempt_id: attempt.id,
        attempt_number: attempt.attempt_number,
        take_url: format!("/api/quizzes/{}/attempts/{}", attempt.quiz_id, attempt.id),
    }))
}

/// Returns the question paper for an attempt the caller owns.
pub async fn take_attempt(
    State(store): State<DynStore>,
    Extension(identity): Extension<Identity>,
    Path((quiz_id, attempt_id)): Path<(i64, i64)>,
) -> Result<impl IntoResponse, AppError> {
    let (snapshot, attempt) =
        attempts::load_owned_attempt(store.as_ref(), &identity, quiz_id, attempt_id).await?;

    Ok(Json(TakeQuizResponse {
        questions: snapshot.public_questions(),
        quiz_id: snapshot.quiz.id,
        attempt_id: attempt.id,
        title: snapshot.quiz.title,
        duration_minutes: snapshot.quiz.duration_minutes,
        status: attempt.status(),
        attempt_number: attempt.attempt_number,
    }))
}

/// Submits answers for an attempt.
///
/// * Only the attempt owner may submit.
/// * Unknown or foreign option ids count as unanswered.
/// * Score, answers and completion time are written together.
pub async fn submit_attempt(
    State(store): State<DynStore>,
    Extension(identity): Extension<Identity>,
    Path((quiz_id, attempt_id)): Path<(i64, i64)>,
    Json(payload): Json<SubmitAnswersRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let (attempt, report) = attempts::submit(
        store.as_ref(),
        &identity,
        quiz_id,
        attempt_id,
        payload.answers,
        Utc::now(),
    )
    .await?;

    Ok(Json(SubmitAttemptResponse {
        attempt_id: attempt.id,
        score: attempt.score,
        total_questions: report.total_questions,
        results_url: format!("/api/attempts/{}/results", attempt.id),
    }))
}

/// Results for an attempt the caller owns: score, percentage and a
/// per-question review.
pub async fn get_results(
    State(store): State<DynStore>,
    Extension(identity): Extension<Identity>,
    Path(attempt_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let results = attempts::results(store.as_ref(), &identity, attempt_id).await?;
    Ok(Json(results))
}

/// Lists the caller's own attempts, most recent first.
pub async fn my_attempts(
    State(store): State<DynStore>,
    Extension(identity): Extension<Identity>,
) -> Result<impl IntoResponse, AppError> {
    let attempts: Vec<AttemptSummary> = store
        .list_attempts_for_user(identity.user_id)
        .await?
        .into_iter()
        .map(AttemptSummary::from)
        .collect();

    Ok(Json(attempts))
}
