// src/services/attempts.rs

//! Attempt lifecycle: `NotStarted -> InProgress -> Completed`.
//!
//! A (user, quiz) pair owns exactly one attempt row. Every start bumps
//! `attempt_number`; starting again after completion resets the row to a
//! fresh in-progress run.

use chrono::{DateTime, Utc};
use sqlx::types::Json;

use crate::{
    error::AppError,
    models::{
        attempt::{Attempt, AttemptResultsResponse, AttemptStatus, Submission},
        quiz::QuizSnapshot,
    },
    services::{
        access::{Identity, ensure_attempt_owner},
        scoring::{ScoreReport, compute_score},
        visibility::is_attemptable,
    },
    store::QuizStore,
};

/// Start transition applied to an existing row.
pub fn restart_attempt(mut attempt: Attempt, now: DateTime<Utc>) -> Attempt {
    attempt.attempt_number += 1;

    if attempt.status() == AttemptStatus::Completed {
        attempt.started_at = now;
        attempt.completed_at = None;
        attempt.score = 0;
        attempt.answers = Json(Submission::new());
    }

    attempt
}

/// Begins (or resumes) the caller's attempt at a quiz.
pub async fn start(
    store: &dyn QuizStore,
    identity: &Identity,
    quiz_id: i64,
    now: DateTime<Utc>,
) -> Result<Attempt, AppError> {
    let quiz = store
        .find_quiz(quiz_id)
        .await?
        .ok_or(AppError::NotFound("Quiz not found".to_string()))?;

    if !is_attemptable(&quiz, now) {
        return Err(AppError::BadRequest(
            "Quiz is not open for attempts".to_string(),
        ));
    }

    let attempt = store.start_attempt(identity.user_id, quiz.id, now).await?;

    tracing::info!(
        user_id = identity.user_id,
        quiz_id = quiz.id,
        attempt_id = attempt.id,
        attempt_number = attempt.attempt_number,
        "Attempt started"
    );

    Ok(attempt)
}

/// Loads the quiz snapshot and an attempt the caller owns.
///
/// The attempt must belong to `quiz_id`; otherwise it is reported missing.
pub async fn load_owned_attempt(
    store: &dyn QuizStore,
    identity: &Identity,
    quiz_id: i64,
    attempt_id: i64,
) -> Result<(QuizSnapshot, Attempt), AppError> {
    let snapshot = store
        .load_snapshot(quiz_id)
        .await?
        .ok_or(AppError::NotFound("Quiz not found".to_string()))?;

    let attempt = store
        .find_attempt(attempt_id)
        .await?
        .filter(|a| a.quiz_id == quiz_id)
        .ok_or(AppError::NotFound("Attempt not found".to_string()))?;

    ensure_attempt_owner(identity, &attempt)?;

    Ok((snapshot, attempt))
}

/// Scores the submission and records score, answers and completion time
/// in a single write.
pub async fn submit(
    store: &dyn QuizStore,
    identity: &Identity,
    quiz_id: i64,
    attempt_id: i64,
    answers: Submission,
    now: DateTime<Utc>,
) -> Result<(Attempt, ScoreReport), AppError> {
    let (snapshot, attempt) = load_owned_attempt(store, identity, quiz_id, attempt_id).await?;

    if attempt.status() == AttemptStatus::Completed {
        return Err(AppError::Conflict(
            "Attempt already completed; start the quiz again".to_string(),
        ));
    }

    let report = compute_score(&snapshot.questions, &answers);

    for (question_id, raw) in report.rejected_choices() {
        tracing::warn!(
            attempt_id = attempt.id,
            question_id,
            choice = raw,
            "Submitted option does not belong to question; treated as unanswered"
        );
    }

    let score = i32::try_from(report.score)
        .map_err(|e| AppError::InternalServerError(e.to_string()))?;

    let completed = store
        .complete_attempt(attempt.id, score, &answers, now)
        .await?
        .ok_or(AppError::Conflict(
            "Attempt already completed; start the quiz again".to_string(),
        ))?;

    tracing::info!(
        user_id = identity.user_id,
        quiz_id,
        attempt_id = completed.id,
        score,
        total = report.total_questions,
        "Attempt submitted"
    );

    Ok((completed, report))
}

/// Recomputes the results page from the stored answers. Read-only.
pub async fn results(
    store: &dyn QuizStore,
    identity: &Identity,
    attempt_id: i64,
) -> Result<AttemptResultsResponse, AppError> {
    let attempt = store
        .find_attempt(attempt_id)
        .await?
        .ok_or(AppError::NotFound("Attempt not found".to_string()))?;

    ensure_attempt_owner(identity, &attempt)?;

    let snapshot = store
        .load_snapshot(attempt.quiz_id)
        .await?
        .ok_or(AppError::NotFound("Quiz not found".to_string()))?;

    let report = compute_score(&snapshot.questions, &attempt.answers);

    Ok(AttemptResultsResponse {
        attempt_id: attempt.id,
        quiz_id: snapshot.quiz.id,
        quiz_title: snapshot.quiz.title,
        status: attempt.status(),
        attempt_number: attempt.attempt_number,
        score: report.score,
        total_questions: report.total_questions,
        percentage: report.percentage(),
        started_at: attempt.started_at,
        completed_at: attempt.completed_at,
        time_spent_seconds: attempt.time_spent_seconds(),
        details: report.details.into_iter().map(Into::into).collect(),
    })
}
