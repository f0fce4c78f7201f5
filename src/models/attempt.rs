// src/models/attempt.rs

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, types::Json};
use validator::Validate;

use crate::models::{answer_option::AnswerOption, question::PublicQuestion};

/// Submitted answers.
/// Key: question id (as text). Value: chosen option id (as text).
pub type Submission = HashMap<String, String>;

/// Upper bound on entries accepted in one submission.
const MAX_SUBMITTED_ANSWERS: usize = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptStatus {
    InProgress,
    Completed,
}

/// Represents the 'attempts' table in the database.
/// One row per (user, quiz) pair; re-attempts reuse the row.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
pub struct Attempt {
    pub id: i64,
    pub user_id: i64,
    pub quiz_id: i64,
    /// Number of correctly answered questions.
    pub score: i32,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    /// Stored as JSONB.
    pub answers: Json<Submission>,
    pub attempt_number: i32,
}

impl Attempt {
    pub fn status(&self) -> AttemptStatus {
        if self.completed_at.is_some() {
            AttemptStatus::Completed
        } else {
            AttemptStatus::InProgress
        }
    }

    pub fn time_spent_seconds(&self) -> Option<i64> {
        self.completed_at
            .map(|done| (done - self.started_at).num_seconds().max(0))
    }
}

/// DTO for listing attempts.
#[derive(Debug, Serialize)]
pub struct AttemptSummary {
    pub id: i64,
    pub user_id: i64,
    pub quiz_id: i64,
    pub status: AttemptStatus,
    pub score: i32,
    pub attempt_number: i32,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub time_spent_seconds: Option<i64>,
}

impl From<Attempt> for AttemptSummary {
    fn from(a: Attempt) -> Self {
        AttemptSummary {
            status: a.status(),
            time_spent_seconds: a.time_spent_seconds(),
            id: a.id,
            user_id: a.user_id,
            quiz_id: a.quiz_id,
            score: a.score,
            attempt_number: a.attempt_number,
            started_at: a.started_at,
            completed_at: a.completed_at,
        }
    }
}

/// DTO for submitting answers.
#[derive(Debug, Deserialize, Validate)]
pub struct SubmitAnswersRequest {
    #[serde(default, deserialize_with = "deserialize_submission")]
    #[validate(custom(function = validate_submission))]
    pub answers: Submission,
}

/// A chosen option id as posted: `"10"` or `10`.
#[derive(Deserialize)]
#[serde(untagged)]
enum SubmittedChoice {
    Text(String),
    Number(i64),
}

/// Accepts option ids as strings or integers and stores them as text.
fn deserialize_submission<'de, D>(deserializer: D) -> Result<Submission, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = HashMap::<String, SubmittedChoice>::deserialize(deserializer)?;
    Ok(raw
        .into_iter()
        .map(|(question, choice)| {
            let choice = match choice {
                SubmittedChoice::Text(text) => text,
                SubmittedChoice::Number(id) => id.to_string(),
            };
            (question, choice)
        })
        .collect())
}

fn validate_submission(answers: &Submission) -> Result<(), validator::ValidationError> {
    if answers.len() > MAX_SUBMITTED_ANSWERS {
        return Err(validator::ValidationError::new("too_many_answers"));
    }
    for (question, option) in answers {
        if question.len() > 32 || option.len() > 32 {
            return Err(validator::ValidationError::new("answer_key_too_long"));
        }
    }
    Ok(())
}

/// Returned after a start: where to go to take the quiz.
#[derive(Debug, Serialize)]
pub struct StartAttemptResponse {
    pub quiz_id: i64,
    pub attempt_id: i64,
    pub attempt_number: i32,
    pub take_url: String,
}

/// Returned after a submit: where to go for the results.
#[derive(Debug, Serialize)]
pub struct SubmitAttemptResponse {
    pub attempt_id: i64,
    pub score: i32,
    pub total_questions: usize,
    pub results_url: String,
}

/// The question paper for an attempt.
#[derive(Debug, Serialize)]
pub struct TakeQuizResponse {
    pub quiz_id: i64,
    pub attempt_id: i64,
    pub title: String,
    pub duration_minutes: i32,
    pub status: AttemptStatus,
    pub attempt_number: i32,
    pub questions: Vec<PublicQuestion>,
}

/// One row of the results page.
#[derive(Debug, Serialize)]
pub struct QuestionResult {
    pub question_id: i64,
    pub question_text: String,
    pub selected_option: Option<AnswerOption>,
    pub correct_option: Option<AnswerOption>,
    /// Submitted value that did not resolve to one of this question's options.
    pub rejected_choice: Option<String>,
    pub is_correct: bool,
}

#[derive(Debug, Serialize)]
pub struct AttemptResultsResponse {
    pub attempt_id: i64,
    pub quiz_id: i64,
    pub quiz_title: String,
    pub status: AttemptStatus,
    pub attempt_number: i32,
    pub score: usize,
    pub total_questions: usize,
    pub percentage: f64,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub time_spent_seconds: Option<i64>,
    pub details: Vec<QuestionResult>,
}
