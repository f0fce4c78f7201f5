// src/models/answer_option.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// Represents the 'options' table: one choice of a multiple-choice question.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct AnswerOption {
    pub id: i64,
    pub question_id: i64,
    pub text: String,
    pub is_correct: bool,
    /// Shown on the results page next to this option.
    pub feedback: Option<String>,
}

/// DTO for sending an option to a quiz taker.
#[derive(Debug, Serialize)]
pub struct PublicOption {
    pub id: i64,
    pub text: String,
}

/// Fields for inserting an option, already sanitized.
#[derive(Debug, Clone)]
pub struct NewOption {
    pub question_id: i64,
    pub text: String,
    pub is_correct: bool,
    pub feedback: Option<String>,
}

/// DTO for creating a new option.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateOptionRequest {
    #[validate(length(min = 1, max = 100))]
    pub text: String,
    #[serde(default)]
    pub is_correct: bool,
    #[validate(length(max = 2000))]
    pub feedback: Option<String>,
}

/// DTO for updating an option.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateOptionRequest {
    #[validate(length(min = 1, max = 100))]
    pub text: Option<String>,
    pub is_correct: Option<bool>,
    #[validate(length(max = 2000))]
    pub feedback: Option<String>,
}
