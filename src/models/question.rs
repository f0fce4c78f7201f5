// src/models/question.rs

use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use validator::Validate;

use crate::models::answer_option::PublicOption;

/// Represents the 'questions' table in the database.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Question {
    pub id: i64,

    pub quiz_id: i64,

    /// The text content of the question.
    pub text: String,

    /// Display position within the quiz. Ties are broken by `id`.
    /// Mapped from 'display_order' since `order` is reserved in SQL.
    #[sqlx(rename = "display_order")]
    pub order: i32,
}

/// DTO for sending a question to the client (no answer key).
#[derive(Debug, Serialize)]
pub struct PublicQuestion {
    pub id: i64,
    pub text: String,
    pub order: i32,
    pub options: Vec<PublicOption>,
}

/// DTO for creating a new question.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateQuestionRequest {
    #[validate(length(min = 1, max = 500))]
    pub text: String,
    #[serde(default)]
    pub order: i32,
}

/// DTO for updating a question.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateQuestionRequest {
    #[validate(length(min = 1, max = 500))]
    pub text: Option<String>,
    pub order: Option<i32>,
}
