// src/models/quiz.rs

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use crate::{
    error::AppError,
    models::{
        answer_option::{AnswerOption, PublicOption},
        question::{PublicQuestion, Question},
    },
};

/// Default time limit for a new quiz, in minutes.
pub const DEFAULT_DURATION_MINUTES: i32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

impl Difficulty {
    /// Single-letter code stored in the `difficulty` column.
    pub fn code(&self) -> &'static str {
        match self {
            Difficulty::Easy => "E",
            Difficulty::Medium => "M",
            Difficulty::Hard => "H",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "E" => Some(Difficulty::Easy),
            "M" => Some(Difficulty::Medium),
            "H" => Some(Difficulty::Hard),
            _ => None,
        }
    }
}

/// A quiz as exposed to the rest of the crate.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Quiz {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    /// Null once the author account is removed.
    pub created_by: Option<i64>,
    pub created_at: DateTime<Utc>,
    /// Time limit in minutes.
    pub duration_minutes: i32,
    pub difficulty: Difficulty,
    pub is_active: bool,
    pub available_until: Option<DateTime<Utc>>,
}

/// Raw 'quizzes' row. `difficulty` is the single-letter code.
#[derive(Debug, FromRow)]
pub struct QuizRow {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub created_by: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub duration_minutes: i32,
    pub difficulty: String,
    pub is_active: bool,
    pub available_until: Option<DateTime<Utc>>,
}

impl TryFrom<QuizRow> for Quiz {
    type Error = AppError;

    fn try_from(row: QuizRow) -> Result<Self, Self::Error> {
        let difficulty = Difficulty::from_code(&row.difficulty).ok_or_else(|| {
            AppError::InternalServerError(format!(
                "Quiz {} has unknown difficulty code '{}'",
                row.id, row.difficulty
            ))
        })?;

        Ok(Quiz {
            id: row.id,
            title: row.title,
            description: row.description,
            created_by: row.created_by,
            created_at: row.created_at,
            duration_minutes: row.duration_minutes,
            difficulty,
            is_active: row.is_active,
            available_until: row.available_until,
        })
    }
}

/// Fields for inserting a quiz, already sanitized.
#[derive(Debug, Clone)]
pub struct NewQuiz {
    pub title: String,
    pub description: Option<String>,
    pub created_by: i64,
    pub duration_minutes: i32,
    pub difficulty: Difficulty,
    pub is_active: bool,
    pub available_until: Option<DateTime<Utc>>,
}

/// A question together with its options in natural (id) order.
#[derive(Debug, Clone, Serialize)]
pub struct QuestionWithOptions {
    #[serde(flatten)]
    pub question: Question,
    pub options: Vec<AnswerOption>,
}

/// Owned, read-once view of a quiz and everything needed to score it.
#[derive(Debug, Clone, Serialize)]
pub struct QuizSnapshot {
    pub quiz: Quiz,
    pub questions: Vec<QuestionWithOptions>,
}

impl QuizSnapshot {
    /// Groups options under their questions and fixes ordering:
    /// questions by (`order`, `id`), options by `id`.
    /// Options whose question is not part of `questions` are dropped.
    pub fn assemble(quiz: Quiz, mut questions: Vec<Question>, options: Vec<AnswerOption>) -> Self {
        questions.sort_by_key(|q| (q.order, q.id));

        let mut by_question: HashMap<i64, Vec<AnswerOption>> = HashMap::new();
        for option in options {
            by_question.entry(option.question_id).or_default().push(option);
        }

        let questions = questions
            .into_iter()
            .map(|question| {
                let mut options = by_question.remove(&question.id).unwrap_or_default();
                options.sort_by_key(|o| o.id);
                QuestionWithOptions { question, options }
            })
            .collect();

        QuizSnapshot { quiz, questions }
    }

    /// The question paper: no correctness flags, no feedback.
    pub fn public_questions(&self) -> Vec<PublicQuestion> {
        self.questions
            .iter()
            .map(|q| PublicQuestion {
                id: q.question.id,
                text: q.question.text.clone(),
                order: q.question.order,
                options: q
                    .options
                    .iter()
                    .map(|o| PublicOption {
                        id: o.id,
                        text: o.text.clone(),
                    })
                    .collect(),
            })
            .collect()
    }
}

/// DTO for a quiz and its question paper.
#[derive(Debug, Serialize)]
pub struct QuizDetailResponse {
    #[serde(flatten)]
    pub quiz: Quiz,
    pub questions: Vec<PublicQuestion>,
}

/// Query parameters accepted by the quiz list.
#[derive(Debug, Default, Deserialize)]
pub struct QuizListParams {
    pub difficulty: Option<Difficulty>,
    /// Case-insensitive substring matched against title and description.
    pub search: Option<String>,
}

/// DTO for creating a new quiz.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateQuizRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(length(max = 5000))]
    pub description: Option<String>,
    #[validate(range(min = 1, max = 1440))]
    pub duration_minutes: Option<i32>,
    #[serde(default)]
    pub difficulty: Difficulty,
    pub is_active: Option<bool>,
    pub available_until: Option<DateTime<Utc>>,
}

/// DTO for updating a quiz. Absent fields are left untouched.
///
/// `clear_available_until` removes the deadline, since a JSON `null`
/// cannot be told apart from an absent field here.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateQuizRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,
    #[validate(length(max = 5000))]
    pub description: Option<String>,
    #[validate(range(min = 1, max = 1440))]
    pub duration_minutes: Option<i32>,
    pub difficulty: Option<Difficulty>,
    pub is_active: Option<bool>,
    pub available_until: Option<DateTime<Utc>>,
    #[serde(default)]
    pub clear_available_until: bool,
}
