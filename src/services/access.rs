// src/services/access.rs

//! Ownership checks run before any mutating or sensitive read.
//!
//! Callers load the record first (a missing record is `NotFound`) and only
//! then ask whether the identity may touch it.

use crate::{
    error::AppError,
    models::{attempt::Attempt, quiz::Quiz, user::Role},
};

/// The authenticated caller, as supplied by the request boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Identity {
    pub user_id: i64,
    pub role: Role,
}

impl Identity {
    pub fn is_superuser(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Only the attempt's owner may submit answers or read its results.
/// Superusers get no bypass here.
pub fn ensure_attempt_owner(identity: &Identity, attempt: &Attempt) -> Result<(), AppError> {
    if identity.user_id == attempt.user_id {
        Ok(())
    } else {
        Err(AppError::Forbidden(
            "You do not have access to this attempt".to_string(),
        ))
    }
}

/// The quiz creator or a superuser may manage a quiz and its questions/options.
pub fn ensure_quiz_manager(identity: &Identity, quiz: &Quiz) -> Result<(), AppError> {
    if identity.is_superuser() || quiz.created_by == Some(identity.user_id) {
        Ok(())
    } else {
        Err(AppError::Forbidden(
            "Only the quiz creator can manage this quiz".to_string(),
        ))
    }
}
