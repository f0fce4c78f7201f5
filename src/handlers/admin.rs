// src/handlers/admin.rs

use axum::{
    Json,
    extract::{Extension, Path, State},
    response::IntoResponse,
};

use crate::{
    error::AppError,
    models::user::{Role, UpdateRoleRequest},
    services::access::Identity,
    store::DynStore,
};

/// Lists all users in the system.
/// Admin only.
pub async fn list_users(State(store): State<DynStore>) -> Result<impl IntoResponse, AppError> {
    let users = store.list_users().await?;
    Ok(Json(users))
}

/// Changes a user's role (e.g. promote to 'staff' so they can author quizzes).
/// Admin only. Prevents demoting yourself.
pub async fn update_user_role(
    State(store): State<DynStore>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateRoleRequest>,
) -> Result<impl IntoResponse, AppError> {
    if id == identity.user_id && payload.role != Role::Admin {
        return Err(AppError::BadRequest("Cannot demote yourself".to_string()));
    }

    let user = store
        .update_user_role(id, payload.role)
        .await?
        .ok_or(AppError::NotFound("User not found".to_string()))?;

    tracing::info!(user_id = user.id, role = %payload.role, "User role changed");

    Ok(Json(user))
}
