use axum::{extract::Path, http::StatusCode, Extension, Json};
use serde::Deserialize;

use super::auth::require_role;
use super::{api_error, db_connection, internal_error, ApiError};
use crate::audit::Audit;
use crate::error::TathyaError;
use crate::roles::Role;
use crate::sessions::Session;
use crate::users::{User, Users};

/// Request structure for creating a user
#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub username: String,
    pub password: String,
    pub full_name: String,
    pub role: String,
}

/// Request structure for editing a user's profile
#[derive(Debug, Deserialize)]
pub struct UpdateUserRequest {
    pub full_name: String,
    pub role: String,
    pub active: bool,
}

/// Request structure for an admin password reset
#[derive(Debug, Deserialize)]
pub struct ResetPasswordRequest {
    pub password: String,
}

/// GET /api/users
///
/// Lists all users (password hashes are never serialized).
pub async fn list_users(Extension(session): Extension<Session>) -> Result<Json<Vec<User>>, ApiError> {
    require_role(&session, &[Role::Admin])?;
    let conn = db_connection()?;

    let users = Users::list(&conn).map_err(|e| internal_error("Failed to list users", e))?;
    Ok(Json(users))
}

/// POST /api/users
///
/// Creates a user. Duplicate usernames are a 409.
pub async fn create_user(
    Extension(session): Extension<Session>,
    Json(req): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<User>), ApiError> {
    require_role(&session, &[Role::Admin])?;

    let username = req.username.trim();
    if username.is_empty() {
        return Err(api_error(StatusCode::BAD_REQUEST, "Username is required"));
    }
    if req.password.is_empty() {
        return Err(api_error(StatusCode::BAD_REQUEST, "Password is required"));
    }
    let role = Role::from_string(&req.role)
        .ok_or_else(|| api_error(StatusCode::BAD_REQUEST, format!("Unknown role: {}", req.role)))?;

    let conn = db_connection()?;
    let user = match Users::create(&conn, username, &req.password, req.full_name.trim(), role) {
        Ok(user) => user,
        Err(TathyaError::DatabaseError(rusqlite::Error::SqliteFailure(err, _)))
            if err.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            return Err(api_error(
                StatusCode::CONFLICT,
                format!("Username '{}' already exists", username),
            ));
        }
        Err(e) => return Err(internal_error("Failed to create user", e)),
    };

    Audit::record_admin(
        &conn,
        "User Created",
        &session.username,
        Some(&format!("{} ({})", user.username, user.role)),
    )
    .map_err(|e| internal_error("Failed to write audit entry", e))?;

    Ok((StatusCode::CREATED, Json(user)))
}

/// PUT /api/users/{id}
///
/// Edits full name, role and the active flag. Deactivation does not revoke
/// live sessions; `active` is only checked at login.
pub async fn update_user(
    Extension(session): Extension<Session>,
    Path(user_id): Path<i64>,
    Json(req): Json<UpdateUserRequest>,
) -> Result<Json<User>, ApiError> {
    require_role(&session, &[Role::Admin])?;

    let role = Role::from_string(&req.role)
        .ok_or_else(|| api_error(StatusCode::BAD_REQUEST, format!("Unknown role: {}", req.role)))?;

    let conn = db_connection()?;
    let updated = Users::update(&conn, user_id, req.full_name.trim(), role, req.active)
        .map_err(|e| internal_error("Failed to update user", e))?;
    if !updated {
        return Err(api_error(
            StatusCode::NOT_FOUND,
            format!("User {} not found", user_id),
        ));
    }

    let user = Users::get_by_id(&conn, user_id)
        .map_err(|e| internal_error("Failed to load user", e))?
        .ok_or_else(|| api_error(StatusCode::NOT_FOUND, format!("User {} not found", user_id)))?;

    Audit::record_admin(
        &conn,
        "User Updated",
        &session.username,
        Some(&format!(
            "{} (role {}, active {})",
            user.username, user.role, user.active
        )),
    )
    .map_err(|e| internal_error("Failed to write audit entry", e))?;

    Ok(Json(user))
}

/// PUT /api/users/{id}/password
pub async fn reset_password(
    Extension(session): Extension<Session>,
    Path(user_id): Path<i64>,
    Json(req): Json<ResetPasswordRequest>,
) -> Result<StatusCode, ApiError> {
    require_role(&session, &[Role::Admin])?;

    if req.password.is_empty() {
        return Err(api_error(StatusCode::BAD_REQUEST, "Password is required"));
    }

    let conn = db_connection()?;
    let user = Users::get_by_id(&conn, user_id)
        .map_err(|e| internal_error("Failed to load user", e))?
        .ok_or_else(|| api_error(StatusCode::NOT_FOUND, format!("User {} not found", user_id)))?;

    Users::set_password(&conn, user_id, &req.password)
        .map_err(|e| internal_error("Failed to reset password", e))?;

    Audit::record_admin(
        &conn,
        "Password Reset",
        &session.username,
        Some(&user.username),
    )
    .map_err(|e| internal_error("Failed to write audit entry", e))?;

    Ok(StatusCode::NO_CONTENT)
}
