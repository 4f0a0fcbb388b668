use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
    Extension, Json,
};
use log::{info, warn};
use serde::{Deserialize, Serialize};

use super::state::AppState;
use super::{api_error, db_connection, internal_error, ApiError};
use crate::roles::Role;
use crate::sessions::Session;
use crate::users::Users;

/// Request structure for login
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// The session's user as sent to the UI
#[derive(Debug, Serialize)]
pub struct SessionUser {
    pub user_id: i64,
    pub username: String,
    pub full_name: String,
    pub role: String,
}

/// Response structure for successful login
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: SessionUser,
}

fn session_user(session: &Session) -> SessionUser {
    SessionUser {
        user_id: session.user_id,
        username: session.username.clone(),
        full_name: session.full_name.clone(),
        role: session.role.as_str().to_string(),
    }
}

/// POST /api/auth/login
///
/// Verifies credentials and issues a bearer token. The response is the same
/// 401 for unknown users, wrong passwords and deactivated accounts.
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let conn = db_connection()?;

    let user = Users::verify_login(&conn, req.username.trim(), &req.password)
        .map_err(|e| internal_error("Login check failed", e))?
        .ok_or_else(|| api_error(StatusCode::UNAUTHORIZED, "Invalid username or password"))?;

    let role = user.role_enum().ok_or_else(|| {
        warn!(
            "User '{}' has unrecognized role '{}' - refusing login",
            user.username, user.role
        );
        api_error(StatusCode::UNAUTHORIZED, "Invalid username or password")
    })?;

    Users::record_login(&conn, user.user_id)
        .map_err(|e| internal_error("Failed to record login", e))?;

    let session = state
        .sessions
        .create(user.user_id, &user.username, &user.full_name, role)
        .await;

    info!("User '{}' logged in", user.username);

    Ok(Json(LoginResponse {
        token: session.token.clone(),
        user: session_user(&session),
    }))
}

/// POST /api/auth/logout
///
/// Discards the caller's session.
pub async fn logout(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> StatusCode {
    state.sessions.revoke(&session.token).await;
    info!("User '{}' logged out", session.username);
    StatusCode::NO_CONTENT
}

/// GET /api/auth/me
///
/// Returns the logged-in user for the UI's session restore.
pub async fn me(Extension(session): Extension<Session>) -> Json<SessionUser> {
    Json(session_user(&session))
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

/// Middleware guarding every `/api` route except login. Validates the bearer
/// token and makes the session available to handlers as an extension.
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = bearer_token(request.headers())
        .ok_or_else(|| api_error(StatusCode::UNAUTHORIZED, "Authentication required"))?;

    let session = state
        .sessions
        .validate(token)
        .await
        .ok_or_else(|| api_error(StatusCode::UNAUTHORIZED, "Session expired or invalid"))?;

    request.extensions_mut().insert(session);
    Ok(next.run(request).await)
}

/// Per-page role gate. Admin passes every gate; there is no permission table.
pub fn require_role(session: &Session, allowed: &[Role]) -> Result<(), ApiError> {
    if session.role.is_admin() || allowed.contains(&session.role) {
        Ok(())
    } else {
        Err(api_error(
            StatusCode::FORBIDDEN,
            "You do not have permission to perform this action",
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn session_with_role(role: Role) -> Session {
        Session {
            token: "tok".to_string(),
            user_id: 1,
            username: "someone".to_string(),
            full_name: "Some One".to_string(),
            role,
            created_at: 0,
            last_seen_at: 0,
        }
    }

    #[test]
    fn test_bearer_token_parsing() {
        let mut headers = HeaderMap::new();
        assert!(bearer_token(&headers).is_none());

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc123"));
        assert_eq!(bearer_token(&headers), Some("abc123"));

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic abc123"));
        assert!(bearer_token(&headers).is_none());
    }

    #[test]
    fn test_require_role_gate() {
        let reviewer = session_with_role(Role::Reviewer);
        assert!(require_role(&reviewer, &[Role::Reviewer]).is_ok());
        assert!(require_role(&reviewer, &[Role::Approver]).is_err());

        // Admin passes every gate
        let admin = session_with_role(Role::Admin);
        assert!(require_role(&admin, &[Role::Approver]).is_ok());
        assert!(require_role(&admin, &[]).is_ok());
    }
}
