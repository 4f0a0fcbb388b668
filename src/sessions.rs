use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use uuid::Uuid;

use crate::config::Config;
use crate::roles::Role;

/// A live login session. Sessions exist only in process memory; a server
/// restart logs everyone out.
#[derive(Debug, Clone)]
pub struct Session {
    pub token: String,
    pub user_id: i64,
    pub username: String,
    pub full_name: String,
    pub role: Role,
    pub created_at: i64,
    pub last_seen_at: i64,
}

/// Token-keyed session map shared across handlers. Expiry is enforced lazily
/// at validation time; there is no background sweeper.
#[derive(Clone)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<String, Session>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Issues a new session token for a logged-in user.
    pub async fn create(
        &self,
        user_id: i64,
        username: &str,
        full_name: &str,
        role: Role,
    ) -> Session {
        let now = chrono::Utc::now().timestamp();
        let session = Session {
            token: Uuid::new_v4().to_string(),
            user_id,
            username: username.to_string(),
            full_name: full_name.to_string(),
            role,
            created_at: now,
            last_seen_at: now,
        };

        let mut sessions = self.sessions.write().await;
        sessions.insert(session.token.clone(), session.clone());
        session
    }

    /// Looks up a token, dropping it if idle past the configured timeout.
    /// A successful lookup refreshes the idle clock.
    pub async fn validate(&self, token: &str) -> Option<Session> {
        self.validate_at(token, chrono::Utc::now().timestamp()).await
    }

    async fn validate_at(&self, token: &str, now: i64) -> Option<Session> {
        let timeout_secs = Config::get_session_timeout_mins() as i64 * 60;

        let mut sessions = self.sessions.write().await;
        match sessions.get_mut(token) {
            Some(session) => {
                if now - session.last_seen_at > timeout_secs {
                    sessions.remove(token);
                    None
                } else {
                    session.last_seen_at = now;
                    Some(session.clone())
                }
            }
            None => None,
        }
    }

    /// Drops a session (logout). Returns false if the token was unknown.
    pub async fn revoke(&self, token: &str) -> bool {
        let mut sessions = self.sessions.write().await;
        sessions.remove(token).is_some()
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_and_validate_roundtrip() {
        let store = SessionStore::new();
        let session = store.create(1, "maya", "Maya Rao", Role::Initiator).await;

        let validated = store.validate(&session.token).await.unwrap();
        assert_eq!(validated.user_id, 1);
        assert_eq!(validated.username, "maya");
        assert_eq!(validated.role, Role::Initiator);
    }

    #[tokio::test]
    async fn test_unknown_token_rejected() {
        let store = SessionStore::new();
        assert!(store.validate("not-a-token").await.is_none());
    }

    #[tokio::test]
    async fn test_revoke() {
        let store = SessionStore::new();
        let session = store.create(1, "maya", "", Role::Admin).await;

        assert!(store.revoke(&session.token).await);
        assert!(store.validate(&session.token).await.is_none());
        assert!(!store.revoke(&session.token).await);
    }

    #[tokio::test]
    async fn test_idle_sessions_expire() {
        let store = SessionStore::new();
        let session = store.create(1, "maya", "", Role::Reviewer).await;

        // Default timeout is 480 minutes; a day later the token is gone
        let much_later = session.last_seen_at + 86_400;
        assert!(store.validate_at(&session.token, much_later).await.is_none());
        // And it was removed, not just hidden
        assert!(store.validate(&session.token).await.is_none());
    }

    #[tokio::test]
    async fn test_activity_refreshes_idle_clock() {
        let store = SessionStore::new();
        let session = store.create(1, "maya", "", Role::Reviewer).await;

        // Touch the session a minute before the timeout would land
        let almost = session.last_seen_at + 480 * 60 - 60;
        assert!(store.validate_at(&session.token, almost).await.is_some());

        // The earlier touch pushed the deadline forward
        let past_original_deadline = session.last_seen_at + 480 * 60 + 60;
        assert!(store
            .validate_at(&session.token, past_original_deadline)
            .await
            .is_some());
    }

    #[tokio::test]
    async fn test_tokens_are_unique() {
        let store = SessionStore::new();
        let a = store.create(1, "maya", "", Role::Admin).await;
        let b = store.create(1, "maya", "", Role::Admin).await;
        assert_ne!(a.token, b.token);

        // Both sessions are live; logging in twice does not kill the first
        assert!(store.validate(&a.token).await.is_some());
        assert!(store.validate(&b.token).await.is_some());
    }
}
