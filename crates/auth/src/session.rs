use std::collections::HashMap;
use std::sync::RwLock;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use storefront_core::UserId;

/// Opaque session handle given to the transport layer.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionToken(Uuid);

impl SessionToken {
    fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl core::fmt::Display for SessionToken {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// A live session: who, and for how long.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub user_id: UserId,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// Unknown or revoked session.
    #[error("Not authorized")]
    NotAuthorized,

    #[error("session has expired")]
    Expired,

    /// Clock skew: session not valid yet.
    #[error("session not yet valid")]
    NotYetValid,
}

/// Revocable session registry.
///
/// `validate` re-checks registry liveness every time it is called. Callers
/// must invoke it immediately before executing the protected operation and
/// must not cache a previous result across a suspension point; a revocation
/// that lands in the gap between request entry and point of use is then
/// honored.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: RwLock<HashMap<SessionToken, Session>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a session valid for `ttl` starting now.
    pub fn issue(&self, user_id: UserId, ttl: Duration) -> SessionToken {
        let token = SessionToken::new();
        let now = Utc::now();
        let session = Session {
            user_id,
            issued_at: now,
            expires_at: now + ttl,
        };

        let mut sessions = self
            .sessions
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        sessions.insert(token, session);
        token
    }

    /// Revoke a session (logout). Returns whether it was live.
    pub fn revoke(&self, token: &SessionToken) -> bool {
        let mut sessions = self
            .sessions
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        sessions.remove(token).is_some()
    }

    /// Point-of-use validation: liveness and time window are checked against
    /// the registry *now*, not against any earlier observation.
    pub fn validate(&self, token: &SessionToken, now: DateTime<Utc>) -> Result<UserId, AuthError> {
        let sessions = self
            .sessions
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let session = sessions.get(token).ok_or(AuthError::NotAuthorized)?;
        if now < session.issued_at {
            return Err(AuthError::NotYetValid);
        }
        if now >= session.expires_at {
            return Err(AuthError::Expired);
        }
        Ok(session.user_id)
    }

    /// Number of live sessions.
    pub fn live_sessions(&self) -> usize {
        let sessions = self
            .sessions
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        sessions.len()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use super::*;

    #[test]
    fn issued_session_validates_to_its_user() {
        let registry = SessionRegistry::new();
        let user_id = UserId::new();

        let token = registry.issue(user_id, Duration::minutes(30));

        assert_eq!(registry.validate(&token, Utc::now()).unwrap(), user_id);
    }

    #[test]
    fn revoked_session_is_rejected_at_point_of_use() {
        let registry = SessionRegistry::new();
        let token = registry.issue(UserId::new(), Duration::minutes(30));

        // Entry-time check passes.
        assert!(registry.validate(&token, Utc::now()).is_ok());

        // Logout lands while the request is "in flight".
        assert!(registry.revoke(&token));

        // Point-of-use check must observe the revocation.
        assert_eq!(
            registry.validate(&token, Utc::now()).unwrap_err(),
            AuthError::NotAuthorized
        );
    }

    #[test]
    fn expired_session_is_rejected() {
        let registry = SessionRegistry::new();
        let token = registry.issue(UserId::new(), Duration::minutes(5));

        let later = Utc::now() + Duration::minutes(6);
        assert_eq!(
            registry.validate(&token, later).unwrap_err(),
            AuthError::Expired
        );
    }

    #[test]
    fn session_before_issue_time_is_rejected() {
        let registry = SessionRegistry::new();
        let token = registry.issue(UserId::new(), Duration::minutes(5));

        let earlier = Utc::now() - Duration::minutes(1);
        assert_eq!(
            registry.validate(&token, earlier).unwrap_err(),
            AuthError::NotYetValid
        );
    }

    #[test]
    fn unknown_token_is_rejected() {
        let registry = SessionRegistry::new();
        let token = SessionToken::new();

        assert_eq!(
            registry.validate(&token, Utc::now()).unwrap_err(),
            AuthError::NotAuthorized
        );
    }

    #[test]
    fn concurrent_revocation_is_honored_by_the_next_validation() {
        let registry = Arc::new(SessionRegistry::new());
        let token = registry.issue(UserId::new(), Duration::minutes(30));

        let revoker = {
            let registry = Arc::clone(&registry);
            thread::spawn(move || registry.revoke(&token))
        };
        assert!(revoker.join().unwrap());

        // Whatever this request observed at entry, the validation performed
        // at the point of use happens after the revocation completed.
        assert_eq!(
            registry.validate(&token, Utc::now()).unwrap_err(),
            AuthError::NotAuthorized
        );
        assert_eq!(registry.live_sessions(), 0);
    }
}
