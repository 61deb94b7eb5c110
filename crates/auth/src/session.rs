use chrono::{DateTime, Utc};
use thiserror::Error;

/// User name given to sessions minted from the cluster admin token.
pub const ADMIN_USER: &str = "Admin";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("session token must not be empty")]
    EmptyToken,

    #[error("session store unavailable")]
    StoreUnavailable,
}

/// An authenticated caller.
///
/// Never persisted by the dispatch layer. The token is always non-empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    token: String,
    last_active: DateTime<Utc>,
    user: String,
}

impl Session {
    pub fn new(
        token: impl Into<String>,
        user: impl Into<String>,
        last_active: DateTime<Utc>,
    ) -> Result<Self, SessionError> {
        let token = token.into();
        if token.is_empty() {
            return Err(SessionError::EmptyToken);
        }
        Ok(Self {
            token,
            last_active,
            user: user.into(),
        })
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn last_active(&self) -> DateTime<Utc> {
        self.last_active
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub(crate) fn touch(&mut self, now: DateTime<Utc>) {
        self.last_active = now;
    }
}

/// External session lookup.
///
/// Implementations are shared across every in-flight request, so they must be
/// safe for concurrent use. `None` means the token is unknown or expired.
pub trait SessionValidator: Send + Sync {
    fn validate(&self, token: &str, now: DateTime<Utc>) -> Option<Session>;
}

impl<V> SessionValidator for std::sync::Arc<V>
where
    V: SessionValidator + ?Sized,
{
    fn validate(&self, token: &str, now: DateTime<Utc>) -> Option<Session> {
        (**self).validate(token, now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_token_is_rejected() {
        let err = Session::new("", "alice", Utc::now()).unwrap_err();
        assert_eq!(err, SessionError::EmptyToken);
    }

    #[test]
    fn keeps_token_and_user() {
        let now = Utc::now();
        let session = Session::new("t", ADMIN_USER, now).unwrap();
        assert_eq!(session.token(), "t");
        assert_eq!(session.user(), ADMIN_USER);
        assert_eq!(session.last_active(), now);
    }
}
