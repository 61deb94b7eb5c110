//! Token resolution: which caller, if any, a request belongs to.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::admin::AdminToken;
use crate::session::{ADMIN_USER, Session, SessionValidator};

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum AuthFailure {
    #[error("missing session")]
    MissingSession,

    #[error("invalid session")]
    InvalidSession,
}

/// Pick the caller's token. A non-empty header value wins; the cookie is only
/// consulted when the header gives nothing.
pub fn pick_token(header: Option<&str>, cookie: impl FnOnce() -> Option<String>) -> Option<String> {
    match header {
        Some(tok) if !tok.is_empty() => Some(tok.to_string()),
        _ => cookie().filter(|tok| !tok.is_empty()),
    }
}

/// Turn a token into a session.
///
/// The admin token short-circuits to a synthetic `Admin` session without
/// consulting `validator`.
pub fn resolve_session(
    token: Option<&str>,
    admin: Option<&AdminToken>,
    validator: &dyn SessionValidator,
    now: DateTime<Utc>,
) -> Result<Session, AuthFailure> {
    let token = match token {
        Some(tok) if !tok.is_empty() => tok,
        _ => return Err(AuthFailure::MissingSession),
    };

    // Peer nodes in the cluster present the shared admin token.
    if admin.is_some_and(|a| a.matches(token)) {
        tracing::debug!("admin token presented");
        return Session::new(token, ADMIN_USER, now).map_err(|_| AuthFailure::MissingSession);
    }

    validator
        .validate(token, now)
        .ok_or(AuthFailure::InvalidSession)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemorySessionStore;
    use chrono::Duration;
    use proptest::prelude::*;

    struct RejectAll;

    impl SessionValidator for RejectAll {
        fn validate(&self, _token: &str, _now: DateTime<Utc>) -> Option<Session> {
            None
        }
    }

    struct PanicsIfCalled;

    impl SessionValidator for PanicsIfCalled {
        fn validate(&self, _token: &str, _now: DateTime<Utc>) -> Option<Session> {
            panic!("validator must not be consulted for the admin token");
        }
    }

    #[test]
    fn header_wins_over_cookie() {
        let tok = pick_token(Some("from-header"), || panic!("cookie read for header token"));
        assert_eq!(tok.as_deref(), Some("from-header"));
    }

    #[test]
    fn empty_header_falls_back_to_cookie() {
        let tok = pick_token(Some(""), || Some("from-cookie".to_string()));
        assert_eq!(tok.as_deref(), Some("from-cookie"));
    }

    #[test]
    fn nothing_anywhere_is_none() {
        assert_eq!(pick_token(None, || None), None);
        assert_eq!(pick_token(None, || Some(String::new())), None);
    }

    #[test]
    fn missing_token_is_missing_session() {
        let err = resolve_session(None, None, &RejectAll, Utc::now()).unwrap_err();
        assert_eq!(err, AuthFailure::MissingSession);
        assert_eq!(err.to_string(), "missing session");
    }

    #[test]
    fn admin_token_never_reaches_validator() {
        let admin = AdminToken::new("peer-secret").unwrap();
        let session = resolve_session(Some("peer-secret"), Some(&admin), &PanicsIfCalled, Utc::now()).unwrap();
        assert_eq!(session.user(), ADMIN_USER);
        assert_eq!(session.token(), "peer-secret");
    }

    #[test]
    fn validator_sessions_pass_through() {
        let store = MemorySessionStore::new(Duration::hours(1));
        let now = Utc::now();
        let started = store.start("alice", now).unwrap();

        let session = resolve_session(Some(started.token()), None, &store, now).unwrap();
        assert_eq!(session.user(), "alice");
    }

    proptest! {
        #[test]
        fn admin_token_is_always_admin(token in "[A-Za-z0-9]{1,40}") {
            let admin = AdminToken::new(token.clone()).unwrap();
            let session = resolve_session(Some(&token), Some(&admin), &RejectAll, Utc::now()).unwrap();
            prop_assert_eq!(session.user(), ADMIN_USER);
        }

        #[test]
        fn unknown_non_admin_tokens_are_invalid(token in "[a-z0-9]{1,40}") {
            let admin = AdminToken::new("ADMIN-ONLY-UPPER").unwrap();
            let err = resolve_session(Some(&token), Some(&admin), &RejectAll, Utc::now()).unwrap_err();
            prop_assert_eq!(err, AuthFailure::InvalidSession);
            prop_assert_eq!(err.to_string(), "invalid session");
        }
    }
}
